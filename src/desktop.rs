use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Result, SyncError};
use crate::notification::TaskRef;

pub const ALERT_TITLE: &str = "Task Overdue 🚨";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Not asked yet.
    Default,
    Granted,
    Denied,
}

/// An alert currently (or last) shown by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertHandle {
    pub id: u64,
    pub title: String,
    pub body: String,
}

/// OS-level notification surface.
#[async_trait]
pub trait DesktopNotifier: Send + Sync {
    fn is_supported(&self) -> bool {
        true
    }

    fn permission(&self) -> Permission;

    async fn request_permission(&self) -> Permission;

    fn show(&self, title: &str, body: &str) -> Result<AlertHandle>;
}

/// Raises a native alert when overdue tasks arrive.
///
/// Permission is requested lazily, on the first non-empty batch, never at
/// construction. The last shown alert is owned here and lives exactly as
/// long as this value.
pub struct OverdueAlert<N: DesktopNotifier> {
    notifier: N,
    last_shown: Option<AlertHandle>,
}

impl<N: DesktopNotifier> OverdueAlert<N> {
    pub fn new(notifier: N) -> Self {
        if notifier.is_supported() {
            tracing::info!("Notification permission: {:?}", notifier.permission());
        } else {
            tracing::info!("Desktop notifications are not supported here");
        }
        Self {
            notifier,
            last_shown: None,
        }
    }

    pub fn last_shown(&self) -> Option<&AlertHandle> {
        self.last_shown.as_ref()
    }

    /// Show an alert for `tasks`. Returns `None` when nothing was shown
    /// (empty batch, unsupported, or permission not granted).
    pub async fn on_overdue(&mut self, tasks: &[TaskRef]) -> Result<Option<&AlertHandle>> {
        if tasks.is_empty() || !self.notifier.is_supported() {
            return Ok(None);
        }

        let mut permission = self.notifier.permission();
        if permission == Permission::Default {
            permission = self.notifier.request_permission().await;
        }
        if permission != Permission::Granted {
            tracing::debug!("Desktop alert suppressed, permission {:?}", permission);
            return Ok(None);
        }

        let body = format!("You have {} overdue task(s)!", tasks.len());
        let handle = self.notifier.show(ALERT_TITLE, &body)?;
        self.last_shown = Some(handle);
        Ok(self.last_shown.as_ref())
    }
}

/// Notifier that writes alerts to the log. Grants permission on request.
pub struct LogNotifier {
    permission: Mutex<Permission>,
    next_id: AtomicU64,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self {
            permission: Mutex::new(Permission::Default),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DesktopNotifier for LogNotifier {
    fn permission(&self) -> Permission {
        self.permission
            .lock()
            .map(|p| *p)
            .unwrap_or(Permission::Denied)
    }

    async fn request_permission(&self) -> Permission {
        match self.permission.lock() {
            Ok(mut p) => {
                if *p == Permission::Default {
                    *p = Permission::Granted;
                }
                *p
            }
            Err(_) => Permission::Denied,
        }
    }

    fn show(&self, title: &str, body: &str) -> Result<AlertHandle> {
        if self.permission() != Permission::Granted {
            return Err(SyncError::Desktop(
                "Permission not granted".to_string(),
            ));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        tracing::info!(alert_id = id, "{}: {}", title, body);
        Ok(AlertHandle {
            id,
            title: title.to_string(),
            body: body.to_string(),
        })
    }
}
