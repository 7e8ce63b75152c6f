use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::notification_client::NotificationApi;
use super::notification_dto::CreateNotificationRequest;
use super::notification_models::{unread_count, Notification, TaskRef};
use crate::error::Result;
use crate::notice::Notices;
use crate::websocket::{PushChannel, PushEvent};

const FETCH_FAILED: &str = "Failed to fetch notifications";
const MARK_READ_FAILED: &str = "Failed to mark notification as read";
const CLEAR_FAILED: &str = "Failed to clear notifications";

/// What a host renders. Replaced wholesale on every successful fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationSnapshot {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
    pub channel_open: bool,
}

struct Inner {
    api: Arc<dyn NotificationApi>,
    notices: Notices,
    snapshot: watch::Sender<NotificationSnapshot>,
    overdue_tx: broadcast::Sender<Vec<TaskRef>>,
    mounted: AtomicBool,
    shutdown: watch::Sender<bool>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

/// Client-side notification state for one mounted bell.
///
/// The cached list is only ever the body of the last successful
/// `GET /task/notifications`; push events and mutations never edit it
/// directly, they trigger a re-fetch. Concurrent fetches are not ordered:
/// whichever response lands last wins.
#[derive(Clone)]
pub struct NotificationSync {
    inner: Arc<Inner>,
}

impl NotificationSync {
    /// A live component with an empty cache and no push channel.
    pub fn new(api: Arc<dyn NotificationApi>, notices: Notices) -> Self {
        let (snapshot, _) = watch::channel(NotificationSnapshot::default());
        let (overdue_tx, _) = broadcast::channel(16);
        let (shutdown, _) = watch::channel(false);

        Self {
            inner: Arc::new(Inner {
                api,
                notices,
                snapshot,
                overdue_tx,
                mounted: AtomicBool::new(true),
                shutdown,
                listener: Mutex::new(None),
            }),
        }
    }

    /// Create the component, issue the initial fetch, and start listening on
    /// `channel`. Must be called inside a tokio runtime.
    pub fn mount<C>(api: Arc<dyn NotificationApi>, notices: Notices, channel: C) -> Self
    where
        C: PushChannel + 'static,
    {
        let sync = Self::new(api, notices);

        let initial = sync.clone();
        tokio::spawn(async move {
            let _ = initial.fetch_all().await;
        });

        sync.set_channel_open(true);
        let shutdown = sync.inner.shutdown.subscribe();
        let listener = tokio::spawn(sync.clone().listen(channel, shutdown));
        if let Ok(mut slot) = sync.inner.listener.lock() {
            *slot = Some(listener);
        }

        sync
    }

    /// Close the push channel and detach. Fetches still in flight resolve
    /// into a no-op.
    pub async fn unmount(&self) {
        if !self.inner.mounted.swap(false, Ordering::SeqCst) {
            return;
        }
        let _ = self.inner.shutdown.send(true);

        let listener = self
            .inner
            .listener
            .lock()
            .ok()
            .and_then(|mut slot| slot.take());
        if let Some(handle) = listener {
            if let Err(e) = handle.await {
                debug!("Push listener ended abnormally: {}", e);
            }
        }
        info!("Notification bell unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> NotificationSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<NotificationSnapshot> {
        self.inner.snapshot.subscribe()
    }

    /// Every non-empty overdue batch received on the push channel.
    pub fn subscribe_overdue(&self) -> broadcast::Receiver<Vec<TaskRef>> {
        self.inner.overdue_tx.subscribe()
    }

    pub fn notices(&self) -> &Notices {
        &self.inner.notices
    }

    /// Replace the cache with the server's current list.
    ///
    /// On failure the cache is left as it was and an error notice is
    /// published. Nothing is retried.
    pub async fn fetch_all(&self) -> Result<Vec<Notification>> {
        match self.inner.api.list().await {
            Ok(notifications) => {
                if !self.is_mounted() {
                    debug!("Fetch resolved after unmount, ignoring");
                    return Ok(notifications);
                }
                let unread = unread_count(&notifications);
                let fresh = notifications.clone();
                self.inner.snapshot.send_modify(|s| {
                    s.notifications = fresh;
                    s.unread_count = unread;
                });
                debug!(total = notifications.len(), unread, "Notifications refreshed");
                Ok(notifications)
            }
            Err(e) => {
                error!("Error fetching notifications: {}", e);
                self.report(&e, FETCH_FAILED);
                Err(e)
            }
        }
    }

    /// Ask the backend to record an overdue notification for every task in
    /// the batch, one after another, then re-fetch once.
    ///
    /// Creation failures are expected (the backend rejects duplicates) and
    /// never stop the batch.
    pub async fn on_push_event(&self, overdue_tasks: &[TaskRef]) {
        if !self.is_mounted() {
            debug!(count = overdue_tasks.len(), "Push event after unmount, ignoring");
            return;
        }
        if !overdue_tasks.is_empty() {
            let _ = self.inner.overdue_tx.send(overdue_tasks.to_vec());
        }

        for task in overdue_tasks {
            let request = CreateNotificationRequest::overdue(task);
            match self.inner.api.create(&request).await {
                Ok(()) => debug!(task_id = %task.id, "Overdue notification created"),
                Err(e) if e.is_auth() => {
                    debug!(task_id = %task.id, "Skipping overdue notification: {}", e)
                }
                Err(e) => warn!(
                    task_id = %task.id,
                    "Error creating notification, ignoring (it may already exist): {}", e
                ),
            }
        }

        let _ = self.fetch_all().await;
    }

    pub async fn mark_as_read(&self, id: &str) -> Result<()> {
        if let Err(e) = self.inner.api.mark_as_read(id).await {
            error!(notification_id = %id, "Error marking notification as read: {}", e);
            self.report(&e, MARK_READ_FAILED);
            return Err(e);
        }

        let _ = self.fetch_all().await;
        if self.is_mounted() {
            self.inner.notices.success("Notification marked as read");
        }
        Ok(())
    }

    pub async fn clear_all(&self) -> Result<()> {
        if let Err(e) = self.inner.api.clear_all().await {
            error!("Error clearing notifications: {}", e);
            self.report(&e, CLEAR_FAILED);
            return Err(e);
        }

        let _ = self.fetch_all().await;
        if self.is_mounted() {
            self.inner.notices.success("All notifications cleared");
        }
        Ok(())
    }

    async fn listen<C: PushChannel>(self, mut channel: C, mut shutdown: watch::Receiver<bool>) {
        loop {
            let next = tokio::select! {
                _ = shutdown.changed() => None,
                event = channel.next_event() => Some(event),
            };
            let Some(event) = next else {
                channel.close().await;
                break;
            };

            match event {
                Some(PushEvent::Connect) => info!("✅ Socket connected"),
                Some(PushEvent::RefreshNotifications(tasks)) => {
                    debug!(count = tasks.len(), "Overdue tasks pushed");
                    // Handled off the listener so later events are not
                    // queued behind this batch's requests.
                    let sync = self.clone();
                    tokio::spawn(async move {
                        sync.on_push_event(&tasks).await;
                    });
                }
                Some(PushEvent::Other(name)) => debug!(event = %name, "Ignoring push event"),
                None => {
                    warn!("Push channel closed");
                    break;
                }
            }
        }

        self.set_channel_open(false);
    }

    fn set_channel_open(&self, open: bool) {
        self.inner.snapshot.send_if_modified(|s| {
            let changed = s.channel_open != open;
            s.channel_open = open;
            changed
        });
    }

    fn report(&self, err: &crate::error::SyncError, fallback: &str) {
        if self.is_mounted() {
            self.inner.notices.error(err.user_message(fallback));
        }
    }
}
