use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const TASK_OVERDUE: &str = "task-overdue";

/// Notification type tag. The set is open: anything the backend sends that
/// is not `task-overdue` is kept verbatim as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationKind {
    TaskOverdue,
    Other(String),
}

impl From<String> for NotificationKind {
    fn from(s: String) -> Self {
        if s == TASK_OVERDUE {
            NotificationKind::TaskOverdue
        } else {
            NotificationKind::Other(s)
        }
    }
}

impl From<NotificationKind> for String {
    fn from(kind: NotificationKind) -> Self {
        kind.to_string()
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::TaskOverdue => write!(f, "{}", TASK_OVERDUE),
            NotificationKind::Other(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Task reference carried by a `refreshNotifications` push event. Fields
/// beyond these are ignored.
///
/// `due_date` and `status` are informational and kept as raw strings; a
/// value of any other shape is dropped to `None` rather than rejecting the
/// whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRef {
    #[serde(rename = "_id")]
    pub id: String,
    pub created_by: String,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub due_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        _ => None,
    })
}

impl TaskRef {
    /// Parsed due date. Accepts RFC 3339 timestamps and bare `YYYY-MM-DD`
    /// dates (midnight UTC); empty or unparseable values give `None`.
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.due_date.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }

    /// Due date in the past and not completed. Tasks without a usable due
    /// date are never overdue.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        if self.status.as_deref() == Some("completed") {
            return false;
        }
        matches!(self.due_at(), Some(due) if due < now)
    }

    pub fn overdue_message(&self) -> String {
        format!("Task \"{}\" is overdue!", self.name)
    }
}

/// Number of unread notifications in a fetched list.
pub fn unread_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.is_read).count()
}
