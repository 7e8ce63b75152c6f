//! Pure rendering helpers for the notification bell.

use chrono::{DateTime, Local, Utc};

use super::notification_models::{Notification, NotificationKind};
use super::notification_service::NotificationSnapshot;

pub const EMPTY_TITLE: &str = "No notifications yet";
pub const EMPTY_SUBTITLE: &str = "You're all caught up!";

/// Elapsed time bucketed the way the bell shows it. Buckets use floor
/// division, so exactly one hour is "1h ago". Anything a week or older is
/// shown as a local calendar date.
pub fn format_relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed_ms = now.signed_duration_since(timestamp).num_milliseconds();
    let mins = elapsed_ms.div_euclid(60_000);
    let hours = mins.div_euclid(60);
    let days = hours.div_euclid(24);

    if mins < 1 {
        "Just now".to_string()
    } else if mins < 60 {
        format!("{}m ago", mins)
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else if days < 7 {
        format!("{}d ago", days)
    } else {
        timestamp
            .with_timezone(&Local)
            .format("%-m/%-d/%Y")
            .to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationIcon {
    Alert,
    Clock,
}

impl NotificationIcon {
    pub fn glyph(&self) -> &'static str {
        match self {
            NotificationIcon::Alert => "⚠",
            NotificationIcon::Clock => "🕒",
        }
    }
}

pub fn icon_for(kind: &NotificationKind) -> NotificationIcon {
    match kind {
        NotificationKind::TaskOverdue => NotificationIcon::Alert,
        _ => NotificationIcon::Clock,
    }
}

/// Badge text over the bell: nothing when all is read, "9+" past nine.
pub fn badge_label(unread: usize) -> Option<String> {
    match unread {
        0 => None,
        1..=9 => Some(unread.to_string()),
        _ => Some("9+".to_string()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BellRow {
    pub id: String,
    pub icon: NotificationIcon,
    pub message: String,
    pub time_ago: String,
    pub overdue_tag: bool,
    /// The mark-as-read control; present only on unread rows.
    pub can_mark_read: bool,
}

impl BellRow {
    fn from_notification(n: &Notification, now: DateTime<Utc>) -> Self {
        Self {
            id: n.id.clone(),
            icon: icon_for(&n.kind),
            message: n.message.clone(),
            time_ago: format_relative_time(n.created_at, now),
            overdue_tag: n.kind == NotificationKind::TaskOverdue,
            can_mark_read: !n.is_read,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BellView {
    pub open: bool,
    pub badge: Option<String>,
    pub unread_label: Option<String>,
    pub show_clear_all: bool,
    pub rows: Vec<BellRow>,
    pub empty_state: bool,
}

impl BellView {
    pub fn build(snapshot: &NotificationSnapshot, open: bool, now: DateTime<Utc>) -> Self {
        let unread = snapshot.unread_count;
        let rows = if open {
            snapshot
                .notifications
                .iter()
                .map(|n| BellRow::from_notification(n, now))
                .collect()
        } else {
            Vec::new()
        };

        Self {
            open,
            badge: badge_label(unread),
            unread_label: (open && unread > 0).then(|| format!("{} unread", unread)),
            show_clear_all: open && !snapshot.notifications.is_empty(),
            rows,
            empty_state: open && snapshot.notifications.is_empty(),
        }
    }
}

impl std::fmt::Display for BellView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.badge {
            Some(badge) => writeln!(f, "🔔 ({})", badge)?,
            None => writeln!(f, "🔔")?,
        }
        if !self.open {
            return Ok(());
        }

        write!(f, "Notifications")?;
        if let Some(label) = &self.unread_label {
            write!(f, "  [{}]", label)?;
        }
        if self.show_clear_all {
            write!(f, "  (Clear All)")?;
        }
        writeln!(f)?;

        if self.empty_state {
            writeln!(f, "  {}", EMPTY_TITLE)?;
            return writeln!(f, "  {}", EMPTY_SUBTITLE);
        }

        for row in &self.rows {
            let marker = if row.can_mark_read { "●" } else { " " };
            write!(
                f,
                "{} {} {}  · {}",
                marker,
                row.icon.glyph(),
                row.message,
                row.time_ago
            )?;
            if row.overdue_tag {
                write!(f, "  [Overdue]")?;
            }
            if row.can_mark_read {
                write!(f, "  (mark read: {})", row.id)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Dropdown open/closed state of the bell.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bell {
    open: bool,
}

impl Bell {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn view(&self, snapshot: &NotificationSnapshot, now: DateTime<Utc>) -> BellView {
        BellView::build(snapshot, self.open, now)
    }
}
