use serde::{Deserialize, Serialize};
use validator::Validate;

use super::notification_models::{Notification, NotificationKind, TaskRef};

#[derive(Debug, Deserialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    #[validate(length(min = 1))]
    pub user_id: String,
    #[validate(length(min = 1))]
    pub task_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[validate(length(min = 1))]
    pub message: String,
}

impl CreateNotificationRequest {
    pub fn overdue(task: &TaskRef) -> Self {
        Self {
            user_id: task.created_by.clone(),
            task_id: task.id.clone(),
            kind: NotificationKind::TaskOverdue,
            message: task.overdue_message(),
        }
    }
}
