// Declare submodules
pub mod display;
pub mod notification_client;
pub mod notification_dto;
pub mod notification_models;
pub mod notification_service;

// Re-export public items
pub use display::{format_relative_time, icon_for, Bell, BellView, NotificationIcon};
pub use notification_client::{HttpNotificationApi, NotificationApi};
pub use notification_dto::CreateNotificationRequest;
pub use notification_models::{Notification, NotificationKind, TaskRef};
pub use notification_service::{NotificationSnapshot, NotificationSync};
