pub mod auth;
pub mod desktop;
pub mod error;
pub mod notice;
pub mod notification;
pub mod resync;
pub mod state;
pub mod websocket;

pub use error::{Result, SyncError};
pub use notice::{Notice, NoticeLevel, Notices};
pub use notification::{NotificationSnapshot, NotificationSync};
pub use state::Config;
