pub mod connection;
pub mod types;

pub use connection::{push_url, MemoryPushChannel, PushChannel, WsPushChannel};
pub use types::{decode_frame, Frame, PushEvent, PushProtocol};
