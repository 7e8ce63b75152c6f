use serde::Deserialize;

use crate::error::{Result, SyncError};
use crate::notification::TaskRef;

pub const EVENT_CONNECT: &str = "connect";
pub const EVENT_REFRESH_NOTIFICATIONS: &str = "refreshNotifications";

/// Events the push channel hands to `NotificationSync`.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Connect,
    RefreshNotifications(Vec<TaskRef>),
    Other(String),
}

impl PushEvent {
    /// Build an event from its name and JSON payload.
    pub fn from_parts(event: &str, data: serde_json::Value) -> Result<Self> {
        match event {
            EVENT_CONNECT => Ok(PushEvent::Connect),
            EVENT_REFRESH_NOTIFICATIONS => {
                let tasks = if data.is_null() {
                    Vec::new()
                } else {
                    serde_json::from_value(data).map_err(|e| {
                        SyncError::Decode(format!("Invalid refreshNotifications payload: {}", e))
                    })?
                };
                Ok(PushEvent::RefreshNotifications(tasks))
            }
            other => Ok(PushEvent::Other(other.to_string())),
        }
    }
}

/// Wire protocol spoken on the push connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushProtocol {
    /// Socket.IO v4 over a raw WebSocket (Engine.IO `EIO=4`).
    SocketIo,
    /// One JSON object per text frame: `{"event": "...", "data": ...}`.
    Json,
}

impl std::str::FromStr for PushProtocol {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "socketio" | "socket.io" => Ok(PushProtocol::SocketIo),
            "json" => Ok(PushProtocol::Json),
            other => Err(SyncError::Config(format!(
                "PUSH_PROTOCOL must be 'socketio' or 'json', got '{}'",
                other
            ))),
        }
    }
}

impl PushProtocol {
    pub fn default_path(&self) -> &'static str {
        match self {
            PushProtocol::SocketIo => "/socket.io/",
            PushProtocol::Json => "/socket",
        }
    }
}

/// Result of decoding one inbound text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Event(PushEvent),
    /// Protocol housekeeping the client must answer with this text.
    Reply(String),
    /// Server is closing the session.
    Close,
    Ignore,
}

#[derive(Debug, Deserialize)]
struct JsonFrame {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

// Engine.IO packet types
const EIO_OPEN: char = '0';
const EIO_CLOSE: char = '1';
const EIO_PING: char = '2';
const EIO_MESSAGE: char = '4';

// Socket.IO packet types, carried inside an Engine.IO message
const SIO_CONNECT: char = '0';
const SIO_DISCONNECT: char = '1';
const SIO_EVENT: char = '2';
const SIO_CONNECT_ERROR: char = '4';

/// Text the client sends right after the Engine.IO open packet to join the
/// default namespace.
pub const SOCKETIO_CONNECT_PACKET: &str = "40";
const SOCKETIO_PONG: &str = "3";

pub fn decode_frame(text: &str, protocol: PushProtocol) -> Result<Frame> {
    match protocol {
        PushProtocol::Json => decode_json(text),
        PushProtocol::SocketIo => decode_socketio(text),
    }
}

fn decode_json(text: &str) -> Result<Frame> {
    let frame: JsonFrame = serde_json::from_str(text)
        .map_err(|e| SyncError::Decode(format!("Invalid push frame: {}", e)))?;
    Ok(Frame::Event(PushEvent::from_parts(&frame.event, frame.data)?))
}

fn decode_socketio(text: &str) -> Result<Frame> {
    let mut chars = text.chars();
    let Some(engine_type) = chars.next() else {
        return Ok(Frame::Ignore);
    };
    let rest = chars.as_str();

    match engine_type {
        EIO_OPEN => Ok(Frame::Reply(SOCKETIO_CONNECT_PACKET.to_string())),
        EIO_PING => Ok(Frame::Reply(SOCKETIO_PONG.to_string())),
        EIO_CLOSE => Ok(Frame::Close),
        EIO_MESSAGE => decode_socketio_packet(rest),
        _ => Ok(Frame::Ignore),
    }
}

fn decode_socketio_packet(packet: &str) -> Result<Frame> {
    let mut chars = packet.chars();
    let Some(packet_type) = chars.next() else {
        return Ok(Frame::Ignore);
    };
    let body = chars.as_str();

    match packet_type {
        SIO_CONNECT => Ok(Frame::Event(PushEvent::Connect)),
        SIO_DISCONNECT => Ok(Frame::Close),
        SIO_CONNECT_ERROR => Err(SyncError::Channel(format!(
            "Namespace connection refused: {}",
            body
        ))),
        SIO_EVENT => {
            // Optional ack id precedes the JSON array: `2<id>["name", data]`
            let json_start = body.find('[').ok_or_else(|| {
                SyncError::Decode(format!("Event packet without payload: {}", packet))
            })?;
            let mut args: Vec<serde_json::Value> = serde_json::from_str(&body[json_start..])
                .map_err(|e| SyncError::Decode(format!("Invalid event packet: {}", e)))?;
            if args.is_empty() {
                return Err(SyncError::Decode("Event packet without name".to_string()));
            }
            let name = match args.remove(0) {
                serde_json::Value::String(name) => name,
                other => {
                    return Err(SyncError::Decode(format!(
                        "Event name must be a string, got {}",
                        other
                    )))
                }
            };
            let data = if args.is_empty() {
                serde_json::Value::Null
            } else {
                args.remove(0)
            };
            Ok(Frame::Event(PushEvent::from_parts(&name, data)?))
        }
        _ => Ok(Frame::Ignore),
    }
}
