use async_trait::async_trait;
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use url::Url;

use super::types::{decode_frame, Frame, PushEvent, PushProtocol};
use crate::error::{Result, SyncError};

/// A single long-lived push connection owned by one mounted
/// `NotificationSync`.
#[async_trait]
pub trait PushChannel: Send {
    /// Next event from the server. `None` once the connection is gone.
    async fn next_event(&mut self) -> Option<PushEvent>;

    /// Close the connection. Further `next_event` calls return `None`.
    async fn close(&mut self);
}

/// Push endpoint URL for a backend origin: `http` becomes `ws`, `https`
/// becomes `wss`.
pub fn push_url(backend_url: &str, path: &str, protocol: PushProtocol) -> Result<Url> {
    let mut url = Url::parse(backend_url)
        .map_err(|e| SyncError::Config(format!("Invalid BACKEND_URL: {}", e)))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(SyncError::Config(format!(
                "Unsupported backend scheme '{}'",
                other
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| SyncError::Config("Cannot switch backend URL to websocket".to_string()))?;
    url.set_path(path);

    match protocol {
        PushProtocol::SocketIo => {
            url.set_query(Some("EIO=4&transport=websocket"));
        }
        PushProtocol::Json => url.set_query(None),
    }

    Ok(url)
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Push channel over a client WebSocket.
pub struct WsPushChannel {
    socket: Option<WsStream>,
    protocol: PushProtocol,
    pending_connect: bool,
}

impl WsPushChannel {
    pub async fn connect(url: &Url, protocol: PushProtocol) -> Result<Self> {
        tracing::info!("Opening push channel to {}", url);
        let (socket, _) = connect_async(url.as_str()).await?;

        Ok(Self {
            socket: Some(socket),
            protocol,
            // Socket.IO announces the namespace join itself; plain JSON
            // has no handshake so the open connection is the liveness signal.
            pending_connect: protocol == PushProtocol::Json,
        })
    }

    async fn reply(&mut self, text: String) -> Result<()> {
        if let Some(socket) = self.socket.as_mut() {
            socket.send(Message::Text(text)).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl PushChannel for WsPushChannel {
    async fn next_event(&mut self) -> Option<PushEvent> {
        if self.pending_connect {
            self.pending_connect = false;
            return Some(PushEvent::Connect);
        }

        loop {
            let next = self.socket.as_mut()?.next().await;
            let msg = match next {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    tracing::error!("Push channel read error: {}", e);
                    self.socket = None;
                    return None;
                }
                None => {
                    self.socket = None;
                    return None;
                }
            };

            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => {
                    self.socket = None;
                    return None;
                }
                _ => continue,
            };

            match decode_frame(&text, self.protocol) {
                Ok(Frame::Event(event)) => return Some(event),
                Ok(Frame::Reply(reply)) => {
                    if let Err(e) = self.reply(reply).await {
                        tracing::error!("Push channel write error: {}", e);
                        self.socket = None;
                        return None;
                    }
                }
                Ok(Frame::Close) => {
                    self.close().await;
                    return None;
                }
                Ok(Frame::Ignore) => {}
                Err(SyncError::Channel(reason)) => {
                    tracing::error!("Push channel refused: {}", reason);
                    self.close().await;
                    return None;
                }
                Err(e) => tracing::warn!("Dropping malformed push frame: {}", e),
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            if let Err(e) = socket.close(None).await {
                tracing::debug!("Push channel close: {}", e);
            }
        }
    }
}

/// In-process push channel fed through an mpsc sender. Lets a host (or a
/// test) drive `NotificationSync` without a network connection.
pub struct MemoryPushChannel {
    rx: mpsc::UnboundedReceiver<PushEvent>,
}

impl MemoryPushChannel {
    pub fn pair() -> (mpsc::UnboundedSender<PushEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

#[async_trait]
impl PushChannel for MemoryPushChannel {
    async fn next_event(&mut self) -> Option<PushEvent> {
        self.rx.recv().await
    }

    async fn close(&mut self) {
        self.rx.close();
    }
}
