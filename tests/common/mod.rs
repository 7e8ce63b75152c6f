#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use chrono::{Duration, Utc};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use serde_json::json;
use task_notify::notification::{CreateNotificationRequest, Notification, NotificationApi};
use task_notify::{Result, SyncError};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

pub const TEST_TOKEN: &str = "test-token";
pub const TEST_COOKIE: &str = "connect.sid=s%3Atest-session";

pub fn notification(id: &str, kind: &str, is_read: bool) -> Notification {
    Notification {
        id: id.to_string(),
        task_id: None,
        kind: kind.to_string().into(),
        message: format!("message {id}"),
        is_read,
        created_at: Utc::now() - Duration::minutes(5),
    }
}

pub fn task_ref(id: &str, name: &str) -> task_notify::notification::TaskRef {
    task_notify::notification::TaskRef {
        id: id.to_string(),
        created_by: "u1".to_string(),
        name: name.to_string(),
        due_date: None,
        status: None,
    }
}

// ---- Scripted in-memory API ----

struct ListReply {
    notifications: Vec<Notification>,
    gate: Option<oneshot::Receiver<()>>,
}

/// `NotificationApi` whose list replies are queued by the test. When the
/// queue is empty `list` returns `fallback`.
#[derive(Default)]
pub struct ScriptedApi {
    calls: Mutex<Vec<String>>,
    replies: Mutex<VecDeque<ListReply>>,
    fallback: Mutex<Vec<Notification>>,
    failing_creates: Mutex<HashSet<String>>,
    auth_failing_creates: Mutex<HashSet<String>>,
}

impl ScriptedApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn set_fallback(&self, notifications: Vec<Notification>) {
        *self.fallback.lock().unwrap() = notifications;
    }

    pub fn reply(&self, notifications: Vec<Notification>) {
        self.replies.lock().unwrap().push_back(ListReply {
            notifications,
            gate: None,
        });
    }

    /// Queue a reply that is held until the returned sender fires.
    pub fn gated_reply(&self, notifications: Vec<Notification>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().unwrap().push_back(ListReply {
            notifications,
            gate: Some(rx),
        });
        tx
    }

    pub fn fail_create(&self, task_id: &str) {
        self.failing_creates
            .lock()
            .unwrap()
            .insert(task_id.to_string());
    }

    pub fn fail_create_auth(&self, task_id: &str) {
        self.auth_failing_creates
            .lock()
            .unwrap()
            .insert(task_id.to_string());
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl NotificationApi for ScriptedApi {
    async fn list(&self) -> Result<Vec<Notification>> {
        self.record("list".to_string());
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(ListReply {
                notifications,
                gate,
            }) => {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                Ok(notifications)
            }
            None => Ok(self.fallback.lock().unwrap().clone()),
        }
    }

    async fn create(&self, request: &CreateNotificationRequest) -> Result<()> {
        self.record(format!("create:{}", request.task_id));
        if self
            .auth_failing_creates
            .lock()
            .unwrap()
            .contains(&request.task_id)
        {
            return Err(SyncError::Auth("No token found".to_string()));
        }
        if self.failing_creates.lock().unwrap().contains(&request.task_id) {
            return Err(SyncError::Server {
                status: reqwest::StatusCode::CONFLICT,
                message: Some("Notification already exists".to_string()),
            });
        }
        Ok(())
    }

    async fn mark_as_read(&self, id: &str) -> Result<()> {
        self.record(format!("read:{}", id));
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        self.record("clear".to_string());
        Ok(())
    }
}

// ---- Fake backend over HTTP + WebSocket ----

#[derive(Default)]
struct Store {
    notifications: Vec<Notification>,
    next_id: u64,
    list_calls: usize,
    create_calls: Vec<String>,
    client_frames: Vec<String>,
}

#[derive(Clone)]
pub struct FakeBackend {
    store: Arc<Mutex<Store>>,
    push_tx: broadcast::Sender<String>,
    connections: Arc<watch::Sender<usize>>,
}

pub struct TestServer {
    pub base_url: String,
    pub backend: FakeBackend,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBody {
    user_id: String,
    task_id: String,
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

impl FakeBackend {
    pub fn seed(&self, notifications: Vec<Notification>) {
        self.store.lock().unwrap().notifications = notifications;
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.store.lock().unwrap().notifications.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.store.lock().unwrap().list_calls
    }

    pub fn create_calls(&self) -> Vec<String> {
        self.store.lock().unwrap().create_calls.clone()
    }

    pub fn client_frames(&self) -> Vec<String> {
        self.store.lock().unwrap().client_frames.clone()
    }

    /// Send a raw text frame to every connected push client.
    pub fn push_raw(&self, text: impl Into<String>) {
        let _ = self.push_tx.send(text.into());
    }

    pub async fn wait_for_connections(&self, n: usize) {
        let mut rx = self.connections.subscribe();
        let _ = rx.wait_for(|c| *c >= n).await;
    }

    pub async fn wait_for_disconnect(&self) {
        let mut rx = self.connections.subscribe();
        let _ = rx.wait_for(|c| *c == 0).await;
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t == TEST_TOKEN)
        .unwrap_or(false);
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .map(|c| c == TEST_COOKIE)
        .unwrap_or(false);
    bearer || cookie
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Not authorized, no token" })),
    )
        .into_response()
}

async fn list_notifications(State(backend): State<FakeBackend>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut store = backend.store.lock().unwrap();
    store.list_calls += 1;
    Json(json!({ "notifications": store.notifications })).into_response()
}

async fn create_notification(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(body): Json<CreateBody>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut store = backend.store.lock().unwrap();
    store.create_calls.push(body.task_id.clone());

    let exists = store
        .notifications
        .iter()
        .any(|n| n.task_id.as_deref() == Some(body.task_id.as_str()));
    if exists {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": "Notification already exists" })),
        )
            .into_response();
    }

    store.next_id += 1;
    let notification = Notification {
        id: format!("n{}-{}", store.next_id, body.user_id),
        task_id: Some(body.task_id),
        kind: body.kind.into(),
        message: body.message,
        is_read: false,
        created_at: Utc::now(),
    };
    store.notifications.insert(0, notification.clone());
    (StatusCode::CREATED, Json(json!({ "notification": notification }))).into_response()
}

async fn mark_as_read(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut store = backend.store.lock().unwrap();
    match store.notifications.iter_mut().find(|n| n.id == id) {
        Some(n) => {
            n.is_read = true;
            Json(json!({ "message": "Notification marked as read" })).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Notification not found" })),
        )
            .into_response(),
    }
}

async fn clear_notifications(State(backend): State<FakeBackend>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    backend.store.lock().unwrap().notifications.clear();
    Json(json!({ "message": "All notifications cleared" })).into_response()
}

async fn json_ws(ws: WebSocketUpgrade, State(backend): State<FakeBackend>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, backend, false))
}

async fn socketio_ws(ws: WebSocketUpgrade, State(backend): State<FakeBackend>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, backend, true))
}

async fn handle_socket(socket: WebSocket, backend: FakeBackend, socketio: bool) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    if socketio {
        let _ = tx.send(
            r#"0{"sid":"eio-1","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#
                .to_string(),
        );
    }

    // Forward pushed frames into this connection's outbound queue
    let mut push_rx = backend.push_tx.subscribe();
    let push_out = tx.clone();
    let forward_task = tokio::spawn(async move {
        while let Ok(text) = push_rx.recv().await {
            if push_out.send(text).is_err() {
                break;
            }
        }
    });

    backend.connections.send_modify(|c| *c += 1);

    let mut send_task = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let recv_backend = backend.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    recv_backend
                        .store
                        .lock()
                        .unwrap()
                        .client_frames
                        .push(text.clone());
                    if socketio && text == "40" {
                        let _ = tx.send(r#"40{"sid":"sio-1"}"#.to_string());
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    forward_task.abort();

    backend.connections.send_modify(|c| *c -= 1);
}

pub async fn spawn_test_server() -> TestServer {
    let (push_tx, _) = broadcast::channel(16);
    let (connections, _) = watch::channel(0usize);
    let backend = FakeBackend {
        store: Arc::new(Mutex::new(Store::default())),
        push_tx,
        connections: Arc::new(connections),
    };

    let app = Router::new()
        .route(
            "/task/notifications",
            get(list_notifications).post(create_notification),
        )
        .route("/task/notifications/clear", put(clear_notifications))
        .route("/task/notifications/:id/mark-as-read", put(mark_as_read))
        .route("/socket", get(json_ws))
        .route("/socket.io/", get(socketio_ws))
        .with_state(backend.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{}", addr),
        backend,
    }
}
