use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use validator::Validate;

use super::notification_dto::{CreateNotificationRequest, NotificationListResponse};
use super::notification_models::Notification;
use crate::auth::CredentialStrategy;
use crate::error::{Result, SyncError};

/// Backend notification endpoints as seen by the client.
///
/// `NotificationSync` programs against this trait. `HttpNotificationApi` is
/// the production implementation; tests substitute in-memory fakes.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    async fn list(&self) -> Result<Vec<Notification>>;
    async fn create(&self, request: &CreateNotificationRequest) -> Result<()>;
    async fn mark_as_read(&self, id: &str) -> Result<()>;
    async fn clear_all(&self) -> Result<()>;
}

/// HTTP client for the `/task/notifications` endpoints.
pub struct HttpNotificationApi {
    base_url: String,
    client: Client,
    credentials: Arc<dyn CredentialStrategy>,
}

impl HttpNotificationApi {
    pub fn new(base_url: &str, credentials: Arc<dyn CredentialStrategy>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response> {
        let resp = self.credentials.attach(builder)?.send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            Err(parse_error(status, resp).await)
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let builder = self.client.get(format!("{}{path}", self.base_url));
        let resp = self.send(builder).await?;
        resp.json::<T>()
            .await
            .map_err(|e| SyncError::Decode(format!("json decode: {e}")))
    }

    async fn post_json<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let builder = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body);
        self.send(builder).await.map(|_| ())
    }

    async fn put_empty(&self, path: &str) -> Result<()> {
        let builder = self
            .client
            .put(format!("{}{path}", self.base_url))
            .json(&serde_json::json!({}));
        self.send(builder).await.map(|_| ())
    }
}

/// Turn a non-2xx response into a `SyncError`, keeping the server's
/// `message` (or `error`) field when the body carries one.
async fn parse_error(status: StatusCode, resp: reqwest::Response) -> SyncError {
    let body = resp.text().await.unwrap_or_default();
    let message = server_message(&body);

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        SyncError::Auth(message.unwrap_or_else(|| status.to_string()))
    } else {
        SyncError::Server { status, message }
    }
}

fn server_message(body: &str) -> Option<String> {
    let value = serde_json::from_str::<serde_json::Value>(body).ok()?;
    value["message"]
        .as_str()
        .or_else(|| value["error"].as_str())
        .map(String::from)
}

#[async_trait]
impl NotificationApi for HttpNotificationApi {
    async fn list(&self) -> Result<Vec<Notification>> {
        let body: NotificationListResponse = self.get_json("/task/notifications").await?;
        Ok(body.notifications)
    }

    async fn create(&self, request: &CreateNotificationRequest) -> Result<()> {
        request.validate()?;
        self.post_json("/task/notifications", request).await
    }

    async fn mark_as_read(&self, id: &str) -> Result<()> {
        self.put_empty(&format!("/task/notifications/{id}/mark-as-read"))
            .await
    }

    async fn clear_all(&self) -> Result<()> {
        self.put_empty("/task/notifications/clear").await
    }
}
