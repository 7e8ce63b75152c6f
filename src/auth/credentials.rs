use std::path::PathBuf;
use std::sync::Arc;

use reqwest::{header, RequestBuilder};

use super::jwt::ensure_not_expired;
use crate::error::{Result, SyncError};
use crate::state::{AuthMode, Config};

/// Attaches the caller's credential to an outgoing backend request.
///
/// `HttpNotificationApi` is handed one strategy and calls it for every
/// request; it never knows which transport the credential uses.
pub trait CredentialStrategy: Send + Sync {
    fn attach(&self, request: RequestBuilder) -> Result<RequestBuilder>;
}

/// Cookie/session variant: replays a session cookie on every request.
#[derive(Clone)]
pub struct SessionCookie {
    cookie: String,
}

impl SessionCookie {
    pub fn new(cookie: impl Into<String>) -> Self {
        Self {
            cookie: cookie.into(),
        }
    }
}

impl CredentialStrategy for SessionCookie {
    fn attach(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        if self.cookie.trim().is_empty() {
            return Err(SyncError::Auth("No session found".to_string()));
        }
        Ok(request.header(header::COOKIE, self.cookie.as_str()))
    }
}

#[derive(Clone)]
enum TokenSource {
    File(PathBuf),
    Inline(String),
}

/// Bearer variant: `Authorization: Bearer <token>`.
///
/// A file-backed token is re-read on every request so a login elsewhere
/// (or a logout that deletes the file) takes effect immediately. The read is
/// a blocking `std::fs` call made from the request path; the file holds a
/// single token, so it stays well under a filesystem block.
#[derive(Clone)]
pub struct BearerToken {
    source: TokenSource,
}

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            source: TokenSource::Inline(token.into()),
        }
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: TokenSource::File(path.into()),
        }
    }

    fn token(&self) -> Result<String> {
        let raw = match &self.source {
            TokenSource::Inline(token) => token.clone(),
            TokenSource::File(path) => std::fs::read_to_string(path).map_err(|e| {
                SyncError::Auth(format!("No token found at {}: {}", path.display(), e))
            })?,
        };

        let token = raw.trim();
        if token.is_empty() {
            return Err(SyncError::Auth("No token found".to_string()));
        }
        Ok(token.to_string())
    }
}

impl CredentialStrategy for BearerToken {
    fn attach(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.token()?;
        ensure_not_expired(&token)?;
        Ok(request.bearer_auth(token))
    }
}

/// Build the single credential strategy selected by `AUTH_MODE`.
pub fn strategy_from_config(config: &Config) -> Result<Arc<dyn CredentialStrategy>> {
    match config.auth_mode {
        AuthMode::Cookie => {
            let cookie = config.session_cookie.clone().ok_or_else(|| {
                SyncError::Config("SESSION_COOKIE must be set when AUTH_MODE=cookie".to_string())
            })?;
            Ok(Arc::new(SessionCookie::new(cookie)))
        }
        AuthMode::Bearer => Ok(Arc::new(BearerToken::from_file(config.token_file.clone()))),
    }
}
