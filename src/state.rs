use std::path::PathBuf;
use std::str::FromStr;

use validator::Validate;

use crate::error::{Result, SyncError};
use crate::websocket::PushProtocol;

const DEFAULT_TOKEN_FILE: &str = ".task-notify-token";

/// How credentials are attached to backend requests. Exactly one mode is
/// active per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Cookie,
    Bearer,
}

impl FromStr for AuthMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cookie" | "session" => Ok(AuthMode::Cookie),
            "bearer" | "token" => Ok(AuthMode::Bearer),
            other => Err(SyncError::Config(format!(
                "AUTH_MODE must be 'cookie' or 'bearer', got '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMode::Cookie => write!(f, "cookie"),
            AuthMode::Bearer => write!(f, "bearer"),
        }
    }
}

#[derive(Debug, Clone, Validate)]
pub struct Config {
    #[validate(url)]
    pub backend_url: String,
    pub push_protocol: PushProtocol,
    #[validate(length(min = 1))]
    pub push_path: String,
    pub auth_mode: AuthMode,
    /// `name=value` pair sent as the session cookie in cookie mode.
    pub session_cookie: Option<String>,
    /// File holding the bearer token in bearer mode.
    pub token_file: PathBuf,
    /// Six-field cron expression for periodic resync. Unset disables polling.
    pub resync_schedule: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let backend_url = std::env::var("BACKEND_URL")
            .map_err(|_| SyncError::Config("BACKEND_URL must be set".to_string()))?;

        let auth_mode = match std::env::var("AUTH_MODE") {
            Ok(mode) => mode.parse()?,
            Err(_) => AuthMode::Bearer,
        };

        let push_protocol = match std::env::var("PUSH_PROTOCOL") {
            Ok(protocol) => protocol.parse()?,
            Err(_) => PushProtocol::SocketIo,
        };

        let config = Self {
            backend_url: backend_url.trim_end_matches('/').to_string(),
            push_protocol,
            push_path: non_empty_var("PUSH_PATH")
                .unwrap_or_else(|| push_protocol.default_path().to_string()),
            auth_mode,
            session_cookie: non_empty_var("SESSION_COOKIE"),
            token_file: non_empty_var("TOKEN_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE)),
            resync_schedule: non_empty_var("RESYNC_SCHEDULE"),
        };

        config.check()?;
        Ok(config)
    }

    /// Validate field formats and the auth-mode specific requirements.
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| SyncError::Config(e.to_string()))?;

        if self.auth_mode == AuthMode::Cookie && self.session_cookie.is_none() {
            return Err(SyncError::Config(
                "SESSION_COOKIE must be set when AUTH_MODE=cookie".to_string(),
            ));
        }

        Ok(())
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
