use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server error ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    Server {
        status: StatusCode,
        message: Option<String>,
    },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Push channel error: {0}")]
    Channel(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Desktop notification error: {0}")]
    Desktop(String),
}

impl SyncError {
    /// Message shown to the user: whatever the server said, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            SyncError::Server {
                message: Some(msg), ..
            } => msg.clone(),
            _ => fallback.to_string(),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, SyncError::Auth(_))
    }
}

impl From<validator::ValidationErrors> for SyncError {
    fn from(err: validator::ValidationErrors) -> Self {
        SyncError::Validation(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SyncError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        SyncError::Channel(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
