//! Error types for clubledger-client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// The request never produced an HTTP response
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Non-2xx response; `message` is the backend's `{error}` text when present
    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// 401 from the backend; the stored token has been cleared
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Invalid response: {message}")]
    Decode { message: String },

    #[error("IO error")]
    IoError(#[from] std::io::Error),
}

impl ClientError {
    /// Whether the session is over and the user has to sign in again
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, ClientError::Unauthorized)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            ClientError::Decode { message: error.to_string() }
        } else {
            ClientError::Transport { message: error.to_string() }
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(error: serde_json::Error) -> Self {
        ClientError::Decode { message: error.to_string() }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
