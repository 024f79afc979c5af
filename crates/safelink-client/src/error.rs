use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("unauthorized ({status}): {body}")]
    Unauthorized { status: u16, body: String },
    #[error("not found: {body}")]
    NotFound { body: String },
    #[error("validation failed ({status}): {body}")]
    ValidationFailed { status: u16, body: String },
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("push connection to {url} timed out after {timeout:?}")]
    ConnectTimeout { url: String, timeout: Duration },
    #[error("malformed push message: {reason}")]
    MalformedPush { reason: String, payload: String },
}

/// The error taxonomy the dashboard renders against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthorized,
    NotFound,
    ValidationFailed,
    Network,
    MalformedPushMessage,
    Server,
}

impl ApiError {
    /// Classify a non-2xx response.
    pub(crate) fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Unauthorized { status, body },
            404 => Self::NotFound { body },
            400 | 422 => Self::ValidationFailed { status, body },
            _ => Self::Server { status, body },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::ValidationFailed { .. } => ErrorKind::ValidationFailed,
            Self::Server { .. } => ErrorKind::Server,
            Self::Http(_) | Self::Json(_) | Self::WebSocket(_) | Self::ConnectTimeout { .. } => {
                ErrorKind::Network
            }
            Self::MalformedPush { .. } => ErrorKind::MalformedPushMessage,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind() == ErrorKind::Unauthorized
    }

    /// A 401: the stored token is no longer accepted. A 403 is a role
    /// refusal and leaves the session alone.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::Unauthorized { status: 401, .. })
    }

    /// Response body for status errors, if the server sent one.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { body, .. }
            | Self::NotFound { body }
            | Self::ValidationFailed { body, .. }
            | Self::Server { body, .. } => (!body.is_empty()).then_some(body.as_str()),
            _ => None,
        }
    }
}
