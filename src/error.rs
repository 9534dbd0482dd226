use thiserror::Error;

/// Main error type for Twitter API operations
#[derive(Debug, Error)]
pub enum TwitterError {
    /// Missing or empty consumer credentials. Fatal, never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal signing failure. Signals a programming defect rather than a
    /// runtime condition.
    #[error("signature error: {0}")]
    Signature(String),

    /// Network-level failure (DNS, TLS, connect, timeout)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx HTTP status, or a token-exchange response the server returned
    /// without the expected fields
    #[error("protocol error (status {status}): {body}")]
    Protocol { status: u16, body: String },

    /// The user declined to authorize the application
    #[error("user cancelled authorization")]
    UserCancelled,

    /// The handshake this call depended on ended in failure. Authentication
    /// must be restarted explicitly.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Malformed request description
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// URL parsing error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TwitterError {
    /// Create a new protocol error from an HTTP status and response body
    pub fn protocol(status: u16, body: impl Into<String>) -> Self {
        TwitterError::Protocol {
            status,
            body: body.into(),
        }
    }

    /// Check if this error is the distinguished user-cancelled condition
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TwitterError::UserCancelled)
    }

    /// Get the HTTP status code if one is associated with this error
    pub fn status_code(&self) -> Option<u16> {
        match self {
            TwitterError::Protocol { status, .. } => Some(*status),
            TwitterError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type for Twitter API operations
pub type Result<T> = std::result::Result<T, TwitterError>;
