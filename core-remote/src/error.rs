//! Remote playback error types.

use thiserror::Error;

/// Errors from the remote streaming device and its Web API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The remote device has not reported ready yet.
    #[error("Remote device is not ready")]
    NotReady,

    /// No stored access token; the user must authenticate first.
    #[error("Not authenticated with the streaming service")]
    NotAuthenticated,

    /// The access token was rejected; re-authentication is required.
    #[error("Streaming session expired; sign in again")]
    AuthExpired,

    /// The requested resource does not exist.
    #[error("Remote resource not found")]
    NotFound,

    /// The streaming service requires a premium account for playback.
    #[error("Playback requires a premium account")]
    PremiumRequired,

    /// The service is temporarily unavailable; retrying may succeed.
    #[error("Streaming service unavailable (status {status})")]
    Unavailable { status: u16 },

    /// Any other API rejection.
    #[error("Streaming API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure reaching the API.
    #[error("Network error: {0}")]
    Network(String),

    /// The embedded player reported a failure.
    #[error("Remote player error: {0}")]
    Player(String),

    /// Key/value storage failure while reading or clearing tokens.
    #[error("Storage unavailable: {0}")]
    Storage(String),
}

impl RemoteError {
    /// Map an HTTP status from the Web API onto a domain error.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => Self::AuthExpired,
            404 => Self::NotFound,
            502 | 503 => Self::Unavailable { status },
            _ => Self::Api { status, message },
        }
    }

    /// Whether a retry of the same operation could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Network(_))
    }
}

pub type Result<T> = std::result::Result<T, RemoteError>;
