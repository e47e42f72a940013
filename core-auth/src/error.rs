//! Authentication error types.

use thiserror::Error;

/// Errors produced by the authentication layer.
#[derive(Error, Debug)]
pub enum AuthError {
    /// No code verifier could be recovered from the state parameter or
    /// either storage scope. The flow cannot complete; the user must
    /// restart authentication.
    #[error("Code verifier not found in callback state or storage; restart authentication")]
    VerifierMissing,

    /// A token exchange is already running. The caller should wait for
    /// the in-flight exchange to finish instead of starting another.
    #[error("Token exchange already in progress")]
    ExchangeInFlight,

    /// This authorization code was already submitted. Codes are
    /// single-use; a second submission would fail the whole flow.
    #[error("Authorization code was already consumed")]
    CodeConsumed,

    /// The token endpoint rejected the exchange.
    #[error("Token endpoint returned {status}: {body}")]
    TokenEndpoint { status: u16, body: String },

    /// The token endpoint returned a body that could not be parsed.
    #[error("Malformed token response: {0}")]
    MalformedResponse(String),

    /// Network failure while talking to the token endpoint.
    #[error("Network error during token exchange: {0}")]
    Network(String),

    /// Key/value storage failure.
    #[error("Storage unavailable: {0}")]
    Storage(String),

    /// The configured authorization endpoint could not be parsed.
    #[error("Invalid authorization URL: {0}")]
    InvalidAuthorizeUrl(String),

    /// The user agent failed to open the authorization page.
    #[error("Authorization redirect failed: {0}")]
    Redirect(String),

    /// The authorization server sent the user back with an error.
    #[error("Authorization was denied: {0}")]
    AuthorizationDenied(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
