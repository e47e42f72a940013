//! # Authentication Core
//!
//! OAuth 2.0 authorization-code flow with PKCE for the remote streaming
//! service, plus persistent token storage.
//!
//! The main entry point is [`PkceAuthenticator`]; [`TokenStore`] is
//! shared with the remote playback layer so API calls can attach the
//! current access token.

pub mod authenticator;
pub mod error;
pub mod token_store;
pub mod types;

pub use authenticator::{AuthConfig, PkceAuthenticator};
pub use error::{AuthError, Result};
pub use token_store::TokenStore;
pub use types::{AuthFlowState, Credential, StateToken};
