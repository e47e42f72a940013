//! # Core Configuration Module
//!
//! Provides configuration management for the soundboard core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds all injected bridges and application settings. It
//! enforces fail-fast validation to ensure every required bridge is provided
//! before initialization.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - Token exchange and Web API calls
//! - `KeyValueStore` (session scope) - Flow state that lives with the process
//! - `KeyValueStore` (origin scope) - Flow state and credentials that survive restarts
//! - `UserAgent` - Full-page navigation for the authorization redirect
//!
//! ## Optional Dependencies (with defaults)
//!
//! - `Clock` - Time source, defaults to [`SystemClock`]
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .client_id("my-client-id")
//!     .redirect_uri("http://127.0.0.1:8888/callback")
//!     .http_client(Arc::new(MyHttpClient))
//!     .session_store(Arc::new(MySessionStore))
//!     .origin_store(Arc::new(MyOriginStore))
//!     .user_agent(Arc::new(MyUserAgent))
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! The builder validates all required dependencies and provides actionable
//! error messages when capabilities are missing.

use crate::error::{Error, Result};
use bridge_traits::{Clock, HttpClient, KeyValueStore, SystemClock, UserAgent};
use std::sync::Arc;

use crate::events::DEFAULT_EVENT_BUFFER_SIZE;

/// Authorization scopes requested by default.
///
/// Covers SDK streaming plus the Web API playback-state endpoints the remote
/// session controller calls.
pub const DEFAULT_SCOPES: &[&str] = &[
    "streaming",
    "user-read-email",
    "user-read-private",
    "user-read-playback-state",
    "user-modify-playback-state",
];

/// Core configuration for the soundboard core.
///
/// This struct holds all dependencies and settings required to initialize
/// the core crates. Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// OAuth client identifier of the registered application
    pub client_id: String,

    /// Redirect URI the authorization server sends the user back to
    pub redirect_uri: String,

    /// Authorization scopes to request
    pub scopes: Vec<String>,

    /// HTTP client for token exchange and Web API calls (required)
    pub http_client: Arc<dyn HttpClient>,

    /// Session-scoped key/value store; cleared when the host process ends (required)
    pub session_store: Arc<dyn KeyValueStore>,

    /// Origin-scoped key/value store; survives host restarts (required)
    pub origin_store: Arc<dyn KeyValueStore>,

    /// User agent for the full-page authorization redirect (required)
    pub user_agent: Arc<dyn UserAgent>,

    /// Time source (defaults to `SystemClock`)
    pub clock: Arc<dyn Clock>,

    /// Event bus buffer capacity
    pub event_buffer: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("http_client", &"HttpClient { ... }")
            .field("session_store", &"KeyValueStore { ... }")
            .field("origin_store", &"KeyValueStore { ... }")
            .field("user_agent", &"UserAgent { ... }")
            .field("clock", &"Clock { ... }")
            .field("event_buffer", &self.event_buffer)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Client id and redirect URI are not empty
    /// - At least one scope is requested
    /// - Event buffer capacity is non-zero
    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() {
            return Err(Error::Config("Client id cannot be empty".to_string()));
        }

        if self.redirect_uri.is_empty() {
            return Err(Error::Config("Redirect URI cannot be empty".to_string()));
        }

        if self.scopes.is_empty() {
            return Err(Error::Config(
                "At least one authorization scope is required".to_string(),
            ));
        }

        if self.event_buffer == 0 {
            return Err(Error::Config(
                "Event buffer capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn capability_missing(capability: &str, message: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: message.to_string(),
    }
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Use this builder to incrementally set configuration options and then
/// call [`build()`](CoreConfigBuilder::build) to create the final config.
/// The builder validates required dependencies and provides helpful error
/// messages.
#[derive(Default)]
pub struct CoreConfigBuilder {
    client_id: Option<String>,
    redirect_uri: Option<String>,
    scopes: Option<Vec<String>>,
    http_client: Option<Arc<dyn HttpClient>>,
    session_store: Option<Arc<dyn KeyValueStore>>,
    origin_store: Option<Arc<dyn KeyValueStore>>,
    user_agent: Option<Arc<dyn UserAgent>>,
    clock: Option<Arc<dyn Clock>>,
    event_buffer: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the OAuth client identifier.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the redirect URI registered with the authorization server.
    pub fn redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Sets the authorization scopes to request.
    ///
    /// If not provided, [`DEFAULT_SCOPES`] are used.
    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the HTTP client implementation (required).
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the session-scoped key/value store (required).
    ///
    /// This store holds authorization flow state that only needs to live as
    /// long as the host process.
    pub fn session_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    /// Sets the origin-scoped key/value store (required).
    ///
    /// This store holds credentials and the redundant copy of the flow state;
    /// it must survive host restarts.
    pub fn origin_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.origin_store = Some(store);
        self
    }

    /// Sets the user agent implementation (required).
    pub fn user_agent(mut self, user_agent: Arc<dyn UserAgent>) -> Self {
        self.user_agent = Some(user_agent);
        self
    }

    /// Sets the time source.
    ///
    /// Defaults to [`SystemClock`]. Inject a fixed clock in tests to make
    /// token-expiry behavior deterministic.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the event bus buffer capacity.
    ///
    /// Default: [`DEFAULT_EVENT_BUFFER_SIZE`].
    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = Some(capacity);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// This validates all required dependencies are provided and returns
    /// an error with an actionable message if anything is missing.
    pub fn build(self) -> Result<CoreConfig> {
        let client_id = self.client_id.ok_or_else(|| {
            Error::Config("Client id is required. Use .client_id() to set it.".to_string())
        })?;

        let redirect_uri = self.redirect_uri.ok_or_else(|| {
            Error::Config("Redirect URI is required. Use .redirect_uri() to set it.".to_string())
        })?;

        let http_client = self.http_client.ok_or_else(|| {
            capability_missing(
                "HttpClient",
                "HttpClient implementation is required for token exchange and Web API calls. \
                 Desktop: inject bridge_desktop::ReqwestHttpClient. \
                 Tests: inject a stub client.",
            )
        })?;

        let session_store = self.session_store.ok_or_else(|| {
            capability_missing(
                "KeyValueStore (session)",
                "A session-scoped KeyValueStore is required for authorization flow state. \
                 Desktop: inject bridge_desktop::MemoryKeyValueStore.",
            )
        })?;

        let origin_store = self.origin_store.ok_or_else(|| {
            capability_missing(
                "KeyValueStore (origin)",
                "An origin-scoped KeyValueStore is required for credential persistence. \
                 Desktop: inject bridge_desktop::SqliteKeyValueStore.",
            )
        })?;

        let user_agent = self.user_agent.ok_or_else(|| {
            capability_missing(
                "UserAgent",
                "A UserAgent implementation is required for the authorization redirect. \
                 Desktop: inject bridge_desktop::BrowserUserAgent.",
            )
        })?;

        let config = CoreConfig {
            client_id,
            redirect_uri,
            scopes: self
                .scopes
                .unwrap_or_else(|| DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()),
            http_client,
            session_store,
            origin_store,
            user_agent,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            event_buffer: self.event_buffer.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::{HttpRequest, HttpResponse};
    use bridge_traits::BridgeError;
    use std::sync::Arc;

    // Mock implementations for testing
    struct MockHttpClient;

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Err(BridgeError::NotAvailable("mock".to_string()))
        }
    }

    struct MockStore;

    #[async_trait]
    impl KeyValueStore for MockStore {
        async fn set(&self, _key: &str, _value: &str) -> BridgeResult<()> {
            Ok(())
        }

        async fn get(&self, _key: &str) -> BridgeResult<Option<String>> {
            Ok(None)
        }

        async fn remove(&self, _key: &str) -> BridgeResult<()> {
            Ok(())
        }

        async fn clear_all(&self) -> BridgeResult<()> {
            Ok(())
        }
    }

    struct MockUserAgent;

    impl UserAgent for MockUserAgent {
        fn navigate(&self, _url: &str) -> BridgeResult<()> {
            Ok(())
        }
    }

    fn builder_with_bridges() -> CoreConfigBuilder {
        CoreConfig::builder()
            .http_client(Arc::new(MockHttpClient))
            .session_store(Arc::new(MockStore))
            .origin_store(Arc::new(MockStore))
            .user_agent(Arc::new(MockUserAgent))
    }

    #[test]
    fn test_builder_requires_client_id() {
        let result = builder_with_bridges()
            .redirect_uri("http://127.0.0.1/callback")
            .build();

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Client id is required"));
    }

    #[test]
    fn test_builder_requires_redirect_uri() {
        let result = builder_with_bridges().client_id("client-123").build();

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Redirect URI is required"));
    }

    #[test]
    fn test_builder_requires_http_client() {
        let result = CoreConfig::builder()
            .client_id("client-123")
            .redirect_uri("http://127.0.0.1/callback")
            .session_store(Arc::new(MockStore))
            .origin_store(Arc::new(MockStore))
            .user_agent(Arc::new(MockUserAgent))
            .build();

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("HttpClient"));
        assert!(err_msg.contains("token exchange"));
    }

    #[test]
    fn test_builder_requires_user_agent() {
        let result = CoreConfig::builder()
            .client_id("client-123")
            .redirect_uri("http://127.0.0.1/callback")
            .http_client(Arc::new(MockHttpClient))
            .session_store(Arc::new(MockStore))
            .origin_store(Arc::new(MockStore))
            .build();

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("UserAgent"));
        assert!(err_msg.contains("authorization redirect"));
    }

    #[test]
    fn test_builder_with_all_required_fields() {
        let config = builder_with_bridges()
            .client_id("client-123")
            .redirect_uri("http://127.0.0.1/callback")
            .build()
            .unwrap();

        assert_eq!(config.client_id, "client-123");
        assert_eq!(config.redirect_uri, "http://127.0.0.1/callback");
        assert_eq!(config.event_buffer, DEFAULT_EVENT_BUFFER_SIZE);
        // Default scopes include SDK streaming
        assert!(config.scopes.iter().any(|s| s == "streaming"));
    }

    #[test]
    fn test_builder_with_custom_scopes() {
        let config = builder_with_bridges()
            .client_id("client-123")
            .redirect_uri("http://127.0.0.1/callback")
            .scopes(["streaming"])
            .build()
            .unwrap();

        assert_eq!(config.scopes, vec!["streaming".to_string()]);
    }

    #[test]
    fn test_validate_rejects_empty_scopes() {
        let result = builder_with_bridges()
            .client_id("client-123")
            .redirect_uri("http://127.0.0.1/callback")
            .scopes(Vec::<String>::new())
            .build();

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("At least one authorization scope"));
    }

    #[test]
    fn test_validate_rejects_zero_event_buffer() {
        let result = builder_with_bridges()
            .client_id("client-123")
            .redirect_uri("http://127.0.0.1/callback")
            .event_buffer(0)
            .build();

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Event buffer capacity"));
    }

    #[test]
    fn test_config_is_cloneable() {
        let config = builder_with_bridges()
            .client_id("client-123")
            .redirect_uri("http://127.0.0.1/callback")
            .build()
            .unwrap();

        let cloned = config.clone();
        assert_eq!(cloned.client_id, config.client_id);
        assert_eq!(cloned.event_buffer, config.event_buffer);
    }
}
