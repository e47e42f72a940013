//! PKCE authorization-code flow against the streaming service.
//!
//! The flow is split across two process lifetimes: `begin_authentication`
//! generates the verifier/challenge pair and sends the user to the
//! authorization page; `complete_authentication` runs when the redirect
//! returns with an authorization code. Because storage may not survive
//! the round trip, the verifier is persisted to both the session and
//! origin scopes AND embedded in the `state` parameter, and completion
//! recovers it from whichever source still has it.

use std::sync::Arc;

use bridge_traits::{Clock, HttpClient, HttpMethod, HttpRequest, KeyValueStore, UserAgent};
use bytes::Bytes;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{AuthError, Result};
use crate::token_store::TokenStore;
use crate::types::{AuthFlowState, Credential, StateToken};

const VERIFIER_KEY: &str = "spotify_code_verifier";
const CHALLENGE_KEY: &str = "spotify_code_challenge";

const DEFAULT_AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Configuration for the PKCE flow.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub client_id: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub authorize_url: String,
    pub token_url: String,
}

impl AuthConfig {
    pub fn new(
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scopes,
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
        }
    }

    /// Override the authorization endpoint (tests, alternate tenants).
    pub fn with_authorize_url(mut self, url: impl Into<String>) -> Self {
        self.authorize_url = url.into();
        self
    }

    /// Override the token endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }
}

/// Response body of a successful token exchange.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

/// Guards the token exchange: one in flight at a time, and each
/// authorization code submitted at most once.
#[derive(Default)]
struct ExchangeGuard {
    in_flight: bool,
    consumed_code: Option<String>,
}

/// Drives the PKCE authorization flow end to end.
pub struct PkceAuthenticator {
    config: AuthConfig,
    http: Arc<dyn HttpClient>,
    session_store: Arc<dyn KeyValueStore>,
    origin_store: Arc<dyn KeyValueStore>,
    token_store: TokenStore,
    user_agent: Arc<dyn UserAgent>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    exchange: Mutex<ExchangeGuard>,
}

impl PkceAuthenticator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: AuthConfig,
        http: Arc<dyn HttpClient>,
        session_store: Arc<dyn KeyValueStore>,
        origin_store: Arc<dyn KeyValueStore>,
        token_store: TokenStore,
        user_agent: Arc<dyn UserAgent>,
        clock: Arc<dyn Clock>,
        events: EventBus,
    ) -> Self {
        Self {
            config,
            http,
            session_store,
            origin_store,
            token_store,
            user_agent,
            clock,
            events,
            exchange: Mutex::new(ExchangeGuard::default()),
        }
    }

    /// Access to the underlying token store.
    pub fn token_store(&self) -> &TokenStore {
        &self.token_store
    }

    /// Check for a previously saved credential. Emits `SignedIn` when a
    /// valid one is found so subscribers can skip the interactive flow.
    pub async fn restore_session(&self) -> Result<Option<Credential>> {
        let credential = self.token_store.load().await?;
        if let Some(cred) = &credential {
            info!(expires_at = %cred.expires_at, "Restored existing session");
            self.events
                .emit(CoreEvent::Auth(AuthEvent::SignedIn {
                    expires_at: cred.expires_at_millis(),
                }))
                .ok();
        }
        Ok(credential)
    }

    /// Start a new authorization flow.
    ///
    /// Generates a fresh verifier/challenge pair, persists it, navigates
    /// the user agent to the authorization page, and returns the URL.
    pub async fn begin_authentication(&self) -> Result<String> {
        let flow = AuthFlowState::generate(self.clock.now());
        self.persist_flow_state(&flow).await?;

        let url = self.build_authorize_url(&flow)?;

        info!("Starting authorization flow");
        self.events.emit(CoreEvent::Auth(AuthEvent::SigningIn)).ok();

        self.user_agent
            .navigate(&url)
            .map_err(|e| AuthError::Redirect(e.to_string()))?;

        Ok(url)
    }

    /// Complete the flow with the authorization code from the redirect.
    ///
    /// `state` is the raw `state` query parameter, if the redirect
    /// carried one. Only one completion may run at a time and each code
    /// is accepted at most once.
    pub async fn complete_authentication(
        &self,
        code: &str,
        state: Option<&str>,
    ) -> Result<Credential> {
        {
            let mut guard = self.exchange.lock().await;
            if guard.in_flight {
                debug!("Rejecting concurrent token exchange");
                return Err(AuthError::ExchangeInFlight);
            }
            if guard.consumed_code.as_deref() == Some(code) {
                debug!("Rejecting replay of consumed authorization code");
                return Err(AuthError::CodeConsumed);
            }
            guard.in_flight = true;
        }

        let result = self.exchange_code(code, state).await;

        {
            let mut guard = self.exchange.lock().await;
            guard.in_flight = false;
            // Record the code as spent after any real exchange attempt,
            // successful or not; the server will not accept it again.
            if !matches!(result, Err(AuthError::VerifierMissing)) {
                guard.consumed_code = Some(code.to_string());
            }
        }

        match &result {
            Ok(cred) => {
                info!(expires_at = %cred.expires_at, "Authentication completed");
                self.events
                    .emit(CoreEvent::Auth(AuthEvent::SignedIn {
                        expires_at: cred.expires_at_millis(),
                    }))
                    .ok();
            }
            Err(e) => {
                warn!(error = %e, "Token exchange failed");
                self.events
                    .emit(CoreEvent::Auth(AuthEvent::AuthError {
                        message: e.to_string(),
                        recoverable: matches!(e, AuthError::Network(_)),
                    }))
                    .ok();
            }
        }

        result
    }

    /// The authorization server redirected back with an error instead
    /// of a code (e.g. the user denied access).
    pub async fn handle_redirect_error(&self, error: &str) -> AuthError {
        warn!(reason = %error, "Authorization was not granted");
        self.purge_flow_state().await;

        let err = AuthError::AuthorizationDenied(error.to_string());
        self.events
            .emit(CoreEvent::Auth(AuthEvent::AuthError {
                message: err.to_string(),
                recoverable: true,
            }))
            .ok();
        err
    }

    /// Discard the stored credential and any in-progress flow state,
    /// and forget consumed codes so a fresh flow can run.
    pub async fn disconnect(&self) -> Result<()> {
        self.token_store.clear().await?;
        self.purge_flow_state().await;
        *self.exchange.lock().await = ExchangeGuard::default();

        info!("Signed out");
        self.events.emit(CoreEvent::Auth(AuthEvent::SignedOut)).ok();
        Ok(())
    }

    fn build_authorize_url(&self, flow: &AuthFlowState) -> Result<String> {
        let state = StateToken::new(flow.code_verifier.clone(), flow.issued_at).encode();

        let mut url = Url::parse(&self.config.authorize_url)
            .map_err(|e| AuthError::InvalidAuthorizeUrl(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", &state)
            .append_pair("code_challenge", &flow.code_challenge)
            .append_pair("code_challenge_method", "S256");

        Ok(url.to_string())
    }

    /// Write the flow secrets to both storage scopes. One scope failing
    /// is tolerated (the other still allows recovery); both failing is
    /// an error because only the state parameter would remain.
    async fn persist_flow_state(&self, flow: &AuthFlowState) -> Result<()> {
        let mut failures = 0;
        for (scope, store) in [
            ("session", &self.session_store),
            ("origin", &self.origin_store),
        ] {
            let wrote = store.set(VERIFIER_KEY, &flow.code_verifier).await;
            let wrote = match wrote {
                Ok(()) => store.set(CHALLENGE_KEY, &flow.code_challenge).await,
                Err(e) => Err(e),
            };
            if let Err(e) = wrote {
                warn!(scope, error = %e, "Failed to persist flow state");
                failures += 1;
            }
        }

        if failures == 2 {
            return Err(AuthError::Storage(
                "Could not persist flow state to any storage scope".to_string(),
            ));
        }
        Ok(())
    }

    /// Remove flow secrets from both scopes. Failures are logged only;
    /// a leftover verifier is harmless once the code is spent.
    async fn purge_flow_state(&self) {
        for (scope, store) in [
            ("session", &self.session_store),
            ("origin", &self.origin_store),
        ] {
            for key in [VERIFIER_KEY, CHALLENGE_KEY] {
                if let Err(e) = store.remove(key).await {
                    warn!(scope, key, error = %e, "Failed to clear flow state");
                }
            }
        }
    }

    /// Recover the code verifier: state parameter first, then the
    /// session scope, then the origin scope.
    async fn recover_verifier(&self, state: Option<&str>) -> Option<String> {
        if let Some(token) = state.and_then(StateToken::decode) {
            debug!("Recovered verifier from state parameter");
            return Some(token.code_verifier);
        }

        for (scope, store) in [
            ("session", &self.session_store),
            ("origin", &self.origin_store),
        ] {
            match store.get(VERIFIER_KEY).await {
                Ok(Some(verifier)) => {
                    debug!(scope, "Recovered verifier from storage");
                    return Some(verifier);
                }
                Ok(None) => {}
                Err(e) => warn!(scope, error = %e, "Storage read failed during recovery"),
            }
        }
        None
    }

    async fn exchange_code(&self, code: &str, state: Option<&str>) -> Result<Credential> {
        let verifier = match self.recover_verifier(state).await {
            Some(v) => v,
            None => return Err(AuthError::VerifierMissing),
        };

        let form: Vec<(&str, &str)> = vec![
            ("grant_type", "authorization_code"),
            ("client_id", &self.config.client_id),
            ("code", code),
            ("redirect_uri", &self.config.redirect_uri),
            ("code_verifier", &verifier),
        ];
        let body = serde_urlencoded::to_string(form)
            .map_err(|e| AuthError::Network(format!("Failed to encode form body: {}", e)))?;

        let request = HttpRequest::new(HttpMethod::Post, &self.config.token_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Bytes::from(body));

        let response = self.http.execute(request).await;

        // The code is spent by now regardless of outcome.
        self.purge_flow_state().await;

        let response = response.map_err(|e| AuthError::Network(e.to_string()))?;
        if !response.is_success() {
            return Err(AuthError::TokenEndpoint {
                status: response.status,
                body: response.text().unwrap_or_default(),
            });
        }

        let parsed: TokenResponse = response
            .json()
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        let credential = Credential::new(parsed.access_token, parsed.expires_in, self.clock.now());
        self.token_store.save(&credential).await?;

        Ok(credential)
    }
}

impl std::fmt::Debug for PkceAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceAuthenticator")
            .field("client_id", &self.config.client_id)
            .field("redirect_uri", &self.config.redirect_uri)
            .finish()
    }
}
