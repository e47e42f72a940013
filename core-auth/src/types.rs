//! Shared authentication types: credentials, PKCE flow state, and the
//! state token carried through the authorization redirect.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// An access token with its absolute expiry instant.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Build a credential from a token endpoint response, anchoring the
    /// relative `expires_in` against the provided current time.
    pub fn new(access_token: impl Into<String>, expires_in_secs: i64, now: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: now + chrono::Duration::seconds(expires_in_secs),
        }
    }

    /// Rehydrate a credential from its stored representation. Returns
    /// `None` when the stored millisecond timestamp is out of range.
    pub fn from_parts(access_token: impl Into<String>, expires_at_ms: i64) -> Option<Self> {
        let expires_at = DateTime::from_timestamp_millis(expires_at_ms)?;
        Some(Self {
            access_token: access_token.into(),
            expires_at,
        })
    }

    /// Expiry instant as Unix epoch milliseconds, for persistence.
    pub fn expires_at_millis(&self) -> i64 {
        self.expires_at.timestamp_millis()
    }

    /// Whether the credential is expired as of `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// Manual Debug so token material never leaks into logs.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Number of random bytes behind a code verifier. Encodes to 64
/// URL-safe characters, within RFC 7636's 43..=128 bounds.
const VERIFIER_ENTROPY_BYTES: usize = 48;

/// The secrets of one in-progress PKCE authorization flow.
#[derive(Clone)]
pub struct AuthFlowState {
    pub code_verifier: String,
    pub code_challenge: String,
    pub issued_at: DateTime<Utc>,
}

impl AuthFlowState {
    /// Generate a fresh verifier/challenge pair.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; VERIFIER_ENTROPY_BYTES];
        rng.fill(&mut bytes[..]);

        let code_verifier = URL_SAFE_NO_PAD.encode(bytes);
        let code_challenge = Self::challenge_for(&code_verifier);

        Self {
            code_verifier,
            code_challenge,
            issued_at: now,
        }
    }

    /// S256 challenge derivation: base64url(sha256(verifier)), no padding.
    pub fn challenge_for(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }
}

impl std::fmt::Debug for AuthFlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthFlowState")
            .field("code_verifier", &"[REDACTED]")
            .field("code_challenge", &self.code_challenge)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Payload embedded in the OAuth `state` parameter.
///
/// Carrying the verifier inside `state` lets the callback complete even
/// when storage was wiped mid-flow (e.g. the browser cleared session
/// storage between redirect and return).
#[derive(Serialize, Deserialize)]
pub struct StateToken {
    pub code_verifier: String,
    pub issued_at: i64,
}

impl StateToken {
    pub fn new(code_verifier: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            code_verifier: code_verifier.into(),
            issued_at: issued_at.timestamp(),
        }
    }

    /// Encode as standard base64 over the JSON form.
    pub fn encode(&self) -> String {
        // Serialization of two plain fields cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        STANDARD.encode(json)
    }

    /// Tolerant decode: any malformed input yields `None` so the caller
    /// falls back to storage-based verifier recovery.
    pub fn decode(raw: &str) -> Option<Self> {
        let bytes = STANDARD.decode(raw).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

impl std::fmt::Debug for StateToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateToken")
            .field("code_verifier", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .finish()
    }
}
