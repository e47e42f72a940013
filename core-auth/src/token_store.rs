//! Persistent access token storage.
//!
//! Tokens live in the origin-scoped key/value store so a signed-in
//! session survives application restarts. Expired or corrupt entries
//! are removed on load so callers never observe a stale token.

use std::sync::Arc;

use bridge_traits::{Clock, KeyValueStore};
use tracing::{debug, info, warn};

use crate::error::{AuthError, Result};
use crate::types::Credential;

const ACCESS_TOKEN_KEY: &str = "spotify_access_token";
const TOKEN_EXPIRY_KEY: &str = "spotify_token_expiry";

/// Reads and writes [`Credential`]s against a [`KeyValueStore`].
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Persist a credential. The expiry is stored separately as epoch
    /// milliseconds so loads can check freshness without parsing.
    pub async fn save(&self, credential: &Credential) -> Result<()> {
        self.store
            .set(ACCESS_TOKEN_KEY, &credential.access_token)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        self.store
            .set(TOKEN_EXPIRY_KEY, &credential.expires_at_millis().to_string())
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        info!(expires_at = %credential.expires_at, "Access token saved");
        Ok(())
    }

    /// Load the stored credential, if present and still valid.
    ///
    /// Missing, expired, or unparseable entries yield `Ok(None)`; the
    /// latter two also purge the stale keys.
    pub async fn load(&self) -> Result<Option<Credential>> {
        let token = self
            .store
            .get(ACCESS_TOKEN_KEY)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        let expiry = self
            .store
            .get(TOKEN_EXPIRY_KEY)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        let (token, expiry) = match (token, expiry) {
            (Some(t), Some(e)) => (t, e),
            _ => {
                debug!("No stored access token");
                return Ok(None);
            }
        };

        let credential = expiry
            .parse::<i64>()
            .ok()
            .and_then(|ms| Credential::from_parts(token, ms));

        let credential = match credential {
            Some(c) => c,
            None => {
                warn!("Stored token expiry is corrupt, clearing");
                self.clear().await?;
                return Ok(None);
            }
        };

        if credential.is_expired_at(self.clock.now()) {
            info!("Stored access token has expired, clearing");
            self.clear().await?;
            return Ok(None);
        }

        debug!(expires_at = %credential.expires_at, "Loaded stored access token");
        Ok(Some(credential))
    }

    /// Remove any stored credential.
    pub async fn clear(&self) -> Result<()> {
        self.store
            .remove(ACCESS_TOKEN_KEY)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        self.store
            .remove(TOKEN_EXPIRY_KEY)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::KeyValueStore;
    use tokio::sync::Mutex;

    /// In-memory store with an optional failure switch.
    #[derive(Default)]
    pub struct MemoryStore {
        pub data: Arc<Mutex<HashMap<String, String>>>,
        pub fail_writes: std::sync::atomic::AtomicBool,
    }

    impl MemoryStore {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub async fn get_raw(&self, key: &str) -> Option<String> {
            self.data.lock().await.get(key).cloned()
        }

        pub fn set_fail_writes(&self, fail: bool) {
            self.fail_writes
                .store(fail, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl KeyValueStore for MemoryStore {
        async fn set(&self, key: &str, value: &str) -> BridgeResult<()> {
            if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(BridgeError::OperationFailed("write disabled".to_string()));
            }
            self.data
                .lock()
                .await
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn get(&self, key: &str) -> BridgeResult<Option<String>> {
            Ok(self.data.lock().await.get(key).cloned())
        }

        async fn remove(&self, key: &str) -> BridgeResult<()> {
            self.data.lock().await.remove(key);
            Ok(())
        }

        async fn clear_all(&self) -> BridgeResult<()> {
            self.data.lock().await.clear();
            Ok(())
        }
    }
}
