//! Key-Value Storage Abstraction
//!
//! String key/value storage the core uses for auth flow state and credentials.
//! Two independently scoped instances are injected: a session-scoped store
//! (lives only as long as the host process) and an origin-scoped store
//! (survives host restarts). The auth layer writes flow state redundantly to
//! both so it can recover when either one is cleared while the user is away
//! on the authorization page.

use async_trait::async_trait;

use crate::error::Result;

/// Durable string key/value store
///
/// Implementations must be safe for concurrent use. Values are opaque to the
/// store; callers own key layout and encoding.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Store a value under a key, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve the value for a key, `None` if absent
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Remove a key; removing an absent key is not an error
    async fn remove(&self, key: &str) -> Result<()>;

    /// Check whether a key is present
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Remove every key in this store's scope
    async fn clear_all(&self) -> Result<()>;
}
