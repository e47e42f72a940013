//! User Agent Abstraction
//!
//! Full-page navigation for the OAuth authorization redirect. The core never
//! opens URLs itself; the host decides how (system browser, embedded web
//! view, test capture).

use crate::error::Result;

/// Navigation capability of the hosting user agent
pub trait UserAgent: Send + Sync {
    /// Navigate to the given URL
    fn navigate(&self, url: &str) -> Result<()>;
}
