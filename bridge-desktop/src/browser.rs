//! User Agent Implementation using the system browser

use bridge_traits::{
    error::{BridgeError, Result},
    UserAgent,
};
use tracing::debug;

/// Opens authorization URLs in the user's default browser.
#[derive(Debug, Default)]
pub struct BrowserUserAgent;

impl BrowserUserAgent {
    pub fn new() -> Self {
        Self
    }
}

impl UserAgent for BrowserUserAgent {
    fn navigate(&self, url: &str) -> Result<()> {
        debug!(url = %url, "Opening system browser");
        webbrowser::open(url)
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to open browser: {}", e)))
    }
}
