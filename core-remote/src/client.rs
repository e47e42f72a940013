//! Thin client for the streaming service's Web API.
//!
//! Every call attaches the stored access token as a bearer credential.
//! Playback control endpoints return 204 on success; failures are
//! mapped onto [`RemoteError`] by status code.

use std::sync::Arc;

use bridge_traits::{HttpClient, HttpMethod, HttpRequest};
use core_auth::TokenStore;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::error::{RemoteError, Result};
use crate::types::{CatalogItem, DeviceInfo, SearchKind};

const DEFAULT_BASE_URL: &str = "https://api.spotify.com/v1";

/// Client for catalog search and remote playback control.
#[derive(Clone)]
pub struct RemoteCatalogClient {
    http: Arc<dyn HttpClient>,
    tokens: TokenStore,
    base_url: String,
}

#[derive(Deserialize)]
struct ApiArtist {
    name: String,
}

#[derive(Deserialize)]
struct ApiItem {
    id: String,
    uri: String,
    name: String,
    #[serde(default)]
    artists: Vec<ApiArtist>,
    #[serde(default)]
    duration_ms: Option<u64>,
}

#[derive(Deserialize)]
struct Page {
    items: Vec<ApiItem>,
}

#[derive(Deserialize, Default)]
struct SearchResponse {
    tracks: Option<Page>,
    albums: Option<Page>,
    playlists: Option<Page>,
}

#[derive(Deserialize)]
struct ApiDevice {
    id: Option<String>,
    name: String,
    #[serde(default)]
    is_active: bool,
    #[serde(default)]
    volume_percent: Option<u8>,
}

#[derive(Deserialize)]
struct DevicesResponse {
    devices: Vec<ApiDevice>,
}

impl RemoteCatalogClient {
    pub fn new(http: Arc<dyn HttpClient>, tokens: TokenStore) -> Self {
        Self {
            http,
            tokens,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different API root (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Search the catalog.
    pub async fn search(
        &self,
        query: &str,
        kind: SearchKind,
        limit: u8,
    ) -> Result<Vec<CatalogItem>> {
        let mut url = self.endpoint("/search")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("type", kind.as_query_param())
            .append_pair("limit", &limit.to_string());

        let request = HttpRequest::new(HttpMethod::Get, url.to_string());
        let response = self.execute(request).await?;

        let parsed: SearchResponse = response
            .json()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        let page = match kind {
            SearchKind::Track => parsed.tracks,
            SearchKind::Album => parsed.albums,
            SearchKind::Playlist => parsed.playlists,
        };

        let items = page
            .map(|p| p.items)
            .unwrap_or_default()
            .into_iter()
            .map(|item| CatalogItem {
                id: item.id,
                uri: item.uri,
                name: item.name,
                artists: item.artists.into_iter().map(|a| a.name).collect(),
                duration_ms: item.duration_ms,
            })
            .collect::<Vec<_>>();

        debug!(query, kind = kind.as_query_param(), count = items.len(), "Search completed");
        Ok(items)
    }

    /// Move the playback session onto the given device without starting
    /// playback.
    pub async fn transfer_playback(&self, device_id: &str) -> Result<()> {
        let url = self.endpoint("/me/player")?;
        let request = HttpRequest::new(HttpMethod::Put, url.to_string())
            .json(&json!({ "device_ids": [device_id], "play": false }))
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        self.execute(request).await?;
        debug!(device_id, "Playback transferred");
        Ok(())
    }

    /// Start playing a URI on the given device.
    pub async fn start_playback(&self, device_id: &str, uri: &str) -> Result<()> {
        let mut url = self.endpoint("/me/player/play")?;
        url.query_pairs_mut().append_pair("device_id", device_id);

        let request = HttpRequest::new(HttpMethod::Put, url.to_string())
            .json(&json!({ "uris": [uri] }))
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        self.execute(request).await?;
        debug!(device_id, uri, "Playback started");
        Ok(())
    }

    /// Pause whatever the account is currently playing.
    pub async fn pause_playback(&self) -> Result<()> {
        let url = self.endpoint("/me/player/pause")?;
        let request = HttpRequest::new(HttpMethod::Put, url.to_string());
        self.execute(request).await?;
        Ok(())
    }

    /// List the account's available playback devices. Devices the API
    /// reports without an id cannot be targeted and are skipped.
    pub async fn devices(&self) -> Result<Vec<DeviceInfo>> {
        let url = self.endpoint("/me/player/devices")?;
        let request = HttpRequest::new(HttpMethod::Get, url.to_string());
        let response = self.execute(request).await?;

        let parsed: DevicesResponse = response
            .json()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        Ok(parsed
            .devices
            .into_iter()
            .filter_map(|d| {
                Some(DeviceInfo {
                    id: d.id?,
                    name: d.name,
                    is_active: d.is_active,
                    volume_percent: d.volume_percent,
                })
            })
            .collect())
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| RemoteError::Network(format!("Invalid API URL: {}", e)))
    }

    async fn execute(&self, request: HttpRequest) -> Result<bridge_traits::HttpResponse> {
        let credential = self
            .tokens
            .load()
            .await
            .map_err(|e| RemoteError::Storage(e.to_string()))?
            .ok_or(RemoteError::NotAuthenticated)?;

        let request = request.bearer_token(credential.access_token);
        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        if !response.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(RemoteError::from_status(response.status, message));
        }
        Ok(response)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{HttpClient, HttpRequest, HttpResponse, KeyValueStore};
    use bytes::Bytes;
    use tokio::sync::Mutex;

    /// Records every request and replays canned responses in order,
    /// repeating the last one once the script runs out.
    pub struct ScriptedHttpClient {
        responses: Vec<(u16, String)>,
        pub calls: AtomicUsize,
        pub requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedHttpClient {
        pub fn new(responses: Vec<(u16, &str)>) -> Arc<Self> {
            Arc::new(Self {
                responses: responses
                    .into_iter()
                    .map(|(s, b)| (s, b.to_string()))
                    .collect(),
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub fn always(status: u16, body: &str) -> Arc<Self> {
            Self::new(vec![(status, body)])
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub async fn request_urls(&self) -> Vec<String> {
            self.requests.lock().await.iter().map(|r| r.url.clone()).collect()
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedHttpClient {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().await.push(request);
            let (status, body) = self
                .responses
                .get(call)
                .or_else(|| self.responses.last())
                .cloned()
                .unwrap_or((204, String::new()));
            Ok(HttpResponse {
                status,
                headers: Default::default(),
                body: Bytes::from(body),
            })
        }
    }

    /// In-memory key/value store for token persistence in tests.
    #[derive(Default)]
    pub struct MemoryStore {
        pub data: Mutex<HashMap<String, String>>,
    }

    impl MemoryStore {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }
    }

    #[async_trait]
    impl KeyValueStore for MemoryStore {
        async fn set(&self, key: &str, value: &str) -> BridgeResult<()> {
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
