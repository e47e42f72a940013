//! Catalog and device types returned by the streaming Web API.

use serde::{Deserialize, Serialize};

/// Which catalog collection to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Track,
    Album,
    Playlist,
}

impl SearchKind {
    /// Value for the API's `type` query parameter.
    pub fn as_query_param(&self) -> &'static str {
        match self {
            SearchKind::Track => "track",
            SearchKind::Album => "album",
            SearchKind::Playlist => "playlist",
        }
    }
}

/// One search result, normalized across result kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Service-assigned identifier.
    pub id: String,
    /// Playback URI (e.g. `spotify:track:...`).
    pub uri: String,
    /// Display name.
    pub name: String,
    /// Artist names, empty for kinds without artists.
    #[serde(default)]
    pub artists: Vec<String>,
    /// Duration in milliseconds, when the API reports one.
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

/// A playback device registered with the user's account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub volume_percent: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_kind_query_params() {
        assert_eq!(SearchKind::Track.as_query_param(), "track");
        assert_eq!(SearchKind::Album.as_query_param(), "album");
        assert_eq!(SearchKind::Playlist.as_query_param(), "playlist");
    }

    #[test]
    fn test_catalog_item_deserializes_without_optionals() {
        let item: CatalogItem = serde_json::from_str(
            r#"{"id":"abc","uri":"spotify:track:abc","name":"Air horn"}"#,
        )
        .unwrap();
        assert!(item.artists.is_empty());
        assert!(item.duration_ms.is_none());
    }
}
