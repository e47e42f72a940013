//! Soundboard domain types: buttons, tracks, and playback state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a sound button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ButtonId(Uuid);

impl ButtonId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ButtonId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ButtonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Where a track's audio comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackSource {
    /// A file or URL the local media backend can play directly.
    Local { url: String },
    /// A track on the remote streaming service.
    Remote { id: String, uri: String },
}

/// One playable track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub source: TrackSource,
}

impl Track {
    pub fn local(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: TrackSource::Local { url: url.into() },
        }
    }

    pub fn remote(
        name: impl Into<String>,
        id: impl Into<String>,
        uri: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: TrackSource::Remote {
                id: id.into(),
                uri: uri.into(),
            },
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.source, TrackSource::Local { .. })
    }
}

/// A soundboard button with its ordered track list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundButton {
    pub id: ButtonId,
    pub name: String,
    pub tracks: Vec<Track>,
}

impl SoundButton {
    pub fn new(name: impl Into<String>, tracks: Vec<Track>) -> Self {
        Self {
            id: ButtonId::new(),
            name: name.into(),
            tracks,
        }
    }
}

/// The button currently loaded for playback, with its track cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackTarget {
    pub button_id: ButtonId,
    pub button_name: String,
    tracks: Vec<Track>,
    current_index: usize,
}

impl PlaybackTarget {
    /// Snapshot a button into a target. `None` when the button has no
    /// tracks.
    pub fn from_button(button: &SoundButton) -> Option<Self> {
        if button.tracks.is_empty() {
            return None;
        }
        Some(Self {
            button_id: button.id,
            button_name: button.name.clone(),
            tracks: button.tracks.clone(),
            current_index: 0,
        })
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_track(&self) -> &Track {
        // Construction guarantees at least one track.
        &self.tracks[self.current_index]
    }

    /// Move to the next track, wrapping past the end.
    pub fn advance(&mut self) {
        self.current_index = (self.current_index + 1) % self.tracks.len();
    }

    /// Move to the previous track, wrapping before the start.
    pub fn retreat(&mut self) {
        self.current_index = if self.current_index == 0 {
            self.tracks.len() - 1
        } else {
            self.current_index - 1
        };
    }
}

/// Where the playback state machine currently is.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackPhase {
    /// Nothing loaded.
    Idle,
    /// A start is in flight for this target.
    Loading { target: PlaybackTarget },
    /// The target's current track is playing.
    Playing { target: PlaybackTarget },
    /// The target is loaded but paused.
    Paused { target: PlaybackTarget },
}

impl PlaybackPhase {
    pub fn target(&self) -> Option<&PlaybackTarget> {
        match self {
            PlaybackPhase::Idle => None,
            PlaybackPhase::Loading { target }
            | PlaybackPhase::Playing { target }
            | PlaybackPhase::Paused { target } => Some(target),
        }
    }
}

/// Coarse phase kind for status snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Idle,
    Loading,
    Playing,
    Paused,
}

/// UI-facing snapshot of the playback engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackStatus {
    pub phase: PhaseKind,
    pub button_id: Option<ButtonId>,
    pub button_name: Option<String>,
    pub track_index: Option<usize>,
    pub track_name: Option<String>,
    pub volume: f32,
    pub muted: bool,
    pub position_secs: f64,
    pub duration_secs: Option<f64>,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_track_button() -> SoundButton {
        SoundButton::new(
            "Stingers",
            vec![
                Track::local("One", "file:///one.mp3"),
                Track::local("Two", "file:///two.mp3"),
                Track::local("Three", "file:///three.mp3"),
            ],
        )
    }

    #[test]
    fn test_empty_button_yields_no_target() {
        let button = SoundButton::new("Empty", vec![]);
        assert!(PlaybackTarget::from_button(&button).is_none());
    }

    #[test]
    fn test_advance_wraps_past_end() {
        let mut target = PlaybackTarget::from_button(&three_track_button()).unwrap();
        target.advance();
        target.advance();
        assert_eq!(target.current_index(), 2);
        target.advance();
        assert_eq!(target.current_index(), 0);
    }

    #[test]
    fn test_retreat_wraps_before_start() {
        let mut target = PlaybackTarget::from_button(&three_track_button()).unwrap();
        target.retreat();
        assert_eq!(target.current_index(), 2);
        target.retreat();
        assert_eq!(target.current_index(), 1);
    }

    #[test]
    fn test_single_track_advance_is_stable() {
        let button = SoundButton::new("Solo", vec![Track::local("Only", "file:///a.mp3")]);
        let mut target = PlaybackTarget::from_button(&button).unwrap();
        target.advance();
        assert_eq!(target.current_index(), 0);
        target.retreat();
        assert_eq!(target.current_index(), 0);
    }

    #[test]
    fn test_track_source_serialization() {
        let track = Track::remote("Song", "t1", "spotify:track:t1");
        let json = serde_json::to_string(&track).unwrap();
        assert!(json.contains(r#""kind":"remote"#));
        let back: Track = serde_json::from_str(&json).unwrap();
        assert_eq!(back, track);
    }
}
