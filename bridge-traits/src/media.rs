//! Local Media Backend Abstraction
//!
//! Commands for the in-process audio element and the signals it raises back
//! into the core. The backend holds at most one source at a time; loading a
//! new source replaces the previous one.

use async_trait::async_trait;
use thiserror::Error;

/// Failures the local audio element can report
///
/// Variants carry user-facing messages; the orchestrator surfaces them
/// verbatim as `last_error`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("Audio format not supported or file not found")]
    SourceUnsupported,

    #[error("Audio playback was blocked; user interaction may be required")]
    PlaybackBlocked,

    #[error("Audio playback was interrupted")]
    Interrupted,

    #[error("Audio backend failure: {0}")]
    Backend(String),
}

pub type MediaResult<T> = std::result::Result<T, MediaError>;

/// Local audio element command surface
///
/// All commands address the single current source. `set_source` followed by
/// `play` is the start sequence; `play` after `pause` resumes from the
/// current position.
#[async_trait]
pub trait LocalMediaBackend: Send + Sync {
    /// Load a new source URL, replacing the current one and resetting position
    async fn set_source(&self, url: &str) -> MediaResult<()>;

    /// Begin or resume playback of the current source
    async fn play(&self) -> MediaResult<()>;

    /// Pause playback, keeping the current position
    async fn pause(&self) -> MediaResult<()>;

    /// Seek to an absolute position in seconds
    async fn set_position(&self, seconds: f64) -> MediaResult<()>;

    /// Set output volume, 0.0 (silent) to 1.0 (full)
    async fn set_volume(&self, level: f32) -> MediaResult<()>;
}

/// Signals raised by the local audio element
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Playback position advanced
    TimeUpdate { seconds: f64 },
    /// Duration of the current source became known
    DurationKnown { seconds: f64 },
    /// The current source played to its natural end
    Ended,
    /// Playback failed
    Error { error: MediaError },
}
