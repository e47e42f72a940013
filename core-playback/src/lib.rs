//! # Playback Core
//!
//! The soundboard's unified playback engine. A [`PlaybackOrchestrator`]
//! routes play/pause/stop/skip/seek/volume commands to whichever
//! backend the current track needs: the local media backend for files,
//! or the remote streaming device for catalog tracks.

pub mod error;
pub mod orchestrator;
pub mod types;

pub use error::{PlaybackError, Result};
pub use orchestrator::{PlaybackOrchestrator, DEFAULT_VOLUME};
pub use types::{
    ButtonId, PhaseKind, PlaybackPhase, PlaybackStatus, PlaybackTarget, SoundButton, Track,
    TrackSource,
};
