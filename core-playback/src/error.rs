//! Playback error types.

use bridge_traits::MediaError;
use core_remote::RemoteError;
use thiserror::Error;

/// Errors from the unified playback layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// The button has no tracks assigned.
    #[error("Button has no tracks")]
    NoTracks,

    /// A local track has no source URL.
    #[error("Local track has no source URL")]
    MissingLocalUrl,

    /// The local media backend failed.
    #[error("Local playback failed: {0}")]
    Local(#[from] MediaError),

    /// The remote streaming layer failed.
    #[error("Remote playback failed: {0}")]
    Remote(#[from] RemoteError),
}

pub type Result<T> = std::result::Result<T, PlaybackError>;
