//! Remote Player Abstraction
//!
//! Commands for the streaming-service playback SDK session and the lifecycle
//! events it raises. The handle controls the local SDK device only; loading
//! tracks onto that device goes through the Web API, not this trait.

use async_trait::async_trait;

use crate::error::Result;

/// Remote playback SDK session commands
#[async_trait]
pub trait RemotePlayerHandle: Send + Sync {
    /// Connect the SDK session; `Ok(false)` means the SDK refused the
    /// connection without raising an error event
    async fn connect(&self) -> Result<bool>;

    /// Pause playback on the SDK device
    async fn pause(&self) -> Result<()>;

    /// Resume playback on the SDK device from the current position
    async fn resume(&self) -> Result<()>;

    /// Set the SDK device volume, 0.0 to 1.0
    async fn set_volume(&self, level: f32) -> Result<()>;
}

/// Lifecycle and error events raised by the remote playback SDK
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemotePlayerEvent {
    /// The SDK device came online and can accept playback transfer
    Ready { device_id: String },
    /// The SDK device went offline
    NotReady { device_id: String },
    /// The SDK failed to initialize
    InitializationError { message: String },
    /// The SDK rejected the access token
    AuthenticationError { message: String },
    /// The account cannot use SDK playback (e.g. no premium subscription)
    AccountError { message: String },
    /// A track failed to play on the SDK device
    PlaybackError { message: String },
    /// The SDK player state changed
    StateChanged { paused: bool },
}
