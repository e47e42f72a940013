//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the core crates and platform-specific
//! implementations. Each trait represents a capability that the core requires but
//! that must be implemented differently per host (desktop app, embedded web view,
//! test harness).
//!
//! ## Traits
//!
//! ### Networking & Storage
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations with retry and TLS
//! - [`KeyValueStore`](storage::KeyValueStore) - String key/value storage; the
//!   core is handed two instances with different scopes (session vs. origin)
//!
//! ### Playback
//! - [`LocalMediaBackend`](media::LocalMediaBackend) - The in-process audio element
//! - [`RemotePlayerHandle`](remote::RemotePlayerHandle) - The streaming SDK session
//!
//! ### Utilities
//! - [`UserAgent`](browser::UserAgent) - Full-page navigation for OAuth redirects
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Fail-Fast Strategy
//!
//! The core should fail fast with descriptive errors when a required capability
//! is missing; see `core_runtime::config::CoreConfig`.
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type for
//! consistent error handling, except [`LocalMediaBackend`](media::LocalMediaBackend)
//! whose failures carry playback classification and use
//! [`MediaError`](media::MediaError). Platform implementations should:
//!
//! - Convert platform-specific errors to the trait's error type
//! - Provide actionable error messages
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent
//! usage across async tasks.

pub mod browser;
pub mod error;
pub mod http;
pub mod media;
pub mod remote;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use browser::UserAgent;
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use media::{LocalMediaBackend, MediaError, MediaEvent, MediaResult};
pub use remote::{RemotePlayerEvent, RemotePlayerHandle};
pub use storage::KeyValueStore;
pub use time::{Clock, SystemClock};
