//! # Remote Playback Core
//!
//! Integration with the remote streaming service: catalog search over
//! the Web API, the embedded player's device lifecycle, and playback
//! control with resume-vs-restart handling.

pub mod client;
pub mod error;
pub mod session;
pub mod types;

pub use client::RemoteCatalogClient;
pub use error::{RemoteError, Result};
pub use session::{RemoteSessionController, RemoteSnapshot, SessionState};
pub use types::{CatalogItem, DeviceInfo, SearchKind};
