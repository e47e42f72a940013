//! Workspace umbrella crate.
//!
//! Host applications can depend on `sounddeck` and reach every workspace
//! crate through the re-exports below instead of wiring each member
//! individually: the bridge trait seams (`bridge_traits`), their desktop
//! implementations (`bridge_desktop`), and the core layers (`core_runtime`,
//! `core_auth`, `core_remote`, `core_playback`).

pub use bridge_desktop;
pub use bridge_traits;
pub use core_auth;
pub use core_playback;
pub use core_remote;
pub use core_runtime;
