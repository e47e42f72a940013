//! # Desktop Bridge
//!
//! Desktop implementations of the platform traits in `bridge-traits`:
//! HTTP via reqwest, key/value storage via SQLite, and the system
//! browser as the OAuth user agent.

pub mod browser;
pub mod http;
pub mod storage;

pub use browser::BrowserUserAgent;
pub use http::ReqwestHttpClient;
pub use storage::{MemoryKeyValueStore, SqliteKeyValueStore};
