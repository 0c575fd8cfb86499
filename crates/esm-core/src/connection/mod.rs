//! Connection profiles, their persistence, and the store that owns them

pub mod cache;
pub mod file;
pub mod obfuscate;
pub mod store;
mod types;

pub use cache::ClientCache;
pub use file::ConnectionsFile;
pub use store::{ConnectionStore, SharedConnectionStore, DEFAULT_CONNECTION_ID};
pub use types::*;
