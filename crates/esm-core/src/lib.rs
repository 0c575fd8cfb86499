//! ESM Core - Elasticsearch connection manager
//!
//! This crate owns the set of cluster connection profiles, the active-profile
//! pointer, their JSON persistence, and one cached cluster client per profile.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

pub mod client;
pub mod config;
pub mod connection;
pub mod error;

pub use client::{ClientConfig, ClientFactory, ClusterClient, HttpClientFactory};
pub use config::{ClientSettings, StoreConfig};
pub use connection::{
    ConnectionPatch, ConnectionProfile, ConnectionStore, ConnectionSummary, HealthReport,
    NewConnection, ProbeResult, Protocol, SharedConnectionStore,
};
pub use error::{ClientError, ConnectionError, Result};
