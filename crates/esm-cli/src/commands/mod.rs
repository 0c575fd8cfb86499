//! CLI command handlers

pub mod connection;
pub mod health;
