//! Error types for connection and cluster client operations

use std::path::PathBuf;
use thiserror::Error;

/// Result type for connection store operations
pub type Result<T> = std::result::Result<T, ConnectionError>;

/// Errors that can occur during connection store operations
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// A required field was absent or empty
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// A profile with the same id is already stored
    #[error("Connection ID already exists: {0}")]
    IdExists(String),

    /// The candidate cluster could not be reached or queried
    #[error("Connection test failed: {0}")]
    ProbeFailed(String),

    /// No stored profile has the given id
    #[error("Connection not found: {0}")]
    NotFound(String),

    /// The profile is the current one and cannot be removed
    #[error("Cannot delete the active connection '{0}', switch to another connection first")]
    ActiveConnection(String),

    /// Neither an explicit id nor a current connection is available
    #[error("No active connection")]
    NoActiveConnection,

    /// A client could not be built for a stored profile
    #[error("Failed to create client: {0}")]
    Client(String),

    /// Writing the connections file failed
    #[error("Failed to save connections: {0}")]
    SaveFailed(String),

    /// File I/O error
    #[error("I/O error for {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// JSON parse error
    #[error("JSON parse error in {path}: {message}")]
    JsonParse { path: PathBuf, message: String },
}

impl ConnectionError {
    /// Get the error code for CLI/API responses
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "VALIDATION_ERROR",
            Self::IdExists(_) => "ID_EXISTS",
            Self::ProbeFailed(_) => "PROBE_FAILED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::ActiveConnection(_) => "ACTIVE_CONNECTION",
            Self::NoActiveConnection => "NO_ACTIVE_CONNECTION",
            Self::Client(_) => "CLIENT_ERROR",
            Self::SaveFailed(_) => "SAVE_FAILED",
            Self::Io { .. } => "IO_ERROR",
            Self::JsonParse { .. } => "PARSE_ERROR",
        }
    }
}

/// Errors raised by a cluster client
#[derive(Debug, Error)]
pub enum ClientError {
    /// The client could not be built from the given configuration
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    /// Transport-level failure (connection refused, DNS, TLS, ...)
    #[error("Request failed: {0}")]
    Request(String),

    /// The request did not complete in time
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The cluster answered with a non-success status
    #[error("Cluster returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not what we expected
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}
