//! On-disk connections document
//!
//! The whole document is rewritten on every change. Writes go to a temporary
//! file in the same directory which is then renamed over the target, so a
//! crash mid-write never leaves a truncated file behind.

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;

use super::obfuscate::{obfuscate, reveal};
use super::types::ConnectionProfile;
use crate::error::{ConnectionError, Result};

/// Persisted form of the connection store. Passwords are obfuscated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionsFile {
    #[serde(default, deserialize_with = "skip_invalid_profiles")]
    pub connections: Vec<ConnectionProfile>,
    #[serde(default)]
    pub current_connection: Option<String>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl ConnectionsFile {
    /// Build the document from in-memory profiles, obfuscating passwords
    #[must_use]
    pub fn from_profiles(profiles: &[ConnectionProfile], current: Option<&str>) -> Self {
        let connections = profiles
            .iter()
            .map(|profile| ConnectionProfile {
                password: profile
                    .password
                    .as_deref()
                    .filter(|p| !p.is_empty())
                    .map(obfuscate),
                ..profile.clone()
            })
            .collect();

        Self {
            connections,
            current_connection: current.map(str::to_string),
            updated_at: Utc::now(),
        }
    }

    /// Recover plaintext profiles and the saved current id (empty ids become `None`)
    #[must_use]
    pub fn into_profiles(self) -> (Vec<ConnectionProfile>, Option<String>) {
        let profiles = self
            .connections
            .into_iter()
            .map(|mut profile| {
                profile.password = profile
                    .password
                    .filter(|p| !p.is_empty())
                    .map(|p| reveal(&p));
                profile
            })
            .collect();

        let current = self.current_connection.filter(|id| !id.is_empty());
        (profiles, current)
    }
}

/// Parse profiles one entry at a time so a single bad entry does not
/// discard the rest of the file.
fn skip_invalid_profiles<'de, D>(deserializer: D) -> std::result::Result<Vec<ConnectionProfile>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<Value>::deserialize(deserializer)?;
    let profiles = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let id = entry.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
            match serde_json::from_value::<ConnectionProfile>(entry) {
                Ok(profile) => Some(profile),
                Err(err) => {
                    tracing::warn!(index, connection_id = %id, error = %err, "skipping invalid connection entry");
                    None
                }
            }
        })
        .collect();
    Ok(profiles)
}

/// Read the document at `path`.
///
/// Returns `Ok(None)` when the file is missing or blank. Entries in
/// `connections` that do not parse are skipped.
///
/// # Errors
/// Returns an error if the file cannot be read or is not a valid document
pub fn load(path: &Path) -> Result<Option<ConnectionsFile>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).map_err(|e| ConnectionError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if content.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| ConnectionError::JsonParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Write the document to `path` as formatted JSON, replacing any previous file
///
/// # Errors
/// Returns an error if the directory cannot be created or the file cannot be written
pub fn save(path: &Path, document: &ConnectionsFile) -> Result<()> {
    let io_err = |e: std::io::Error| ConnectionError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(io_err)?;

    let content = serde_json::to_string_pretty(document).map_err(|e| ConnectionError::JsonParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(content.as_bytes()).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    Ok(())
}
