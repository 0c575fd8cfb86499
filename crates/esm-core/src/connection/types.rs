//! Connection profile types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::client::{ClientConfig, ClusterInfo};
use crate::config::ClientSettings;
use crate::error::{ConnectionError, Result};

/// Marker shown in place of a stored password
pub const PASSWORD_MASK: &str = "******";

/// Transport scheme of a cluster endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Https => write!(f, "https"),
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            other => Err(format!("Invalid protocol: {other} (expected http or https)")),
        }
    }
}

impl<'de> Deserialize<'de> for Protocol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A named, persisted cluster endpoint with optional credentials.
///
/// `password` is plaintext in memory; it is obfuscated only in the
/// connections file.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProfile {
    /// Unique, immutable identifier
    pub id: String,
    /// Human label
    pub name: String,
    pub host: String,
    #[serde(deserialize_with = "port_from_number_or_string")]
    pub port: u16,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Set only on the automatically created bootstrap profile
    #[serde(default)]
    pub is_default: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| PASSWORD_MASK))
            .field("is_default", &self.is_default)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl ConnectionProfile {
    /// Client configuration for this profile's coordinates and credentials
    #[must_use]
    pub fn client_config(&self, settings: ClientSettings) -> ClientConfig {
        ClientConfig::new(self.protocol, &self.host, self.port, settings)
            .with_auth(self.username.as_deref(), self.password.as_deref())
    }

    /// Redacted view for listings
    #[must_use]
    pub fn summary(&self, is_current: bool) -> ConnectionSummary {
        ConnectionSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            host: self.host.clone(),
            port: self.port,
            protocol: self.protocol,
            username: self.username.clone(),
            password: self
                .password
                .as_deref()
                .filter(|p| !p.is_empty())
                .map(|_| PASSWORD_MASK.to_string()),
            is_default: self.is_default,
            is_current,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub(crate) fn ensure_required(&self) -> Result<()> {
        require(&self.name, &self.host, self.port)
    }
}

fn require(name: &str, host: &str, port: u16) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ConnectionError::MissingField("name".into()));
    }
    if host.trim().is_empty() {
        return Err(ConnectionError::MissingField("host".into()));
    }
    if port == 0 {
        return Err(ConnectionError::MissingField("port".into()));
    }
    Ok(())
}

fn port_from_number_or_string<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(n) => Ok(n),
        Port::Text(s) if s.trim().is_empty() => Ok(0),
        Port::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Input for adding a connection.
///
/// Empty strings and a zero port count as missing, so a partially filled
/// form deserializes and then fails validation with the first missing field.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewConnection {
    /// Caller-chosen id; generated as `conn_<millis>` when absent
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub host: String,
    #[serde(default, deserialize_with = "port_from_number_or_string")]
    pub port: u16,
    #[serde(default)]
    pub protocol: Option<Protocol>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl fmt::Debug for NewConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewConnection")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| PASSWORD_MASK))
            .finish()
    }
}

impl NewConnection {
    /// Create input with the three required fields
    #[must_use]
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Check that `name`, `host` and `port` are present, in that order
    ///
    /// # Errors
    /// Returns [`ConnectionError::MissingField`] naming the first missing field
    pub fn validate(&self) -> Result<()> {
        require(&self.name, &self.host, self.port)
    }

    /// Client configuration for probing this candidate
    #[must_use]
    pub fn client_config(&self, settings: ClientSettings) -> ClientConfig {
        ClientConfig::new(
            self.protocol.unwrap_or_default(),
            &self.host,
            self.port,
            settings,
        )
        .with_auth(self.username.as_deref(), self.password.as_deref())
    }

    pub(crate) fn into_profile(self, id: String, now: DateTime<Utc>) -> ConnectionProfile {
        ConnectionProfile {
            id,
            name: self.name,
            host: self.host,
            port: self.port,
            protocol: self.protocol.unwrap_or_default(),
            username: self.username.filter(|u| !u.is_empty()),
            password: self.password.filter(|p| !p.is_empty()),
            is_default: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Typed partial update; only the mutable fields can be changed.
///
/// Setting `username` or `password` to an empty string clears it.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConnectionPatch {
    pub name: Option<String>,
    pub host: Option<String>,
    #[serde(default, deserialize_with = "optional_port")]
    pub port: Option<u16>,
    pub protocol: Option<Protocol>,
    pub username: Option<String>,
    pub password: Option<String>,
}

fn optional_port<'de, D>(deserializer: D) -> std::result::Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    port_from_number_or_string(deserializer).map(Some)
}

impl fmt::Debug for ConnectionPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPatch")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| PASSWORD_MASK))
            .finish()
    }
}

impl ConnectionPatch {
    /// True when the patch changes nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.host.is_none()
            && self.port.is_none()
            && self.protocol.is_none()
            && self.username.is_none()
            && self.password.is_none()
    }

    /// Merge the patch over `profile`; `id` and timestamps are untouched
    pub fn apply_to(self, profile: &mut ConnectionProfile) {
        if let Some(name) = self.name {
            profile.name = name;
        }
        if let Some(host) = self.host {
            profile.host = host;
        }
        if let Some(port) = self.port {
            profile.port = port;
        }
        if let Some(protocol) = self.protocol {
            profile.protocol = protocol;
        }
        if let Some(username) = self.username {
            profile.username = Some(username).filter(|u| !u.is_empty());
        }
        if let Some(password) = self.password {
            profile.password = Some(password).filter(|p| !p.is_empty());
        }
    }
}

/// Redacted profile as returned by listings
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSummary {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// [`PASSWORD_MASK`] when a password is stored, absent otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub is_default: bool,
    pub is_current: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of a connection test. Never an error: failures are captured.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeResult {
    Success { health: Value, info: ClusterInfo },
    Failure { error: String },
}

impl ProbeResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Failure message, if the probe failed
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error } => Some(error),
        }
    }
}

impl Serialize for ProbeResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Success { health, info } => {
                let mut state = serializer.serialize_struct("ProbeResult", 3)?;
                state.serialize_field("success", &true)?;
                state.serialize_field("health", health)?;
                state.serialize_field("info", info)?;
                state.end()
            }
            Self::Failure { error } => {
                let mut state = serializer.serialize_struct("ProbeResult", 2)?;
                state.serialize_field("success", &false)?;
                state.serialize_field("error", error)?;
                state.end()
            }
        }
    }
}

/// Connectivity status of a stored connection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<ClusterInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthReport {
    #[must_use]
    pub fn connected(health: Value, info: ClusterInfo) -> Self {
        Self {
            connected: true,
            health: Some(health),
            info: Some(info),
            error: None,
        }
    }

    #[must_use]
    pub fn disconnected(error: impl Into<String>) -> Self {
        Self {
            connected: false,
            health: None,
            info: None,
            error: Some(error.into()),
        }
    }
}
