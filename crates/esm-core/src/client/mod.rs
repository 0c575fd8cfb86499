//! Cluster client abstraction
//!
//! The connection store never talks HTTP itself. It builds clients through a
//! [`ClientFactory`] and drives them through the [`ClusterClient`] trait, so
//! tests can substitute an in-process fake.

mod http;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ClientSettings;
use crate::connection::Protocol;
use crate::error::ClientError;

pub use http::{HttpClientFactory, HttpClusterClient};

/// Basic-auth credentials for a cluster node
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"******")
            .finish()
    }
}

/// Everything needed to build a client for one cluster endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Node URL, `{protocol}://{host}:{port}`
    pub node: String,
    /// Present only when both username and password are non-empty
    pub auth: Option<BasicAuth>,
    /// Timeouts and retry policy
    pub settings: ClientSettings,
}

impl ClientConfig {
    /// Build a config for the given coordinates without credentials
    #[must_use]
    pub fn new(protocol: Protocol, host: &str, port: u16, settings: ClientSettings) -> Self {
        Self {
            node: format!("{protocol}://{host}:{port}"),
            auth: None,
            settings,
        }
    }

    /// Attach credentials; ignored unless both parts are non-empty
    #[must_use]
    pub fn with_auth(mut self, username: Option<&str>, password: Option<&str>) -> Self {
        self.auth = match (username, password) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some(BasicAuth {
                username: u.to_string(),
                password: p.to_string(),
            }),
            _ => None,
        };
        self
    }
}

/// Response of the cluster root endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
}

impl ClusterInfo {
    /// Reduced view reported by a connection test: name, cluster name, version
    #[must_use]
    pub fn brief(&self) -> Self {
        Self {
            name: self.name.clone(),
            cluster_name: self.cluster_name.clone(),
            version: self.version.clone(),
            ..Self::default()
        }
    }

    /// Version number string, when the cluster reported one
    #[must_use]
    pub fn version_number(&self) -> Option<&str> {
        self.version.as_ref()?.get("number")?.as_str()
    }
}

/// A logical connection to one cluster endpoint
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Cheap liveness check
    async fn ping(&self) -> Result<(), ClientError>;

    /// Raw cluster health document
    async fn health(&self) -> Result<Value, ClientError>;

    /// Cluster identity and version
    async fn info(&self) -> Result<ClusterInfo, ClientError>;

    /// Release the client's resources
    async fn close(&self) -> Result<(), ClientError>;
}

/// Builds cluster clients from a [`ClientConfig`]
pub trait ClientFactory: Send + Sync {
    /// Create a new, independent client
    ///
    /// # Errors
    /// Returns an error if the configuration cannot produce a client
    fn create(&self, config: &ClientConfig) -> Result<Arc<dyn ClusterClient>, ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_url() {
        let config = ClientConfig::new(Protocol::Https, "es.local", 9243, ClientSettings::default());
        assert_eq!(config.node, "https://es.local:9243");
        assert!(config.auth.is_none());
    }

    #[test]
    fn test_auth_requires_both_parts() {
        let base = ClientConfig::new(Protocol::Http, "localhost", 9200, ClientSettings::default());

        let full = base.clone().with_auth(Some("elastic"), Some("secret"));
        assert_eq!(
            full.auth,
            Some(BasicAuth {
                username: "elastic".into(),
                password: "secret".into(),
            })
        );

        assert!(base.clone().with_auth(Some("elastic"), None).auth.is_none());
        assert!(base.clone().with_auth(None, Some("secret")).auth.is_none());
        assert!(base.with_auth(Some("elastic"), Some("")).auth.is_none());
    }

    #[test]
    fn test_auth_debug_hides_password() {
        let auth = BasicAuth {
            username: "elastic".into(),
            password: "hunter2".into(),
        };
        let rendered = format!("{auth:?}");
        assert!(rendered.contains("elastic"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_brief_info() {
        let info = ClusterInfo {
            name: Some("node-1".into()),
            cluster_name: Some("prod".into()),
            cluster_uuid: Some("abc".into()),
            version: Some(serde_json::json!({ "number": "8.10.0" })),
            tagline: Some("You Know, for Search".into()),
        };
        let brief = info.brief();
        assert_eq!(brief.name.as_deref(), Some("node-1"));
        assert_eq!(brief.version_number(), Some("8.10.0"));
        assert!(brief.cluster_uuid.is_none());
        assert!(brief.tagline.is_none());
    }
}
