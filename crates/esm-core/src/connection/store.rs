//! Connection store: the registry of cluster connection profiles
//!
//! Every add and update is checked against the live cluster before it is
//! committed. Every change rewrites the connections file; if that write fails
//! the in-memory change is rolled back.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use super::cache::ClientCache;
use super::file::{self, ConnectionsFile};
use super::types::{
    ConnectionPatch, ConnectionProfile, ConnectionSummary, HealthReport, NewConnection,
    ProbeResult, Protocol,
};
use crate::client::{ClientConfig, ClientFactory, ClusterClient};
use crate::config::{ClientSettings, StoreConfig};
use crate::error::{ConnectionError, Result};

/// Id of the bootstrap profile
pub const DEFAULT_CONNECTION_ID: &str = "default";

/// A store shared between tasks; the lock serializes whole operations
pub type SharedConnectionStore = Arc<Mutex<ConnectionStore>>;

struct Snapshot {
    connections: Vec<ConnectionProfile>,
    current: Option<String>,
}

/// Owns all connection profiles, the current-connection pointer, and the
/// per-profile client cache
pub struct ConnectionStore {
    path: PathBuf,
    connections: Vec<ConnectionProfile>,
    current: Option<String>,
    clients: ClientCache,
}

impl ConnectionStore {
    /// Open the store described by `config`, loading or bootstrapping its file
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created or the
    /// initial file cannot be written
    pub fn open(config: &StoreConfig, factory: Arc<dyn ClientFactory>) -> Result<Self> {
        let mut store = Self {
            path: config.connections_file(),
            connections: Vec::new(),
            current: None,
            clients: ClientCache::new(factory, config.client),
        };
        store.load()?;
        Ok(store)
    }

    /// Wrap the store for sharing across tasks
    #[must_use]
    pub fn into_shared(self) -> SharedConnectionStore {
        Arc::new(Mutex::new(self))
    }

    /// Path of the connections file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Settings applied to clients built by this store
    #[must_use]
    pub fn client_settings(&self) -> ClientSettings {
        self.clients.settings()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Id of the current connection
    #[must_use]
    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.connections.iter().position(|c| c.id == id)
    }

    fn find(&self, id: &str) -> Result<&ConnectionProfile> {
        self.connections
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| ConnectionError::NotFound(id.to_string()))
    }

    #[tracing::instrument(skip(self))]
    fn load(&mut self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| ConnectionError::Io {
                path: dir.to_path_buf(),
                message: e.to_string(),
            })?;
        }

        let document = match file::load(&self.path) {
            Ok(Some(document)) => document,
            Ok(None) => return self.bootstrap(),
            Err(err) => {
                tracing::warn!(error = %err, "failed to read connections file, recreating default connection");
                return self.bootstrap();
            }
        };

        let (profiles, saved_current) = document.into_profiles();
        for profile in profiles {
            match self.position(&profile.id) {
                Some(index) => {
                    tracing::warn!(connection_id = %profile.id, "duplicate connection id in file, keeping the last entry");
                    self.connections[index] = profile;
                }
                None => self.connections.push(profile),
            }
        }

        self.current = match saved_current {
            Some(id) if self.contains(&id) => Some(id),
            Some(id) => {
                tracing::warn!(connection_id = %id, "saved current connection does not exist");
                None
            }
            None => None,
        };

        tracing::debug!(
            count = self.connections.len(),
            current = ?self.current,
            "connections loaded"
        );

        if self.current.is_none() {
            if let Some(first) = self.connections.first() {
                self.current = Some(first.id.clone());
                tracing::info!(connection_id = %first.id, "no current connection saved, using the first one");
                self.persist()?;
            }
        }

        Ok(())
    }

    fn bootstrap(&mut self) -> Result<()> {
        let now = Utc::now();
        let profile = ConnectionProfile {
            id: DEFAULT_CONNECTION_ID.to_string(),
            name: "Default connection".to_string(),
            host: "localhost".to_string(),
            port: 9200,
            protocol: Protocol::Http,
            username: Some("elastic".to_string()),
            password: Some("your_password_here".to_string()),
            is_default: true,
            created_at: now,
            updated_at: now,
        };

        self.connections = vec![profile];
        self.current = Some(DEFAULT_CONNECTION_ID.to_string());
        self.persist()?;

        tracing::info!(connection_id = DEFAULT_CONNECTION_ID, "created default connection");
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        let document = ConnectionsFile::from_profiles(&self.connections, self.current.as_deref());
        file::save(&self.path, &document).map_err(|err| {
            tracing::error!(error = %err, path = %self.path.display(), "failed to save connections");
            ConnectionError::SaveFailed(err.to_string())
        })
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            connections: self.connections.clone(),
            current: self.current.clone(),
        }
    }

    /// Persist the current state, restoring `previous` if the write fails
    fn commit(&mut self, previous: Snapshot) -> Result<()> {
        if let Err(err) = self.persist() {
            self.connections = previous.connections;
            self.current = previous.current;
            return Err(err);
        }
        Ok(())
    }

    fn generate_id(&self) -> String {
        let mut millis = Utc::now().timestamp_millis();
        loop {
            let id = format!("conn_{millis}");
            if !self.contains(&id) {
                return id;
            }
            millis += 1;
        }
    }

    /// Check that the cluster behind `candidate` answers ping, health and info.
    /// Health and info are fetched concurrently after a successful ping.
    pub async fn probe(&self, candidate: &ClientConfig) -> ProbeResult {
        let client = match self.clients.factory().create(candidate) {
            Ok(client) => client,
            Err(err) => {
                return ProbeResult::Failure {
                    error: err.to_string(),
                }
            }
        };

        let outcome = async {
            client.ping().await?;
            tokio::try_join!(client.health(), client.info())
        }
        .await;

        if let Err(err) = client.close().await {
            tracing::debug!(error = %err, "failed to close probe client");
        }

        match outcome {
            Ok((health, info)) => ProbeResult::Success {
                health,
                info: info.brief(),
            },
            Err(err) => {
                tracing::debug!(node = %candidate.node, error = %err, "connection test failed");
                ProbeResult::Failure {
                    error: err.to_string(),
                }
            }
        }
    }

    /// Probe an unsaved candidate connection
    pub async fn test_connection(&self, candidate: &NewConnection) -> ProbeResult {
        self.probe(&candidate.client_config(self.client_settings()))
            .await
    }

    /// Add a profile after a successful probe and make it current if it is the
    /// only one. The returned profile includes the plaintext password.
    ///
    /// # Errors
    /// Returns an error on a missing field, a duplicate id, a failed probe, or
    /// a failed save
    #[tracing::instrument(skip(self, input), fields(name = %input.name, host = %input.host, port = input.port))]
    pub async fn add(&mut self, input: NewConnection) -> Result<ConnectionProfile> {
        input.validate()?;

        let id = match input.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => self.generate_id(),
        };
        if self.contains(&id) {
            return Err(ConnectionError::IdExists(id));
        }

        if let ProbeResult::Failure { error } = self.test_connection(&input).await {
            return Err(ConnectionError::ProbeFailed(error));
        }

        let profile = input.into_profile(id, Utc::now());
        let previous = self.snapshot();
        self.connections.push(profile.clone());
        if self.connections.len() == 1 {
            self.current = Some(profile.id.clone());
        }
        self.commit(previous)?;

        tracing::info!(connection_id = %profile.id, "connection added");
        Ok(profile)
    }

    /// Merge `patch` over an existing profile after probing the merged result
    ///
    /// # Errors
    /// Returns an error if the id is unknown, a required field would become
    /// empty, the probe fails, or the save fails
    #[tracing::instrument(skip(self, patch), fields(connection_id = %id))]
    pub async fn update(&mut self, id: &str, patch: ConnectionPatch) -> Result<ConnectionProfile> {
        let mut candidate = self.find(id)?.clone();
        patch.apply_to(&mut candidate);
        candidate.ensure_required()?;

        if let ProbeResult::Failure { error } = self
            .probe(&candidate.client_config(self.client_settings()))
            .await
        {
            return Err(ConnectionError::ProbeFailed(error));
        }

        let index = self
            .position(id)
            .ok_or_else(|| ConnectionError::NotFound(id.to_string()))?;
        candidate.updated_at = Utc::now();

        let previous = self.snapshot();
        self.connections[index] = candidate.clone();
        self.commit(previous)?;
        self.clients.evict(id);

        tracing::info!("connection updated");
        Ok(candidate)
    }

    /// Remove a profile. The current profile cannot be removed.
    ///
    /// # Errors
    /// Returns an error if the id is unknown, is the current connection, or
    /// the save fails
    #[tracing::instrument(skip(self), fields(connection_id = %id))]
    pub fn delete(&mut self, id: &str) -> Result<()> {
        let index = self
            .position(id)
            .ok_or_else(|| ConnectionError::NotFound(id.to_string()))?;
        if self.current.as_deref() == Some(id) {
            return Err(ConnectionError::ActiveConnection(id.to_string()));
        }

        let previous = self.snapshot();
        self.connections.remove(index);
        self.commit(previous)?;
        self.clients.evict(id);

        tracing::info!("connection deleted");
        Ok(())
    }

    /// Make `id` the current connection
    ///
    /// # Errors
    /// Returns an error if the id is unknown or the save fails
    #[tracing::instrument(skip(self), fields(connection_id = %id))]
    pub fn switch_current(&mut self, id: &str) -> Result<()> {
        self.find(id)?;

        let previous = self.snapshot();
        self.current = Some(id.to_string());
        self.commit(previous)?;

        tracing::info!("switched current connection");
        Ok(())
    }

    /// All profiles, redacted, in insertion order
    #[must_use]
    pub fn list(&self) -> Vec<ConnectionSummary> {
        self.connections
            .iter()
            .map(|c| c.summary(self.current.as_deref() == Some(c.id.as_str())))
            .collect()
    }

    /// The current profile, redacted
    #[must_use]
    pub fn current(&self) -> Option<ConnectionSummary> {
        let id = self.current.as_deref()?;
        self.find(id).ok().map(|c| c.summary(true))
    }

    /// Unredacted profile, for editing
    ///
    /// # Errors
    /// Returns an error if the id is unknown
    pub fn details(&self, id: &str) -> Result<ConnectionProfile> {
        self.find(id).cloned()
    }

    /// Client for `id`, or for the current connection when `id` is `None` or empty.
    /// Repeated calls for the same profile return the same handle until the
    /// profile is updated or deleted.
    ///
    /// # Errors
    /// Returns an error if no profile resolves or the client cannot be built
    pub fn get_client(&mut self, id: Option<&str>) -> Result<Arc<dyn ClusterClient>> {
        let id = id
            .filter(|id| !id.is_empty())
            .or(self.current.as_deref())
            .ok_or(ConnectionError::NoActiveConnection)?;

        let profile = self
            .connections
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| ConnectionError::NotFound(id.to_string()))?;

        self.clients
            .get(profile)
            .map_err(|e| ConnectionError::Client(e.to_string()))
    }

    /// Connectivity of `id` (or the current connection). Never an error:
    /// failures are reported in the result.
    #[tracing::instrument(skip(self))]
    pub async fn check_health(&mut self, id: Option<&str>) -> HealthReport {
        let client = match self.get_client(id) {
            Ok(client) => client,
            Err(err) => return HealthReport::disconnected(err.to_string()),
        };

        match tokio::try_join!(client.health(), client.info()) {
            Ok((health, info)) => HealthReport::connected(health, info),
            Err(err) => {
                tracing::debug!(error = %err, "health check failed");
                HealthReport::disconnected(err.to_string())
            }
        }
    }

    /// Whether a client handle is cached for `id`
    #[must_use]
    pub fn has_cached_client(&self, id: &str) -> bool {
        self.clients.contains(id)
    }
}
