//! Per-profile client cache

use std::collections::HashMap;
use std::sync::Arc;

use crate::client::{ClientFactory, ClusterClient};
use crate::config::ClientSettings;
use crate::error::ClientError;

use super::types::ConnectionProfile;

/// Maps profile id to a shared client handle, building handles on first use.
///
/// Evicting an entry only drops the cache's reference; callers still holding
/// the handle keep using it.
pub struct ClientCache {
    factory: Arc<dyn ClientFactory>,
    settings: ClientSettings,
    clients: HashMap<String, Arc<dyn ClusterClient>>,
}

impl ClientCache {
    #[must_use]
    pub fn new(factory: Arc<dyn ClientFactory>, settings: ClientSettings) -> Self {
        Self {
            factory,
            settings,
            clients: HashMap::new(),
        }
    }

    /// Cached handle for `profile`, built and cached if absent
    ///
    /// # Errors
    /// Returns an error if the factory cannot build a client for the profile
    pub fn get(&mut self, profile: &ConnectionProfile) -> Result<Arc<dyn ClusterClient>, ClientError> {
        if let Some(client) = self.clients.get(&profile.id) {
            tracing::debug!(connection_id = %profile.id, "client cache hit");
            return Ok(Arc::clone(client));
        }

        tracing::debug!(connection_id = %profile.id, "client cache miss, building client");
        let client = self.factory.create(&profile.client_config(self.settings))?;
        self.clients.insert(profile.id.clone(), Arc::clone(&client));
        Ok(client)
    }

    /// Drop the cached handle for `id`; returns whether one was cached
    pub fn evict(&mut self, id: &str) -> bool {
        let evicted = self.clients.remove(id).is_some();
        if evicted {
            tracing::debug!(connection_id = %id, "evicted cached client");
        }
        evicted
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.clients.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Factory used for cached and transient clients
    #[must_use]
    pub fn factory(&self) -> &dyn ClientFactory {
        self.factory.as_ref()
    }

    #[must_use]
    pub fn settings(&self) -> ClientSettings {
        self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientConfig, ClusterInfo};
    use crate::connection::types::NewConnection;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct IdleClient;

    #[async_trait]
    impl ClusterClient for IdleClient {
        async fn ping(&self) -> Result<(), ClientError> {
            Ok(())
        }

        async fn health(&self) -> Result<Value, ClientError> {
            Ok(json!({ "status": "green" }))
        }

        async fn info(&self) -> Result<ClusterInfo, ClientError> {
            Ok(ClusterInfo::default())
        }

        async fn close(&self) -> Result<(), ClientError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingFactory(AtomicUsize);

    impl ClientFactory for CountingFactory {
        fn create(&self, _config: &ClientConfig) -> Result<Arc<dyn ClusterClient>, ClientError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(IdleClient))
        }
    }

    fn profile(id: &str) -> ConnectionProfile {
        NewConnection::new(id, "localhost", 9200).into_profile(id.to_string(), Utc::now())
    }

    #[test]
    fn test_get_builds_once_per_profile() {
        let factory = Arc::new(CountingFactory::default());
        let mut cache = ClientCache::new(factory.clone(), ClientSettings::default());
        assert!(cache.is_empty());

        let first = cache.get(&profile("a")).unwrap();
        let again = cache.get(&profile("a")).unwrap();
        cache.get(&profile("b")).unwrap();

        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(cache.len(), 2);
        assert_eq!(factory.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_evict_forces_rebuild() {
        let factory = Arc::new(CountingFactory::default());
        let mut cache = ClientCache::new(factory.clone(), ClientSettings::default());

        let first = cache.get(&profile("a")).unwrap();
        assert!(cache.evict("a"));
        assert!(!cache.evict("a"));
        assert!(!cache.contains("a"));
        assert!(cache.is_empty());

        let rebuilt = cache.get(&profile("a")).unwrap();
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert_eq!(factory.0.load(Ordering::SeqCst), 2);
    }
}
