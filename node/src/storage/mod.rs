//! Chunk storage.

mod database;
mod local;

use std::collections::HashSet;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use sea_orm::DatabaseConnection;
use tokio::time;

use crate::config::{BackendConfig, StorageConfig};
use crate::error::{NodeError, NodeResult};

pub use self::database::DatabaseBackend;
pub use self::local::{LocalBackend, LocalStorageConfig};

/// A storage provider.
///
/// A provider holds opaque chunk payloads. Each payload is addressed
/// by the chunk ID together with the location token returned by
/// `store`. Tokens are provider-specific and must be passed back
/// verbatim.
#[async_trait::async_trait]
pub trait StorageProvider: Send + Sync + Debug {
    /// Returns the stable ID chunk descriptors use to refer to this provider.
    fn id(&self) -> &str;

    /// Returns a human-readable label.
    fn display_name(&self) -> &str;

    /// Stores a payload, returning its location token.
    ///
    /// Storing the same chunk ID again overwrites the payload.
    async fn store(&self, chunk_id: &str, data: Bytes) -> NodeResult<String>;

    /// Retrieves a payload.
    async fn retrieve(&self, chunk_id: &str, location: &str) -> NodeResult<Bytes>;

    /// Deletes a payload.
    ///
    /// Returns false if there was nothing to delete.
    async fn delete(&self, chunk_id: &str, location: &str) -> NodeResult<bool>;

    /// Returns whether a payload exists.
    async fn exists(&self, chunk_id: &str, location: &str) -> NodeResult<bool>;

    /// Performs a cheap round-trip to check that the provider works.
    async fn health_check(&self) -> bool;
}

/// The health of a storage provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderHealth {
    pub provider_id: String,
    pub display_name: String,
    pub healthy: bool,
}

/// The registered storage providers.
///
/// The set is immutable once constructed. The order of providers is
/// significant for placement.
#[derive(Debug)]
pub struct ProviderSet {
    providers: Vec<Arc<dyn StorageProvider>>,

    /// Upper bound for a single provider call.
    operation_timeout: Duration,
}

impl ProviderSet {
    pub fn new(
        providers: Vec<Arc<dyn StorageProvider>>,
        operation_timeout: Duration,
    ) -> NodeResult<Self> {
        let mut seen = HashSet::new();
        for provider in &providers {
            if !seen.insert(provider.id().to_owned()) {
                return Err(NodeError::invalid_input(format!(
                    "Storage provider \"{}\" is registered more than once",
                    provider.id()
                )));
            }
        }

        Ok(Self {
            providers,
            operation_timeout,
        })
    }

    /// Builds the providers from the configuration.
    pub async fn from_config(
        config: &StorageConfig,
        database: &DatabaseConnection,
    ) -> NodeResult<Self> {
        let mut providers: Vec<Arc<dyn StorageProvider>> = Vec::new();

        for provider in &config.providers {
            let name = provider.display_name().to_owned();

            match &provider.backend {
                BackendConfig::Local(local_config) => {
                    let local =
                        LocalBackend::new(provider.id.clone(), name, local_config.clone()).await?;
                    providers.push(Arc::new(local));
                }
                BackendConfig::Database => {
                    let db = DatabaseBackend::new(provider.id.clone(), name, database.clone());
                    providers.push(Arc::new(db));
                }
            }
        }

        Self::new(providers, config.operation_timeout)
    }

    /// Returns the provider with an ID.
    pub fn get(&self, provider_id: &str) -> Option<&Arc<dyn StorageProvider>> {
        self.providers.iter().find(|p| p.id() == provider_id)
    }

    /// Returns the provider with an ID, or fails if it's not registered.
    pub fn resolve(&self, provider_id: &str) -> NodeResult<&Arc<dyn StorageProvider>> {
        self.get(provider_id)
            .ok_or_else(|| NodeError::NoSuchProvider {
                provider_id: provider_id.to_owned(),
            })
    }

    /// Returns the provider at a position.
    pub fn at(&self, index: usize) -> Option<&Arc<dyn StorageProvider>> {
        self.providers.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn StorageProvider>> {
        self.providers.iter()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn operation_timeout(&self) -> Duration {
        self.operation_timeout
    }

    /// Runs a provider call, failing if it takes longer than the operation timeout.
    pub async fn bounded<T, F>(&self, fut: F) -> NodeResult<T>
    where
        F: Future<Output = NodeResult<T>>,
    {
        match time::timeout(self.operation_timeout, fut).await {
            Ok(r) => r,
            Err(_) => Err(NodeError::StorageTimeout(self.operation_timeout)),
        }
    }

    /// Checks the health of all providers concurrently.
    pub async fn check_health(&self) -> Vec<ProviderHealth> {
        let futures = self.providers.iter().map(|provider| async move {
            let healthy = time::timeout(self.operation_timeout, provider.health_check())
                .await
                .unwrap_or(false);

            if !healthy {
                tracing::warn!("Storage provider \"{}\" is unhealthy", provider.id());
            }

            ProviderHealth {
                provider_id: provider.id().to_owned(),
                display_name: provider.display_name().to_owned(),
                healthy,
            }
        });

        futures::future::join_all(futures).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// An in-memory provider for tests.
    ///
    /// It can be told to start failing after a number of stores.
    #[derive(Debug)]
    pub struct MemoryProvider {
        id: String,
        payloads: Mutex<HashMap<String, Bytes>>,
        fail_after: Option<usize>,
        stores: AtomicUsize,
    }

    impl MemoryProvider {
        pub fn new(id: &str) -> Self {
            Self {
                id: id.to_owned(),
                payloads: Mutex::new(HashMap::new()),
                fail_after: None,
                stores: AtomicUsize::new(0),
            }
        }

        pub fn failing_after(id: &str, stores: usize) -> Self {
            Self {
                fail_after: Some(stores),
                ..Self::new(id)
            }
        }

        pub fn len(&self) -> usize {
            self.payloads.lock().unwrap().len()
        }

        pub fn corrupt(&self, chunk_id: &str) {
            let mut payloads = self.payloads.lock().unwrap();
            let data = payloads.get_mut(chunk_id).unwrap();
            let mut flipped = data.to_vec();
            flipped[0] ^= 0xff;
            *data = Bytes::from(flipped);
        }
    }

    #[async_trait::async_trait]
    impl StorageProvider for MemoryProvider {
        fn id(&self) -> &str {
            &self.id
        }

        fn display_name(&self) -> &str {
            "Memory"
        }

        async fn store(&self, chunk_id: &str, data: Bytes) -> NodeResult<String> {
            let n = self.stores.fetch_add(1, Ordering::SeqCst);
            if let Some(limit) = self.fail_after {
                if n >= limit {
                    return Err(NodeError::StorageError(anyhow::anyhow!("disk full")));
                }
            }

            self.payloads
                .lock()
                .unwrap()
                .insert(chunk_id.to_owned(), data);
            Ok(chunk_id.to_owned())
        }

        async fn retrieve(&self, chunk_id: &str, location: &str) -> NodeResult<Bytes> {
            self.payloads
                .lock()
                .unwrap()
                .get(location)
                .cloned()
                .ok_or_else(|| NodeError::NoSuchChunk {
                    chunk_id: chunk_id.to_owned(),
                    provider_id: self.id.clone(),
                })
        }

        async fn delete(&self, _chunk_id: &str, location: &str) -> NodeResult<bool> {
            Ok(self.payloads.lock().unwrap().remove(location).is_some())
        }

        async fn exists(&self, _chunk_id: &str, location: &str) -> NodeResult<bool> {
            Ok(self.payloads.lock().unwrap().contains_key(location))
        }

        async fn health_check(&self) -> bool {
            self.fail_after.is_none()
        }
    }

    /// A provider that never answers.
    #[derive(Debug)]
    pub struct StalledProvider;

    #[async_trait::async_trait]
    impl StorageProvider for StalledProvider {
        fn id(&self) -> &str {
            "stalled"
        }

        fn display_name(&self) -> &str {
            "Stalled"
        }

        async fn store(&self, _chunk_id: &str, _data: Bytes) -> NodeResult<String> {
            futures::future::pending().await
        }

        async fn retrieve(&self, _chunk_id: &str, _location: &str) -> NodeResult<Bytes> {
            futures::future::pending().await
        }

        async fn delete(&self, _chunk_id: &str, _location: &str) -> NodeResult<bool> {
            futures::future::pending().await
        }

        async fn exists(&self, _chunk_id: &str, _location: &str) -> NodeResult<bool> {
            futures::future::pending().await
        }

        async fn health_check(&self) -> bool {
            futures::future::pending().await
        }
    }

    pub fn memory_set(ids: &[&str]) -> (ProviderSet, Vec<Arc<MemoryProvider>>) {
        let memories: Vec<Arc<MemoryProvider>> =
            ids.iter().map(|id| Arc::new(MemoryProvider::new(id))).collect();
        let providers = memories
            .iter()
            .map(|m| m.clone() as Arc<dyn StorageProvider>)
            .collect();

        (
            ProviderSet::new(providers, Duration::from_secs(5)).unwrap(),
            memories,
        )
    }

    #[test]
    fn test_duplicate_ids() {
        let providers: Vec<Arc<dyn StorageProvider>> = vec![
            Arc::new(MemoryProvider::new("a")),
            Arc::new(MemoryProvider::new("a")),
        ];

        let e = ProviderSet::new(providers, Duration::from_secs(1)).unwrap_err();
        assert_eq!("InvalidInput", e.name());
    }

    #[test]
    fn test_resolve() {
        let (set, _) = memory_set(&["a", "b"]);

        assert_eq!(2, set.len());
        assert_eq!("b", set.resolve("b").unwrap().id());
        assert_eq!("a", set.at(0).unwrap().id());

        let e = set.resolve("c").unwrap_err();
        assert_eq!("NoSuchProvider", e.name());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let providers: Vec<Arc<dyn StorageProvider>> =
            vec![Arc::new(MemoryProvider::new("ok")), Arc::new(StalledProvider)];
        let set = ProviderSet::new(providers, Duration::from_millis(100)).unwrap();

        let stalled = set.resolve("stalled").unwrap();
        let e = set
            .bounded(stalled.store("x", Bytes::from_static(b"x")))
            .await
            .unwrap_err();
        assert_eq!("StorageTimeout", e.name());

        let health = set.check_health().await;
        assert_eq!(
            vec![true, false],
            health.iter().map(|h| h.healthy).collect::<Vec<_>>()
        );
    }
}
