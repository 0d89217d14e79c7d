//! Store manager that dispatches to the configured provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use arcade_core::config::store::StoreConfig;
use arcade_core::error::AppError;
use arcade_core::result::AppResult;
use arcade_core::traits::store::{EphemeralStore, TopicStream};

/// Store manager that wraps the configured store provider.
///
/// The provider is selected at construction time based on configuration.
#[derive(Debug, Clone)]
pub struct StoreManager {
    /// The inner store provider.
    inner: Arc<dyn EphemeralStore>,
}

impl StoreManager {
    /// Create a new store manager from configuration.
    pub async fn new(config: &StoreConfig) -> AppResult<Self> {
        let inner: Arc<dyn EphemeralStore> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis store provider");
                let client = crate::redis::RedisClient::connect(&config.redis).await?;
                Arc::new(crate::redis::RedisStore::new(client))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory store provider");
                Arc::new(crate::memory::MemoryStore::new(&config.memory))
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown store provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Create a store manager from an existing provider (for testing).
    pub fn from_provider(provider: Arc<dyn EphemeralStore>) -> Self {
        Self { inner: provider }
    }

    /// Get a shared handle to the inner provider.
    pub fn provider(&self) -> Arc<dyn EphemeralStore> {
        Arc::clone(&self.inner)
    }
}

#[async_trait]
impl EphemeralStore for StoreManager {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        self.inner.set_nx(key, value, ttl).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &str,
        value: &str,
        ttl: Duration,
    ) -> AppResult<bool> {
        self.inner.compare_and_swap(key, expected, value, ttl).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.inner.exists(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        self.inner.expire(key, ttl).await
    }

    async fn keys(&self, pattern: &str) -> AppResult<Vec<String>> {
        self.inner.keys(pattern).await
    }

    async fn list_push(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.inner.list_push(key, value, ttl).await
    }

    async fn list_range(&self, key: &str) -> AppResult<Vec<String>> {
        self.inner.list_range(key).await
    }

    async fn list_remove(&self, key: &str, value: &str) -> AppResult<u64> {
        self.inner.list_remove(key, value).await
    }

    async fn publish(&self, topic: &str, payload: &str) -> AppResult<u64> {
        self.inner.publish(topic, payload).await
    }

    async fn subscribe(&self, topic: &str) -> AppResult<TopicStream> {
        self.inner.subscribe(topic).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }

    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }
}
