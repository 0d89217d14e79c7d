//! Ephemeral store configuration.

use serde::{Deserialize, Serialize};

/// Top-level store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store provider type: `"memory"` or `"redis"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Redis-specific configuration.
    #[serde(default)]
    pub redis: RedisStoreConfig,
    /// In-memory store configuration.
    #[serde(default)]
    pub memory: MemoryStoreConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            redis: RedisStoreConfig::default(),
            memory: MemoryStoreConfig::default(),
        }
    }
}

/// Redis store backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisStoreConfig {
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Prefix applied to every key and topic.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
        }
    }
}

/// In-memory store backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStoreConfig {
    /// Maximum number of keys held.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    /// Buffer size of each pub/sub topic.
    #[serde(default = "default_topic_buffer")]
    pub topic_buffer_size: usize,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
            topic_buffer_size: default_topic_buffer(),
        }
    }
}

fn default_provider() -> String {
    "memory".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_key_prefix() -> String {
    "arcade:".to_string()
}

fn default_max_capacity() -> u64 {
    100_000
}

fn default_topic_buffer() -> usize {
    256
}
