//! Ephemeral store trait for pluggable key/value + pub/sub backends.
//!
//! Every piece of lobby state (presence, challenges, per-user queues,
//! sessions) lives behind this trait with a TTL. Nothing is durable.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::result::AppResult;

/// Stream of payloads published on a topic.
///
/// The stream ends when the subscription is dropped by the backend.
pub type TopicStream = BoxStream<'static, String>;

/// Trait for ephemeral store backends (Redis or in-memory).
///
/// All values are strings (JSON). The provider is responsible for key
/// prefixing and TTL enforcement. Keys passed in and returned are always
/// unprefixed.
#[async_trait]
pub trait EphemeralStore: Send + Sync + std::fmt::Debug + 'static {
    /// Get a value by key. Returns `None` if the key does not exist or has expired.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Set a value with a TTL, replacing any existing value.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// Set a value only if the key does not already exist (NX).
    /// Returns `true` if the value was set, `false` if the key already existed.
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool>;

    /// Replace the value only if the stored value equals `expected`.
    ///
    /// Returns `false` without writing when the key is missing or holds
    /// something else.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &str,
        value: &str,
        ttl: Duration,
    ) -> AppResult<bool>;

    /// Delete a key.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Check whether a key exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Set the TTL on an existing key. Returns `false` if the key is missing.
    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool>;

    /// List keys matching a glob-style pattern (only `*` is supported).
    async fn keys(&self, pattern: &str) -> AppResult<Vec<String>>;

    /// Push a value onto the head of a list and reset the list's TTL.
    async fn list_push(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// Return every element of a list, head first.
    async fn list_range(&self, key: &str) -> AppResult<Vec<String>>;

    /// Remove every occurrence of `value` from a list.
    /// Returns the number of removed elements.
    async fn list_remove(&self, key: &str, value: &str) -> AppResult<u64>;

    /// Publish a payload on a topic. Returns the number of receivers.
    async fn publish(&self, topic: &str, payload: &str) -> AppResult<u64>;

    /// Subscribe to a topic. Delivery is at-most-once.
    async fn subscribe(&self, topic: &str) -> AppResult<TopicStream>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Get the provider name.
    fn provider_name(&self) -> &str;
}

/// Typed JSON helpers available on every store, including trait objects.
#[async_trait]
pub trait StoreExt: EphemeralStore {
    /// Get a typed value by deserializing from JSON.
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> AppResult<Option<T>> {
        match self.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    /// Set a typed value by serializing to JSON.
    async fn set_json<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> AppResult<()> {
        let json = serde_json::to_string(value)?;
        self.set(key, &json, ttl).await
    }

    /// Publish a typed payload as JSON.
    async fn publish_json<T: Serialize + Send + Sync>(
        &self,
        topic: &str,
        payload: &T,
    ) -> AppResult<u64> {
        let json = serde_json::to_string(payload)?;
        self.publish(topic, &json).await
    }
}

impl<S: EphemeralStore + ?Sized> StoreExt for S {}
