//! Redis store implementation.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use redis::AsyncCommands;
use tracing::{debug, warn};

use arcade_core::error::{AppError, ErrorKind};
use arcade_core::result::AppResult;
use arcade_core::traits::store::{EphemeralStore, TopicStream};

use super::client::RedisClient;

/// Replace the value only when it still equals the expected one.
const COMPARE_AND_SWAP_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    redis.call('SET', KEYS[1], ARGV[2], 'PX', ARGV[3])
    return 1
end
return 0
"#;

/// Redis-backed ephemeral store.
#[derive(Debug, Clone)]
pub struct RedisStore {
    /// Redis client.
    client: RedisClient,
}

impl RedisStore {
    /// Create a new Redis store.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    /// Map a Redis error to an AppError.
    fn map_err(e: redis::RedisError) -> AppError {
        AppError::with_source(ErrorKind::Internal, format!("Redis error: {e}"), e)
    }

    /// Redis rejects zero expirations, so clamp to one millisecond.
    fn ttl_millis(ttl: Duration) -> u64 {
        (ttl.as_millis() as u64).max(1)
    }
}

#[async_trait]
impl EphemeralStore for RedisStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let result: Option<String> = conn.get(&full_key).await.map_err(Self::map_err)?;
        Ok(result)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let _: () = conn
            .pset_ex(&full_key, value, Self::ttl_millis(ttl))
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();

        // SET key value PX ttl NX
        let result: Option<String> = redis::cmd("SET")
            .arg(&full_key)
            .arg(value)
            .arg("PX")
            .arg(Self::ttl_millis(ttl))
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;

        Ok(result.is_some())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &str,
        value: &str,
        ttl: Duration,
    ) -> AppResult<bool> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();

        let swapped: i64 = redis::Script::new(COMPARE_AND_SWAP_SCRIPT)
            .key(&full_key)
            .arg(expected)
            .arg(value)
            .arg(Self::ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(Self::map_err)?;

        Ok(swapped == 1)
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let _: () = conn.del(&full_key).await.map_err(Self::map_err)?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let result: bool = conn.exists(&full_key).await.map_err(Self::map_err)?;
        Ok(result)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let result: bool = conn
            .pexpire(&full_key, Self::ttl_millis(ttl) as i64)
            .await
            .map_err(Self::map_err)?;
        Ok(result)
    }

    async fn keys(&self, pattern: &str) -> AppResult<Vec<String>> {
        let full_pattern = self.client.prefixed_key(pattern);
        let mut conn = self.client.conn_mut();

        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(&full_pattern)
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;

        let mut keys: Vec<String> = keys
            .iter()
            .map(|k| self.client.unprefixed_key(k).to_string())
            .collect();
        keys.sort();
        debug!(pattern, count = keys.len(), "Scanned keys matching pattern");
        Ok(keys)
    }

    async fn list_push(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let _: () = redis::pipe()
            .atomic()
            .lpush(&full_key, value)
            .ignore()
            .pexpire(&full_key, Self::ttl_millis(ttl) as i64)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn list_range(&self, key: &str) -> AppResult<Vec<String>> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let items: Vec<String> = conn
            .lrange(&full_key, 0, -1)
            .await
            .map_err(Self::map_err)?;
        Ok(items)
    }

    async fn list_remove(&self, key: &str, value: &str) -> AppResult<u64> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let removed: u64 = conn
            .lrem(&full_key, 0, value)
            .await
            .map_err(Self::map_err)?;
        Ok(removed)
    }

    async fn publish(&self, topic: &str, payload: &str) -> AppResult<u64> {
        let channel = self.client.prefixed_key(topic);
        let mut conn = self.client.conn_mut();
        let receivers: u64 = conn
            .publish(&channel, payload)
            .await
            .map_err(Self::map_err)?;
        Ok(receivers)
    }

    async fn subscribe(&self, topic: &str) -> AppResult<TopicStream> {
        let channel = self.client.prefixed_key(topic);
        let mut pubsub = self
            .client
            .client()
            .get_async_pubsub()
            .await
            .map_err(Self::map_err)?;
        pubsub.subscribe(&channel).await.map_err(Self::map_err)?;
        debug!(channel = %channel, "Subscribed to Redis channel");

        let stream = pubsub
            .into_on_message()
            .filter_map(|msg| async move {
                match msg.get_payload::<String>() {
                    Ok(payload) => Some(payload),
                    Err(e) => {
                        warn!(error = %e, "Dropping undecodable pub/sub payload");
                        None
                    }
                }
            });

        Ok(stream.boxed())
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(pong == "PONG")
    }

    fn provider_name(&self) -> &str {
        "redis"
    }
}
