//! In-memory store implementation using the moka crate.
//!
//! Each entry carries its own deadline, enforced through a moka [`Expiry`]
//! policy, so presence, challenges, and sessions can expire independently.
//! Atomic operations (NX, compare-and-swap, list edits) go through moka's
//! per-key `and_compute_with`, which serializes writers on the same key.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use moka::Expiry;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use tokio::sync::{RwLock, broadcast};
use tracing::debug;

use arcade_core::config::store::MemoryStoreConfig;
use arcade_core::error::AppError;
use arcade_core::result::AppResult;
use arcade_core::traits::store::{EphemeralStore, TopicStream};

/// Stored value with its own deadline.
#[derive(Debug, Clone)]
struct Slot {
    value: SlotValue,
    expires_at: Instant,
}

#[derive(Debug, Clone)]
enum SlotValue {
    Text(String),
    List(VecDeque<String>),
}

impl Slot {
    fn text(value: &str, ttl: Duration) -> Self {
        Self {
            value: SlotValue::Text(value.to_string()),
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_live(&self) -> bool {
        self.expires_at > Instant::now()
    }
}

/// Moka expiry policy reading the deadline stored on each slot.
struct SlotExpiry;

impl Expiry<String, Slot> for SlotExpiry {
    fn expire_after_create(&self, _key: &String, value: &Slot, created_at: Instant) -> Option<Duration> {
        Some(value.expires_at.saturating_duration_since(created_at))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Slot,
        updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.expires_at.saturating_duration_since(updated_at))
    }
}

/// In-memory ephemeral store using moka plus broadcast channels.
#[derive(Debug)]
pub struct MemoryStore {
    /// Key → slot.
    cache: Cache<String, Slot>,
    /// Topic name → broadcast sender.
    topics: RwLock<HashMap<String, broadcast::Sender<String>>>,
    /// Buffer size for new topics.
    topic_buffer_size: usize,
}

impl MemoryStore {
    /// Create a new in-memory store from configuration.
    pub fn new(config: &MemoryStoreConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(SlotExpiry)
            .build();

        Self {
            cache,
            topics: RwLock::new(HashMap::new()),
            topic_buffer_size: config.topic_buffer_size.max(1),
        }
    }

    /// Topics with a live broadcast channel.
    pub async fn topic_count(&self) -> usize {
        self.topics.read().await.len()
    }

    /// Read a live slot. Moka may still hold an entry for a short while
    /// after its deadline, so the deadline is checked here as well.
    async fn live_slot(&self, key: &str) -> Option<Slot> {
        self.cache.get(key).await.filter(Slot::is_live)
    }

    fn wrong_type(key: &str) -> AppError {
        AppError::internal(format!("Key '{key}' holds a value of the wrong type"))
    }
}

#[async_trait]
impl EphemeralStore for MemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        match self.live_slot(key).await {
            Some(Slot {
                value: SlotValue::Text(value),
                ..
            }) => Ok(Some(value)),
            Some(_) => Err(Self::wrong_type(key)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.cache
            .insert(key.to_string(), Slot::text(value, ttl))
            .await;
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        let result = self
            .cache
            .entry(key.to_string())
            .and_compute_with(|existing| {
                let op = match existing {
                    Some(entry) if entry.value().is_live() => Op::Nop,
                    _ => Op::Put(Slot::text(value, ttl)),
                };
                std::future::ready(op)
            })
            .await;

        Ok(matches!(
            result,
            CompResult::Inserted(_) | CompResult::ReplacedWith(_)
        ))
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &str,
        value: &str,
        ttl: Duration,
    ) -> AppResult<bool> {
        let result = self
            .cache
            .entry(key.to_string())
            .and_compute_with(|existing| {
                let op = match existing.map(|e| e.into_value()) {
                    Some(slot) if slot.is_live() => match slot.value {
                        SlotValue::Text(current) if current == expected => {
                            Op::Put(Slot::text(value, ttl))
                        }
                        _ => Op::Nop,
                    },
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;

        Ok(matches!(result, CompResult::ReplacedWith(_)))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.cache.remove(key).await;
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.live_slot(key).await.is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        let result = self
            .cache
            .entry(key.to_string())
            .and_compute_with(|existing| {
                let op = match existing.map(|e| e.into_value()) {
                    Some(mut slot) if slot.is_live() => {
                        slot.expires_at = Instant::now() + ttl;
                        Op::Put(slot)
                    }
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;

        Ok(matches!(result, CompResult::ReplacedWith(_)))
    }

    async fn keys(&self, pattern: &str) -> AppResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, slot)| slot.is_live() && glob_match(pattern, key))
            .map(|(key, _)| key.to_string())
            .collect();
        keys.sort();
        debug!(pattern, count = keys.len(), "Scanned keys matching pattern");
        Ok(keys)
    }

    async fn list_push(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let result = self
            .cache
            .entry(key.to_string())
            .and_compute_with(|existing| {
                let expires_at = Instant::now() + ttl;
                let op = match existing.map(|e| e.into_value()) {
                    Some(slot) if slot.is_live() => match slot.value {
                        SlotValue::List(mut items) => {
                            items.push_front(value.to_string());
                            Op::Put(Slot {
                                value: SlotValue::List(items),
                                expires_at,
                            })
                        }
                        SlotValue::Text(_) => Op::Nop,
                    },
                    _ => Op::Put(Slot {
                        value: SlotValue::List(VecDeque::from([value.to_string()])),
                        expires_at,
                    }),
                };
                std::future::ready(op)
            })
            .await;

        match result {
            CompResult::Unchanged(_) => Err(Self::wrong_type(key)),
            _ => Ok(()),
        }
    }

    async fn list_range(&self, key: &str) -> AppResult<Vec<String>> {
        match self.live_slot(key).await {
            Some(Slot {
                value: SlotValue::List(items),
                ..
            }) => Ok(items.into_iter().collect()),
            Some(_) => Err(Self::wrong_type(key)),
            None => Ok(Vec::new()),
        }
    }

    async fn list_remove(&self, key: &str, value: &str) -> AppResult<u64> {
        let mut removed = 0u64;
        self.cache
            .entry(key.to_string())
            .and_compute_with(|existing| {
                let op = match existing.map(|e| e.into_value()) {
                    Some(Slot {
                        value: SlotValue::List(mut items),
                        expires_at,
                    }) if expires_at > Instant::now() => {
                        let before = items.len();
                        items.retain(|item| item != value);
                        removed = (before - items.len()) as u64;
                        if items.is_empty() {
                            Op::Remove
                        } else if removed > 0 {
                            Op::Put(Slot {
                                value: SlotValue::List(items),
                                expires_at,
                            })
                        } else {
                            Op::Nop
                        }
                    }
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;

        Ok(removed)
    }

    async fn publish(&self, topic: &str, payload: &str) -> AppResult<u64> {
        let receivers = {
            let topics = self.topics.read().await;
            match topics.get(topic) {
                Some(tx) => tx.send(payload.to_string()).unwrap_or(0),
                None => return Ok(0),
            }
        };

        if receivers == 0 {
            // Every subscriber went away; drop the channel unless one just arrived.
            let mut topics = self.topics.write().await;
            if topics.get(topic).is_some_and(|tx| tx.receiver_count() == 0) {
                topics.remove(topic);
                debug!(%topic, "Dropped topic without subscribers");
            }
        }
        Ok(receivers as u64)
    }

    async fn subscribe(&self, topic: &str) -> AppResult<TopicStream> {
        let rx = {
            let mut topics = self.topics.write().await;
            topics.retain(|_, tx| tx.receiver_count() > 0);
            let tx = topics
                .entry(topic.to_string())
                .or_insert_with(|| broadcast::channel(self.topic_buffer_size).0);
            tx.subscribe()
        };

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(payload) => return Some((payload, rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Subscriber lagged, dropping messages");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });

        Ok(stream.boxed())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &str {
        "memory"
    }
}

/// Match `key` against a glob pattern where `*` matches any run of characters.
fn glob_match(pattern: &str, key: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == key;
    }

    let first = parts[0];
    let last = parts[parts.len() - 1];
    if !key.starts_with(first) || key.len() < first.len() + last.len() {
        return false;
    }

    let mut rest = &key[first.len()..];
    for middle in &parts[1..parts.len() - 1] {
        match rest.find(middle) {
            Some(pos) => rest = &rest[pos + middle.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}
