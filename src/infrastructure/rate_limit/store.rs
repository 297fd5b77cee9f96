//! Rate-limit counter stores
//!
//! The limiter talks to an injected `CounterStore` so the counters can
//! live in process memory (dev/test) or in Redis (production, correct
//! across multiple server instances).

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tokio::sync::RwLock;

use crate::domain::DomainError;

/// Storage contract for fixed-window counters.
///
/// `increment` must be atomic with respect to concurrent calls for the
/// same key: two simultaneous requests may never observe the same count.
#[async_trait]
pub trait CounterStore: Send + Sync + Debug {
    /// Atomically increment the counter at `key` and return the new count.
    /// `ttl` bounds how long the counter may outlive its window, so stores
    /// can reclaim closed windows.
    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64, DomainError>;
}

#[derive(Debug)]
struct CounterEntry {
    count: u64,
    expires_at: Instant,
}

/// In-memory implementation of `CounterStore`.
///
/// A single write lock per store serializes increments; expired entries
/// are reset lazily on access and removed wholesale by a periodic sweep
/// so memory stays bounded.
#[derive(Debug)]
pub struct InMemoryCounterStore {
    counters: Arc<RwLock<HashMap<String, CounterEntry>>>,
    sweep_interval: Duration,
    last_sweep: Arc<RwLock<Instant>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(RwLock::new(HashMap::new())),
            sweep_interval: Duration::from_secs(300),
            last_sweep: Arc::new(RwLock::new(Instant::now())),
        }
    }

    /// Override the sweep interval
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Number of live counters (expired entries included until swept)
    pub async fn len(&self) -> usize {
        self.counters.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.counters.read().await.is_empty()
    }

    async fn maybe_sweep(&self) {
        let due = {
            let last = self.last_sweep.read().await;
            last.elapsed() >= self.sweep_interval
        };

        if due {
            let mut last = self.last_sweep.write().await;
            *last = Instant::now();

            let now = Instant::now();
            let mut counters = self.counters.write().await;
            counters.retain(|_, entry| entry.expires_at > now);
        }
    }
}

impl Default for InMemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64, DomainError> {
        self.maybe_sweep().await;

        let now = Instant::now();
        let mut counters = self.counters.write().await;

        let entry = counters.entry(key.to_string()).or_insert(CounterEntry {
            count: 0,
            expires_at: now + ttl,
        });

        if entry.expires_at <= now {
            entry.count = 0;
            entry.expires_at = now + ttl;
        }

        entry.count += 1;
        Ok(entry.count)
    }
}

/// Redis-backed implementation of `CounterStore`.
///
/// `INCR` is atomic server-side, so counts stay correct across multiple
/// gateway instances; `EXPIRE` on the first increment reclaims closed
/// windows.
#[derive(Clone)]
pub struct RedisCounterStore {
    connection: ConnectionManager,
}

impl RedisCounterStore {
    /// Connect to Redis at the given URL
    pub async fn connect(url: &str) -> Result<Self, DomainError> {
        let client = redis::Client::open(url)
            .map_err(|e| DomainError::configuration(format!("Invalid Redis URL: {}", e)))?;

        let connection = client
            .get_connection_manager()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self { connection })
    }
}

impl Debug for RedisCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCounterStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64, DomainError> {
        let mut connection = self.connection.clone();

        let count: u64 = redis::cmd("INCR")
            .arg(key)
            .query_async(&mut connection)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to increment counter: {}", e)))?;

        if count == 1 {
            let _: () = redis::cmd("EXPIRE")
                .arg(key)
                .arg(ttl.as_secs())
                .query_async(&mut connection)
                .await
                .map_err(|e| {
                    DomainError::storage(format!("Failed to set counter expiry: {}", e))
                })?;
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_increment_counts_up() {
        let store = InMemoryCounterStore::new();
        let ttl = Duration::from_secs(60);

        assert_eq!(store.increment("a", ttl).await.unwrap(), 1);
        assert_eq!(store.increment("a", ttl).await.unwrap(), 2);
        assert_eq!(store.increment("a", ttl).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_independent_keys() {
        let store = InMemoryCounterStore::new();
        let ttl = Duration::from_secs(60);

        store.increment("a", ttl).await.unwrap();
        store.increment("a", ttl).await.unwrap();

        assert_eq!(store.increment("b", ttl).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_resets() {
        let store = InMemoryCounterStore::new();
        let ttl = Duration::from_millis(20);

        assert_eq!(store.increment("a", ttl).await.unwrap(), 1);
        assert_eq!(store.increment("a", ttl).await.unwrap(), 2);

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(store.increment("a", ttl).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sweep_reclaims_expired_entries() {
        let store = InMemoryCounterStore::new().with_sweep_interval(Duration::from_millis(10));
        let ttl = Duration::from_millis(10);

        store.increment("a", ttl).await.unwrap();
        store.increment("b", ttl).await.unwrap();
        assert_eq!(store.len().await, 2);

        tokio::time::sleep(Duration::from_millis(30)).await;

        // Any access past the sweep interval triggers the sweep.
        store.increment("c", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_atomic() {
        let store = Arc::new(InMemoryCounterStore::new());
        let ttl = Duration::from_secs(60);

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.increment("shared", ttl).await.unwrap()
            }));
        }

        let mut counts = Vec::new();
        for handle in handles {
            counts.push(handle.await.unwrap());
        }

        // Every increment observed a distinct count; none were lost.
        counts.sort_unstable();
        assert_eq!(counts, (1..=20).collect::<Vec<u64>>());
    }
}
