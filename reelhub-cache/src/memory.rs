//! Process-local cache store.
//!
//! Entries live in a `HashMap` behind a `RwLock`. Expired entries are
//! dropped when they are read, in bulk by `purge_expired`, and by a sweep
//! during `set` once the earliest known expiry has passed.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reelhub_core::{CacheError, CacheResult};
use serde_json::Value;

use super::clock::{expiry_after, Clock, SystemClock};
use super::key::CacheKey;
use super::traits::{CacheStats, CacheStore};

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: Value,
    expires_at: DateTime<Utc>,
    size_bytes: u64,
}

impl MemoryEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Default)]
struct Slots {
    map: HashMap<CacheKey, MemoryEntry>,
    /// Lower bound on the earliest expiry in `map`; may be stale-early after
    /// deletes, which only costs an extra sweep.
    earliest_expiry: Option<DateTime<Utc>>,
}

impl Slots {
    fn insert(&mut self, key: CacheKey, entry: MemoryEntry) {
        self.earliest_expiry = Some(match self.earliest_expiry {
            Some(earliest) => earliest.min(entry.expires_at),
            None => entry.expires_at,
        });
        self.map.insert(key, entry);
    }

    fn sweep_due(&self, now: DateTime<Utc>) -> bool {
        self.earliest_expiry.is_some_and(|earliest| now >= earliest)
    }

    /// Drop expired entries; returns how many were removed.
    fn sweep(&mut self, now: DateTime<Utc>) -> u64 {
        let before = self.map.len();
        self.map.retain(|_, entry| entry.is_live(now));
        self.earliest_expiry = self.map.values().map(|entry| entry.expires_at).min();
        (before - self.map.len()) as u64
    }

    fn clear(&mut self) -> u64 {
        let removed = self.map.len() as u64;
        self.map.clear();
        self.earliest_expiry = None;
        removed
    }
}

/// In-memory cache store.
///
/// Cheap to construct; suited to tests and single-process deployments.
pub struct InMemoryCacheStore {
    entries: RwLock<Slots>,
    stats: RwLock<CacheStats>,
    clock: Arc<dyn Clock>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Use a custom time source, typically a manual clock in tests.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(Slots::default()),
            stats: RwLock::new(CacheStats::default()),
            clock,
        }
    }

    fn record_hit(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.hits += 1;
        }
    }

    fn record_expirations(&self, count: u64) {
        if count > 0 {
            if let Ok(mut stats) = self.stats.write() {
                stats.expirations += count;
            }
        }
    }

    fn record_miss(&self, expired: bool) {
        if let Ok(mut stats) = self.stats.write() {
            stats.misses += 1;
            if expired {
                stats.expirations += 1;
            }
        }
    }
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.entries.read().map(|e| e.map.len()).unwrap_or_default();
        f.debug_struct("InMemoryCacheStore")
            .field("entries", &len)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<Value>> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().map_err(|_| CacheError::LockPoisoned)?;
            match entries.map.get(key) {
                Some(entry) if entry.is_live(now) => {
                    let value = entry.value.clone();
                    drop(entries);
                    self.record_hit();
                    return Ok(Some(value));
                }
                Some(_) => {}
                None => {
                    drop(entries);
                    self.record_miss(false);
                    return Ok(None);
                }
            }
        }

        // Expired: drop it unless a writer refreshed it in the meantime.
        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;
        let expired = match entries.map.get(key) {
            Some(entry) if !entry.is_live(now) => entries.map.remove(key).is_some(),
            _ => false,
        };
        drop(entries);
        self.record_miss(expired);
        Ok(None)
    }

    async fn set(&self, key: &CacheKey, value: &Value, ttl: Duration) -> CacheResult<()> {
        if ttl.is_zero() {
            return Ok(());
        }

        let size_bytes = serde_json::to_vec(value)
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?
            .len() as u64;
        let now = self.clock.now();
        let entry = MemoryEntry {
            value: value.clone(),
            expires_at: expiry_after(now, ttl),
            size_bytes,
        };

        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;
        let swept = if entries.sweep_due(now) {
            entries.sweep(now)
        } else {
            0
        };
        entries.insert(key.clone(), entry);
        drop(entries);

        if swept > 0 {
            tracing::debug!(swept, "Swept expired in-memory cache entries");
        }
        self.record_expirations(swept);
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> CacheResult<bool> {
        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;
        Ok(entries.map.remove(key).is_some())
    }

    async fn flush(&self) -> CacheResult<u64> {
        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;
        Ok(entries.clear())
    }

    async fn purge_expired(&self) -> CacheResult<u64> {
        let now = self.clock.now();
        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;
        let purged = entries.sweep(now);
        drop(entries);

        self.record_expirations(purged);
        Ok(purged)
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        let entries = self.entries.read().map_err(|_| CacheError::LockPoisoned)?;
        let mut stats = self
            .stats
            .read()
            .map(|s| s.clone())
            .unwrap_or_default();
        stats.entry_count = entries.map.len() as u64;
        stats.memory_bytes = entries.map.values().map(|e| e.size_bytes).sum();
        Ok(stats)
    }
}
