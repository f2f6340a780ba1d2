//! Cache store trait and statistics.
//!
//! This module defines the contract every cache store must satisfy so the
//! API client can be backed by memory, LMDB, or any other key-value store.

use std::time::Duration;

use async_trait::async_trait;
use reelhub_core::CacheResult;
use serde_json::Value;

use super::key::CacheKey;

/// Key-value store holding decoded API responses with a time-to-live.
///
/// Implementations must be thread-safe. No transactional guarantees are
/// required across calls: concurrent writers to the same key race and the
/// last write wins.
///
/// # Expiry
///
/// An entry whose TTL has elapsed must be reported as absent by `get`.
/// Whether it is physically removed at that point is up to the store.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a live value, or `None` on a miss or an expired entry.
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<Value>>;

    /// Store a value for `ttl`. A zero TTL stores nothing.
    async fn set(&self, key: &CacheKey, value: &Value, ttl: Duration) -> CacheResult<()>;

    /// Remove one entry. Returns `false` when nothing was stored under `key`.
    async fn delete(&self, key: &CacheKey) -> CacheResult<bool>;

    /// Remove every entry, for every tenant. Returns how many were removed.
    async fn flush(&self) -> CacheResult<u64>;

    /// Physically remove expired entries. Returns how many were removed.
    async fn purge_expired(&self) -> CacheResult<u64>;

    /// Get cache statistics.
    async fn stats(&self) -> CacheResult<CacheStats>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses (including expired entries).
    pub misses: u64,
    /// Number of entries currently stored (live or not yet purged).
    pub entry_count: u64,
    /// Approximate size of stored values in bytes.
    pub memory_bytes: u64,
    /// Number of entries dropped because their TTL elapsed.
    pub expirations: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
