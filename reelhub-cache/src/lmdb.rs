//! LMDB-backed cache store.
//!
//! Uses the heed crate (Rust bindings for LMDB) so cached responses survive
//! restarts and can be shared between processes on one host.
//!
//! # Value layout
//!
//! ```text
//! [expires_at: i64 LE millis][stored_at: i64 LE millis][json bytes]
//! ```
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. Reads use read transactions; `set`,
//! `delete`, `flush` and expiry cleanup use write transactions. Hit and miss
//! counters live in process memory and reset on restart.

use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use reelhub_core::{CacheError, CacheResult};
use serde_json::Value;

use super::clock::{expiry_after, Clock, SystemClock};
use super::key::CacheKey;
use super::traits::{CacheStats, CacheStore};

const HEADER_LEN: usize = 16;

fn backend_err(e: heed::Error) -> CacheError {
    CacheError::Backend {
        reason: e.to_string(),
    }
}

/// A decoded LMDB record.
#[derive(Debug, Clone, PartialEq)]
struct StoredEntry {
    expires_at: DateTime<Utc>,
    stored_at: DateTime<Utc>,
    value: Value,
}

impl StoredEntry {
    fn encode(&self) -> CacheResult<Vec<u8>> {
        let json = serde_json::to_vec(&self.value).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        let mut bytes = Vec::with_capacity(HEADER_LEN + json.len());
        bytes.extend_from_slice(&self.expires_at.timestamp_millis().to_le_bytes());
        bytes.extend_from_slice(&self.stored_at.timestamp_millis().to_le_bytes());
        bytes.extend_from_slice(&json);
        Ok(bytes)
    }

    fn decode(bytes: &[u8]) -> CacheResult<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(CacheError::Serialization {
                reason: format!("record too short: {} bytes", bytes.len()),
            });
        }
        let expires_at = read_millis(&bytes[0..8])?;
        let stored_at = read_millis(&bytes[8..16])?;
        let value = serde_json::from_slice(&bytes[HEADER_LEN..]).map_err(|e| {
            CacheError::Serialization {
                reason: e.to_string(),
            }
        })?;
        Ok(Self {
            expires_at,
            stored_at,
            value,
        })
    }

    /// Read only the expiry header, without parsing the JSON payload.
    fn peek_expiry(bytes: &[u8]) -> Option<DateTime<Utc>> {
        bytes.get(0..8).and_then(|b| read_millis(b).ok())
    }
}

fn read_millis(bytes: &[u8]) -> CacheResult<DateTime<Utc>> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| CacheError::Serialization {
        reason: "invalid timestamp header".to_string(),
    })?;
    let millis = i64::from_le_bytes(raw);
    DateTime::from_timestamp_millis(millis).ok_or_else(|| CacheError::Serialization {
        reason: format!("timestamp out of range: {}", millis),
    })
}

/// LMDB-backed cache store.
///
/// # Example
///
/// ```ignore
/// use reelhub_cache::{CacheKey, CacheStore, LmdbCacheStore};
///
/// let store = LmdbCacheStore::new("/var/cache/reelhub", 64)?;
/// store.set(&key, &value, Duration::from_secs(300)).await?;
/// let cached = store.get(&key).await?;
/// ```
pub struct LmdbCacheStore {
    env: Env,
    db: Database<Bytes, Bytes>,
    stats: Arc<RwLock<CacheStats>>,
    clock: Arc<dyn Clock>,
}

impl LmdbCacheStore {
    /// Open (or create) a store under `path` with a map size of
    /// `max_size_mb` megabytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the LMDB
    /// environment cannot be opened.
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> CacheResult<Self> {
        Self::with_clock(path, max_size_mb, Arc::new(SystemClock))
    }

    pub fn with_clock<P: AsRef<Path>>(
        path: P,
        max_size_mb: usize,
        clock: Arc<dyn Clock>,
    ) -> CacheResult<Self> {
        std::fs::create_dir_all(&path).map_err(|e| CacheError::Io {
            reason: e.to_string(),
        })?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(backend_err)?;

        let mut wtxn = env.write_txn().map_err(backend_err)?;
        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(backend_err)?;
        wtxn.commit().map_err(backend_err)?;

        Ok(Self {
            env,
            db,
            stats: Arc::new(RwLock::new(CacheStats::default())),
            clock,
        })
    }

    fn record_hit(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.hits += 1;
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

    /// Delete `key` only if it is still expired at `now`. Another writer may
    /// have refreshed it between our read and this write.
    fn remove_if_expired(&self, key: &CacheKey, now: DateTime<Utc>) -> CacheResult<bool> {
        let mut wtxn = self.env.write_txn().map_err(backend_err)?;
        let expired = match self.db.get(&wtxn, key.as_bytes()).map_err(backend_err)? {
            Some(bytes) => StoredEntry::peek_expiry(bytes).map_or(true, |exp| now >= exp),
            None => false,
        };
        if expired {
            self.db
                .delete(&mut wtxn, key.as_bytes())
                .map_err(backend_err)?;
        }
        wtxn.commit().map_err(backend_err)?;
        Ok(expired)
    }
}

impl std::fmt::Debug for LmdbCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LmdbCacheStore")
            .field("path", &self.env.path())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CacheStore for LmdbCacheStore {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<Value>> {
        let now = self.clock.now();
        let decoded = {
            let rtxn = self.env.read_txn().map_err(backend_err)?;
            match self.db.get(&rtxn, key.as_bytes()).map_err(backend_err)? {
                Some(bytes) => Some(StoredEntry::decode(bytes)),
                None => None,
            }
        };

        match decoded {
            None => {
                self.record_miss(false);
                Ok(None)
            }
            Some(Ok(entry)) if now < entry.expires_at => {
                self.record_hit();
                Ok(Some(entry.value))
            }
            Some(Ok(_)) => {
                let removed = self.remove_if_expired(key, now)?;
                self.record_miss(removed);
                Ok(None)
            }
            Some(Err(e)) => {
                // Unreadable record: drop it so the next write starts clean.
                tracing::warn!(key = %key, error = %e, "Discarding corrupt cache record");
                self.delete(key).await?;
                self.record_miss(false);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &CacheKey, value: &Value, ttl: Duration) -> CacheResult<()> {
        if ttl.is_zero() {
            return Ok(());
        }

        let now = self.clock.now();
        let entry = StoredEntry {
            expires_at: expiry_after(now, ttl),
            stored_at: now,
            value: value.clone(),
        };
        let bytes = entry.encode()?;

        let mut wtxn = self.env.write_txn().map_err(backend_err)?;
        self.db
            .put(&mut wtxn, key.as_bytes(), &bytes)
            .map_err(backend_err)?;
        wtxn.commit().map_err(backend_err)?;
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> CacheResult<bool> {
        let mut wtxn = self.env.write_txn().map_err(backend_err)?;
        let deleted = self
            .db
            .delete(&mut wtxn, key.as_bytes())
            .map_err(backend_err)?;
        wtxn.commit().map_err(backend_err)?;
        Ok(deleted)
    }

    async fn flush(&self) -> CacheResult<u64> {
        let mut wtxn = self.env.write_txn().map_err(backend_err)?;
        let removed = self.db.len(&wtxn).map_err(backend_err)?;
        self.db.clear(&mut wtxn).map_err(backend_err)?;
        wtxn.commit().map_err(backend_err)?;
        Ok(removed)
    }

    async fn purge_expired(&self) -> CacheResult<u64> {
        let now = self.clock.now();
        let expired_keys: Vec<Vec<u8>> = {
            let rtxn = self.env.read_txn().map_err(backend_err)?;
            let iter = self.db.iter(&rtxn).map_err(backend_err)?;
            iter.filter_map(Result::ok)
                .filter(|(_, bytes)| StoredEntry::peek_expiry(bytes).map_or(true, |exp| now >= exp))
                .map(|(key, _)| key.to_vec())
                .collect()
        };

        if expired_keys.is_empty() {
            return Ok(0);
        }

        let mut wtxn = self.env.write_txn().map_err(backend_err)?;
        let mut purged = 0u64;
        for key in &expired_keys {
            if self.db.delete(&mut wtxn, key).unwrap_or(false) {
                purged += 1;
            }
        }
        wtxn.commit().map_err(backend_err)?;

        if let Ok(mut stats) = self.stats.write() {
            stats.expirations += purged;
        }
        tracing::debug!(purged, "Purged expired cache records");
        Ok(purged)
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        let rtxn = self.env.read_txn().map_err(backend_err)?;
        let mut stats = self
            .stats
            .read()
            .map(|s| s.clone())
            .unwrap_or_default();

        stats.entry_count = self.db.len(&rtxn).map_err(backend_err)?;
        let mut foreign = 0u64;
        stats.memory_bytes = 0;
        for (key, bytes) in self.db.iter(&rtxn).map_err(backend_err)?.filter_map(Result::ok) {
            stats.memory_bytes += bytes.len().saturating_sub(HEADER_LEN) as u64;
            if std::str::from_utf8(key).ok().and_then(CacheKey::parse).is_none() {
                foreign += 1;
            }
        }
        if foreign > 0 {
            tracing::debug!(foreign, "LMDB cache holds keys not written by this store");
        }

        Ok(stats)
    }
}
