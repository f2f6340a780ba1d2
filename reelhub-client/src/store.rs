//! Cache store selection from configuration.

use std::sync::Arc;

use reelhub_cache::{CacheStore, InMemoryCacheStore, LmdbCacheStore};
use reelhub_core::{CacheBackendKind, CacheSettings, ConfigError, ReelhubResult};

/// Open the store named by `settings`.
pub fn open_store(settings: &CacheSettings) -> ReelhubResult<Arc<dyn CacheStore>> {
    match settings.backend {
        CacheBackendKind::Memory => {
            tracing::debug!("Using in-memory response cache");
            Ok(Arc::new(InMemoryCacheStore::new()))
        }
        CacheBackendKind::Lmdb => {
            let path = settings
                .lmdb_path
                .as_ref()
                .ok_or(ConfigError::InvalidValue {
                    field: "cache.lmdb_path",
                    reason: "required when cache.backend = \"lmdb\"".to_string(),
                })?;
            let store = LmdbCacheStore::new(path, settings.lmdb_max_size_mb)?;
            tracing::debug!(path = %path.display(), "Using LMDB response cache");
            Ok(Arc::new(store))
        }
    }
}
