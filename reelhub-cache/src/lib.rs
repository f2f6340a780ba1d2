//! ReelHub Cache - TTL stores for backend API responses
//!
//! Every entry is addressed by a [`CacheKey`] derived from the endpoint, the
//! request parameters and the tenant credential, so tenants can never read
//! each other's cached data.
//!
//! Two stores are provided:
//! - [`InMemoryCacheStore`]: process-local, for tests and single instances
//! - [`LmdbCacheStore`]: persistent, shared between processes on one host

pub mod clock;
pub mod key;
pub mod lmdb;
pub mod memory;
pub mod traits;

pub use clock::{expiry_after, Clock, SystemClock};
pub use key::{CacheKey, KEY_PREFIX};
pub use lmdb::LmdbCacheStore;
pub use memory::InMemoryCacheStore;
pub use traits::{CacheStats, CacheStore};
