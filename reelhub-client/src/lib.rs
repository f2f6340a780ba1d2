//! ReelHub Client - cached access to the ReelHub backend API
//!
//! [`CachedApiClient`] performs authenticated requests on behalf of one
//! tenant and reads through a shared [`reelhub_cache::CacheStore`].
//! [`BackendApi`] layers the endpoint catalog on top with per-endpoint TTLs.

pub mod backend;
pub mod client;
pub mod listing;
pub mod probe;
pub mod store;
pub mod telemetry;

pub use backend::{BackendApi, VideoFilters};
pub use client::CachedApiClient;
pub use listing::{optional, Pagination, VideoListing};
pub use probe::{run_probe, ProbeReport};
pub use store::open_store;
pub use telemetry::init_logging;
