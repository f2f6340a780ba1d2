//! ReelHub Core - shared types
//!
//! Credentials, request parameters, the backend endpoint catalog, errors and
//! configuration. Every other crate in the workspace depends on this one.

pub mod config;
pub mod credential;
pub mod endpoint;
pub mod error;
pub mod params;
pub mod tenant;

pub use config::{BackendConfig, CacheBackendKind, CacheSettings, LogFormat};
pub use credential::TenantCredential;
pub use endpoint::{Endpoint, HttpMethod};
pub use error::{
    excerpt, ApiErrorKind, ApiRequestError, CacheError, CacheResult, ConfigError, ReelhubError,
    ReelhubResult,
};
pub use params::{ParamValue, RequestParams};
pub use tenant::TenantInfo;
