//! Error types for ReelHub operations

use std::fmt;
use thiserror::Error;

/// Longest response body excerpt carried by an [`ApiRequestError`].
pub const BODY_EXCERPT_LIMIT: usize = 512;

/// Discriminator for the three ways an outbound API call can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// Host unreachable, connection reset, or the transport timed out.
    Connection,
    /// The backend answered with a non-2xx status.
    Http,
    /// The backend answered 2xx but the body was not valid JSON.
    Decode,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApiErrorKind::Connection => "connection",
            ApiErrorKind::Http => "http",
            ApiErrorKind::Decode => "decode",
        };
        f.write_str(name)
    }
}

/// A failed call to the backend API.
///
/// All failures share this type so callers can log and branch uniformly;
/// `kind` says which of the three failure classes occurred.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("API request to {endpoint} failed ({kind}): {message}")]
pub struct ApiRequestError {
    pub kind: ApiErrorKind,
    pub endpoint: String,
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
    /// Excerpt of the response body, when one was received.
    pub body: Option<String>,
    pub message: String,
}

impl ApiRequestError {
    /// The backend could not be reached or the call timed out.
    pub fn connection(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Connection,
            endpoint: endpoint.into(),
            status: None,
            body: None,
            message: message.into(),
        }
    }

    /// The backend answered with a non-success status.
    pub fn http(endpoint: impl Into<String>, status: u16, body: &str) -> Self {
        Self {
            kind: ApiErrorKind::Http,
            endpoint: endpoint.into(),
            status: Some(status),
            body: Some(excerpt(body)),
            message: format!("HTTP {}", status),
        }
    }

    /// The backend answered 2xx with a body that is not JSON.
    pub fn decode(
        endpoint: impl Into<String>,
        status: u16,
        body: &str,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind: ApiErrorKind::Decode,
            endpoint: endpoint.into(),
            status: Some(status),
            body: Some(excerpt(body)),
            message: reason.into(),
        }
    }

    pub fn is_connection(&self) -> bool {
        self.kind == ApiErrorKind::Connection
    }

    pub fn is_http(&self) -> bool {
        self.kind == ApiErrorKind::Http
    }

    pub fn is_decode(&self) -> bool {
        self.kind == ApiErrorKind::Decode
    }
}

/// Truncate a response body to [`BODY_EXCERPT_LIMIT`] characters.
pub fn excerpt(body: &str) -> String {
    match body.char_indices().nth(BODY_EXCERPT_LIMIT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

/// Cache store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache backend failure: {reason}")]
    Backend { reason: String },

    #[error("Cache serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("Cache I/O error: {reason}")]
    Io { reason: String },

    #[error("Cache lock poisoned")]
    LockPoisoned,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or REELHUB_CONFIG)")]
    MissingConfigPath,

    #[error("Failed to read config file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to parse config TOML: {reason}")]
    Parse { reason: String },

    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Master error type for all ReelHub errors.
#[derive(Debug, Clone, Error)]
pub enum ReelhubError {
    #[error("API error: {0}")]
    Api(#[from] ApiRequestError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client setup failed: {reason}")]
    Transport { reason: String },

    #[error("I/O error: {reason}")]
    Io { reason: String },
}

/// Result type alias for ReelHub operations.
pub type ReelhubResult<T> = Result<T, ReelhubError>;

/// Result type alias for cache store operations.
pub type CacheResult<T> = Result<T, CacheError>;

// =============================================================================
// TESTS
// =============================================================================
