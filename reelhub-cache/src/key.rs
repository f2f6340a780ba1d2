//! Tenant-scoped cache keys.
//!
//! A `CacheKey` can only be built from an endpoint, its parameters and the
//! tenant credential, so there is no way to address a cache entry without
//! naming the tenant it belongs to.

use std::fmt;

use reelhub_core::{RequestParams, TenantCredential};
use sha2::{Digest, Sha256};

/// Prefix shared by every key this crate produces.
pub const KEY_PREFIX: &str = "backend_api:";

/// Separator between hashed components. Cannot appear in canonical params
/// (JSON escapes control characters) and is not a valid path character.
const SEPARATOR: u8 = 0x1F;

/// Length of the hex digest part of a key.
const DIGEST_HEX_LEN: usize = 64;

/// Deterministic cache key for one logical request.
///
/// # Format
///
/// `backend_api:` followed by the lowercase hex SHA-256 of:
/// - the endpoint path
/// - the canonical (key-sorted) parameter serialization
/// - the tenant credential
///
/// joined by a unit separator byte. The credential only ever appears inside
/// the digest, so keys are safe to log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    inner: String,
}

impl CacheKey {
    /// Derive the key for `endpoint` + `params` as seen by `credential`.
    ///
    /// Parameter order does not matter: `RequestParams` is always sorted.
    pub fn derive(endpoint: &str, params: &RequestParams, credential: &TenantCredential) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(endpoint.as_bytes());
        hasher.update([SEPARATOR]);
        hasher.update(params.canonical().as_bytes());
        hasher.update([SEPARATOR]);
        hasher.update(credential.expose().as_bytes());
        let digest = hasher.finalize();

        Self {
            inner: format!("{}{}", KEY_PREFIX, hex::encode(digest)),
        }
    }

    /// Parse a key read back from a store.
    ///
    /// Returns `None` if the prefix is missing or the digest is not 64
    /// lowercase hex characters.
    pub fn parse(raw: &str) -> Option<Self> {
        let digest = raw.strip_prefix(KEY_PREFIX)?;
        if digest.len() != DIGEST_HEX_LEN
            || !digest
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return None;
        }
        Some(Self {
            inner: raw.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}
