//! Tenant credential handling.

use secrecy::{ExposeSecret, SecretString};

/// Bearer token identifying a tenant to the backend API.
///
/// The token is wrapped in a `secrecy::SecretString` so it never ends up in
/// logs or `Debug` output. It is read-only for the lifetime of a client.
#[derive(Clone)]
pub struct TenantCredential(SecretString);

impl TenantCredential {
    pub fn new(token: impl Into<String>) -> Self {
        let token: String = token.into();
        Self(SecretString::from(token))
    }

    /// Pick the credential for one inbound request.
    ///
    /// The session's key wins when present and non-empty, otherwise the
    /// configured default is used.
    pub fn resolve(session: Option<&str>, default: &str) -> Self {
        match session {
            Some(token) if !token.trim().is_empty() => Self::new(token),
            _ => Self::new(default),
        }
    }

    /// Expose the token (only for the auth header and cache key derivation).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Get the length of the token without exposing it.
    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    /// `Bearer <token>` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0.expose_secret())
    }
}

impl std::fmt::Debug for TenantCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TenantCredential([REDACTED, {} chars])", self.len())
    }
}
