//! Read-through cached HTTP client for the backend API.

use std::sync::Arc;
use std::time::Duration;

use reelhub_cache::{CacheKey, CacheStore};
use reelhub_core::{
    ApiRequestError, BackendConfig, CacheResult, HttpMethod, ReelhubError, ReelhubResult,
    RequestParams, TenantCredential,
};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;

/// HTTP client bound to one tenant credential and a shared cache store.
///
/// Cheap to clone: the underlying `reqwest::Client` and the store are shared.
/// Build one per inbound request or job with the tenant's credential, all
/// pointing at the same store.
pub struct CachedApiClient<S: CacheStore + ?Sized = dyn CacheStore> {
    http: reqwest::Client,
    base_url: String,
    credential: TenantCredential,
    store: Arc<S>,
}

impl<S: CacheStore + ?Sized> Clone for CachedApiClient<S> {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            credential: self.credential.clone(),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: CacheStore + ?Sized> std::fmt::Debug for CachedApiClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedApiClient")
            .field("base_url", &self.base_url)
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

impl<S: CacheStore + ?Sized> CachedApiClient<S> {
    /// Build a client from configuration.
    ///
    /// When `credential` is `None` the configured default key is used.
    pub fn configure(
        config: &BackendConfig,
        credential: Option<TenantCredential>,
        store: Arc<S>,
    ) -> ReelhubResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ReelhubError::Transport {
                reason: e.to_string(),
            })?;

        let credential =
            credential.unwrap_or_else(|| TenantCredential::new(config.default_api_key.clone()));

        Ok(Self {
            http,
            base_url: config.base_url().to_string(),
            credential,
            store,
        })
    }

    /// Same connection pool and store, different tenant.
    pub fn with_credential(&self, credential: TenantCredential) -> Self {
        Self {
            credential,
            ..self.clone()
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credential(&self) -> &TenantCredential {
        &self.credential
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Key under which `request` caches `endpoint` + `params` for this tenant.
    pub fn cache_key(&self, endpoint: &str, params: &RequestParams) -> CacheKey {
        CacheKey::derive(endpoint, params, &self.credential)
    }

    /// Perform one authenticated request, reading through the cache when
    /// `cache_ttl_secs > 0`.
    ///
    /// A live cached value is returned without touching the network.
    /// Otherwise exactly one HTTP attempt is made; a successful JSON response
    /// is stored for `cache_ttl_secs` before being returned. Failures are
    /// logged and returned, never cached. Cache store failures are logged
    /// and the call proceeds as if uncached.
    pub async fn request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        params: &RequestParams,
        cache_ttl_secs: u64,
    ) -> Result<Value, ApiRequestError> {
        let cache_key = (cache_ttl_secs > 0).then(|| self.cache_key(endpoint, params));

        if let Some(key) = &cache_key {
            match self.store.get(key).await {
                Ok(Some(value)) => {
                    tracing::debug!(endpoint, key = %key, "Cache hit");
                    return Ok(value);
                }
                Ok(None) => tracing::debug!(endpoint, key = %key, "Cache miss"),
                Err(e) => tracing::warn!(
                    endpoint,
                    error = %e,
                    "Cache read failed, continuing without cache"
                ),
            }
        }

        let value = match self.send(method, endpoint, params).await {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(
                    endpoint,
                    method = %method,
                    kind = %err.kind,
                    status = ?err.status,
                    body = err.body.as_deref().unwrap_or_default(),
                    "Backend API request failed"
                );
                return Err(err);
            }
        };

        if let Some(key) = &cache_key {
            let ttl = Duration::from_secs(cache_ttl_secs);
            match self.store.set(key, &value, ttl).await {
                Ok(()) => tracing::debug!(endpoint, key = %key, ttl_secs = cache_ttl_secs, "Cached response"),
                Err(e) => tracing::warn!(
                    endpoint,
                    error = %e,
                    "Cache write failed, response not cached"
                ),
            }
        }

        Ok(value)
    }

    /// Drop the entry `request` would use for `endpoint` + `params` under this
    /// client's credential. Returns `false` if nothing was cached.
    pub async fn invalidate(&self, endpoint: &str, params: &RequestParams) -> CacheResult<bool> {
        let key = self.cache_key(endpoint, params);
        let removed = self.store.delete(&key).await?;
        tracing::debug!(endpoint, removed, "Invalidated cache entry");
        Ok(removed)
    }

    /// Flush the entire store.
    ///
    /// This drops every tenant's entries, not just this client's.
    pub async fn invalidate_all(&self) -> CacheResult<u64> {
        let removed = self.store.flush().await?;
        tracing::info!(removed, "Flushed response cache for all tenants");
        Ok(removed)
    }

    async fn send(
        &self,
        method: HttpMethod,
        endpoint: &str,
        params: &RequestParams,
    ) -> Result<Value, ApiRequestError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let builder = match method {
            HttpMethod::Get => self.http.get(&url),
            HttpMethod::Post => self.http.post(&url),
            HttpMethod::Delete => self.http.delete(&url),
        }
        .header(AUTHORIZATION, self.credential.bearer())
        .header(ACCEPT, "application/json");

        let builder = if !method.uses_query() {
            builder.json(params)
        } else if params.is_empty() {
            builder
        } else {
            builder.query(params)
        };

        let response = builder
            .send()
            .await
            .map_err(|e| ApiRequestError::connection(endpoint, describe_transport_error(&e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiRequestError::connection(endpoint, describe_transport_error(&e)))?;

        parse_body(endpoint, status.as_u16(), status.is_success(), &body)
    }
}

/// Turn a status + body into the decoded value or the matching error.
fn parse_body(
    endpoint: &str,
    status: u16,
    success: bool,
    body: &str,
) -> Result<Value, ApiRequestError> {
    if !success {
        return Err(ApiRequestError::http(endpoint, status, body));
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body)
        .map_err(|e| ApiRequestError::decode(endpoint, status, body, e.to_string()))
}

fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timed out: {}", err)
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        err.to_string()
    }
}
