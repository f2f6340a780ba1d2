//! Typed operations over the backend endpoint catalog.
//!
//! Each method maps onto one [`Endpoint`] and uses that endpoint's default
//! cache TTL, so callers never pick TTLs by hand.

use reelhub_cache::CacheStore;
use reelhub_core::{ApiRequestError, CacheResult, Endpoint, RequestParams, TenantCredential};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::CachedApiClient;

/// Page size used by the sync log view. Mutations invalidate this page.
pub const SYNC_LOG_PAGE: u32 = 50;
pub const RELATED_VIDEOS_LIMIT: u32 = 6;
pub const SEARCH_LIMIT: u32 = 10;
pub const PRESIGNED_URL_TTL_SECS: u64 = 3600;
pub const S3_LIST_MAX_KEYS: u32 = 100;

/// Filters for the video listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoFilters {
    pub limit: u32,
    pub offset: u32,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub instructor: Option<String>,
    pub search: Option<String>,
    pub post_type: Option<String>,
    pub duration_min: Option<u32>,
    pub duration_max: Option<u32>,
    pub sort_by: String,
    pub sort_order: String,
}

impl Default for VideoFilters {
    fn default() -> Self {
        Self {
            limit: 24,
            offset: 0,
            category: None,
            difficulty: None,
            instructor: None,
            search: None,
            post_type: None,
            duration_min: None,
            duration_max: None,
            sort_by: "created_at".to_string(),
            sort_order: "desc".to_string(),
        }
    }
}

impl VideoFilters {
    /// Request parameters with unset and blank filters dropped.
    pub fn to_params(&self) -> RequestParams {
        let mut params = RequestParams::new()
            .with("limit", self.limit)
            .with("offset", self.offset);
        params.insert_opt("category", self.category.as_deref());
        params.insert_opt("difficulty", self.difficulty.as_deref());
        params.insert_opt("instructor", self.instructor.as_deref());
        params.insert_opt("search", self.search.as_deref());
        params.insert_opt("post_type", self.post_type.as_deref());
        params.insert_opt("duration_min", self.duration_min);
        params.insert_opt("duration_max", self.duration_max);
        params.insert_opt("sort_by", Some(self.sort_by.as_str()));
        params.insert_opt("sort_order", Some(self.sort_order.as_str()));
        params
    }
}

/// Backend API operations for one tenant.
pub struct BackendApi<S: CacheStore + ?Sized = dyn CacheStore> {
    client: CachedApiClient<S>,
}

impl<S: CacheStore + ?Sized> std::fmt::Debug for BackendApi<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendApi")
            .field("client", &self.client)
            .finish()
    }
}

impl<S: CacheStore + ?Sized> Clone for BackendApi<S> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
        }
    }
}

impl<S: CacheStore + ?Sized> BackendApi<S> {
    pub fn new(client: CachedApiClient<S>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &CachedApiClient<S> {
        &self.client
    }

    /// Same store and connection pool, another tenant.
    pub fn for_tenant(&self, credential: TenantCredential) -> Self {
        Self::new(self.client.with_credential(credential))
    }

    async fn call(
        &self,
        endpoint: Endpoint,
        path: &str,
        params: &RequestParams,
    ) -> Result<Value, ApiRequestError> {
        self.client
            .request(endpoint.method(), path, params, endpoint.default_ttl_secs())
            .await
    }

    async fn call_static(
        &self,
        endpoint: Endpoint,
        params: &RequestParams,
    ) -> Result<Value, ApiRequestError> {
        self.call(endpoint, endpoint.path(), params).await
    }

    // ---- Tenant ----

    pub async fn tenant_info(&self) -> Result<Value, ApiRequestError> {
        self.call_static(Endpoint::TenantInfo, &RequestParams::new())
            .await
    }

    pub async fn tenant_analytics(&self) -> Result<Value, ApiRequestError> {
        self.call_static(Endpoint::TenantAnalytics, &RequestParams::new())
            .await
    }

    pub async fn tenant_quota(&self) -> Result<Value, ApiRequestError> {
        self.call_static(Endpoint::TenantQuota, &RequestParams::new())
            .await
    }

    // ---- Videos ----

    pub async fn videos(&self, filters: &VideoFilters) -> Result<Value, ApiRequestError> {
        self.call_static(Endpoint::Videos, &filters.to_params())
            .await
    }

    pub async fn video(&self, video_id: u64) -> Result<Value, ApiRequestError> {
        let path = Endpoint::VideoDetail.path_with(video_id);
        self.call(Endpoint::VideoDetail, &path, &RequestParams::new())
            .await
    }

    pub async fn related_videos(&self, video_id: u64, limit: u32) -> Result<Value, ApiRequestError> {
        let path = Endpoint::RelatedVideos.path_with(video_id);
        let params = RequestParams::new().with("limit", limit);
        self.call(Endpoint::RelatedVideos, &path, &params).await
    }

    pub async fn wordpress_stats(&self) -> Result<Value, ApiRequestError> {
        self.call_static(Endpoint::WordPressStats, &RequestParams::new())
            .await
    }

    /// Semantic search. Never cached.
    pub async fn search_videos(&self, query: &str, limit: u32) -> Result<Value, ApiRequestError> {
        let params = RequestParams::new()
            .with("query", query)
            .with("limit", limit);
        self.call_static(Endpoint::SemanticSearch, &params).await
    }

    // ---- Sync ----

    pub async fn sync_logs(&self, limit: u32) -> Result<Value, ApiRequestError> {
        self.call_static(Endpoint::SyncLogs, &sync_log_params(limit))
            .await
    }

    /// Clear the tenant's sync logs, then drop the cached standard log page
    /// so the next read reflects the change.
    pub async fn clear_sync_logs(&self) -> Result<Value, ApiRequestError> {
        let result = self
            .call_static(Endpoint::SyncLogsClear, &RequestParams::new())
            .await?;
        self.forget_sync_log_page().await;
        Ok(result)
    }

    /// Start a WordPress sync, then drop the cached standard log page.
    pub async fn trigger_sync(&self) -> Result<Value, ApiRequestError> {
        let result = self
            .call_static(Endpoint::SyncTrigger, &RequestParams::new())
            .await?;
        tracing::info!(
            sync_log_id = ?result.get("sync_log_id"),
            status = ?result.get("status"),
            "Sync triggered"
        );
        self.forget_sync_log_page().await;
        Ok(result)
    }

    async fn forget_sync_log_page(&self) {
        if let Err(e) = self.invalidate_sync_logs(SYNC_LOG_PAGE).await {
            tracing::warn!(error = %e, "Failed to invalidate cached sync logs");
        }
    }

    pub async fn invalidate_sync_logs(&self, limit: u32) -> CacheResult<bool> {
        self.client
            .invalidate(Endpoint::SyncLogs.path(), &sync_log_params(limit))
            .await
    }

    // ---- S3 / audio previews ----

    /// Public URL for an object key. Keys may contain slashes; they are
    /// percent-encoded into a single path segment.
    pub async fn public_url(&self, key: &str) -> Result<Value, ApiRequestError> {
        let path = Endpoint::S3PublicUrl.path_with(key);
        self.call(Endpoint::S3PublicUrl, &path, &RequestParams::new())
            .await
    }

    pub async fn presigned_url(
        &self,
        key: &str,
        expires_in_secs: u64,
    ) -> Result<Value, ApiRequestError> {
        let params = RequestParams::new()
            .with("s3_key", key)
            .with("expiration", expires_in_secs);
        self.call_static(Endpoint::S3PresignedUrl, &params).await
    }

    pub async fn s3_info(&self) -> Result<Value, ApiRequestError> {
        self.call_static(Endpoint::S3Info, &RequestParams::new())
            .await
    }

    pub async fn list_s3_files(
        &self,
        prefix: Option<&str>,
        max_keys: u32,
    ) -> Result<Value, ApiRequestError> {
        let mut params = RequestParams::new().with("max_keys", max_keys);
        params.insert_opt("prefix", prefix);
        self.call_static(Endpoint::S3Files, &params).await
    }

    /// Presigned audio preview URL for a video, if it has one.
    ///
    /// Best effort: a video without `audio_s3_key`, or any failure along the
    /// way, yields `None`.
    pub async fn audio_preview_url(&self, video_id: u64) -> Option<String> {
        let video = match self.video(video_id).await {
            Ok(video) => video,
            Err(e) => {
                tracing::warn!(video_id, error = %e, "Failed to load video for audio preview");
                return None;
            }
        };

        let key = video
            .get("audio_s3_key")
            .and_then(Value::as_str)
            .filter(|k| !k.trim().is_empty())?;

        match self.presigned_url(key, PRESIGNED_URL_TTL_SECS).await {
            Ok(presigned) => presigned
                .get("url")
                .and_then(Value::as_str)
                .map(str::to_string),
            Err(e) => {
                tracing::warn!(video_id, error = %e, "Failed to presign audio preview");
                None
            }
        }
    }

    // ---- Health ----

    /// Detailed health report. Never cached.
    pub async fn health_check(&self) -> Result<Value, ApiRequestError> {
        self.call_static(Endpoint::Health, &RequestParams::new())
            .await
    }

    /// `true` only when the backend reports `status: "healthy"`.
    pub async fn is_healthy(&self) -> bool {
        match self.health_check().await {
            Ok(report) => report.get("status").and_then(Value::as_str) == Some("healthy"),
            Err(_) => false,
        }
    }
}

fn sync_log_params(limit: u32) -> RequestParams {
    RequestParams::new().with("limit", limit)
}
