//! Read-through cache behaviour of `CachedApiClient` against a mock backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reelhub_cache::{CacheKey, CacheStats, CacheStore, InMemoryCacheStore};
use reelhub_client::{BackendApi, CachedApiClient};
use reelhub_core::{CacheError, CacheResult, HttpMethod, RequestParams, TenantCredential};
use reelhub_test_utils::assertions::{
    assert_connection_error, assert_decode_error, assert_http_error,
};
use reelhub_test_utils::{fixtures, unreachable_config, ManualClock, MockBackend};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

const VIDEOS: &str = "/api/v1/wordpress/videos";
const SYNC_LOGS: &str = "/api/v1/wordpress/sync/logs";
const TENANT_INFO: &str = "/api/v1/tenant/info";

fn client_for(
    backend: &MockBackend,
    key: &str,
    store: Arc<InMemoryCacheStore>,
) -> CachedApiClient<InMemoryCacheStore> {
    CachedApiClient::configure(&backend.config(key), None, store).expect("client should build")
}

fn page(limit: i64, offset: i64) -> RequestParams {
    RequestParams::new().with("limit", limit).with("offset", offset)
}

// ============================================================================
// READ-THROUGH
// ============================================================================

#[tokio::test]
async fn test_second_identical_request_served_from_cache() {
    let backend = MockBackend::start().await;
    backend
        .respond_json(HttpMethod::Get, VIDEOS, 200, fixtures::videos_page(10, 42))
        .await;
    let client = client_for(&backend, "tenant-a", Arc::new(InMemoryCacheStore::new()));

    let first = client
        .request(HttpMethod::Get, VIDEOS, &page(10, 0), 120)
        .await
        .expect("first request should succeed");
    let second = client
        .request(HttpMethod::Get, VIDEOS, &page(10, 0), 120)
        .await
        .expect("second request should succeed");

    assert_eq!(first, second);
    assert_eq!(first["total"], 42);
    assert_eq!(first["videos"].as_array().map(Vec::len), Some(10));
    assert_eq!(backend.hits(VIDEOS).await, 1, "second call must not reach the network");
}

#[tokio::test]
async fn test_parameter_order_does_not_change_cache_entry() {
    let backend = MockBackend::start().await;
    backend
        .respond_json(HttpMethod::Get, VIDEOS, 200, fixtures::videos_page(3, 3))
        .await;
    let client = client_for(&backend, "tenant-a", Arc::new(InMemoryCacheStore::new()));

    let forward = RequestParams::new().with("limit", 10).with("offset", 0);
    let reverse = RequestParams::new().with("offset", 0).with("limit", 10);

    client
        .request(HttpMethod::Get, VIDEOS, &forward, 120)
        .await
        .expect("request should succeed");
    client
        .request(HttpMethod::Get, VIDEOS, &reverse, 120)
        .await
        .expect("request should succeed");

    assert_eq!(backend.hits(VIDEOS).await, 1);
}

#[tokio::test]
async fn test_get_sends_query_and_auth_headers() {
    let backend = MockBackend::start().await;
    backend
        .respond_json(HttpMethod::Get, VIDEOS, 200, fixtures::videos_page(1, 1))
        .await;
    let client = client_for(&backend, "tk_tenant_a", Arc::new(InMemoryCacheStore::new()));

    client
        .request(HttpMethod::Get, VIDEOS, &page(10, 20), 0)
        .await
        .expect("request should succeed");

    let requests = backend.requests().await;
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    let query: Vec<(String, String)> = request.url.query_pairs().into_owned().collect();
    assert!(query.contains(&("limit".to_string(), "10".to_string())));
    assert!(query.contains(&("offset".to_string(), "20".to_string())));
    assert_eq!(
        request.headers.get("authorization").and_then(|v| v.to_str().ok()),
        Some("Bearer tk_tenant_a")
    );
    assert_eq!(
        request.headers.get("accept").and_then(|v| v.to_str().ok()),
        Some("application/json")
    );
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let backend = MockBackend::start().await;
    backend
        .respond_json(HttpMethod::Post, "/api/v1/search/semantic", 200, json!({"results": []}))
        .await;
    let client = client_for(&backend, "tenant-a", Arc::new(InMemoryCacheStore::new()));

    let params = RequestParams::new().with("query", "morning yoga").with("limit", 10);
    client
        .request(HttpMethod::Post, "/api/v1/search/semantic", &params, 0)
        .await
        .expect("request should succeed");

    let requests = backend.requests().await;
    let body: Value = serde_json::from_slice(&requests[0].body).expect("body should be JSON");
    assert_eq!(body, json!({"query": "morning yoga", "limit": 10}));
    assert_eq!(requests[0].url.query(), None);
}

#[tokio::test]
async fn test_delete_sends_query_without_body() {
    let backend = MockBackend::start().await;
    Mock::given(method("DELETE"))
        .and(path(SYNC_LOGS))
        .and(query_param("older_than_days", "30"))
        .and(query_param("status", "failed"))
        .and(header("authorization", "Bearer tk_tenant_a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": 4})))
        .expect(1)
        .mount(backend.server())
        .await;
    let client = client_for(&backend, "tk_tenant_a", Arc::new(InMemoryCacheStore::new()));

    let params = RequestParams::new()
        .with("older_than_days", 30)
        .with("status", "failed");
    let result = client
        .request(HttpMethod::Delete, SYNC_LOGS, &params, 0)
        .await
        .expect("request should succeed");
    assert_eq!(result, json!({"deleted": 4}));

    let requests = backend.requests().await;
    assert_eq!(requests.len(), 1);
    assert!(requests[0].body.is_empty(), "DELETE must not carry a JSON body");
    assert!(requests[0].headers.get("content-type").is_none());
}

#[tokio::test]
async fn test_empty_success_body_is_null() {
    let backend = MockBackend::start().await;
    backend
        .respond_raw(HttpMethod::Post, "/api/v1/wordpress/sync/trigger", 200, "")
        .await;
    let client = client_for(&backend, "tenant-a", Arc::new(InMemoryCacheStore::new()));

    let value = client
        .request(HttpMethod::Post, "/api/v1/wordpress/sync/trigger", &RequestParams::new(), 0)
        .await
        .expect("request should succeed");
    assert_eq!(value, Value::Null);
}

// ============================================================================
// TTL
// ============================================================================

#[tokio::test]
async fn test_zero_ttl_never_reads_or_populates_cache() {
    let backend = MockBackend::start().await;
    backend
        .respond_json(HttpMethod::Get, "/health/detailed", 200, fixtures::healthy())
        .await;
    let store = Arc::new(InMemoryCacheStore::new());
    let client = client_for(&backend, "tenant-a", store.clone());

    // A stale value planted under the same key must be ignored at TTL 0.
    let key = client.cache_key("/health/detailed", &RequestParams::new());
    store
        .set(&key, &json!({"status": "planted"}), Duration::from_secs(300))
        .await
        .expect("set should succeed");

    for _ in 0..2 {
        let value = client
            .request(HttpMethod::Get, "/health/detailed", &RequestParams::new(), 0)
            .await
            .expect("request should succeed");
        assert_eq!(value["status"], "healthy");
    }

    assert_eq!(backend.hits("/health/detailed").await, 2);
    let stats = store.stats().await.expect("stats should succeed");
    assert_eq!(stats.entry_count, 1, "only the planted entry should exist");
    assert_eq!(stats.hits + stats.misses, 0, "TTL 0 must not consult the cache");
}

#[tokio::test]
async fn test_entry_served_until_ttl_elapses() {
    let backend = MockBackend::start().await;
    backend
        .respond_json(HttpMethod::Get, SYNC_LOGS, 200, fixtures::sync_logs(3))
        .await;
    let clock = Arc::new(ManualClock::starting_now());
    let store = Arc::new(InMemoryCacheStore::with_clock(clock.clone()));
    let client = client_for(&backend, "tenant-a", store);
    let params = RequestParams::new().with("limit", 50);

    client
        .request(HttpMethod::Get, SYNC_LOGS, &params, 60)
        .await
        .expect("request should succeed");

    clock.advance_secs(59);
    client
        .request(HttpMethod::Get, SYNC_LOGS, &params, 60)
        .await
        .expect("request should succeed");
    assert_eq!(backend.hits(SYNC_LOGS).await, 1, "still live at 59s");

    clock.advance_secs(1);
    client
        .request(HttpMethod::Get, SYNC_LOGS, &params, 60)
        .await
        .expect("request should succeed");
    assert_eq!(backend.hits(SYNC_LOGS).await, 2, "expired at 60s");
}

// ============================================================================
// INVALIDATION
// ============================================================================

#[tokio::test]
async fn test_invalidate_removes_exactly_one_entry() {
    let backend = MockBackend::start().await;
    backend
        .respond_json(HttpMethod::Get, SYNC_LOGS, 200, fixtures::sync_logs(2))
        .await;
    let store = Arc::new(InMemoryCacheStore::new());
    let client = client_for(&backend, "tenant-a", store.clone());
    let standard = RequestParams::new().with("limit", 50);
    let short = RequestParams::new().with("limit", 10);

    for params in [&standard, &short] {
        client
            .request(HttpMethod::Get, SYNC_LOGS, params, 60)
            .await
            .expect("request should succeed");
    }
    assert_eq!(store.stats().await.expect("stats").entry_count, 2);

    assert!(client
        .invalidate(SYNC_LOGS, &standard)
        .await
        .expect("invalidate should succeed"));
    assert_eq!(store.stats().await.expect("stats").entry_count, 1);

    client
        .request(HttpMethod::Get, SYNC_LOGS, &short, 60)
        .await
        .expect("request should succeed");
    assert_eq!(backend.hits(SYNC_LOGS).await, 2, "other entry still cached");

    client
        .request(HttpMethod::Get, SYNC_LOGS, &standard, 60)
        .await
        .expect("request should succeed");
    assert_eq!(backend.hits(SYNC_LOGS).await, 3, "invalidated entry refetched");
}

#[tokio::test]
async fn test_invalidate_missing_entry_is_noop() {
    let backend = MockBackend::start().await;
    let client = client_for(&backend, "tenant-a", Arc::new(InMemoryCacheStore::new()));
    let removed = client
        .invalidate(SYNC_LOGS, &RequestParams::new().with("limit", 50))
        .await
        .expect("invalidate should succeed");
    assert!(!removed);
}

#[tokio::test]
async fn test_invalidate_all_flushes_every_tenant() {
    let backend = MockBackend::start().await;
    backend
        .respond_json(HttpMethod::Get, TENANT_INFO, 200, fixtures::tenant_info("shared"))
        .await;
    let store = Arc::new(InMemoryCacheStore::new());
    let tenant_a = client_for(&backend, "tenant-a", store.clone());
    let tenant_b = tenant_a.with_credential(TenantCredential::new("tenant-b"));

    for client in [&tenant_a, &tenant_b] {
        client
            .request(HttpMethod::Get, TENANT_INFO, &RequestParams::new(), 300)
            .await
            .expect("request should succeed");
    }
    assert_eq!(backend.hits(TENANT_INFO).await, 2);

    let removed = tenant_a
        .invalidate_all()
        .await
        .expect("invalidate_all should succeed");
    assert_eq!(removed, 2);

    for client in [&tenant_a, &tenant_b] {
        client
            .request(HttpMethod::Get, TENANT_INFO, &RequestParams::new(), 300)
            .await
            .expect("request should succeed");
    }
    assert_eq!(backend.hits(TENANT_INFO).await, 4, "both tenants refetch");
}

// ============================================================================
// TENANT ISOLATION
// ============================================================================

#[tokio::test]
async fn test_tenants_never_observe_each_others_cache() {
    let backend = MockBackend::start().await;
    for tenant in ["tenant-a", "tenant-b"] {
        Mock::given(method("GET"))
            .and(path(TENANT_INFO))
            .and(header("authorization", format!("Bearer {}", tenant).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::tenant_info(tenant)))
            .mount(backend.server())
            .await;
    }
    let store = Arc::new(InMemoryCacheStore::new());
    let tenant_a = client_for(&backend, "tenant-a", store);
    let tenant_b = tenant_a.with_credential(TenantCredential::new("tenant-b"));

    let a = tenant_a
        .request(HttpMethod::Get, TENANT_INFO, &RequestParams::new(), 300)
        .await
        .expect("request should succeed");
    let b = tenant_b
        .request(HttpMethod::Get, TENANT_INFO, &RequestParams::new(), 300)
        .await
        .expect("request should succeed");

    assert_eq!(a["name"], "tenant-a");
    assert_eq!(b["name"], "tenant-b");
    assert_eq!(backend.hits(TENANT_INFO).await, 2);
}

// ============================================================================
// FAILURES
// ============================================================================

#[tokio::test]
async fn test_server_error_is_http_error_and_not_cached() {
    let backend = MockBackend::start().await;
    backend
        .respond_raw(HttpMethod::Get, TENANT_INFO, 500, "internal error")
        .await;
    let store = Arc::new(InMemoryCacheStore::new());
    let client = client_for(&backend, "tenant-a", store.clone());

    let result = client
        .request(HttpMethod::Get, TENANT_INFO, &RequestParams::new(), 300)
        .await;
    assert_http_error(&result, 500);
    if let Err(err) = &result {
        assert_eq!(err.endpoint, TENANT_INFO);
        assert_eq!(err.body.as_deref(), Some("internal error"));
    }

    let again = client
        .request(HttpMethod::Get, TENANT_INFO, &RequestParams::new(), 300)
        .await;
    assert_http_error(&again, 500);
    assert_eq!(backend.hits(TENANT_INFO).await, 2, "failures are never cached");
    assert_eq!(store.stats().await.expect("stats").entry_count, 0);
}

#[tokio::test]
async fn test_not_found_is_http_error() {
    let backend = MockBackend::start().await;
    backend
        .respond_json(HttpMethod::Get, "/api/v1/wordpress/videos/999", 404, json!({"detail": "Not found"}))
        .await;
    let client = client_for(&backend, "tenant-a", Arc::new(InMemoryCacheStore::new()));

    let result = client
        .request(HttpMethod::Get, "/api/v1/wordpress/videos/999", &RequestParams::new(), 300)
        .await;
    assert_http_error(&result, 404);
}

#[tokio::test]
async fn test_invalid_json_is_decode_error_and_not_cached() {
    let backend = MockBackend::start().await;
    backend
        .respond_raw(HttpMethod::Get, "/api/v1/s3/info", 200, "<html>maintenance</html>")
        .await;
    let store = Arc::new(InMemoryCacheStore::new());
    let client = client_for(&backend, "tenant-a", store.clone());

    let result = client
        .request(HttpMethod::Get, "/api/v1/s3/info", &RequestParams::new(), 600)
        .await;
    assert_decode_error(&result);
    assert_eq!(store.stats().await.expect("stats").entry_count, 0);
}

#[tokio::test]
async fn test_unreachable_host_is_connection_error() {
    let client = CachedApiClient::configure(
        &unreachable_config(),
        None,
        Arc::new(InMemoryCacheStore::new()),
    )
    .expect("client should build");

    let result = client
        .request(HttpMethod::Get, "/health/detailed", &RequestParams::new(), 0)
        .await;
    assert_connection_error(&result);
}

#[tokio::test]
async fn test_timeout_is_connection_error() {
    let backend = MockBackend::start().await;
    backend
        .respond_slowly("/api/v1/tenant/analytics", Duration::from_secs(3))
        .await;
    let mut config = backend.config("tenant-a");
    config.timeout_secs = 1;
    let client = CachedApiClient::configure(&config, None, Arc::new(InMemoryCacheStore::new()))
        .expect("client should build");

    let result = client
        .request(HttpMethod::Get, "/api/v1/tenant/analytics", &RequestParams::new(), 600)
        .await;
    assert_connection_error(&result);
}

// ============================================================================
// CACHE DEGRADATION
// ============================================================================

/// Store whose every operation fails.
struct BrokenStore;

#[async_trait]
impl CacheStore for BrokenStore {
    async fn get(&self, _key: &CacheKey) -> CacheResult<Option<Value>> {
        Err(CacheError::Backend {
            reason: "connection refused".to_string(),
        })
    }

    async fn set(&self, _key: &CacheKey, _value: &Value, _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::Backend {
            reason: "connection refused".to_string(),
        })
    }

    async fn delete(&self, _key: &CacheKey) -> CacheResult<bool> {
        Err(CacheError::LockPoisoned)
    }

    async fn flush(&self) -> CacheResult<u64> {
        Err(CacheError::LockPoisoned)
    }

    async fn purge_expired(&self) -> CacheResult<u64> {
        Ok(0)
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        Ok(CacheStats::default())
    }
}

#[tokio::test]
async fn test_broken_store_degrades_to_uncached() {
    let backend = MockBackend::start().await;
    backend
        .respond_json(HttpMethod::Get, TENANT_INFO, 200, fixtures::tenant_info("acme"))
        .await;
    let client = CachedApiClient::configure(&backend.config("tenant-a"), None, Arc::new(BrokenStore))
        .expect("client should build");

    for _ in 0..2 {
        let value = client
            .request(HttpMethod::Get, TENANT_INFO, &RequestParams::new(), 300)
            .await
            .expect("cache failures must not fail the call");
        assert_eq!(value["name"], "acme");
    }
    assert_eq!(backend.hits(TENANT_INFO).await, 2);

    assert!(client.invalidate_all().await.is_err());
}

#[tokio::test]
async fn test_dyn_store_client() {
    let backend = MockBackend::start().await;
    backend
        .respond_json(HttpMethod::Get, TENANT_INFO, 200, fixtures::tenant_info("acme"))
        .await;
    let store: Arc<dyn CacheStore> = Arc::new(InMemoryCacheStore::new());
    let api: BackendApi = BackendApi::new(
        CachedApiClient::configure(&backend.config("tenant-a"), None, store)
            .expect("client should build"),
    );

    api.tenant_info().await.expect("request should succeed");
    api.tenant_info().await.expect("request should succeed");
    assert_eq!(backend.hits(TENANT_INFO).await, 1);
}

// ============================================================================
// KEY PROPERTIES
// ============================================================================

mod key_properties {
    use super::*;
    use proptest::prelude::*;
    use reelhub_test_utils::generators::{arb_api_key, arb_cached_endpoint, arb_shuffled_params};
    use reelhub_test_utils::BackendConfig;

    fn offline_client(key: &str) -> CachedApiClient<InMemoryCacheStore> {
        let config = BackendConfig {
            default_api_key: key.to_string(),
            ..unreachable_config()
        };
        CachedApiClient::configure(&config, None, Arc::new(InMemoryCacheStore::new()))
            .expect("client should build")
    }

    proptest! {
        #[test]
        fn prop_client_key_ignores_param_order(
            key in arb_api_key(),
            endpoint in arb_cached_endpoint(),
            (ordered, shuffled) in arb_shuffled_params(),
        ) {
            let client = offline_client(&key);
            prop_assert_eq!(
                client.cache_key(endpoint.path(), &RequestParams::from_pairs(ordered)),
                client.cache_key(endpoint.path(), &RequestParams::from_pairs(shuffled))
            );
        }

        #[test]
        fn prop_rebinding_credential_changes_key(
            first in arb_api_key(),
            second in arb_api_key(),
            endpoint in arb_cached_endpoint(),
        ) {
            prop_assume!(first != second);
            let client = offline_client(&first);
            let other = client.with_credential(TenantCredential::new(second));
            let params = RequestParams::new();
            prop_assert_ne!(
                client.cache_key(endpoint.path(), &params),
                other.cache_key(endpoint.path(), &params)
            );
        }
    }
}
