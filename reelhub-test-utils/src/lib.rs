//! ReelHub Test Utilities
//!
//! Shared test infrastructure for the ReelHub workspace:
//! - A wiremock-backed stand-in for the backend API
//! - A manual clock for driving cache expiry
//! - Proptest generators for request parameters and credentials
//! - JSON fixtures shaped like real backend responses
//! - Assertions for the API error classes

pub use reelhub_cache::{CacheKey, CacheStore, Clock, InMemoryCacheStore};
pub use reelhub_core::{
    ApiErrorKind, ApiRequestError, BackendConfig, Endpoint, HttpMethod, ParamValue,
    RequestParams, TenantCredential,
};

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// MANUAL CLOCK
// ============================================================================

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    pub fn advance(&self, by: Duration) {
        let delta = TimeDelta::from_std(by).unwrap_or(TimeDelta::MAX);
        if let Ok(mut now) = self.now.lock() {
            *now = now.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC);
        }
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_else(|e| *e.into_inner())
    }
}

// ============================================================================
// MOCK BACKEND
// ============================================================================

/// Stand-in for the backend API, listening on a random local port.
pub struct MockBackend {
    server: MockServer,
}

impl MockBackend {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// Configuration pointing at this server with a short timeout.
    pub fn config(&self, default_api_key: &str) -> BackendConfig {
        BackendConfig {
            api_url: self.uri(),
            timeout_secs: 5,
            default_api_key: default_api_key.to_string(),
            ..BackendConfig::default()
        }
    }

    /// Answer `verb path` with `status` and a JSON body.
    pub async fn respond_json(&self, verb: HttpMethod, route: &str, status: u16, body: serde_json::Value) {
        Mock::given(method(verb.as_str()))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Answer `verb path` with `status` and a raw body.
    pub async fn respond_raw(&self, verb: HttpMethod, route: &str, status: u16, body: &str) {
        Mock::given(method(verb.as_str()))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Answer `GET path` with 200 after `delay`.
    pub async fn respond_slowly(&self, route: &str, delay: Duration) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({}))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Number of requests received for `route`, any method.
    pub async fn hits(&self, route: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == route)
            .count()
    }

    /// Every request received so far.
    pub async fn requests(&self) -> Vec<wiremock::Request> {
        self.server.received_requests().await.unwrap_or_default()
    }
}

/// A base URL nothing listens on.
pub fn unreachable_config() -> BackendConfig {
    BackendConfig {
        api_url: "http://127.0.0.1:9".to_string(),
        timeout_secs: 2,
        default_api_key: "unreachable".to_string(),
        ..BackendConfig::default()
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for ReelHub request inputs.

    use super::*;
    use proptest::prelude::*;

    pub fn arb_param_value() -> impl Strategy<Value = ParamValue> {
        prop_oneof![
            any::<bool>().prop_map(ParamValue::Bool),
            (0i64..10_000).prop_map(ParamValue::Integer),
            "[a-z0-9_-]{1,12}".prop_map(ParamValue::String),
        ]
    }

    /// Distinct keys with arbitrary values, as ordered pairs.
    pub fn arb_param_pairs() -> impl Strategy<Value = Vec<(String, ParamValue)>> {
        proptest::collection::btree_map("[a-z_]{1,10}", arb_param_value(), 0..6)
            .prop_map(|map| map.into_iter().collect())
    }

    /// Pairs plus a shuffled copy of the same pairs.
    pub fn arb_shuffled_params(
    ) -> impl Strategy<Value = (Vec<(String, ParamValue)>, Vec<(String, ParamValue)>)> {
        arb_param_pairs().prop_flat_map(|pairs| {
            let original = pairs.clone();
            Just(pairs)
                .prop_shuffle()
                .prop_map(move |shuffled| (original.clone(), shuffled))
        })
    }

    pub fn arb_api_key() -> impl Strategy<Value = String> {
        "tk_[A-Za-z0-9]{8,32}"
    }

    pub fn arb_cached_endpoint() -> impl Strategy<Value = Endpoint> {
        proptest::sample::select(
            Endpoint::ALL
                .iter()
                .copied()
                .filter(|endpoint| endpoint.default_ttl_secs() > 0)
                .collect::<Vec<_>>(),
        )
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! JSON bodies shaped like real backend responses.

    use serde_json::{json, Value};

    pub fn healthy() -> Value {
        json!({
            "status": "healthy",
            "database": "connected",
            "redis": "connected"
        })
    }

    pub fn degraded() -> Value {
        json!({
            "status": "degraded",
            "database": "connected",
            "redis": "unreachable"
        })
    }

    pub fn tenant_info(name: &str) -> Value {
        json!({
            "name": name,
            "display_name": format!("{} Studio", name),
            "plan_type": "pro",
            "is_active": true
        })
    }

    pub fn video(id: u64) -> Value {
        json!({
            "id": id,
            "title": format!("Video {}", id),
            "category": "yoga",
            "difficulty": "beginner",
            "duration": 20,
            "instructor": "Sam"
        })
    }

    pub fn video_with_audio(id: u64, audio_key: &str) -> Value {
        let mut video = video(id);
        if let Some(map) = video.as_object_mut() {
            map.insert("audio_s3_key".to_string(), json!(audio_key));
        }
        video
    }

    /// A `{videos, total}` page with `count` videos.
    pub fn videos_page(count: u64, total: u64) -> Value {
        json!({
            "videos": (1..=count).map(video).collect::<Vec<_>>(),
            "total": total
        })
    }

    pub fn wordpress_stats() -> Value {
        json!({
            "total_videos": 42,
            "categories": {"yoga": 20, "hiit": 12, "pilates": 10}
        })
    }

    pub fn tenant_quota() -> Value {
        json!({
            "searches_used": 12,
            "searches_limit": 1000,
            "embeddings_used": 40,
            "embeddings_limit": 5000
        })
    }

    pub fn s3_info() -> Value {
        json!({
            "bucket_name": "reelhub-media",
            "total_files": 128
        })
    }

    pub fn sync_logs(entries: usize) -> Value {
        json!({
            "logs": (0..entries)
                .map(|i| json!({"id": i, "status": "completed", "videos_synced": 10}))
                .collect::<Vec<_>>()
        })
    }

    pub fn presigned(url: &str) -> Value {
        json!({"url": url, "expires_in": 3600})
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for API error classes.

    use super::*;

    #[track_caller]
    pub fn assert_http_error<T: std::fmt::Debug>(result: &Result<T, ApiRequestError>, status: u16) {
        match result {
            Err(err) if err.kind == ApiErrorKind::Http => {
                assert_eq!(err.status, Some(status), "Wrong HTTP status in error");
            }
            other => panic!("Expected HTTP {} error, got: {:?}", status, other),
        }
    }

    #[track_caller]
    pub fn assert_connection_error<T: std::fmt::Debug>(result: &Result<T, ApiRequestError>) {
        match result {
            Err(err) if err.kind == ApiErrorKind::Connection => {}
            other => panic!("Expected connection error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_decode_error<T: std::fmt::Debug>(result: &Result<T, ApiRequestError>) {
        match result {
            Err(err) if err.kind == ApiErrorKind::Decode => {}
            other => panic!("Expected decode error, got: {:?}", other),
        }
    }
}
