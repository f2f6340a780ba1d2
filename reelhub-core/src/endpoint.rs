//! HTTP methods and the catalog of backend endpoints.

use std::fmt;
use std::str::FromStr;

/// HTTP method used for a backend call.
///
/// GET and DELETE send their parameters in the query string; POST sends
/// them as a JSON body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether parameters travel in the query string.
    pub fn uses_query(&self) -> bool {
        !matches!(self, HttpMethod::Post)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(format!("Unsupported HTTP method: {}", s)),
        }
    }
}

/// Endpoints consumed from the backend API.
///
/// Each entry knows its path template, method, and how long a successful
/// response may be cached. Volatile or one-shot data (search, presigned
/// URLs, health) has a TTL of zero and is never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    TenantInfo,
    TenantAnalytics,
    TenantQuota,
    Videos,
    VideoDetail,
    RelatedVideos,
    WordPressStats,
    SemanticSearch,
    SyncLogs,
    SyncLogsClear,
    SyncTrigger,
    S3PublicUrl,
    S3PresignedUrl,
    S3Info,
    S3Files,
    Health,
}

impl Endpoint {
    pub const ALL: [Endpoint; 16] = [
        Endpoint::TenantInfo,
        Endpoint::TenantAnalytics,
        Endpoint::TenantQuota,
        Endpoint::Videos,
        Endpoint::VideoDetail,
        Endpoint::RelatedVideos,
        Endpoint::WordPressStats,
        Endpoint::SemanticSearch,
        Endpoint::SyncLogs,
        Endpoint::SyncLogsClear,
        Endpoint::SyncTrigger,
        Endpoint::S3PublicUrl,
        Endpoint::S3PresignedUrl,
        Endpoint::S3Info,
        Endpoint::S3Files,
        Endpoint::Health,
    ];

    /// Path template. `{id}` and `{key}` are filled by [`Endpoint::path_with`].
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::TenantInfo => "/api/v1/tenant/info",
            Endpoint::TenantAnalytics => "/api/v1/tenant/analytics",
            Endpoint::TenantQuota => "/api/v1/tenant/quota",
            Endpoint::Videos => "/api/v1/wordpress/videos",
            Endpoint::VideoDetail => "/api/v1/wordpress/videos/{id}",
            Endpoint::RelatedVideos => "/api/v1/wordpress/videos/{id}/related",
            Endpoint::WordPressStats => "/api/v1/wordpress/stats",
            Endpoint::SemanticSearch => "/api/v1/search/semantic",
            Endpoint::SyncLogs => "/api/v1/wordpress/sync/logs",
            Endpoint::SyncLogsClear => "/api/v1/wordpress/sync/logs/clear",
            Endpoint::SyncTrigger => "/api/v1/wordpress/sync/trigger",
            Endpoint::S3PublicUrl => "/api/v1/s3/public-url/{key}",
            Endpoint::S3PresignedUrl => "/api/v1/s3/presigned-url",
            Endpoint::S3Info => "/api/v1/s3/info",
            Endpoint::S3Files => "/api/v1/s3/files",
            Endpoint::Health => "/health/detailed",
        }
    }

    /// Fill the template placeholder. `{key}` segments are percent-encoded
    /// because object keys contain slashes.
    pub fn path_with(&self, segment: impl fmt::Display) -> String {
        let segment = segment.to_string();
        let template = self.path();
        if template.contains("{key}") {
            template.replace("{key}", &urlencoding::encode(&segment))
        } else {
            template.replace("{id}", &segment)
        }
    }

    pub fn method(&self) -> HttpMethod {
        match self {
            Endpoint::SemanticSearch
            | Endpoint::SyncLogsClear
            | Endpoint::SyncTrigger
            | Endpoint::S3PresignedUrl => HttpMethod::Post,
            _ => HttpMethod::Get,
        }
    }

    /// Default cache TTL in seconds (0 = never cached).
    pub fn default_ttl_secs(&self) -> u64 {
        match self {
            Endpoint::TenantInfo => 300,
            Endpoint::TenantAnalytics => 600,
            Endpoint::TenantQuota => 600,
            Endpoint::Videos => 120,
            Endpoint::VideoDetail => 300,
            Endpoint::RelatedVideos => 300,
            Endpoint::WordPressStats => 600,
            Endpoint::SyncLogs => 60,
            Endpoint::S3Info => 600,
            Endpoint::S3Files => 300,
            Endpoint::SemanticSearch
            | Endpoint::SyncLogsClear
            | Endpoint::SyncTrigger
            | Endpoint::S3PublicUrl
            | Endpoint::S3PresignedUrl
            | Endpoint::Health => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_from_str_is_case_insensitive() {
        assert_eq!("get".parse::<HttpMethod>(), Ok(HttpMethod::Get));
        assert_eq!("Post".parse::<HttpMethod>(), Ok(HttpMethod::Post));
        assert_eq!(" DELETE ".parse::<HttpMethod>(), Ok(HttpMethod::Delete));
        assert!("PATCH".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn test_post_sends_body() {
        assert!(HttpMethod::Get.uses_query());
        assert!(HttpMethod::Delete.uses_query());
        assert!(!HttpMethod::Post.uses_query());
    }

    #[test]
    fn test_path_with_fills_id() {
        assert_eq!(
            Endpoint::RelatedVideos.path_with(42),
            "/api/v1/wordpress/videos/42/related"
        );
    }

    #[test]
    fn test_path_with_encodes_object_keys() {
        assert_eq!(
            Endpoint::S3PublicUrl.path_with("tenant_1/videos/123/audio preview.mp3"),
            "/api/v1/s3/public-url/tenant_1%2Fvideos%2F123%2Faudio%20preview.mp3"
        );
    }

    #[test]
    fn test_ttls_within_bounds() {
        for endpoint in Endpoint::ALL {
            assert!(endpoint.default_ttl_secs() <= 600, "{:?}", endpoint);
        }
        assert_eq!(Endpoint::SyncLogs.default_ttl_secs(), 60);
        assert_eq!(Endpoint::WordPressStats.default_ttl_secs(), 600);
        assert_eq!(Endpoint::SemanticSearch.default_ttl_secs(), 0);
    }

    #[test]
    fn test_mutating_endpoints_are_post_and_uncached() {
        for endpoint in Endpoint::ALL {
            if endpoint.method() == HttpMethod::Post {
                assert_eq!(endpoint.default_ttl_secs(), 0, "{:?}", endpoint);
            }
        }
    }
}
