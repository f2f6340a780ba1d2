//! Connectivity probe run by the `reelhub-probe` binary.
//!
//! Health and tenant info must succeed; everything after that is reported
//! but tolerated.

use std::io::Write;

use reelhub_cache::CacheStore;
use reelhub_core::{ApiRequestError, Endpoint, ReelhubError, ReelhubResult, TenantInfo};
use serde_json::Value;

use crate::backend::{BackendApi, VideoFilters};
use crate::listing::{optional, VideoListing};

const SAMPLE_VIDEOS: u32 = 5;

/// What the probe found.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub health_status: String,
    pub tenant: TenantInfo,
    pub total_videos: Option<u64>,
    /// Names of tolerated sections that failed.
    pub unavailable: Vec<&'static str>,
}

impl ProbeReport {
    pub fn is_complete(&self) -> bool {
        self.unavailable.is_empty()
    }
}

/// Run every probe step against `api`, writing human-readable progress to
/// `out`. Fails only when health or tenant info fail.
pub async fn run_probe<S, W>(api: &BackendApi<S>, out: &mut W) -> ReelhubResult<ProbeReport>
where
    S: CacheStore + ?Sized,
    W: Write + Send,
{
    writeln!(out, "Testing backend API at {}", api.client().base_url()).map_err(io_err)?;

    writeln!(out, "[1] Health check").map_err(io_err)?;
    let health = api.health_check().await?;
    let health_status = str_field(&health, "status").unwrap_or("unknown").to_string();
    writeln!(out, "    status:   {}", health_status).map_err(io_err)?;
    writeln!(out, "    database: {}", str_field(&health, "database").unwrap_or("N/A")).map_err(io_err)?;
    writeln!(out, "    redis:    {}", str_field(&health, "redis").unwrap_or("N/A")).map_err(io_err)?;

    writeln!(out, "[2] Tenant info").map_err(io_err)?;
    let raw_tenant = api.tenant_info().await?;
    let tenant: TenantInfo = serde_json::from_value(raw_tenant.clone()).map_err(|e| {
        ApiRequestError::decode(Endpoint::TenantInfo.path(), 200, &raw_tenant.to_string(), e.to_string())
    })?;
    writeln!(out, "    tenant: {} ({})", tenant.label(), tenant.name).map_err(io_err)?;
    writeln!(out, "    plan:   {}", tenant.plan_type).map_err(io_err)?;
    writeln!(out, "    active: {}", if tenant.is_active { "yes" } else { "no" }).map_err(io_err)?;

    let mut unavailable = Vec::new();

    writeln!(out, "[3] Video list (first {})", SAMPLE_VIDEOS).map_err(io_err)?;
    let filters = VideoFilters {
        limit: SAMPLE_VIDEOS,
        ..VideoFilters::default()
    };
    let total_videos = match optional(api.videos(&filters).await, "videos") {
        Some(response) => {
            let listing = VideoListing::from_response(response);
            writeln!(out, "    total videos: {}", listing.total).map_err(io_err)?;
            if listing.is_empty() {
                writeln!(out, "    no videos found").map_err(io_err)?;
            }
            for video in &listing.videos {
                writeln!(
                    out,
                    "    - {} (ID: {})",
                    str_field(video, "title").unwrap_or("untitled"),
                    video.get("id").map(Value::to_string).unwrap_or_default()
                )
                .map_err(io_err)?;
            }
            Some(listing.total)
        }
        None => {
            unavailable.push("videos");
            writeln!(out, "    unavailable").map_err(io_err)?;
            None
        }
    };

    writeln!(out, "[4] WordPress stats").map_err(io_err)?;
    match optional(api.wordpress_stats().await, "wordpress_stats") {
        Some(stats) => {
            let total = stats.get("total_videos").and_then(Value::as_u64).unwrap_or(0);
            writeln!(out, "    total videos: {}", total).map_err(io_err)?;
            if let Some(categories) = stats.get("categories").and_then(Value::as_object) {
                let names: Vec<&str> = categories.keys().map(String::as_str).collect();
                if !names.is_empty() {
                    writeln!(out, "    categories: {}", names.join(", ")).map_err(io_err)?;
                }
            }
        }
        None => {
            unavailable.push("wordpress_stats");
            writeln!(out, "    unavailable").map_err(io_err)?;
        }
    }

    writeln!(out, "[5] Tenant quota").map_err(io_err)?;
    match optional(api.tenant_quota().await, "tenant_quota") {
        Some(quota) => match (quota.get("searches_used"), quota.get("searches_limit")) {
            (Some(used), Some(limit)) => {
                writeln!(out, "    searches:   {}/{}", used, limit).map_err(io_err)?;
                writeln!(
                    out,
                    "    embeddings: {}/{}",
                    quota.get("embeddings_used").unwrap_or(&Value::Null),
                    quota.get("embeddings_limit").unwrap_or(&Value::Null)
                )
                .map_err(io_err)?;
            }
            _ => writeln!(out, "    quota: {}", quota).map_err(io_err)?,
        },
        None => {
            unavailable.push("tenant_quota");
            writeln!(out, "    unavailable").map_err(io_err)?;
        }
    }

    writeln!(out, "[6] S3 info").map_err(io_err)?;
    match optional(api.s3_info().await, "s3_info") {
        Some(s3) => {
            writeln!(out, "    bucket: {}", str_field(&s3, "bucket_name").unwrap_or("N/A")).map_err(io_err)?;
            writeln!(
                out,
                "    files:  {}",
                s3.get("total_files").map(Value::to_string).unwrap_or_else(|| "N/A".to_string())
            )
            .map_err(io_err)?;
        }
        None => {
            unavailable.push("s3_info");
            writeln!(out, "    unavailable").map_err(io_err)?;
        }
    }

    writeln!(out, "Core checks passed; backend API connection is working.").map_err(io_err)?;

    Ok(ProbeReport {
        health_status,
        tenant,
        total_videos,
        unavailable,
    })
}

fn str_field<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value.get(field).and_then(Value::as_str)
}

fn io_err(e: std::io::Error) -> ReelhubError {
    ReelhubError::Io {
        reason: format!("failed to write probe output: {}", e),
    }
}
