//! Helpers for consuming listing responses.

use std::fmt::Display;

use serde_json::Value;

/// One page of videos as returned by the listing endpoint.
///
/// The backend has answered with both `{"videos": [...], "total": n}` and a
/// bare array over time; both are accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoListing {
    pub videos: Vec<Value>,
    pub total: u64,
}

impl VideoListing {
    pub fn from_response(response: Value) -> Self {
        match response {
            Value::Array(videos) => {
                let total = videos.len() as u64;
                Self { videos, total }
            }
            Value::Object(mut map) => {
                let videos = match map.remove("videos") {
                    Some(Value::Array(videos)) => videos,
                    _ => Vec::new(),
                };
                let total = map
                    .get("total")
                    .and_then(Value::as_u64)
                    .unwrap_or(videos.len() as u64);
                Self { videos, total }
            }
            _ => Self {
                videos: Vec::new(),
                total: 0,
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }
}

/// Page position derived from limit/offset/total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u64,
    pub offset: u64,
    pub total: u64,
    /// 1-based.
    pub current_page: u64,
    /// Never less than 1.
    pub total_pages: u64,
}

impl Pagination {
    /// A zero `limit` is treated as 1.
    pub fn new(limit: u64, offset: u64, total: u64) -> Self {
        let per_page = limit.max(1);
        Self {
            limit: per_page,
            offset,
            total,
            current_page: offset / per_page + 1,
            total_pages: total.div_ceil(per_page).max(1),
        }
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn next_offset(&self) -> Option<u64> {
        self.has_next().then(|| self.offset + self.limit)
    }

    pub fn previous_offset(&self) -> Option<u64> {
        self.has_previous()
            .then(|| self.offset.saturating_sub(self.limit))
    }
}

/// Treat a failed optional section as absent.
///
/// Pages that combine several backend calls use this for everything but the
/// primary data, so one failing section does not fail the page.
pub fn optional<T, E: Display>(result: Result<T, E>, section: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(section, error = %e, "Optional section unavailable");
            None
        }
    }
}
