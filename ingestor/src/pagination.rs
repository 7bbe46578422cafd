//! Pagination and filter normalization.
//!
//! Everything here is pure: raw query-string values go in, clamped limits,
//! offsets and parsed time bounds come out. The store trusts these values
//! and never re-validates them.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 1000;

/// Parses `raw` as a page size.
///
/// Absent, non-numeric or non-positive input falls back to `default_limit`;
/// the result is then clamped to `1..=max_limit`.
pub fn normalize_limit(raw: Option<&str>, default_limit: u32, max_limit: u32) -> u32 {
    let requested = raw
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(i64::from(default_limit));

    requested.clamp(1, i64::from(max_limit.max(1))) as u32
}

/// Parses `raw` as a row offset. Absent or non-numeric input is 0 and
/// negative values clamp to 0.
pub fn normalize_offset(raw: Option<&str>) -> u64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .map(|n| n.max(0) as u64)
        .unwrap_or(0)
}

/// Parses an optional timestamp bound.
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.fff]` (taken as UTC) or a
/// bare date (midnight UTC). An absent or empty value means no constraint.
pub fn validate_time_bound(raw: Option<&str>, field: &str) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Some(naive.and_utc()));
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(Some(midnight.and_utc()));
    }

    Err(Error::Validation(format!(
        "Invalid {} format. Use ISO 8601 format (YYYY-MM-DDTHH:mm:ss.sssZ)",
        field
    )))
}

/// Normalized page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u64,
}

impl Pagination {
    pub fn new(limit: u32, offset: u64) -> Self {
        Self {
            limit: limit.max(1),
            offset,
        }
    }

    /// Page metadata for a result of `returned` rows.
    ///
    /// `has_more` is a heuristic: a full page suggests another one follows.
    pub fn page_info(&self, returned: usize) -> PageInfo {
        PageInfo {
            limit: self.limit,
            offset: self.offset,
            has_more: returned == self.limit as usize,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub limit: u32,
    pub offset: u64,
    pub has_more: bool,
}

/// Raw `limit`/`offset` query parameters, kept as strings so malformed
/// values fall back to defaults instead of failing extraction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl PaginationParams {
    pub fn normalize(&self, default_limit: u32, max_limit: u32) -> Pagination {
        Pagination {
            limit: normalize_limit(self.limit.as_deref(), default_limit, max_limit),
            offset: normalize_offset(self.offset.as_deref()),
        }
    }
}
