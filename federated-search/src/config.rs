//! Search configuration with sensible defaults.
//!
//! [`SearchConfig`] controls where the two backends live, timeouts, the
//! merge constants, caching and the secondary-provider circuit breaker.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::SearchError;

/// Configuration for the federated aggregator.
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides for custom behaviour. Missing fields in a deserialized
/// config fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Full URL of the primary provider's search endpoint.
    pub primary_url: String,
    /// Base URL of the secondary provider (`/search` and `/books` are appended).
    pub secondary_url: String,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// Timeout for the secondary facet-count request in milliseconds.
    pub facet_count_timeout_ms: u64,
    /// Proximity slop sent to the primary provider for non-exact queries.
    pub default_slop: u32,
    /// Sort values closer than this are tied for frontier purposes.
    pub frontier_tolerance: f64,
    /// Top-level category the secondary provider covers.
    pub secondary_category: String,
    /// Version label attached to every secondary hit.
    pub secondary_version: String,
    /// First synthetic comparative-date ordinal given to secondary hits.
    pub synthetic_date_base: i64,
    /// Upper bound of synthetic ordinals; must lie below every real
    /// comparative date. Ordinals past it are clamped to it.
    pub synthetic_date_ceiling: i64,
    /// Maximum number of cached responses.
    pub cache_max_entries: u64,
    /// Cache entry lifetime in seconds. `None` keeps entries for the process lifetime.
    pub cache_ttl_seconds: Option<u64>,
    /// Consecutive secondary failures before routing to it is suspended.
    pub secondary_failure_threshold: u32,
    /// Seconds the secondary provider stays suspended before a trial
    /// lineage is let through. `None` (the default) keeps it suspended for
    /// the lifetime of the process once the circuit opens.
    pub secondary_cooldown_secs: Option<u64>,
    /// Fold hits that are other versions of the same reference into `duplicates`.
    pub collapse_versions: bool,
    /// Custom User-Agent string sent with every request.
    pub user_agent: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            primary_url: "http://localhost:8000/api/search-wrapper".into(),
            secondary_url: "http://localhost:8080".into(),
            timeout_seconds: 8,
            facet_count_timeout_ms: 3000,
            default_slop: 10,
            frontier_tolerance: 0.001,
            secondary_category: "Tanakh".into(),
            secondary_version: "Tanach with Ta'amei Hamikra".into(),
            synthetic_date_base: -1_000_000_000,
            synthetic_date_ceiling: -10_000,
            cache_max_entries: 10_000,
            cache_ttl_seconds: None,
            secondary_failure_threshold: 1,
            secondary_cooldown_secs: None,
            collapse_versions: true,
            user_agent: None,
        }
    }
}

impl SearchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - both endpoints parse as absolute URLs
    /// - `timeout_seconds` and `facet_count_timeout_ms` are greater than 0
    /// - `frontier_tolerance` is finite and non-negative
    /// - `cache_max_entries` and `secondary_failure_threshold` are greater than 0
    /// - `synthetic_date_base` lies below `synthetic_date_ceiling`
    pub fn validate(&self) -> Result<(), SearchError> {
        Url::parse(&self.primary_url)
            .map_err(|e| SearchError::Config(format!("primary_url is invalid: {e}")))?;
        Url::parse(&self.secondary_url)
            .map_err(|e| SearchError::Config(format!("secondary_url is invalid: {e}")))?;
        if self.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.facet_count_timeout_ms == 0 {
            return Err(SearchError::Config(
                "facet_count_timeout_ms must be greater than 0".into(),
            ));
        }
        if !self.frontier_tolerance.is_finite() || self.frontier_tolerance < 0.0 {
            return Err(SearchError::Config(
                "frontier_tolerance must be a non-negative number".into(),
            ));
        }
        if self.cache_max_entries == 0 {
            return Err(SearchError::Config(
                "cache_max_entries must be greater than 0".into(),
            ));
        }
        if self.secondary_failure_threshold == 0 {
            return Err(SearchError::Config(
                "secondary_failure_threshold must be greater than 0".into(),
            ));
        }
        if self.synthetic_date_base >= self.synthetic_date_ceiling {
            return Err(SearchError::Config(
                "synthetic_date_base must be below synthetic_date_ceiling".into(),
            ));
        }
        Ok(())
    }

    /// URL of the secondary provider's hit search endpoint.
    pub fn secondary_search_url(&self) -> String {
        format!("{}/search", self.secondary_url.trim_end_matches('/'))
    }

    /// URL of the secondary provider's per-book count endpoint.
    pub fn secondary_books_url(&self) -> String {
        format!("{}/books", self.secondary_url.trim_end_matches('/'))
    }
}
