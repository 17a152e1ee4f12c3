//! Error types for the federated-search crate.
//!
//! All errors use stable string messages suitable for display to users
//! and programmatic handling.

/// Errors that can occur while running a federated query.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// A request to a search backend failed (network, timeout, HTTP status).
    #[error("transport error: {0}")]
    Transport(String),

    /// A backend returned a payload the adapters could not interpret.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),

    /// The sort-metadata registry has no descriptor for this combination.
    #[error("unknown sort mode {sort_type:?} for content type {content_type:?}")]
    UnknownSortMode {
        /// Content type of the request (`text` or `sheet`).
        content_type: String,
        /// Requested sort mode.
        sort_type: String,
    },

    /// The query scope owning this request was cancelled.
    #[error("query cancelled")]
    Cancelled,

    /// A request or response could not be converted to canonical JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SearchError {
    /// Returns `true` if this error came from a cancelled [`crate::QueryScope`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Convenience type alias for federated-search results.
pub type Result<T> = std::result::Result<T, SearchError>;
