//! Per-lineage session state.
//!
//! A session covers one fresh query and all of its pagination
//! continuations. It is owned by the caller and passed to
//! [`Aggregator::execute`](super::search::Aggregator::execute) explicitly,
//! so two lineages never share windows.

use serde_json::Value;

use crate::types::{Aggregations, Bucket};
use crate::window::ResultWindow;

/// Accumulated state of one query lineage.
#[derive(Debug, Clone, Default)]
pub struct SearchSession {
    /// Buffered primary hits and cursor.
    pub primary: ResultWindow,
    /// Buffered secondary hits and cursor.
    pub secondary: ResultWindow,
    /// Latest aggregations reported by the primary provider.
    pub primary_aggregations: Option<Aggregations>,
    /// Secondary per-book counts. `None` until fetched for this lineage.
    pub secondary_counts: Option<Vec<Bucket>>,
    /// Merged bucket list of the latest aggregating round.
    pub buckets: Vec<Bucket>,
    /// Whether the secondary provider takes part in this lineage.
    pub use_secondary: bool,
    /// Latest raw sheet response.
    pub sheet: Option<Value>,
}

impl SearchSession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to the start of a new lineage with the given routing decision.
    pub fn reset(&mut self, use_secondary: bool) {
        *self = Self {
            use_secondary,
            ..Self::default()
        };
    }

    /// Turn the secondary provider off for the rest of the lineage.
    ///
    /// Hits it already contributed stay buffered; they are emitted by the
    /// next round as if the provider were exhausted.
    pub fn disable_secondary(&mut self) {
        if self.use_secondary {
            tracing::debug!("secondary provider disabled for session");
        }
        self.use_secondary = false;
        self.secondary.total = u64::try_from(self.secondary.last_seen + 1).unwrap_or(0);
    }
}
