//! # federated-search
//!
//! Federated search over two heterogeneously scored providers.
//!
//! A primary provider indexes the whole corpus; a secondary provider indexes
//! one script-restricted category with its own ranking. This crate queries
//! both concurrently, calibrates their scores, and merges their paginated
//! results into one correctly ordered stream plus a facet tree.
//!
//! ## Design
//!
//! - Each provider's fetched-but-unemitted hits are buffered in a
//!   [`ResultWindow`]; a merge round emits only the prefix no later page
//!   could overtake
//! - Lineage state lives in a caller-owned [`SearchSession`]
//! - Every invocation runs under a [`QueryScope`]; a fresh query cancels
//!   the previous one
//! - Provider responses and composite results share one
//!   content-addressed [`ResponseCache`]
//! - Secondary-provider failures degrade to primary-only results and trip a
//!   circuit breaker
//!
//! ## Security
//!
//! - No network listeners: this is a library, not a server
//! - Search queries are logged only at trace level

pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod facets;
pub mod orchestrator;
pub mod providers;
pub mod scope;
pub mod sort;
pub mod transport;
pub mod types;
pub mod window;

pub use cache::ResponseCache;
pub use config::SearchConfig;
pub use error::{Result, SearchError};
pub use facets::{FilterNode, FilterTree, StaticTaxonomy, Taxonomy};
pub use orchestrator::search::Aggregator;
pub use orchestrator::session::SearchSession;
pub use scope::QueryScope;
pub use sort::SortRegistry;
pub use transport::{HttpTransport, Transport, TransportRequest};
pub use types::{
    Bucket, CompositeResult, ContentType, Hit, HitSource, Provider, SearchRequest, SearchResponse,
};
pub use window::ResultWindow;

/// Run a single fresh query over HTTP with the given configuration.
///
/// Convenience wrapper for one-shot callers. Pagination needs a long-lived
/// [`Aggregator`] and [`SearchSession`].
///
/// # Errors
///
/// Returns [`SearchError::Config`] if `config` is invalid, and otherwise
/// the errors of [`Aggregator::execute`].
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> federated_search::Result<()> {
/// let config = federated_search::SearchConfig::default();
/// let request = federated_search::SearchRequest::text("שלום", 20);
/// if let Some(response) = federated_search::search(&request, config).await? {
///     println!("{}", response.to_value()?);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn search(request: &SearchRequest, config: SearchConfig) -> Result<Option<SearchResponse>> {
    config.validate()?;
    let transport = HttpTransport::new(&config)?;
    let aggregator = Aggregator::new(transport, config)?;
    let mut session = SearchSession::new();
    aggregator.execute(&mut session, request).await
}
