//! Query orchestrator: routing, concurrent provider fan-out, merge, cache.
//!
//! One [`Aggregator`] lives for the whole process and is shared by every
//! query lineage. Lineage state lives in a caller-owned [`SearchSession`].

use std::sync::{Arc, Mutex};

use crate::cache::{query_key, ResponseCache};
use crate::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::providers::{PrimaryAdapter, ProviderContext, SecondaryAdapter};
use crate::scope::QueryScope;
use crate::sort::SortRegistry;
use crate::transport::Transport;
use crate::types::{
    Aggregations, Bucket, BucketList, CompositeResult, ContentType, Hit, HitPage,
    SearchRequest, SearchResponse,
};

use super::dedup::collapse_versions;
use super::merge::{merge_buckets, merge_round, merged_total, MergeOptions};
use super::routing::should_use_secondary;
use super::session::SearchSession;

/// Federated search aggregator over one transport.
pub struct Aggregator<T> {
    transport: Arc<T>,
    config: SearchConfig,
    sorts: SortRegistry,
    cache: ResponseCache,
    breaker: Mutex<CircuitBreaker>,
    active_scope: Mutex<Option<QueryScope>>,
    primary: PrimaryAdapter,
    secondary: SecondaryAdapter,
}

impl<T> std::fmt::Debug for Aggregator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Aggregator<T> {
    /// Create an aggregator with the built-in sort metadata.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `config` fails validation.
    pub fn new(transport: T, config: SearchConfig) -> Result<Self> {
        Self::with_sorts(transport, config, SortRegistry::default())
    }

    /// Create an aggregator with a custom sort-metadata registry.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `config` fails validation.
    pub fn with_sorts(transport: T, config: SearchConfig, sorts: SortRegistry) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            transport: Arc::new(transport),
            cache: ResponseCache::new(&config),
            breaker: Mutex::new(CircuitBreaker::from(&config)),
            active_scope: Mutex::new(None),
            primary: PrimaryAdapter::new(&config),
            secondary: SecondaryAdapter::new(&config),
            sorts,
            config,
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Shared response cache.
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Current circuit state of the secondary provider.
    pub fn secondary_status(&self) -> CircuitState {
        self.breaker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .status()
    }

    /// The cached composite result of a previously completed request.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Serialization`] if the request cannot be keyed.
    pub async fn cached_result(&self, request: &SearchRequest) -> Result<Option<serde_json::Value>> {
        Ok(self.cache.get(&query_key(request)?).await)
    }

    /// Start an invocation and return its cancellation scope.
    ///
    /// A fresh text query resets `session`, re-evaluates routing and cancels
    /// the previously active scope. Every invocation gets its own scope.
    pub fn begin(&self, session: &mut SearchSession, request: &SearchRequest) -> QueryScope {
        let scope = QueryScope::new();
        if request.query.is_empty() {
            return scope;
        }

        if request.is_fresh() && request.content_type == ContentType::Text {
            let routed = should_use_secondary(&request.query);
            let allowed = routed
                && self
                    .breaker
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .should_attempt();
            if routed && !allowed {
                tracing::debug!("secondary circuit open, routing to primary only");
            }
            session.reset(allowed);
        }

        let previous = self
            .active_scope
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(scope.clone());
        if let Some(previous) = previous {
            if request.is_fresh() && request.content_type == ContentType::Text {
                previous.cancel();
            }
        }
        scope
    }

    /// Run one invocation to completion.
    ///
    /// Returns `Ok(None)` for an empty query.
    ///
    /// # Errors
    ///
    /// Primary-provider failures and [`SearchError::Cancelled`] propagate.
    /// Secondary-provider failures are logged and degrade the session.
    pub async fn execute(
        &self,
        session: &mut SearchSession,
        request: &SearchRequest,
    ) -> Result<Option<SearchResponse>> {
        let scope = self.begin(session, request);
        self.run(session, request, &scope).await
    }

    /// Run an invocation previously started with [`begin`](Self::begin).
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute).
    pub async fn run(
        &self,
        session: &mut SearchSession,
        request: &SearchRequest,
        scope: &QueryScope,
    ) -> Result<Option<SearchResponse>> {
        if request.query.is_empty() {
            return Ok(None);
        }
        tracing::trace!(query = %request.query, start = ?request.start, "executing query");

        let ctx = ProviderContext {
            transport: self.transport.as_ref(),
            cache: &self.cache,
            scope,
        };

        let response = match request.content_type {
            ContentType::Sheet => {
                let raw = self.primary.fetch_raw(ctx, request, &self.sorts, request.start).await?;
                session.sheet = Some(raw.clone());
                SearchResponse::Sheet(raw)
            }
            ContentType::Text if session.use_secondary => {
                SearchResponse::Text(self.run_federated(ctx, session, request).await?)
            }
            ContentType::Text => SearchResponse::Text(self.run_primary_only(ctx, session, request).await?),
        };

        if scope.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        self.cache.put(query_key(request)?, response.to_value()?).await;
        Ok(Some(response))
    }

    async fn run_primary_only(
        &self,
        ctx: ProviderContext<'_, T>,
        session: &mut SearchSession,
        request: &SearchRequest,
    ) -> Result<CompositeResult> {
        let page = self
            .primary
            .fetch_page(ctx, request, &self.sorts, &session.primary)
            .await?;
        session.primary.extend(page.hits, page.total);

        let aggregations = page.aggregations;
        if let Some(aggs) = &aggregations {
            session.buckets = aggs.path.buckets.clone();
            session.primary_aggregations = Some(aggs.clone());
        }

        // Leftovers from a secondary provider disabled earlier in the lineage.
        let hits = if session.secondary.hits.is_empty() {
            session.primary.drain()
        } else {
            let options = self.merge_options(session, request);
            merge_round(&mut session.primary, &mut session.secondary, &options)
        };

        let total = merged_total(
            session.primary.total,
            session.secondary.total,
            &session.buckets,
            &request.applied_filters,
        );

        Ok(CompositeResult {
            hits: HitPage {
                total,
                hits: self.finish(hits),
            },
            aggregations,
        })
    }

    async fn run_federated(
        &self,
        ctx: ProviderContext<'_, T>,
        session: &mut SearchSession,
        request: &SearchRequest,
    ) -> Result<CompositeResult> {
        let fetch_counts = session.secondary_counts.is_none();
        let contacted = fetch_counts || SecondaryAdapter::needs_fetch(request, &session.secondary);

        let counts = async {
            if fetch_counts {
                Some(self.secondary.fetch_counts(ctx, request).await)
            } else {
                None
            }
        };
        let (primary, secondary, counts) = futures::future::join3(
            self.primary.fetch_page(ctx, request, &self.sorts, &session.primary),
            self.secondary.fetch_page(ctx, request, &session.secondary),
            counts,
        )
        .await;

        if ctx.scope.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        let primary = primary?;

        let mut secondary_failed = false;
        match secondary {
            Ok(page) => session.secondary.extend(page.hits, page.total),
            Err(e) => {
                tracing::warn!(error = %e, "secondary hit query failed, continuing with primary only");
                secondary_failed = true;
            }
        }
        match counts {
            Some(Ok(buckets)) => session.secondary_counts = Some(buckets),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "secondary book counts failed");
                session.secondary_counts = Some(Vec::new());
                secondary_failed = true;
            }
            None => {}
        }
        if secondary_failed {
            self.record_secondary(false);
            session.disable_secondary();
        } else if contacted {
            self.record_secondary(true);
        }

        session.primary.extend(primary.hits, primary.total);
        if let Some(aggs) = primary.aggregations {
            session.primary_aggregations = Some(aggs);
        }

        let aggregations = request.wants_aggregations().then(|| {
            let buckets = self.combined_buckets(session);
            session.buckets = buckets.clone();
            Aggregations {
                path: BucketList { buckets },
            }
        });

        let total = merged_total(
            session.primary.total,
            session.secondary.total,
            &session.buckets,
            &request.applied_filters,
        );
        let options = self.merge_options(session, request);
        let hits = merge_round(&mut session.primary, &mut session.secondary, &options);

        Ok(CompositeResult {
            hits: HitPage {
                total,
                hits: self.finish(hits),
            },
            aggregations,
        })
    }

    fn combined_buckets(&self, session: &SearchSession) -> Vec<Bucket> {
        let primary: &[Bucket] = session
            .primary_aggregations
            .as_ref()
            .map_or(&[], |a| a.path.buckets.as_slice());
        if !session.use_secondary {
            return primary.to_vec();
        }
        let secondary = session.secondary_counts.as_deref().unwrap_or(&[]);
        merge_buckets(primary, secondary, &self.config.secondary_category)
    }

    fn merge_options<'a>(&'a self, session: &SearchSession, request: &SearchRequest) -> MergeOptions<'a> {
        MergeOptions {
            sort_field: request.sort_field(),
            tolerance: self.config.frontier_tolerance,
            secondary_active: session.use_secondary,
            covered_category: &self.config.secondary_category,
        }
    }

    fn finish(&self, hits: Vec<Hit>) -> Vec<Hit> {
        if self.config.collapse_versions {
            collapse_versions(hits)
        } else {
            hits
        }
    }

    fn record_secondary(&self, success: bool) {
        let mut breaker = self.breaker.lock().unwrap_or_else(|e| e.into_inner());
        if success {
            breaker.record_success();
        } else {
            breaker.record_failure();
        }
    }
}

impl<T: Transport + 'static> Aggregator<T> {
    /// Start an invocation on the tokio runtime and return its scope at once.
    ///
    /// `on_done` receives the session back together with the outcome. It is
    /// called exactly once, unless the scope is cancelled first, in which
    /// case it is never called.
    pub fn spawn<F>(self: &Arc<Self>, mut session: SearchSession, request: SearchRequest, on_done: F) -> QueryScope
    where
        F: FnOnce(SearchSession, Result<Option<SearchResponse>>) + Send + 'static,
    {
        let scope = self.begin(&mut session, &request);
        let aggregator = Arc::clone(self);
        let task_scope = scope.clone();
        tokio::spawn(async move {
            let outcome = aggregator.run(&mut session, &request, &task_scope).await;
            if task_scope.is_cancelled() || outcome.as_ref().is_err_and(SearchError::is_cancelled) {
                tracing::debug!(query = %request.query, "query cancelled, suppressing callback");
                return;
            }
            on_done(session, outcome);
        });
        scope
    }
}
