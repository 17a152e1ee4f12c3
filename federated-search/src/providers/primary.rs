//! Primary (full-corpus) provider adapter.
//!
//! The primary backend is an Elasticsearch-style search wrapper. Its
//! request is derived from the sort-metadata registry; its response hits
//! carry a raw relevance `_score` (higher is better) and the native
//! comparative date in `_source.comp_date`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cache::endpoint_tag;
use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::sort::{Direction, SortRegistry};
use crate::transport::Transport;
use crate::types::{Aggregations, Hit, HitSource, Provider, SearchRequest};
use crate::window::ResultWindow;

use super::ProviderContext;

/// Native request body of the primary provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrimaryQuery {
    #[serde(rename = "type")]
    pub content_type: String,
    pub query: String,
    pub field: String,
    pub source_proj: bool,
    pub slop: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    pub size: usize,
    pub filters: Vec<String>,
    pub filter_fields: Vec<String>,
    pub aggs: Vec<String>,
    pub sort_method: String,
    pub sort_fields: Vec<String>,
    pub sort_reverse: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_score_missing: Option<f64>,
}

impl PrimaryQuery {
    /// Derive the native request from a canonical one, starting at `start`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::UnknownSortMode`] if the registry has no
    /// descriptor for the request's type and sort mode.
    pub fn build(
        request: &SearchRequest,
        sorts: &SortRegistry,
        default_slop: u32,
        start: Option<usize>,
    ) -> Result<Self> {
        let descriptor = sorts.lookup(request.content_type, &request.sort_type)?;
        Ok(Self {
            content_type: request.content_type.name().into(),
            query: request.query.clone(),
            field: request.field.clone(),
            source_proj: true,
            slop: if request.exact { 0 } else { default_slop },
            start,
            size: request.size,
            filters: request.applied_filters.clone(),
            filter_fields: request.applied_filter_agg_types.clone(),
            aggs: request.aggregations_to_update.clone(),
            sort_method: descriptor.sort_method.clone(),
            sort_fields: descriptor.field_array.clone(),
            sort_reverse: descriptor.direction == Direction::Desc,
            sort_score_missing: descriptor.score_missing,
        })
    }
}

/// Elasticsearch reports totals either as a number or as `{value, relation}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NativeTotal {
    Count(u64),
    Object { value: u64 },
}

impl NativeTotal {
    fn value(&self) -> u64 {
        match self {
            Self::Count(n) | Self::Object { value: n } => *n,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NativeHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score", default)]
    score: Option<f64>,
    #[serde(rename = "_source", default)]
    source: HitSource,
    #[serde(default)]
    highlight: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct NativeHits {
    total: NativeTotal,
    #[serde(default)]
    hits: Vec<NativeHit>,
}

#[derive(Debug, Deserialize)]
struct NativeResponse {
    hits: NativeHits,
    #[serde(default)]
    aggregations: Option<Aggregations>,
}

/// One translated page from the primary provider.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryPage {
    /// Hits in provider order, scores negated.
    pub hits: Vec<Hit>,
    /// Provider's reported total.
    pub total: u64,
    /// Aggregations, when the request asked for them.
    pub aggregations: Option<Aggregations>,
}

/// Translate a native primary response into canonical hits.
///
/// # Errors
///
/// Returns [`SearchError::Parse`] if the payload lacks the `hits` envelope.
pub fn translate(raw: Value) -> Result<PrimaryPage> {
    let native: NativeResponse = serde_json::from_value(raw)
        .map_err(|e| SearchError::Parse(format!("primary response: {e}")))?;

    let hits = native
        .hits
        .hits
        .into_iter()
        .map(|h| Hit {
            comp_date: h.source.comp_date,
            id: h.id,
            score: -h.score.unwrap_or(0.0),
            source: h.source,
            highlight: h.highlight,
            came_from: Provider::Primary,
            duplicates: Vec::new(),
        })
        .collect();

    Ok(PrimaryPage {
        hits,
        total: native.hits.total.value(),
        aggregations: native.aggregations,
    })
}

/// Adapter issuing requests to the primary provider.
#[derive(Debug, Clone)]
pub struct PrimaryAdapter {
    url: String,
    default_slop: u32,
}

impl PrimaryAdapter {
    /// Build the adapter from configuration.
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            url: config.primary_url.clone(),
            default_slop: config.default_slop,
        }
    }

    /// Issue `request` from offset `start` and return the raw native response.
    ///
    /// Sheet responses are consumed verbatim with the caller's own offset;
    /// text responses go through [`fetch_page`](Self::fetch_page).
    ///
    /// # Errors
    ///
    /// Propagates sort lookup, transport and cancellation errors.
    pub async fn fetch_raw<T: Transport>(
        &self,
        ctx: ProviderContext<'_, T>,
        request: &SearchRequest,
        sorts: &SortRegistry,
        start: Option<usize>,
    ) -> Result<Value> {
        let native = PrimaryQuery::build(request, sorts, self.default_slop, start)?;
        tracing::trace!(query = %request.query, start = ?start, "primary query");
        ctx.fetch_json(&endpoint_tag(Provider::Primary, "search"), &self.url, &native, None)
            .await
    }

    /// Issue a text request and translate the response.
    ///
    /// A fresh request starts where the caller asked; a continuation resumes
    /// right after the last hit already fetched into `window`.
    ///
    /// # Errors
    ///
    /// Same as [`fetch_raw`](Self::fetch_raw), plus [`SearchError::Parse`].
    pub async fn fetch_page<T: Transport>(
        &self,
        ctx: ProviderContext<'_, T>,
        request: &SearchRequest,
        sorts: &SortRegistry,
        window: &ResultWindow,
    ) -> Result<PrimaryPage> {
        let start = if request.is_fresh() {
            request.start
        } else {
            Some(window.next_offset())
        };
        let page = translate(self.fetch_raw(ctx, request, sorts, start).await?)?;
        tracing::debug!(count = page.hits.len(), total = page.total, "primary page");
        Ok(page)
    }
}
