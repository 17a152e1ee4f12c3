//! Core types: canonical requests, provider-agnostic hits, aggregation
//! buckets and the composite result handed back to callers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The two federated search backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    /// Full-corpus index. Always queried.
    #[serde(rename = "primary")]
    Primary,
    /// Specialized index over a script-restricted subset of the corpus.
    #[serde(rename = "secondary")]
    Secondary,
}

impl Provider {
    /// Tag used in cache keys and on every hit's `cameFrom` field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which kind of content a query searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Library texts. Eligible for federation with the secondary provider.
    Text,
    /// User-built source sheets. Served by the primary provider only.
    Sheet,
}

impl ContentType {
    /// Wire name, also the key into the sort-metadata registry.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Sheet => "sheet",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Canonical search request, immutable once issued.
///
/// Field names on the wire match the request arguments callers already use,
/// so the composite cache key is stable across clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Query text. An empty query is a no-op.
    pub query: String,
    /// Content type to search.
    #[serde(rename = "type")]
    pub content_type: ContentType,
    /// Pagination offset. `None` or `Some(0)` starts a fresh query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    /// Page size requested from each provider.
    pub size: usize,
    /// Index field to search.
    pub field: String,
    /// Sort mode, resolved through the sort-metadata registry.
    pub sort_type: String,
    /// `/`-joined filter paths applied to the query.
    #[serde(default)]
    pub applied_filters: Vec<String>,
    /// Aggregation type of each applied filter (same length as `applied_filters`).
    #[serde(default, rename = "appliedFilterAggTypes")]
    pub applied_filter_agg_types: Vec<String>,
    /// Aggregations the caller wants refreshed by this query.
    #[serde(default, rename = "aggregationsToUpdate")]
    pub aggregations_to_update: Vec<String>,
    /// Exact-phrase matching (proximity slop 0).
    #[serde(default)]
    pub exact: bool,
}

impl SearchRequest {
    /// A fresh text request with relevance sort and no filters.
    pub fn text(query: impl Into<String>, size: usize) -> Self {
        Self {
            query: query.into(),
            content_type: ContentType::Text,
            start: None,
            size,
            field: "naive_lemmatizer".into(),
            sort_type: "relevance".into(),
            applied_filters: Vec::new(),
            applied_filter_agg_types: Vec::new(),
            aggregations_to_update: Vec::new(),
            exact: false,
        }
    }

    /// A fresh sheet request with relevance sort and no filters.
    pub fn sheet(query: impl Into<String>, size: usize) -> Self {
        Self {
            content_type: ContentType::Sheet,
            field: "content".into(),
            ..Self::text(query, size)
        }
    }

    /// Returns `true` when this request starts a new query lineage rather
    /// than continuing pagination.
    pub fn is_fresh(&self) -> bool {
        self.start.unwrap_or(0) == 0
    }

    /// Returns `true` if any aggregation should be refreshed this round.
    pub fn wants_aggregations(&self) -> bool {
        !self.aggregations_to_update.is_empty()
    }

    /// Field the merge engine orders by, derived from the sort mode.
    pub fn sort_field(&self) -> SortField {
        if self.sort_type == "relevance" {
            SortField::Score
        } else {
            SortField::CompDate
        }
    }
}

/// Hit field used for merged ordering. Ascending order is always best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    /// Negated relevance.
    Score,
    /// Comparative-date ordinal.
    CompDate,
}

/// Source metadata of a hit, as projected by the providers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HitSource {
    /// Text reference, e.g. `Genesis 1:1`.
    #[serde(rename = "ref", default)]
    pub reference: String,
    /// Localized reference.
    #[serde(rename = "heRef", default, skip_serializing_if = "Option::is_none")]
    pub localized_ref: Option<String>,
    /// Version label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Language code of the version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    /// Category path of the containing book, root first.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Comparative-date ordinal, when the provider has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comp_date: Option<f64>,
    /// Lower is preferred when collapsing versions of one reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_priority: Option<i64>,
    /// Every other projected field, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Canonical, provider-agnostic search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Stable identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Source metadata.
    #[serde(rename = "_source")]
    pub source: HitSource,
    /// Highlighted snippets keyed by field.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub highlight: Map<String, Value>,
    /// Negated relevance: ascending order is best first.
    pub score: f64,
    /// Comparative-date ordinal used for chronological ordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comp_date: Option<f64>,
    /// Provider that returned this hit.
    #[serde(rename = "cameFrom")]
    pub came_from: Provider,
    /// Other versions of the same reference folded into this hit.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicates: Vec<Hit>,
}

impl Hit {
    /// Value of the given sort field. Hits without a date sort last.
    pub fn sort_value(&self, field: SortField) -> f64 {
        match field {
            SortField::Score => self.score,
            SortField::CompDate => self.comp_date.unwrap_or(f64::MAX),
        }
    }

    /// Returns `true` if this hit's category path contains `category`.
    pub fn in_category(&self, category: &str) -> bool {
        self.source.categories.iter().any(|c| c == category)
    }
}

/// One aggregation bucket: a `/`-joined path and its document count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Path key, e.g. `Tanakh/Torah/Genesis`.
    pub key: String,
    /// Documents at or below this path.
    pub doc_count: u64,
}

impl Bucket {
    /// Build a bucket from a key and count.
    pub fn new(key: impl Into<String>, doc_count: u64) -> Self {
        Self {
            key: key.into(),
            doc_count,
        }
    }
}

/// Bucket list of one aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketList {
    /// Buckets in provider order.
    #[serde(default)]
    pub buckets: Vec<Bucket>,
}

/// Aggregations attached to a composite result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregations {
    /// Category-path aggregation.
    #[serde(default)]
    pub path: BucketList,
}

/// Total and ordered hits of a composite result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HitPage {
    /// Total matching documents across the providers that ran.
    pub total: u64,
    /// Hits emitted this round, best first.
    pub hits: Vec<Hit>,
}

/// Composite result of one text query invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeResult {
    /// Ordered page of hits.
    pub hits: HitPage,
    /// Refreshed aggregations, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Aggregations>,
}

/// What one invocation produces.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResponse {
    /// Merged (or primary-only) text results.
    Text(CompositeResult),
    /// Sheet results, exactly as the primary provider returned them.
    Sheet(Value),
}

impl SearchResponse {
    /// Serialize to the JSON shape callers consume.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SearchError::Serialization`] if a hit carries a
    /// non-finite number.
    pub fn to_value(&self) -> crate::Result<Value> {
        match self {
            Self::Text(result) => Ok(serde_json::to_value(result)?),
            Self::Sheet(raw) => Ok(raw.clone()),
        }
    }

    /// The text result, if this is one.
    pub fn as_text(&self) -> Option<&CompositeResult> {
        match self {
            Self::Text(result) => Some(result),
            Self::Sheet(_) => None,
        }
    }
}
