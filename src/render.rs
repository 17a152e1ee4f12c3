//! JSON rendering of one fetched page.

use federated_search::facets::{self, AppliedFilterTree, FilterNode, Taxonomy};
use federated_search::{SearchRequest, SearchResponse};
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// One printed page: the request offset, the provider response and, for
/// text queries with a taxonomy, the facet tree.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedPage {
    pub start: usize,
    pub response: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<FilterNode>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub orphan_filters: Vec<String>,
}

/// Render a response, attaching facets when aggregation buckets and a
/// taxonomy are both present.
///
/// # Errors
///
/// Returns an error if the response cannot be serialized.
pub fn render_page<X: Taxonomy>(
    request: &SearchRequest,
    response: &SearchResponse,
    taxonomy: Option<&X>,
) -> Result<RenderedPage> {
    let value = response.to_value()?;
    let facet_tree = match (response.as_text(), taxonomy) {
        (Some(result), Some(taxonomy)) => result.aggregations.as_ref().map(|aggs| {
            facets::build_and_apply_text_filters(&aggs.path.buckets, &request.applied_filters, taxonomy)
        }),
        _ => None,
    };
    let (filters, orphan_filters) = match facet_tree {
        Some(AppliedFilterTree { tree, orphans }) => (Some(tree.available_filters), orphans),
        None => (None, Vec::new()),
    };
    Ok(RenderedPage {
        start: request.start.unwrap_or(0),
        response: value,
        filters,
        orphan_filters,
    })
}

/// Number of hits a response emitted, used to advance pagination.
pub fn emitted(response: &SearchResponse) -> usize {
    match response {
        SearchResponse::Text(result) => result.hits.hits.len(),
        SearchResponse::Sheet(raw) => raw
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .map_or(0, Vec::len),
    }
}

/// Pretty-print a rendered page.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_pretty_json(page: &RenderedPage) -> Result<String> {
    Ok(serde_json::to_string_pretty(page)?)
}
