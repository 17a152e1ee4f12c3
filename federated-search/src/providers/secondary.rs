//! Secondary (script-restricted) provider adapter.
//!
//! The secondary backend indexes one category of the corpus with its own
//! ranking. Hits are keyed by a dotted identifier
//! `<category>.<subcategory>.<Book_Title>.<chapter>.<verse>` and carry an
//! optional rank and one highlighted snippet. It has no date field, so hits
//! are given synthetic comparative-date ordinals starting at a negative base
//! that sort below every real date.

use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::cache::endpoint_tag;
use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::transport::Transport;
use crate::types::{Bucket, Hit, HitSource, Provider, SearchRequest};
use crate::window::ResultWindow;

use super::ProviderContext;

/// Highlight field secondary snippets are reported under.
const HIGHLIGHT_FIELD: &str = "naive_lemmatizer";

/// Native body of a secondary hit search.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryQuery {
    pub query: String,
    pub from: usize,
    pub size: usize,
    #[serde(serialize_with = "books_or_false")]
    pub limited_to_books: Option<Vec<String>>,
    pub sort: String,
    pub small_units_only: bool,
}

/// The provider expects `false` rather than an empty list when unrestricted.
fn books_or_false<S: Serializer>(books: &Option<Vec<String>>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match books {
        Some(books) => books.serialize(serializer),
        None => serializer.serialize_bool(false),
    }
}

/// Native body of a per-book count request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookCountQuery {
    pub query: String,
    pub small_units_only: bool,
}

/// Convert a `/`-joined filter path to the secondary schema.
///
/// `Tanakh/Torah/Song of Songs` becomes `Tanakh.Torah.Song_of_Songs`.
pub fn book_filter(path: &str) -> String {
    path.replace('/', ".").replace(' ', "_")
}

impl SecondaryQuery {
    /// Derive the native request, continuing from `offset`.
    pub fn build(request: &SearchRequest, offset: usize) -> Self {
        let limited_to_books = if request.applied_filters.is_empty() {
            None
        } else {
            Some(request.applied_filters.iter().map(|f| book_filter(f)).collect())
        };
        let sort = if request.sort_type == "relevance" {
            "pagerank"
        } else {
            "corpus_order_path"
        };
        Self {
            query: request.query.clone(),
            from: offset,
            size: request.size,
            limited_to_books,
            sort: sort.into(),
            small_units_only: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NativeSnippet {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NativeHit {
    xml_id: String,
    #[serde(default)]
    hebrew_path: Option<String>,
    #[serde(default)]
    pagerank: Option<f64>,
    #[serde(default)]
    highlight: Vec<NativeSnippet>,
}

#[derive(Debug, Deserialize)]
struct NativeResponse {
    total: u64,
    #[serde(default)]
    hits: Vec<NativeHit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NativeBookCount {
    english_book_name: Vec<String>,
    count: u64,
}

/// One translated page from the secondary provider.
#[derive(Debug, Clone, PartialEq)]
pub struct SecondaryPage {
    /// Hits in provider order.
    pub hits: Vec<Hit>,
    /// Provider's reported total.
    pub total: u64,
}

/// Translation constants applied to every secondary hit.
#[derive(Debug, Clone)]
pub struct HitShape {
    /// Version label.
    pub version: String,
    /// First synthetic date ordinal.
    pub date_base: i64,
    /// Largest synthetic date ordinal.
    pub date_ceiling: i64,
}

impl HitShape {
    fn translate(&self, native: NativeHit, position: usize) -> Result<Hit> {
        let parts: Vec<&str> = native.xml_id.split('.').collect();
        if parts.len() < 3 {
            return Err(SearchError::Parse(format!(
                "secondary hit id {:?} has no book segment",
                native.xml_id
            )));
        }
        let categories: Vec<String> = parts[..2].iter().map(|s| s.to_string()).collect();
        let title = parts[2].replace('_', " ");
        let location = parts[3..parts.len().min(5)].join(":");
        let reference = if location.is_empty() {
            title
        } else {
            format!("{title} {location}")
        };
        let rank = native.pagerank.unwrap_or(0.0);

        let mut extra = Map::new();
        extra.insert("type".into(), Value::from("text"));
        extra.insert("path".into(), Value::from(categories.join("/")));
        extra.insert("pagesheetrank".into(), Value::from(rank));

        let mut highlight = Map::new();
        if let Some(snippet) = native.highlight.into_iter().next() {
            highlight.insert(HIGHLIGHT_FIELD.into(), Value::from(vec![snippet.text]));
        }

        let ordinal = self
            .date_base
            .saturating_add(i64::try_from(position).unwrap_or(i64::MAX))
            .min(self.date_ceiling);
        Ok(Hit {
            id: format!("{reference} ({} [he])", self.version),
            source: HitSource {
                reference,
                localized_ref: native.hebrew_path,
                version: Some(self.version.clone()),
                lang: Some("he".into()),
                categories,
                comp_date: None,
                version_priority: None,
                extra,
            },
            highlight,
            score: -rank,
            comp_date: Some(ordinal as f64),
            came_from: Provider::Secondary,
            duplicates: Vec::new(),
        })
    }

    /// Translate a native hit page whose first hit sits at `offset`.
    ///
    /// Hits with malformed identifiers are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Parse`] if the payload lacks `total`.
    pub fn translate_page(&self, raw: Value, offset: usize) -> Result<SecondaryPage> {
        let native: NativeResponse = serde_json::from_value(raw)
            .map_err(|e| SearchError::Parse(format!("secondary response: {e}")))?;

        let mut hits = Vec::with_capacity(native.hits.len());
        for (i, hit) in native.hits.into_iter().enumerate() {
            match self.translate(hit, offset + i) {
                Ok(hit) => hits.push(hit),
                Err(e) => tracing::warn!(error = %e, "skipping secondary hit"),
            }
        }
        Ok(SecondaryPage {
            hits,
            total: native.total,
        })
    }
}

/// Translate a per-book count response into aggregation buckets.
///
/// # Errors
///
/// Returns [`SearchError::Parse`] if the payload is not a count list.
pub fn translate_counts(raw: Value) -> Result<Vec<Bucket>> {
    let native: Vec<NativeBookCount> = serde_json::from_value(raw)
        .map_err(|e| SearchError::Parse(format!("secondary book counts: {e}")))?;
    Ok(native
        .into_iter()
        .map(|b| {
            let key = b
                .english_book_name
                .iter()
                .map(|s| s.replace('_', " "))
                .collect::<Vec<_>>()
                .join("/");
            Bucket::new(key, b.count)
        })
        .collect())
}

/// Adapter issuing requests to the secondary provider.
#[derive(Debug, Clone)]
pub struct SecondaryAdapter {
    search_url: String,
    books_url: String,
    facet_timeout: Duration,
    shape: HitShape,
}

impl SecondaryAdapter {
    /// Build the adapter from configuration.
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            search_url: config.secondary_search_url(),
            books_url: config.secondary_books_url(),
            facet_timeout: Duration::from_millis(config.facet_count_timeout_ms),
            shape: HitShape {
                version: config.secondary_version.clone(),
                date_base: config.synthetic_date_base,
                date_ceiling: config.synthetic_date_ceiling,
            },
        }
    }

    /// Whether a page request must reach the provider: always for a fresh
    /// request, and on continuations until the window is exhausted.
    pub fn needs_fetch(request: &SearchRequest, window: &ResultWindow) -> bool {
        request.is_fresh() || !window.is_exhausted()
    }

    /// Fetch the next page for `window`.
    ///
    /// A continuation against an exhausted window returns an empty page
    /// without issuing a request.
    ///
    /// # Errors
    ///
    /// Propagates transport, parse and cancellation errors.
    pub async fn fetch_page<T: Transport>(
        &self,
        ctx: ProviderContext<'_, T>,
        request: &SearchRequest,
        window: &ResultWindow,
    ) -> Result<SecondaryPage> {
        if !Self::needs_fetch(request, window) {
            tracing::debug!(total = window.total, "secondary exhausted, skipping request");
            return Ok(SecondaryPage {
                hits: Vec::new(),
                total: window.total,
            });
        }
        let offset = window.next_offset();
        let native = SecondaryQuery::build(request, offset);
        tracing::trace!(query = %request.query, offset, "secondary query");
        let raw = ctx
            .fetch_json(&endpoint_tag(Provider::Secondary, "search"), &self.search_url, &native, None)
            .await?;
        let page = self.shape.translate_page(raw, offset)?;
        tracing::debug!(count = page.hits.len(), total = page.total, "secondary page");
        Ok(page)
    }

    /// Fetch per-book document counts for the query.
    ///
    /// # Errors
    ///
    /// Propagates transport, parse and cancellation errors.
    pub async fn fetch_counts<T: Transport>(
        &self,
        ctx: ProviderContext<'_, T>,
        request: &SearchRequest,
    ) -> Result<Vec<Bucket>> {
        let native = BookCountQuery {
            query: request.query.clone(),
            small_units_only: true,
        };
        let raw = ctx
            .fetch_json(
                &endpoint_tag(Provider::Secondary, "books"),
                &self.books_url,
                &native,
                Some(self.facet_timeout),
            )
            .await?;
        translate_counts(raw)
    }
}
