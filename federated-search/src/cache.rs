//! Content-addressed response cache.
//!
//! Entries are keyed by a canonical (key-order-independent) JSON rendering
//! of the request that produced them, so semantically identical requests
//! collide regardless of field order. Uses [`moka`] for async-friendly,
//! bounded caching. Values are stored as owned JSON snapshots: later
//! mutation of live result structures never reaches the cache.

use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::SearchConfig;
use crate::error::Result;
use crate::types::Provider;

/// Prefix of composite-result keys.
const QUERY_PREFIX: &str = "query";

/// Render `value` as JSON with object keys sorted lexicographically at
/// every depth.
///
/// # Errors
///
/// Returns [`crate::SearchError::Serialization`] if `value` cannot be
/// represented as JSON.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value)?;
    Ok(serde_json::to_string(&sort_keys(value))?)
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k, sort_keys(v)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Cache key for a provider-native request: `"<provider>|<canonical json>"`.
///
/// # Errors
///
/// Same as [`canonical_json`].
pub fn provider_key<T: Serialize + ?Sized>(provider: &str, native_request: &T) -> Result<String> {
    Ok(tagged_key(provider, &canonical_json(native_request)?))
}

/// Cache key for an already canonicalized body.
pub fn tagged_key(tag: &str, body: &str) -> String {
    format!("{tag}|{body}")
}

/// Cache key for a composite result: `"query|<canonical json>"`.
///
/// # Errors
///
/// Same as [`canonical_json`].
pub fn query_key<T: Serialize + ?Sized>(request: &T) -> Result<String> {
    provider_key(QUERY_PREFIX, request)
}

/// Tag used in provider keys for each native endpoint.
pub fn endpoint_tag(provider: Provider, endpoint: &str) -> String {
    format!("{}-{endpoint}", provider.name())
}

/// Process-lifetime cache shared by every query.
///
/// Cloning is cheap and yields a handle to the same storage.
#[derive(Clone)]
pub struct ResponseCache {
    inner: Cache<String, Value>,
}

impl ResponseCache {
    /// Create a cache sized and aged according to `config`.
    pub fn new(config: &SearchConfig) -> Self {
        let mut builder = Cache::builder().max_capacity(config.cache_max_entries);
        if let Some(ttl) = config.cache_ttl_seconds {
            builder = builder.time_to_live(Duration::from_secs(ttl));
        }
        Self {
            inner: builder.build(),
        }
    }

    /// Look up a cached value. Returns an owned copy.
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.inner.get(key).await
    }

    /// Store a snapshot of `value` under `key`, replacing any previous entry.
    pub async fn put(&self, key: String, value: Value) {
        self.inner.insert(key, value).await;
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}
