//! Provider adapters.
//!
//! Each adapter translates a canonical [`crate::SearchRequest`] into its
//! backend's native request, issues it through the shared [`Transport`]
//! (consulting the response cache first) and translates the native
//! response into canonical [`crate::Hit`]s.

pub mod primary;
pub mod secondary;

pub use primary::{PrimaryAdapter, PrimaryPage, PrimaryQuery};
pub use secondary::{SecondaryAdapter, SecondaryPage, SecondaryQuery};

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::cache::{canonical_json, tagged_key, ResponseCache};
use crate::error::Result;
use crate::scope::QueryScope;
use crate::transport::{Transport, TransportRequest};

/// Everything an adapter needs to issue one request for one invocation.
pub struct ProviderContext<'a, T> {
    /// Shared transport.
    pub transport: &'a T,
    /// Shared response cache.
    pub cache: &'a ResponseCache,
    /// Cancellation scope of the current invocation.
    pub scope: &'a QueryScope,
}

impl<T> Clone for ProviderContext<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ProviderContext<'_, T> {}

impl<T: Transport> ProviderContext<'_, T> {
    /// POST `native` to `url`, short-circuiting on a cache hit.
    ///
    /// The body is the canonical JSON of `native`; the cache key is
    /// `"<tag>|" + body`. Successful responses are cached before returning.
    ///
    /// # Errors
    ///
    /// Propagates transport failures and [`crate::SearchError::Cancelled`].
    pub async fn fetch_json<Q: Serialize + ?Sized>(
        &self,
        tag: &str,
        url: &str,
        native: &Q,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        let body = canonical_json(native)?;
        let key = tagged_key(tag, &body);

        if let Some(cached) = self.cache.get(&key).await {
            tracing::trace!(tag, "provider cache hit");
            return Ok(cached);
        }

        let mut request = TransportRequest::post_json(url, body);
        if let Some(timeout) = timeout {
            request = request.with_timeout(timeout);
        }
        let value = self.scope.guard(self.transport.send(request)).await?;
        self.cache.put(key, value.clone()).await;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::provider_key;
    use crate::config::SearchConfig;
    use crate::error::SearchError;
    use serde_json::json;

    struct Unreachable;

    impl Transport for Unreachable {
        async fn send(&self, _request: TransportRequest) -> Result<Value> {
            Err(SearchError::Transport("no network in this test".into()))
        }
    }

    #[tokio::test]
    async fn fetch_json_reads_entries_under_provider_key() {
        let cache = ResponseCache::new(&SearchConfig::default());
        let native = json!({"size": 3, "query": "שלום"});
        let key = provider_key("primary-search", &native).expect("key");
        cache.put(key, json!({"served": "cache"})).await;

        let scope = QueryScope::new();
        let ctx = ProviderContext {
            transport: &Unreachable,
            cache: &cache,
            scope: &scope,
        };
        let value = ctx
            .fetch_json("primary-search", "http://primary.test", &native, None)
            .await
            .expect("cache hit");
        assert_eq!(value, json!({"served": "cache"}));
    }

    #[tokio::test]
    async fn fetch_json_propagates_transport_failure_on_miss() {
        let cache = ResponseCache::new(&SearchConfig::default());
        let scope = QueryScope::new();
        let ctx = ProviderContext {
            transport: &Unreachable,
            cache: &cache,
            scope: &scope,
        };
        let err = ctx
            .fetch_json("primary-search", "http://primary.test", &json!({}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Transport(_)));
    }
}
