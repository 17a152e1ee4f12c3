//! Cancellation group for the requests of one query invocation.
//!
//! A [`QueryScope`] wraps a [`CancellationToken`]. Every transport call of
//! an invocation runs through [`QueryScope::guard`], so cancelling the scope
//! drops all of its in-flight requests at once and resolves them to
//! [`SearchError::Cancelled`].

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::SearchError;

/// Cancellable group of in-flight requests. Clones share one token.
#[derive(Debug, Clone, Default)]
pub struct QueryScope {
    token: CancellationToken,
}

impl QueryScope {
    /// A fresh, uncancelled scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every request running under this scope.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Run `fut` unless the scope is cancelled first.
    ///
    /// A scope that is already cancelled never polls `fut`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Cancelled`] if the scope is cancelled before
    /// `fut` completes, otherwise whatever `fut` returns.
    pub async fn guard<F, T>(&self, fut: F) -> Result<T, SearchError>
    where
        F: Future<Output = Result<T, SearchError>>,
    {
        if self.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(SearchError::Cancelled),
            result = fut => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn guard_passes_result_through() {
        let scope = QueryScope::new();
        let value = scope.guard(async { Ok::<_, SearchError>(7) }).await;
        assert_eq!(value.expect("not cancelled"), 7);
    }

    #[tokio::test]
    async fn cancelled_scope_never_polls_future() {
        let scope = QueryScope::new();
        scope.cancel();
        let result = scope
            .guard(async {
                let polled = true;
                assert!(!polled, "must not be polled");
                Ok::<(), SearchError>(())
            })
            .await;
        assert!(matches!(result, Err(SearchError::Cancelled)));
    }

    #[tokio::test]
    async fn cancel_aborts_in_flight_future() {
        let scope = QueryScope::new();
        let handle = scope.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.cancel();
        });
        let result = scope
            .guard(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<(), SearchError>(())
            })
            .await;
        assert!(result.unwrap_err().is_cancelled());
    }

    #[test]
    fn clones_share_cancellation() {
        let scope = QueryScope::new();
        let clone = scope.clone();
        clone.cancel();
        assert!(scope.is_cancelled());
    }
}
