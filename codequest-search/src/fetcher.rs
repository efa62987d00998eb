//! Trait definition for the per-source fetchers.
//!
//! Each upstream (Stack Overflow, Reddit) implements [`SourceFetcher`] to
//! give the orchestrator a uniform way to run one page of a search, while
//! keeping its own pagination model internal.

use crate::error::SearchError;
use crate::types::{NormalizedResult, SearchRequest, Source};
use std::future::Future;

/// One page of results from a single source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourcePage {
    /// Results in upstream order.
    pub results: Vec<NormalizedResult>,
    /// Continuation token for cursor-paginated sources.
    pub next_cursor: Option<String>,
}

/// A search backend for one upstream.
///
/// Implementors handle their own:
///
/// - sort-option translation, with a fallback for unsupported options
/// - pagination (page number or cursor, read from [`SearchRequest`])
/// - request headers and credentials
/// - mapping of the native response into [`NormalizedResult`]
///
/// All implementations must be `Send + Sync` for concurrent fan-out.
pub trait SourceFetcher: Send + Sync {
    /// Fetch one page of results for `request`.
    ///
    /// The query is expected to be trimmed and non-empty already; the
    /// orchestrator validates it.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Upstream`] if the call fails, times out, or the
    /// response does not have the expected shape.
    fn fetch(
        &self,
        request: &SearchRequest,
    ) -> impl Future<Output = Result<SourcePage, SearchError>> + Send;

    /// Which [`Source`] this fetcher represents.
    fn source(&self) -> Source;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedFetcher {
        page: Option<SourcePage>,
    }

    impl SourceFetcher for FixedFetcher {
        async fn fetch(&self, _request: &SearchRequest) -> Result<SourcePage, SearchError> {
            self.page
                .clone()
                .ok_or_else(|| SearchError::upstream(Source::Reddit, "mock failure"))
        }

        fn source(&self) -> Source {
            Source::Reddit
        }
    }

    #[tokio::test]
    async fn fetcher_returns_page() {
        let page = SourcePage {
            results: vec![NormalizedResult::reddit("t".into(), "l".into(), 1, 2, 3)],
            next_cursor: Some("t3_next".into()),
        };
        let fetcher = FixedFetcher {
            page: Some(page.clone()),
        };
        let got = fetcher
            .fetch(&SearchRequest::new("rust"))
            .await
            .expect("should succeed");
        assert_eq!(got, page);
    }

    #[tokio::test]
    async fn fetcher_propagates_errors() {
        let fetcher = FixedFetcher { page: None };
        let err = fetcher
            .fetch(&SearchRequest::new("rust"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("mock failure"));
        assert_eq!(fetcher.source(), Source::Reddit);
    }
}
