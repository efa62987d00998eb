//! # codequest-search
//!
//! Developer-question search across Stack Overflow and Reddit.
//!
//! This crate translates one generic search request into the native
//! request of each upstream, normalizes their responses into a shared
//! [`NormalizedResult`] shape, and returns both result lists side by side.
//!
//! ## Design
//!
//! - Stack Overflow is paged by page number; Reddit by an opaque cursor.
//!   Both tokens live on [`SearchRequest`] and each fetcher reads only its own.
//! - Sort options are translated per source with a `relevance` fallback.
//! - Both sources are queried concurrently; no deduplication or re-ranking.
//! - By default a failure in either source fails the whole search
//!   ([`FailurePolicy::AllOrNothing`]); [`FailurePolicy::Partial`] returns
//!   the healthy source's results with a per-source failure entry.
//!
//! ## Security
//!
//! - No network listeners; the HTTP server lives in the application crate
//! - Search queries are logged only at trace level
//! - The Stack Exchange API key never appears in errors or logs

pub mod config;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod orchestrator;
pub mod sources;
pub mod types;

pub use config::{FailurePolicy, RedditConfig, SearchConfig, StackOverflowConfig};
pub use error::{ErrorKind, Result, SearchError, TransportError};
pub use fetcher::{SourceFetcher, SourcePage};
pub use http::{GetRequest, ReqwestTransport, Transport};
pub use orchestrator::Aggregator;
pub use types::{Answered, NormalizedResult, SearchRequest, SearchResponse, SortOption, Source};

/// The production aggregator over the `reqwest` transport.
pub type HttpAggregator =
    Aggregator<sources::StackOverflowFetcher<ReqwestTransport>, sources::RedditFetcher<ReqwestTransport>>;

/// Search both sources using `config`.
///
/// Builds a fresh transport per call; long-running callers should build an
/// [`HttpAggregator`] once with [`Aggregator::from_config`] and reuse it.
///
/// # Errors
///
/// Returns [`SearchError::Config`] for an invalid configuration, otherwise
/// the errors documented on [`Aggregator::search`].
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> codequest_search::Result<()> {
/// use codequest_search::{SearchConfig, SearchRequest, SortOption};
///
/// let request = SearchRequest::new("lifetimes").with_sort(SortOption::Score);
/// let response = codequest_search::search(&request, &SearchConfig::default()).await?;
/// for result in &response.stackoverflow_results {
///     println!("{}: {}", result.title, result.link);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn search(request: &SearchRequest, config: &SearchConfig) -> Result<SearchResponse> {
    orchestrator::validate_request(request)?;
    let transport = std::sync::Arc::new(ReqwestTransport::new()?);
    Aggregator::from_config(config, transport)?
        .search(request)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_validates_config() {
        let mut config = SearchConfig::default();
        config.stackoverflow.page_size = 0;
        let result = search(&SearchRequest::new("rust"), &config).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("page_size"));
    }

    #[tokio::test]
    async fn search_rejects_empty_query_before_config() {
        let mut config = SearchConfig::default();
        config.reddit.limit = 0;
        let err = search(&SearchRequest::new("  "), &config).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
