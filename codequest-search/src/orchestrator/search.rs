//! Core search orchestrator: concurrent two-source fan-out.
//!
//! Runs both fetchers concurrently under a per-source time bound, then
//! assembles a [`SearchResponse`] according to the [`FailurePolicy`].

use crate::config::{FailurePolicy, SearchConfig};
use crate::error::SearchError;
use crate::fetcher::{SourceFetcher, SourcePage};
use crate::http::Transport;
use crate::sources::{RedditFetcher, StackOverflowFetcher};
use crate::types::{SearchRequest, SearchResponse, Source, SourceFailure};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Reject requests that must never reach the network.
///
/// # Errors
///
/// Returns [`SearchError::Validation`] if the trimmed query is empty or the
/// page number is 0.
pub fn validate_request(request: &SearchRequest) -> Result<(), SearchError> {
    if request.trimmed_query().is_empty() {
        return Err(SearchError::Validation("query must not be empty".into()));
    }
    if request.page == 0 {
        return Err(SearchError::Validation("page must be 1 or greater".into()));
    }
    Ok(())
}

/// Fans one logical search out to a Stack Overflow fetcher and a Reddit fetcher.
///
/// Holds no per-call state; one instance can serve concurrent searches.
pub struct Aggregator<A, B> {
    stackoverflow: A,
    reddit: B,
    reddit_limit: usize,
    policy: FailurePolicy,
    time_bound: Duration,
}

impl<T: Transport> Aggregator<StackOverflowFetcher<T>, RedditFetcher<T>> {
    /// Build the production pair of fetchers over a shared transport.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `config` fails validation.
    pub fn from_config(config: &SearchConfig, transport: Arc<T>) -> Result<Self, SearchError> {
        config.validate()?;
        let stackoverflow =
            StackOverflowFetcher::new(config.stackoverflow.clone(), Arc::clone(&transport));
        let reddit = RedditFetcher::new(config.reddit.clone(), transport)?;
        Ok(Self::new(stackoverflow, reddit, config))
    }
}

impl<A: SourceFetcher, B: SourceFetcher> Aggregator<A, B> {
    /// Compose two fetchers. The Reddit limit, failure policy and time bound
    /// come from `config`.
    pub fn new(stackoverflow: A, reddit: B, config: &SearchConfig) -> Self {
        Self {
            stackoverflow,
            reddit,
            reddit_limit: config.reddit.limit as usize,
            policy: config.failure_policy,
            time_bound: config.overall_timeout(),
        }
    }

    /// Run one aggregated search.
    ///
    /// # Pipeline
    ///
    /// 1. Validate the request (no network call on failure)
    /// 2. Query both fetchers concurrently with [`futures::future::join`],
    ///    each bounded by the larger of the two per-source timeouts
    /// 3. Apply the failure policy
    /// 4. Compute `has_more` from Reddit's count against its limit
    ///
    /// Dropping the returned future cancels both in-flight requests.
    ///
    /// # Errors
    ///
    /// - [`SearchError::Validation`] for an empty query or page 0.
    /// - Under [`FailurePolicy::AllOrNothing`], the first failing source's
    ///   [`SearchError::Upstream`] (Stack Overflow is checked first).
    /// - Under [`FailurePolicy::Partial`], [`SearchError::AllSourcesFailed`]
    ///   only when both sources fail.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        validate_request(request)?;
        tracing::trace!(query = request.trimmed_query(), "aggregated search");

        let (stackoverflow, reddit) = futures::future::join(
            bounded(
                self.stackoverflow.source(),
                self.time_bound,
                self.stackoverflow.fetch(request),
            ),
            bounded(
                self.reddit.source(),
                self.time_bound,
                self.reddit.fetch(request),
            ),
        )
        .await;

        let response = match self.policy {
            FailurePolicy::AllOrNothing => {
                let stackoverflow = stackoverflow.inspect_err(log_failure)?;
                let reddit = reddit.inspect_err(log_failure)?;
                self.assemble(stackoverflow, reddit, Vec::new())
            }
            FailurePolicy::Partial => self.assemble_partial(stackoverflow, reddit)?,
        };

        tracing::info!(
            sort = %request.sort,
            page = request.page,
            stackoverflow = response.stackoverflow_results.len(),
            reddit = response.reddit_results.len(),
            has_more = response.has_more,
            "search completed"
        );
        Ok(response)
    }

    fn assemble_partial(
        &self,
        stackoverflow: Result<SourcePage, SearchError>,
        reddit: Result<SourcePage, SearchError>,
    ) -> Result<SearchResponse, SearchError> {
        let mut failures = Vec::new();
        let mut settle = |source: Source, outcome: Result<SourcePage, SearchError>| match outcome {
            Ok(page) => page,
            Err(err) => {
                log_failure(&err);
                failures.push(SourceFailure {
                    source,
                    message: err.to_string(),
                });
                SourcePage::default()
            }
        };
        let stackoverflow = settle(self.stackoverflow.source(), stackoverflow);
        let reddit = settle(self.reddit.source(), reddit);

        if failures.len() == Source::all().len() {
            let detail = failures
                .iter()
                .map(|f| f.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(SearchError::AllSourcesFailed(detail));
        }
        Ok(self.assemble(stackoverflow, reddit, failures))
    }

    fn assemble(
        &self,
        stackoverflow: SourcePage,
        reddit: SourcePage,
        failures: Vec<SourceFailure>,
    ) -> SearchResponse {
        SearchResponse {
            has_more: reddit.results.len() == self.reddit_limit,
            stackoverflow_results: stackoverflow.results,
            reddit_results: reddit.results,
            next_cursor: reddit.next_cursor,
            failures,
        }
    }
}

/// Bound one fetch so a stalled upstream surfaces as that source's failure.
async fn bounded<F>(source: Source, limit: Duration, fetch: F) -> Result<SourcePage, SearchError>
where
    F: Future<Output = Result<SourcePage, SearchError>>,
{
    tokio::time::timeout(limit, fetch)
        .await
        .unwrap_or_else(|_| {
            Err(SearchError::upstream(
                source,
                format!("timed out after {}s", limit.as_secs()),
            ))
        })
}

fn log_failure(err: &SearchError) {
    tracing::warn!(error = %err, "source query failed");
}
