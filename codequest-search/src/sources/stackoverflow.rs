//! Stack Overflow fetcher over the Stack Exchange advanced search API.
//!
//! Pagination is by 1-based page number with a fixed page size. The API
//! key is optional; without it the upstream applies anonymous quotas.

use crate::config::StackOverflowConfig;
use crate::error::SearchError;
use crate::fetcher::{SourceFetcher, SourcePage};
use crate::http::{GetRequest, Transport};
use crate::types::{NormalizedResult, SearchRequest, SortOption, Source, NO_LINK, NO_TITLE};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Translate a generic sort option into the Stack Exchange `sort` value.
///
/// Options the API has no equivalent for fall back to `relevance`.
pub fn sort_param(sort: SortOption) -> &'static str {
    match sort {
        SortOption::Relevance => "relevance",
        SortOption::Score => "votes",
        SortOption::Date => "creation",
        _ => "relevance",
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    items: Option<Vec<ApiItem>>,
}

#[derive(Debug, Deserialize)]
struct ApiItem {
    title: Option<String>,
    link: Option<String>,
    is_answered: Option<bool>,
    score: Option<i64>,
    answer_count: Option<u64>,
    creation_date: Option<i64>,
}

impl From<ApiItem> for NormalizedResult {
    fn from(item: ApiItem) -> Self {
        NormalizedResult::stackoverflow(
            item.title.unwrap_or_else(|| NO_TITLE.to_owned()),
            item.link.unwrap_or_else(|| NO_LINK.to_owned()),
            item.is_answered.unwrap_or(false),
            item.score.unwrap_or(0),
            item.answer_count.unwrap_or(0),
            item.creation_date.unwrap_or(0),
        )
    }
}

/// Stack Exchange search client.
pub struct StackOverflowFetcher<T> {
    transport: Arc<T>,
    config: StackOverflowConfig,
}

impl<T: Transport> StackOverflowFetcher<T> {
    pub fn new(config: StackOverflowConfig, transport: Arc<T>) -> Self {
        Self { transport, config }
    }

    /// Build the upstream request for one page.
    pub fn build_request(&self, query: &str, sort: SortOption, page: u32) -> GetRequest {
        let mut request = GetRequest::new(
            self.config.base_url.clone(),
            Duration::from_secs(self.config.timeout_seconds),
        )
        .param("order", "desc")
        .param("sort", sort_param(sort))
        .param("q", query)
        .param("site", &self.config.site);
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            request = request.param("key", key);
        }
        request
            .param("page", page)
            .param("pagesize", self.config.page_size)
    }

    /// Fetch one page of questions.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Upstream`] on transport failure or an
    /// unexpected response shape. No retries are attempted.
    pub async fn fetch_page(
        &self,
        query: &str,
        sort: SortOption,
        page: u32,
    ) -> Result<Vec<NormalizedResult>, SearchError> {
        tracing::trace!(query, page, "Stack Overflow search");

        let body = self
            .transport
            .get_json(self.build_request(query, sort, page))
            .await
            .map_err(|e| SearchError::upstream(Source::StackOverflow, e.to_string()))?;

        let results = parse_response(body)?;
        tracing::debug!(count = results.len(), page, "Stack Overflow results parsed");
        Ok(results)
    }
}

impl<T: Transport> SourceFetcher for StackOverflowFetcher<T> {
    async fn fetch(&self, request: &SearchRequest) -> Result<SourcePage, SearchError> {
        let results = self
            .fetch_page(request.trimmed_query(), request.sort, request.page)
            .await?;
        Ok(SourcePage {
            results,
            next_cursor: None,
        })
    }

    fn source(&self) -> Source {
        Source::StackOverflow
    }
}

/// Map a Stack Exchange JSON body into normalized results.
///
/// Extracted as a separate function for testability with canned JSON.
fn parse_response(body: serde_json::Value) -> Result<Vec<NormalizedResult>, SearchError> {
    let response: ApiResponse = serde_json::from_value(body).map_err(|e| {
        SearchError::upstream(Source::StackOverflow, format!("unexpected response: {e}"))
    })?;
    Ok(response
        .items
        .unwrap_or_default()
        .into_iter()
        .map(NormalizedResult::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::types::Answered;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records the last request and replies with a fixed outcome.
    struct RecordingTransport {
        reply: Result<serde_json::Value, TransportError>,
        seen: Mutex<Vec<GetRequest>>,
    }

    impl RecordingTransport {
        fn replying(reply: Result<serde_json::Value, TransportError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn last(&self) -> GetRequest {
            self.seen
                .lock()
                .expect("lock")
                .last()
                .cloned()
                .expect("a request was made")
        }
    }

    impl Transport for RecordingTransport {
        async fn get_json(&self, request: GetRequest) -> Result<serde_json::Value, TransportError> {
            self.seen.lock().expect("lock").push(request);
            self.reply.clone()
        }
    }

    #[test]
    fn sort_translation_table() {
        assert_eq!(sort_param(SortOption::Relevance), "relevance");
        assert_eq!(sort_param(SortOption::Score), "votes");
        assert_eq!(sort_param(SortOption::Date), "creation");
    }

    #[test]
    fn unsupported_sorts_fall_back_to_relevance() {
        for sort in [SortOption::New, SortOption::Hot, SortOption::Top] {
            assert_eq!(sort_param(sort), "relevance");
        }
        for raw in ["bogus", "", "VOTES", "activity"] {
            assert_eq!(sort_param(SortOption::from_param(raw)), "relevance");
        }
    }

    #[test]
    fn parse_full_items() {
        let body = json!({
            "items": [
                {
                    "title": "What is a lifetime?",
                    "link": "https://stackoverflow.com/questions/1",
                    "is_answered": true,
                    "score": 12,
                    "answer_count": 4,
                    "creation_date": 1_600_000_000
                },
                {
                    "title": "Second",
                    "link": "https://stackoverflow.com/questions/2",
                    "is_answered": false,
                    "score": -1,
                    "answer_count": 0,
                    "creation_date": 1_600_000_100
                }
            ],
            "has_more": true,
            "quota_remaining": 299
        });
        let results = parse_response(body).expect("should parse");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].source(), Source::StackOverflow);
        assert_eq!(results[0].title, "What is a lifetime?");
        assert_eq!(results[0].is_answered, Answered::Known(true));
        assert_eq!(results[0].secondary_count, 4);
        assert_eq!(results[0].created_at, 1_600_000_000);
        assert_eq!(results[1].score, -1);
    }

    #[test]
    fn parse_missing_fields_use_defaults() {
        let results = parse_response(json!({"items": [{}]})).expect("should parse");
        assert_eq!(results.len(), 1);
        let r = &results[0];
        assert_eq!(r.title, NO_TITLE);
        assert_eq!(r.link, NO_LINK);
        assert_eq!(r.is_answered, Answered::Known(false));
        assert_eq!(r.score, 0);
        assert_eq!(r.secondary_count, 0);
        assert_eq!(r.created_at, 0);
    }

    #[test]
    fn parse_absent_items_is_empty() {
        assert!(parse_response(json!({})).expect("should parse").is_empty());
        assert!(parse_response(json!({"items": null}))
            .expect("should parse")
            .is_empty());
    }

    #[test]
    fn parse_wrong_shape_is_upstream_error() {
        let err = parse_response(json!({"items": "nope"})).unwrap_err();
        assert!(matches!(
            err,
            SearchError::Upstream {
                origin: Source::StackOverflow,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn request_shape_without_key() {
        let transport = RecordingTransport::replying(Ok(json!({"items": []})));
        let fetcher = StackOverflowFetcher::new(StackOverflowConfig::default(), transport.clone());

        fetcher
            .fetch_page("borrow checker", SortOption::Score, 2)
            .await
            .expect("should succeed");

        let req = transport.last();
        assert_eq!(req.url, "https://api.stackexchange.com/2.3/search/advanced");
        assert_eq!(req.query_value("order"), Some("desc"));
        assert_eq!(req.query_value("sort"), Some("votes"));
        assert_eq!(req.query_value("q"), Some("borrow checker"));
        assert_eq!(req.query_value("site"), Some("stackoverflow"));
        assert_eq!(req.query_value("page"), Some("2"));
        assert_eq!(req.query_value("pagesize"), Some("10"));
        assert_eq!(req.query_value("key"), None);
        assert_eq!(req.timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn request_includes_configured_key() {
        let transport = RecordingTransport::replying(Ok(json!({"items": []})));
        let config = StackOverflowConfig {
            api_key: Some("k3y".into()),
            ..Default::default()
        };
        let fetcher = StackOverflowFetcher::new(config, transport.clone());
        fetcher
            .fetch_page("rust", SortOption::Relevance, 1)
            .await
            .expect("should succeed");
        assert_eq!(transport.last().query_value("key"), Some("k3y"));
    }

    #[tokio::test]
    async fn transport_failure_is_upstream_error() {
        let transport = RecordingTransport::replying(Err(TransportError::Timeout(10)));
        let fetcher = StackOverflowFetcher::new(StackOverflowConfig::default(), transport);
        let err = fetcher
            .fetch_page("rust", SortOption::Relevance, 1)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Stack Overflow request failed: timed out after 10s"
        );
    }

    #[tokio::test]
    async fn trait_fetch_uses_page_and_ignores_cursor() {
        let transport = RecordingTransport::replying(Ok(json!({"items": [{"title": "x"}]})));
        let fetcher = StackOverflowFetcher::new(StackOverflowConfig::default(), transport.clone());
        let request = SearchRequest::new("  rust  ")
            .with_page(5)
            .with_cursor(Some("t3_abc".into()));

        let page = fetcher.fetch(&request).await.expect("should succeed");
        assert_eq!(page.results.len(), 1);
        assert!(page.next_cursor.is_none());

        let req = transport.last();
        assert_eq!(req.query_value("q"), Some("rust"));
        assert_eq!(req.query_value("page"), Some("5"));
        assert_eq!(req.query_value("after"), None);
        assert_eq!(fetcher.source(), Source::StackOverflow);
    }
}
