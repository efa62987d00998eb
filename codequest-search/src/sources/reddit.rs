//! Reddit fetcher over the public `search.json` listing endpoint.
//!
//! Reddit paginates with an opaque `after` cursor returned alongside each
//! listing, and asks API clients to identify themselves with a descriptive
//! User-Agent. Permalinks in the listing are site-relative.

use crate::config::RedditConfig;
use crate::error::SearchError;
use crate::fetcher::{SourceFetcher, SourcePage};
use crate::http::{GetRequest, Transport};
use crate::types::{NormalizedResult, SearchRequest, SortOption, Source, NO_LINK, NO_TITLE};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Translate a generic sort option into Reddit's `sort` value.
///
/// Reddit understands `relevance`, `new`, `hot` and `top`; anything else
/// falls back to `relevance`.
pub fn sort_param(sort: SortOption) -> &'static str {
    match sort {
        SortOption::Relevance | SortOption::New | SortOption::Hot | SortOption::Top => {
            sort.as_str()
        }
        _ => "relevance",
    }
}

/// Resolve a permalink against the site origin.
///
/// Only site-relative paths (a single leading `/`) are accepted, and the
/// joined URL must stay on the origin. Anything else, including a missing
/// or empty permalink, yields the `#` placeholder.
pub fn absolute_link(origin: &Url, permalink: Option<&str>) -> String {
    let Some(path) = permalink.filter(|p| is_site_relative(p)) else {
        return NO_LINK.to_owned();
    };
    match origin.join(path) {
        Ok(url) if url.origin() == origin.origin() => url.into(),
        _ => NO_LINK.to_owned(),
    }
}

fn is_site_relative(path: &str) -> bool {
    let mut chars = path.chars();
    chars.next() == Some('/') && !matches!(chars.next(), Some('/' | '\\'))
}

#[derive(Debug, Deserialize)]
struct Listing {
    #[serde(default)]
    data: Option<ListingData>,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Option<Vec<Child>>,
    #[serde(default)]
    after: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    title: Option<String>,
    permalink: Option<String>,
    score: Option<i64>,
    num_comments: Option<u64>,
    created_utc: Option<f64>,
}

/// Reddit search client.
pub struct RedditFetcher<T> {
    transport: Arc<T>,
    config: RedditConfig,
    origin: Url,
}

impl<T: Transport> RedditFetcher<T> {
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `config.site_origin` is not a URL.
    pub fn new(config: RedditConfig, transport: Arc<T>) -> Result<Self, SearchError> {
        let origin = Url::parse(&config.site_origin)
            .map_err(|e| SearchError::Config(format!("reddit.site_origin: {e}")))?;
        Ok(Self {
            transport,
            config,
            origin,
        })
    }

    /// Results requested per page.
    pub fn limit(&self) -> u32 {
        self.config.limit
    }

    /// Build the upstream request. `after` is omitted for the first page.
    pub fn build_request(
        &self,
        query: &str,
        sort: SortOption,
        limit: u32,
        cursor: Option<&str>,
    ) -> GetRequest {
        let mut request = GetRequest::new(
            self.config.base_url.clone(),
            Duration::from_secs(self.config.timeout_seconds),
        )
        .header("User-Agent", self.config.user_agent())
        .param("q", query)
        .param("sort", sort_param(sort))
        .param("limit", limit);
        if let Some(after) = cursor {
            request = request.param("after", after);
        }
        request
    }

    /// Fetch one listing page, returning its posts and the next cursor.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Upstream`] on transport failure or an
    /// unexpected listing shape. No retries are attempted.
    pub async fn fetch_after(
        &self,
        query: &str,
        sort: SortOption,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<(Vec<NormalizedResult>, Option<String>), SearchError> {
        tracing::trace!(query, cursor, "Reddit search");

        let body = self
            .transport
            .get_json(self.build_request(query, sort, limit, cursor))
            .await
            .map_err(|e| SearchError::upstream(Source::Reddit, e.to_string()))?;

        let (results, next) = parse_listing(body, &self.origin)?;
        tracing::debug!(
            count = results.len(),
            has_cursor = next.is_some(),
            "Reddit results parsed"
        );
        Ok((results, next))
    }
}

impl<T: Transport> SourceFetcher for RedditFetcher<T> {
    async fn fetch(&self, request: &SearchRequest) -> Result<SourcePage, SearchError> {
        let (results, next_cursor) = self
            .fetch_after(
                request.trimmed_query(),
                request.sort,
                self.config.limit,
                request.cursor.as_deref(),
            )
            .await?;
        Ok(SourcePage {
            results,
            next_cursor,
        })
    }

    fn source(&self) -> Source {
        Source::Reddit
    }
}

/// Map a Reddit listing body into normalized results and the next cursor.
fn parse_listing(
    body: serde_json::Value,
    origin: &Url,
) -> Result<(Vec<NormalizedResult>, Option<String>), SearchError> {
    let listing: Listing = serde_json::from_value(body).map_err(|e| {
        SearchError::upstream(Source::Reddit, format!("unexpected response: {e}"))
    })?;
    let Some(data) = listing.data else {
        return Ok((Vec::new(), None));
    };

    let results = data
        .children
        .unwrap_or_default()
        .into_iter()
        .map(|child| {
            let post = child.data;
            NormalizedResult::reddit(
                post.title.unwrap_or_else(|| NO_TITLE.to_owned()),
                absolute_link(origin, post.permalink.as_deref()),
                post.score.unwrap_or(0),
                post.num_comments.unwrap_or(0),
                post.created_utc.map(|t| t as i64).unwrap_or(0),
            )
        })
        .collect();

    Ok((results, data.after))
}
