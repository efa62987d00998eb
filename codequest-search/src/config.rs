//! Search configuration with sensible defaults.
//!
//! [`SearchConfig`] holds per-source endpoint, credential, paging and
//! timeout settings plus the cross-source [`FailurePolicy`]. The defaults
//! match the public Stack Exchange and Reddit endpoints.

use crate::error::SearchError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the orchestrator treats a failure in one of the two sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Any source failure fails the whole search.
    #[default]
    AllOrNothing,
    /// A failed source contributes an empty list and a failure entry; the
    /// search fails only when both sources fail.
    Partial,
}

/// Stack Exchange search API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackOverflowConfig {
    /// Base URL of the advanced search endpoint.
    pub base_url: String,
    /// Stack Exchange site parameter.
    pub site: String,
    /// Optional API key. Without one the upstream applies anonymous quotas.
    pub api_key: Option<String>,
    /// Results per page.
    pub page_size: u32,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for StackOverflowConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.stackexchange.com/2.3/search/advanced".into(),
            site: "stackoverflow".into(),
            api_key: None,
            page_size: 10,
            timeout_seconds: 10,
        }
    }
}

/// Reddit search settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditConfig {
    /// Base URL of the JSON search endpoint.
    pub base_url: String,
    /// Site origin that relative permalinks are resolved against.
    pub site_origin: String,
    /// Product name sent in the User-Agent header.
    pub product: String,
    /// Reddit username identifying the operator, sent in the User-Agent header.
    pub identity: String,
    /// Results requested per page.
    pub limit: u32,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.reddit.com/search.json".into(),
            site_origin: "https://www.reddit.com".into(),
            product: "CodeQuestApp".into(),
            identity: "yourusername".into(),
            limit: 10,
            timeout_seconds: 10,
        }
    }
}

impl RedditConfig {
    /// The User-Agent value Reddit's API policy asks clients to send.
    pub fn user_agent(&self) -> String {
        format!("{}/1.0 by {}", self.product, self.identity)
    }
}

/// Configuration for an aggregated search.
///
/// Use [`Default::default()`] for the public endpoints, or construct with
/// field overrides (tests point the base URLs at mock servers).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub failure_policy: FailurePolicy,
    pub stackoverflow: StackOverflowConfig,
    pub reddit: RedditConfig,
}

impl SearchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - page size, limit and both timeouts must be greater than 0
    /// - both base URLs and the Reddit site origin must parse as URLs
    /// - the Reddit product and identity must not be empty
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.stackoverflow.page_size == 0 {
            return Err(SearchError::Config(
                "stackoverflow.page_size must be greater than 0".into(),
            ));
        }
        if self.reddit.limit == 0 {
            return Err(SearchError::Config(
                "reddit.limit must be greater than 0".into(),
            ));
        }
        if self.stackoverflow.timeout_seconds == 0 || self.reddit.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        for (name, value) in [
            ("stackoverflow.base_url", &self.stackoverflow.base_url),
            ("reddit.base_url", &self.reddit.base_url),
            ("reddit.site_origin", &self.reddit.site_origin),
        ] {
            url::Url::parse(value)
                .map_err(|e| SearchError::Config(format!("{name} is not a valid URL: {e}")))?;
        }
        if self.reddit.product.trim().is_empty() || self.reddit.identity.trim().is_empty() {
            return Err(SearchError::Config(
                "reddit.product and reddit.identity must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Overall fan-out budget: the larger of the two per-source timeouts.
    pub fn overall_timeout(&self) -> Duration {
        Duration::from_secs(
            self.stackoverflow
                .timeout_seconds
                .max(self.reddit.timeout_seconds),
        )
    }
}
