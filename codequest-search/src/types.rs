//! Core types for search requests, normalized results, and source identification.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Placeholder title used when an upstream item has none.
pub const NO_TITLE: &str = "No Title";

/// Placeholder link used when an upstream item has none.
pub const NO_LINK: &str = "#";

/// The upstream services results can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// Stack Overflow, via the Stack Exchange search API. Page-number pagination.
    #[serde(rename = "Stack Overflow")]
    StackOverflow,
    /// Reddit, via the public `search.json` endpoint. Cursor pagination.
    Reddit,
}

impl Source {
    /// Returns the human-readable name of this source.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StackOverflow => "Stack Overflow",
            Self::Reddit => "Reddit",
        }
    }

    /// Returns all source variants, in response order.
    pub fn all() -> &'static [Source] {
        &[Self::StackOverflow, Self::Reddit]
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Generic sort preference accepted from callers.
///
/// Not every upstream supports every option. Each fetcher translates the
/// options it understands and falls back to [`SortOption::Relevance`] for
/// the rest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOption {
    #[default]
    Relevance,
    Score,
    Date,
    New,
    Hot,
    Top,
}

impl SortOption {
    /// Lenient parse used for request parameters: unknown values become
    /// [`SortOption::Relevance`]. Matching is exact, so `Score` is unknown.
    pub fn from_param(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }

    /// The lowercase parameter form of this option.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::Score => "score",
            Self::Date => "date",
            Self::New => "new",
            Self::Hot => "hot",
            Self::Top => "top",
        }
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by the strict [`FromStr`] parse of [`SortOption`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort option: {0}")]
pub struct UnknownSortOption(pub String);

impl FromStr for SortOption {
    type Err = UnknownSortOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relevance" => Ok(Self::Relevance),
            "score" => Ok(Self::Score),
            "date" => Ok(Self::Date),
            "new" => Ok(Self::New),
            "hot" => Ok(Self::Hot),
            "top" => Ok(Self::Top),
            _ => Err(UnknownSortOption(s.to_owned())),
        }
    }
}

/// One logical search across both sources.
///
/// `page` is consumed only by the Stack Overflow fetcher and `cursor` only
/// by the Reddit fetcher. The two pagination models are deliberately kept
/// side by side rather than merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Free-text query. Trimmed before use; must not be empty.
    pub query: String,
    /// Requested sort order.
    pub sort: SortOption,
    /// 1-based Stack Overflow page number.
    pub page: u32,
    /// Reddit continuation token; `None` requests the first page.
    pub cursor: Option<String>,
}

impl SearchRequest {
    /// A first-page request with relevance ordering.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            sort: SortOption::Relevance,
            page: 1,
            cursor: None,
        }
    }

    /// Set the sort preference.
    pub fn with_sort(mut self, sort: SortOption) -> Self {
        self.sort = sort;
        self
    }

    /// Set the Stack Overflow page.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Set the Reddit cursor. Empty strings are treated as "no cursor".
    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor.filter(|c| !c.trim().is_empty());
        self
    }

    /// The query with surrounding whitespace removed.
    pub fn trimmed_query(&self) -> &str {
        self.query.trim()
    }
}

/// Whether a result has been answered.
///
/// Only Stack Overflow has this concept; Reddit results carry
/// [`Answered::NotApplicable`], serialized as the string `"N/A"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answered {
    Known(bool),
    NotApplicable,
}

const NOT_APPLICABLE: &str = "N/A";

impl Serialize for Answered {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(answered) => serializer.serialize_bool(*answered),
            Self::NotApplicable => serializer.serialize_str(NOT_APPLICABLE),
        }
    }
}

impl<'de> Deserialize<'de> for Answered {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(answered) => Ok(Self::Known(answered)),
            Raw::Text(_) => Ok(Self::NotApplicable),
        }
    }
}

/// A single result from either source, in the shared shape.
///
/// The `source` tag is fixed at construction. `secondary_count` is the
/// answer count for Stack Overflow and the comment count for Reddit; the
/// serialized field name follows the source (`num_answers` /
/// `num_comments`) so the two are never confused downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireResult", try_from = "WireResult")]
pub struct NormalizedResult {
    source: Source,
    pub title: String,
    pub link: String,
    pub is_answered: Answered,
    pub score: i64,
    pub secondary_count: u64,
    pub created_at: i64,
}

impl NormalizedResult {
    /// Build a Stack Overflow result.
    pub fn stackoverflow(
        title: String,
        link: String,
        is_answered: bool,
        score: i64,
        answer_count: u64,
        created_at: i64,
    ) -> Self {
        Self {
            source: Source::StackOverflow,
            title,
            link,
            is_answered: Answered::Known(is_answered),
            score,
            secondary_count: answer_count,
            created_at,
        }
    }

    /// Build a Reddit result.
    pub fn reddit(
        title: String,
        link: String,
        score: i64,
        comment_count: u64,
        created_at: i64,
    ) -> Self {
        Self {
            source: Source::Reddit,
            title,
            link,
            is_answered: Answered::NotApplicable,
            score,
            secondary_count: comment_count,
            created_at,
        }
    }

    /// Which source produced this result.
    pub fn source(&self) -> Source {
        self.source
    }
}

/// Wire form of [`NormalizedResult`], matching the JSON the front-end reads.
#[derive(Serialize, Deserialize)]
struct WireResult {
    source: Source,
    #[serde(default = "default_title")]
    title: String,
    #[serde(default = "default_link")]
    link: String,
    #[serde(default = "default_answered")]
    is_answered: Answered,
    #[serde(default)]
    score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    num_answers: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    num_comments: Option<u64>,
    #[serde(default)]
    date: i64,
}

fn default_title() -> String {
    NO_TITLE.to_owned()
}

fn default_link() -> String {
    NO_LINK.to_owned()
}

fn default_answered() -> Answered {
    Answered::NotApplicable
}

impl From<NormalizedResult> for WireResult {
    fn from(r: NormalizedResult) -> Self {
        let (num_answers, num_comments) = match r.source {
            Source::StackOverflow => (Some(r.secondary_count), None),
            Source::Reddit => (None, Some(r.secondary_count)),
        };
        Self {
            source: r.source,
            title: r.title,
            link: r.link,
            is_answered: r.is_answered,
            score: r.score,
            num_answers,
            num_comments,
            date: r.created_at,
        }
    }
}

impl TryFrom<WireResult> for NormalizedResult {
    type Error = String;

    fn try_from(w: WireResult) -> Result<Self, Self::Error> {
        let secondary_count = match w.source {
            Source::StackOverflow => w.num_answers,
            Source::Reddit => w.num_comments,
        }
        .unwrap_or(0);
        let is_answered = match (w.source, w.is_answered) {
            (Source::Reddit, _) => Answered::NotApplicable,
            (Source::StackOverflow, Answered::NotApplicable) => Answered::Known(false),
            (Source::StackOverflow, known) => known,
        };
        Ok(Self {
            source: w.source,
            title: w.title,
            link: w.link,
            is_answered,
            score: w.score,
            secondary_count,
            created_at: w.date,
        })
    }
}

/// One source that failed under the partial failure policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source: Source,
    pub message: String,
}

/// Combined result of one logical search.
///
/// Both result lists are always present, possibly empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Stack Overflow results in upstream order.
    #[serde(rename = "stackoverflow")]
    pub stackoverflow_results: Vec<NormalizedResult>,
    /// Reddit results in upstream order.
    #[serde(rename = "reddit")]
    pub reddit_results: Vec<NormalizedResult>,
    /// True when Reddit filled the requested limit, so another page may exist.
    pub has_more: bool,
    /// Reddit's continuation token for the next page.
    #[serde(rename = "reddit_after")]
    pub next_cursor: Option<String>,
    /// Sources that failed, populated only under [`crate::FailurePolicy::Partial`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SourceFailure>,
}
