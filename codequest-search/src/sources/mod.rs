//! Source fetcher implementations.
//!
//! Each module provides a struct implementing [`crate::fetcher::SourceFetcher`]
//! over one upstream JSON API.

pub mod reddit;
pub mod stackoverflow;

pub use reddit::RedditFetcher;
pub use stackoverflow::StackOverflowFetcher;
