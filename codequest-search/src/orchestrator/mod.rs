//! Search orchestrator: concurrent fan-out to both sources and response shaping.
//!
//! This module validates the request, queries Stack Overflow and Reddit
//! concurrently, applies the configured [`crate::FailurePolicy`], and keeps
//! each source's results in its own list without merging or re-ranking.

pub mod search;

pub use search::{validate_request, Aggregator};
