//! Error types for the codequest-search crate.
//!
//! All errors use stable string messages suitable for display to users.
//! API keys never appear in error messages.

use crate::types::Source;

/// Errors that can occur during an aggregated search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The request was rejected before any network call.
    #[error("invalid request: {0}")]
    Validation(String),

    /// One upstream failed: network error, bad status, timeout, or bad JSON.
    #[error("{origin} request failed: {reason}")]
    Upstream { origin: Source, reason: String },

    /// Every source failed under the partial failure policy.
    #[error("all sources failed: {0}")]
    AllSourcesFailed(String),

    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Anything unexpected.
    #[error("internal error: {0}")]
    Internal(String),
}

/// The user-facing categories a [`SearchError`] falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Upstream,
    Internal,
}

impl SearchError {
    pub(crate) fn upstream(origin: Source, reason: impl Into<String>) -> Self {
        Self::Upstream {
            origin,
            reason: reason.into(),
        }
    }

    /// Collapse this error into one of the three user-facing kinds.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Upstream { .. } | Self::AllSourcesFailed(_) => ErrorKind::Upstream,
            Self::Config(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Failure of a single GET through a [`crate::http::Transport`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid JSON: {0}")]
    Decode(String),
}

/// Convenience type alias for codequest-search results.
pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_validation() {
        let err = SearchError::Validation("query must not be empty".into());
        assert_eq!(err.to_string(), "invalid request: query must not be empty");
    }

    #[test]
    fn display_upstream_names_source() {
        let err = SearchError::upstream(Source::StackOverflow, "HTTP status 503");
        assert_eq!(
            err.to_string(),
            "Stack Overflow request failed: HTTP status 503"
        );
    }

    #[test]
    fn display_transport_errors() {
        assert_eq!(TransportError::Timeout(10).to_string(), "timed out after 10s");
        assert_eq!(TransportError::Status(429).to_string(), "HTTP status 429");
    }

    #[test]
    fn kinds() {
        assert_eq!(
            SearchError::Validation(String::new()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            SearchError::upstream(Source::Reddit, "x").kind(),
            ErrorKind::Upstream
        );
        assert_eq!(
            SearchError::AllSourcesFailed("x".into()).kind(),
            ErrorKind::Upstream
        );
        assert_eq!(SearchError::Config("x".into()).kind(), ErrorKind::Internal);
        assert_eq!(SearchError::Internal("x".into()).kind(), ErrorKind::Internal);
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SearchError>();
        assert_send_sync::<TransportError>();
    }
}
