//! Error types for the Code Quest application.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use codequest_search::{ErrorKind, SearchError};

/// Top-level error type for the HTTP front-end, digest and mail layers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Search core error.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// Malformed or incomplete client request. The message is shown to the user.
    #[error("{0}")]
    BadRequest(String),

    /// Outgoing mail could not be delivered.
    #[error("mail error: {0}")]
    Mail(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Search(err) => match err.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::Upstream | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Mail(_) | Self::Config(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the `error` field of the JSON response.
    pub fn public_message(&self) -> String {
        match self {
            Self::Search(err) => match err.kind() {
                ErrorKind::Validation => err.to_string(),
                ErrorKind::Upstream => format!("Error fetching data from APIs: {err}"),
                ErrorKind::Internal => format!("An unexpected error occurred: {err}"),
            },
            Self::BadRequest(msg) => msg.clone(),
            Self::Mail(_) => "Failed to send email. Please try again later.".to_owned(),
            Self::Config(_) | Self::Io(_) => "An unexpected error occurred.".to_owned(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        (
            status,
            Json(serde_json::json!({ "error": self.public_message() })),
        )
            .into_response()
    }
}
