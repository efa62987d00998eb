//! HTTP front-end.
//!
//! ## Endpoints
//!
//! - `GET /search?query=&sort=&page=&after=`: aggregated search
//! - `POST /send_email`: email a digest of previously returned results
//! - `GET /health`: liveness check

use crate::config::{AppConfig, MailConfig};
use crate::digest::DigestRequest;
use crate::error::{AppError, Result};
use crate::mail::{self, MailTransport};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use codequest_search::{
    Aggregator, HttpAggregator, ReqwestTransport, SearchRequest, SearchResponse, SortOption,
};
use serde::Deserialize;
use std::sync::Arc;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<HttpAggregator>,
    pub mailer: Arc<dyn MailTransport>,
    pub mail: Arc<MailConfig>,
}

impl AppState {
    /// Build the production state: a `reqwest` transport for search and
    /// SMTP or outbox delivery for mail, depending on `config.mail.smtp`.
    ///
    /// # Errors
    ///
    /// Returns an error if the search or SMTP configuration is invalid.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mailer = mail::transport_for(&config.mail)?;
        Self::with_mailer(config, mailer)
    }

    /// Build state around a caller-supplied mail transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the search configuration is invalid.
    pub fn with_mailer(config: &AppConfig, mailer: Arc<dyn MailTransport>) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new()?);
        let aggregator = Aggregator::from_config(&config.search, transport)?;
        Ok(Self {
            aggregator: Arc::new(aggregator),
            mailer,
            mail: Arc::new(config.mail.clone()),
        })
    }
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search", get(search))
        .route("/send_email", post(send_email))
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve(config: &AppConfig, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.server.bind_addr()).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!("codequest listening on http://{local_addr}");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    query: Option<String>,
    sort: Option<String>,
    page: Option<String>,
    after: Option<String>,
}

impl SearchParams {
    fn into_request(self) -> Result<SearchRequest> {
        let query = self.query.unwrap_or_default().trim().to_owned();
        if query.is_empty() {
            return Err(AppError::BadRequest("No search query provided".into()));
        }

        let page = match self.page.as_deref().map(str::trim) {
            None | Some("") => 1,
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|p| *p >= 1)
                .ok_or_else(|| {
                    AppError::BadRequest(format!("page must be a positive integer, got {raw:?}"))
                })?,
        };

        let sort = SortOption::from_param(self.sort.as_deref().unwrap_or_default());
        Ok(SearchRequest::new(query)
            .with_sort(sort)
            .with_page(page)
            .with_cursor(self.after))
    }
}

async fn search(
    State(state): State<AppState>,
    params: std::result::Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>> {
    let Query(params) = params.map_err(|rejection| {
        tracing::warn!(error = %rejection, "unreadable search parameters");
        AppError::BadRequest(format!("Invalid search parameters: {}", rejection.body_text()))
    })?;
    let request = params.into_request()?;
    let response = state.aggregator.search(&request).await?;
    Ok(Json(response))
}

async fn send_email(
    State(state): State<AppState>,
    body: std::result::Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(body) = body.map_err(|rejection| {
        tracing::warn!(error = %rejection, "unreadable digest request");
        AppError::BadRequest("No data provided".into())
    })?;

    let digest = DigestRequest::from_json(body)?.validate()?;
    let from = state
        .mail
        .default_sender
        .clone()
        .ok_or_else(|| AppError::Mail("no default sender configured".into()))?;
    let message = digest.into_message(from, &state.mail.subject_prefix);

    state.mailer.send(&message).await?;
    tracing::info!(recipients = message.to.len(), "digest email sent");

    Ok(Json(serde_json::json!({
        "message": "Email sent successfully!"
    })))
}
