//! Outbound HTTP seam used by the source fetchers.
//!
//! Fetchers never talk to `reqwest` directly. They describe a GET as a
//! [`GetRequest`] and hand it to a [`Transport`], which returns the parsed
//! JSON body. [`ReqwestTransport`] is the production implementation; tests
//! substitute counting or failing transports.

use crate::error::{SearchError, TransportError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Fallback User-Agent for requests that do not set their own.
const DEFAULT_USER_AGENT: &str = concat!("CodeQuestApp/", env!("CARGO_PKG_VERSION"));

/// A single GET with query parameters, headers and a time budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl GetRequest {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            timeout,
        }
    }

    /// Append a query parameter.
    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.query.push((name.to_owned(), value.to_string()));
        self
    }

    /// Append a header.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_owned(), value.into()));
        self
    }

    /// Look up the first value of a query parameter.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Issues GET requests and returns parsed JSON bodies.
///
/// All implementations must be `Send + Sync`; one transport is shared by
/// both fetchers while they run concurrently.
pub trait Transport: Send + Sync {
    /// Perform the request.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on network failure, timeout, non-success
    /// status, or a body that is not JSON.
    fn get_json(
        &self,
        request: GetRequest,
    ) -> impl Future<Output = Result<serde_json::Value, TransportError>> + Send;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn get_json(
        &self,
        request: GetRequest,
    ) -> impl Future<Output = Result<serde_json::Value, TransportError>> + Send {
        (**self).get_json(request)
    }
}

/// [`Transport`] backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Internal`] if the client cannot be constructed.
    pub fn new() -> Result<Self, SearchError> {
        Ok(Self {
            client: build_client()?,
        })
    }

    /// Wrap an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    async fn get_json(&self, request: GetRequest) -> Result<serde_json::Value, TransportError> {
        let timeout_secs = request.timeout.as_secs();
        let mut builder = self
            .client
            .get(&request.url)
            .query(&request.query)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify(e, timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| classify(e, timeout_secs))?;

        tracing::trace!(bytes = body.len(), url = %request.url, "upstream response received");

        serde_json::from_slice(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

fn classify(err: reqwest::Error, timeout_secs: u64) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout_secs)
    } else {
        TransportError::Network(err.to_string())
    }
}

/// Build the [`reqwest::Client`] shared by both fetchers.
///
/// The client has brotli/gzip decompression, a bounded redirect policy and a
/// default User-Agent. Timeouts are applied per request.
///
/// # Errors
///
/// Returns [`SearchError::Internal`] if the client cannot be constructed.
pub fn build_client() -> Result<reqwest::Client, SearchError> {
    reqwest::Client::builder()
        .user_agent(DEFAULT_USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| SearchError::Internal(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_request_builder() {
        let req = GetRequest::new("https://example.com", Duration::from_secs(3))
            .param("q", "rust")
            .param("page", 2)
            .header("User-Agent", "Test/1.0");
        assert_eq!(req.query_value("q"), Some("rust"));
        assert_eq!(req.query_value("page"), Some("2"));
        assert_eq!(req.query_value("missing"), None);
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.timeout, Duration::from_secs(3));
    }

    #[test]
    fn build_client_succeeds() {
        assert!(build_client().is_ok());
    }

    #[test]
    fn transport_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ReqwestTransport>();
        assert_send_sync::<Arc<ReqwestTransport>>();
    }
}
