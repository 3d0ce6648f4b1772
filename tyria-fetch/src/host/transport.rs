//! Network transport behind the [`crate::http::HttpClient`].
//!
//! The transport only moves bytes: it sends a fully built GET request and
//! hands back the status and body. Credentials, URL building and error
//! classification live in the client and its middleware, so tests can swap
//! the transport for an in-process one without losing any of that logic.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};
use tracing::{debug, instrument};
use url::Url;

use crate::error::TransportError;

/// User agent string for Tyria.
const USER_AGENT: &str = concat!("tyria/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Request / Response
// ============================================================================

/// A GET request ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    /// Absolute URL including query string.
    pub url: Url,
    /// Extra headers.
    pub headers: Vec<(String, String)>,
}

impl TransportRequest {
    /// Returns the value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the value of the first query parameter named `name`.
    pub fn query(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

/// Status and body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

impl TransportResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ============================================================================
// Transport Trait
// ============================================================================

/// Sends requests over some network.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs a GET request.
    ///
    /// Any HTTP status, success or not, is an `Ok` response. `Err` is
    /// reserved for failures where no status was received.
    async fn get(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

// ============================================================================
// Reqwest Transport
// ============================================================================

/// [`Transport`] over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: Client,
}

impl ReqwestTransport {
    /// Creates a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built, which usually
    /// indicates a broken TLS configuration.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let inner = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TransportError::Other(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { inner })
    }

    /// Returns the inner reqwest client for advanced operations.
    pub fn inner(&self) -> &Client {
        &self.inner
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip(self, request), fields(path = %request.url.path()))]
    async fn get(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self
            .inner
            .get(request.url)
            .header(header::ACCEPT, "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        debug!(status, "Response received");

        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accessors() {
        let request = TransportRequest {
            url: Url::parse("https://api.guildwars2.com/v2/items?ids=1,2&access_token=abc").unwrap(),
            headers: vec![("Authorization".to_string(), "Bearer abc".to_string())],
        };

        assert_eq!(request.header("authorization"), Some("Bearer abc"));
        assert_eq!(request.header("x-missing"), None);
        assert_eq!(request.query("ids").as_deref(), Some("1,2"));
        assert_eq!(request.query("access_token").as_deref(), Some("abc"));
    }

    #[test]
    fn test_response_success_range() {
        assert!(TransportResponse::new(200, "[]").is_success());
        assert!(TransportResponse::new(206, "[]").is_success());
        assert!(!TransportResponse::new(404, "").is_success());
    }

    #[test]
    fn test_reqwest_transport_builds() {
        assert!(ReqwestTransport::new(Duration::from_secs(30)).is_ok());
    }
}
