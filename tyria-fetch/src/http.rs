//! The shared, configured HTTP client.
//!
//! Every upstream call goes through one [`HttpClient`]. It owns the base
//! endpoint, the per-request timeout, and the middleware pipeline described
//! in [`crate::middleware`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::credential::CredentialStore;
use crate::error::{FetchError, TransportError};
use crate::host::transport::{Transport, TransportRequest, TransportResponse};
use crate::middleware::{
    AuthFailureTracker, AuthStrategy, CredentialInjector, ErrorLogger, RequestMiddleware,
    ResponseObserver, classify,
};

/// Upstream host used when no relay is configured.
pub const DIRECT_ORIGIN: &str = "https://api.guildwars2.com";

/// Versioned base every logical path lives under.
pub const API_VERSION: &str = "v2";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// API Base
// ============================================================================

/// Network origin for upstream calls.
///
/// Switching between the two never changes a logical path, only the prefix:
/// `/v2/items` is `https://api.guildwars2.com/v2/items` directly, or
/// `http://localhost:5173/api/gw2/v2/items` through a relay mounted at
/// `/api/gw2`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ApiBase {
    /// The upstream host.
    #[default]
    Direct,
    /// A same-origin relay prefix.
    Relay(String),
}

impl ApiBase {
    /// Creates a relay base, validating the URL.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if `url` is not an absolute
    /// http(s) URL.
    pub fn relay(url: &str) -> Result<Self, FetchError> {
        let parsed = Url::parse(url.trim())?;
        if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(format!("Not an http(s) base URL: {url}")));
        }
        Ok(ApiBase::Relay(parsed.to_string()))
    }

    /// Returns the origin prefix.
    pub fn origin(&self) -> &str {
        match self {
            ApiBase::Direct => DIRECT_ORIGIN,
            ApiBase::Relay(url) => url,
        }
    }

    /// Returns true for a relay base.
    pub fn is_relay(&self) -> bool {
        matches!(self, ApiBase::Relay(_))
    }

    /// Builds the absolute URL for `request`.
    ///
    /// Path segments are percent-encoded, so a character name such as
    /// `"Zojja Ünd"` is safe to pass through unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if the origin cannot carry a path.
    pub fn url_for(&self, request: &ApiRequest) -> Result<Url, FetchError> {
        let mut url = Url::parse(self.origin())?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| FetchError::InvalidUrl(format!("{} cannot be a base", self.origin())))?;
            segments.pop_if_empty();
            segments.push(API_VERSION);
            segments.extend(request.segments.iter());
        }
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }
        Ok(url)
    }
}

impl fmt::Display for ApiBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiBase::Direct => write!(f, "direct ({DIRECT_ORIGIN})"),
            ApiBase::Relay(url) => write!(f, "relay ({url})"),
        }
    }
}

// ============================================================================
// API Request
// ============================================================================

/// A logical request, relative to the versioned base.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiRequest {
    /// Unencoded path segments, e.g. `["characters", "Zojja", "inventory"]`.
    pub segments: Vec<String>,
    /// Query parameters.
    pub query: Vec<(String, String)>,
    /// Extra headers.
    pub headers: Vec<(String, String)>,
    /// Set by the credential middleware when a credential was attached.
    pub authenticated: bool,
}

impl ApiRequest {
    /// Creates a request for the given path segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Logical path for logs, e.g. `/items`.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client with an explicit middleware pipeline.
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    base: ApiBase,
    timeout: Duration,
    request_stages: Vec<Arc<dyn RequestMiddleware>>,
    observers: Vec<Arc<dyn ResponseObserver>>,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base", &self.base)
            .field("timeout", &self.timeout)
            .field(
                "request_stages",
                &self.request_stages.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field(
                "observers",
                &self.observers.iter().map(|o| o.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Starts building a client over `transport`.
    pub fn builder(transport: Arc<dyn Transport>) -> HttpClientBuilder {
        HttpClientBuilder::new(transport)
    }

    /// Returns the configured base.
    pub fn base(&self) -> &ApiBase {
        &self.base
    }

    /// Returns the per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `request` through the pipeline and returns the raw response.
    ///
    /// # Errors
    ///
    /// Returns the classified error of a failed exchange, or the error of a
    /// request stage that refused the request.
    #[instrument(skip(self, request), fields(path = %request.path()))]
    pub async fn send(&self, mut request: ApiRequest) -> Result<TransportResponse, FetchError> {
        for stage in &self.request_stages {
            stage.on_request(&mut request).await?;
        }

        let url = self.base.url_for(&request)?;
        debug!(authenticated = request.authenticated, "GET request");

        let wire = TransportRequest {
            url,
            headers: request.headers.clone(),
        };
        let outcome = tokio::time::timeout(self.timeout, self.transport.get(wire))
            .await
            .unwrap_or(Err(TransportError::Timeout));

        let classified = classify(outcome);
        for observer in &self.observers {
            observer.on_response(&request, &classified).await;
        }
        classified
    }

    /// Runs `request` through the pipeline and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// Returns the classified error of a failed exchange, or
    /// [`FetchError::InvalidResponse`] if the body is not the expected JSON.
    pub async fn get_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, FetchError> {
        let response = self.send(request).await?;
        serde_json::from_str(&response.body)
            .map_err(|e| FetchError::InvalidResponse(format!("JSON error: {e}")))
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`HttpClient`]. Stages run in the order they are added.
pub struct HttpClientBuilder {
    transport: Arc<dyn Transport>,
    base: ApiBase,
    timeout: Duration,
    request_stages: Vec<Arc<dyn RequestMiddleware>>,
    observers: Vec<Arc<dyn ResponseObserver>>,
}

impl HttpClientBuilder {
    /// Creates a builder with no stages, the direct base and the default
    /// timeout.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            base: ApiBase::Direct,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            request_stages: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// Sets the base endpoint.
    #[must_use]
    pub fn base(mut self, base: ApiBase) -> Self {
        self.base = base;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Appends a request stage.
    #[must_use]
    pub fn request_stage(mut self, stage: Arc<dyn RequestMiddleware>) -> Self {
        self.request_stages.push(stage);
        self
    }

    /// Appends a response observer.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn ResponseObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Adds the standard pipeline: credential injection, error logging, and
    /// authentication failure tracking.
    #[must_use]
    pub fn with_credentials(self, store: Arc<CredentialStore>, strategy: AuthStrategy) -> Self {
        self.request_stage(Arc::new(CredentialInjector::new(store.clone(), strategy)))
            .observer(Arc::new(ErrorLogger))
            .observer(Arc::new(AuthFailureTracker::new(store)))
    }

    /// Builds the client.
    pub fn build(self) -> HttpClient {
        HttpClient {
            transport: self.transport,
            base: self.base,
            timeout: self.timeout,
            request_stages: self.request_stages,
            observers: self.observers,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
