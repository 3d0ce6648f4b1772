//! Request and response stages of the HTTP client.
//!
//! The client runs an explicit, ordered pipeline composed at construction:
//!
//! 1. Every [`RequestMiddleware`] in order, each free to edit the request
//!    (the default one injects the credential).
//! 2. The transport call.
//! 3. [`classify`], a pure mapping from the transport outcome to the error
//!    taxonomy.
//! 4. Every [`ResponseObserver`] in order, for side effects only (logging,
//!    counting authentication failures). Observers cannot change the
//!    outcome; the classified error is always handed back to the caller.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::credential::{Credential, CredentialStore};
use crate::error::{FetchError, TransportError};
use crate::host::transport::TransportResponse;
use crate::http::ApiRequest;

/// Query parameter used by [`AuthStrategy::QueryParameter`].
pub const ACCESS_TOKEN_PARAM: &str = "access_token";

/// Longest upstream body quoted in an error message.
const MAX_ERROR_BODY: usize = 200;

// ============================================================================
// Auth Strategy
// ============================================================================

/// How the credential travels with a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStrategy {
    /// `Authorization: Bearer <token>`.
    #[default]
    BearerHeader,
    /// `?access_token=<token>`.
    QueryParameter,
}

impl AuthStrategy {
    /// Attaches `credential` to `request`.
    pub fn apply(self, request: &mut ApiRequest, credential: &Credential) {
        match self {
            AuthStrategy::BearerHeader => request.headers.push((
                "Authorization".to_string(),
                format!("Bearer {}", credential.expose()),
            )),
            AuthStrategy::QueryParameter => request
                .query
                .push((ACCESS_TOKEN_PARAM.to_string(), credential.expose().to_string())),
        }
        request.authenticated = true;
    }
}

impl fmt::Display for AuthStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthStrategy::BearerHeader => write!(f, "bearer_header"),
            AuthStrategy::QueryParameter => write!(f, "query_parameter"),
        }
    }
}

// ============================================================================
// Request Stage
// ============================================================================

/// A request transformer run before the transport call.
#[async_trait]
pub trait RequestMiddleware: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Edits the outgoing request.
    ///
    /// # Errors
    ///
    /// An error aborts the request before it reaches the network.
    async fn on_request(&self, request: &mut ApiRequest) -> Result<(), FetchError>;
}

/// Attaches the session credential, if one is set.
///
/// Without a valid credential the request goes out unauthenticated, so
/// public endpoints keep working.
pub struct CredentialInjector {
    store: Arc<CredentialStore>,
    strategy: AuthStrategy,
}

impl CredentialInjector {
    /// Creates an injector reading from `store`.
    pub fn new(store: Arc<CredentialStore>, strategy: AuthStrategy) -> Self {
        Self { store, strategy }
    }
}

#[async_trait]
impl RequestMiddleware for CredentialInjector {
    fn name(&self) -> &'static str {
        "credential_injector"
    }

    async fn on_request(&self, request: &mut ApiRequest) -> Result<(), FetchError> {
        match self.store.current().await {
            Some(credential) => self.strategy.apply(request, &credential),
            None => debug!(path = %request.path(), "No API key set, sending unauthenticated request"),
        }
        Ok(())
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Upstream error body, e.g. `{"text": "Invalid access token"}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    text: String,
}

/// Extracts a readable message from an error body.
fn upstream_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.text;
    }
    body.trim().chars().take(MAX_ERROR_BODY).collect()
}

/// Maps a transport outcome onto the error taxonomy.
///
/// - 2xx passes through
/// - 401 becomes [`FetchError::AuthenticationFailed`]
/// - 403 becomes [`FetchError::AuthorizationDenied`]
/// - a transport failure becomes [`FetchError::NetworkUnavailable`]
/// - any other status becomes [`FetchError::UpstreamError`] with the status kept
///
/// # Errors
///
/// Returns the classified error for every non-success outcome.
pub fn classify(
    outcome: Result<TransportResponse, TransportError>,
) -> Result<TransportResponse, FetchError> {
    let response = outcome?;
    if response.is_success() {
        return Ok(response);
    }

    let message = upstream_message(&response.body);
    Err(match response.status {
        401 => FetchError::AuthenticationFailed(if message.is_empty() {
            "Invalid or expired API key".to_string()
        } else {
            message
        }),
        403 => FetchError::AuthorizationDenied(if message.is_empty() {
            "API key lacks the permission for this resource".to_string()
        } else {
            message
        }),
        status => FetchError::UpstreamError { status, message },
    })
}

// ============================================================================
// Response Stage
// ============================================================================

/// Side-effect hook run on every classified outcome.
#[async_trait]
pub trait ResponseObserver: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Observes an outcome.
    async fn on_response(&self, request: &ApiRequest, outcome: &Result<TransportResponse, FetchError>);
}

/// Logs classified failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorLogger;

#[async_trait]
impl ResponseObserver for ErrorLogger {
    fn name(&self) -> &'static str {
        "error_logger"
    }

    async fn on_response(&self, request: &ApiRequest, outcome: &Result<TransportResponse, FetchError>) {
        let path = request.path();
        match outcome {
            Ok(response) => debug!(path = %path, status = response.status, "Request succeeded"),
            Err(FetchError::AuthenticationFailed(msg)) => {
                error!(path = %path, reason = %msg, "API key invalid or expired");
            }
            Err(FetchError::AuthorizationDenied(msg)) => {
                warn!(path = %path, reason = %msg, "API key lacks permission for this resource");
            }
            Err(FetchError::NetworkUnavailable(msg)) => {
                warn!(path = %path, reason = %msg, "Network unavailable");
            }
            Err(e) => warn!(path = %path, status = ?e.status(), error = %e, "Request failed"),
        }
    }
}

/// Feeds authentication outcomes back to the credential store so that a
/// repeatedly rejected credential is cleared.
pub struct AuthFailureTracker {
    store: Arc<CredentialStore>,
}

impl AuthFailureTracker {
    /// Creates a tracker reporting to `store`.
    pub fn new(store: Arc<CredentialStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ResponseObserver for AuthFailureTracker {
    fn name(&self) -> &'static str {
        "auth_failure_tracker"
    }

    async fn on_response(&self, request: &ApiRequest, outcome: &Result<TransportResponse, FetchError>) {
        if !request.authenticated {
            return;
        }
        match outcome {
            Ok(_) => self.store.record_auth_success(),
            Err(FetchError::AuthenticationFailed(_)) => {
                self.store.record_auth_failure().await;
            }
            Err(_) => {}
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
