//! Session wiring.
//!
//! A [`Session`] owns one instance of every service and hands out shared
//! handles to them. Nothing in the crate is a global: two sessions never
//! share a credential, a cache or a client.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::api::ApiClient;
use crate::batch::{BatchFetcher, DEFAULT_CHUNK_SIZE};
use crate::cache::EntityCache;
use crate::credential::{
    CredentialBackend, CredentialEncoding, CredentialStore, DEFAULT_AUTH_FAILURE_THRESHOLD,
};
use crate::error::FetchError;
use crate::host::keychain::KeychainBackend;
use crate::host::transport::{ReqwestTransport, Transport};
use crate::http::{ApiBase, DEFAULT_TIMEOUT_SECS, HttpClient};
use crate::middleware::AuthStrategy;
use crate::service::ItemDetailsService;

// ============================================================================
// Session Settings
// ============================================================================

/// Tunables of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Network origin.
    pub base: ApiBase,
    /// Per-request timeout.
    pub timeout: Duration,
    /// How the credential travels with a request.
    pub auth_strategy: AuthStrategy,
    /// How the credential is encoded at rest.
    pub credential_encoding: CredentialEncoding,
    /// Ids per `/v2/items` request.
    pub chunk_size: usize,
    /// Chunk requests allowed in flight at once.
    pub max_concurrent_chunks: usize,
    /// Consecutive authentication failures that clear the credential.
    /// `None` keeps the credential regardless.
    pub auth_failure_threshold: Option<u32>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            base: ApiBase::Direct,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            auth_strategy: AuthStrategy::default(),
            credential_encoding: CredentialEncoding::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_concurrent_chunks: 1,
            auth_failure_threshold: Some(DEFAULT_AUTH_FAILURE_THRESHOLD),
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// Every service of one user session.
pub struct Session {
    /// The session credential.
    pub credentials: Arc<CredentialStore>,
    /// The shared HTTP client.
    pub http: Arc<HttpClient>,
    /// Chunked item retrieval.
    pub fetcher: Arc<BatchFetcher>,
    /// The item cache.
    pub cache: Arc<EntityCache>,
    /// Cache-first item lookup.
    pub details: Arc<ItemDetailsService>,
    /// Typed endpoints.
    pub api: Arc<ApiClient>,
    /// Settings the session was built with.
    pub settings: SessionSettings,
}

impl Session {
    /// Creates a builder for a session.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Loads the persisted credential, if any. See
    /// [`CredentialStore::restore`].
    pub async fn restore_credential(&self) -> bool {
        self.credentials.restore().await
    }

    /// Returns true if requests go out with a credential.
    pub async fn is_authenticated(&self) -> bool {
        self.credentials.is_valid().await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("settings", &self.settings)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Session Builder
// ============================================================================

/// Builder for constructing a [`Session`].
///
/// Without an explicit transport the session talks to the network through
/// [`ReqwestTransport`]; without an explicit backend the credential is kept
/// in the system keychain.
pub struct SessionBuilder {
    transport: Option<Arc<dyn Transport>>,
    backend: Option<Arc<dyn CredentialBackend>>,
    settings: SessionSettings,
}

impl SessionBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            transport: None,
            backend: None,
            settings: SessionSettings::default(),
        }
    }

    /// Sets the network transport.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets where the credential is persisted.
    #[must_use]
    pub fn credential_backend(mut self, backend: Arc<dyn CredentialBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Replaces all settings.
    #[must_use]
    pub fn settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the network origin.
    #[must_use]
    pub fn base(mut self, base: ApiBase) -> Self {
        self.settings.base = base;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = timeout;
        self
    }

    /// Sets how the credential travels with a request.
    #[must_use]
    pub fn auth_strategy(mut self, strategy: AuthStrategy) -> Self {
        self.settings.auth_strategy = strategy;
        self
    }

    /// Sets how the credential is encoded at rest.
    #[must_use]
    pub fn credential_encoding(mut self, encoding: CredentialEncoding) -> Self {
        self.settings.credential_encoding = encoding;
        self
    }

    /// Sets the number of ids per item request.
    #[must_use]
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.settings.chunk_size = chunk_size;
        self
    }

    /// Sets how many chunk requests may be in flight at once.
    #[must_use]
    pub fn max_concurrent_chunks(mut self, limit: usize) -> Self {
        self.settings.max_concurrent_chunks = limit;
        self
    }

    /// Sets the auto-clear threshold. `None` disables auto-clear.
    #[must_use]
    pub fn auth_failure_threshold(mut self, threshold: Option<u32>) -> Self {
        self.settings.auth_failure_threshold = threshold;
        self
    }

    /// Builds the session.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidInput`] if the chunk size or timeout is
    /// zero, or an error if the default transport cannot be created.
    pub fn build(self) -> Result<Session, FetchError> {
        let settings = self.settings;
        if settings.chunk_size == 0 {
            return Err(FetchError::InvalidInput(
                "Chunk size must be at least 1".to_string(),
            ));
        }
        if settings.timeout.is_zero() {
            return Err(FetchError::InvalidInput(
                "Timeout must be greater than zero".to_string(),
            ));
        }

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(settings.timeout)?),
        };
        let backend = self
            .backend
            .unwrap_or_else(|| Arc::new(KeychainBackend::default()));

        let credentials = Arc::new(
            CredentialStore::new(backend, settings.credential_encoding.codec())
                .with_auto_clear(settings.auth_failure_threshold),
        );

        let http = Arc::new(
            HttpClient::builder(transport)
                .base(settings.base.clone())
                .timeout(settings.timeout)
                .with_credentials(credentials.clone(), settings.auth_strategy)
                .build(),
        );

        let fetcher = Arc::new(
            BatchFetcher::new(http.clone())
                .with_max_concurrent_chunks(settings.max_concurrent_chunks),
        );
        let cache = Arc::new(EntityCache::new());
        let details = Arc::new(
            ItemDetailsService::new(fetcher.clone(), cache.clone())
                .with_chunk_size(settings.chunk_size),
        );
        let api = Arc::new(ApiClient::new(http.clone(), fetcher.clone()));

        debug!(?credentials, "Credential store ready");
        info!(
            base = %settings.base,
            auth = %settings.auth_strategy,
            chunk_size = settings.chunk_size,
            "Session ready"
        );

        Ok(Session {
            credentials,
            http,
            fetcher,
            cache,
            details,
            api,
            settings,
        })
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::MemoryBackend;
    use crate::testing::{ScriptedTransport, sample_items};
    use tyria_core::ItemId;

    fn session(transport: &Arc<ScriptedTransport>) -> SessionBuilder {
        Session::builder()
            .transport(transport.clone())
            .credential_backend(Arc::new(MemoryBackend::new()))
    }

    #[test]
    fn test_default_settings() {
        let settings = SessionSettings::default();
        assert_eq!(settings.base, ApiBase::Direct);
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.auth_strategy, AuthStrategy::BearerHeader);
        assert_eq!(settings.credential_encoding, CredentialEncoding::Base64);
        assert_eq!(settings.chunk_size, 200);
        assert_eq!(settings.max_concurrent_chunks, 1);
        assert_eq!(settings.auth_failure_threshold, Some(3));
    }

    #[test]
    fn test_builder_rejects_invalid_settings() {
        let transport = Arc::new(ScriptedTransport::new());
        assert!(matches!(
            session(&transport).chunk_size(0).build(),
            Err(FetchError::InvalidInput(_))
        ));
        assert!(matches!(
            session(&transport).timeout(Duration::ZERO).build(),
            Err(FetchError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_services_share_one_credential() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(200, "[]")
                .respond(200, "[]"),
        );
        let session = session(&transport)
            .auth_strategy(AuthStrategy::QueryParameter)
            .build()
            .unwrap();

        session.api.get_bank().await.unwrap();
        session.credentials.set("abc123").await.unwrap();
        session.api.get_bank().await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].query("access_token"), None);
        assert_eq!(requests[1].query("access_token").as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn test_details_use_configured_chunk_size() {
        let transport = Arc::new(ScriptedTransport::catalog(sample_items(1, 5)));
        let session = session(&transport).chunk_size(2).build().unwrap();

        let ids: Vec<ItemId> = (1..=5).map(ItemId).collect();
        let items = session.details.fetch_details(&ids).await;

        assert_eq!(items.len(), 5);
        assert_eq!(transport.request_count(), 3);
        assert_eq!(session.cache.len(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_details_fan_out_chunks() {
        let transport = Arc::new(ScriptedTransport::catalog(sample_items(1, 9)));
        let session = session(&transport)
            .chunk_size(2)
            .max_concurrent_chunks(3)
            .build()
            .unwrap();

        let ids: Vec<ItemId> = (1..=9).rev().map(ItemId).collect();
        let items = session.details.fetch_details(&ids).await;

        let returned: Vec<ItemId> = items.iter().map(|item| item.id).collect();
        assert_eq!(returned, ids);
        assert_eq!(transport.request_count(), 5);
        assert_eq!(session.cache.len(), 9);

        // Served from the cache the second time.
        assert_eq!(session.details.fetch_details(&ids).await.len(), 9);
        assert_eq!(transport.request_count(), 5);
    }

    #[tokio::test]
    async fn test_relay_base() {
        let transport = Arc::new(ScriptedTransport::new().respond(200, r#"["Zojja"]"#));
        let session = session(&transport)
            .base(ApiBase::relay("http://localhost:5173/api/gw2").unwrap())
            .build()
            .unwrap();

        session.api.get_characters().await.unwrap();
        assert_eq!(
            transport.requests()[0].url.as_str(),
            "http://localhost:5173/api/gw2/v2/characters"
        );
    }
}
