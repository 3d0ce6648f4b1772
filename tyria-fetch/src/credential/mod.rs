//! The session credential.
//!
//! [`CredentialStore`] owns the one API key live in a session. The request
//! middleware reads it, the user sets and clears it, and it survives restarts
//! through a [`CredentialBackend`] after passing through a swappable
//! [`CredentialCodec`].
//!
//! Persistence is best-effort: a backend failure is logged and the in-memory
//! credential stays usable for the current session.

mod backend;
mod codec;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::error::{CredentialError, FetchError};

pub use backend::{CredentialBackend, MemoryBackend};
pub use codec::{Base64Codec, CredentialCodec, CredentialEncoding, PlainCodec};

/// Consecutive authentication failures after which the credential is dropped.
pub const DEFAULT_AUTH_FAILURE_THRESHOLD: u32 = 3;

// ============================================================================
// Credential
// ============================================================================

/// A normalized, non-empty access token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Normalizes `raw` and returns a credential if anything is left.
    ///
    /// Normalization drops every whitespace character, so `"  abc 123 "`
    /// becomes `"abc123"`.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = Self::normalize(raw);
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    /// Strips leading, trailing and internal whitespace.
    pub fn normalize(raw: &str) -> String {
        raw.chars().filter(|c| !c.is_whitespace()).collect()
    }

    /// Returns the raw token for transmission.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(4).collect();
        write!(f, "Credential({prefix}…)")
    }
}

// ============================================================================
// Credential Store
// ============================================================================

/// Owns the session credential and its persisted copy.
pub struct CredentialStore {
    current: RwLock<Option<Credential>>,
    backend: Arc<dyn CredentialBackend>,
    codec: Arc<dyn CredentialCodec>,
    auth_failures: AtomicU32,
    auto_clear_after: Option<u32>,
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("backend", &self.backend.name())
            .field("codec", &self.codec.name())
            .field("auto_clear_after", &self.auto_clear_after)
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    /// Creates an empty store persisting through `backend` with `codec`.
    pub fn new(backend: Arc<dyn CredentialBackend>, codec: Arc<dyn CredentialCodec>) -> Self {
        Self {
            current: RwLock::new(None),
            backend,
            codec,
            auth_failures: AtomicU32::new(0),
            auto_clear_after: Some(DEFAULT_AUTH_FAILURE_THRESHOLD),
        }
    }

    /// Creates a store that persists nothing beyond the process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()), Arc::new(Base64Codec))
    }

    /// Sets how many consecutive authentication failures clear the
    /// credential. `None` disables auto-clear.
    #[must_use]
    pub fn with_auto_clear(mut self, threshold: Option<u32>) -> Self {
        self.auto_clear_after = threshold.filter(|n| *n > 0);
        self
    }

    /// Sets the credential and persists it.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidInput`] if `raw` is empty or only
    /// whitespace. Persistence failures are logged, not returned.
    #[instrument(skip(self, raw), fields(backend = self.backend.name()))]
    pub async fn set(&self, raw: &str) -> Result<(), FetchError> {
        let credential = self.set_session(raw).await?;

        let encoded = self.codec.encode(credential.expose());
        match self.backend.save(&encoded).await {
            Ok(()) => debug!("Credential persisted"),
            Err(e) => warn!(error = %e, "Failed to persist credential, keeping it for this session"),
        }

        Ok(())
    }

    /// Sets the credential for this session only, without touching the
    /// persisted copy.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidInput`] if `raw` is empty or only
    /// whitespace.
    pub async fn set_session(&self, raw: &str) -> Result<Credential, FetchError> {
        let credential = Credential::parse(raw)
            .ok_or_else(|| FetchError::InvalidInput("API key is empty".to_string()))?;

        *self.current.write().await = Some(credential.clone());
        self.auth_failures.store(0, Ordering::SeqCst);
        info!("Credential set");
        Ok(credential)
    }

    /// Clears the credential in memory and in storage.
    ///
    /// The in-memory value is always cleared, even if removing the
    /// persisted value fails.
    #[instrument(skip(self), fields(backend = self.backend.name()))]
    pub async fn clear(&self) {
        self.current.write().await.take();
        self.auth_failures.store(0, Ordering::SeqCst);

        if let Err(e) = self.backend.remove().await {
            warn!(error = %e, "Failed to remove persisted credential");
        }
        info!("Credential cleared");
    }

    /// Returns true if a non-empty credential is set.
    pub async fn is_valid(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Returns the current credential.
    pub async fn current(&self) -> Option<Credential> {
        self.current.read().await.clone()
    }

    /// Loads the persisted credential, if any.
    ///
    /// Returns whether a credential was restored. A persisted value that
    /// cannot be decoded is removed so that no token in an unknown state
    /// is ever used.
    #[instrument(skip(self), fields(backend = self.backend.name(), codec = self.codec.name()))]
    pub async fn restore(&self) -> bool {
        let encoded = match self.backend.load().await {
            Ok(Some(encoded)) => encoded,
            Ok(None) => {
                debug!("No persisted credential");
                return false;
            }
            Err(CredentialError::Decode(reason)) => {
                warn!(%reason, "Persisted credential is unreadable, removing it");
                self.discard_persisted().await;
                return false;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted credential");
                return false;
            }
        };

        let restored = match self.codec.decode(&encoded) {
            Ok(decoded) => Credential::parse(&decoded),
            Err(e) => {
                warn!(error = %e, "Persisted credential is corrupted");
                None
            }
        };

        let Some(credential) = restored else {
            self.discard_persisted().await;
            return false;
        };

        *self.current.write().await = Some(credential);
        self.auth_failures.store(0, Ordering::SeqCst);
        info!("Credential restored");
        true
    }

    async fn discard_persisted(&self) {
        if let Err(e) = self.backend.remove().await {
            warn!(error = %e, "Failed to remove corrupted credential");
        }
    }

    /// Records an upstream authentication failure.
    ///
    /// Returns true if this failure reached the auto-clear threshold and the
    /// credential was cleared.
    pub async fn record_auth_failure(&self) -> bool {
        let failures = self.auth_failures.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(failures, "Authentication failure recorded");

        match self.auto_clear_after {
            Some(threshold) if failures >= threshold => {
                warn!(failures, "Credential rejected repeatedly, clearing it");
                self.clear().await;
                true
            }
            _ => false,
        }
    }

    /// Records a request the upstream accepted.
    pub fn record_auth_success(&self) {
        self.auth_failures.store(0, Ordering::SeqCst);
    }

    /// Returns the current count of consecutive authentication failures.
    pub fn auth_failures(&self) -> u32 {
        self.auth_failures.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FailingBackend;

    #[test]
    fn test_normalize() {
        assert_eq!(Credential::normalize("  abc 123 "), "abc123");
        assert_eq!(Credential::normalize("a\tb\nc"), "abc");
        assert!(Credential::parse(" \t\n ").is_none());
        assert!(Credential::parse("").is_none());
    }

    #[test]
    fn test_debug_is_redacted() {
        let credential = Credential::parse("ABCDEFGH-1234").unwrap();
        let debug = format!("{credential:?}");
        assert!(debug.contains("ABCD"));
        assert!(!debug.contains("1234"));
    }

    #[tokio::test]
    async fn test_set_rejects_blank() {
        let store = CredentialStore::in_memory();
        assert!(matches!(store.set("   ").await, Err(FetchError::InvalidInput(_))));
        assert!(matches!(store.set("").await, Err(FetchError::InvalidInput(_))));
        assert!(!store.is_valid().await);
    }

    #[tokio::test]
    async fn test_round_trip_through_persistence() {
        let backend = Arc::new(MemoryBackend::new());

        let store = CredentialStore::new(backend.clone(), Arc::new(Base64Codec));
        store.set("  abc 123 ").await.unwrap();
        assert_eq!(backend.stored().await.as_deref(), Some("YWJjMTIz"));

        let fresh = CredentialStore::new(backend, Arc::new(Base64Codec));
        assert!(!fresh.is_valid().await);
        assert!(fresh.restore().await);
        assert!(fresh.is_valid().await);
        assert_eq!(fresh.current().await.unwrap().expose(), "abc123");
    }

    #[tokio::test]
    async fn test_plain_persistence() {
        let backend = Arc::new(MemoryBackend::new());
        let store = CredentialStore::new(backend.clone(), Arc::new(PlainCodec));
        store.set("abc 123").await.unwrap();
        assert_eq!(backend.stored().await.as_deref(), Some("abc123"));

        let fresh = CredentialStore::new(backend, Arc::new(PlainCodec));
        assert!(fresh.restore().await);
        assert_eq!(fresh.current().await.unwrap().expose(), "abc123");
    }

    #[tokio::test]
    async fn test_restore_nothing_persisted() {
        let store = CredentialStore::in_memory();
        assert!(!store.restore().await);
        assert!(!store.is_valid().await);
    }

    #[tokio::test]
    async fn test_restore_clears_corrupted_value() {
        let backend = Arc::new(MemoryBackend::with_value("%%% not base64 %%%"));
        let store = CredentialStore::new(backend.clone(), Arc::new(Base64Codec));

        assert!(!store.restore().await);
        assert!(!store.is_valid().await);
        assert_eq!(backend.stored().await, None);
    }

    /// Backend holding a value it cannot read back.
    #[derive(Default)]
    struct UnreadableBackend {
        removed: AtomicU32,
    }

    #[async_trait::async_trait]
    impl CredentialBackend for UnreadableBackend {
        fn name(&self) -> &'static str {
            "unreadable"
        }

        async fn load(&self) -> Result<Option<String>, CredentialError> {
            Err(CredentialError::Decode("not valid UTF-8".to_string()))
        }

        async fn save(&self, _encoded: &str) -> Result<(), CredentialError> {
            Ok(())
        }

        async fn remove(&self) -> Result<(), CredentialError> {
            self.removed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_restore_removes_unreadable_value() {
        let backend = Arc::new(UnreadableBackend::default());
        let store = CredentialStore::new(backend.clone(), Arc::new(Base64Codec));

        assert!(!store.restore().await);
        assert!(!store.is_valid().await);
        assert_eq!(backend.removed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_restore_keeps_value_on_read_failure() {
        // A backend that is merely unavailable must not lose the value.
        let store = CredentialStore::new(Arc::new(FailingBackend), Arc::new(Base64Codec));
        assert!(!store.restore().await);
    }

    #[tokio::test]
    async fn test_restore_clears_blank_value() {
        // "   " encoded: decodes fine but normalizes to nothing.
        let backend = Arc::new(MemoryBackend::with_value("ICAg"));
        let store = CredentialStore::new(backend.clone(), Arc::new(Base64Codec));

        assert!(!store.restore().await);
        assert_eq!(backend.stored().await, None);
    }

    #[tokio::test]
    async fn test_clear_removes_both() {
        let backend = Arc::new(MemoryBackend::new());
        let store = CredentialStore::new(backend.clone(), Arc::new(Base64Codec));
        store.set("abc").await.unwrap();

        store.clear().await;
        assert!(!store.is_valid().await);
        assert_eq!(backend.stored().await, None);
    }

    #[tokio::test]
    async fn test_persistence_failure_is_not_fatal() {
        let store = CredentialStore::new(Arc::new(FailingBackend), Arc::new(Base64Codec));

        store.set("abc123").await.unwrap();
        assert!(store.is_valid().await);

        store.clear().await;
        assert!(!store.is_valid().await);

        assert!(!store.restore().await);
    }

    #[tokio::test]
    async fn test_auto_clear_after_threshold() {
        let store = CredentialStore::in_memory().with_auto_clear(Some(2));
        store.set("abc").await.unwrap();

        assert!(!store.record_auth_failure().await);
        assert!(store.is_valid().await);
        assert!(store.record_auth_failure().await);
        assert!(!store.is_valid().await);
        assert_eq!(store.auth_failures(), 0);
    }

    #[tokio::test]
    async fn test_success_resets_failure_count() {
        let store = CredentialStore::in_memory().with_auto_clear(Some(2));
        store.set("abc").await.unwrap();

        store.record_auth_failure().await;
        store.record_auth_success();
        assert!(!store.record_auth_failure().await);
        assert!(store.is_valid().await);
    }

    #[tokio::test]
    async fn test_auto_clear_disabled() {
        let store = CredentialStore::in_memory().with_auto_clear(None);
        store.set("abc").await.unwrap();

        for _ in 0..10 {
            assert!(!store.record_auth_failure().await);
        }
        assert!(store.is_valid().await);
    }
}
