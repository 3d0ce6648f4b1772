//! Credential storage in the system keychain.
//!
//! This module provides access to the system's secure credential storage:
//! - macOS: Keychain Services
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring, KDE Wallet)

use async_trait::async_trait;
use keyring::Entry;
use tracing::{debug, warn};

use crate::credential::CredentialBackend;
use crate::error::CredentialError;

/// Keychain service name for Tyria credentials.
pub const SERVICE: &str = "tyria";

/// Keychain account holding the API key.
pub const API_KEY_ACCOUNT: &str = "api_key";

/// [`CredentialBackend`] backed by the system keychain.
///
/// This uses the `keyring` crate which provides cross-platform access to:
/// - macOS Keychain Services
/// - Windows Credential Manager
/// - Linux Secret Service API
#[derive(Debug, Clone)]
pub struct KeychainBackend {
    service: String,
    account: String,
}

impl KeychainBackend {
    /// Creates a backend using the default service and account.
    pub fn new() -> Self {
        Self::with_account(SERVICE, API_KEY_ACCOUNT)
    }

    /// Creates a backend for a specific service/account pair.
    pub fn with_account(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    /// Creates a keyring entry.
    fn entry(&self) -> Result<Entry, CredentialError> {
        Entry::new(&self.service, &self.account).map_err(CredentialError::from)
    }
}

impl Default for KeychainBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialBackend for KeychainBackend {
    fn name(&self) -> &'static str {
        "keychain"
    }

    async fn load(&self) -> Result<Option<String>, CredentialError> {
        debug!(service = %self.service, account = %self.account, "Reading credential from keychain");

        match self.entry()?.get_password() {
            Ok(secret) if !secret.is_empty() => Ok(Some(secret)),
            // Empty password or no entry both mean "not found"
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => {
                warn!(service = %self.service, error = %e, "Failed to read credential");
                Err(e.into())
            }
        }
    }

    async fn save(&self, encoded: &str) -> Result<(), CredentialError> {
        self.entry()?.set_password(encoded).map_err(|e| {
            warn!(service = %self.service, error = %e, "Failed to store credential");
            CredentialError::from(e)
        })?;

        debug!(service = %self.service, account = %self.account, "Credential stored in keychain");
        Ok(())
    }

    async fn remove(&self) -> Result<(), CredentialError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                debug!(service = %self.service, account = %self.account, "Credential removed from keychain");
                Ok(())
            }
            Err(e) => {
                warn!(service = %self.service, error = %e, "Failed to delete credential");
                Err(e.into())
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
