//! Durable storage for the encoded credential.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::CredentialError;

/// One durable slot holding the encoded credential.
///
/// Absence of a value means "no remembered session".
#[async_trait]
pub trait CredentialBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Reads the persisted value.
    ///
    /// # Returns
    /// * `Ok(Some(encoded))` - A value is stored
    /// * `Ok(None)` - Nothing stored
    /// * `Err(e)` - The storage could not be read
    async fn load(&self) -> Result<Option<String>, CredentialError>;

    /// Replaces the persisted value.
    async fn save(&self, encoded: &str) -> Result<(), CredentialError>;

    /// Removes the persisted value. Succeeds if nothing was stored.
    async fn remove(&self) -> Result<(), CredentialError>;
}

/// Backend that only lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    slot: Mutex<Option<String>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend that already holds `encoded`.
    pub fn with_value(encoded: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(encoded.into())),
        }
    }

    /// Returns the stored value.
    pub async fn stored(&self) -> Option<String> {
        self.slot.lock().await.clone()
    }
}

#[async_trait]
impl CredentialBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self) -> Result<Option<String>, CredentialError> {
        Ok(self.slot.lock().await.clone())
    }

    async fn save(&self, encoded: &str) -> Result<(), CredentialError> {
        *self.slot.lock().await = Some(encoded.to_string());
        Ok(())
    }

    async fn remove(&self) -> Result<(), CredentialError> {
        self.slot.lock().await.take();
        Ok(())
    }
}
