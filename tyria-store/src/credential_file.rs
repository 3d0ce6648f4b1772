//! File-backed credential persistence.
//!
//! For systems without a usable keychain. The encoded credential is kept in
//! a small JSON document next to the settings, readable by the owner only.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use tyria_fetch::{CredentialBackend, CredentialError};

use crate::error::StoreError;
use crate::persistence::{load_json, remove_file, save_json};

/// On-disk form of the credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCredential {
    /// Encoded credential, as produced by the session's codec.
    credential: String,
    saved_at: DateTime<Utc>,
}

/// [`CredentialBackend`] storing the encoded credential in a JSON file.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    /// Creates a backend persisting to `path`.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl From<StoreError> for CredentialError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Io(e) => CredentialError::Io(e),
            StoreError::Serialization(e) => CredentialError::Serialization(e),
            StoreError::Config(msg) => CredentialError::Backend(msg),
        }
    }
}

#[async_trait]
impl CredentialBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn load(&self) -> Result<Option<String>, CredentialError> {
        match load_json::<StoredCredential>(&self.path).await {
            Ok(stored) if stored.credential.trim().is_empty() => Ok(None),
            Ok(stored) => {
                debug!(saved_at = %stored.saved_at, "Loaded credential file");
                Ok(Some(stored.credential))
            }
            Err(e) if e.is_not_found() => Ok(None),
            // Malformed JSON: the stored value can never be read back.
            Err(StoreError::Serialization(e)) => Err(CredentialError::Decode(e.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, encoded: &str) -> Result<(), CredentialError> {
        let stored = StoredCredential {
            credential: encoded.to_string(),
            saved_at: Utc::now(),
        };
        save_json(&self.path, &stored).await?;
        Ok(())
    }

    async fn remove(&self) -> Result<(), CredentialError> {
        remove_file(&self.path).await?;
        Ok(())
    }
}
