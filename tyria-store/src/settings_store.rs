//! User preferences store.
//!
//! Settings describe how a session is built: which origin it talks to, how
//! the credential travels and where it is kept, and how item lookups are
//! chunked.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use tyria_fetch::{
    ApiBase, AuthStrategy, CredentialBackend, CredentialEncoding, DEFAULT_CHUNK_SIZE,
    KeychainBackend, MemoryBackend, Session, SessionBuilder, SessionSettings,
};

use crate::credential_file::FileBackend;
use crate::error::StoreError;
use crate::persistence::{default_credential_path, default_settings_path, load_json, save_json};

/// Environment variable holding an API key for the current run only.
pub const ENV_API_KEY: &str = "TYRIA_API_KEY";

/// Environment variable selecting a relay origin.
pub const ENV_RELAY_URL: &str = "TYRIA_RELAY_URL";

/// Keys accepted by [`Settings::set`].
pub const SETTING_KEYS: &[&str] = &[
    "endpoint",
    "relay_url",
    "auth_strategy",
    "credential_backend",
    "credential_encoding",
    "chunk_size",
    "max_concurrent_chunks",
    "timeout_secs",
    "auth_failure_threshold",
    "log_level",
];

// ============================================================================
// Settings Types
// ============================================================================

/// Which network origin requests go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EndpointMode {
    /// The upstream host.
    #[default]
    Direct,
    /// A same-origin relay at `relay_url`.
    Relay,
}

impl std::fmt::Display for EndpointMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointMode::Direct => write!(f, "direct"),
            EndpointMode::Relay => write!(f, "relay"),
        }
    }
}

/// Where the credential is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CredentialBackendKind {
    /// The system keychain.
    #[default]
    Keychain,
    /// A JSON file in the config directory.
    File,
    /// Nowhere: the credential lasts for one run.
    Memory,
}

impl CredentialBackendKind {
    /// Opens the backend, using `file_path` for [`CredentialBackendKind::File`].
    pub fn open(self, file_path: PathBuf) -> Arc<dyn CredentialBackend> {
        match self {
            CredentialBackendKind::Keychain => Arc::new(KeychainBackend::default()),
            CredentialBackendKind::File => Arc::new(FileBackend::new(file_path)),
            CredentialBackendKind::Memory => Arc::new(MemoryBackend::new()),
        }
    }
}

impl std::fmt::Display for CredentialBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialBackendKind::Keychain => write!(f, "keychain"),
            CredentialBackendKind::File => write!(f, "file"),
            CredentialBackendKind::Memory => write!(f, "memory"),
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Error level logging.
    Error,
    /// Warning level logging.
    #[default]
    Warn,
    /// Info level logging.
    Info,
    /// Debug level logging.
    Debug,
    /// Trace level logging.
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

/// User preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Direct or relayed origin.
    pub endpoint: EndpointMode,

    /// Relay origin, required when `endpoint` is `relay`.
    pub relay_url: Option<String>,

    /// How the credential travels with a request.
    pub auth_strategy: AuthStrategy,

    /// Where the credential is persisted.
    pub credential_backend: CredentialBackendKind,

    /// How the credential is encoded at rest.
    pub credential_encoding: CredentialEncoding,

    /// Ids per item request.
    pub chunk_size: usize,

    /// Item requests allowed in flight at once.
    pub max_concurrent_chunks: usize,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Consecutive authentication failures that clear the credential.
    /// `null` disables auto-clear.
    pub auth_failure_threshold: Option<u32>,

    /// Log level.
    pub log_level: LogLevel,
}

impl Default for Settings {
    fn default() -> Self {
        let session = SessionSettings::default();
        Self {
            endpoint: EndpointMode::Direct,
            relay_url: None,
            auth_strategy: session.auth_strategy,
            credential_backend: CredentialBackendKind::Keychain,
            credential_encoding: session.credential_encoding,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_concurrent_chunks: session.max_concurrent_chunks,
            timeout_secs: session.timeout.as_secs(),
            auth_failure_threshold: session.auth_failure_threshold,
            log_level: LogLevel::default(),
        }
    }
}

impl Settings {
    /// Checks the settings for values no session can run with.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.chunk_size == 0 {
            return Err(StoreError::Config("chunk_size must be at least 1".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(StoreError::Config("timeout_secs must be at least 1".to_string()));
        }
        if self.max_concurrent_chunks == 0 {
            return Err(StoreError::Config(
                "max_concurrent_chunks must be at least 1".to_string(),
            ));
        }
        self.api_base()?;
        Ok(())
    }

    /// Returns the network origin.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the relay is selected without a
    /// valid `relay_url`.
    pub fn api_base(&self) -> Result<ApiBase, StoreError> {
        match (self.endpoint, self.relay_url.as_deref()) {
            (EndpointMode::Direct, _) => Ok(ApiBase::Direct),
            (EndpointMode::Relay, Some(url)) => {
                ApiBase::relay(url).map_err(|e| StoreError::Config(format!("relay_url: {e}")))
            }
            (EndpointMode::Relay, None) => Err(StoreError::Config(
                "endpoint is relay but relay_url is not set".to_string(),
            )),
        }
    }

    /// Converts to the settings of a session.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the settings do not validate.
    pub fn session_settings(&self) -> Result<SessionSettings, StoreError> {
        self.validate()?;
        Ok(SessionSettings {
            base: self.api_base()?,
            timeout: Duration::from_secs(self.timeout_secs),
            auth_strategy: self.auth_strategy,
            credential_encoding: self.credential_encoding,
            chunk_size: self.chunk_size,
            max_concurrent_chunks: self.max_concurrent_chunks,
            auth_failure_threshold: self.auth_failure_threshold,
        })
    }

    /// Returns a session builder configured from these settings, with the
    /// credential persisted in the configured backend.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the settings do not validate.
    pub fn session_builder(&self) -> Result<SessionBuilder, StoreError> {
        Ok(Session::builder()
            .settings(self.session_settings()?)
            .credential_backend(self.credential_backend.open(default_credential_path())))
    }

    /// Applies overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Applies overrides from `lookup`, which maps a variable name to its
    /// value.
    ///
    /// Only the relay origin is a setting; the API key variable is read by
    /// the front end and never persisted.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_RELAY_URL).filter(|url| !url.trim().is_empty()) {
            debug!(relay_url = %url, "Relay origin overridden from environment");
            self.endpoint = EndpointMode::Relay;
            self.relay_url = Some(url.trim().to_string());
        }
    }

    /// Sets one value by key, as given on the command line.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] for an unknown key or a value that
    /// does not parse. The settings are left unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let value = value.trim();
        match key {
            "endpoint" => self.endpoint = parse_variant(key, value)?,
            "relay_url" => self.relay_url = optional(value).map(str::to_string),
            "auth_strategy" => self.auth_strategy = parse_variant(key, value)?,
            "credential_backend" => self.credential_backend = parse_variant(key, value)?,
            "credential_encoding" => self.credential_encoding = parse_variant(key, value)?,
            "chunk_size" => self.chunk_size = parse_number(key, value)?,
            "max_concurrent_chunks" => self.max_concurrent_chunks = parse_number(key, value)?,
            "timeout_secs" => self.timeout_secs = parse_number(key, value)?,
            "auth_failure_threshold" => {
                self.auth_failure_threshold = match optional(value) {
                    Some(value) => Some(parse_number(key, value)?),
                    None => None,
                };
            }
            "log_level" => self.log_level = parse_variant(key, value)?,
            _ => {
                return Err(StoreError::Config(format!(
                    "Unknown setting '{key}' (expected one of: {})",
                    SETTING_KEYS.join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// Treats an empty value or `none` as unset.
fn optional(value: &str) -> Option<&str> {
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(value)
    }
}

fn parse_variant<T: DeserializeOwned>(key: &str, value: &str) -> Result<T, StoreError> {
    serde_json::from_value(serde_json::Value::String(value.to_lowercase()))
        .map_err(|_| StoreError::Config(format!("Invalid value '{value}' for {key}")))
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, StoreError> {
    value
        .parse()
        .map_err(|_| StoreError::Config(format!("{key} expects a number, got '{value}'")))
}

// ============================================================================
// Settings Store
// ============================================================================

/// Persistent settings store.
pub struct SettingsStore {
    settings: Arc<RwLock<Settings>>,
    path: PathBuf,
}

impl SettingsStore {
    /// Creates a store with default settings saved to `path`.
    pub fn new(path: PathBuf) -> Self {
        Self {
            settings: Arc::new(RwLock::new(Settings::default())),
            path,
        }
    }

    /// Loads settings from the default path.
    ///
    /// # Errors
    ///
    /// Returns error if settings cannot be loaded from disk.
    pub async fn load_default() -> Result<Self, StoreError> {
        Self::load(default_settings_path()).await
    }

    /// Loads settings from a path.
    ///
    /// A missing file yields the defaults. An unreadable file is logged and
    /// also yields the defaults, so a broken file never locks the user out.
    ///
    /// # Errors
    ///
    /// Returns error if settings cannot be loaded from disk.
    pub async fn load(path: PathBuf) -> Result<Self, StoreError> {
        let settings = if path.exists() {
            info!(path = %path.display(), "Loading settings");
            load_json(&path).await.unwrap_or_else(|e| {
                warn!(error = %e, "Failed to load settings, using defaults");
                Settings::default()
            })
        } else {
            debug!(path = %path.display(), "Settings file not found, using defaults");
            Settings::default()
        };

        Ok(Self {
            settings: Arc::new(RwLock::new(settings)),
            path,
        })
    }

    /// Returns the file the store saves to.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Gets a copy of the current settings.
    pub async fn get(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Updates settings in memory.
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Settings),
    {
        let mut settings = self.settings.write().await;
        f(&mut settings);
    }

    /// Sets one value by key and validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the key is unknown or the new
    /// settings do not validate; the stored settings are unchanged then.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut settings = self.settings.write().await;
        let mut updated = settings.clone();
        updated.set(key, value)?;
        updated.validate()?;
        *settings = updated;
        debug!(key, "Setting changed");
        Ok(())
    }

    /// Saves settings to disk.
    ///
    /// # Errors
    ///
    /// Returns error if settings cannot be written to disk.
    pub async fn save(&self) -> Result<(), StoreError> {
        let settings = self.settings.read().await;
        save_json(&self.path, &*settings).await?;
        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
