// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Tyria Store
//!
//! Settings and on-disk state for Tyria.
//!
//! This crate provides:
//!
//! - **Settings / SettingsStore**: how a session is built, persisted as JSON
//! - **FileBackend**: credential persistence for systems without a keychain
//! - **Persistence**: file I/O helpers for JSON data
//!
//! ## Usage
//!
//! ```ignore
//! use tyria_store::SettingsStore;
//!
//! let store = SettingsStore::load_default().await?;
//! let mut settings = store.get().await;
//! settings.apply_env_overrides();
//!
//! let session = settings.session_builder()?.build()?;
//! session.restore_credential().await;
//! ```

pub mod credential_file;
pub mod error;
pub mod persistence;
pub mod settings_store;

pub use credential_file::FileBackend;
pub use error::StoreError;
pub use persistence::{
    default_config_dir, default_credential_path, default_settings_path, ensure_dir, load_json,
    load_json_or_default, remove_file, save_json,
};
pub use settings_store::{
    CredentialBackendKind, ENV_API_KEY, ENV_RELAY_URL, EndpointMode, LogLevel, SETTING_KEYS,
    Settings, SettingsStore,
};
#[cfg(test)]
mod persistence_tests;
