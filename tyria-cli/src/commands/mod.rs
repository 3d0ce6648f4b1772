//! CLI command implementations.

pub mod account;
pub mod characters;
pub mod config;
pub mod items;
pub mod key;

use anyhow::Result;
use tracing::debug;
use tyria_fetch::{FetchError, Session};
use tyria_store::{ENV_API_KEY, Settings, SettingsStore};

/// Loads the saved settings with environment overrides applied.
pub async fn load_settings() -> Result<Settings> {
    let store = SettingsStore::load_default().await?;
    let mut settings = store.get().await;
    settings.apply_env_overrides();
    Ok(settings)
}

/// Builds a session from `settings` and restores its credential.
///
/// A key in the environment takes precedence for this run and is not
/// persisted.
pub async fn open_session(settings: &Settings) -> Result<Session> {
    let session = settings.session_builder()?.build()?;

    if session.restore_credential().await {
        debug!("Using stored API key");
    }

    if let Some(key) = std::env::var(ENV_API_KEY)
        .ok()
        .filter(|key| !key.trim().is_empty())
    {
        session.credentials.set_session(&key).await?;
        debug!("Using API key from {}", ENV_API_KEY);
    }

    Ok(session)
}

/// Opens a session that has a credential to send.
pub async fn authenticated_session() -> Result<Session> {
    let settings = load_settings().await?;
    let session = open_session(&settings).await?;

    if !session.is_authenticated().await {
        return Err(FetchError::AuthenticationFailed("No API key is set".to_string()).into());
    }

    Ok(session)
}
