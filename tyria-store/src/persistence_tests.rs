//! Persistence round-trip and edge case tests.

use std::path::PathBuf;
use tempfile::TempDir;

use crate::persistence::{ensure_dir, load_json, load_json_or_default, save_json};
use crate::settings_store::{CredentialBackendKind, EndpointMode, Settings, SettingsStore};
use tyria_fetch::AuthStrategy;

// ============================================================================
// JSON Persistence Tests
// ============================================================================

#[tokio::test]
async fn test_save_and_load_settings_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("settings.json");

    let mut settings = Settings::default();
    settings.endpoint = EndpointMode::Relay;
    settings.relay_url = Some("http://localhost:5173/api/gw2".to_string());
    settings.auth_strategy = AuthStrategy::QueryParameter;
    settings.credential_backend = CredentialBackendKind::File;

    save_json(&file_path, &settings).await.unwrap();
    let loaded: Settings = load_json(&file_path).await.unwrap();

    assert_eq!(loaded, settings);
}

#[tokio::test]
async fn test_settings_file_format() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("settings.json");

    save_json(&file_path, &Settings::default()).await.unwrap();
    let raw: serde_json::Value = load_json(&file_path).await.unwrap();

    assert_eq!(raw["endpoint"], "direct");
    assert_eq!(raw["auth_strategy"], "bearer_header");
    assert_eq!(raw["credential_backend"], "keychain");
    assert_eq!(raw["credential_encoding"], "base64");
    assert_eq!(raw["chunk_size"], 200);
}

#[tokio::test]
async fn test_save_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let nested_path = temp_dir.path().join("deeply").join("nested").join("test.json");

    save_json(&nested_path, &serde_json::json!({"key": "value"})).await.unwrap();
    assert!(nested_path.exists());
    assert!(!nested_path.with_extension("json.tmp").exists());
}

#[tokio::test]
async fn test_load_nonexistent_file() {
    let file_path = PathBuf::from("/nonexistent/path/settings.json");

    let result: Result<Settings, _> = load_json(&file_path).await;
    assert!(result.unwrap_err().is_not_found());

    let settings: Settings = load_json_or_default(&file_path).await;
    assert_eq!(settings, Settings::default());
}

#[tokio::test]
async fn test_corrupted_file_falls_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("settings.json");
    tokio::fs::write(&file_path, "{ broken").await.unwrap();

    let settings: Settings = load_json_or_default(&file_path).await;
    assert_eq!(settings, Settings::default());

    let store = SettingsStore::load(file_path).await.unwrap();
    assert_eq!(store.get().await, Settings::default());
}

#[tokio::test]
async fn test_ensure_dir_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let dir_path = temp_dir.path().join("test_dir");

    ensure_dir(&dir_path).await.unwrap();
    ensure_dir(&dir_path).await.unwrap();

    assert!(dir_path.is_dir());
}

// ============================================================================
// Settings Store Tests
// ============================================================================

#[tokio::test]
async fn test_settings_store_save_and_reload() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tyria").join("settings.json");

    let store = SettingsStore::load(path.clone()).await.unwrap();
    assert_eq!(store.get().await, Settings::default());

    store.set("chunk_size", "25").await.unwrap();
    store.set("credential_backend", "memory").await.unwrap();
    store.save().await.unwrap();

    let reloaded = SettingsStore::load(path).await.unwrap();
    let settings = reloaded.get().await;
    assert_eq!(settings.chunk_size, 25);
    assert_eq!(settings.credential_backend, CredentialBackendKind::Memory);
}
