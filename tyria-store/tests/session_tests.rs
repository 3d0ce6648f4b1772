//! Sessions built from settings, with the credential kept on disk.

use std::sync::Arc;

use tempfile::TempDir;
use tyria_core::ItemId;
use tyria_fetch::testing::{ScriptedTransport, sample_items};
use tyria_fetch::{CredentialBackend, Session};
use tyria_store::{FileBackend, Settings};

fn session_with_file(
    settings: &Settings,
    transport: &Arc<ScriptedTransport>,
    backend: &Arc<FileBackend>,
) -> Session {
    Session::builder()
        .settings(settings.session_settings().unwrap())
        .transport(transport.clone())
        .credential_backend(backend.clone())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_credential_round_trip_through_file() {
    let temp_dir = TempDir::new().unwrap();
    let backend = Arc::new(FileBackend::new(temp_dir.path().join("credential.json")));
    let transport = Arc::new(ScriptedTransport::new().respond(200, "[]"));
    let settings = Settings::default();

    let first = session_with_file(&settings, &transport, &backend);
    first.credentials.set("  abc 123 ").await.unwrap();
    assert_eq!(backend.load().await.unwrap().as_deref(), Some("YWJjMTIz"));
    drop(first);

    let second = session_with_file(&settings, &transport, &backend);
    assert!(second.restore_credential().await);
    assert_eq!(second.credentials.current().await.unwrap().expose(), "abc123");

    second.api.get_bank().await.unwrap();
    assert_eq!(
        transport.requests()[0].header("Authorization"),
        Some("Bearer abc123")
    );

    second.credentials.clear().await;
    assert!(!backend.path().exists());
}

#[tokio::test]
async fn test_corrupted_file_credential_is_removed() {
    let temp_dir = TempDir::new().unwrap();
    let backend = Arc::new(FileBackend::new(temp_dir.path().join("credential.json")));
    backend.save("*** not base64 ***").await.unwrap();

    let transport = Arc::new(ScriptedTransport::new());
    let session = session_with_file(&Settings::default(), &transport, &backend);

    assert!(!session.restore_credential().await);
    assert!(!backend.path().exists());
}

#[tokio::test]
async fn test_settings_drive_the_session() {
    let temp_dir = TempDir::new().unwrap();
    let backend = Arc::new(FileBackend::new(temp_dir.path().join("credential.json")));
    let transport = Arc::new(ScriptedTransport::catalog(sample_items(1, 10)));

    let mut settings = Settings::default();
    settings.set("endpoint", "relay").unwrap();
    settings.set("relay_url", "http://localhost:5173/api/gw2").unwrap();
    settings.set("chunk_size", "4").unwrap();
    settings.set("auth_strategy", "query_parameter").unwrap();
    settings.set("credential_encoding", "plain").unwrap();

    let session = session_with_file(&settings, &transport, &backend);
    session.credentials.set("abc123").await.unwrap();
    assert_eq!(backend.load().await.unwrap().as_deref(), Some("abc123"));

    let ids: Vec<ItemId> = (1..=10).map(ItemId).collect();
    let items = session.details.fetch_details(&ids).await;
    assert_eq!(items.len(), 10);

    let requests = transport.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].url.path(), "/api/gw2/v2/items");
    assert_eq!(requests[0].query("access_token").as_deref(), Some("abc123"));
}

#[test]
fn test_invalid_settings_cannot_build_a_session() {
    let mut settings = Settings::default();
    settings.chunk_size = 0;
    assert!(settings.session_builder().is_err());
}
