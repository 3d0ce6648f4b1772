//! End-to-end tests driving a whole `Session` over an in-process upstream.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tyria_core::{Item, ItemId, item_name};
use tyria_fetch::{
    AuthStrategy, CredentialEncoding, FetchError, MemoryBackend, Session, Transport,
    TransportError, TransportRequest, TransportResponse,
};

const KEY: &str = "ABCD-1234";

/// Serves a bank and an item catalog, and only accepts `KEY`.
#[derive(Default)]
struct FakeUpstream {
    seen: Mutex<Vec<TransportRequest>>,
}

impl FakeUpstream {
    fn seen(&self) -> Vec<TransportRequest> {
        self.seen.lock().unwrap().clone()
    }

    fn authorized(request: &TransportRequest) -> bool {
        request.header("Authorization") == Some(format!("Bearer {KEY}").as_str())
            || request.query("access_token").as_deref() == Some(KEY)
    }
}

#[async_trait]
impl Transport for FakeUpstream {
    async fn get(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.seen.lock().unwrap().push(request.clone());

        match request.url.path() {
            "/v2/account/bank" if Self::authorized(&request) => Ok(TransportResponse::new(
                200,
                r#"[{"id": 1, "count": 5}, null, {"id": 2, "count": 1}, {"id": 404, "count": 1}]"#,
            )),
            "/v2/account/bank" => Ok(TransportResponse::new(
                401,
                r#"{"text":"Invalid access token"}"#,
            )),
            "/v2/items" => {
                let ids = request.query("ids").unwrap_or_default();
                let items: Vec<Item> = ids
                    .split(',')
                    .filter_map(|id| id.parse::<u32>().ok())
                    .filter(|id| *id < 100)
                    .map(|id| Item::new(id, format!("Item {id}")))
                    .collect();
                if items.is_empty() {
                    return Ok(TransportResponse::new(
                        404,
                        r#"{"text":"all ids provided are invalid"}"#,
                    ));
                }
                let body = serde_json::to_string(&items).unwrap();
                Ok(TransportResponse::new(206, body))
            }
            _ => Ok(TransportResponse::new(404, r#"{"text":"no such endpoint"}"#)),
        }
    }
}

fn session(upstream: &Arc<FakeUpstream>, backend: &Arc<MemoryBackend>) -> Session {
    Session::builder()
        .transport(upstream.clone())
        .credential_backend(backend.clone())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_bank_with_item_details() {
    let upstream = Arc::new(FakeUpstream::default());
    let backend = Arc::new(MemoryBackend::new());
    let session = session(&upstream, &backend);
    session.credentials.set(KEY).await.unwrap();

    let bank = session.api.get_bank().await.unwrap();
    let ids = bank.item_ids();
    assert_eq!(ids, vec![ItemId(1), ItemId(2), ItemId(404)]);

    let items = session.details.fetch_details(&ids).await;
    assert_eq!(items.len(), 2);

    let resolved = items.iter().map(|item| &**item);
    assert_eq!(item_name(resolved.clone(), ItemId(1)), "Item 1");
    assert_eq!(item_name(resolved, ItemId(404)), "Unknown item");
    assert!(session.cache.is_known_missing(ItemId(404)));

    // Everything is known now: no further item requests.
    let before = upstream.seen().len();
    session.details.fetch_details(&ids).await;
    assert_eq!(upstream.seen().len(), before);
}

#[tokio::test]
async fn test_credential_survives_restart() {
    let upstream = Arc::new(FakeUpstream::default());
    let backend = Arc::new(MemoryBackend::new());

    let first = session(&upstream, &backend);
    first.credentials.set("  ABCD -1234 ").await.unwrap();
    assert_eq!(backend.stored().await.as_deref(), Some("QUJDRC0xMjM0"));
    drop(first);

    let second = session(&upstream, &backend);
    assert!(!second.is_authenticated().await);
    assert!(second.restore_credential().await);
    assert_eq!(second.credentials.current().await.unwrap().expose(), KEY);

    second.api.get_bank().await.unwrap();
}

#[tokio::test]
async fn test_plain_encoding_and_query_parameter() {
    let upstream = Arc::new(FakeUpstream::default());
    let backend = Arc::new(MemoryBackend::new());
    let session = Session::builder()
        .transport(upstream.clone())
        .credential_backend(backend.clone())
        .credential_encoding(CredentialEncoding::Plain)
        .auth_strategy(AuthStrategy::QueryParameter)
        .build()
        .unwrap();

    session.credentials.set(KEY).await.unwrap();
    assert_eq!(backend.stored().await.as_deref(), Some(KEY));

    session.api.get_bank().await.unwrap();
    let request = &upstream.seen()[0];
    assert_eq!(request.header("Authorization"), None);
    assert_eq!(request.query("access_token").as_deref(), Some(KEY));
}

#[tokio::test]
async fn test_corrupted_credential_is_discarded() {
    let upstream = Arc::new(FakeUpstream::default());
    let backend = Arc::new(MemoryBackend::with_value("%%% not base64 %%%"));
    let session = session(&upstream, &backend);

    assert!(!session.restore_credential().await);
    assert!(!session.is_authenticated().await);
    assert_eq!(backend.stored().await, None);
}

#[tokio::test]
async fn test_rejected_credential_is_cleared() {
    let upstream = Arc::new(FakeUpstream::default());
    let backend = Arc::new(MemoryBackend::new());
    let session = session(&upstream, &backend);
    session.credentials.set("WRONG-KEY").await.unwrap();

    for _ in 0..3 {
        let err = session.api.get_bank().await.unwrap_err();
        assert!(matches!(err, FetchError::AuthenticationFailed(_)));
        assert!(err.is_credential_error());
    }

    assert!(!session.is_authenticated().await);
    assert_eq!(backend.stored().await, None);

    // Now unauthenticated, the request goes out without a key.
    session.api.get_bank().await.unwrap_err();
    let last = upstream.seen().pop().unwrap();
    assert_eq!(last.header("Authorization"), None);
}
