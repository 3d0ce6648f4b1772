//! In-process test doubles.
//!
//! [`ScriptedTransport`] stands in for the network: it answers from a queue
//! of scripted steps, then from an optional handler, and records every
//! request it saw. [`FailingBackend`] is a credential backend whose every
//! operation fails.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tyria_core::{Item, ItemId};

use crate::credential::CredentialBackend;
use crate::error::{CredentialError, TransportError};
use crate::host::transport::{Transport, TransportRequest, TransportResponse};

type Handler =
    Box<dyn Fn(&TransportRequest) -> Result<TransportResponse, TransportError> + Send + Sync>;

enum Step {
    Respond {
        status: u16,
        body: String,
        delay: Option<Duration>,
    },
    Fail(TransportError),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Scripted Transport
// ============================================================================

/// A [`Transport`] answering from a script.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    handler: Option<Handler>,
    delay: Option<Duration>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    /// Creates a transport with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport serving `/v2/items?ids=...` from `items`.
    pub fn catalog(items: impl IntoIterator<Item = Item>) -> Self {
        Self::new().with_handler(items_handler(items))
    }

    /// Queues a response.
    #[must_use]
    pub fn respond(self, status: u16, body: impl Into<String>) -> Self {
        lock(&self.script).push_back(Step::Respond {
            status,
            body: body.into(),
            delay: None,
        });
        self
    }

    /// Queues a response delivered after `delay`.
    #[must_use]
    pub fn respond_after(self, delay: Duration, status: u16, body: impl Into<String>) -> Self {
        lock(&self.script).push_back(Step::Respond {
            status,
            body: body.into(),
            delay: Some(delay),
        });
        self
    }

    /// Queues a transport failure.
    #[must_use]
    pub fn fail(self, error: TransportError) -> Self {
        lock(&self.script).push_back(Step::Fail(error));
        self
    }

    /// Answers with `handler` once the script is exhausted.
    #[must_use]
    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&TransportRequest) -> Result<TransportResponse, TransportError> + Send + Sync + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Delays every handler answer by `delay`.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns every request received so far.
    pub fn requests(&self) -> Vec<TransportRequest> {
        lock(&self.requests).clone()
    }

    /// Returns the number of requests received so far.
    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Returns the `ids` parameter of every request, parsed.
    pub fn requested_ids(&self) -> Vec<Vec<u32>> {
        lock(&self.requests).iter().map(parse_ids).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        lock(&self.requests).push(request.clone());

        let step = lock(&self.script).pop_front();
        match step {
            Some(Step::Respond {
                status,
                body,
                delay,
            }) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(TransportResponse::new(status, body))
            }
            Some(Step::Fail(error)) => Err(error),
            None => {
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
                match &self.handler {
                    Some(handler) => handler(&request),
                    None => Ok(TransportResponse::new(404, r#"{"text":"no scripted response"}"#)),
                }
            }
        }
    }
}

/// Parses the comma-separated `ids` parameter of a request.
pub fn parse_ids(request: &TransportRequest) -> Vec<u32> {
    request
        .query("ids")
        .map(|ids| ids.split(',').filter_map(|id| id.trim().parse().ok()).collect())
        .unwrap_or_default()
}

/// Builds a handler that answers `/v2/items?ids=...` the way the upstream
/// does: 200 when every id is known, 206 when only some are, 404 when none.
pub fn items_handler(
    items: impl IntoIterator<Item = Item>,
) -> impl Fn(&TransportRequest) -> Result<TransportResponse, TransportError> + Send + Sync + 'static
{
    let catalog: HashMap<ItemId, Item> = items.into_iter().map(|item| (item.id, item)).collect();

    move |request| {
        let ids = parse_ids(request);
        let found: Vec<&Item> = ids
            .iter()
            .filter_map(|id| catalog.get(&ItemId(*id)))
            .collect();

        if found.is_empty() {
            return Ok(TransportResponse::new(
                404,
                r#"{"text":"all ids provided are invalid"}"#,
            ));
        }

        let status = if found.len() == ids.len() { 200 } else { 206 };
        let body = serde_json::to_string(&found)
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(TransportResponse::new(status, body))
    }
}

/// Builds `count` items with ids starting at `first`.
pub fn sample_items(first: u32, count: u32) -> Vec<Item> {
    (first..first + count)
        .map(|id| Item::new(id, format!("Item {id}")).with_icon(format!("https://render/{id}.png")))
        .collect()
}

// ============================================================================
// Failing Backend
// ============================================================================

/// A credential backend whose every operation fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingBackend;

#[async_trait]
impl CredentialBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn load(&self) -> Result<Option<String>, CredentialError> {
        Err(CredentialError::Backend("storage offline".to_string()))
    }

    async fn save(&self, _encoded: &str) -> Result<(), CredentialError> {
        Err(CredentialError::Backend("storage offline".to_string()))
    }

    async fn remove(&self) -> Result<(), CredentialError> {
        Err(CredentialError::Backend("storage offline".to_string()))
    }
}
