//! Chunked retrieval of catalog items.
//!
//! The upstream caps the number of ids per `/v2/items` request, so a large
//! lookup is deduplicated, split into consecutive chunks and sent as one
//! request per chunk. A failed chunk is logged and skipped; the batch only
//! fails when every chunk failed.

use std::collections::HashSet;
use std::sync::Arc;

use futures::FutureExt;
use futures::stream::{self, StreamExt};
use tracing::{debug, instrument, warn};
use tyria_core::{Item, ItemId};

use crate::error::FetchError;
use crate::http::{ApiRequest, HttpClient};

/// Default number of ids per request, the upstream's page cap.
pub const DEFAULT_CHUNK_SIZE: usize = 200;

/// Upstream text of a 404 for an id list where nothing matched.
const ALL_IDS_INVALID: &str = "all ids provided are invalid";

/// Removes duplicates, keeping the first occurrence of each id.
pub fn dedup_preserving_order(ids: &[ItemId]) -> Vec<ItemId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

// ============================================================================
// Batch Plan
// ============================================================================

/// Deduplicated ids split into request-sized chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    chunks: Vec<Vec<ItemId>>,
}

impl BatchPlan {
    /// Plans the retrieval of `ids` in chunks of at most `chunk_size`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidInput`] if `chunk_size` is zero.
    pub fn new(ids: &[ItemId], chunk_size: usize) -> Result<Self, FetchError> {
        if chunk_size == 0 {
            return Err(FetchError::InvalidInput(
                "Chunk size must be at least 1".to_string(),
            ));
        }

        let chunks = dedup_preserving_order(ids)
            .chunks(chunk_size)
            .map(<[ItemId]>::to_vec)
            .collect();
        Ok(Self { chunks })
    }

    /// Returns the chunks in request order.
    pub fn chunks(&self) -> &[Vec<ItemId>] {
        &self.chunks
    }

    /// Number of requests the plan needs.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns true if there is nothing to fetch.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Number of distinct ids across all chunks.
    pub fn total_ids(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// A chunk whose request failed.
#[derive(Debug)]
pub struct ChunkFailure {
    /// Position of the chunk in the plan.
    pub index: usize,
    /// Ids the chunk asked for.
    pub ids: Vec<ItemId>,
    /// Classified error.
    pub error: FetchError,
}

/// Everything a batch produced.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Items returned by successful chunks, in chunk order.
    pub items: Vec<Item>,
    /// Chunks that failed.
    pub failures: Vec<ChunkFailure>,
    /// Ids from successful chunks that the upstream did not return.
    pub unresolved: Vec<ItemId>,
    /// Number of chunks attempted.
    pub chunks: usize,
}

impl BatchOutcome {
    /// Returns true if some, but not all, chunks failed.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty() && self.failures.len() < self.chunks
    }
}

// ============================================================================
// Batch Fetcher
// ============================================================================

/// Fetches items in chunks over the shared [`HttpClient`].
#[derive(Debug, Clone)]
pub struct BatchFetcher {
    client: Arc<HttpClient>,
    max_concurrent_chunks: usize,
}

impl BatchFetcher {
    /// Creates a fetcher that sends one chunk at a time.
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            max_concurrent_chunks: 1,
        }
    }

    /// Allows up to `limit` chunk requests in flight. Values below 1 mean 1.
    #[must_use]
    pub fn with_max_concurrent_chunks(mut self, limit: usize) -> Self {
        self.max_concurrent_chunks = limit.max(1);
        self
    }

    /// Returns the chunk concurrency limit.
    pub fn max_concurrent_chunks(&self) -> usize {
        self.max_concurrent_chunks
    }

    /// Fetches `ids` in chunks of `chunk_size` and returns every item found.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidInput`] if `chunk_size` is zero and
    /// [`FetchError::AllChunksFailed`] if no chunk succeeded.
    pub async fn fetch_batch(
        &self,
        ids: &[ItemId],
        chunk_size: usize,
    ) -> Result<Vec<Item>, FetchError> {
        Ok(self.fetch_batch_outcome(ids, chunk_size).await?.items)
    }

    /// Like [`fetch_batch`](Self::fetch_batch), but also reports the failed
    /// chunks and the ids the upstream did not know.
    ///
    /// # Errors
    ///
    /// Same as [`fetch_batch`](Self::fetch_batch).
    #[instrument(skip(self, ids), fields(ids = ids.len()))]
    pub async fn fetch_batch_outcome(
        &self,
        ids: &[ItemId],
        chunk_size: usize,
    ) -> Result<BatchOutcome, FetchError> {
        let plan = BatchPlan::new(ids, chunk_size)?;
        if plan.is_empty() {
            return Ok(BatchOutcome::default());
        }

        debug!(
            chunks = plan.len(),
            distinct = plan.total_ids(),
            concurrency = self.max_concurrent_chunks,
            "Fetching items"
        );

        let results = self.run(&plan).await;

        let mut outcome = BatchOutcome {
            chunks: plan.len(),
            ..BatchOutcome::default()
        };
        for (index, result) in results {
            let chunk = &plan.chunks()[index];
            match result {
                Ok(items) => {
                    let returned: HashSet<ItemId> = items.iter().map(|item| item.id).collect();
                    outcome
                        .unresolved
                        .extend(chunk.iter().filter(|id| !returned.contains(id)));
                    outcome.items.extend(items);
                }
                Err(error) => {
                    warn!(
                        chunk = index + 1,
                        of = plan.len(),
                        ids = chunk.len(),
                        error = %error,
                        "Chunk failed, skipping"
                    );
                    outcome.failures.push(ChunkFailure {
                        index,
                        ids: chunk.clone(),
                        error,
                    });
                }
            }
        }

        if outcome.failures.len() == outcome.chunks {
            return Err(FetchError::AllChunksFailed {
                chunks: outcome.chunks,
            });
        }

        if outcome.is_partial() {
            warn!(
                failed = outcome.failures.len(),
                of = outcome.chunks,
                returned = outcome.items.len(),
                "Batch partially failed"
            );
        } else {
            debug!(
                returned = outcome.items.len(),
                unresolved = outcome.unresolved.len(),
                "Batch complete"
            );
        }

        Ok(outcome)
    }

    /// Sends every chunk and returns the results ordered by chunk index.
    async fn run(&self, plan: &BatchPlan) -> Vec<(usize, Result<Vec<Item>, FetchError>)> {
        if self.max_concurrent_chunks <= 1 {
            let mut results = Vec::with_capacity(plan.len());
            for (index, chunk) in plan.chunks().iter().enumerate() {
                results.push((index, self.fetch_chunk(chunk).await));
            }
            return results;
        }

        // Owned chunks and boxed futures keep the stream `Send` for callers
        // that spawn the batch.
        let mut results: Vec<_> = stream::iter(plan.chunks().iter().cloned().enumerate())
            .map(|(index, chunk)| {
                let fetcher = self.clone();
                async move { (index, fetcher.fetch_chunk(&chunk).await) }.boxed()
            })
            .buffer_unordered(self.max_concurrent_chunks)
            .collect()
            .await;
        results.sort_by_key(|(index, _)| *index);
        results
    }

    async fn fetch_chunk(&self, chunk: &[ItemId]) -> Result<Vec<Item>, FetchError> {
        let ids = chunk
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let request = ApiRequest::new(["items"]).with_query("ids", ids);

        match self.client.get_json::<Vec<Item>>(request).await {
            // The upstream answers 404 when none of the ids exist.
            Err(FetchError::UpstreamError { status: 404, message })
                if message.to_lowercase().contains(ALL_IDS_INVALID) =>
            {
                debug!(ids = chunk.len(), "No id in chunk is known upstream");
                Ok(Vec::new())
            }
            other => other,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::host::transport::TransportResponse;
    use crate::testing::{ScriptedTransport, items_handler, parse_ids, sample_items};

    fn ids(range: std::ops::RangeInclusive<u32>) -> Vec<ItemId> {
        range.map(ItemId).collect()
    }

    fn fetcher(transport: &Arc<ScriptedTransport>) -> BatchFetcher {
        let client = HttpClient::builder(transport.clone()).build();
        BatchFetcher::new(Arc::new(client))
    }

    #[test]
    fn test_dedup_preserving_order() {
        let ids = [ItemId(3), ItemId(1), ItemId(3), ItemId(2), ItemId(1)];
        assert_eq!(
            dedup_preserving_order(&ids),
            vec![ItemId(3), ItemId(1), ItemId(2)]
        );
    }

    #[test]
    fn test_plan_chunks() {
        let plan = BatchPlan::new(&ids(1..=450), 200).unwrap();
        let sizes: Vec<usize> = plan.chunks().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![200, 200, 50]);
        assert_eq!(plan.total_ids(), 450);
        assert_eq!(plan.chunks()[1][0], ItemId(201));
    }

    #[test]
    fn test_plan_rejects_zero_chunk_size() {
        assert!(matches!(
            BatchPlan::new(&ids(1..=3), 0),
            Err(FetchError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicates_make_one_request() {
        let transport = Arc::new(ScriptedTransport::catalog(sample_items(1, 3)));
        let fetcher = fetcher(&transport);

        let input = [ItemId(1), ItemId(2), ItemId(2), ItemId(3), ItemId(1)];
        let items = fetcher.fetch_batch(&input, DEFAULT_CHUNK_SIZE).await.unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(transport.requested_ids(), vec![vec![1, 2, 3]]);
        let url = &transport.requests()[0].url;
        assert_eq!(url.path(), "/v2/items");
    }

    #[tokio::test]
    async fn test_chunks_are_sent_in_order() {
        let transport = Arc::new(ScriptedTransport::catalog(sample_items(1, 450)));
        let fetcher = fetcher(&transport);

        let items = fetcher.fetch_batch(&ids(1..=450), 200).await.unwrap();

        assert_eq!(items.len(), 450);
        let sizes: Vec<usize> = transport.requested_ids().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![200, 200, 50]);
        assert_eq!(transport.requested_ids()[2][0], 401);
    }

    #[tokio::test]
    async fn test_failed_chunk_is_skipped() {
        let catalog = items_handler(sample_items(1, 450));
        let transport = Arc::new(ScriptedTransport::new().with_handler(move |request| {
            if parse_ids(request).contains(&201) {
                Ok(TransportResponse::new(503, "Service Unavailable"))
            } else {
                catalog(request)
            }
        }));
        let fetcher = fetcher(&transport);

        let outcome = fetcher.fetch_batch_outcome(&ids(1..=450), 200).await.unwrap();

        assert_eq!(transport.request_count(), 3);
        assert_eq!(outcome.items.len(), 250);
        assert!(outcome.is_partial());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].index, 1);
        assert_eq!(outcome.failures[0].error.status(), Some(503));
        assert!(outcome.unresolved.is_empty());
        assert!(outcome.items.iter().all(|item| item.id.get() <= 200 || item.id.get() > 400));
    }

    #[tokio::test]
    async fn test_all_chunks_failed() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(500, "boom")
                .respond(502, "bad gateway"),
        );
        let fetcher = fetcher(&transport);

        let err = fetcher.fetch_batch(&ids(1..=4), 2).await.unwrap_err();
        assert!(matches!(err, FetchError::AllChunksFailed { chunks: 2 }));
    }

    #[tokio::test]
    async fn test_empty_input_and_invalid_chunk_size() {
        let transport = Arc::new(ScriptedTransport::new());
        let fetcher = fetcher(&transport);

        assert!(fetcher.fetch_batch(&[], 200).await.unwrap().is_empty());
        assert!(matches!(
            fetcher.fetch_batch(&ids(1..=3), 0).await,
            Err(FetchError::InvalidInput(_))
        ));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_unresolved() {
        let transport = Arc::new(ScriptedTransport::catalog(sample_items(1, 2)));
        let fetcher = fetcher(&transport);

        let outcome = fetcher
            .fetch_batch_outcome(&[ItemId(1), ItemId(2), ItemId(9)], 2)
            .await
            .unwrap();

        assert_eq!(outcome.items.len(), 2);
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.unresolved, vec![ItemId(9)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_chunks_keep_chunk_order() {
        let transport = Arc::new(
            ScriptedTransport::catalog(sample_items(1, 450)).with_delay(Duration::from_millis(50)),
        );
        let fetcher = fetcher(&transport).with_max_concurrent_chunks(3);

        let items = fetcher.fetch_batch(&ids(1..=450), 200).await.unwrap();

        assert_eq!(transport.request_count(), 3);
        let returned: Vec<u32> = items.iter().map(|item| item.id.get()).collect();
        assert_eq!(returned, (1..=450).collect::<Vec<_>>());
    }
}
