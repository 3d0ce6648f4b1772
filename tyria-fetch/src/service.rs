//! Cache-first item lookup.

use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, instrument, warn};
use tyria_core::{Item, ItemId};

use crate::batch::{BatchFetcher, DEFAULT_CHUNK_SIZE, dedup_preserving_order};
use crate::cache::EntityCache;
use crate::inflight::{BatchResult, InFlightRegistry, SharedBatch};

/// Resolves item ids to items, fetching only what the cache lacks.
///
/// Lookups never fail: ids that could not be resolved are left out of the
/// result. Ids the upstream reported as unknown are remembered and not
/// requested again; ids whose chunk failed are retried on the next lookup.
#[derive(Debug, Clone)]
pub struct ItemDetailsService {
    fetcher: Arc<BatchFetcher>,
    cache: Arc<EntityCache>,
    inflight: Arc<InFlightRegistry>,
    chunk_size: usize,
}

impl ItemDetailsService {
    /// Creates a service over `fetcher` writing into `cache`.
    pub fn new(fetcher: Arc<BatchFetcher>, cache: Arc<EntityCache>) -> Self {
        Self {
            fetcher,
            cache,
            inflight: Arc::new(InFlightRegistry::new()),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Sets the chunk size used for cache misses. Values below 1 mean 1.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Returns the shared cache.
    pub fn cache(&self) -> &Arc<EntityCache> {
        &self.cache
    }

    /// Returns the chunk size used for cache misses.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns the items for `ids`, in input order, without duplicates.
    ///
    /// Cached ids cost nothing. Ids another lookup is already fetching join
    /// that fetch. Only the rest go to the upstream, in one batch.
    #[instrument(skip(self, ids), fields(ids = ids.len()))]
    pub async fn fetch_details(&self, ids: &[ItemId]) -> Vec<Arc<Item>> {
        let ids = dedup_preserving_order(ids);
        if ids.is_empty() {
            return Vec::new();
        }

        let claim = self
            .inflight
            .claim(&ids, &self.cache, |missing| self.launch(missing));
        debug!(
            cached = claim.cached.len(),
            known_missing = claim.missing.len(),
            launched = claim.launched.len(),
            awaiting = claim.pending.len(),
            "Resolving item details"
        );

        let mut resolved = claim.cached;
        for batch in claim.pending {
            let items = batch.await;
            resolved.extend(items.iter().map(|(id, item)| (*id, Arc::clone(item))));
        }

        ids.iter().filter_map(|id| resolved.get(id).cloned()).collect()
    }

    /// Forgets the cached state of `id` so the next lookup fetches it.
    pub fn invalidate(&self, id: ItemId) -> bool {
        self.cache.invalidate(id)
    }

    /// Starts a batch for `ids` on its own task.
    ///
    /// The task writes the cache before leaving the registry, so a caller
    /// never finds an id in neither. It runs to completion even if every
    /// caller awaiting it goes away.
    fn launch(&self, ids: Vec<ItemId>) -> SharedBatch {
        let fetcher = Arc::clone(&self.fetcher);
        let cache = Arc::clone(&self.cache);
        let inflight = Arc::clone(&self.inflight);
        let chunk_size = self.chunk_size;
        let requested = ids.clone();

        let task = tokio::spawn(async move {
            let mut found = HashMap::with_capacity(ids.len());
            match fetcher.fetch_batch_outcome(&ids, chunk_size).await {
                Ok(outcome) => {
                    for item in outcome.items {
                        let item = Arc::new(item);
                        cache.put(item.id, Arc::clone(&item));
                        found.insert(item.id, item);
                    }
                    for id in outcome.unresolved {
                        cache.mark_missing(id);
                    }
                }
                Err(e) => warn!(ids = ids.len(), error = %e, "Item batch failed"),
            }
            inflight.release(&ids);
            Arc::new(found)
        });

        let inflight = Arc::clone(&self.inflight);
        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "Item batch task aborted");
                    inflight.release(&requested);
                    BatchResult::default()
                }
            }
        }
        .boxed()
        .shared()
    }
}

// ============================================================================
// Tests
// ============================================================================
