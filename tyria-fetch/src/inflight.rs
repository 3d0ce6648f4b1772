//! Registry of item batches currently being fetched.
//!
//! Concurrent lookups of the same uncached id must share one upstream call.
//! Every id with a batch in progress maps to that batch's shared handle; a
//! later caller joins the handle instead of starting its own request. The
//! batch task removes its ids once its results are in the cache.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, Shared};
use tyria_core::{Item, ItemId};

use crate::cache::{CacheEntry, EntityCache};

/// Items a batch resolved, keyed by id.
pub type BatchResult = Arc<HashMap<ItemId, Arc<Item>>>;

/// Handle to a pending batch that any number of callers may await.
pub type SharedBatch = Shared<BoxFuture<'static, BatchResult>>;

/// How a lookup splits across the cache and the registry.
#[derive(Default)]
pub struct Claim {
    /// Items already cached.
    pub cached: HashMap<ItemId, Arc<Item>>,
    /// Batches to await, both joined and newly launched.
    pub pending: Vec<SharedBatch>,
    /// Ids this caller launched a batch for.
    pub launched: Vec<ItemId>,
    /// Ids the upstream is known not to have.
    pub missing: Vec<ItemId>,
}

impl fmt::Debug for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claim")
            .field("cached", &self.cached.len())
            .field("pending", &self.pending.len())
            .field("launched", &self.launched)
            .field("missing", &self.missing)
            .finish()
    }
}

/// Map of id to the batch currently fetching it.
#[derive(Default)]
pub struct InFlightRegistry {
    pending: Mutex<HashMap<ItemId, SharedBatch>>,
}

impl fmt::Debug for InFlightRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlightRegistry")
            .field("pending", &self.len())
            .finish()
    }
}

impl InFlightRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ItemId, SharedBatch>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Splits `ids` into cached, known missing, in flight and new, and
    /// launches one batch for the new ones.
    ///
    /// The cache and the registry are consulted under the registry lock, so
    /// an id is either served from the cache, joined, or launched exactly
    /// once. `launch` runs under the lock and must not block.
    pub fn claim<F>(&self, ids: &[ItemId], cache: &EntityCache, launch: F) -> Claim
    where
        F: FnOnce(Vec<ItemId>) -> SharedBatch,
    {
        let mut pending = self.lock();
        let mut claim = Claim::default();

        for &id in ids {
            match cache.lookup(id) {
                Some(CacheEntry::Present(item)) => {
                    claim.cached.insert(id, item);
                }
                Some(CacheEntry::Missing) => claim.missing.push(id),
                None => match pending.get(&id) {
                    Some(batch) => {
                        if !claim.pending.iter().any(|joined| joined.ptr_eq(batch)) {
                            claim.pending.push(batch.clone());
                        }
                    }
                    None => claim.launched.push(id),
                },
            }
        }

        if !claim.launched.is_empty() {
            let batch = launch(claim.launched.clone());
            for id in &claim.launched {
                pending.insert(*id, batch.clone());
            }
            claim.pending.push(batch);
        }

        claim
    }

    /// Removes `ids` from the registry.
    pub fn release(&self, ids: &[ItemId]) {
        let mut pending = self.lock();
        for id in ids {
            pending.remove(id);
        }
    }

    /// Returns true if a batch is fetching `id`.
    pub fn contains(&self, id: ItemId) -> bool {
        self.lock().contains_key(&id)
    }

    /// Number of ids being fetched.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing is being fetched.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;

    use super::*;

    fn resolved(items: &[Item]) -> SharedBatch {
        let map: HashMap<ItemId, Arc<Item>> = items
            .iter()
            .map(|item| (item.id, Arc::new(item.clone())))
            .collect();
        futures::future::ready(Arc::new(map)).boxed().shared()
    }

    #[test]
    fn test_claim_partitions_ids() {
        let registry = InFlightRegistry::new();
        let cache = EntityCache::new();
        cache.put(ItemId(1), Item::new(1, "cached"));
        cache.mark_missing(ItemId(2));

        let claim = registry.claim(&[ItemId(1), ItemId(2), ItemId(3)], &cache, |ids| {
            assert_eq!(ids, vec![ItemId(3)]);
            resolved(&[])
        });

        assert!(claim.cached.contains_key(&ItemId(1)));
        assert_eq!(claim.missing, vec![ItemId(2)]);
        assert_eq!(claim.launched, vec![ItemId(3)]);
        assert_eq!(claim.pending.len(), 1);
        assert!(registry.contains(ItemId(3)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_second_claim_joins_pending_batch() {
        let registry = InFlightRegistry::new();
        let cache = EntityCache::new();

        let first = registry.claim(&[ItemId(1), ItemId(2)], &cache, |_| resolved(&[]));
        let second = registry.claim(&[ItemId(2), ItemId(1)], &cache, |_| {
            panic!("must not launch a second batch")
        });

        assert!(second.launched.is_empty());
        assert_eq!(second.pending.len(), 1);
        assert!(second.pending[0].ptr_eq(&first.pending[0]));
    }

    #[test]
    fn test_release_allows_relaunch() {
        let registry = InFlightRegistry::new();
        let cache = EntityCache::new();

        registry.claim(&[ItemId(1)], &cache, |_| resolved(&[]));
        registry.release(&[ItemId(1)]);
        assert!(registry.is_empty());

        let claim = registry.claim(&[ItemId(1)], &cache, |_| resolved(&[]));
        assert_eq!(claim.launched, vec![ItemId(1)]);
    }

    #[tokio::test]
    async fn test_joined_batch_yields_items() {
        let registry = InFlightRegistry::new();
        let cache = EntityCache::new();

        let claim = registry.claim(&[ItemId(5)], &cache, |_| resolved(&[Item::new(5, "five")]));
        let result = claim.pending[0].clone().await;
        assert_eq!(result[&ItemId(5)].name, "five");
    }
}
