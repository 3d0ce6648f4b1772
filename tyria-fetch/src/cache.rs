//! Memoization of catalog items by id.
//!
//! An id is in one of three states:
//!
//! - absent: never successfully fetched
//! - [`CacheEntry::Present`]: fetched, never fetched again unless invalidated
//! - [`CacheEntry::Missing`]: the upstream answered and had no record of it
//!
//! The cache knows nothing about the network and never evicts. The lock is
//! held for single map operations only; writes are idempotent upserts, so
//! concurrent writers for the same id cannot corrupt anything.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;
use tyria_core::{Item, ItemId};

/// State of a cached id.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEntry {
    /// The item as returned by the upstream.
    Present(Arc<Item>),
    /// The upstream has no item with this id.
    Missing,
}

/// Item cache shared by every fetch in a session.
#[derive(Debug, Default)]
pub struct EntityCache {
    entries: RwLock<HashMap<ItemId, CacheEntry>>,
}

impl EntityCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ItemId, CacheEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ItemId, CacheEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns true if the item is cached.
    pub fn has(&self, id: ItemId) -> bool {
        matches!(self.read().get(&id), Some(CacheEntry::Present(_)))
    }

    /// Returns the cached item.
    pub fn get(&self, id: ItemId) -> Option<Arc<Item>> {
        match self.read().get(&id) {
            Some(CacheEntry::Present(item)) => Some(Arc::clone(item)),
            _ => None,
        }
    }

    /// Returns the full state of `id`; `None` means never fetched.
    pub fn lookup(&self, id: ItemId) -> Option<CacheEntry> {
        self.read().get(&id).cloned()
    }

    /// Caches `item` under `id`.
    pub fn put(&self, id: ItemId, item: impl Into<Arc<Item>>) {
        self.write().insert(id, CacheEntry::Present(item.into()));
    }

    /// Records that the upstream has no item `id`.
    ///
    /// Does nothing if the item is already present.
    pub fn mark_missing(&self, id: ItemId) {
        self.write().entry(id).or_insert(CacheEntry::Missing);
    }

    /// Returns true if the upstream is known to have no item `id`.
    pub fn is_known_missing(&self, id: ItemId) -> bool {
        matches!(self.read().get(&id), Some(CacheEntry::Missing))
    }

    /// Forgets `id`, so the next lookup fetches it again.
    pub fn invalidate(&self, id: ItemId) -> bool {
        let removed = self.write().remove(&id).is_some();
        if removed {
            debug!(id = %id, "Invalidated cache entry");
        }
        removed
    }

    /// Forgets everything.
    pub fn clear(&self) {
        self.write().clear();
        debug!("Cleared item cache");
    }

    /// Number of ids with a known state (present or missing).
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
