//! Item-to-row lookup cache and the orphan holding area.

use std::collections::HashMap;

use crate::hierarchy::ItemId;
use crate::model::RowKey;

/// Last known whereabouts of an item's row group.
///
/// Placed entries record a position, not a handle: sibling insertions and
/// removals shift rows without touching the cache, so a placed entry may
/// point at another item's row. Readers must verify the item before
/// trusting an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheEntry {
    /// The group is being inserted; its display data is not derived yet.
    Pending(RowKey),
    /// The group was last seen at `row` under `parent`.
    Placed { parent: RowKey, row: usize },
    /// The group has no parent (orphaned or awaiting its parent).
    Detached(RowKey),
}

#[derive(Debug, Default)]
pub(crate) struct RowCache {
    entries: HashMap<ItemId, CacheEntry>,
}

impl RowCache {
    pub fn get(&self, item: ItemId) -> Option<CacheEntry> {
        self.entries.get(&item).copied()
    }

    pub fn set(&mut self, item: ItemId, entry: CacheEntry) {
        self.entries.insert(item, entry);
    }

    pub fn remove(&mut self, item: ItemId) {
        self.entries.remove(&item);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Child row groups parked while their parent row is being removed.
///
/// Filled when an item is about to be removed and drained once the store
/// has finalized the removal.
#[derive(Debug, Default)]
pub(crate) struct OrphanSet {
    groups: Vec<RowKey>,
}

impl OrphanSet {
    pub fn push(&mut self, key: RowKey) {
        if !self.groups.contains(&key) {
            self.groups.push(key);
        }
    }

    pub fn remove(&mut self, key: RowKey) {
        self.groups.retain(|k| *k != key);
    }

    pub fn take(&mut self) -> Vec<RowKey> {
        std::mem::take(&mut self.groups)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = RowKey> + '_ {
        self.groups.iter().copied()
    }
}
