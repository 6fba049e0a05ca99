//! Read-only filtering over the mirror tree.

use std::sync::Arc;

use parking_lot::RwLock;
use strata_core::Signal;
use strata_core::logging::targets;

use crate::handler::HandlerRegistry;
use crate::hierarchy::{HierarchyStore, ItemId, attributes};
use crate::index::TreeIndex;

/// Decides which items a presentation consumer shows.
///
/// An item is rejected when its associated object is hidden from editors,
/// when it carries the exclude-from-tree attribute, or when its display
/// name does not contain the name filter (case-insensitive). Sentinels are
/// always accepted. Nothing is cached; every query re-evaluates.
pub struct FilterView {
    store: Arc<dyn HierarchyStore>,
    registry: Arc<HandlerRegistry>,
    name_filter: RwLock<String>,
    /// Emitted after the name filter changed.
    pub filter_changed: Signal<()>,
}

impl FilterView {
    /// Create a view with no name filter.
    pub fn new(store: Arc<dyn HierarchyStore>, registry: Arc<HandlerRegistry>) -> Self {
        Self {
            store,
            registry,
            name_filter: RwLock::new(String::new()),
            filter_changed: Signal::new(),
        }
    }

    /// The active name filter; empty when none is set.
    pub fn name_filter(&self) -> String {
        self.name_filter.read().clone()
    }

    /// Only accept items whose display name contains `filter`.
    pub fn set_name_filter(&self, filter: impl Into<String>) {
        let filter = filter.into();
        {
            let mut current = self.name_filter.write();
            if *current == filter {
                return;
            }
            *current = filter;
        }
        tracing::debug!(target: targets::FILTER, filter = %self.name_filter.read(), "name filter changed");
        self.filter_changed.emit(());
    }

    /// Drop the name filter, accepting every otherwise visible item again.
    pub fn clear_name_filter(&self) {
        self.set_name_filter(String::new());
    }

    /// Returns `true` if the item's row should be shown.
    ///
    /// Sentinels are always accepted and unknown items never are. Items
    /// whose object is hidden from editors, or that carry the
    /// exclude-from-tree attribute, are rejected; the rest must match the
    /// name filter case-insensitively.
    pub fn accepts(&self, item: ItemId) -> bool {
        if item.is_sentinel() {
            return true;
        }
        let store = self.store.as_ref();
        if !store.contains(item) {
            return false;
        }
        if store.data_object(item).is_some_and(|object| object.hidden_from_editors()) {
            return false;
        }
        if store
            .attribute(item, attributes::EXCLUDE_FROM_TREE)
            .is_some_and(|value| !value.is_empty())
        {
            return false;
        }

        let needle = self.name_filter.read().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let name = self.registry.presentation(store, item).display_name;
        let accepted = name.to_lowercase().contains(&needle);
        tracing::trace!(target: targets::FILTER, item = %item, accepted, "name filter applied");
        accepted
    }

    /// Accepted children of `parent` in mirror-tree order.
    pub fn accepted_children(&self, index: &TreeIndex, parent: ItemId) -> Vec<ItemId> {
        let Some(row) = index.locate(parent, 0) else {
            return Vec::new();
        };
        (0..index.row_count(row))
            .filter_map(|r| index.child(row, r, 0))
            .filter_map(|child| index.item_of(child))
            .filter(|item| self.accepts(*item))
            .collect()
    }
}

static_assertions::assert_impl_all!(FilterView: Send, Sync);
