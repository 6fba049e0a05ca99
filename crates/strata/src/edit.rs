//! Edits originating from the presentation layer.

use std::sync::Arc;

use strata_core::logging::targets;

use crate::error::{HandlerError, HandlerResult};
use crate::handler::HandlerRegistry;
use crate::hierarchy::{HierarchyEvent, HierarchyStore, ItemId, TransformRef};

/// Applies user edits of mirror rows back to the store.
///
/// Changes made through an item's associated object are not store
/// mutations, so the editor announces them as `ItemModified` itself; the
/// event adapter then refreshes the row like any other change.
pub struct ItemEditor {
    store: Arc<dyn HierarchyStore>,
    registry: Arc<HandlerRegistry>,
}

impl ItemEditor {
    /// Create an editor writing to `store` through the handlers of `registry`.
    pub fn new(store: Arc<dyn HierarchyStore>, registry: Arc<HandlerRegistry>) -> Self {
        Self { store, registry }
    }

    /// Rename an item.
    pub fn rename(&self, item: ItemId, name: &str) -> HandlerResult<()> {
        reject_sentinel(item)?;
        self.store.set_name(item, name)?;
        tracing::debug!(target: targets::HANDLER, item = %item, name, "item renamed");
        Ok(())
    }

    /// Show or hide an item through its owner handler.
    pub fn set_visibility(&self, item: ItemId, visible: i32) -> HandlerResult<()> {
        reject_sentinel(item)?;
        let store = self.store.as_ref();
        let (_, handler) = self.registry.effective_owner(store, item);
        if handler.visibility(store, item) == visible {
            return Ok(());
        }
        handler.set_visibility(store, item, visible)?;
        tracing::debug!(target: targets::HANDLER, item = %item, visible, owner = handler.name(), "visibility changed");
        self.notify_modified(item);
        Ok(())
    }

    /// Apply a transform to the item's associated object, or clear it.
    ///
    /// Items without an associated object are left alone.
    pub fn assign_transform(&self, item: ItemId, transform: Option<TransformRef>) -> HandlerResult<()> {
        reject_sentinel(item)?;
        let Some(object) = self.store.data_object(item) else {
            tracing::debug!(target: targets::HANDLER, item = %item, "no associated object to transform");
            return Ok(());
        };
        if object.parent_transform() == transform {
            return Ok(());
        }
        if !object.set_parent_transform(transform) {
            return Err(HandlerError::rejected(item, "the object refused the transform"));
        }
        self.notify_modified(item);
        Ok(())
    }

    fn notify_modified(&self, item: ItemId) {
        self.store.events().emit(HierarchyEvent::ItemModified(item));
    }
}

fn reject_sentinel(item: ItemId) -> HandlerResult<()> {
    if item.is_sentinel() {
        return Err(HandlerError::rejected(item, "the hierarchy root cannot be edited"));
    }
    Ok(())
}
