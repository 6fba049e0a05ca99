//! Handler-mediated moves of items to a new parent.
//!
//! A move request goes through a fixed sequence of stages:
//!
//! 1. **Validated**: self-parenting, sentinel ids, unknown items and moves
//!    into the item's own subtree are refused.
//! 2. **Handlers queried**: every registered handler reports how confident it
//!    is that it can perform the move.
//! 3. **Selected**: the single best handler wins. With no claim at all the
//!    default handler is used; a tie is put to a [`Disambiguator`].
//! 4. **Executed**: the selected handler mutates the store.
//!
//! The resolver never moves rows itself. The store raises `ItemModified` for
//! the moved item and the tree index relocates its row from that event.

use std::sync::Arc;

use strata_core::logging::targets;

use crate::error::{ReparentError, ReparentResult, StoreError};
use crate::handler::{DisambiguationRequest, Disambiguator, HandlerId, HandlerRegistry, Ranking, describe};
use crate::hierarchy::{HierarchyStore, ItemId, is_virtual_branch};

/// Successful result of a reparent request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReparentOutcome {
    /// The item was moved by the given handler.
    Moved { handler: HandlerId },
    /// The item already was a child of the requested parent.
    Unchanged,
}

/// Executes validated moves by delegating to the best-placed owner handler.
pub struct ReparentResolver {
    store: Arc<dyn HierarchyStore>,
    registry: Arc<HandlerRegistry>,
}

impl ReparentResolver {
    /// Create a resolver over a store and the handlers that may move its items.
    pub fn new(store: Arc<dyn HierarchyStore>, registry: Arc<HandlerRegistry>) -> Self {
        Self { store, registry }
    }

    /// Move `item` under `new_parent`.
    ///
    /// Blocks in `disambiguator` when several handlers tie. Every error but
    /// [`ReparentError::HandlerFailed`] leaves the store untouched.
    pub fn request(
        &self,
        item: ItemId,
        new_parent: ItemId,
        disambiguator: &dyn Disambiguator,
    ) -> ReparentResult<ReparentOutcome> {
        tracing::debug!(target: targets::REPARENT, item = %item, new_parent = %new_parent, "move requested");
        self.validate(item, new_parent)?;
        if self.store.parent(item) == Some(new_parent) {
            tracing::debug!(target: targets::REPARENT, item = %item, "already under the requested parent");
            return Ok(ReparentOutcome::Unchanged);
        }
        tracing::debug!(target: targets::REPARENT, item = %item, "move validated");

        let store = self.store.as_ref();
        let ranking = self.registry.rank_reparent(store, item, new_parent);
        tracing::debug!(target: targets::REPARENT, item = %item, ?ranking, "handlers queried");

        let selected = match ranking {
            Ranking::None => self.registry.default_id(),
            Ranking::Single(candidate) => candidate.id,
            Ranking::Tied(candidates) => {
                let request = DisambiguationRequest {
                    item,
                    new_parent: Some(new_parent),
                    message: format!(
                        "Equal confidence found for more than one handler.\n\nSelect handler to reparent item\n'{}'\n({})\nto parent\n'{}'\n({})",
                        store.name(item).unwrap_or_default(),
                        describe(store, item),
                        store.name(new_parent).unwrap_or_default(),
                        describe(store, new_parent),
                    ),
                    candidates,
                };
                tracing::debug!(
                    target: targets::REPARENT,
                    item = %item,
                    candidates = request.candidates.len(),
                    "awaiting disambiguation"
                );
                match disambiguator.choose(&request) {
                    Some(id) if request.candidates.iter().any(|c| c.id == id) => id,
                    Some(_) | None => {
                        tracing::debug!(target: targets::REPARENT, item = %item, "move cancelled");
                        return Err(ReparentError::Cancelled { item });
                    }
                }
            }
        };

        if self.registry.is_default(selected) && self.touches_virtual_branch(item, new_parent) {
            tracing::debug!(target: targets::REPARENT, item = %item, "default handler refused on virtual branch");
            return Err(ReparentError::VirtualBranchViolation { item, new_parent });
        }

        let Some(handler) = self.registry.handler(selected) else {
            return Err(ReparentError::Cancelled { item });
        };
        tracing::debug!(target: targets::REPARENT, item = %item, handler = handler.name(), "handler selected");

        match handler.reparent(store, item, new_parent) {
            Ok(()) => {
                tracing::debug!(target: targets::REPARENT, item = %item, handler = handler.name(), "move committed");
                Ok(ReparentOutcome::Moved { handler: selected })
            }
            Err(source) => {
                tracing::debug!(target: targets::REPARENT, item = %item, handler = handler.name(), %source, "move rolled back");
                Err(ReparentError::HandlerFailed {
                    item,
                    handler: handler.name().to_string(),
                    source,
                })
            }
        }
    }

    /// Reorder `item` among its siblings. No handler is involved.
    pub fn move_within_parent(&self, item: ItemId, new_index: usize) -> ReparentResult<()> {
        let invalid = |reason: &'static str| ReparentError::InvalidTarget {
            item,
            new_parent: self.store.parent(item).unwrap_or(ItemId::INVALID),
            reason,
        };
        if item.is_sentinel() {
            return Err(invalid("sentinel items cannot be moved"));
        }
        if !self.store.contains(item) {
            return Err(invalid("item is not in the hierarchy"));
        }
        let Some(parent) = self.store.parent(item) else {
            return Err(invalid("item has no parent"));
        };
        if new_index >= self.store.children(parent).len() {
            return Err(invalid("position out of range"));
        }

        self.store.move_item(item, new_index).map_err(|err| match err {
            StoreError::PositionOutOfRange { .. } => invalid("position out of range"),
            StoreError::RootImmutable => invalid("sentinel items cannot be moved"),
            _ => invalid("the hierarchy refused the move"),
        })?;
        tracing::debug!(target: targets::REPARENT, item = %item, new_index, "item reordered");
        Ok(())
    }

    fn validate(&self, item: ItemId, new_parent: ItemId) -> ReparentResult<()> {
        let invalid = |reason: &'static str| {
            tracing::debug!(target: targets::REPARENT, item = %item, new_parent = %new_parent, reason, "move rejected");
            Err(ReparentError::InvalidTarget {
                item,
                new_parent,
                reason,
            })
        };
        if item == new_parent {
            return invalid("an item cannot be its own parent");
        }
        if item.is_sentinel() || !new_parent.is_valid() {
            return invalid("sentinel items cannot be moved");
        }
        if !self.store.contains(item) || !self.store.contains(new_parent) {
            return invalid("item is not in the hierarchy");
        }
        if self.store.is_ancestor(item, new_parent) {
            return invalid("the new parent lies inside the moved subtree");
        }
        Ok(())
    }

    /// Virtual branches and their children belong to the branch's handler.
    fn touches_virtual_branch(&self, item: ItemId, new_parent: ItemId) -> bool {
        let store = self.store.as_ref();
        is_virtual_branch(store, item)
            || is_virtual_branch(store, new_parent)
            || store.parent(item).is_some_and(|parent| is_virtual_branch(store, parent))
    }
}

static_assertions::assert_impl_all!(ReparentResolver: Send, Sync);
