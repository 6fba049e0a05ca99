//! The hierarchy store boundary.
//!
//! The canonical forest of items is owned by an external store. This module
//! defines what the mirror consumes from it: item queries, mutation entry
//! points used by owner handlers, and the event stream that drives
//! incremental synchronization.
//!
//! [`MemoryHierarchy`] is an in-memory store implementing the full contract.

mod memory;

use std::fmt;
use std::sync::Arc;

use strata_core::Signal;

use crate::error::StoreResult;

pub use memory::{MemoryHierarchy, NewItem, RemoveMode};

/// Attribute names reserved by the mirror.
pub mod attributes {
    /// Marks an item whose children are synthesized by its owner handler.
    pub const VIRTUAL_BRANCH: &str = "Hierarchy.VirtualBranch";
    /// Hides an item from tree views.
    pub const EXCLUDE_FROM_TREE: &str = "Hierarchy.ExcludeFromTree";
}

/// Returns `true` if the item carries the virtual-branch flag.
pub fn is_virtual_branch(store: &dyn HierarchyStore, item: ItemId) -> bool {
    store
        .attribute(item, attributes::VIRTUAL_BRANCH)
        .is_some_and(|value| !value.is_empty())
}

/// Opaque, stable identifier of a hierarchy item.
///
/// Identifiers are never reused while the store lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(u64);

impl ItemId {
    /// The "no item" sentinel.
    pub const INVALID: ItemId = ItemId(0);
    /// The scene root every top-level item hangs under.
    pub const ROOT: ItemId = ItemId(1);

    /// Wraps a raw identifier.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identifier, usable as an opaque handle by scripting tools.
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// Returns `true` unless this is [`ItemId::INVALID`].
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }

    /// Returns `true` for either sentinel (root or invalid).
    pub const fn is_sentinel(self) -> bool {
        self.0 == Self::INVALID.0 || self.0 == Self::ROOT.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::INVALID => write!(f, "#invalid"),
            Self::ROOT => write!(f, "#root"),
            Self(raw) => write!(f, "#{raw}"),
        }
    }
}

/// Notifications raised by a hierarchy store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyEvent {
    /// An item was created and attached to its parent.
    ItemAdded(ItemId),
    /// An item is about to be deleted; it is still fully queryable.
    ItemAboutToBeRemoved(ItemId),
    /// An item has been deleted.
    ItemRemoved(ItemId),
    /// Name, attributes, owner, or placement of an item changed.
    ItemModified(ItemId),
    /// A group of mutations starts.
    BatchStarted,
    /// A group of mutations ended.
    BatchEnded,
    /// A scene was imported wholesale.
    Imported,
    /// The scene was closed; only the root remains.
    Closed,
}

/// Reference to a transform applied to a domain object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransformRef {
    /// Identifier of the transform object.
    pub id: String,
    /// Display name of the transform object.
    pub name: String,
}

impl TransformRef {
    /// Creates a transform reference.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A domain object associated with an item.
///
/// Items only ever hold weak references; a dropped object reads as "no
/// associated object".
pub trait DataObject: Send + Sync {
    /// Identifier of the object in its own scene.
    fn object_id(&self) -> String;

    /// Class tag used by handlers to decide ownership.
    fn class_name(&self) -> &str;

    /// Whether the object asks to be hidden from editors and trees.
    fn hidden_from_editors(&self) -> bool {
        false
    }

    /// Display visibility: 0 hidden, 1 visible, 2 partially visible, -1 n/a.
    fn display_visibility(&self) -> i32 {
        -1
    }

    /// Sets the display visibility. Returns `false` if unsupported.
    fn set_display_visibility(&self, _visible: i32) -> bool {
        false
    }

    /// Whether the object can carry a transform at all.
    fn is_transformable(&self) -> bool {
        false
    }

    /// The transform currently applied to the object.
    fn parent_transform(&self) -> Option<TransformRef> {
        None
    }

    /// Applies (or clears) the object's transform. Returns `false` if unsupported.
    fn set_parent_transform(&self, _transform: Option<TransformRef>) -> bool {
        false
    }
}

/// The canonical item forest consumed by the mirror.
///
/// Queries on unknown items return `None`/empty rather than failing. All
/// methods take `&self`; stores use interior mutability and must release
/// their own locks before emitting events, since event handlers re-enter the
/// store.
pub trait HierarchyStore: Send + Sync {
    /// The scene root item.
    fn root_item(&self) -> ItemId {
        ItemId::ROOT
    }

    /// Returns `true` if the item exists.
    fn contains(&self, item: ItemId) -> bool;

    /// Parent of an item; `None` for the root, unknown, or unassigned items.
    fn parent(&self, item: ItemId) -> Option<ItemId>;

    /// Ordered children of an item.
    fn children(&self, item: ItemId) -> Vec<ItemId>;

    /// Position of an item among its siblings.
    fn position_under_parent(&self, item: ItemId) -> Option<usize>;

    /// Child of `parent` at `position`.
    fn child_at(&self, parent: ItemId, position: usize) -> Option<ItemId> {
        self.children(parent).get(position).copied()
    }

    /// Name of an item.
    fn name(&self, item: ItemId) -> Option<String>;

    /// Level tag of an item (e.g. "Patient", "Study", "Folder").
    fn level(&self, item: ItemId) -> Option<String>;

    /// A string attribute of an item.
    fn attribute(&self, item: ItemId, name: &str) -> Option<String>;

    /// Sets a string attribute. Emits `ItemModified` only on change.
    fn set_attribute(&self, item: ItemId, name: &str, value: &str) -> StoreResult<()>;

    /// Removes a string attribute. Emits `ItemModified` only on change.
    fn remove_attribute(&self, item: ItemId, name: &str) -> StoreResult<()>;

    /// The associated domain object, if it is still alive.
    fn data_object(&self, item: ItemId) -> Option<Arc<dyn DataObject>>;

    /// Name of the handler recorded as owner; empty when unassigned.
    fn owner_handler(&self, item: ItemId) -> String;

    /// Records the owner handler name.
    fn set_owner_handler(&self, item: ItemId, handler: &str) -> StoreResult<()>;

    /// Renames an item.
    fn set_name(&self, item: ItemId, name: &str) -> StoreResult<()>;

    /// Moves an item (and its subtree) under a new parent, appended last.
    fn set_parent(&self, item: ItemId, new_parent: ItemId) -> StoreResult<()>;

    /// Reorders an item among its siblings.
    fn move_item(&self, item: ItemId, new_position: usize) -> StoreResult<()>;

    /// Event stream of the store.
    fn events(&self) -> &Signal<HierarchyEvent>;

    /// Returns `true` between `BatchStarted` and `BatchEnded`.
    fn is_batch_processing(&self) -> bool {
        false
    }

    /// Returns `true` if `ancestor` is a strict ancestor of `item`.
    ///
    /// The walk is bounded by the number of visited items, so a corrupted
    /// store with a parent cycle still terminates.
    fn is_ancestor(&self, ancestor: ItemId, item: ItemId) -> bool {
        let mut visited = std::collections::HashSet::new();
        let mut current = self.parent(item);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            if !visited.insert(id) {
                return false;
            }
            current = self.parent(id);
        }
        false
    }

    /// All descendants of an item in depth-first, parents-first order.
    fn descendants(&self, item: ItemId) -> Vec<ItemId> {
        let mut result = Vec::new();
        let mut visited = std::collections::HashSet::new();
        let mut stack: Vec<ItemId> = self.children(item).into_iter().rev().collect();
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            result.push(id);
            stack.extend(self.children(id).into_iter().rev());
        }
        result
    }
}
