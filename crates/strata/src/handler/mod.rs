//! Owner handlers and the registry that ranks them.
//!
//! Every item is owned by exactly one handler, chosen per query by the
//! confidence each registered handler reports for it. The owner supplies the
//! item's display name, tooltip, icon and visibility, and performs reparent
//! moves it claims. A [`DefaultHandler`] is always present and renders items
//! no other handler claims.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use strata::handler::{HandlerRegistry, OwnerHandler, OwnerResolution};
//! use strata::hierarchy::{HierarchyStore, ItemId, MemoryHierarchy, NewItem};
//!
//! struct Folders;
//!
//! impl OwnerHandler for Folders {
//!     fn name(&self) -> &str {
//!         "Folder"
//!     }
//!
//!     fn can_own(&self, store: &dyn HierarchyStore, item: ItemId) -> f64 {
//!         if store.level(item).as_deref() == Some("Folder") { 0.7 } else { 0.0 }
//!     }
//! }
//!
//! let registry = HandlerRegistry::new();
//! let folders = registry.register(Arc::new(Folders));
//!
//! let store = MemoryHierarchy::new();
//! let item = store.create_item(NewItem::new("Scans").level("Folder")).unwrap();
//! assert_eq!(registry.resolve_owner(&store, item), OwnerResolution::Owner(folders));
//! ```

mod default;
mod registry;

pub use default::DefaultHandler;
pub(crate) use registry::describe;
pub use registry::{
    Candidate, DisambiguationRequest, Disambiguator, HandlerId, HandlerRegistry, OwnerResolution,
    Ranking,
};

use crate::error::{HandlerError, HandlerResult};
use crate::hierarchy::{HierarchyStore, ItemId};
use crate::model::IconRef;

/// A pluggable, stateless strategy that can own items.
///
/// Handlers receive the store on every call and keep no per-item state. The
/// only sanctioned side effect of a query is [`can_own`](Self::can_own)
/// tagging the item's attributes (for example marking it as a virtual
/// branch root).
pub trait OwnerHandler: Send + Sync {
    /// Unique name, recorded in the store as the item's owner.
    fn name(&self) -> &str;

    /// Confidence in `[0, 1]` that this handler owns the item.
    fn can_own(&self, store: &dyn HierarchyStore, item: ItemId) -> f64;

    /// Name shown in the tree.
    fn display_name(&self, store: &dyn HierarchyStore, item: ItemId) -> String {
        store.name(item).unwrap_or_default()
    }

    /// Tooltip shown over the name.
    fn tooltip(&self, store: &dyn HierarchyStore, item: ItemId) -> String {
        let name = store.name(item).unwrap_or_default();
        match store.level(item) {
            Some(level) if !level.is_empty() => format!("{level}: {name}"),
            _ => name,
        }
    }

    /// Icon shown next to the name; `None` renders the unknown icon.
    fn icon(&self, _store: &dyn HierarchyStore, _item: ItemId) -> Option<IconRef> {
        None
    }

    /// Display visibility: 0 hidden, 1 visible, 2 partially visible, -1 n/a.
    fn visibility(&self, store: &dyn HierarchyStore, item: ItemId) -> i32 {
        store
            .data_object(item)
            .map_or(-1, |object| object.display_visibility())
    }

    /// Changes the display visibility of the item.
    fn set_visibility(&self, store: &dyn HierarchyStore, item: ItemId, visible: i32) -> HandlerResult<()> {
        match store.data_object(item) {
            Some(object) if object.set_display_visibility(visible) => Ok(()),
            Some(_) => Err(HandlerError::rejected(item, "object does not support visibility")),
            None => Err(HandlerError::rejected(item, "item has no associated object")),
        }
    }

    /// Icon for a visibility state.
    fn visibility_icon(&self, visibility: i32) -> Option<IconRef> {
        IconRef::for_visibility(visibility)
    }

    /// Confidence in `[0, 1]` that this handler can move `item` under `new_parent`.
    fn can_reparent(&self, _store: &dyn HierarchyStore, _item: ItemId, _new_parent: ItemId) -> f64 {
        0.0
    }

    /// Moves `item` under `new_parent` in the store.
    ///
    /// On failure the handler is responsible for leaving the store consistent.
    fn reparent(&self, store: &dyn HierarchyStore, item: ItemId, new_parent: ItemId) -> HandlerResult<()> {
        store.set_parent(item, new_parent)?;
        Ok(())
    }
}

/// Everything the mirror tree shows about one item, as derived by its owner.
#[derive(Debug, Clone, PartialEq)]
pub struct Presentation {
    /// Text of the name column.
    pub display_name: String,
    /// Tooltip of the name column.
    pub tooltip: String,
    /// Icon of the name column.
    pub icon: IconRef,
    /// Visibility state.
    pub visibility: i32,
    /// Icon of the visibility column.
    pub visibility_icon: Option<IconRef>,
    /// Name of the handler that produced this presentation (or the
    /// unregistered name recorded in the store).
    pub owner: String,
    /// `true` if no registered handler owns the item.
    pub unassigned: bool,
}
