//! Strata - an incrementally synchronized tree index over a hierarchical item store.
//!
//! A [`HierarchyStore`](hierarchy::HierarchyStore) owns a forest of items. A
//! [`TreeIndex`] mirrors that forest as rows and columns for a presentation
//! layer, kept current by an [`EventAdapter`] listening to store events.
//! Owner handlers registered in a [`HandlerRegistry`] decide how each item is
//! shown and who may move it; [`ReparentResolver`] runs drag-and-drop moves
//! through them, and [`FilterView`] decides which rows are shown.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use strata::handler::DisambiguationRequest;
//! use strata::hierarchy::{MemoryHierarchy, NewItem};
//! use strata::{EventAdapter, HandlerId, HandlerRegistry, IndexConfig, ReparentResolver, TreeIndex};
//!
//! let store = Arc::new(MemoryHierarchy::new());
//! let registry = Arc::new(HandlerRegistry::new());
//! let index = Arc::new(TreeIndex::new(store.clone(), registry.clone(), IndexConfig::default()));
//! let _adapter = EventAdapter::new(index.clone());
//!
//! let study = store.create_item(NewItem::new("CT chest")).unwrap();
//! let series = store.create_item(NewItem::new("Axial")).unwrap();
//!
//! let resolver = ReparentResolver::new(store.clone(), registry);
//! let no_choice = |_: &DisambiguationRequest| -> Option<HandlerId> { None };
//! resolver.request(series, study, &no_choice).unwrap();
//!
//! let row = index.locate(series, 0).unwrap();
//! assert_eq!(index.item_of(index.parent_of(row).unwrap()), Some(study));
//! ```

pub mod adapter;
pub mod config;
pub mod edit;
pub mod error;
pub mod filter;
pub mod handler;
pub mod hierarchy;
pub mod index;
pub mod model;
pub mod reparent;

pub use adapter::{AdapterSignals, EventAdapter};
pub use config::IndexConfig;
pub use edit::ItemEditor;
pub use error::{
    ConfigError, HandlerError, HandlerResult, IndexError, IndexResult, ReparentError, ReparentResult,
    StoreError, StoreResult,
};
pub use filter::FilterView;
pub use handler::{DefaultHandler, HandlerId, HandlerRegistry, OwnerHandler};
pub use index::TreeIndex;
pub use reparent::{ReparentOutcome, ReparentResolver};
