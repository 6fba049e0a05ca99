//! Core systems for Strata.
//!
//! This crate provides the infrastructure the hierarchy mirror is built on:
//!
//! - **Signal/Slot System**: Type-safe change notification between the
//!   hierarchy store, the tree index, and presentation consumers
//! - **Logging**: Tracing targets per subsystem, performance spans, and a
//!   tree pretty-printer for diagnostics
//!
//! # Signal/Slot Example
//!
//! ```
//! use strata_core::Signal;
//!
//! let item_added = Signal::<u64>::new();
//!
//! let conn_id = item_added.connect(|id| {
//!     println!("Item {} added", id);
//! });
//!
//! item_added.emit(42);
//! item_added.disconnect(conn_id);
//! ```

pub mod logging;
pub mod signal;

pub use logging::{DebugTree, PerfSpan, TreeFormatOptions, TreeFormatter, TreeStyle};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
