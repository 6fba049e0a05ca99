//! Presentation-side types of the mirror tree.
//!
//! The presentation layer addresses mirror rows through [`RowRef`] handles and
//! asks for per-cell data with an [`ItemRole`], receiving [`ItemData`]. Row
//! structure changes are announced through [`IndexSignals`].
//!
//! # Core Types
//!
//! - `RowRef`: Identifies one cell (item row, column) of the mirror tree
//! - `ItemRole`: Specifies what kind of data to read from a cell
//! - `ItemData`: The value of a cell for a role
//! - `ItemFlags`: Interaction capabilities of a cell
//! - `IndexSignals`: Change notifications of the mirror tree

mod index;
mod role;
mod traits;

pub use index::{RowKey, RowRef};
pub use role::{IconRef, ItemData, ItemRole};
pub use traits::{IndexSignals, ItemFlags};
