//! Cell flags and change notifications of the mirror tree.

use strata_core::Signal;

use super::index::RowRef;
use super::role::ItemRole;

/// Flags describing what interactions a cell supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ItemFlags {
    /// Cell can be selected.
    pub selectable: bool,
    /// Cell can be edited in place.
    pub editable: bool,
    /// The item can be dragged.
    pub drag_enabled: bool,
    /// Items can be dropped onto the item.
    pub drop_enabled: bool,
    /// Cell is enabled (can interact).
    pub enabled: bool,
}

impl ItemFlags {
    /// Creates flags with all defaults (selectable and enabled only).
    pub fn new() -> Self {
        Self {
            selectable: true,
            enabled: true,
            ..Default::default()
        }
    }

    /// Sets the editable flag.
    pub fn with_editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    /// Sets the drag enabled flag.
    pub fn with_drag(mut self, enabled: bool) -> Self {
        self.drag_enabled = enabled;
        self
    }

    /// Sets the drop enabled flag.
    pub fn with_drop(mut self, enabled: bool) -> Self {
        self.drop_enabled = enabled;
        self
    }
}

/// Signals emitted by the tree index when the mirror tree changes.
///
/// Every signal is emitted after the index has released its internal lock,
/// so slots may query the index freely.
///
/// # Signal Protocol
///
/// - **Row insertion**: `rows_inserted` after the rows are in place
/// - **Row removal**: `rows_about_to_be_removed` while the rows are still
///   addressable, `rows_removed` afterwards
/// - **Moves**: `rows_moved` after a row group changed parent or position
/// - **Data changes**: `data_changed` for re-derived cell data
/// - **Rebuilds**: `model_about_to_reset` and `model_reset` around a full rebuild
pub struct IndexSignals {
    /// Emitted after rows have been inserted.
    /// Args: (parent cell, first row, last row)
    pub rows_inserted: Signal<(RowRef, usize, usize)>,

    /// Emitted just before rows are removed.
    /// Args: (parent cell, first row, last row)
    pub rows_about_to_be_removed: Signal<(RowRef, usize, usize)>,

    /// Emitted after rows have been removed.
    /// Args: (parent cell, first row, last row)
    pub rows_removed: Signal<(RowRef, usize, usize)>,

    /// Emitted after a row group was moved.
    /// Args: (source parent, source row, destination parent, destination row)
    pub rows_moved: Signal<(RowRef, usize, RowRef, usize)>,

    /// Emitted when cell data was re-derived.
    /// Args: (first cell, last cell, changed roles)
    pub data_changed: Signal<(RowRef, RowRef, Vec<ItemRole>)>,

    /// Emitted before the mirror tree is rebuilt from scratch.
    pub model_about_to_reset: Signal<()>,

    /// Emitted after the mirror tree has been rebuilt.
    pub model_reset: Signal<()>,
}

impl Default for IndexSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexSignals {
    /// Creates a new set of index signals.
    pub fn new() -> Self {
        Self {
            rows_inserted: Signal::new(),
            rows_about_to_be_removed: Signal::new(),
            rows_removed: Signal::new(),
            rows_moved: Signal::new(),
            data_changed: Signal::new(),
            model_about_to_reset: Signal::new(),
            model_reset: Signal::new(),
        }
    }

    /// Emits signals for a model reset.
    ///
    /// Calls the provided function between the about_to_reset and reset signals.
    pub fn emit_reset<F, R>(&self, reset_fn: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.model_about_to_reset.emit(());
        let result = reset_fn();
        self.model_reset.emit(());
        result
    }
}
