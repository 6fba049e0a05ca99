//! Row handles for addressing cells of the mirror tree.

use slotmap::new_key_type;

new_key_type! {
    /// Arena handle of one item's row group in the mirror tree.
    ///
    /// Keys are generation-checked: a key whose group was deleted never
    /// resolves to a newer group.
    pub struct RowKey;
}

/// A cell of the mirror tree: one item's row in one column.
///
/// All columns of an item share the same [`RowKey`]; only column 0 is
/// searched when locating items, other columns are derived from it with
/// [`sibling`](RowRef::sibling).
///
/// Like a model index, a `RowRef` is a short-lived handle. It stays valid
/// across moves of the row, but becomes dangling once the row is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowRef {
    key: RowKey,
    column: usize,
}

impl RowRef {
    /// Creates a handle for a column of a row group.
    #[inline]
    pub const fn new(key: RowKey, column: usize) -> Self {
        Self { key, column }
    }

    /// The row group this cell belongs to.
    #[inline]
    pub const fn key(&self) -> RowKey {
        self.key
    }

    /// The column of this cell.
    #[inline]
    pub const fn column(&self) -> usize {
        self.column
    }

    /// The cell of the same row in another column.
    #[inline]
    pub const fn sibling(&self, column: usize) -> Self {
        Self {
            key: self.key,
            column,
        }
    }

    /// The column-0 cell of the same row.
    #[inline]
    pub const fn primary(&self) -> Self {
        self.sibling(0)
    }
}
