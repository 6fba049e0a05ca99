//! Error types for the hierarchy mirror.
//!
//! Each concern has its own enum so callers can tell recoverable index
//! conditions apart from user-facing reparent failures.

use crate::hierarchy::ItemId;

/// Result type alias for tree index operations.
pub type IndexResult<T> = std::result::Result<T, IndexError>;

/// Result type alias for reparent requests.
pub type ReparentResult<T> = std::result::Result<T, ReparentError>;

/// Result type alias for handler operations.
pub type HandlerResult<T> = std::result::Result<T, HandlerError>;

/// Result type alias for store mutations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised while maintaining the mirror tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    /// The parent of an item cannot be resolved. The row is kept detached and
    /// attachment is retried on the next refresh of the item.
    #[error("Item {item} has no resolvable parent")]
    OrphanedItem { item: ItemId },

    /// An item was reported as its own ancestor. The operation was refused.
    #[error("Item {item} would become its own ancestor")]
    CycleDetected { item: ItemId },

    /// Row bookkeeping did not add up after a move. Callers must rebuild.
    #[error("Mirror tree corrupted while updating item {item}: {detail}")]
    Corruption { item: ItemId, detail: String },

    /// The item is not present in the hierarchy store.
    #[error("Item {item} is not in the hierarchy")]
    UnknownItem { item: ItemId },

    /// The column is outside the configured column layout.
    #[error("Invalid column {column} (column count {column_count})")]
    InvalidColumn { column: usize, column_count: usize },
}

impl IndexError {
    /// Returns `true` if the caller must issue a full rebuild.
    pub fn requires_rebuild(&self) -> bool {
        matches!(self, Self::Corruption { .. })
    }
}

/// Errors surfaced to the caller of a reparent request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReparentError {
    /// The move is structurally invalid (self-parenting, sentinel ids, or the
    /// target lies inside the moved subtree).
    #[error("Cannot move item {item} under {new_parent}: {reason}")]
    InvalidTarget {
        item: ItemId,
        new_parent: ItemId,
        reason: &'static str,
    },

    /// Disambiguation between tied handlers was declined.
    #[error("Move of item {item} was cancelled")]
    Cancelled { item: ItemId },

    /// Only the default handler could perform a move touching a virtual branch.
    #[error("Item {item} cannot be moved under {new_parent}: virtual branch is owned by another handler")]
    VirtualBranchViolation { item: ItemId, new_parent: ItemId },

    /// The selected handler reported failure. The store is in whatever state
    /// the handler left it.
    #[error("Handler '{handler}' failed to move item {item}: {source}")]
    HandlerFailed {
        item: ItemId,
        handler: String,
        #[source]
        source: HandlerError,
    },
}

/// Errors raised by owner handlers and the registry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HandlerError {
    /// No handler claimed the item.
    #[error("No owner handler for item {item}")]
    NoOwner { item: ItemId },

    /// The handler refused the operation.
    #[error("Operation on item {item} rejected: {reason}")]
    Rejected { item: ItemId, reason: String },

    /// The store refused a mutation issued by the handler.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl HandlerError {
    /// Create a rejection error.
    pub fn rejected(item: ItemId, reason: impl Into<String>) -> Self {
        Self::Rejected {
            item,
            reason: reason.into(),
        }
    }
}

/// Errors raised by hierarchy store mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The item does not exist.
    #[error("Unknown item {0}")]
    UnknownItem(ItemId),

    /// The requested parent does not exist or cannot hold children.
    #[error("Item {0} cannot be used as a parent")]
    InvalidParent(ItemId),

    /// The move would make an item its own ancestor.
    #[error("Moving item {item} under {new_parent} would create a cycle")]
    WouldCycle { item: ItemId, new_parent: ItemId },

    /// The requested position is outside the parent's child list.
    #[error("Position {position} out of range for {len} siblings")]
    PositionOutOfRange { position: usize, len: usize },

    /// The scene root cannot be moved, renamed away, or removed.
    #[error("The hierarchy root cannot be modified this way")]
    RootImmutable,
}

/// Errors raised while loading index configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("Invalid index configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Two roles were assigned to the same column.
    #[error("Column {column} is assigned to both {first} and {second}")]
    DuplicateColumn {
        column: usize,
        first: &'static str,
        second: &'static str,
    },
}
