//! The tree index: the hierarchy store mirrored as presentation rows.
//!
//! [`TreeIndex`] keeps one row group per item, with one cell per configured
//! column, arranged exactly like the store's forest. It is updated
//! incrementally from store events (see [`EventAdapter`](crate::EventAdapter))
//! and answers item-to-row lookups through a self-healing cache.
//!
//! # Lookups
//!
//! The cache remembers where each item's row was last seen as a (parent,
//! row) position. Sibling insertions and removals shift rows without
//! touching the cache, so every hit is verified against the row's item id;
//! a mismatch falls back to a depth-first search and refreshes the entry.
//!
//! # Removal
//!
//! Children of a row that is about to be removed are parked in an orphan
//! set instead of being destroyed. Once the store has finalized the
//! removal, [`TreeIndex::reconcile_orphans`] re-attaches each parked
//! subtree under the item's current store parent.
//!
//! # Locking
//!
//! Internal state sits behind a `RwLock` that is never held while owner
//! handlers run or while signals are emitted. Handlers invoked while a row
//! is being built may therefore re-enter the index, even for the very item
//! being inserted: such callers see the row as pending.

mod cache;
mod rows;

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use strata_core::logging::{DebugTree, PerfSpan, TreeFormatOptions, TreeFormatter, TreeStyle, targets};

use self::cache::{CacheEntry, OrphanSet, RowCache};
use self::rows::{Cell, RowArena};
use crate::config::IndexConfig;
use crate::error::{IndexError, IndexResult};
use crate::handler::HandlerRegistry;
use crate::hierarchy::{HierarchyStore, ItemId, is_virtual_branch};
use crate::model::{IndexSignals, ItemData, ItemFlags, ItemRole, RowKey, RowRef};

const NON_TRANSFORMABLE_TOOLTIP: &str = "No transform can be directly applied on non-transformable objects,\n\
     however a transform can be chosen to apply it on all the children";

/// Result of a cache-verified lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    Found(RowKey),
    Pending(RowKey),
    Missing,
}

/// Where a freshly inserted row ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Attached(RowKey),
    AwaitingParent(RowKey),
    Pending(RowKey),
}

impl Placement {
    fn key(self) -> RowKey {
        match self {
            Placement::Attached(key) | Placement::AwaitingParent(key) | Placement::Pending(key) => key,
        }
    }
}

struct IndexState {
    arena: RowArena,
    cache: RowCache,
    orphans: OrphanSet,
    /// Detached groups whose store parent could not be resolved.
    awaiting_parent: Vec<RowKey>,
    /// Items whose row was removed ahead of their deletion from the store.
    /// They stay in the store until the matching removal completes and
    /// must not get a row again in the meantime.
    removing: HashSet<ItemId>,
}

impl IndexState {
    fn new(root_cells: Vec<Cell>) -> Self {
        Self {
            arena: RowArena::new(root_cells),
            cache: RowCache::default(),
            orphans: OrphanSet::default(),
            awaiting_parent: Vec::new(),
            removing: HashSet::new(),
        }
    }

    /// Find the row group of an item, trusting the cache only after
    /// verifying it.
    fn lookup(&mut self, item: ItemId) -> Lookup {
        if item == ItemId::ROOT {
            return Lookup::Found(self.arena.root());
        }
        if let Some(entry) = self.cache.get(item) {
            let owns = |key: RowKey| self.arena.get(key).is_some_and(|g| g.item == item);
            match entry {
                CacheEntry::Pending(key) if owns(key) => return Lookup::Pending(key),
                CacheEntry::Placed { parent, row } => {
                    if let Some(&key) = self.arena.children(parent).get(row) {
                        if owns(key) {
                            return Lookup::Found(key);
                        }
                    }
                }
                CacheEntry::Detached(key) if owns(key) && self.arena.parent(key).is_none() => {
                    return Lookup::Found(key);
                }
                _ => {}
            }
            tracing::trace!(target: targets::INDEX, item = %item, "stale cache entry, searching");
        }

        match self.search(item) {
            Some(key) => {
                self.remember(item, key);
                Lookup::Found(key)
            }
            None => {
                self.cache.remove(item);
                Lookup::Missing
            }
        }
    }

    /// Full search: the attached tree first, then every parked subtree.
    fn search(&self, item: ItemId) -> Option<RowKey> {
        self.arena.find(self.arena.root(), item).or_else(|| {
            self.orphans
                .iter()
                .chain(self.awaiting_parent.iter().copied())
                .find_map(|top| self.arena.find(top, item))
        })
    }

    fn remember(&mut self, item: ItemId, key: RowKey) {
        let entry = match (self.arena.parent(key), self.arena.row_of(key)) {
            (Some(parent), Some(row)) => CacheEntry::Placed { parent, row },
            _ => CacheEntry::Detached(key),
        };
        self.cache.set(item, entry);
    }

    fn park_awaiting(&mut self, key: RowKey) {
        if !self.awaiting_parent.contains(&key) {
            self.awaiting_parent.push(key);
        }
    }

    fn forget(&mut self, key: RowKey) {
        self.orphans.remove(key);
        self.awaiting_parent.retain(|k| *k != key);
    }
}

/// Mirror of a [`HierarchyStore`] as a tree of presentation rows.
///
/// All methods take `&self`; the index is meant to be shared behind an
/// `Arc` between the event adapter, the reparent resolver and presentation
/// consumers.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use strata::{HandlerRegistry, IndexConfig, TreeIndex};
/// use strata::hierarchy::{MemoryHierarchy, NewItem};
///
/// let store = Arc::new(MemoryHierarchy::new());
/// let patient = store.create_item(NewItem::new("Jane Doe")).unwrap();
///
/// let index = TreeIndex::new(store.clone(), Arc::new(HandlerRegistry::new()), IndexConfig::default());
/// let row = index.locate(patient, 0).unwrap();
/// assert_eq!(index.parent_of(row), Some(index.root()));
/// ```
pub struct TreeIndex {
    store: Arc<dyn HierarchyStore>,
    registry: Arc<HandlerRegistry>,
    config: IndexConfig,
    column_count: usize,
    state: RwLock<IndexState>,
    signals: IndexSignals,
    resetting: AtomicBool,
}

impl TreeIndex {
    /// Create an index and build the mirror tree from the store's current
    /// contents.
    pub fn new(store: Arc<dyn HierarchyStore>, registry: Arc<HandlerRegistry>, config: IndexConfig) -> Self {
        let column_count = config.column_count();
        let index = Self {
            store,
            registry,
            state: RwLock::new(IndexState::new(Vec::new())),
            column_count,
            config,
            signals: IndexSignals::new(),
            resetting: AtomicBool::new(false),
        };
        index.rebuild_all();
        index
    }

    /// The mirrored store.
    pub fn store(&self) -> &Arc<dyn HierarchyStore> {
        &self.store
    }

    /// The handler registry used to derive row data.
    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// The column layout.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Change notifications of the mirror tree.
    pub fn signals(&self) -> &IndexSignals {
        &self.signals
    }

    // -------------------------------------------------------------------------
    // Incremental maintenance
    // -------------------------------------------------------------------------

    /// Ensure the item has a row and return its column-0 cell.
    ///
    /// Missing ancestors are materialized first, outermost first. If the
    /// item's parent chain ends in an item without a parent, the rows are
    /// still created but left detached and `OrphanedItem` is returned;
    /// attachment is retried on the next [`refresh`](Self::refresh).
    pub fn upsert_row(&self, item: ItemId) -> IndexResult<RowRef> {
        if item == ItemId::ROOT {
            return Ok(self.root());
        }
        if !item.is_valid() || !self.store.contains(item) {
            return Err(IndexError::UnknownItem { item });
        }

        let existing = self.state.write().lookup(item);
        let placement = match existing {
            Lookup::Pending(key) => Placement::Pending(key),
            Lookup::Found(key) => self.retry_attach(item, key)?,
            Lookup::Missing => {
                let mut last = None;
                for id in self.missing_ancestors(item)? {
                    last = Some(self.insert_one(id)?);
                }
                match last {
                    Some(placement) => placement,
                    None => return Err(IndexError::UnknownItem { item }),
                }
            }
        };

        let key = placement.key();
        let attached = self.state.read().arena.is_attached(key);
        if !attached && placement != Placement::Pending(key) {
            tracing::warn!(target: targets::INDEX, item = %item, "no resolvable parent, row kept detached");
            return Err(IndexError::OrphanedItem { item });
        }
        self.retry_awaiting_children_of(item);
        Ok(RowRef::new(key, 0))
    }

    /// Re-derive the cells of an item's row and move the row if the item's
    /// parent or position changed in the store.
    ///
    /// The move is a single detach and insert of the whole row group.
    /// A row-count mismatch after the move is reported as `Corruption`; the
    /// caller must then issue [`rebuild_all`](Self::rebuild_all).
    pub fn refresh(&self, item: ItemId) -> IndexResult<()> {
        if item == ItemId::ROOT {
            return Ok(());
        }
        if !self.store.contains(item) {
            return Err(IndexError::UnknownItem { item });
        }

        let existing = self.state.write().lookup(item);
        let key = match existing {
            Lookup::Pending(_) => {
                tracing::trace!(target: targets::INDEX, item = %item, "refresh of pending row skipped");
                return Ok(());
            }
            Lookup::Missing => return self.upsert_row(item).map(|_| ()),
            Lookup::Found(key) => key,
        };

        let cells = self.derive_cells(item);
        let changed = {
            let mut state = self.state.write();
            match state.arena.get_mut(key) {
                Some(group) if group.cells != cells => {
                    group.cells = cells;
                    true
                }
                Some(_) => false,
                None => return Ok(()),
            }
        };
        if changed {
            self.emit_data_changed(key);
        }

        self.relocate(item, key)
    }

    /// Remove the row of an item that is about to be deleted from the store.
    ///
    /// Child row groups are detached one at a time into the orphan set
    /// before the row itself is deleted, so no descendant row is lost.
    pub fn remove_subtree(&self, item: ItemId) -> IndexResult<()> {
        if item == ItemId::ROOT {
            return Ok(());
        }

        let (key, parent, row, child_count, visible) = {
            let mut state = self.state.write();
            let key = match state.lookup(item) {
                Lookup::Found(key) | Lookup::Pending(key) => key,
                Lookup::Missing => return Ok(()),
            };
            (
                key,
                state.arena.parent(key),
                state.arena.row_of(key),
                state.arena.children(key).len(),
                state.arena.is_attached(key),
            )
        };

        let emit_rows = visible && self.row_signals_enabled();
        if emit_rows {
            if child_count > 0 {
                self.signals
                    .rows_about_to_be_removed
                    .emit((RowRef::new(key, 0), 0, child_count - 1));
            }
            if let (Some(parent), Some(row)) = (parent, row) {
                self.signals
                    .rows_about_to_be_removed
                    .emit((RowRef::new(parent, 0), row, row));
            }
        }

        let orphaned = {
            let mut state = self.state.write();
            let children = state.arena.children(key).to_vec();
            for child in &children {
                state.arena.detach(*child);
                state.orphans.push(*child);
                if let Some(child_item) = state.arena.get(*child).map(|g| g.item) {
                    state.cache.set(child_item, CacheEntry::Detached(*child));
                }
            }
            state.arena.remove(key);
            state.forget(key);
            state.cache.remove(item);
            state.removing.insert(item);
            children.len()
        };
        tracing::trace!(target: targets::INDEX, item = %item, orphaned, "row removed");

        if emit_rows {
            if child_count > 0 {
                self.signals.rows_removed.emit((RowRef::new(key, 0), 0, child_count - 1));
            }
            if let (Some(parent), Some(row)) = (parent, row) {
                self.signals.rows_removed.emit((RowRef::new(parent, 0), row, row));
            }
        }
        Ok(())
    }

    /// Re-attach every parked orphan under its item's current store parent.
    ///
    /// Orphans already re-attached by a racing refresh are skipped. Orphans
    /// whose item is gone from the store are discarded and their own
    /// children are rescued in turn. The orphan set is empty afterwards.
    pub fn reconcile_orphans(&self) -> IndexResult<()> {
        let _span = PerfSpan::new("reconcile_orphans");
        let mut worklist: Vec<RowKey> = {
            let mut state = self.state.write();
            state.removing.clear();
            state.orphans.iter().collect()
        };
        worklist.reverse();
        let (mut reattached, mut discarded) = (0usize, 0usize);

        while let Some(key) = worklist.pop() {
            let (item, has_parent) = {
                let state = self.state.read();
                match state.arena.get(key) {
                    Some(group) => (group.item, group.parent.is_some()),
                    None => continue,
                }
            };
            if has_parent {
                continue;
            }

            if !self.store.contains(item) {
                let mut state = self.state.write();
                let children = state.arena.children(key).to_vec();
                for child in children.iter().rev() {
                    state.arena.detach(*child);
                    state.orphans.push(*child);
                    worklist.push(*child);
                }
                state.arena.remove(key);
                state.forget(key);
                state.cache.remove(item);
                discarded += 1;
                tracing::warn!(target: targets::INDEX, item = %item, "orphaned row's item is gone, row discarded");
                continue;
            }

            let parent_key = self.resolve_parent_row(item).unwrap_or_else(|| self.root_key());
            let placed = {
                let mut state = self.state.write();
                if !state.arena.contains(key) || state.arena.parent(key).is_some() {
                    None
                } else {
                    let target = if state.arena.contains(parent_key)
                        && parent_key != key
                        && !state.arena.is_ancestor(key, parent_key)
                    {
                        parent_key
                    } else {
                        state.arena.root()
                    };
                    let row = self.desired_row(&state, target, item, key);
                    let placed = state.arena.attach(key, target, row);
                    if let Some(row) = placed {
                        state.cache.set(item, CacheEntry::Placed { parent: target, row });
                        state.awaiting_parent.retain(|k| *k != key);
                    }
                    placed.map(|row| (target, row, state.arena.is_attached(target)))
                }
            };
            if let Some((target, row, visible)) = placed {
                reattached += 1;
                if visible {
                    self.emit_inserted(target, row);
                }
            }
        }

        let leftover = self.state.write().orphans.take().len();
        tracing::debug!(target: targets::INDEX, reattached, discarded, leftover, "orphans reconciled");
        Ok(())
    }

    /// Discard the mirror tree and rebuild it from the store, parents first.
    ///
    /// Returns the number of item rows built. Rebuilding twice without an
    /// intervening store change yields identical trees.
    pub fn rebuild_all(&self) -> usize {
        let _span = PerfSpan::new("rebuild_all");
        self.signals.emit_reset(|| {
            self.resetting.store(true, Ordering::SeqCst);
            *self.state.write() = IndexState::new(self.root_cells());

            let mut built = 0;
            for item in self.store.descendants(self.store.root_item()) {
                match self.insert_one(item) {
                    Ok(Placement::Attached(_)) | Ok(Placement::Pending(_)) => built += 1,
                    Ok(Placement::AwaitingParent(_)) => {
                        tracing::warn!(target: targets::INDEX, item = %item, "row left detached during rebuild");
                    }
                    Err(err) => {
                        tracing::warn!(target: targets::INDEX, item = %item, %err, "item skipped during rebuild");
                    }
                }
            }
            self.resetting.store(false, Ordering::SeqCst);
            let cached = self.state.read().cache.len();
            tracing::debug!(target: targets::INDEX, rows = built, cached, "mirror tree rebuilt");
            built
        })
    }

    // -------------------------------------------------------------------------
    // Presentation queries
    // -------------------------------------------------------------------------

    /// The column-0 cell of the mirror root row.
    pub fn root(&self) -> RowRef {
        RowRef::new(self.root_key(), 0)
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Number of item rows, excluding the root row.
    pub fn len(&self) -> usize {
        self.state.read().arena.len() - 1
    }

    /// Returns `true` if only the root row exists.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find the cell of an item in a column.
    ///
    /// Returns `None` for unknown items, rows still being inserted, and
    /// columns outside the layout.
    pub fn locate(&self, item: ItemId, column: usize) -> Option<RowRef> {
        if column >= self.column_count {
            return None;
        }
        match self.state.write().lookup(item) {
            Lookup::Found(key) => Some(RowRef::new(key, column)),
            Lookup::Pending(_) | Lookup::Missing => None,
        }
    }

    /// Like [`locate`](Self::locate), reporting why the lookup failed.
    pub fn cell(&self, item: ItemId, column: usize) -> IndexResult<RowRef> {
        if column >= self.column_count {
            return Err(IndexError::InvalidColumn {
                column,
                column_count: self.column_count,
            });
        }
        self.locate(item, column).ok_or(IndexError::UnknownItem { item })
    }

    /// All cells of an item's row, one per column.
    pub fn indexes(&self, item: ItemId) -> Vec<RowRef> {
        match self.locate(item, 0) {
            Some(row) => (0..self.column_count).map(|c| row.sibling(c)).collect(),
            None => Vec::new(),
        }
    }

    /// Returns `true` if the item has a row (pending rows included).
    pub fn contains_row(&self, item: ItemId) -> bool {
        self.state.write().lookup(item) != Lookup::Missing
    }

    /// Number of child rows. Only column-0 cells have children.
    pub fn row_count(&self, parent: RowRef) -> usize {
        if parent.column() != 0 {
            return 0;
        }
        self.state.read().arena.children(parent.key()).len()
    }

    /// The cell at `row`, `column` under a column-0 parent cell.
    pub fn child(&self, parent: RowRef, row: usize, column: usize) -> Option<RowRef> {
        if parent.column() != 0 || column >= self.column_count {
            return None;
        }
        let state = self.state.read();
        state
            .arena
            .children(parent.key())
            .get(row)
            .map(|key| RowRef::new(*key, column))
    }

    /// The column-0 cell of the parent row; `None` for the root and for
    /// detached rows.
    pub fn parent_of(&self, row: RowRef) -> Option<RowRef> {
        self.state
            .read()
            .arena
            .parent(row.key())
            .map(|key| RowRef::new(key, 0))
    }

    /// Position of a row under its parent.
    pub fn row_index(&self, row: RowRef) -> Option<usize> {
        self.state.read().arena.row_of(row.key())
    }

    /// The item mirrored by a row.
    pub fn item_of(&self, row: RowRef) -> Option<ItemId> {
        self.state.read().arena.get(row.key()).map(|g| g.item)
    }

    /// Data of a cell for a role.
    pub fn data(&self, row: RowRef, role: ItemRole) -> ItemData {
        let state = self.state.read();
        let Some(group) = state.arena.get(row.key()) else {
            return ItemData::None;
        };
        let Some(cell) = group.cells.get(row.column()) else {
            return ItemData::None;
        };
        let non_empty = |text: &str| {
            if text.is_empty() {
                ItemData::None
            } else {
                ItemData::from(text)
            }
        };
        match role {
            ItemRole::Display => ItemData::from(cell.text.as_str()),
            ItemRole::Decoration => ItemData::from(cell.icon.clone()),
            ItemRole::ToolTip => non_empty(&cell.tooltip),
            ItemRole::WhatsThis => non_empty(&cell.whats_this),
            ItemRole::Visibility => ItemData::from(cell.visibility),
            ItemRole::ItemId => ItemData::from(group.item),
            ItemRole::TransformId => ItemData::from(cell.transform_id.clone()),
        }
    }

    /// Interaction flags of a cell.
    ///
    /// Name and transform cells are editable. Every item but the root can
    /// be dragged. Items accept drops unless their parent is a virtual
    /// branch, whose children are owned by the branch's handler.
    pub fn flags(&self, row: RowRef) -> ItemFlags {
        let (item, parent_item) = {
            let state = self.state.read();
            let Some(group) = state.arena.get(row.key()) else {
                return ItemFlags::default();
            };
            let parent_item = group.parent.and_then(|p| state.arena.get(p)).map(|g| g.item);
            (group.item, parent_item)
        };

        let column = Some(row.column());
        let mut flags = ItemFlags::new();
        if can_be_a_child(item) {
            flags = flags
                .with_editable(column == self.config.name_column || column == self.config.transform_column)
                .with_drag(true);
        }
        let store = self.store.as_ref();
        let mut drop = can_be_a_parent(item) || is_virtual_branch(store, item);
        if parent_item.is_some_and(|p| is_virtual_branch(store, p)) {
            drop = false;
        }
        flags.with_drop(drop)
    }

    /// Depth-first listing of the attached tree: (depth, item, column-0 text).
    /// The root row comes first at depth 0.
    pub fn snapshot(&self) -> Vec<(usize, ItemId, String)> {
        let state = self.state.read();
        state
            .arena
            .walk(state.arena.root())
            .into_iter()
            .filter_map(|(depth, key)| {
                let group = state.arena.get(key)?;
                let text = group.cells.first().map(|c| c.text.clone()).unwrap_or_default();
                Some((depth, group.item, text))
            })
            .collect()
    }

    /// Number of row groups parked in the orphan set.
    pub fn orphan_count(&self) -> usize {
        self.state.read().orphans.len()
    }

    /// Number of detached rows waiting for their parent to resolve.
    pub fn awaiting_parent_count(&self) -> usize {
        self.state.read().awaiting_parent.len()
    }

    /// Render the mirror tree as indented text for diagnostics.
    pub fn format_tree(&self) -> String {
        TreeFormatter::with_options(TreeFormatOptions {
            style: TreeStyle::Ascii,
            ..Default::default()
        })
        .format(self)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn root_key(&self) -> RowKey {
        self.state.read().arena.root()
    }

    fn root_cells(&self) -> Vec<Cell> {
        let mut cells = vec![Cell::default(); self.column_count];
        if let Some(cell) = self.config.name_column.and_then(|c| cells.get_mut(c)) {
            cell.text = self.config.root_label.clone();
        }
        cells
    }

    fn row_signals_enabled(&self) -> bool {
        !self.resetting.load(Ordering::SeqCst)
    }

    fn emit_inserted(&self, parent: RowKey, row: usize) {
        if self.row_signals_enabled() {
            self.signals.rows_inserted.emit((RowRef::new(parent, 0), row, row));
        }
    }

    fn emit_data_changed(&self, key: RowKey) {
        if self.row_signals_enabled() {
            let last = self.column_count.saturating_sub(1);
            self.signals.data_changed.emit((
                RowRef::new(key, 0),
                RowRef::new(key, last),
                vec![ItemRole::Display, ItemRole::Decoration, ItemRole::ToolTip, ItemRole::Visibility],
            ));
        }
    }

    /// Items from the outermost ancestor without a row down to `item`.
    fn missing_ancestors(&self, item: ItemId) -> IndexResult<Vec<ItemId>> {
        let mut chain = vec![item];
        let mut seen = HashSet::from([item]);
        let mut current = item;
        while let Some(parent) = self.store.parent(current) {
            if parent == ItemId::ROOT {
                break;
            }
            if !seen.insert(parent) {
                tracing::error!(target: targets::INDEX, item = %item, ancestor = %parent, "item is its own ancestor");
                return Err(IndexError::CycleDetected { item });
            }
            if self.state.write().lookup(parent) != Lookup::Missing {
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        Ok(chain)
    }

    /// Two-phase insert of a single row.
    ///
    /// The row is first registered as pending, then its cells are derived
    /// with no lock held, then it is attached.
    fn insert_one(&self, item: ItemId) -> IndexResult<Placement> {
        if item == ItemId::ROOT {
            return Ok(Placement::Attached(self.root_key()));
        }
        let key = {
            let mut state = self.state.write();
            match state.lookup(item) {
                Lookup::Pending(key) => return Ok(Placement::Pending(key)),
                Lookup::Found(key) => {
                    drop(state);
                    return self.retry_attach(item, key);
                }
                Lookup::Missing => {}
            }
            let key = state
                .arena
                .insert_detached(item, vec![Cell::default(); self.column_count]);
            state.cache.set(item, CacheEntry::Pending(key));
            key
        };
        tracing::trace!(target: targets::INDEX, item = %item, "row pending");

        let cells = self.derive_cells(item);
        self.place(item, key, Some(cells))
    }

    /// Attach a detached group under the row of its store parent.
    fn place(&self, item: ItemId, key: RowKey, cells: Option<Vec<Cell>>) -> IndexResult<Placement> {
        let parent_item = self.store.parent(item);

        let mut state = self.state.write();
        let Some(group) = state.arena.get_mut(key) else {
            state.cache.remove(item);
            return Err(IndexError::UnknownItem { item });
        };
        if let Some(cells) = cells {
            group.cells = cells;
        }

        let parent_key = match parent_item {
            Some(ItemId::ROOT) => Some(state.arena.root()),
            Some(parent) => match state.lookup(parent) {
                Lookup::Found(k) | Lookup::Pending(k) => Some(k),
                Lookup::Missing => None,
            },
            None => None,
        };
        let Some(parent_key) = parent_key else {
            state.cache.set(item, CacheEntry::Detached(key));
            state.park_awaiting(key);
            return Ok(Placement::AwaitingParent(key));
        };

        let row = self.desired_row(&state, parent_key, item, key);
        let Some(row) = state.arena.attach(key, parent_key, row) else {
            state.cache.set(item, CacheEntry::Detached(key));
            state.park_awaiting(key);
            tracing::error!(target: targets::INDEX, item = %item, "parent row lies inside the item's own subtree");
            return Err(IndexError::CycleDetected { item });
        };
        state.awaiting_parent.retain(|k| *k != key);
        state.cache.set(item, CacheEntry::Placed { parent: parent_key, row });
        let visible = state.arena.is_attached(parent_key);
        drop(state);

        tracing::trace!(target: targets::INDEX, item = %item, row, "row attached");
        if visible {
            self.emit_inserted(parent_key, row);
        }
        Ok(Placement::Attached(key))
    }

    fn retry_attach(&self, item: ItemId, key: RowKey) -> IndexResult<Placement> {
        let attached = self.state.read().arena.parent(key).is_some();
        if attached {
            return Ok(Placement::Attached(key));
        }
        self.place(item, key, None)
    }

    /// Attach rows that were waiting for `parent` to get a row.
    fn retry_awaiting_children_of(&self, parent: ItemId) {
        let waiting: Vec<(RowKey, ItemId)> = {
            let state = self.state.read();
            state
                .awaiting_parent
                .iter()
                .filter_map(|key| state.arena.get(*key).map(|g| (*key, g.item)))
                .collect()
        };
        for (key, item) in waiting {
            if self.store.parent(item) == Some(parent) {
                if let Err(err) = self.place(item, key, None) {
                    tracing::warn!(target: targets::INDEX, item = %item, %err, "retrying attachment failed");
                }
            }
        }
    }

    /// Row of the item's store parent, materializing it if needed.
    ///
    /// A parent whose row was removed ahead of its deletion is never
    /// materialized again.
    fn resolve_parent_row(&self, item: ItemId) -> Option<RowKey> {
        let parent = self.store.parent(item)?;
        let (existing, removing) = {
            let mut state = self.state.write();
            (state.lookup(parent), state.removing.contains(&parent))
        };
        match existing {
            Lookup::Found(key) | Lookup::Pending(key) => Some(key),
            Lookup::Missing if removing => None,
            Lookup::Missing => match self.upsert_row(parent) {
                Ok(row) => Some(row.key()),
                Err(err) => {
                    tracing::warn!(target: targets::INDEX, item = %item, parent = %parent, %err, "parent row unavailable");
                    None
                }
            },
        }
    }

    /// Move a row group to match the item's store parent and position.
    fn relocate(&self, item: ItemId, key: RowKey) -> IndexResult<()> {
        let Some(store_parent) = self.store.parent(item) else {
            let detached = self.state.read().arena.parent(key).is_none();
            return if detached {
                Err(IndexError::OrphanedItem { item })
            } else {
                Ok(())
            };
        };
        if self.state.read().removing.contains(&store_parent) {
            // Parked until reconcile_orphans re-homes the row.
            tracing::trace!(target: targets::INDEX, item = %item, parent = %store_parent, "parent is being removed, row stays put");
            return Ok(());
        }
        let Some(parent_key) = self.resolve_parent_row(item) else {
            return Err(IndexError::OrphanedItem { item });
        };

        let mut state = self.state.write();
        if !state.arena.contains(key) || !state.arena.contains(parent_key) {
            return Ok(());
        }
        if parent_key == key || state.arena.is_ancestor(key, parent_key) {
            tracing::error!(target: targets::INDEX, item = %item, "move would put the row inside its own subtree");
            return Err(IndexError::CycleDetected { item });
        }

        let current_parent = state.arena.parent(key);
        let current_row = state.arena.row_of(key);
        let desired = self.desired_row(&state, parent_key, item, key);
        if current_parent == Some(parent_key) && current_row == Some(desired) {
            state.cache.set(item, CacheEntry::Placed { parent: parent_key, row: desired });
            return Ok(());
        }

        let old_count = current_parent.map(|p| state.arena.children(p).len());
        let new_count = state.arena.children(parent_key).len();
        let from = state.arena.detach(key);
        let landed = state.arena.attach(key, parent_key, desired);

        let new_after = state.arena.children(parent_key).len();
        let consistent = match (from, landed) {
            (Some((old_parent, _)), Some(row)) if old_parent == parent_key => {
                new_after == new_count && state.arena.children(parent_key).get(row) == Some(&key)
            }
            (Some((old_parent, _)), Some(row)) => {
                old_count == Some(state.arena.children(old_parent).len() + 1)
                    && new_after == new_count + 1
                    && state.arena.children(parent_key).get(row) == Some(&key)
            }
            (None, Some(row)) => {
                new_after == new_count + 1 && state.arena.children(parent_key).get(row) == Some(&key)
            }
            (_, None) => false,
        };
        let Some(row) = landed.filter(|_| consistent) else {
            tracing::error!(target: targets::INDEX, item = %item, "row counts do not add up after move");
            return Err(IndexError::Corruption {
                item,
                detail: format!("expected {new_count} rows under the new parent before the move, found {new_after} after"),
            });
        };

        state.awaiting_parent.retain(|k| *k != key);
        state.orphans.remove(key);
        state.cache.set(item, CacheEntry::Placed { parent: parent_key, row });
        let visible = state.arena.is_attached(parent_key);
        let was_visible = from.is_some_and(|(old_parent, _)| state.arena.is_attached(old_parent));
        drop(state);

        tracing::trace!(target: targets::INDEX, item = %item, row, "row moved");
        if self.row_signals_enabled() {
            match from {
                Some((old_parent, old_row)) if visible && was_visible => self.signals.rows_moved.emit((
                    RowRef::new(old_parent, 0),
                    old_row,
                    RowRef::new(parent_key, 0),
                    row,
                )),
                _ if visible => self.emit_inserted(parent_key, row),
                _ => {}
            }
        }
        Ok(())
    }

    /// Row at which `item` belongs under `parent`: the number of other
    /// sibling rows whose items come earlier in the store.
    ///
    /// Runs under the index lock and only queries the store.
    fn desired_row(&self, state: &IndexState, parent: RowKey, item: ItemId, key: RowKey) -> usize {
        let target = self.store.position_under_parent(item).unwrap_or(usize::MAX);
        state
            .arena
            .children(parent)
            .iter()
            .filter(|sibling| **sibling != key)
            .filter_map(|sibling| state.arena.get(*sibling))
            .filter(|group| {
                self.store
                    .position_under_parent(group.item)
                    .is_some_and(|position| position < target)
            })
            .count()
    }

    /// Derive every column of an item's row from its owner handler.
    ///
    /// Must be called with no lock held: handlers may re-enter the index.
    fn derive_cells(&self, item: ItemId) -> Vec<Cell> {
        let store = self.store.as_ref();
        let presentation = self.registry.presentation(store, item);
        let object = store.data_object(item);
        let mut cells = vec![Cell::default(); self.column_count];

        if let Some(cell) = self.config.name_column.and_then(|c| cells.get_mut(c)) {
            cell.text = presentation.display_name.clone();
            cell.tooltip = presentation.tooltip.clone();
            cell.icon = Some(presentation.icon.clone());
            cell.whats_this = presentation.owner.clone();
        }
        if let Some(cell) = self.config.visibility_column.and_then(|c| cells.get_mut(c)) {
            cell.visibility = Some(presentation.visibility);
            cell.icon = presentation.visibility_icon.clone();
        }
        if let Some(cell) = self.config.transform_column.and_then(|c| cells.get_mut(c)) {
            cell.whats_this = "Transform".to_string();
            match object.as_ref().filter(|o| o.is_transformable()) {
                Some(object) => {
                    if let Some(transform) = object.parent_transform() {
                        cell.tooltip = format!("{} ({})", transform.name, transform.id);
                        cell.text = transform.name;
                        cell.transform_id = Some(transform.id);
                    }
                }
                None => cell.tooltip = NON_TRANSFORMABLE_TOOLTIP.to_string(),
            }
        }
        if let Some(cell) = self.config.id_column.and_then(|c| cells.get_mut(c)) {
            if let Some(object) = &object {
                cell.text = object.object_id();
            }
        }
        cells
    }
}

fn can_be_a_child(item: ItemId) -> bool {
    !item.is_sentinel()
}

fn can_be_a_parent(item: ItemId) -> bool {
    item.is_valid()
}

impl DebugTree for TreeIndex {
    type Node = RowKey;

    fn debug_roots(&self) -> Vec<RowKey> {
        let state = self.state.read();
        std::iter::once(state.arena.root())
            .chain(state.orphans.iter())
            .chain(state.awaiting_parent.iter().copied())
            .collect()
    }

    fn debug_label(&self, node: RowKey) -> String {
        let state = self.state.read();
        match state.arena.get(node) {
            Some(group) => {
                let text = group.cells.first().map(|c| c.text.as_str()).unwrap_or_default();
                if group.parent.is_none() && node != state.arena.root() {
                    format!("{text} [{}] (detached)", group.item)
                } else {
                    format!("{text} [{}]", group.item)
                }
            }
            None => "<dangling>".to_string(),
        }
    }

    fn debug_children(&self, node: RowKey) -> Vec<RowKey> {
        self.state.read().arena.children(node).to_vec()
    }
}

static_assertions::assert_impl_all!(TreeIndex: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::adapter::EventAdapter;
    use crate::error::StoreResult;
    use crate::handler::OwnerHandler;
    use crate::hierarchy::{
        DataObject, HierarchyEvent, MemoryHierarchy, NewItem, RemoveMode, TransformRef, attributes,
    };
    use parking_lot::Mutex;
    use strata_core::Signal;

    fn setup() -> (Arc<MemoryHierarchy>, TreeIndex) {
        let store = Arc::new(MemoryHierarchy::new());
        let index = TreeIndex::new(store.clone(), Arc::new(HandlerRegistry::new()), IndexConfig::default());
        (store, index)
    }

    fn parent_item(index: &TreeIndex, item: ItemId) -> Option<ItemId> {
        let row = index.locate(item, 0)?;
        index.parent_of(row).and_then(|p| index.item_of(p))
    }

    fn child_items(index: &TreeIndex, item: ItemId) -> Vec<ItemId> {
        let Some(row) = index.locate(item, 0) else {
            return Vec::new();
        };
        (0..index.row_count(row))
            .filter_map(|r| index.child(row, r, 0).and_then(|c| index.item_of(c)))
            .collect()
    }

    #[test]
    fn test_initial_build_mirrors_store() {
        let store = Arc::new(MemoryHierarchy::new());
        let a = store.create_item(NewItem::new("A")).unwrap();
        let b = store.create_item(NewItem::new("B").parent(a)).unwrap();
        let index = TreeIndex::new(store.clone(), Arc::new(HandlerRegistry::new()), IndexConfig::default());

        assert_eq!(index.len(), 2);
        assert_eq!(parent_item(&index, b), Some(a));
        assert_eq!(parent_item(&index, a), Some(ItemId::ROOT));
        assert_eq!(index.data(index.root(), ItemRole::Display).as_string(), Some("Root"));
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let (store, index) = setup();
        let a = store.create_item(NewItem::new("A")).unwrap();

        let first = index.upsert_row(a).unwrap();
        let second = index.upsert_row(a).unwrap();
        assert_eq!(first, second);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_upsert_materializes_ancestors() {
        let (store, index) = setup();
        let a = store.create_item(NewItem::new("A")).unwrap();
        let b = store.create_item(NewItem::new("B").parent(a)).unwrap();
        let c = store.create_item(NewItem::new("C").parent(b)).unwrap();

        index.upsert_row(c).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(parent_item(&index, c), Some(b));
        assert_eq!(parent_item(&index, b), Some(a));
    }

    #[test]
    fn test_upsert_inserts_at_store_position() {
        let (store, index) = setup();
        let a = store.create_item(NewItem::new("A")).unwrap();
        let c = store.create_item(NewItem::new("C")).unwrap();
        index.upsert_row(a).unwrap();
        index.upsert_row(c).unwrap();

        let b = store.create_item(NewItem::new("B").position(1)).unwrap();
        index.upsert_row(b).unwrap();
        assert_eq!(child_items(&index, ItemId::ROOT), vec![a, b, c]);
    }

    #[test]
    fn test_upsert_unknown_item() {
        let (_store, index) = setup();
        let ghost = ItemId::from_raw(42);
        assert_eq!(index.upsert_row(ghost), Err(IndexError::UnknownItem { item: ghost }));
        assert!(index.locate(ghost, 0).is_none());
    }

    #[test]
    fn test_stale_cache_heals() {
        let (store, index) = setup();
        let a = store.create_item(NewItem::new("A")).unwrap();
        index.upsert_row(a).unwrap();
        let row = index.locate(a, 0).unwrap();

        // A sibling inserted in front shifts A without touching its cache entry.
        let b = store.create_item(NewItem::new("B").position(0)).unwrap();
        index.upsert_row(b).unwrap();
        assert_eq!(
            index.state.read().cache.get(a),
            Some(CacheEntry::Placed { parent: index.root_key(), row: 0 })
        );

        assert_eq!(index.locate(a, 0), Some(row));
        assert_eq!(index.item_of(row), Some(a));
        assert_eq!(
            index.state.read().cache.get(a),
            Some(CacheEntry::Placed { parent: index.root_key(), row: 1 })
        );
    }

    #[test]
    fn test_locate_columns_share_row() {
        let (store, index) = setup();
        let a = store.create_item(NewItem::new("A")).unwrap();
        index.upsert_row(a).unwrap();

        let name = index.locate(a, 0).unwrap();
        let visibility = index.locate(a, 1).unwrap();
        assert_eq!(visibility, name.sibling(1));
        assert!(index.locate(a, 3).is_none());
        assert_eq!(
            index.cell(a, 3),
            Err(IndexError::InvalidColumn { column: 3, column_count: 3 })
        );
        assert_eq!(index.indexes(a).len(), 3);
    }

    #[test]
    fn test_refresh_moves_row_group() {
        let (store, index) = setup();
        let a = store.create_item(NewItem::new("A")).unwrap();
        let b = store.create_item(NewItem::new("B")).unwrap();
        let c = store.create_item(NewItem::new("C").parent(a)).unwrap();
        index.rebuild_all();

        let moves = Arc::new(Mutex::new(0));
        let sink = moves.clone();
        index.signals().rows_moved.connect(move |_| *sink.lock() += 1);

        store.set_parent(c, b).unwrap();
        index.refresh(c).unwrap();

        assert_eq!(parent_item(&index, c), Some(b));
        assert!(child_items(&index, a).is_empty());
        assert_eq!(*moves.lock(), 1);
    }

    #[test]
    fn test_refresh_reorders() {
        let (store, index) = setup();
        let a = store.create_item(NewItem::new("A")).unwrap();
        let b = store.create_item(NewItem::new("B")).unwrap();
        let c = store.create_item(NewItem::new("C")).unwrap();
        index.rebuild_all();

        store.move_item(c, 0).unwrap();
        index.refresh(c).unwrap();
        assert_eq!(child_items(&index, ItemId::ROOT), vec![c, a, b]);
    }

    #[test]
    fn test_refresh_updates_cells() {
        let (store, index) = setup();
        let a = store.create_item(NewItem::new("A")).unwrap();
        index.rebuild_all();

        let changes = Arc::new(Mutex::new(0));
        let sink = changes.clone();
        index.signals().data_changed.connect(move |_| *sink.lock() += 1);

        store.set_name(a, "Renamed").unwrap();
        index.refresh(a).unwrap();
        index.refresh(a).unwrap();

        let row = index.locate(a, 0).unwrap();
        assert_eq!(index.data(row, ItemRole::Display).as_string(), Some("Renamed"));
        assert_eq!(*changes.lock(), 1);
    }

    #[test]
    fn test_remove_subtree_parks_children() {
        let (store, index) = setup();
        let p = store.create_item(NewItem::new("P")).unwrap();
        let c1 = store.create_item(NewItem::new("C1").parent(p)).unwrap();
        let c2 = store.create_item(NewItem::new("C2").parent(p)).unwrap();
        index.rebuild_all();

        index.remove_subtree(p).unwrap();
        assert_eq!(index.orphan_count(), 2);
        assert!(index.locate(p, 0).is_none());
        let c1_row = index.locate(c1, 0).unwrap();
        assert_eq!(index.parent_of(c1_row), None);

        store.remove_item(p, RemoveMode::KeepChildren).unwrap();
        index.reconcile_orphans().unwrap();

        assert_eq!(index.orphan_count(), 0);
        assert_eq!(parent_item(&index, c1), Some(ItemId::ROOT));
        assert_eq!(child_items(&index, ItemId::ROOT), vec![c1, c2]);
    }

    #[test]
    fn test_reconcile_discards_vanished_items() {
        let (store, index) = setup();
        let p = store.create_item(NewItem::new("P")).unwrap();
        let c = store.create_item(NewItem::new("C").parent(p)).unwrap();
        let g = store.create_item(NewItem::new("G").parent(c)).unwrap();
        index.rebuild_all();

        index.remove_subtree(p).unwrap();
        // C vanished from the store without its own removal notification.
        store.remove_item(p, RemoveMode::KeepChildren).unwrap();
        store.remove_item(c, RemoveMode::KeepChildren).unwrap();
        index.reconcile_orphans().unwrap();

        assert!(!index.contains_row(c));
        assert_eq!(parent_item(&index, g), Some(ItemId::ROOT));
        assert_eq!(index.orphan_count(), 0);
    }

    #[test]
    fn test_reconcile_skips_reattached_orphans() {
        let (store, index) = setup();
        let x = store.create_item(NewItem::new("X")).unwrap();
        let p = store.create_item(NewItem::new("P")).unwrap();
        let c = store.create_item(NewItem::new("C").parent(p)).unwrap();
        index.rebuild_all();

        index.remove_subtree(p).unwrap();
        store.set_parent(c, x).unwrap();
        index.refresh(c).unwrap();
        assert_eq!(parent_item(&index, c), Some(x));

        store.remove_item(p, RemoveMode::KeepChildren).unwrap();
        index.reconcile_orphans().unwrap();
        assert_eq!(parent_item(&index, c), Some(x));
        assert_eq!(index.orphan_count(), 0);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let (store, index) = setup();
        let a = store.create_item(NewItem::new("A")).unwrap();
        store.create_item(NewItem::new("B").parent(a)).unwrap();
        store.create_item(NewItem::new("C")).unwrap();

        index.rebuild_all();
        let first = index.snapshot();
        index.rebuild_all();
        assert_eq!(index.snapshot(), first);
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn test_rebuild_suppresses_row_signals() {
        let (store, index) = setup();
        store.create_item(NewItem::new("A")).unwrap();

        let inserted = Arc::new(Mutex::new(0));
        let resets = Arc::new(Mutex::new(0));
        let sink = inserted.clone();
        index.signals().rows_inserted.connect(move |_| *sink.lock() += 1);
        let sink = resets.clone();
        index.signals().model_reset.connect(move |_| *sink.lock() += 1);

        assert_eq!(index.rebuild_all(), 1);
        assert_eq!(*inserted.lock(), 0);
        assert_eq!(*resets.lock(), 1);
    }

    struct Reentrant {
        index: Mutex<Option<Arc<TreeIndex>>>,
        seen_pending: Mutex<Vec<bool>>,
    }

    impl OwnerHandler for Reentrant {
        fn name(&self) -> &str {
            "Reentrant"
        }

        fn can_own(&self, _store: &dyn HierarchyStore, item: ItemId) -> f64 {
            let index = self.index.lock().clone();
            if let Some(index) = index {
                // The row under construction must read as pending, and an
                // upsert for it must not create a second row.
                self.seen_pending.lock().push(index.locate(item, 0).is_none());
                let _ = index.upsert_row(item);
            }
            0.5
        }
    }

    #[test]
    fn test_reentrant_lookup_sees_pending_row() {
        let store = Arc::new(MemoryHierarchy::new());
        let registry = Arc::new(HandlerRegistry::new());
        let handler = Arc::new(Reentrant {
            index: Mutex::new(None),
            seen_pending: Mutex::new(Vec::new()),
        });
        registry.register(handler.clone());
        let index = Arc::new(TreeIndex::new(store.clone(), registry, IndexConfig::names_only()));
        *handler.index.lock() = Some(index.clone());

        let a = store.create_item(NewItem::new("A")).unwrap();
        index.upsert_row(a).unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(*handler.seen_pending.lock(), vec![true]);
        *handler.index.lock() = None;
    }

    struct Transformable;

    impl DataObject for Transformable {
        fn object_id(&self) -> String {
            "Volume1".to_string()
        }

        fn class_name(&self) -> &str {
            "Volume"
        }

        fn display_visibility(&self) -> i32 {
            1
        }

        fn is_transformable(&self) -> bool {
            true
        }

        fn parent_transform(&self) -> Option<TransformRef> {
            Some(TransformRef::new("Transform3", "Registration"))
        }
    }

    #[test]
    fn test_cell_data() {
        let store = Arc::new(MemoryHierarchy::new());
        let object: Arc<dyn DataObject> = Arc::new(Transformable);
        let a = store
            .create_item(NewItem::new("Volume").level("Series").data_object(&object))
            .unwrap();
        let plain = store.create_item(NewItem::new("Folder")).unwrap();
        let config = IndexConfig {
            id_column: Some(3),
            ..Default::default()
        };
        let index = TreeIndex::new(store.clone(), Arc::new(HandlerRegistry::new()), config);

        let name = index.locate(a, 0).unwrap();
        assert_eq!(index.data(name, ItemRole::Display).as_string(), Some("Volume"));
        assert_eq!(index.data(name, ItemRole::ToolTip).as_string(), Some("Series: Volume"));
        assert_eq!(index.data(name, ItemRole::ItemId).as_id(), Some(a));
        assert_eq!(index.data(name, ItemRole::WhatsThis).as_string(), Some("Default"));

        let visibility = name.sibling(1);
        assert_eq!(index.data(visibility, ItemRole::Visibility).as_int(), Some(1));

        let transform = name.sibling(2);
        assert_eq!(index.data(transform, ItemRole::Display).as_string(), Some("Registration"));
        assert_eq!(index.data(transform, ItemRole::TransformId).as_string(), Some("Transform3"));

        assert_eq!(index.data(name.sibling(3), ItemRole::Display).as_string(), Some("Volume1"));

        let plain_transform = index.locate(plain, 2).unwrap();
        assert_eq!(
            index.data(plain_transform, ItemRole::ToolTip).as_string(),
            Some(NON_TRANSFORMABLE_TOOLTIP)
        );
        drop(object);
    }

    #[test]
    fn test_flags() {
        let (store, index) = setup();
        let seg = store
            .create_item(NewItem::new("Seg").attribute(attributes::VIRTUAL_BRANCH, "1"))
            .unwrap();
        let segment = store.create_item(NewItem::new("Segment").parent(seg)).unwrap();
        index.rebuild_all();

        let root_flags = index.flags(index.root());
        assert!(root_flags.drop_enabled && !root_flags.drag_enabled && !root_flags.editable);

        let seg_row = index.locate(seg, 0).unwrap();
        let flags = index.flags(seg_row);
        assert!(flags.editable && flags.drag_enabled && flags.drop_enabled);
        assert!(!index.flags(seg_row.sibling(1)).editable);
        assert!(index.flags(seg_row.sibling(2)).editable);

        let segment_flags = index.flags(index.locate(segment, 0).unwrap());
        assert!(segment_flags.drag_enabled);
        assert!(!segment_flags.drop_enabled);
    }

    #[test]
    fn test_format_tree() {
        let (store, index) = setup();
        let a = store.create_item(NewItem::new("A")).unwrap();
        store.create_item(NewItem::new("B").parent(a)).unwrap();
        index.rebuild_all();

        let text = index.format_tree();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Root [#root]");
        assert!(lines[1].ends_with("A [#2]"));
        assert!(lines[2].ends_with("B [#3]"));
    }

    #[test]
    fn test_refresh_during_removal_leaves_parent_row_gone() {
        let (store, index) = setup();
        let r = store.create_item(NewItem::new("R")).unwrap();
        let p = store.create_item(NewItem::new("P").parent(r)).unwrap();
        let c = store.create_item(NewItem::new("C").parent(p)).unwrap();
        index.rebuild_all();

        index.remove_subtree(p).unwrap();
        store.set_name(c, "Renamed").unwrap();
        index.refresh(c).unwrap();
        assert!(!index.contains_row(p));
        assert_eq!(index.orphan_count(), 1);

        store.remove_item(p, RemoveMode::KeepChildren).unwrap();
        index.reconcile_orphans().unwrap();

        assert!(!index.contains_row(p));
        assert_eq!(index.len(), store.len());
        assert_eq!(parent_item(&index, c), Some(r));
        let row = index.locate(c, 0).unwrap();
        assert_eq!(index.data(row, ItemRole::Display).as_string(), Some("Renamed"));
    }

    /// Store whose parent links can be overridden to simulate a broken
    /// hierarchy.
    #[derive(Default)]
    struct Rewired {
        inner: MemoryHierarchy,
        parents: Mutex<HashMap<ItemId, Option<ItemId>>>,
    }

    impl Rewired {
        fn rewire(&self, item: ItemId, parent: Option<ItemId>) {
            self.parents.lock().insert(item, parent);
        }

        fn restore(&self, item: ItemId) {
            self.parents.lock().remove(&item);
        }
    }

    impl HierarchyStore for Rewired {
        fn contains(&self, item: ItemId) -> bool {
            self.inner.contains(item)
        }

        fn parent(&self, item: ItemId) -> Option<ItemId> {
            match self.parents.lock().get(&item) {
                Some(parent) => *parent,
                None => self.inner.parent(item),
            }
        }

        fn children(&self, item: ItemId) -> Vec<ItemId> {
            self.inner.children(item)
        }

        fn position_under_parent(&self, item: ItemId) -> Option<usize> {
            self.inner.position_under_parent(item)
        }

        fn name(&self, item: ItemId) -> Option<String> {
            self.inner.name(item)
        }

        fn level(&self, item: ItemId) -> Option<String> {
            self.inner.level(item)
        }

        fn attribute(&self, item: ItemId, name: &str) -> Option<String> {
            self.inner.attribute(item, name)
        }

        fn set_attribute(&self, item: ItemId, name: &str, value: &str) -> StoreResult<()> {
            self.inner.set_attribute(item, name, value)
        }

        fn remove_attribute(&self, item: ItemId, name: &str) -> StoreResult<()> {
            self.inner.remove_attribute(item, name)
        }

        fn data_object(&self, item: ItemId) -> Option<Arc<dyn DataObject>> {
            self.inner.data_object(item)
        }

        fn owner_handler(&self, item: ItemId) -> String {
            self.inner.owner_handler(item)
        }

        fn set_owner_handler(&self, item: ItemId, handler: &str) -> StoreResult<()> {
            self.inner.set_owner_handler(item, handler)
        }

        fn set_name(&self, item: ItemId, name: &str) -> StoreResult<()> {
            self.inner.set_name(item, name)
        }

        fn set_parent(&self, item: ItemId, new_parent: ItemId) -> StoreResult<()> {
            self.inner.set_parent(item, new_parent)
        }

        fn move_item(&self, item: ItemId, new_position: usize) -> StoreResult<()> {
            self.inner.move_item(item, new_position)
        }

        fn events(&self) -> &Signal<HierarchyEvent> {
            self.inner.events()
        }
    }

    fn rewired_setup() -> (Arc<Rewired>, TreeIndex) {
        let store = Arc::new(Rewired::default());
        let index = TreeIndex::new(store.clone(), Arc::new(HandlerRegistry::new()), IndexConfig::default());
        (store, index)
    }

    #[test]
    fn test_orphaned_item_attaches_on_next_refresh() {
        let (store, index) = rewired_setup();
        let a = store.inner.create_item(NewItem::new("A")).unwrap();
        store.rewire(a, None);

        assert_eq!(index.upsert_row(a), Err(IndexError::OrphanedItem { item: a }));
        assert_eq!(index.awaiting_parent_count(), 1);
        let detached = index.locate(a, 0).unwrap();
        assert_eq!(index.parent_of(detached), None);
        assert_eq!(index.refresh(a), Err(IndexError::OrphanedItem { item: a }));

        store.restore(a);
        index.refresh(a).unwrap();
        assert_eq!(index.awaiting_parent_count(), 0);
        assert_eq!(parent_item(&index, a), Some(ItemId::ROOT));
        assert_eq!(child_items(&index, ItemId::ROOT), vec![a]);
    }

    #[test]
    fn test_cyclic_parents_are_refused() {
        let (store, index) = rewired_setup();
        let a = store.inner.create_item(NewItem::new("A")).unwrap();
        let b = store.inner.create_item(NewItem::new("B")).unwrap();

        store.rewire(a, Some(a));
        assert_eq!(index.upsert_row(a), Err(IndexError::CycleDetected { item: a }));

        store.rewire(a, Some(b));
        store.rewire(b, Some(a));
        assert_eq!(index.upsert_row(a), Err(IndexError::CycleDetected { item: a }));
        assert!(!index.contains_row(a));
        assert!(!index.contains_row(b));
        assert!(index.is_empty());
    }

    #[test]
    fn test_corruption_triggers_rebuild_through_adapter() {
        let store = Arc::new(MemoryHierarchy::new());
        let index = Arc::new(TreeIndex::new(
            store.clone(),
            Arc::new(HandlerRegistry::new()),
            IndexConfig::default(),
        ));
        let adapter = EventAdapter::new(index.clone());
        let a = store.create_item(NewItem::new("A")).unwrap();
        let b = store.create_item(NewItem::new("B")).unwrap();
        let resets = Arc::new(Mutex::new(0));
        let sink = resets.clone();
        index.signals().model_reset.connect(move |_| *sink.lock() += 1);

        // B claims A as parent while still listed under the root.
        let (a_key, b_key) = (index.locate(a, 0).unwrap().key(), index.locate(b, 0).unwrap().key());
        if let Some(group) = index.state.write().arena.get_mut(b_key) {
            group.parent = Some(a_key);
        }
        assert!(matches!(index.refresh(b), Err(IndexError::Corruption { item, .. }) if item == b));

        adapter.handle(HierarchyEvent::ItemModified(b));
        assert_eq!(*resets.lock(), 1);
        assert_eq!(index.len(), 2);
        assert_eq!(parent_item(&index, b), Some(ItemId::ROOT));
        assert_eq!(child_items(&index, ItemId::ROOT), vec![a, b]);
        assert!(child_items(&index, a).is_empty());
    }
}
