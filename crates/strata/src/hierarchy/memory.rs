//! In-memory hierarchy store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use strata_core::Signal;
use strata_core::logging::targets;

use super::{DataObject, HierarchyEvent, HierarchyStore, ItemId};
use crate::error::{StoreError, StoreResult};

/// Description of an item to create in a [`MemoryHierarchy`].
///
/// # Example
///
/// ```
/// use strata::hierarchy::{HierarchyStore, MemoryHierarchy, NewItem};
///
/// let store = MemoryHierarchy::new();
/// let patient = store.create_item(NewItem::new("Jane Doe").level("Patient")).unwrap();
/// let study = store
///     .create_item(NewItem::new("CT chest").level("Study").parent(patient))
///     .unwrap();
///
/// assert_eq!(store.parent(study), Some(patient));
/// ```
#[derive(Clone, Default)]
pub struct NewItem {
    name: String,
    level: String,
    parent: Option<ItemId>,
    position: Option<usize>,
    attributes: Vec<(String, String)>,
    data_object: Option<Weak<dyn DataObject>>,
    owner: String,
}

impl NewItem {
    /// An item with the given name, placed last under the scene root.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the level tag.
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Set the parent item.
    pub fn parent(mut self, parent: ItemId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Insert at a position among the parent's children instead of last.
    pub fn position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    /// Add a string attribute.
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Associate a domain object. Only a weak reference is kept.
    pub fn data_object(mut self, object: &Arc<dyn DataObject>) -> Self {
        self.data_object = Some(Arc::downgrade(object));
        self
    }

    /// Record an owner handler name up front.
    pub fn owner(mut self, handler: impl Into<String>) -> Self {
        self.owner = handler.into();
        self
    }
}

/// How [`MemoryHierarchy::remove_item`] treats the children of the removed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoveMode {
    /// Remove the whole subtree, deepest items first. Every item raises its
    /// own removal events.
    #[default]
    RemoveChildren,
    /// Re-home the children under the removed item's parent, at the removed
    /// item's position. Children raise no events of their own.
    KeepChildren,
}

struct ItemRecord {
    name: String,
    level: String,
    parent: Option<ItemId>,
    children: Vec<ItemId>,
    attributes: HashMap<String, String>,
    data_object: Option<Weak<dyn DataObject>>,
    owner: String,
}

impl ItemRecord {
    fn root() -> Self {
        Self {
            name: "Scene".to_string(),
            level: "Scene".to_string(),
            parent: None,
            children: Vec::new(),
            attributes: HashMap::new(),
            data_object: None,
            owner: String::new(),
        }
    }
}

struct HierarchyState {
    items: HashMap<ItemId, ItemRecord>,
}

impl HierarchyState {
    fn new() -> Self {
        let mut items = HashMap::new();
        items.insert(ItemId::ROOT, ItemRecord::root());
        Self { items }
    }

    fn record(&self, item: ItemId) -> StoreResult<&ItemRecord> {
        self.items.get(&item).ok_or(StoreError::UnknownItem(item))
    }

    fn record_mut(&mut self, item: ItemId) -> StoreResult<&mut ItemRecord> {
        self.items.get_mut(&item).ok_or(StoreError::UnknownItem(item))
    }

    fn is_ancestor(&self, ancestor: ItemId, item: ItemId) -> bool {
        let mut current = self.items.get(&item).and_then(|r| r.parent);
        let mut steps = 0;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.items.len() {
                return false;
            }
            current = self.items.get(&id).and_then(|r| r.parent);
        }
        false
    }

    fn detach(&mut self, item: ItemId) -> Option<(ItemId, usize)> {
        let parent = self.items.get(&item)?.parent?;
        let siblings = &mut self.items.get_mut(&parent)?.children;
        let position = siblings.iter().position(|c| *c == item)?;
        siblings.remove(position);
        Some((parent, position))
    }
}

/// A thread-safe in-memory [`HierarchyStore`].
///
/// The scene root ([`ItemId::ROOT`]) always exists. Mutations update the
/// state under a write lock, release it, and then emit the matching
/// [`HierarchyEvent`] so that slots may query the store freely.
pub struct MemoryHierarchy {
    state: RwLock<HierarchyState>,
    next_id: AtomicU64,
    batch_depth: AtomicUsize,
    events: Signal<HierarchyEvent>,
}

impl Default for MemoryHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHierarchy {
    /// Create a store holding only the scene root.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(HierarchyState::new()),
            next_id: AtomicU64::new(ItemId::ROOT.as_raw() + 1),
            batch_depth: AtomicUsize::new(0),
            events: Signal::new(),
        }
    }

    /// Number of items, excluding the scene root.
    pub fn len(&self) -> usize {
        self.state.read().items.len() - 1
    }

    /// Returns `true` if only the scene root exists.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create an item and emit `ItemAdded`.
    pub fn create_item(&self, spec: NewItem) -> StoreResult<ItemId> {
        let parent = spec.parent.unwrap_or(ItemId::ROOT);
        let id = {
            let mut state = self.state.write();
            let siblings = &state
                .items
                .get(&parent)
                .ok_or(StoreError::InvalidParent(parent))?
                .children;
            let position = match spec.position {
                Some(p) if p > siblings.len() => {
                    return Err(StoreError::PositionOutOfRange {
                        position: p,
                        len: siblings.len(),
                    });
                }
                Some(p) => p,
                None => siblings.len(),
            };

            let id = ItemId::from_raw(self.next_id.fetch_add(1, Ordering::Relaxed));
            state.items.insert(
                id,
                ItemRecord {
                    name: spec.name,
                    level: spec.level,
                    parent: Some(parent),
                    children: Vec::new(),
                    attributes: spec.attributes.into_iter().collect(),
                    data_object: spec.data_object,
                    owner: spec.owner,
                },
            );
            state.record_mut(parent)?.children.insert(position, id);
            id
        };

        tracing::trace!(target: targets::STORE, item = %id, parent = %parent, "item created");
        self.events.emit(HierarchyEvent::ItemAdded(id));
        Ok(id)
    }

    /// Remove an item.
    ///
    /// The item stays fully queryable while `ItemAboutToBeRemoved` is being
    /// delivered.
    pub fn remove_item(&self, item: ItemId, mode: RemoveMode) -> StoreResult<()> {
        if item == ItemId::ROOT {
            return Err(StoreError::RootImmutable);
        }
        if !self.contains(item) {
            return Err(StoreError::UnknownItem(item));
        }

        if mode == RemoveMode::RemoveChildren {
            for child in self.children(item) {
                self.remove_item(child, RemoveMode::RemoveChildren)?;
            }
        }

        self.events.emit(HierarchyEvent::ItemAboutToBeRemoved(item));
        {
            let mut state = self.state.write();
            let detached = state.detach(item);
            let record = state
                .items
                .remove(&item)
                .ok_or(StoreError::UnknownItem(item))?;
            if let Some((parent, position)) = detached {
                for child in &record.children {
                    if let Some(child_record) = state.items.get_mut(child) {
                        child_record.parent = Some(parent);
                    }
                }
                let siblings = &mut state.record_mut(parent)?.children;
                let tail = siblings.split_off(position);
                siblings.extend(record.children.iter().copied());
                siblings.extend(tail);
            } else {
                // An unparented item cannot re-home its children; they are
                // dropped with it.
                for child in record.children {
                    if let Some(child_record) = state.items.get_mut(&child) {
                        child_record.parent = None;
                    }
                }
            }
        }

        tracing::trace!(target: targets::STORE, item = %item, ?mode, "item removed");
        self.events.emit(HierarchyEvent::ItemRemoved(item));
        Ok(())
    }

    /// Replace (or clear) the associated domain object.
    pub fn set_data_object(&self, item: ItemId, object: Option<&Arc<dyn DataObject>>) -> StoreResult<()> {
        self.state.write().record_mut(item)?.data_object = object.map(Arc::downgrade);
        self.events.emit(HierarchyEvent::ItemModified(item));
        Ok(())
    }

    /// Open a batch window. Windows nest; only the outermost emits.
    pub fn begin_batch(&self) {
        if self.batch_depth.fetch_add(1, Ordering::SeqCst) == 0 {
            tracing::debug!(target: targets::STORE, "batch started");
            self.events.emit(HierarchyEvent::BatchStarted);
        }
    }

    /// Close a batch window opened with [`begin_batch`](Self::begin_batch).
    pub fn end_batch(&self) {
        let previous = self
            .batch_depth
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |d| d.checked_sub(1));
        if previous == Ok(1) {
            tracing::debug!(target: targets::STORE, "batch ended");
            self.events.emit(HierarchyEvent::BatchEnded);
        }
    }

    /// Run a bulk import inside a batch window, then emit `Imported`.
    ///
    /// The closure receives the store so it can create items whose parents
    /// were created earlier in the same import.
    pub fn import<R>(&self, build: impl FnOnce(&Self) -> R) -> R {
        self.begin_batch();
        let result = build(self);
        self.end_batch();
        tracing::debug!(target: targets::STORE, items = self.len(), "scene imported");
        self.events.emit(HierarchyEvent::Imported);
        result
    }

    /// Drop every item except the scene root, then emit `Closed`.
    pub fn close(&self) {
        {
            let mut state = self.state.write();
            *state = HierarchyState::new();
        }
        tracing::debug!(target: targets::STORE, "scene closed");
        self.events.emit(HierarchyEvent::Closed);
    }

    fn modify<F>(&self, item: ItemId, apply: F) -> StoreResult<()>
    where
        F: FnOnce(&mut ItemRecord) -> bool,
    {
        let changed = apply(self.state.write().record_mut(item)?);
        if changed {
            self.events.emit(HierarchyEvent::ItemModified(item));
        }
        Ok(())
    }
}

impl HierarchyStore for MemoryHierarchy {
    fn contains(&self, item: ItemId) -> bool {
        self.state.read().items.contains_key(&item)
    }

    fn parent(&self, item: ItemId) -> Option<ItemId> {
        self.state.read().items.get(&item)?.parent
    }

    fn children(&self, item: ItemId) -> Vec<ItemId> {
        self.state
            .read()
            .items
            .get(&item)
            .map(|r| r.children.clone())
            .unwrap_or_default()
    }

    fn position_under_parent(&self, item: ItemId) -> Option<usize> {
        let state = self.state.read();
        let parent = state.items.get(&item)?.parent?;
        state.items.get(&parent)?.children.iter().position(|c| *c == item)
    }

    fn child_at(&self, parent: ItemId, position: usize) -> Option<ItemId> {
        self.state.read().items.get(&parent)?.children.get(position).copied()
    }

    fn name(&self, item: ItemId) -> Option<String> {
        self.state.read().items.get(&item).map(|r| r.name.clone())
    }

    fn level(&self, item: ItemId) -> Option<String> {
        self.state.read().items.get(&item).map(|r| r.level.clone())
    }

    fn attribute(&self, item: ItemId, name: &str) -> Option<String> {
        self.state.read().items.get(&item)?.attributes.get(name).cloned()
    }

    fn set_attribute(&self, item: ItemId, name: &str, value: &str) -> StoreResult<()> {
        self.modify(item, |record| {
            let previous = record.attributes.insert(name.to_string(), value.to_string());
            previous.as_deref() != Some(value)
        })
    }

    fn remove_attribute(&self, item: ItemId, name: &str) -> StoreResult<()> {
        self.modify(item, |record| record.attributes.remove(name).is_some())
    }

    fn data_object(&self, item: ItemId) -> Option<Arc<dyn DataObject>> {
        self.state.read().items.get(&item)?.data_object.as_ref()?.upgrade()
    }

    fn owner_handler(&self, item: ItemId) -> String {
        self.state
            .read()
            .items
            .get(&item)
            .map(|r| r.owner.clone())
            .unwrap_or_default()
    }

    fn set_owner_handler(&self, item: ItemId, handler: &str) -> StoreResult<()> {
        self.modify(item, |record| {
            if record.owner == handler {
                return false;
            }
            record.owner = handler.to_string();
            true
        })
    }

    fn set_name(&self, item: ItemId, name: &str) -> StoreResult<()> {
        if item == ItemId::ROOT {
            return Err(StoreError::RootImmutable);
        }
        self.modify(item, |record| {
            if record.name == name {
                return false;
            }
            record.name = name.to_string();
            true
        })
    }

    fn set_parent(&self, item: ItemId, new_parent: ItemId) -> StoreResult<()> {
        if item == ItemId::ROOT {
            return Err(StoreError::RootImmutable);
        }
        {
            let mut state = self.state.write();
            let current = state.record(item)?.parent;
            state
                .items
                .get(&new_parent)
                .ok_or(StoreError::InvalidParent(new_parent))?;
            if new_parent == item || state.is_ancestor(item, new_parent) {
                return Err(StoreError::WouldCycle { item, new_parent });
            }
            if current == Some(new_parent) {
                return Ok(());
            }
            state.detach(item);
            state.record_mut(new_parent)?.children.push(item);
            state.record_mut(item)?.parent = Some(new_parent);
        }

        tracing::trace!(target: targets::STORE, item = %item, new_parent = %new_parent, "item reparented");
        self.events.emit(HierarchyEvent::ItemModified(item));
        Ok(())
    }

    fn move_item(&self, item: ItemId, new_position: usize) -> StoreResult<()> {
        if item == ItemId::ROOT {
            return Err(StoreError::RootImmutable);
        }
        {
            let mut state = self.state.write();
            let parent = state
                .record(item)?
                .parent
                .ok_or(StoreError::InvalidParent(ItemId::INVALID))?;
            let siblings = &mut state.record_mut(parent)?.children;
            if new_position >= siblings.len() {
                return Err(StoreError::PositionOutOfRange {
                    position: new_position,
                    len: siblings.len(),
                });
            }
            let current = siblings
                .iter()
                .position(|c| *c == item)
                .ok_or(StoreError::UnknownItem(item))?;
            if current == new_position {
                return Ok(());
            }
            siblings.remove(current);
            siblings.insert(new_position, item);
        }

        tracing::trace!(target: targets::STORE, item = %item, new_position, "item moved");
        self.events.emit(HierarchyEvent::ItemModified(item));
        Ok(())
    }

    fn events(&self) -> &Signal<HierarchyEvent> {
        &self.events
    }

    fn is_batch_processing(&self) -> bool {
        self.batch_depth.load(Ordering::SeqCst) > 0
    }
}

static_assertions::assert_impl_all!(MemoryHierarchy: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recorder(store: &MemoryHierarchy) -> Arc<Mutex<Vec<HierarchyEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        store.events().connect(move |event| sink.lock().push(*event));
        events
    }

    struct Volume;

    impl DataObject for Volume {
        fn object_id(&self) -> String {
            "vtkMRMLScalarVolumeNode1".to_string()
        }

        fn class_name(&self) -> &str {
            "ScalarVolume"
        }
    }

    #[test]
    fn test_create_and_query() {
        let store = MemoryHierarchy::new();
        let events = recorder(&store);

        let a = store.create_item(NewItem::new("A").level("Folder")).unwrap();
        let b = store.create_item(NewItem::new("B").parent(a).attribute("k", "v")).unwrap();
        let c = store.create_item(NewItem::new("C").parent(a).position(0)).unwrap();

        assert_eq!(store.children(a), vec![c, b]);
        assert_eq!(store.position_under_parent(b), Some(1));
        assert_eq!(store.child_at(a, 0), Some(c));
        assert_eq!(store.level(a).as_deref(), Some("Folder"));
        assert_eq!(store.attribute(b, "k").as_deref(), Some("v"));
        assert_eq!(store.len(), 3);
        assert_eq!(
            *events.lock(),
            vec![
                HierarchyEvent::ItemAdded(a),
                HierarchyEvent::ItemAdded(b),
                HierarchyEvent::ItemAdded(c)
            ]
        );
    }

    #[test]
    fn test_ids_are_not_reused() {
        let store = MemoryHierarchy::new();
        let a = store.create_item(NewItem::new("A")).unwrap();
        store.remove_item(a, RemoveMode::RemoveChildren).unwrap();
        let b = store.create_item(NewItem::new("B")).unwrap();
        assert_ne!(a, b);
        assert!(!store.contains(a));
    }

    #[test]
    fn test_create_under_unknown_parent() {
        let store = MemoryHierarchy::new();
        let err = store
            .create_item(NewItem::new("A").parent(ItemId::from_raw(99)))
            .unwrap_err();
        assert_eq!(err, StoreError::InvalidParent(ItemId::from_raw(99)));
    }

    #[test]
    fn test_remove_keep_children_rehomes_in_place() {
        let store = MemoryHierarchy::new();
        let x = store.create_item(NewItem::new("X")).unwrap();
        let p = store.create_item(NewItem::new("P")).unwrap();
        let y = store.create_item(NewItem::new("Y")).unwrap();
        let c1 = store.create_item(NewItem::new("C1").parent(p)).unwrap();
        let c2 = store.create_item(NewItem::new("C2").parent(p)).unwrap();
        let events = recorder(&store);

        store.remove_item(p, RemoveMode::KeepChildren).unwrap();

        assert_eq!(store.children(ItemId::ROOT), vec![x, c1, c2, y]);
        assert_eq!(store.parent(c1), Some(ItemId::ROOT));
        assert_eq!(
            *events.lock(),
            vec![
                HierarchyEvent::ItemAboutToBeRemoved(p),
                HierarchyEvent::ItemRemoved(p)
            ]
        );
    }

    #[test]
    fn test_remove_children_deepest_first() {
        let store = MemoryHierarchy::new();
        let p = store.create_item(NewItem::new("P")).unwrap();
        let c = store.create_item(NewItem::new("C").parent(p)).unwrap();
        let g = store.create_item(NewItem::new("G").parent(c)).unwrap();
        let events = recorder(&store);

        store.remove_item(p, RemoveMode::RemoveChildren).unwrap();

        assert!(store.is_empty());
        let removed: Vec<ItemId> = events
            .lock()
            .iter()
            .filter_map(|e| match e {
                HierarchyEvent::ItemRemoved(id) => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(removed, vec![g, c, p]);
    }

    #[test]
    fn test_item_queryable_during_about_to_be_removed() {
        let store = Arc::new(MemoryHierarchy::new());
        let p = store.create_item(NewItem::new("P")).unwrap();
        let seen = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(&store);
        let sink = seen.clone();
        store.events().connect(move |event| {
            if let HierarchyEvent::ItemAboutToBeRemoved(id) = event {
                if let Some(store) = weak.upgrade() {
                    *sink.lock() = store.name(*id);
                }
            }
        });

        store.remove_item(p, RemoveMode::KeepChildren).unwrap();
        assert_eq!(seen.lock().as_deref(), Some("P"));
    }

    #[test]
    fn test_root_is_immutable() {
        let store = MemoryHierarchy::new();
        assert_eq!(
            store.remove_item(ItemId::ROOT, RemoveMode::RemoveChildren),
            Err(StoreError::RootImmutable)
        );
        assert_eq!(store.set_name(ItemId::ROOT, "x"), Err(StoreError::RootImmutable));
        assert_eq!(
            store.set_parent(ItemId::ROOT, ItemId::ROOT),
            Err(StoreError::RootImmutable)
        );
    }

    #[test]
    fn test_set_parent_rejects_cycle() {
        let store = MemoryHierarchy::new();
        let a = store.create_item(NewItem::new("A")).unwrap();
        let b = store.create_item(NewItem::new("B").parent(a)).unwrap();

        assert_eq!(
            store.set_parent(a, b),
            Err(StoreError::WouldCycle { item: a, new_parent: b })
        );
        assert_eq!(store.set_parent(a, a), Err(StoreError::WouldCycle { item: a, new_parent: a }));
        assert_eq!(store.parent(b), Some(a));
    }

    #[test]
    fn test_set_parent_appends_and_emits() {
        let store = MemoryHierarchy::new();
        let a = store.create_item(NewItem::new("A")).unwrap();
        let b = store.create_item(NewItem::new("B")).unwrap();
        let c = store.create_item(NewItem::new("C").parent(b)).unwrap();
        let events = recorder(&store);

        store.set_parent(a, b).unwrap();
        store.set_parent(a, b).unwrap();

        assert_eq!(store.children(b), vec![c, a]);
        assert_eq!(*events.lock(), vec![HierarchyEvent::ItemModified(a)]);
    }

    #[test]
    fn test_move_item() {
        let store = MemoryHierarchy::new();
        let a = store.create_item(NewItem::new("A")).unwrap();
        let b = store.create_item(NewItem::new("B")).unwrap();
        let c = store.create_item(NewItem::new("C")).unwrap();

        store.move_item(c, 0).unwrap();
        assert_eq!(store.children(ItemId::ROOT), vec![c, a, b]);
        assert_eq!(
            store.move_item(a, 3),
            Err(StoreError::PositionOutOfRange { position: 3, len: 3 })
        );
    }

    #[test]
    fn test_setters_emit_only_on_change() {
        let store = MemoryHierarchy::new();
        let a = store.create_item(NewItem::new("A")).unwrap();
        let events = recorder(&store);

        store.set_attribute(a, "k", "v").unwrap();
        store.set_attribute(a, "k", "v").unwrap();
        store.remove_attribute(a, "missing").unwrap();
        store.set_name(a, "A").unwrap();
        store.set_owner_handler(a, "Folder").unwrap();
        store.set_owner_handler(a, "Folder").unwrap();

        assert_eq!(events.lock().len(), 2);
    }

    #[test]
    fn test_data_object_is_weak() {
        let store = MemoryHierarchy::new();
        let object: Arc<dyn DataObject> = Arc::new(Volume);
        let a = store.create_item(NewItem::new("A").data_object(&object)).unwrap();

        assert_eq!(
            store.data_object(a).map(|o| o.class_name().to_string()).as_deref(),
            Some("ScalarVolume")
        );
        drop(object);
        assert!(store.data_object(a).is_none());
    }

    #[test]
    fn test_nested_batches_emit_once() {
        let store = MemoryHierarchy::new();
        let events = recorder(&store);

        store.begin_batch();
        store.begin_batch();
        assert!(store.is_batch_processing());
        store.end_batch();
        assert!(store.is_batch_processing());
        store.end_batch();
        store.end_batch();
        assert!(!store.is_batch_processing());

        assert_eq!(
            *events.lock(),
            vec![HierarchyEvent::BatchStarted, HierarchyEvent::BatchEnded]
        );
    }

    #[test]
    fn test_import_and_close() {
        let store = MemoryHierarchy::new();
        let events = recorder(&store);

        let count = store.import(|s| {
            let a = s.create_item(NewItem::new("A")).unwrap();
            s.create_item(NewItem::new("B").parent(a)).unwrap();
            s.len()
        });
        assert_eq!(count, 2);
        assert_eq!(events.lock().last(), Some(&HierarchyEvent::Imported));
        assert_eq!(events.lock().first(), Some(&HierarchyEvent::BatchStarted));

        store.close();
        assert!(store.is_empty());
        assert!(store.contains(ItemId::ROOT));
        assert_eq!(events.lock().last(), Some(&HierarchyEvent::Closed));
    }

    #[test]
    fn test_descendants_and_ancestry() {
        let store = MemoryHierarchy::new();
        let a = store.create_item(NewItem::new("A")).unwrap();
        let b = store.create_item(NewItem::new("B").parent(a)).unwrap();
        let c = store.create_item(NewItem::new("C").parent(b)).unwrap();
        let d = store.create_item(NewItem::new("D").parent(a)).unwrap();

        assert_eq!(store.descendants(a), vec![b, c, d]);
        assert!(store.is_ancestor(a, c));
        assert!(!store.is_ancestor(c, a));
        assert!(store.is_ancestor(ItemId::ROOT, d));
    }
}
