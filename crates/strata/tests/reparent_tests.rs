//! End-to-end tests of handler-mediated moves.

use std::sync::Arc;

use parking_lot::Mutex;
use strata::handler::{DisambiguationRequest, OwnerHandler};
use strata::hierarchy::{HierarchyStore, ItemId, MemoryHierarchy, NewItem, attributes};
use strata::{
    EventAdapter, HandlerError, HandlerId, HandlerRegistry, IndexConfig, ReparentError, ReparentOutcome,
    ReparentResolver, TreeIndex,
};

/// Claims every move with a fixed confidence and counts its invocations.
struct CountingMover {
    name: &'static str,
    confidence: f64,
    calls: Mutex<usize>,
}

impl CountingMover {
    fn new(name: &'static str, confidence: f64) -> Arc<Self> {
        Arc::new(Self {
            name,
            confidence,
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

impl OwnerHandler for CountingMover {
    fn name(&self) -> &str {
        self.name
    }

    fn can_own(&self, _store: &dyn HierarchyStore, _item: ItemId) -> f64 {
        0.0
    }

    fn can_reparent(&self, _store: &dyn HierarchyStore, _item: ItemId, _new_parent: ItemId) -> f64 {
        self.confidence
    }

    fn reparent(&self, store: &dyn HierarchyStore, item: ItemId, new_parent: ItemId) -> Result<(), HandlerError> {
        *self.calls.lock() += 1;
        store.set_parent(item, new_parent)?;
        Ok(())
    }
}

struct Fixture {
    store: Arc<MemoryHierarchy>,
    registry: Arc<HandlerRegistry>,
    index: Arc<TreeIndex>,
    resolver: ReparentResolver,
    _adapter: EventAdapter,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryHierarchy::new());
    let registry = Arc::new(HandlerRegistry::new());
    let index = Arc::new(TreeIndex::new(store.clone(), registry.clone(), IndexConfig::default()));
    let adapter = EventAdapter::new(index.clone());
    let resolver = ReparentResolver::new(store.clone(), registry.clone());
    Fixture {
        store,
        registry,
        index,
        resolver,
        _adapter: adapter,
    }
}

fn decline(_: &DisambiguationRequest) -> Option<HandlerId> {
    None
}

fn mirror_parent(index: &TreeIndex, item: ItemId) -> Option<ItemId> {
    let row = index.locate(item, 0)?;
    index.item_of(index.parent_of(row)?)
}

#[test]
fn test_cycle_rejection_leaves_state_untouched() {
    let f = fixture();
    let a = f.store.create_item(NewItem::new("A")).unwrap();
    let b = f.store.create_item(NewItem::new("B").parent(a)).unwrap();
    let c = f.store.create_item(NewItem::new("C").parent(b)).unwrap();
    let before = f.index.snapshot();

    for target in [b, c] {
        let err = f.resolver.request(a, target, &decline).unwrap_err();
        assert!(matches!(err, ReparentError::InvalidTarget { item, .. } if item == a));
    }

    assert_eq!(f.store.parent(a), Some(ItemId::ROOT));
    assert_eq!(f.index.snapshot(), before);
}

#[test]
fn test_tie_break_invokes_chosen_handler_once() {
    let f = fixture();
    let first = CountingMover::new("Volumes", 0.8);
    let second = CountingMover::new("Markups", 0.8);
    f.registry.register(first.clone());
    let second_id = f.registry.register(second.clone());
    let x = f.store.create_item(NewItem::new("X")).unwrap();
    let y = f.store.create_item(NewItem::new("Y")).unwrap();

    let asked = Mutex::new(Vec::new());
    let choose_second = |request: &DisambiguationRequest| {
        asked.lock().push(request.candidates.iter().map(|c| c.name.clone()).collect::<Vec<_>>());
        Some(second_id)
    };
    let outcome = f.resolver.request(x, y, &choose_second).unwrap();

    assert_eq!(outcome, ReparentOutcome::Moved { handler: second_id });
    assert_eq!(*asked.lock(), vec![vec!["Volumes".to_string(), "Markups".to_string()]]);
    assert_eq!(second.calls(), 1);
    assert_eq!(first.calls(), 0);
    assert_eq!(mirror_parent(&f.index, x), Some(y));
}

#[test]
fn test_cancelled_tie_changes_nothing() {
    let f = fixture();
    let first = CountingMover::new("Volumes", 0.8);
    let second = CountingMover::new("Markups", 0.8);
    f.registry.register(first.clone());
    f.registry.register(second.clone());
    let x = f.store.create_item(NewItem::new("X")).unwrap();
    let y = f.store.create_item(NewItem::new("Y")).unwrap();

    assert_eq!(
        f.resolver.request(x, y, &decline),
        Err(ReparentError::Cancelled { item: x })
    );
    assert_eq!(first.calls() + second.calls(), 0);
    assert_eq!(mirror_parent(&f.index, x), Some(ItemId::ROOT));
}

#[test]
fn test_virtual_branch_guard() {
    let f = fixture();
    let x = f
        .store
        .create_item(NewItem::new("X").attribute(attributes::VIRTUAL_BRANCH, "1"))
        .unwrap();
    let folder = f.store.create_item(NewItem::new("Folder")).unwrap();
    let before = f.index.snapshot();

    assert_eq!(
        f.resolver.request(x, folder, &decline),
        Err(ReparentError::VirtualBranchViolation { item: x, new_parent: folder })
    );
    assert_eq!(f.store.parent(x), Some(ItemId::ROOT));
    assert_eq!(f.index.snapshot(), before);
}

#[test]
fn test_default_move_relocates_row_through_events() {
    let f = fixture();
    let a = f.store.create_item(NewItem::new("A")).unwrap();
    let b = f.store.create_item(NewItem::new("B")).unwrap();
    let c = f.store.create_item(NewItem::new("C").parent(a)).unwrap();
    let moved = Arc::new(Mutex::new(0));
    let sink = moved.clone();
    f.index.signals().rows_moved.connect(move |_| *sink.lock() += 1);

    let outcome = f.resolver.request(a, b, &decline).unwrap();
    assert_eq!(outcome, ReparentOutcome::Moved { handler: f.registry.default_id() });
    assert_eq!(mirror_parent(&f.index, a), Some(b));
    assert_eq!(mirror_parent(&f.index, c), Some(a));
    assert_eq!(*moved.lock(), 1);

    assert_eq!(f.resolver.request(a, b, &decline), Ok(ReparentOutcome::Unchanged));
}

#[test]
fn test_move_within_parent_reorders_rows() {
    let f = fixture();
    let a = f.store.create_item(NewItem::new("A")).unwrap();
    let b = f.store.create_item(NewItem::new("B")).unwrap();
    let c = f.store.create_item(NewItem::new("C")).unwrap();

    f.resolver.move_within_parent(a, 2).unwrap();

    let root = f.index.root();
    let order: Vec<ItemId> = (0..f.index.row_count(root))
        .filter_map(|r| f.index.child(root, r, 0))
        .filter_map(|row| f.index.item_of(row))
        .collect();
    assert_eq!(order, vec![b, c, a]);
    assert!(f.resolver.move_within_parent(a, 3).is_err());
}
