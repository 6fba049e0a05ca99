//! Wiring from hierarchy store events to tree index updates.

use std::sync::{Arc, Weak};

use strata_core::logging::targets;
use strata_core::{ConnectionId, Signal};

use crate::error::{HandlerResult, IndexError, IndexResult};
use crate::hierarchy::HierarchyEvent;
use crate::index::TreeIndex;

/// Notifications around bulk updates of the mirror tree.
pub struct AdapterSignals {
    /// A batch window opened; rows will be rebuilt when it closes.
    pub about_to_update: Signal<()>,
    /// The mirror tree was rebuilt after a batch window, import or close.
    pub updated: Signal<()>,
}

impl AdapterSignals {
    fn new() -> Self {
        Self {
            about_to_update: Signal::new(),
            updated: Signal::new(),
        }
    }
}

/// Keeps a [`TreeIndex`] in sync with its store.
///
/// Store events map onto index operations:
///
/// | Event | Index operation |
/// |-------|-----------------|
/// | `ItemAdded` | [`upsert_row`](TreeIndex::upsert_row) |
/// | `ItemAboutToBeRemoved` | [`remove_subtree`](TreeIndex::remove_subtree) |
/// | `ItemRemoved` | [`reconcile_orphans`](TreeIndex::reconcile_orphans) |
/// | `ItemModified` | [`refresh`](TreeIndex::refresh) |
/// | `BatchEnded`, `Imported`, `Closed` | [`rebuild_all`](TreeIndex::rebuild_all) |
///
/// While the store is inside a batch window, per-item events are ignored
/// if the index configuration asks for it; the rebuild at the end of the
/// window catches up. The adapter disconnects from the store when dropped.
pub struct EventAdapter {
    index: Arc<TreeIndex>,
    signals: Arc<AdapterSignals>,
    connection: ConnectionId,
}

impl EventAdapter {
    /// Subscribe the index to its store's events.
    pub fn new(index: Arc<TreeIndex>) -> Self {
        let signals = Arc::new(AdapterSignals::new());
        let weak: Weak<TreeIndex> = Arc::downgrade(&index);
        let slot_signals = Arc::clone(&signals);
        let connection = index.store().events().connect(move |event| {
            if let Some(index) = weak.upgrade() {
                dispatch(&index, &slot_signals, *event);
            }
        });
        tracing::debug!(target: targets::ADAPTER, "adapter connected");
        Self {
            index,
            signals,
            connection,
        }
    }

    /// The index kept in sync.
    pub fn index(&self) -> &Arc<TreeIndex> {
        &self.index
    }

    /// Bulk update notifications.
    pub fn signals(&self) -> &AdapterSignals {
        &self.signals
    }

    /// Apply a store event by hand, as if the store had emitted it.
    pub fn handle(&self, event: HierarchyEvent) {
        dispatch(&self.index, &self.signals, event);
    }

    /// Forget every recorded owner and rebuild the mirror tree so that
    /// ownership is resolved afresh.
    pub fn reset_ownership(&self) -> HandlerResult<()> {
        let store = self.index.store();
        self.index.registry().reset_ownership(store.as_ref())?;
        self.signals.about_to_update.emit(());
        self.index.rebuild_all();
        self.signals.updated.emit(());
        Ok(())
    }
}

impl Drop for EventAdapter {
    fn drop(&mut self) {
        self.index.store().events().disconnect(self.connection);
    }
}

fn dispatch(index: &TreeIndex, signals: &AdapterSignals, event: HierarchyEvent) {
    let batching = index.config().suppress_during_batch && index.store().is_batch_processing();
    tracing::trace!(target: targets::ADAPTER, ?event, batching, "store event");

    match event {
        HierarchyEvent::ItemAdded(item) if !batching => settle(index, index.upsert_row(item).map(|_| ())),
        HierarchyEvent::ItemAboutToBeRemoved(item) if !batching => settle(index, index.remove_subtree(item)),
        HierarchyEvent::ItemRemoved(_) if !batching => settle(index, index.reconcile_orphans()),
        HierarchyEvent::ItemModified(item) if !batching => settle(index, index.refresh(item)),
        HierarchyEvent::ItemAdded(_)
        | HierarchyEvent::ItemAboutToBeRemoved(_)
        | HierarchyEvent::ItemRemoved(_)
        | HierarchyEvent::ItemModified(_) => {}
        HierarchyEvent::BatchStarted => {
            tracing::debug!(target: targets::ADAPTER, "batch window opened");
            signals.about_to_update.emit(());
        }
        HierarchyEvent::BatchEnded | HierarchyEvent::Imported | HierarchyEvent::Closed => {
            let rows = index.rebuild_all();
            tracing::debug!(target: targets::ADAPTER, ?event, rows, "mirror tree resynchronized");
            signals.updated.emit(());
        }
    }
}

/// Recover locally from index errors; only corruption forces a rebuild.
fn settle(index: &TreeIndex, result: IndexResult<()>) {
    let Err(err) = result else {
        return;
    };
    match err {
        IndexError::Corruption { .. } => {
            tracing::error!(target: targets::ADAPTER, %err, "rebuilding mirror tree");
            index.rebuild_all();
        }
        IndexError::OrphanedItem { .. } => {
            tracing::warn!(target: targets::ADAPTER, %err, "attachment deferred to the next refresh");
        }
        IndexError::CycleDetected { .. } => {
            tracing::error!(target: targets::ADAPTER, %err, "update refused");
        }
        IndexError::UnknownItem { .. } | IndexError::InvalidColumn { .. } => {
            tracing::debug!(target: targets::ADAPTER, %err, "event ignored");
        }
    }
}

static_assertions::assert_impl_all!(EventAdapter: Send, Sync);
