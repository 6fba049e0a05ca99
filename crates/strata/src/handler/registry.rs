//! Handler registration, confidence ranking, and owner resolution.

use std::sync::Arc;

use parking_lot::RwLock;
use slotmap::{SlotMap, new_key_type};
use strata_core::logging::targets;

use super::{DefaultHandler, OwnerHandler, Presentation};
use crate::error::{HandlerError, HandlerResult};
use crate::hierarchy::{HierarchyStore, ItemId};
use crate::model::IconRef;

new_key_type! {
    /// Identifier of a registered handler.
    pub struct HandlerId;
}

/// A handler together with the confidence it reported for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// The handler.
    pub id: HandlerId,
    /// The handler's name.
    pub name: String,
    /// The reported confidence.
    pub confidence: f64,
}

/// Outcome of ranking handlers by confidence.
#[derive(Debug, Clone, PartialEq)]
pub enum Ranking {
    /// No handler reported a confidence above zero.
    None,
    /// Exactly one handler reported the highest confidence.
    Single(Candidate),
    /// Several handlers reported the identical highest confidence.
    Tied(Vec<Candidate>),
}

impl Ranking {
    /// Rank scored candidates.
    ///
    /// Only confidences strictly above zero compete. Ties are exact
    /// floating-point equality; tied candidates keep their input order.
    pub fn of(candidates: impl IntoIterator<Item = Candidate>) -> Self {
        let mut best: Vec<Candidate> = Vec::new();
        for candidate in candidates {
            if !(candidate.confidence > 0.0) {
                continue;
            }
            match best.first() {
                Some(top) if candidate.confidence < top.confidence => {}
                Some(top) if candidate.confidence == top.confidence => best.push(candidate),
                _ => best = vec![candidate],
            }
        }
        match best.len() {
            0 => Ranking::None,
            1 => best.pop().map_or(Ranking::None, Ranking::Single),
            _ => Ranking::Tied(best),
        }
    }
}

/// Result of resolving the owner of an item.
#[derive(Debug, Clone, PartialEq)]
pub enum OwnerResolution {
    /// One handler claims the item with the highest confidence.
    Owner(HandlerId),
    /// Several handlers tie at the highest confidence; the caller must choose.
    Ambiguous(Vec<HandlerId>),
    /// No handler claims the item; the default handler renders it.
    Unassigned,
}

/// A tie presented to the caller for a decision.
#[derive(Debug, Clone, PartialEq)]
pub struct DisambiguationRequest {
    /// The item concerned.
    pub item: ItemId,
    /// The proposed new parent, for reparent requests.
    pub new_parent: Option<ItemId>,
    /// The tied handlers, in registration order.
    pub candidates: Vec<Candidate>,
    /// Human-readable description of the decision.
    pub message: String,
}

/// Chooses among tied handlers.
///
/// Choosing blocks the operation that asked; returning `None` declines and
/// cancels it. Closures of the right shape implement this trait.
pub trait Disambiguator {
    /// Pick one of `request.candidates`, or `None` to cancel.
    fn choose(&self, request: &DisambiguationRequest) -> Option<HandlerId>;
}

impl<F> Disambiguator for F
where
    F: Fn(&DisambiguationRequest) -> Option<HandlerId>,
{
    fn choose(&self, request: &DisambiguationRequest) -> Option<HandlerId> {
        self(request)
    }
}

struct RegistryState {
    handlers: SlotMap<HandlerId, Arc<dyn OwnerHandler>>,
    order: Vec<HandlerId>,
}

/// The set of owner handlers, constructed explicitly and shared by reference.
///
/// Registration order does not imply priority; priority is computed per
/// query from the confidences handlers report. The default handler is
/// registered at construction, never competes in rankings, and cannot be
/// unregistered.
pub struct HandlerRegistry {
    state: RwLock<RegistryState>,
    default_id: HandlerId,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    /// Create a registry holding only a [`DefaultHandler`].
    pub fn new() -> Self {
        Self::with_default(Arc::new(DefaultHandler))
    }

    /// Create a registry with a custom fallback handler.
    pub fn with_default(default: Arc<dyn OwnerHandler>) -> Self {
        let mut handlers = SlotMap::with_key();
        let default_id = handlers.insert(default);
        Self {
            state: RwLock::new(RegistryState {
                handlers,
                order: Vec::new(),
            }),
            default_id,
        }
    }

    /// Register a handler.
    pub fn register(&self, handler: Arc<dyn OwnerHandler>) -> HandlerId {
        let name = handler.name().to_string();
        let mut state = self.state.write();
        if state.handlers.values().any(|h| h.name() == name) {
            tracing::warn!(target: targets::HANDLER, handler = %name, "handler name registered twice; lookups by name return the first");
        }
        let id = state.handlers.insert(handler);
        state.order.push(id);
        tracing::debug!(target: targets::HANDLER, handler = %name, "handler registered");
        id
    }

    /// Unregister a handler. The default handler cannot be removed.
    pub fn unregister(&self, id: HandlerId) -> Option<Arc<dyn OwnerHandler>> {
        if id == self.default_id {
            return None;
        }
        let mut state = self.state.write();
        state.order.retain(|h| *h != id);
        state.handlers.remove(id)
    }

    /// Look up a handler by id.
    pub fn handler(&self, id: HandlerId) -> Option<Arc<dyn OwnerHandler>> {
        self.state.read().handlers.get(id).cloned()
    }

    /// Look up a handler by its name. The default handler is found too.
    pub fn handler_by_name(&self, name: &str) -> Option<(HandlerId, Arc<dyn OwnerHandler>)> {
        let state = self.state.read();
        std::iter::once(self.default_id)
            .chain(state.order.iter().copied())
            .find_map(|id| {
                let handler = state.handlers.get(id)?;
                (handler.name() == name).then(|| (id, handler.clone()))
            })
    }

    /// Id of the default handler.
    pub fn default_id(&self) -> HandlerId {
        self.default_id
    }

    /// The default handler.
    pub fn default_handler(&self) -> Arc<dyn OwnerHandler> {
        match self.state.read().handlers.get(self.default_id) {
            Some(handler) => handler.clone(),
            None => Arc::new(DefaultHandler),
        }
    }

    /// Returns `true` if `id` is the default handler.
    pub fn is_default(&self, id: HandlerId) -> bool {
        id == self.default_id
    }

    /// Number of registered handlers, excluding the default handler.
    pub fn len(&self) -> usize {
        self.state.read().order.len()
    }

    /// Returns `true` if only the default handler is present.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the competing handlers in registration order.
    ///
    /// Handlers are always called on a snapshot so that they may use the
    /// registry themselves.
    fn competitors(&self) -> Vec<(HandlerId, Arc<dyn OwnerHandler>)> {
        let state = self.state.read();
        state
            .order
            .iter()
            .filter_map(|id| state.handlers.get(*id).map(|h| (*id, h.clone())))
            .collect()
    }

    /// Ask every handler for its ownership confidence and rank the answers.
    ///
    /// Handlers may tag the item's attributes while answering.
    pub fn rank_owners(&self, store: &dyn HierarchyStore, item: ItemId) -> Ranking {
        Ranking::of(self.competitors().into_iter().map(|(id, handler)| Candidate {
            id,
            name: handler.name().to_string(),
            confidence: handler.can_own(store, item),
        }))
    }

    /// Ask every handler whether it can move `item` under `new_parent` and
    /// rank the answers.
    pub fn rank_reparent(&self, store: &dyn HierarchyStore, item: ItemId, new_parent: ItemId) -> Ranking {
        Ranking::of(self.competitors().into_iter().map(|(id, handler)| Candidate {
            id,
            name: handler.name().to_string(),
            confidence: handler.can_reparent(store, item, new_parent),
        }))
    }

    /// Resolve the owner of an item by confidence.
    pub fn resolve_owner(&self, store: &dyn HierarchyStore, item: ItemId) -> OwnerResolution {
        match self.rank_owners(store, item) {
            Ranking::None => OwnerResolution::Unassigned,
            Ranking::Single(candidate) => OwnerResolution::Owner(candidate.id),
            Ranking::Tied(candidates) => {
                OwnerResolution::Ambiguous(candidates.into_iter().map(|c| c.id).collect())
            }
        }
    }

    /// The handler currently responsible for an item.
    ///
    /// A recorded, registered owner wins; it is still asked
    /// [`can_own`](OwnerHandler::can_own) so that its attribute tagging
    /// runs, but its answer is ignored. Otherwise the owner is resolved by
    /// confidence, falling back to the default handler when nobody or more
    /// than one handler claims the item. Never blocks on a disambiguator.
    pub fn effective_owner(&self, store: &dyn HierarchyStore, item: ItemId) -> (HandlerId, Arc<dyn OwnerHandler>) {
        let recorded = store.owner_handler(item);
        if !recorded.is_empty() {
            if let Some((id, handler)) = self.handler_by_name(&recorded) {
                let _ = handler.can_own(store, item);
                return (id, handler);
            }
        }
        match self.resolve_owner(store, item) {
            OwnerResolution::Owner(id) => match self.handler(id) {
                Some(handler) => (id, handler),
                None => (self.default_id, self.default_handler()),
            },
            OwnerResolution::Ambiguous(candidates) => {
                tracing::warn!(
                    target: targets::HANDLER,
                    item = %item,
                    candidates = candidates.len(),
                    "ambiguous owner, rendering with the default handler"
                );
                (self.default_id, self.default_handler())
            }
            OwnerResolution::Unassigned => (self.default_id, self.default_handler()),
        }
    }

    /// Derive everything the mirror tree shows about an item.
    ///
    /// An owner name recorded in the store that names no registered handler
    /// renders the raw item name with a warning icon.
    pub fn presentation(&self, store: &dyn HierarchyStore, item: ItemId) -> Presentation {
        let recorded = store.owner_handler(item);
        if !recorded.is_empty() && self.handler_by_name(&recorded).is_none() {
            tracing::warn!(target: targets::HANDLER, item = %item, owner = %recorded, "recorded owner handler is not registered");
            return Presentation {
                display_name: store.name(item).unwrap_or_default(),
                tooltip: "No role assigned".to_string(),
                icon: IconRef::WARNING,
                visibility: -1,
                visibility_icon: None,
                owner: recorded,
                unassigned: true,
            };
        }

        let (id, handler) = self.effective_owner(store, item);
        let visibility = handler.visibility(store, item);
        Presentation {
            display_name: handler.display_name(store, item),
            tooltip: handler.tooltip(store, item),
            icon: handler.icon(store, item).unwrap_or(IconRef::UNKNOWN),
            visibility,
            visibility_icon: handler.visibility_icon(visibility),
            owner: handler.name().to_string(),
            unassigned: id == self.default_id,
        }
    }

    /// Resolve the owner of an item and record it in the store.
    ///
    /// Ties are put to `disambiguator`; declining leaves the item unassigned
    /// and fails with [`HandlerError::NoOwner`]. When no handler claims the
    /// item, the default handler is recorded.
    pub fn assign_owner(
        &self,
        store: &dyn HierarchyStore,
        item: ItemId,
        disambiguator: &dyn Disambiguator,
    ) -> HandlerResult<HandlerId> {
        let chosen = match self.rank_owners(store, item) {
            Ranking::None => self.default_id,
            Ranking::Single(candidate) => candidate.id,
            Ranking::Tied(candidates) => {
                let request = DisambiguationRequest {
                    item,
                    new_parent: None,
                    message: format!(
                        "Equal confidence found for more than one handler.\n\nSelect handler to own item\n'{}'\n({})",
                        store.name(item).unwrap_or_default(),
                        describe(store, item),
                    ),
                    candidates,
                };
                match disambiguator.choose(&request) {
                    Some(id) if request.candidates.iter().any(|c| c.id == id) => id,
                    _ => {
                        tracing::debug!(target: targets::HANDLER, item = %item, "owner selection declined");
                        return Err(HandlerError::NoOwner { item });
                    }
                }
            }
        };

        let handler = self.handler(chosen).ok_or(HandlerError::NoOwner { item })?;
        store.set_owner_handler(item, handler.name())?;
        tracing::debug!(target: targets::HANDLER, item = %item, owner = handler.name(), "owner assigned");
        Ok(chosen)
    }

    /// Clear every recorded owner so that ownership is resolved afresh.
    ///
    /// The mirror tree must be rebuilt afterwards.
    pub fn reset_ownership(&self, store: &dyn HierarchyStore) -> HandlerResult<()> {
        for item in store.descendants(store.root_item()) {
            store.set_owner_handler(item, "")?;
        }
        tracing::debug!(target: targets::HANDLER, "ownership reset");
        Ok(())
    }
}

/// Object class of the item's associated object, or its level tag.
pub(crate) fn describe(store: &dyn HierarchyStore, item: ItemId) -> String {
    match store.data_object(item) {
        Some(object) => format!("type {}", object.class_name()),
        None => format!("level {}", store.level(item).unwrap_or_default()),
    }
}

static_assertions::assert_impl_all!(HandlerRegistry: Send, Sync);
