//! The fallback handler.

use super::OwnerHandler;
use crate::hierarchy::{HierarchyStore, ItemId};

/// Renders items no other handler claims and performs moves nobody else
/// claims.
///
/// Its ownership confidence is always 0, so it never wins a ranking; the
/// registry selects it explicitly when every handler declines.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHandler;

impl DefaultHandler {
    /// The name recorded for items owned by the default handler.
    pub const NAME: &'static str = "Default";
}

impl OwnerHandler for DefaultHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn can_own(&self, _store: &dyn HierarchyStore, _item: ItemId) -> f64 {
        0.0
    }
}
