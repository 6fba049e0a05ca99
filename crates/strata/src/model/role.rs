//! Data roles and values for mirror tree cells.
//!
//! Each cell can hold several pieces of data, distinguished by their role.

use std::borrow::Cow;
use std::fmt;

use crate::hierarchy::ItemId;

/// Roles for reading different aspects of a cell.
///
/// # Roles
///
/// - **Display**: The text to show (name, transform name, object id)
/// - **Decoration**: Icon shown next to the text (owner or visibility icon)
/// - **ToolTip**: Text shown when hovering over the cell
/// - **WhatsThis**: Extended help text (the owner handler name)
/// - **Visibility**: Raw visibility state of the item (0, 1, 2 or -1)
/// - **ItemId**: Identifier of the mirrored item
/// - **TransformId**: Identifier of the transform applied to the item's object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemRole {
    /// Primary text to display. Returns `String`.
    Display,
    /// Icon to show. Returns `Icon`.
    Decoration,
    /// Tooltip text. Returns `String`.
    ToolTip,
    /// Extended help text. Returns `String`.
    WhatsThis,
    /// Visibility state. Returns `Int`.
    Visibility,
    /// The mirrored item. Returns `Id`.
    ItemId,
    /// Transform identifier (transform column only). Returns `String`.
    TransformId,
}

/// Reference to an icon resource, resolved by the presentation layer.
///
/// Icon assets themselves live outside this crate; only their names travel
/// through the mirror.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IconRef(Cow<'static, str>);

impl IconRef {
    /// Shown for items whose recorded owner is not registered.
    pub const WARNING: IconRef = IconRef::from_static("warning");
    /// Shown when the owner handler provides no icon.
    pub const UNKNOWN: IconRef = IconRef::from_static("unknown");
    /// Item is visible.
    pub const VISIBLE: IconRef = IconRef::from_static("visible");
    /// Item is hidden.
    pub const HIDDEN: IconRef = IconRef::from_static("hidden");
    /// Some of the item's branch is visible.
    pub const PARTIALLY_VISIBLE: IconRef = IconRef::from_static("partially-visible");

    /// An icon with a static name.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// An icon with a runtime name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// The icon name.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// The icon matching a visibility state, if any.
    pub fn for_visibility(visibility: i32) -> Option<Self> {
        match visibility {
            0 => Some(Self::HIDDEN),
            1 => Some(Self::VISIBLE),
            2 => Some(Self::PARTIALLY_VISIBLE),
            _ => None,
        }
    }
}

impl fmt::Display for IconRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value of a cell for one role.
///
/// # Example
///
/// ```
/// use strata::model::ItemData;
///
/// let data = ItemData::from("Study 1");
/// assert_eq!(data.as_string(), Some("Study 1"));
/// assert!(ItemData::None.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ItemData {
    /// No data.
    #[default]
    None,
    /// String data (Display, ToolTip, WhatsThis, TransformId).
    String(String),
    /// Integer data (Visibility).
    Int(i64),
    /// Icon data (Decoration).
    Icon(IconRef),
    /// Item identifier data (ItemId).
    Id(ItemId),
}

impl ItemData {
    /// Returns `true` if this is `ItemData::None`.
    pub fn is_none(&self) -> bool {
        matches!(self, ItemData::None)
    }

    /// Returns `true` if this contains some data.
    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    /// Attempts to get the data as a string slice.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            ItemData::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Attempts to get the data as an owned string.
    pub fn into_string(self) -> Option<String> {
        match self {
            ItemData::String(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to get the data as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ItemData::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to get the data as an icon.
    pub fn as_icon(&self) -> Option<&IconRef> {
        match self {
            ItemData::Icon(i) => Some(i),
            _ => None,
        }
    }

    /// Attempts to get the data as an item identifier.
    pub fn as_id(&self) -> Option<ItemId> {
        match self {
            ItemData::Id(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<&str> for ItemData {
    fn from(s: &str) -> Self {
        ItemData::String(s.to_string())
    }
}

impl From<String> for ItemData {
    fn from(s: String) -> Self {
        ItemData::String(s)
    }
}

impl From<i64> for ItemData {
    fn from(n: i64) -> Self {
        ItemData::Int(n)
    }
}

impl From<i32> for ItemData {
    fn from(n: i32) -> Self {
        ItemData::Int(n as i64)
    }
}

impl From<IconRef> for ItemData {
    fn from(icon: IconRef) -> Self {
        ItemData::Icon(icon)
    }
}

impl From<ItemId> for ItemData {
    fn from(id: ItemId) -> Self {
        ItemData::Id(id)
    }
}

impl<T: Into<ItemData>> From<Option<T>> for ItemData {
    fn from(value: Option<T>) -> Self {
        value.map_or(ItemData::None, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_data_accessors() {
        assert_eq!(ItemData::from(3i64).as_int(), Some(3));
        assert_eq!(ItemData::from(ItemId::ROOT).as_id(), Some(ItemId::ROOT));
        assert_eq!(ItemData::from(IconRef::WARNING).as_icon(), Some(&IconRef::WARNING));
        assert_eq!(ItemData::from("x").into_string().as_deref(), Some("x"));
        assert!(ItemData::from(None::<String>).is_none());
        assert!(ItemData::from(3i64).as_string().is_none());
    }

    #[test]
    fn test_visibility_icons() {
        assert_eq!(IconRef::for_visibility(0), Some(IconRef::HIDDEN));
        assert_eq!(IconRef::for_visibility(1), Some(IconRef::VISIBLE));
        assert_eq!(IconRef::for_visibility(2), Some(IconRef::PARTIALLY_VISIBLE));
        assert_eq!(IconRef::for_visibility(-1), None);
    }

    #[test]
    fn test_icon_names() {
        assert_eq!(IconRef::new("folder").name(), "folder");
        assert_eq!(IconRef::WARNING.to_string(), "warning");
        assert_eq!(IconRef::new("warning"), IconRef::WARNING);
    }
}
