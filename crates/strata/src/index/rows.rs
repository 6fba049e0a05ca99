//! Arena of row groups forming the mirror tree.

use slotmap::SlotMap;

use crate::hierarchy::ItemId;
use crate::model::{IconRef, RowKey};

/// Derived display data of one column of a row.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Cell {
    pub text: String,
    pub tooltip: String,
    pub whats_this: String,
    pub icon: Option<IconRef>,
    pub visibility: Option<i32>,
    pub transform_id: Option<String>,
}

/// All columns of one item, plus its links in the mirror tree.
#[derive(Debug)]
pub(crate) struct RowGroup {
    pub item: ItemId,
    pub parent: Option<RowKey>,
    pub children: Vec<RowKey>,
    pub cells: Vec<Cell>,
}

/// The mirror tree: row groups linked by arena handles.
///
/// A group is either attached (has a parent, or is the root) or detached.
/// Detached groups keep their own children, so a whole subtree can be
/// parked and re-attached with one link change.
pub(crate) struct RowArena {
    groups: SlotMap<RowKey, RowGroup>,
    root: RowKey,
}

impl RowArena {
    pub fn new(root_cells: Vec<Cell>) -> Self {
        let mut groups = SlotMap::with_key();
        let root = groups.insert(RowGroup {
            item: ItemId::ROOT,
            parent: None,
            children: Vec::new(),
            cells: root_cells,
        });
        Self { groups, root }
    }

    pub fn root(&self) -> RowKey {
        self.root
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn get(&self, key: RowKey) -> Option<&RowGroup> {
        self.groups.get(key)
    }

    pub fn get_mut(&mut self, key: RowKey) -> Option<&mut RowGroup> {
        self.groups.get_mut(key)
    }

    pub fn contains(&self, key: RowKey) -> bool {
        self.groups.contains_key(key)
    }

    pub fn children(&self, key: RowKey) -> &[RowKey] {
        self.groups.get(key).map(|g| g.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, key: RowKey) -> Option<RowKey> {
        self.groups.get(key)?.parent
    }

    /// Row index of a group under its parent.
    pub fn row_of(&self, key: RowKey) -> Option<usize> {
        let parent = self.parent(key)?;
        self.children(parent).iter().position(|c| *c == key)
    }

    /// Returns `true` for the root and for groups whose parent chain reaches it.
    pub fn is_attached(&self, key: RowKey) -> bool {
        let mut current = Some(key);
        let mut steps = 0;
        while let Some(k) = current {
            if k == self.root {
                return true;
            }
            steps += 1;
            if steps > self.groups.len() {
                return false;
            }
            current = self.parent(k);
        }
        false
    }

    /// Returns `true` if `ancestor` is on the parent chain of `key`.
    pub fn is_ancestor(&self, ancestor: RowKey, key: RowKey) -> bool {
        let mut current = self.parent(key);
        let mut steps = 0;
        while let Some(k) = current {
            if k == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.groups.len() {
                return false;
            }
            current = self.parent(k);
        }
        false
    }

    /// Create a parentless group.
    pub fn insert_detached(&mut self, item: ItemId, cells: Vec<Cell>) -> RowKey {
        self.groups.insert(RowGroup {
            item,
            parent: None,
            children: Vec::new(),
            cells,
        })
    }

    /// Link a detached group under `parent`, clamping `row` to the child count.
    ///
    /// Returns the row the group landed at, or `None` if either group is
    /// missing, `key` is still attached, or `parent` lies inside `key`'s
    /// subtree.
    pub fn attach(&mut self, key: RowKey, parent: RowKey, row: usize) -> Option<usize> {
        if self.groups.get(key)?.parent.is_some() || key == self.root {
            return None;
        }
        if parent == key || self.is_ancestor(key, parent) {
            return None;
        }
        let siblings = &mut self.groups.get_mut(parent)?.children;
        let row = row.min(siblings.len());
        siblings.insert(row, key);
        self.groups.get_mut(key)?.parent = Some(parent);
        Some(row)
    }

    /// Unlink a group from its parent. Returns the former parent and row.
    pub fn detach(&mut self, key: RowKey) -> Option<(RowKey, usize)> {
        let parent = self.groups.get(key)?.parent?;
        let siblings = &mut self.groups.get_mut(parent)?.children;
        let row = siblings.iter().position(|c| *c == key)?;
        siblings.remove(row);
        if let Some(group) = self.groups.get_mut(key) {
            group.parent = None;
        }
        Some((parent, row))
    }

    /// Delete a single group. Its children, if any, become detached.
    pub fn remove(&mut self, key: RowKey) -> Option<RowGroup> {
        if key == self.root {
            return None;
        }
        self.detach(key);
        let group = self.groups.remove(key)?;
        for child in &group.children {
            if let Some(c) = self.groups.get_mut(*child) {
                c.parent = None;
            }
        }
        Some(group)
    }

    /// Groups of a subtree in depth-first, parents-first order, with depth
    /// relative to `top`.
    pub fn walk(&self, top: RowKey) -> Vec<(usize, RowKey)> {
        let mut result = Vec::new();
        let mut stack = vec![(0, top)];
        while let Some((depth, key)) = stack.pop() {
            if !self.contains(key) || result.len() > self.groups.len() {
                continue;
            }
            result.push((depth, key));
            stack.extend(self.children(key).iter().rev().map(|c| (depth + 1, *c)));
        }
        result
    }

    /// Depth-first search for the group of `item` below `top`.
    pub fn find(&self, top: RowKey, item: ItemId) -> Option<RowKey> {
        let mut stack = vec![top];
        let mut visited = 0;
        while let Some(key) = stack.pop() {
            let Some(group) = self.groups.get(key) else {
                continue;
            };
            if group.item == item {
                return Some(key);
            }
            visited += 1;
            if visited > self.groups.len() {
                return None;
            }
            stack.extend(group.children.iter().rev().copied());
        }
        None
    }
}
