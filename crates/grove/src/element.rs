//! Tree elements and the arena that owns them.
//!
//! A [`TreeElement`] carries its identity, display name and depth together
//! with plain-id links to its parent and children. Attached elements live in
//! a [`TreeArena`], which owns every node of one tree; the links never own
//! anything, so there are no reference cycles between parents and children.

use std::collections::HashMap;

/// Identifier of an element, unique within one tree.
pub type ElementId = i32;

/// Depth of the root element. Direct children of the root have depth 0.
pub const ROOT_DEPTH: i32 = -1;

/// A node of the tree.
///
/// The type parameter `T` is the node payload, so that concrete node kinds
/// can carry their own data next to the common `id`/`name`/`depth` fields.
///
/// # Example
///
/// ```
/// use grove::TreeElement;
///
/// let element = TreeElement::new(7, "Documents");
/// assert_eq!(element.id(), 7);
/// assert!(element.parent().is_none());
/// assert!(!element.has_children());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TreeElement<T = ()> {
    id: ElementId,
    name: String,
    depth: i32,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    data: T,
}

impl TreeElement<()> {
    /// Creates a detached element with no payload.
    ///
    /// The depth is assigned when the element is attached to a tree.
    pub fn new(id: ElementId, name: impl Into<String>) -> Self {
        Self::with_payload(id, name, 0, ())
    }

    /// Creates an element for a flat sequence, with an explicit depth.
    pub fn with_depth(id: ElementId, name: impl Into<String>, depth: i32) -> Self {
        Self::with_payload(id, name, depth, ())
    }
}

impl<T> TreeElement<T> {
    /// Creates an element carrying `data`.
    pub fn with_payload(id: ElementId, name: impl Into<String>, depth: i32, data: T) -> Self {
        Self {
            id,
            name: name.into(),
            depth,
            parent: None,
            children: Vec::new(),
            data,
        }
    }

    /// Replaces the payload, keeping identity, name and depth.
    pub fn with_data<U>(self, data: U) -> TreeElement<U> {
        TreeElement {
            id: self.id,
            name: self.name,
            depth: self.depth,
            parent: self.parent,
            children: self.children,
            data,
        }
    }

    /// Returns the element id.
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Returns the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the display name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Returns the depth; the root has depth [`ROOT_DEPTH`].
    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// Returns the parent id, or `None` for the root and detached elements.
    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    /// Returns the ids of the children in render order.
    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    /// Returns `true` if the element has at least one child.
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Returns `true` for a root element: no parent and depth -1.
    pub fn is_root(&self) -> bool {
        self.parent.is_none() && self.depth == ROOT_DEPTH
    }

    /// Returns the payload.
    pub fn data(&self) -> &T {
        &self.data
    }

    /// Returns the payload mutably.
    pub fn data_mut(&mut self) -> &mut T {
        &mut self.data
    }

    pub(crate) fn set_id(&mut self, id: ElementId) {
        self.id = id;
    }

    pub(crate) fn set_depth(&mut self, depth: i32) {
        self.depth = depth;
    }

    pub(crate) fn set_parent(&mut self, parent: Option<ElementId>) {
        self.parent = parent;
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<ElementId> {
        &mut self.children
    }

    /// Drops both parent and child links.
    pub(crate) fn reset_links(&mut self) {
        self.parent = None;
        self.children.clear();
    }
}

/// The `(id, name, depth)` triple an external store reads and writes.
///
/// A sequence of records in pre-order, root first, is the persisted form of
/// a tree; see [`TreeModel::records`](crate::TreeModel::records).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementRecord {
    /// Element id.
    pub id: ElementId,
    /// Display name.
    pub name: String,
    /// Depth, -1 for the root.
    pub depth: i32,
}

impl ElementRecord {
    /// Creates a record.
    pub fn new(id: ElementId, name: impl Into<String>, depth: i32) -> Self {
        Self {
            id,
            name: name.into(),
            depth,
        }
    }
}

impl From<ElementRecord> for TreeElement<()> {
    fn from(record: ElementRecord) -> Self {
        TreeElement::with_depth(record.id, record.name, record.depth)
    }
}

impl<T> From<&TreeElement<T>> for ElementRecord {
    fn from(element: &TreeElement<T>) -> Self {
        Self::new(element.id, element.name.clone(), element.depth)
    }
}

/// Owner of every attached element of a tree, keyed by id.
#[derive(Debug, Clone)]
pub struct TreeArena<T> {
    nodes: HashMap<ElementId, TreeElement<T>>,
}

impl<T> Default for TreeArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TreeArena<T> {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Creates an empty arena with room for `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: HashMap::with_capacity(capacity),
        }
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the arena holds no element.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns `true` if an element with `id` is stored.
    pub fn contains(&self, id: ElementId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Returns the element with `id`.
    pub fn get(&self, id: ElementId) -> Option<&TreeElement<T>> {
        self.nodes.get(&id)
    }

    /// Returns the element with `id` mutably.
    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut TreeElement<T>> {
        self.nodes.get_mut(&id)
    }

    /// Stores `element`, returning the element it displaced, if any.
    pub fn insert(&mut self, element: TreeElement<T>) -> Option<TreeElement<T>> {
        self.nodes.insert(element.id, element)
    }

    /// Removes a single element without touching its links.
    pub fn remove(&mut self, id: ElementId) -> Option<TreeElement<T>> {
        self.nodes.remove(&id)
    }

    /// Removes `id` and all of its descendants, returning them in pre-order.
    ///
    /// The parent's child list is left alone; detach first.
    pub fn remove_subtree(&mut self, id: ElementId) -> Vec<TreeElement<T>> {
        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                stack.extend(node.children.iter().rev().copied());
                removed.push(node);
            }
        }
        removed
    }

    /// Returns the children of `id`, or an empty slice for unknown ids.
    pub fn children_of(&self, id: ElementId) -> &[ElementId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Returns the parent of `id`.
    pub fn parent_of(&self, id: ElementId) -> Option<ElementId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// Returns the position of `id` among its parent's children.
    pub fn row_of(&self, id: ElementId) -> Option<usize> {
        let parent = self.parent_of(id)?;
        self.children_of(parent).iter().position(|&child| child == id)
    }

    /// Iterates over all elements in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &TreeElement<T>> {
        self.nodes.values()
    }
}
