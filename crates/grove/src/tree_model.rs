//! List-backed hierarchical tree model.
//!
//! `TreeModel` keeps two views of the same tree in agreement: the flat
//! pre-order sequence (root first, each entry tagged with its depth) and the
//! parent/child graph stored in a [`TreeArena`]. Every mutation edits the
//! graph and then regenerates the flat sequence from it.

use std::collections::{HashMap, HashSet};
use std::fmt;

use grove_core::Signal;
use grove_core::logging::targets;
use parking_lot::RwLock;

use crate::debug::TreeDebug;
use crate::element::{ElementId, ElementRecord, ROOT_DEPTH, TreeArena, TreeElement};
use crate::error::{Error, Result};
use crate::utility;

/// A structural change reported by [`TreeModelSignals::changed`].
///
/// Observers can either re-derive their whole state on any change or use the
/// variant to update incrementally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeChange {
    /// The whole tree was replaced or cleared.
    Reset,
    /// A root was added to an empty model.
    RootAdded {
        /// Id assigned to the root.
        id: ElementId,
    },
    /// Elements were inserted under `parent`.
    Inserted {
        /// The parent that received the elements.
        parent: ElementId,
        /// The new children of `parent`, in insertion order. Descendants
        /// inserted along with them are not listed.
        ids: Vec<ElementId>,
    },
    /// Subtrees were removed. `ids` holds the top-most removed elements.
    Removed {
        /// Roots of the removed subtrees.
        ids: Vec<ElementId>,
    },
    /// Elements were moved to become children of `parent`.
    Moved {
        /// The new parent.
        parent: ElementId,
        /// The moved elements, in their new order.
        ids: Vec<ElementId>,
    },
    /// An element's name changed.
    Renamed {
        /// The renamed element.
        id: ElementId,
    },
    /// An element's payload was edited.
    DataChanged {
        /// The edited element.
        id: ElementId,
    },
}

/// Signals emitted by [`TreeModel`].
pub struct TreeModelSignals {
    /// Emitted at the end of every successful mutation.
    pub changed: Signal<TreeChange>,
}

impl Default for TreeModelSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeModelSignals {
    /// Creates a new set of model signals.
    pub fn new() -> Self {
        Self {
            changed: Signal::new(),
        }
    }
}

/// Internal storage: the arena, the flat order and the id counter.
struct TreeStorage<T> {
    arena: TreeArena<T>,
    order: Vec<ElementId>,
    root: Option<ElementId>,
    max_id: ElementId,
}

impl<T> TreeStorage<T> {
    fn new() -> Self {
        Self {
            arena: TreeArena::new(),
            order: Vec::new(),
            root: None,
            max_id: 0,
        }
    }

    fn require(&self, id: ElementId) -> Result<&TreeElement<T>> {
        self.arena
            .get(id)
            .ok_or_else(|| Error::invalid_argument(format!("element {id} is not in the tree")))
    }

    /// Unlinks `id` from its parent. The subtree stays in the arena.
    fn detach(&mut self, id: ElementId) {
        let Some(parent) = self.arena.parent_of(id) else {
            return;
        };
        if let Some(parent) = self.arena.get_mut(parent) {
            parent.children_mut().retain(|&child| child != id);
        }
        if let Some(element) = self.arena.get_mut(id) {
            element.set_parent(None);
        }
    }

    /// Links `ids` under `parent` starting at `position`.
    fn attach(&mut self, parent: ElementId, position: usize, ids: &[ElementId]) {
        let depth = self.arena.get(parent).map_or(0, |p| p.depth() + 1);
        for &id in ids {
            if let Some(element) = self.arena.get_mut(id) {
                element.set_parent(Some(parent));
                element.set_depth(depth);
            }
        }
        if let Some(parent) = self.arena.get_mut(parent) {
            parent
                .children_mut()
                .splice(position..position, ids.iter().copied());
        }
    }

    fn update_depths_from_root(&mut self) {
        if let Some(root) = self.root {
            utility::update_depth_values(&mut self.arena, root);
        }
    }

    fn rebuild_order(&mut self) {
        self.order = match self.root {
            Some(root) => utility::tree_to_list(&self.arena, root),
            None => Vec::new(),
        };
    }

    /// Validates a batch of detached elements for insertion under `parent`.
    fn check_insert(
        &self,
        elements: &[TreeElement<T>],
        parent: ElementId,
        insert_position: usize,
    ) -> Result<()> {
        let child_count = self.require(parent)?.children().len();
        if insert_position > child_count {
            return Err(Error::invalid_argument(format!(
                "insert position {insert_position} is out of range, element {parent} has {child_count} children"
            )));
        }
        let mut batch = HashSet::with_capacity(elements.len());
        for element in elements {
            if self.arena.contains(element.id()) || !batch.insert(element.id()) {
                return Err(Error::invalid_argument(format!(
                    "element id {} is already in use",
                    element.id()
                )));
            }
        }
        Ok(())
    }

    /// Validates, links and stores a batch under `parent`.
    ///
    /// Child links between members of the batch are kept, so a batch can
    /// carry whole subtrees. Returns the top-level members, which become
    /// children of `parent` at `insert_position`.
    fn insert_batch(
        &mut self,
        mut elements: Vec<TreeElement<T>>,
        parent: ElementId,
        insert_position: usize,
    ) -> Result<Vec<ElementId>> {
        self.check_insert(&elements, parent, insert_position)?;
        let top_level = link_batch(&mut elements)?;

        for element in elements {
            self.max_id = self.max_id.max(element.id());
            self.arena.insert(element);
        }
        self.attach(parent, insert_position, &top_level);
        for &id in &top_level {
            utility::update_depth_values(&mut self.arena, id);
        }
        self.rebuild_order();
        Ok(top_level)
    }

    fn next_id(&mut self) -> Result<ElementId> {
        let next = self.max_id.checked_add(1).ok_or_else(|| {
            Error::invalid_operation(format!("no element id left above {}", self.max_id))
        })?;
        self.max_id = next;
        Ok(next)
    }
}

/// Keeps the child links that point inside the batch and drops all others.
///
/// Returns the members no other member lists as a child, in batch order.
/// Fails with [`Error::InvalidArgument`] if a member is claimed by two
/// parents or the links form a cycle.
fn link_batch<T>(elements: &mut [TreeElement<T>]) -> Result<Vec<ElementId>> {
    let members: HashSet<ElementId> = elements.iter().map(|e| e.id()).collect();
    let mut parents: HashMap<ElementId, ElementId> = HashMap::with_capacity(elements.len());

    for element in elements.iter_mut() {
        let id = element.id();
        element.children_mut().retain(|child| members.contains(child));
        for &child in element.children() {
            if parents.insert(child, id).is_some() {
                return Err(Error::invalid_argument(format!(
                    "element {child} is listed as a child more than once in the batch"
                )));
            }
        }
    }

    let top_level: Vec<ElementId> = elements
        .iter()
        .map(|e| e.id())
        .filter(|id| !parents.contains_key(id))
        .collect();

    let children: HashMap<ElementId, &[ElementId]> =
        elements.iter().map(|e| (e.id(), e.children())).collect();
    let mut reached = 0;
    let mut stack = top_level.clone();
    while let Some(id) = stack.pop() {
        reached += 1;
        stack.extend(children.get(&id).into_iter().flat_map(|c| c.iter().copied()));
    }
    if reached != elements.len() {
        return Err(Error::invalid_argument("the batch's child links form a cycle"));
    }

    for element in elements.iter_mut() {
        element.set_parent(parents.get(&element.id()).copied());
    }
    Ok(top_level)
}

/// A hierarchical tree model backed by a flat element sequence.
///
/// `TreeModel` is `Send + Sync`: its state sits behind a read/write lock and
/// every mutation takes `&self`. Signals are emitted after the lock is
/// released, so observers may query the model from their slots.
///
/// # Example
///
/// ```
/// use grove::{TreeElement, TreeModel};
///
/// let model = TreeModel::from_elements(vec![
///     TreeElement::with_depth(0, "Root", -1),
///     TreeElement::with_depth(1, "A", 0),
///     TreeElement::with_depth(3, "Child", 1),
///     TreeElement::with_depth(2, "B", 0),
/// ])
/// .unwrap();
///
/// assert_eq!(model.children_of(1), vec![3]);
/// assert_eq!(model.get_ancestors(3), vec![1]);
///
/// model.remove_elements(&[1]).unwrap();
/// assert_eq!(model.ids(), vec![0, 2]);
/// ```
pub struct TreeModel<T = ()> {
    storage: RwLock<TreeStorage<T>>,
    signals: TreeModelSignals,
}

impl<T: Send + Sync + 'static> Default for TreeModel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> TreeModel<T> {
    /// Creates an empty model with no root.
    pub fn new() -> Self {
        Self {
            storage: RwLock::new(TreeStorage::new()),
            signals: TreeModelSignals::new(),
        }
    }

    /// Creates a model from a flat element sequence.
    pub fn from_elements(data: Vec<TreeElement<T>>) -> Result<Self> {
        let model = Self::new();
        model.initialize(data)?;
        Ok(model)
    }

    /// Replaces the whole tree with the one described by `data`.
    ///
    /// Empty data is legal and leaves the model without a root. Otherwise
    /// `data` must be a valid flat sequence. The id counter restarts from the
    /// largest id found.
    pub fn initialize(&self, data: Vec<TreeElement<T>>) -> Result<()> {
        let mut storage = TreeStorage::new();
        if !data.is_empty() {
            storage.max_id = data.iter().map(|e| e.id()).max().unwrap_or(0);
            let (arena, root) = utility::list_to_tree(data)?;
            storage.arena = arena;
            storage.root = Some(root);
            storage.rebuild_order();
        }

        let (count, max_id) = (storage.order.len(), storage.max_id);
        *self.storage.write() = storage;
        tracing::debug!(target: targets::MODEL, elements = count, max_id, "initialized tree model");
        self.signals.changed.emit(TreeChange::Reset);
        Ok(())
    }

    /// Removes every element, leaving the model without a root.
    pub fn clear(&self) {
        *self.storage.write() = TreeStorage::new();
        tracing::debug!(target: targets::MODEL, "cleared tree model");
        self.signals.changed.emit(TreeChange::Reset);
    }

    /// Returns the root id, if the model has a root.
    pub fn root(&self) -> Option<ElementId> {
        self.storage.read().root
    }

    /// Returns the number of elements, root included.
    pub fn len(&self) -> usize {
        self.storage.read().order.len()
    }

    /// Returns `true` if the model holds no element.
    pub fn is_empty(&self) -> bool {
        self.storage.read().order.is_empty()
    }

    /// Returns `true` if `id` is part of the tree.
    pub fn contains(&self, id: ElementId) -> bool {
        self.storage.read().arena.contains(id)
    }

    /// Returns the element ids in flat (pre-order) sequence.
    pub fn ids(&self) -> Vec<ElementId> {
        self.storage.read().order.clone()
    }

    /// Returns the flat sequence as `(id, name, depth)` records.
    pub fn records(&self) -> Vec<ElementRecord> {
        let storage = self.storage.read();
        storage
            .order
            .iter()
            .filter_map(|&id| storage.arena.get(id).map(ElementRecord::from))
            .collect()
    }

    /// Provides read access to one element.
    pub fn with_element<F, R>(&self, id: ElementId, f: F) -> Option<R>
    where
        F: FnOnce(&TreeElement<T>) -> R,
    {
        self.storage.read().arena.get(id).map(f)
    }

    /// Provides read access to the whole tree graph and its root.
    pub fn with_arena<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&TreeArena<T>, Option<ElementId>) -> R,
    {
        let storage = self.storage.read();
        f(&storage.arena, storage.root)
    }

    /// Edits an element's payload.
    ///
    /// Emits [`TreeChange::DataChanged`] after modification.
    pub fn with_data_mut<F, R>(&self, id: ElementId, f: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        let result = {
            let mut storage = self.storage.write();
            f(storage.arena.get_mut(id)?.data_mut())
        };
        self.signals.changed.emit(TreeChange::DataChanged { id });
        Some(result)
    }

    /// Renames an element.
    pub fn rename(&self, id: ElementId, name: impl Into<String>) -> Result<()> {
        {
            let mut storage = self.storage.write();
            storage.require(id)?;
            if let Some(element) = storage.arena.get_mut(id) {
                element.set_name(name);
            }
        }
        self.signals.changed.emit(TreeChange::Renamed { id });
        Ok(())
    }

    /// Returns the children of `id` in render order.
    pub fn children_of(&self, id: ElementId) -> Vec<ElementId> {
        self.storage.read().arena.children_of(id).to_vec()
    }

    /// Returns the parent of `id`.
    pub fn parent_of(&self, id: ElementId) -> Option<ElementId> {
        self.storage.read().arena.parent_of(id)
    }

    /// Returns the depth of `id`.
    pub fn depth_of(&self, id: ElementId) -> Option<i32> {
        self.with_element(id, |e| e.depth())
    }

    /// Returns the display name of `id`.
    pub fn name_of(&self, id: ElementId) -> Option<String> {
        self.with_element(id, |e| e.name().to_owned())
    }

    /// Returns `true` if `id` has at least one child.
    pub fn has_children(&self, id: ElementId) -> bool {
        self.with_element(id, |e| e.has_children()).unwrap_or(false)
    }

    /// Returns a fresh id, larger than every id seen so far.
    ///
    /// Uniqueness only holds if callers never pick ids themselves above the
    /// counter. Fails with [`Error::InvalidOperation`] once the largest id in
    /// use is `ElementId::MAX`.
    pub fn generate_unique_id(&self) -> Result<ElementId> {
        self.storage.write().next_id()
    }

    /// Returns the ancestors of `id`, nearest first.
    ///
    /// The walk stops below the root: the root is never listed, even though
    /// it is the last element on the parent chain. It is not a visible row,
    /// and callers such as [`TreeViewController::expand_to`] only care about
    /// rows that can be collapsed. Empty for the root, its direct children
    /// and unknown ids.
    ///
    /// [`TreeViewController::expand_to`]: crate::TreeViewController::expand_to
    pub fn get_ancestors(&self, id: ElementId) -> Vec<ElementId> {
        let storage = self.storage.read();
        let mut ancestors = Vec::new();
        let mut current = storage.arena.parent_of(id);
        while let Some(parent) = current {
            if storage.root == Some(parent) {
                break;
            }
            ancestors.push(parent);
            current = storage.arena.parent_of(parent);
        }
        ancestors
    }

    /// Returns `id` and every descendant of it that has at least one child.
    ///
    /// The order of the result is not meaningful.
    pub fn get_descendants_that_have_children(&self, id: ElementId) -> Vec<ElementId> {
        let storage = self.storage.read();
        let mut result = Vec::new();
        if !storage.arena.contains(id) {
            return result;
        }

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let children = storage.arena.children_of(current);
            if !children.is_empty() {
                result.push(current);
                stack.extend(children.iter().copied());
            }
        }
        result
    }

    /// Removes the given elements together with their subtrees.
    ///
    /// Returns the removed elements in pre-order, one subtree after the
    /// other. Links inside each subtree are kept, so the result can be handed
    /// to [`add_elements`](Self::add_elements) to re-insert it elsewhere.
    ///
    /// Fails without touching the tree if any id is unknown
    /// ([`Error::InvalidArgument`]) or if the root is targeted
    /// ([`Error::InvalidOperation`]).
    pub fn remove_elements(&self, ids: &[ElementId]) -> Result<Vec<TreeElement<T>>> {
        let (top_most, removed) = {
            let mut storage = self.storage.write();
            for &id in ids {
                storage.require(id)?;
                if storage.root == Some(id) {
                    return Err(Error::invalid_operation(
                        "the root element cannot be removed",
                    ));
                }
            }

            let mut seen = HashSet::with_capacity(ids.len());
            let unique: Vec<ElementId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
            let top_most = utility::find_common_ancestors_within_list(&storage.arena, &unique);

            let mut removed = Vec::new();
            for &id in &top_most {
                storage.detach(id);
                removed.extend(storage.arena.remove_subtree(id));
            }
            storage.rebuild_order();
            (top_most, removed)
        };

        tracing::debug!(
            target: targets::MODEL,
            roots = ?top_most,
            count = removed.len(),
            "removed elements"
        );
        self.signals.changed.emit(TreeChange::Removed { ids: top_most });
        Ok(removed)
    }

    /// Inserts elements as children of `parent` at `insert_position`.
    ///
    /// The batch may carry whole subtrees: a child link from one element of
    /// the batch to another is kept, and only the elements that no other
    /// element of the batch claims become children of `parent`. Links to
    /// elements outside the batch are dropped. Depths are recomputed from
    /// `parent` downwards.
    ///
    /// Fails with [`Error::InvalidArgument`] for an unknown parent, an id
    /// already in use, a position past the parent's last child, an element
    /// claimed by two parents of the batch, or links that form a cycle.
    pub fn add_elements(
        &self,
        elements: Vec<TreeElement<T>>,
        parent: ElementId,
        insert_position: usize,
    ) -> Result<()> {
        let ids = self
            .storage
            .write()
            .insert_batch(elements, parent, insert_position)?;

        tracing::debug!(target: targets::MODEL, parent, inserted = ?ids, "added elements");
        self.signals.changed.emit(TreeChange::Inserted { parent, ids });
        Ok(())
    }

    /// Makes `element` the root of an empty model.
    ///
    /// The root receives a freshly generated id and depth -1, which is
    /// returned. Fails with [`Error::InvalidOperation`] if the model is not
    /// empty.
    pub fn add_root(&self, mut element: TreeElement<T>) -> Result<ElementId> {
        let id = {
            let mut storage = self.storage.write();
            if !storage.order.is_empty() {
                return Err(Error::invalid_operation(
                    "cannot add a root, the model already has one",
                ));
            }
            let id = storage.next_id()?;
            element.set_id(id);
            element.set_depth(ROOT_DEPTH);
            element.reset_links();
            storage.arena.insert(element);
            storage.order.push(id);
            storage.root = Some(id);
            id
        };

        tracing::debug!(target: targets::MODEL, id, "added root");
        self.signals.changed.emit(TreeChange::RootAdded { id });
        Ok(id)
    }

    /// Inserts a single element, along the same rules as
    /// [`add_elements`](Self::add_elements).
    ///
    /// With `parent == None` the element goes under the root; without a root
    /// this fails with [`Error::InvalidOperation`].
    pub fn add_element(
        &self,
        element: TreeElement<T>,
        parent: Option<ElementId>,
        insert_position: usize,
    ) -> Result<()> {
        let (parent, id) = {
            let mut storage = self.storage.write();
            let parent = match parent.or(storage.root) {
                Some(parent) => parent,
                None => {
                    return Err(Error::invalid_operation(
                        "cannot add an element to a model without a root",
                    ));
                }
            };
            let id = element.id();
            storage.insert_batch(vec![element], parent, insert_position)?;
            (parent, id)
        };

        tracing::debug!(target: targets::MODEL, parent, id, "added element");
        self.signals.changed.emit(TreeChange::Inserted {
            parent,
            ids: vec![id],
        });
        Ok(())
    }

    /// Moves elements, possibly from different parents, to become children of
    /// `new_parent` starting at `insert_index`.
    ///
    /// `insert_index` refers to the parent's children before the move; every
    /// moved element that already sits before it under `new_parent` shifts it
    /// down by one, so the moved block lands next to the same siblings the
    /// caller pointed at. Indices past the end are clamped.
    ///
    /// Fails with [`Error::InvalidArgument`] for unknown ids and with
    /// [`Error::InvalidOperation`] when moving the root, or when moving an
    /// element under itself or one of its descendants.
    pub fn move_elements(
        &self,
        new_parent: ElementId,
        insert_index: usize,
        ids: &[ElementId],
    ) -> Result<()> {
        let (moved, index) = {
            let mut storage = self.storage.write();
            storage.require(new_parent)?;
            for &id in ids {
                storage.require(id)?;
                if storage.root == Some(id) {
                    return Err(Error::invalid_operation("the root element cannot be moved"));
                }
                if id == new_parent || utility::is_ancestor_of(&storage.arena, id, new_parent) {
                    return Err(Error::invalid_operation(format!(
                        "cannot move element {id} under itself or one of its descendants"
                    )));
                }
            }

            let mut seen = HashSet::with_capacity(ids.len());
            let moved: Vec<ElementId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

            let siblings = storage.arena.children_of(new_parent);
            let mut index = insert_index.min(siblings.len());
            index -= siblings[..index].iter().filter(|&&c| seen.contains(&c)).count();

            for &id in &moved {
                storage.detach(id);
            }
            storage.attach(new_parent, index, &moved);
            storage.update_depths_from_root();
            storage.rebuild_order();
            (moved, index)
        };

        tracing::debug!(target: targets::MODEL, new_parent, index, moved = ?moved, "moved elements");
        self.signals.changed.emit(TreeChange::Moved {
            parent: new_parent,
            ids: moved,
        });
        Ok(())
    }
}

impl<T: Clone + Send + Sync + 'static> TreeModel<T> {
    /// Returns a copy of the element with `id`.
    pub fn find(&self, id: ElementId) -> Option<TreeElement<T>> {
        self.storage.read().arena.get(id).cloned()
    }

    /// Returns copies of all elements in flat (pre-order) sequence.
    pub fn elements(&self) -> Vec<TreeElement<T>> {
        let storage = self.storage.read();
        storage
            .order
            .iter()
            .filter_map(|&id| storage.arena.get(id).cloned())
            .collect()
    }
}

impl<T> TreeModel<T> {
    /// Returns the model's signals.
    pub fn signals(&self) -> &TreeModelSignals {
        &self.signals
    }

    /// Consumes the model, returning its elements in flat sequence.
    pub fn into_elements(self) -> Vec<TreeElement<T>> {
        let mut storage = self.storage.into_inner();
        let order = std::mem::take(&mut storage.order);
        order
            .into_iter()
            .filter_map(|id| storage.arena.remove(id))
            .collect()
    }
}

impl<T> fmt::Display for TreeModel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let storage = self.storage.read();
        match storage.root {
            Some(root) => f.write_str(&TreeDebug::new().format_arena(&storage.arena, root)),
            None => f.write_str("(empty)\n"),
        }
    }
}

static_assertions::assert_impl_all!(TreeModel<()>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn scenario() -> TreeModel {
        TreeModel::from_elements(vec![
            TreeElement::with_depth(0, "Root", -1),
            TreeElement::with_depth(1, "A", 0),
            TreeElement::with_depth(3, "Child", 1),
            TreeElement::with_depth(2, "B", 0),
        ])
        .unwrap()
    }

    fn record_changes(model: &TreeModel) -> Arc<Mutex<Vec<TreeChange>>> {
        let changes = Arc::new(Mutex::new(Vec::new()));
        let changes_clone = changes.clone();
        model.signals().changed.connect(move |change| {
            changes_clone.lock().push(change.clone());
        });
        changes
    }

    fn assert_depths_consistent(model: &TreeModel) {
        model.with_arena(|arena, root| {
            for element in arena.iter() {
                match element.parent() {
                    Some(parent) => assert_eq!(
                        element.depth(),
                        arena.get(parent).unwrap().depth() + 1,
                        "depth of {}",
                        element.name()
                    ),
                    None => {
                        assert_eq!(Some(element.id()), root);
                        assert_eq!(element.depth(), ROOT_DEPTH);
                    }
                }
            }
        });
    }

    #[test]
    fn test_scenario_from_flat_sequence() {
        let model = scenario();

        let a = model.find(1).unwrap();
        assert_eq!(a.children(), &[3]);
        assert_eq!(model.find(3).unwrap().name(), "Child");
        assert_eq!(model.get_ancestors(3), vec![1]);
        assert_eq!(model.get_ancestors(0), Vec::<ElementId>::new());
        assert_eq!(model.get_ancestors(2), Vec::<ElementId>::new());
        assert_eq!(model.get_ancestors(99), Vec::<ElementId>::new());

        model.remove_elements(&[1]).unwrap();
        assert_eq!(
            model.records(),
            vec![ElementRecord::new(0, "Root", -1), ElementRecord::new(2, "B", 0)]
        );
        assert!(!model.contains(3));
    }

    #[test]
    fn test_entry_attaches_to_nearest_shallower_predecessor() {
        let model = TreeModel::from_elements(vec![
            TreeElement::with_depth(0, "Root", -1),
            TreeElement::with_depth(1, "A", 0),
            TreeElement::with_depth(2, "B", 0),
            TreeElement::with_depth(3, "Child", 1),
        ])
        .unwrap();

        assert!(model.children_of(1).is_empty());
        assert_eq!(model.children_of(2), vec![3]);
        assert_eq!(model.get_ancestors(3), vec![2]);
    }

    #[test]
    fn test_initialize_empty_and_counter() {
        let model = TreeModel::<()>::new();
        model.initialize(Vec::new()).unwrap();
        assert!(model.is_empty());
        assert_eq!(model.root(), None);
        assert_eq!(model.generate_unique_id().unwrap(), 1);

        let model = scenario();
        assert_eq!(model.generate_unique_id().unwrap(), 4);
        assert_eq!(model.generate_unique_id().unwrap(), 5);
    }

    #[test]
    fn test_id_counter_exhaustion() {
        let model = TreeModel::<()>::from_elements(vec![TreeElement::with_depth(
            ElementId::MAX,
            "Root",
            -1,
        )])
        .unwrap();
        assert!(matches!(
            model.generate_unique_id(),
            Err(Error::InvalidOperation(_))
        ));
        // A failed attempt does not wrap the counter around.
        assert!(model.generate_unique_id().is_err());
        assert_eq!(model.ids(), vec![ElementId::MAX]);

        let model = TreeModel::<()>::from_elements(vec![TreeElement::with_depth(
            ElementId::MAX - 1,
            "Root",
            -1,
        )])
        .unwrap();
        assert_eq!(model.generate_unique_id().unwrap(), ElementId::MAX);
        assert!(model.generate_unique_id().is_err());

        // Caller-chosen ids push the counter up as well.
        let model = TreeModel::<()>::new();
        model.add_root(TreeElement::new(0, "Root")).unwrap();
        model
            .add_element(TreeElement::new(ElementId::MAX, "Last"), None, 0)
            .unwrap();
        assert!(model.generate_unique_id().is_err());
    }

    #[test]
    fn test_initialize_rejects_invalid_structure() {
        let model = scenario();
        let result = model.initialize(vec![
            TreeElement::with_depth(0, "Root", -1),
            TreeElement::with_depth(1, "TooDeep", 1),
        ]);
        assert!(matches!(result, Err(Error::InvalidStructure(_))));
        // Unchanged on failure.
        assert_eq!(model.ids(), vec![0, 1, 3, 2]);
    }

    #[test]
    fn test_remove_root_fails() {
        let model = scenario();
        let changes = record_changes(&model);

        let result = model.remove_elements(&[3, 0]);
        assert!(matches!(result, Err(Error::InvalidOperation(_))));
        assert_eq!(model.len(), 4);
        assert!(changes.lock().is_empty());
    }

    #[test]
    fn test_remove_unknown_id_fails_atomically() {
        let model = scenario();
        let result = model.remove_elements(&[2, 42]);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert!(model.contains(2));
    }

    #[test]
    fn test_remove_keeps_sibling_order() {
        let model = TreeModel::from_elements(vec![
            TreeElement::with_depth(0, "Root", -1),
            TreeElement::with_depth(1, "A", 0),
            TreeElement::with_depth(2, "B", 0),
            TreeElement::with_depth(21, "B1", 1),
            TreeElement::with_depth(22, "B2", 1),
            TreeElement::with_depth(3, "C", 0),
        ])
        .unwrap();
        let changes = record_changes(&model);

        model.remove_elements(&[21, 2]).unwrap();
        assert_eq!(model.ids(), vec![0, 1, 3]);
        assert_eq!(model.children_of(0), vec![1, 3]);
        assert_eq!(*changes.lock(), vec![TreeChange::Removed { ids: vec![2] }]);
    }

    #[test]
    fn test_add_elements() {
        let model = scenario();
        let changes = record_changes(&model);

        let x = TreeElement::new(model.generate_unique_id().unwrap(), "X");
        let y = TreeElement::new(model.generate_unique_id().unwrap(), "Y");
        model.add_elements(vec![x, y], 1, 0).unwrap();

        assert_eq!(model.children_of(1), vec![4, 5, 3]);
        assert_eq!(model.depth_of(4), Some(1));
        assert_eq!(model.parent_of(5), Some(1));
        assert_eq!(model.ids(), vec![0, 1, 4, 5, 3, 2]);
        assert_depths_consistent(&model);
        assert_eq!(
            *changes.lock(),
            vec![TreeChange::Inserted {
                parent: 1,
                ids: vec![4, 5]
            }]
        );
    }

    #[test]
    fn test_add_elements_keeps_subtrees_of_the_batch() {
        let model = scenario();
        let changes = record_changes(&model);

        // X
        // └── X1
        //     ├── X1a
        //     └── X1b
        let mut x = TreeElement::new(10, "X");
        x.children_mut().push(11);
        let mut x1 = TreeElement::new(11, "X1");
        x1.children_mut().extend([12, 13]);
        let x1a = TreeElement::new(12, "X1a");
        let x1b = TreeElement::new(13, "X1b");

        model.add_elements(vec![x, x1, x1a, x1b], 2, 0).unwrap();

        assert_eq!(model.children_of(2), vec![10]);
        assert_eq!(model.children_of(10), vec![11]);
        assert_eq!(model.children_of(11), vec![12, 13]);
        assert_eq!(model.parent_of(12), Some(11));
        assert_eq!(model.depth_of(10), Some(1));
        assert_eq!(model.depth_of(13), Some(3));
        assert_eq!(model.ids(), vec![0, 1, 3, 2, 10, 11, 12, 13]);
        assert_eq!(model.get_ancestors(13), vec![11, 10, 2]);
        assert_depths_consistent(&model);
        assert_eq!(
            *changes.lock(),
            vec![TreeChange::Inserted {
                parent: 2,
                ids: vec![10]
            }]
        );
    }

    #[test]
    fn test_copied_subtree_keeps_shape_in_another_model() {
        let source = TreeModel::from_elements(vec![
            TreeElement::with_depth(0, "Root", -1),
            TreeElement::with_depth(1, "A", 0),
            TreeElement::with_depth(11, "A1", 1),
            TreeElement::with_depth(111, "A1a", 2),
        ])
        .unwrap();
        let target = TreeModel::from_elements(vec![
            TreeElement::with_depth(100, "Root", -1),
            TreeElement::with_depth(101, "Folder", 0),
        ])
        .unwrap();

        // A1a is left behind; the link to it is dropped.
        let a = source.find(1).unwrap();
        let a1 = source.find(11).unwrap();
        target.add_elements(vec![a, a1], 101, 0).unwrap();

        assert_eq!(target.children_of(101), vec![1]);
        assert_eq!(target.children_of(1), vec![11]);
        assert!(target.children_of(11).is_empty());
        assert_eq!(target.depth_of(1), Some(1));
        assert_eq!(target.depth_of(11), Some(2));
        assert_eq!(target.ids(), vec![100, 101, 1, 11]);
        assert_depths_consistent(&target);
    }

    #[test]
    fn test_removed_subtree_can_be_reinserted() {
        let model = TreeModel::from_elements(vec![
            TreeElement::with_depth(0, "Root", -1),
            TreeElement::with_depth(1, "A", 0),
            TreeElement::with_depth(11, "A1", 1),
            TreeElement::with_depth(111, "A1a", 2),
            TreeElement::with_depth(12, "A2", 1),
            TreeElement::with_depth(2, "B", 0),
        ])
        .unwrap();

        let removed = model.remove_elements(&[1]).unwrap();
        let ids: Vec<ElementId> = removed.iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec![1, 11, 111, 12]);
        assert_eq!(removed[0].parent(), None);
        assert_eq!(model.ids(), vec![0, 2]);

        model.add_elements(removed, 2, 0).unwrap();
        assert_eq!(model.ids(), vec![0, 2, 1, 11, 111, 12]);
        assert_eq!(model.children_of(1), vec![11, 12]);
        assert_eq!(model.depth_of(111), Some(3));
        assert_depths_consistent(&model);
    }

    #[test]
    fn test_add_elements_rejects_tangled_batches() {
        let model = scenario();

        let mut x = TreeElement::new(10, "X");
        x.children_mut().push(12);
        let mut y = TreeElement::new(11, "Y");
        y.children_mut().push(12);
        let z = TreeElement::new(12, "Z");
        let result = model.add_elements(vec![x, y, z], 2, 0);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        let mut x = TreeElement::new(10, "X");
        x.children_mut().push(11);
        let mut y = TreeElement::new(11, "Y");
        y.children_mut().push(10);
        let result = model.add_elements(vec![x, y], 2, 0);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        let mut looped = TreeElement::new(10, "Loop");
        looped.children_mut().push(10);
        let result = model.add_element(looped, Some(2), 0);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        assert_eq!(model.ids(), vec![0, 1, 3, 2]);
    }

    #[test]
    fn test_add_elements_invalid_arguments() {
        let model = scenario();

        let result = model.add_elements(vec![TreeElement::new(10, "X")], 77, 0);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        let result = model.add_elements(vec![TreeElement::new(10, "X")], 1, 2);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        let result = model.add_elements(vec![TreeElement::new(3, "Dup")], 2, 0);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        let result = model.add_elements(
            vec![TreeElement::new(10, "X"), TreeElement::new(10, "X again")],
            2,
            0,
        );
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert_eq!(model.len(), 4);
    }

    #[test]
    fn test_add_root() {
        let model = TreeModel::<()>::new();
        let changes = record_changes(&model);

        let root = model.add_root(TreeElement::new(0, "Root")).unwrap();
        assert_eq!(root, 1);
        assert_eq!(model.root(), Some(1));
        assert_eq!(model.depth_of(1), Some(ROOT_DEPTH));
        assert_eq!(model.ids(), vec![1]);

        let again = model.add_root(TreeElement::new(0, "Other"));
        assert!(matches!(again, Err(Error::InvalidOperation(_))));
        assert_eq!(*changes.lock(), vec![TreeChange::RootAdded { id: 1 }]);
    }

    #[test]
    fn test_add_element_defaults_to_root() {
        let model = TreeModel::<()>::new();
        let orphan = model.add_element(TreeElement::new(5, "Orphan"), None, 0);
        assert!(matches!(orphan, Err(Error::InvalidOperation(_))));

        let root = model.add_root(TreeElement::new(0, "Root")).unwrap();
        let a = model.generate_unique_id().unwrap();
        model.add_element(TreeElement::new(a, "A"), None, 0).unwrap();
        let b = model.generate_unique_id().unwrap();
        model.add_element(TreeElement::new(b, "B"), Some(a), 0).unwrap();

        assert_eq!(model.children_of(root), vec![a]);
        assert_eq!(model.depth_of(a), Some(0));
        assert_eq!(model.depth_of(b), Some(1));
        assert_eq!(model.ids(), vec![root, a, b]);
    }

    #[test]
    fn test_move_within_same_parent() {
        let model = TreeModel::from_elements(vec![
            TreeElement::with_depth(0, "Root", -1),
            TreeElement::with_depth(1, "A", 0),
            TreeElement::with_depth(2, "B", 0),
            TreeElement::with_depth(3, "C", 0),
        ])
        .unwrap();

        // B is the second child; bring it to the front.
        model.move_elements(0, 0, &[2]).unwrap();
        assert_eq!(model.children_of(0), vec![2, 1, 3]);

        // Move A (index 1) to just before C (index 2): the index shifts down.
        model.move_elements(0, 2, &[1]).unwrap();
        assert_eq!(model.children_of(0), vec![2, 1, 3]);

        // Past the end clamps and appends.
        model.move_elements(0, 10, &[2]).unwrap();
        assert_eq!(model.children_of(0), vec![1, 3, 2]);
    }

    #[test]
    fn test_move_across_parents_updates_depths() {
        let model = TreeModel::from_elements(vec![
            TreeElement::with_depth(0, "Root", -1),
            TreeElement::with_depth(1, "A", 0),
            TreeElement::with_depth(11, "A1", 1),
            TreeElement::with_depth(111, "A1a", 2),
            TreeElement::with_depth(2, "B", 0),
            TreeElement::with_depth(21, "B1", 1),
        ])
        .unwrap();
        let changes = record_changes(&model);

        model.move_elements(21, 0, &[11]).unwrap();
        assert_eq!(model.parent_of(11), Some(21));
        assert_eq!(model.depth_of(11), Some(2));
        assert_eq!(model.depth_of(111), Some(3));
        assert!(model.children_of(1).is_empty());
        assert_eq!(model.ids(), vec![0, 1, 2, 21, 11, 111]);
        assert_depths_consistent(&model);

        // Elements from different parents land together, in the given order.
        model.move_elements(0, 1, &[111, 21]).unwrap();
        assert_eq!(model.children_of(0), vec![1, 111, 21, 2]);
        assert_eq!(model.depth_of(111), Some(0));
        assert_eq!(model.depth_of(11), Some(1));
        assert_depths_consistent(&model);

        assert_eq!(
            changes.lock().last(),
            Some(&TreeChange::Moved {
                parent: 0,
                ids: vec![111, 21]
            })
        );
    }

    #[test]
    fn test_move_rejects_cycles() {
        let model = scenario();
        let result = model.move_elements(3, 0, &[1]);
        assert!(matches!(result, Err(Error::InvalidOperation(_))));
        let result = model.move_elements(1, 0, &[1]);
        assert!(matches!(result, Err(Error::InvalidOperation(_))));
        let result = model.move_elements(1, 0, &[0]);
        assert!(matches!(result, Err(Error::InvalidOperation(_))));
        assert_eq!(model.ids(), vec![0, 1, 3, 2]);
    }

    #[test]
    fn test_descendants_that_have_children() {
        let model = TreeModel::from_elements(vec![
            TreeElement::with_depth(0, "Root", -1),
            TreeElement::with_depth(1, "A", 0),
            TreeElement::with_depth(11, "A1", 1),
            TreeElement::with_depth(111, "A1a", 2),
            TreeElement::with_depth(12, "A2", 1),
            TreeElement::with_depth(2, "B", 0),
        ])
        .unwrap();

        let mut found = model.get_descendants_that_have_children(0);
        found.sort_unstable();
        assert_eq!(found, vec![0, 1, 11]);
        assert!(model.get_descendants_that_have_children(12).is_empty());
        assert!(model.get_descendants_that_have_children(404).is_empty());
    }

    #[test]
    fn test_rename_and_data() {
        let model = TreeModel::from_elements(vec![
            TreeElement::with_payload(0, "Root", -1, 0u32),
            TreeElement::with_payload(1, "A", 0, 7u32),
        ])
        .unwrap();

        model.rename(1, "Renamed").unwrap();
        assert_eq!(model.name_of(1).as_deref(), Some("Renamed"));
        assert!(matches!(model.rename(9, "x"), Err(Error::InvalidArgument(_))));

        assert_eq!(model.with_data_mut(1, |value| {
            *value += 1;
            *value
        }), Some(8));
        assert_eq!(model.find(1).unwrap().data(), &8);
    }

    #[test]
    fn test_observer_can_read_model() {
        let model = Arc::new(scenario());
        let seen = Arc::new(Mutex::new(0));

        let model_clone = Arc::downgrade(&model);
        let seen_clone = seen.clone();
        model.signals().changed.connect(move |_| {
            if let Some(model) = model_clone.upgrade() {
                *seen_clone.lock() = model.len();
            }
        });

        model.remove_elements(&[3]).unwrap();
        assert_eq!(*seen.lock(), 3);
    }

    #[test]
    fn test_into_elements_and_clear() {
        let model = scenario();
        let names: Vec<String> = model
            .elements()
            .iter()
            .map(|e| e.name().to_owned())
            .collect();
        assert_eq!(names, vec!["Root", "A", "Child", "B"]);

        let owned = scenario().into_elements();
        assert_eq!(owned.len(), 4);
        assert_eq!(owned[2].parent(), Some(1));

        model.clear();
        assert!(model.is_empty());
        assert_eq!(format!("{model}"), "(empty)\n");
    }
}
