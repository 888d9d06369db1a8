//! Conversions between the flat element sequence and the linked tree.
//!
//! The flat sequence is the pre-order listing of a tree, root first, each
//! entry tagged with its depth. It is valid when:
//!
//! - the first entry has depth -1,
//! - no later entry has a negative depth,
//! - depth grows by at most one between consecutive entries.
//!
//! ```
//! use grove::{TreeElement, utility};
//!
//! let flat = vec![
//!     TreeElement::with_depth(0, "Root", -1),
//!     TreeElement::with_depth(1, "A", 0),
//!     TreeElement::with_depth(3, "Child", 1),
//!     TreeElement::with_depth(2, "B", 0),
//! ];
//! let (arena, root) = utility::list_to_tree(flat).unwrap();
//! assert_eq!(arena.children_of(root), &[1, 2]);
//! assert_eq!(utility::tree_to_list(&arena, root), vec![0, 1, 3, 2]);
//! ```

use std::collections::HashSet;

use crate::element::{ElementId, ROOT_DEPTH, TreeArena, TreeElement};
use crate::error::{Error, Result};

/// Lists `root` and its descendants in pre-order, children in stored order.
///
/// Returns an empty list if `root` is not in the arena.
pub fn tree_to_list<T>(arena: &TreeArena<T>, root: ElementId) -> Vec<ElementId> {
    let mut result = Vec::with_capacity(arena.len());
    if !arena.contains(root) {
        return result;
    }

    let mut stack = vec![root];
    while let Some(current) = stack.pop() {
        result.push(current);
        stack.extend(arena.children_of(current).iter().rev().copied());
    }
    result
}

/// Checks that `elements` is a valid flat sequence.
pub fn validate_depths<T>(elements: &[TreeElement<T>]) -> Result<()> {
    let Some(first) = elements.first() else {
        return Err(Error::invalid_structure(
            "input element list is empty, at least a root element is required",
        ));
    };

    if first.depth() != ROOT_DEPTH {
        return Err(Error::invalid_structure(format!(
            "first element '{}' must have depth {ROOT_DEPTH}, found {}",
            first.name(),
            first.depth()
        )));
    }

    for pair in elements.windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);
        if current.depth() < 0 {
            return Err(Error::invalid_structure(format!(
                "element '{}' (id {}) has negative depth {}; only the first element may be the root",
                current.name(),
                current.id(),
                current.depth()
            )));
        }
        if current.depth() > previous.depth() + 1 {
            return Err(Error::invalid_structure(format!(
                "depth jumps from {} to {} at element '{}' (id {})",
                previous.depth(),
                current.depth(),
                current.name(),
                current.id()
            )));
        }
    }

    Ok(())
}

/// Builds the linked tree described by a flat sequence.
///
/// All existing parent and child links are discarded first. Returns the
/// arena owning every element and the id of the root (the first element).
pub fn list_to_tree<T>(mut elements: Vec<TreeElement<T>>) -> Result<(TreeArena<T>, ElementId)> {
    validate_depths(&elements)?;

    let mut seen = HashSet::with_capacity(elements.len());
    for element in &elements {
        if !seen.insert(element.id()) {
            return Err(Error::invalid_structure(format!(
                "element id {} appears more than once",
                element.id()
            )));
        }
    }

    for element in &mut elements {
        element.reset_links();
    }

    for parent_index in 0..elements.len() {
        let parent_id = elements[parent_index].id();
        let parent_depth = elements[parent_index].depth();

        // Deeper entries belong to a grandchild and are linked when the scan
        // reaches their own parent.
        let children: Vec<usize> = elements[parent_index + 1..]
            .iter()
            .take_while(|e| e.depth() > parent_depth)
            .enumerate()
            .filter(|(_, e)| e.depth() == parent_depth + 1)
            .map(|(offset, _)| parent_index + 1 + offset)
            .collect();

        for &child_index in &children {
            elements[child_index].set_parent(Some(parent_id));
        }
        let child_ids: Vec<ElementId> = children.iter().map(|&i| elements[i].id()).collect();
        *elements[parent_index].children_mut() = child_ids;
    }

    let root = elements[0].id();
    let mut arena = TreeArena::with_capacity(elements.len());
    for element in elements {
        arena.insert(element);
    }
    Ok((arena, root))
}

/// Propagates `root`'s depth to all of its descendants.
pub fn update_depth_values<T>(arena: &mut TreeArena<T>, root: ElementId) {
    let mut stack = vec![root];
    while let Some(current) = stack.pop() {
        let Some(depth) = arena.get(current).map(|e| e.depth()) else {
            continue;
        };
        let children = arena.children_of(current).to_vec();
        for child in children {
            if let Some(element) = arena.get_mut(child) {
                element.set_depth(depth + 1);
            }
            stack.push(child);
        }
    }
}

/// Returns `true` if an ancestor of `id` (not `id` itself) is in `candidates`.
///
/// Walks the parent chain, so it costs O(depth).
pub fn is_child_of_any_element<T>(
    arena: &TreeArena<T>,
    id: ElementId,
    candidates: &HashSet<ElementId>,
) -> bool {
    let mut current = arena.parent_of(id);
    while let Some(parent) = current {
        if candidates.contains(&parent) {
            return true;
        }
        current = arena.parent_of(parent);
    }
    false
}

/// Returns `true` if `ancestor` lies on the parent chain of `id`.
pub fn is_ancestor_of<T>(arena: &TreeArena<T>, ancestor: ElementId, id: ElementId) -> bool {
    let mut current = arena.parent_of(id);
    while let Some(parent) = current {
        if parent == ancestor {
            return true;
        }
        current = arena.parent_of(parent);
    }
    false
}

/// Reduces `ids` to its top-most members.
///
/// Members that descend from another member are dropped, so that an edit
/// acting on the result touches every selected subtree exactly once. Input
/// order is preserved.
pub fn find_common_ancestors_within_list<T>(
    arena: &TreeArena<T>,
    ids: &[ElementId],
) -> Vec<ElementId> {
    if ids.len() == 1 {
        return ids.to_vec();
    }

    let candidates: HashSet<ElementId> = ids.iter().copied().collect();
    ids.iter()
        .copied()
        .filter(|&id| !is_child_of_any_element(arena, id, &candidates))
        .collect()
}
