//! Virtualized tree view controller.
//!
//! [`TreeViewController`] projects a [`TreeModel`] onto a flat list of rows
//! and renders that list with recycled widgets from a [`RowWidgetPool`].
//! Only rows whose whole ancestor chain is expanded are part of the
//! projection; the synthetic root is never shown.
//!
//! The controller subscribes to the bound model's `changed` signal. The slot
//! only raises a dirty flag, so the host decides when to pay for a rebuild
//! (usually once per frame through [`TreeViewController::rebuild_if_dirty`]).

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use grove_core::logging::targets;
use grove_core::{ConnectionId, PerfSpan, Signal};
use slotmap::SecondaryMap;

use crate::element::{ElementId, TreeArena, TreeElement};
use crate::pool::{RowKey, RowWidgetPool};
use crate::tree_model::TreeModel;
use crate::widget::{RowEvent, RowRect, RowState, RowWidget, ScrollContent};

/// Layout settings for a tree view.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewConfig {
    /// Fixed height of every row.
    pub row_height: f32,
    /// Horizontal indent per depth level.
    pub indent_width: f32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            row_height: 24.0,
            indent_width: 20.0,
        }
    }
}

/// Hook run on every row after the widget configured itself.
///
/// It receives a copy of the element and runs while the model is unlocked,
/// so it may read or edit the model. Edits mark the view dirty again.
pub type RowCustomizer<T, W> = Box<dyn Fn(&mut W, &TreeElement<T>) + Send + Sync>;

/// Renders a [`TreeModel`] as a list of pooled row widgets.
///
/// # Signals
///
/// - `expand_changed(id, element, expanded)`: a node was expanded or collapsed
/// - `selection_changed(id, element)`: the selection moved
///
/// The element is `None` when the id no longer resolves in the tree.
///
/// # Example
///
/// ```ignore
/// let model = Arc::new(TreeModel::from_elements(elements)?);
/// let mut view = TreeViewController::new()
///     .with_pool(RowWidgetPool::new(MyRow::default))
///     .with_content(scroll_area)
///     .with_row_height(28.0);
/// view.bind(model.clone());
///
/// view.selection_changed.connect(|(id, element)| {
///     println!("selected {id:?}: {:?}", element.as_ref().map(|e| e.name()));
/// });
/// ```
pub struct TreeViewController<T, W, C> {
    model: Option<Arc<TreeModel<T>>>,
    connection: Option<ConnectionId>,
    model_dirty: Arc<AtomicBool>,
    layout_dirty: bool,

    pool: Option<RowWidgetPool<W>>,
    content: Option<C>,
    config: ViewConfig,

    expanded_ids: HashSet<ElementId>,
    selected: Option<ElementId>,

    visible_rows: Vec<ElementId>,
    row_keys: Vec<RowKey>,
    bindings: SecondaryMap<RowKey, ElementId>,

    customizer: Option<RowCustomizer<T, W>>,

    /// Signal emitted when a node is expanded or collapsed.
    pub expand_changed: Signal<(ElementId, Option<TreeElement<T>>, bool)>,
    /// Signal emitted when the selected node changes.
    pub selection_changed: Signal<(Option<ElementId>, Option<TreeElement<T>>)>,
}

impl<T, W, C> Default for TreeViewController<T, W, C>
where
    T: Clone + Send + Sync + 'static,
    W: RowWidget<T>,
    C: ScrollContent,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, W, C> TreeViewController<T, W, C>
where
    T: Clone + Send + Sync + 'static,
    W: RowWidget<T>,
    C: ScrollContent,
{
    /// Creates an unbound controller without pool or content area.
    pub fn new() -> Self {
        Self {
            model: None,
            connection: None,
            model_dirty: Arc::new(AtomicBool::new(false)),
            layout_dirty: false,
            pool: None,
            content: None,
            config: ViewConfig::default(),
            expanded_ids: HashSet::new(),
            selected: None,
            visible_rows: Vec::new(),
            row_keys: Vec::new(),
            bindings: SecondaryMap::new(),
            customizer: None,
            expand_changed: Signal::new(),
            selection_changed: Signal::new(),
        }
    }

    // =========================================================================
    // Builder Pattern Methods
    // =========================================================================

    /// Sets the row widget pool using builder pattern.
    pub fn with_pool(mut self, pool: RowWidgetPool<W>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Sets the scrollable content area using builder pattern.
    pub fn with_content(mut self, content: C) -> Self {
        self.content = Some(content);
        self
    }

    /// Sets the whole layout configuration using builder pattern.
    pub fn with_config(mut self, config: ViewConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the row height using builder pattern.
    pub fn with_row_height(mut self, height: f32) -> Self {
        self.config.row_height = height;
        self
    }

    /// Sets the indent width using builder pattern.
    pub fn with_indent_width(mut self, width: f32) -> Self {
        self.config.indent_width = width;
        self
    }

    /// Sets the row customizer using builder pattern.
    pub fn with_row_customizer<F>(mut self, customizer: F) -> Self
    where
        F: Fn(&mut W, &TreeElement<T>) + Send + Sync + 'static,
    {
        self.customizer = Some(Box::new(customizer));
        self
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Replaces the row widget pool. Rows are rebuilt on the next refresh.
    pub fn set_pool(&mut self, pool: RowWidgetPool<W>) {
        self.pool = Some(pool);
        self.clear_rows();
        self.layout_dirty = true;
    }

    /// Replaces the scrollable content area.
    pub fn set_content(&mut self, content: C) {
        self.content = Some(content);
        self.layout_dirty = true;
    }

    /// Returns the layout configuration.
    pub fn config(&self) -> ViewConfig {
        self.config
    }

    /// Replaces the layout configuration.
    pub fn set_config(&mut self, config: ViewConfig) {
        if self.config != config {
            self.config = config;
            self.layout_dirty = true;
        }
    }

    /// Sets the row height.
    pub fn set_row_height(&mut self, height: f32) {
        self.set_config(ViewConfig {
            row_height: height,
            ..self.config
        });
    }

    /// Sets the indent width.
    pub fn set_indent_width(&mut self, width: f32) {
        self.set_config(ViewConfig {
            indent_width: width,
            ..self.config
        });
    }

    /// Installs the hook run on every row after the widget configured itself.
    pub fn set_row_customizer<F>(&mut self, customizer: F)
    where
        F: Fn(&mut W, &TreeElement<T>) + Send + Sync + 'static,
    {
        self.customizer = Some(Box::new(customizer));
        self.layout_dirty = true;
    }

    /// Removes the row customizer, leaving rendering to the widgets.
    pub fn clear_row_customizer(&mut self) {
        if self.customizer.take().is_some() {
            self.layout_dirty = true;
        }
    }

    // =========================================================================
    // Model Binding
    // =========================================================================

    /// Returns the bound model.
    pub fn model(&self) -> Option<&Arc<TreeModel<T>>> {
        self.model.as_ref()
    }

    /// Binds the view to `model` and rebuilds.
    ///
    /// Expand state and selection are reset.
    pub fn bind(&mut self, model: Arc<TreeModel<T>>) {
        self.disconnect_model();

        let dirty = Arc::clone(&self.model_dirty);
        let connection = model.signals().changed.connect(move |_| {
            dirty.store(true, Ordering::Release);
        });
        tracing::debug!(target: targets::VIEW, root = ?model.root(), "binding model");

        self.model = Some(model);
        self.connection = Some(connection);
        self.expanded_ids.clear();
        self.selected = None;
        self.rebuild();
    }

    /// Detaches the view from its model and returns every row to the pool.
    pub fn unbind(&mut self) {
        self.disconnect_model();
        self.model = None;
        self.expanded_ids.clear();
        self.selected = None;
        self.visible_rows.clear();
        self.clear_rows();
        if let Some(content) = self.content.as_mut() {
            let width = content.full_width();
            content.set_content_size(width, 0.0);
        }
    }

    /// Returns `true` if the model changed or the layout was invalidated since
    /// the last rebuild.
    pub fn is_dirty(&self) -> bool {
        self.layout_dirty || self.model_dirty.load(Ordering::Acquire)
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Recomputes the visible rows and re-renders them.
    ///
    /// Does nothing while no model, pool or content area is set.
    pub fn rebuild(&mut self) {
        let Some(model) = self.model.clone() else {
            tracing::trace!(target: targets::VIEW, "rebuild skipped: no model bound");
            return;
        };
        let (Some(pool), Some(content)) = (self.pool.as_mut(), self.content.as_mut()) else {
            tracing::trace!(target: targets::VIEW, "rebuild skipped: no row pool or content area");
            return;
        };

        let _span = PerfSpan::new("tree_view_rebuild");
        self.model_dirty.store(false, Ordering::Release);
        self.layout_dirty = false;

        pool.release_all();
        self.row_keys.clear();
        self.bindings.clear();

        let config = self.config;
        let expanded = &self.expanded_ids;
        let selected = self.selected;
        let customizer = self.customizer.as_deref();
        let row_keys = &mut self.row_keys;
        let bindings = &mut self.bindings;

        // Copies are taken under the read lock; widgets and the customizer
        // only run once it is released, so they may call into the model.
        let elements: Vec<TreeElement<T>> = model.with_arena(|arena, root| {
            let mut rows = Vec::new();
            if let Some(root) = root {
                project_rows(arena, root, expanded, &mut rows);
            }
            rows.iter().filter_map(|&id| arena.get(id).cloned()).collect()
        });

        let width = content.full_width();
        content.set_content_size(width, elements.len() as f32 * config.row_height);

        let mut rows = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            let id = element.id();
            let key = pool.get();
            if let Some(widget) = pool.get_mut(key) {
                widget.set_geometry(RowRect::new(
                    0.0,
                    -(index as f32) * config.row_height,
                    width,
                    config.row_height,
                ));
                let state = RowState {
                    index,
                    element_id: id,
                    indent: element.depth() as f32 * config.indent_width,
                    has_children: element.has_children(),
                    expanded: expanded.contains(&id),
                    selected: selected == Some(id),
                };
                widget.configure(&state, element);
                if let Some(customize) = customizer {
                    customize(widget, element);
                }
            }
            row_keys.push(key);
            bindings.insert(key, id);
            rows.push(id);
        }

        tracing::trace!(target: targets::VIEW, rows = rows.len(), "rebuilt tree view");
        self.visible_rows = rows;
    }

    /// Rebuilds if the model or layout changed since the last rebuild.
    ///
    /// Returns `true` if a rebuild happened.
    pub fn rebuild_if_dirty(&mut self) -> bool {
        if !self.is_dirty() {
            return false;
        }
        self.rebuild();
        true
    }

    /// Ids of the visible rows, top to bottom.
    pub fn visible_rows(&self) -> &[ElementId] {
        &self.visible_rows
    }

    /// Number of visible rows.
    pub fn row_count(&self) -> usize {
        self.visible_rows.len()
    }

    /// Returns the visible row index of `id`.
    pub fn row_for(&self, id: ElementId) -> Option<usize> {
        self.visible_rows.iter().position(|&row| row == id)
    }

    /// Returns the widget key rendering row `index`.
    pub fn row_key(&self, index: usize) -> Option<RowKey> {
        self.row_keys.get(index).copied()
    }

    /// Returns the element id bound to the widget `key`.
    pub fn element_for_key(&self, key: RowKey) -> Option<ElementId> {
        self.bindings.get(key).copied()
    }

    /// Returns the active widget for `key`.
    ///
    /// Keys are only valid until the next rebuild.
    pub fn widget(&self, key: RowKey) -> Option<&W> {
        self.pool.as_ref()?.get_ref(key)
    }

    /// Returns the widget rendering row `index`.
    pub fn widget_at_row(&self, index: usize) -> Option<&W> {
        self.widget(self.row_key(index)?)
    }

    /// Returns the row widget pool.
    pub fn pool(&self) -> Option<&RowWidgetPool<W>> {
        self.pool.as_ref()
    }

    /// Returns the scrollable content area.
    pub fn content(&self) -> Option<&C> {
        self.content.as_ref()
    }

    /// Returns the scrollable content area mutably.
    ///
    /// Call [`set_content`](Self::set_content) instead when its width
    /// changes, so the rows are laid out again.
    pub fn content_mut(&mut self) -> Option<&mut C> {
        self.content.as_mut()
    }

    // =========================================================================
    // Expand State
    // =========================================================================

    /// Returns `true` if `id` is expanded.
    pub fn is_expanded(&self, id: ElementId) -> bool {
        self.expanded_ids.contains(&id)
    }

    /// Expands or collapses `id`.
    ///
    /// Does nothing if `id` is already in the requested state. Otherwise
    /// emits `expand_changed` and rebuilds.
    pub fn set_expanded(&mut self, id: ElementId, expanded: bool) {
        let changed = if expanded {
            self.expanded_ids.insert(id)
        } else {
            self.expanded_ids.remove(&id)
        };
        if !changed {
            return;
        }

        tracing::debug!(target: targets::VIEW, id, expanded, "expand state changed");
        let element = self.find_element(id);
        self.expand_changed.emit((id, element, expanded));
        self.rebuild();
    }

    /// Flips the expand state of `id`.
    pub fn toggle_expanded(&mut self, id: ElementId) {
        let expanded = self.is_expanded(id);
        self.set_expanded(id, !expanded);
    }

    /// Expands every node that has children.
    ///
    /// A bulk reset: `expand_changed` is not emitted.
    pub fn expand_all(&mut self) {
        let Some(model) = self.model.clone() else {
            return;
        };
        let expanded = &mut self.expanded_ids;
        model.with_arena(|arena, root| {
            if let Some(root) = root {
                collect_expandable(arena, root, expanded);
            }
        });
        tracing::debug!(target: targets::VIEW, count = self.expanded_ids.len(), "expanded all");
        self.rebuild();
    }

    /// Collapses every node. Like [`expand_all`](Self::expand_all), this
    /// does not emit `expand_changed`.
    pub fn collapse_all(&mut self) {
        self.expanded_ids.clear();
        tracing::debug!(target: targets::VIEW, "collapsed all");
        self.rebuild();
    }

    /// Expands every ancestor of `id` so that it becomes visible.
    ///
    /// Emits `expand_changed` for each ancestor that was collapsed, outermost
    /// first, then rebuilds once.
    pub fn expand_to(&mut self, id: ElementId) {
        let Some(model) = self.model.as_ref() else {
            return;
        };
        let ancestors = model.get_ancestors(id);
        let opened: Vec<ElementId> = ancestors
            .into_iter()
            .rev()
            .filter(|&ancestor| self.expanded_ids.insert(ancestor))
            .collect();
        if opened.is_empty() {
            return;
        }

        tracing::debug!(target: targets::VIEW, id, opened = ?opened, "expanded ancestors");
        for ancestor in opened {
            let element = self.find_element(ancestor);
            self.expand_changed.emit((ancestor, element, true));
        }
        self.rebuild();
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Returns the selected element id.
    pub fn selected(&self) -> Option<ElementId> {
        self.selected
    }

    /// Selects `id`, or clears the selection with `None`.
    ///
    /// Does nothing if the selection is unchanged. Otherwise emits
    /// `selection_changed` and rebuilds.
    pub fn select(&mut self, id: Option<ElementId>) {
        if self.selected == id {
            return;
        }
        self.selected = id;

        tracing::debug!(target: targets::VIEW, ?id, "selection changed");
        let element = id.and_then(|id| self.find_element(id));
        self.selection_changed.emit((id, element));
        self.rebuild();
    }

    /// Clears the selection.
    pub fn clear_selection(&mut self) {
        self.select(None);
    }

    // =========================================================================
    // Input
    // =========================================================================

    /// Routes an input from the row widget `key`.
    ///
    /// Events from keys that are not bound to a row are ignored.
    pub fn handle_row_event(&mut self, key: RowKey, event: RowEvent) {
        let Some(id) = self.element_for_key(key) else {
            tracing::debug!(target: targets::VIEW, ?key, ?event, "event from unbound row ignored");
            return;
        };
        match event {
            RowEvent::ToggleExpand => self.toggle_expanded(id),
            RowEvent::Clicked => self.select(Some(id)),
        }
    }

    /// Resolves `id` by walking down from the root.
    ///
    /// Returns `None` if no model is bound or `id` is not in the tree.
    pub fn find_element(&self, id: ElementId) -> Option<TreeElement<T>> {
        let model = self.model.as_ref()?;
        let found = model.with_arena(|arena, root| {
            root.and_then(|root| find_in_subtree(arena, root, id))
                .cloned()
        });
        if found.is_none() {
            tracing::debug!(target: targets::VIEW, id, "element not found in bound tree");
        }
        found
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    fn clear_rows(&mut self) {
        if let Some(pool) = self.pool.as_mut() {
            pool.release_all();
        }
        self.row_keys.clear();
        self.bindings.clear();
    }
}

impl<T, W, C> TreeViewController<T, W, C> {
    fn disconnect_model(&mut self) {
        if let (Some(model), Some(connection)) = (self.model.as_ref(), self.connection.take()) {
            model.signals().changed.disconnect(connection);
        }
    }
}

impl<T, W, C> Drop for TreeViewController<T, W, C> {
    fn drop(&mut self) {
        self.disconnect_model();
    }
}

/// Appends the visible descendants of `parent` in pre-order.
fn project_rows<T>(
    arena: &TreeArena<T>,
    parent: ElementId,
    expanded: &HashSet<ElementId>,
    rows: &mut Vec<ElementId>,
) {
    for &child in arena.children_of(parent) {
        rows.push(child);
        if !arena.children_of(child).is_empty() && expanded.contains(&child) {
            project_rows(arena, child, expanded, rows);
        }
    }
}

fn collect_expandable<T>(arena: &TreeArena<T>, parent: ElementId, out: &mut HashSet<ElementId>) {
    for &child in arena.children_of(parent) {
        if !arena.children_of(child).is_empty() {
            out.insert(child);
            collect_expandable(arena, child, out);
        }
    }
}

fn find_in_subtree<T>(
    arena: &TreeArena<T>,
    current: ElementId,
    target: ElementId,
) -> Option<&TreeElement<T>> {
    let element = arena.get(current)?;
    if element.id() == target {
        return Some(element);
    }
    element
        .children()
        .iter()
        .find_map(|&child| find_in_subtree(arena, child, target))
}
