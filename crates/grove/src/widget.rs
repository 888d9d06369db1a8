//! Contracts between the view controller and the host UI layer.
//!
//! The controller never draws anything itself. The host provides row
//! widgets implementing [`RowWidget`] and a scrollable content area
//! implementing [`ScrollContent`], and forwards row clicks as [`RowEvent`]s.

use crate::element::{ElementId, TreeElement};
use crate::pool::PooledWidget;

/// Geometry of a row inside the scrollable content area.
///
/// Rows are anchored to the top edge: row `i` sits at `y = -i * height`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RowRect {
    /// Horizontal offset, always 0 for tree rows.
    pub x: f32,
    /// Vertical offset from the top edge (zero or negative).
    pub y: f32,
    /// Row width.
    pub width: f32,
    /// Row height.
    pub height: f32,
}

impl RowRect {
    /// Creates a row rectangle.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Presentation state of a row, passed to [`RowWidget::configure`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowState {
    /// Position of the row in the visible projection.
    pub index: usize,
    /// Id of the bound element.
    pub element_id: ElementId,
    /// Horizontal indent: depth times the indent width.
    pub indent: f32,
    /// Whether the element has children (show an expand toggle).
    pub has_children: bool,
    /// Whether the element is expanded.
    pub expanded: bool,
    /// Whether the element is the current selection.
    pub selected: bool,
}

/// Input a row widget forwards to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowEvent {
    /// The expand/collapse toggle was pressed.
    ToggleExpand,
    /// The row body was clicked.
    Clicked,
}

/// A recyclable widget that renders one tree row.
///
/// Base rendering (showing the element name) is the widget's own job in
/// [`configure`](Self::configure); a view's row customizer runs afterwards
/// and may override it.
pub trait RowWidget<T>: PooledWidget {
    /// Positions the widget in the content area.
    fn set_geometry(&mut self, rect: RowRect);

    /// Binds the widget to `element` and applies the row state.
    fn configure(&mut self, state: &RowState, element: &TreeElement<T>);
}

/// The scrollable content area hosting the rows.
pub trait ScrollContent {
    /// Width available to each row.
    fn full_width(&self) -> f32;

    /// Resizes the scrollable content.
    fn set_content_size(&mut self, width: f32, height: f32);
}
