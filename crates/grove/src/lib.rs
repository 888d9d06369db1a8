//! Grove: a list-backed tree model with a recycling tree view controller.
//!
//! The crate is split in two layers:
//!
//! - **Model**: [`TreeModel`] owns a tree of [`TreeElement`]s and keeps the
//!   pre-order flat sequence and the parent/child graph in sync across
//!   inserts, removals and moves. Changes are broadcast as [`TreeChange`]s.
//! - **View**: [`TreeViewController`] projects the expanded part of a model
//!   onto a flat list of rows and renders it with widgets recycled through a
//!   [`RowWidgetPool`]. The host UI supplies the widgets ([`RowWidget`]) and
//!   the scrollable area ([`ScrollContent`]).
//!
//! # Quick Start
//!
//! ```
//! use grove::{TreeElement, TreeModel};
//!
//! let model = TreeModel::from_elements(vec![
//!     TreeElement::with_depth(0, "Root", -1),
//!     TreeElement::with_depth(1, "A", 0),
//!     TreeElement::with_depth(3, "Child", 1),
//!     TreeElement::with_depth(2, "B", 0),
//! ])
//! .unwrap();
//!
//! model.signals().changed.connect(|change| {
//!     println!("tree changed: {change:?}");
//! });
//!
//! model.move_elements(2, 0, &[3]).unwrap();
//! assert_eq!(model.children_of(2), vec![3]);
//! assert_eq!(model.depth_of(3), Some(1));
//! ```

pub mod debug;
pub mod element;
pub mod error;
pub mod pool;
pub mod tree_model;
pub mod utility;
pub mod view;
pub mod widget;

pub use grove_core::{ConnectionGuard, ConnectionId, PerfSpan, Signal};

pub use element::{ElementId, ElementRecord, ROOT_DEPTH, TreeArena, TreeElement};
pub use error::{Error, Result};
pub use pool::{PooledWidget, RowKey, RowWidgetPool};
pub use tree_model::{TreeChange, TreeModel, TreeModelSignals};
pub use view::{RowCustomizer, TreeViewController, ViewConfig};
pub use widget::{RowEvent, RowRect, RowState, RowWidget, ScrollContent};
