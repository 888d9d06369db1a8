//! Text rendering of element trees for logs, test failures and `Display`.
//!
//! ```
//! use grove::{TreeElement, TreeModel};
//! use grove::debug::{TreeDebug, TreeFormatOptions};
//!
//! let model = TreeModel::from_elements(vec![
//!     TreeElement::with_depth(0, "Root", -1),
//!     TreeElement::with_depth(1, "A", 0),
//!     TreeElement::with_depth(2, "B", 0),
//! ])
//! .unwrap();
//!
//! let text = TreeDebug::with_options(TreeFormatOptions::minimal()).format(&model);
//! assert_eq!(text, "Root\n├── A\n└── B\n");
//! ```

use std::fmt::Write as FmtWrite;

use crate::element::{ElementId, TreeArena};
use crate::tree_model::TreeModel;

/// Glyph set used for branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// `|`, `+--` and `` `-- ``.
    Ascii,
    /// Box-drawing characters.
    #[default]
    Unicode,
    /// A single dash per entry, no guides.
    Compact,
}

impl TreeStyle {
    /// Returns `(guide, branch, last_branch)`.
    fn glyphs(self) -> (&'static str, &'static str, &'static str) {
        match self {
            TreeStyle::Ascii => ("|", "+--", "`--"),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500}", "\u{2514}\u{2500}\u{2500}"),
            TreeStyle::Compact => ("", "-", "-"),
        }
    }
}

/// What [`TreeDebug`] prints for each element.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    pub style: TreeStyle,
    /// Append ` [id]`.
    pub show_ids: bool,
    /// Append ` (depth n)`.
    pub show_depths: bool,
    /// Levels printed below the starting element; `None` prints everything.
    pub max_depth: Option<usize>,
    /// Spaces after each guide column.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::Unicode,
            show_ids: true,
            show_depths: false,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Ids and depths on every line.
    pub fn detailed() -> Self {
        Self {
            show_depths: true,
            ..Self::default()
        }
    }

    /// Names only.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_depths: false,
            ..Self::default()
        }
    }
}

/// Renders element trees as indented text.
#[derive(Debug, Clone, Default)]
pub struct TreeDebug {
    options: TreeFormatOptions,
}

impl TreeDebug {
    /// Renderer with [`TreeFormatOptions::default`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Renders the whole model, or `(empty)` when it has no root.
    pub fn format<T: Send + Sync + 'static>(&self, model: &TreeModel<T>) -> String {
        model.with_arena(|arena, root| match root {
            Some(root) => self.format_arena(arena, root),
            None => "(empty)\n".to_owned(),
        })
    }

    /// Renders the subtree below `id`, or `None` if `id` is unknown.
    pub fn format_subtree<T: Send + Sync + 'static>(
        &self,
        model: &TreeModel<T>,
        id: ElementId,
    ) -> Option<String> {
        model.with_arena(|arena, _| arena.contains(id).then(|| self.format_arena(arena, id)))
    }

    /// Renders the subtree of `arena` below `root`.
    pub fn format_arena<T>(&self, arena: &TreeArena<T>, root: ElementId) -> String {
        let mut out = String::new();
        let mut open_levels = Vec::new();
        self.write_node(arena, root, &mut open_levels, true, &mut out);
        out
    }

    /// `open_levels[i]` tells whether the ancestor at level `i + 1` still
    /// has siblings below it, i.e. whether its guide column continues.
    fn write_node<T>(
        &self,
        arena: &TreeArena<T>,
        id: ElementId,
        open_levels: &mut Vec<bool>,
        last: bool,
        out: &mut String,
    ) {
        let Some(element) = arena.get(id) else {
            return;
        };

        let level = open_levels.len();
        self.write_prefix(open_levels, last, out);
        out.push_str(match element.name() {
            "" => "(unnamed)",
            name => name,
        });
        if self.options.show_ids {
            let _ = write!(out, " [{}]", element.id());
        }
        if self.options.show_depths {
            let _ = write!(out, " (depth {})", element.depth());
        }
        out.push('\n');

        if self.options.max_depth.is_some_and(|max| level >= max) {
            return;
        }

        let children = element.children();
        open_levels.push(level > 0 && !last);
        for (i, &child) in children.iter().enumerate() {
            self.write_node(arena, child, open_levels, i + 1 == children.len(), out);
        }
        open_levels.pop();
    }

    fn write_prefix(&self, open_levels: &[bool], last: bool, out: &mut String) {
        let Some((_, ancestors)) = open_levels.split_first() else {
            return;
        };
        let (guide, branch, last_branch) = self.options.style.glyphs();
        let pad = " ".repeat(self.options.indent_size);
        let blank = " ".repeat(guide.chars().count());

        for &open in ancestors {
            out.push_str(if open { guide } else { blank.as_str() });
            out.push_str(&pad);
        }
        out.push_str(if last { last_branch } else { branch });
        out.push(' ');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::TreeElement;

    // Root
    // ├── A
    // │   └── A1
    // │       └── A1a
    // └── B
    //     └── B1
    fn model() -> TreeModel {
        TreeModel::from_elements(vec![
            TreeElement::with_depth(0, "Root", -1),
            TreeElement::with_depth(1, "A", 0),
            TreeElement::with_depth(11, "A1", 1),
            TreeElement::with_depth(111, "A1a", 2),
            TreeElement::with_depth(2, "B", 0),
            TreeElement::with_depth(21, "B1", 1),
        ])
        .unwrap()
    }

    fn ascii() -> TreeDebug {
        TreeDebug::with_options(TreeFormatOptions {
            style: TreeStyle::Ascii,
            ..TreeFormatOptions::minimal()
        })
    }

    #[test]
    fn test_ascii_guides_stop_after_last_child() {
        assert_eq!(
            ascii().format(&model()),
            "Root\n\
             +-- A\n\
             |  `-- A1\n\
             |     `-- A1a\n\
             `-- B\n\
             \x20  `-- B1\n"
        );
    }

    #[test]
    fn test_ids_and_depths() {
        let output = TreeDebug::with_options(TreeFormatOptions::detailed()).format(&model());
        assert!(output.starts_with("Root [0] (depth -1)\n"));
        assert!(output.contains("A1a [111] (depth 2)"));
    }

    #[test]
    fn test_max_depth_limits_levels() {
        let debug = TreeDebug::with_options(TreeFormatOptions {
            max_depth: Some(1),
            ..TreeFormatOptions::minimal()
        });
        let output = debug.format(&model());
        assert_eq!(output.lines().collect::<Vec<_>>().len(), 3);
        assert!(!output.contains("A1"));
    }

    #[test]
    fn test_subtree_and_unknown_id() {
        let debug = TreeDebug::with_options(TreeFormatOptions::minimal());
        assert_eq!(
            debug.format_subtree(&model(), 11).as_deref(),
            Some("A1\n\u{2514}\u{2500}\u{2500} A1a\n")
        );
        assert!(debug.format_subtree(&model(), 99).is_none());
    }

    #[test]
    fn test_compact_and_unnamed() {
        let model = TreeModel::from_elements(vec![
            TreeElement::with_depth(0, "", -1),
            TreeElement::with_depth(1, "A", 0),
        ])
        .unwrap();
        let debug = TreeDebug::with_options(TreeFormatOptions {
            style: TreeStyle::Compact,
            ..TreeFormatOptions::minimal()
        });
        assert_eq!(debug.format(&model), "(unnamed)\n- A\n");
    }

    #[test]
    fn test_display_and_empty_model() {
        let text = model().to_string();
        assert!(text.starts_with("Root [0]\n"));
        assert!(text.contains("B1 [21]"));
        assert_eq!(TreeModel::<()>::new().to_string(), "(empty)\n");
    }
}
