//! # Traversal State
//!
//! The mutable context threaded through the depth-first walk: content
//! bounds, the active text style, the node path label, the open hyperlink,
//! and the row sub-context for column flow.
//!
//! Descending into a child pushes a snapshot and popping restores it, so
//! bounds, style, path, and link always return to their pre-descent values.
//! Two things deliberately escape that discipline: the `continued` flag,
//! which describes the surface's open text run and must survive sibling
//! pops so adjacent text nodes merge into one run, and the row sub-context,
//! which is owned by the row node and shared by reference so column
//! siblings observe each other's placement across pops.

use crate::model::Edges;
use crate::style::TextStyle;
use std::cell::RefCell;
use std::rc::Rc;

/// The shared placement context of an active row: the current line's top,
/// the next column's insertion x, and the bottom of the tallest column
/// placed on the line so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowContext {
    pub top: f64,
    pub next: f64,
    pub bottom: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct RenderState {
    /// Left edge of the current content area (page-relative).
    pub left: f64,
    /// Right inset of the current content area (distance from page right).
    pub right: f64,
    pub page_width: f64,
    pub page_height: f64,
    /// Page margins as resolved by the surface at page creation.
    pub margins: Edges,

    /// Active text style, inherited by descendants.
    pub style: TextStyle,
    /// Path label of the node being rendered, for error attribution.
    pub path: String,
    /// Active hyperlink target, set by anchor nodes for their subtree.
    pub link: Option<String>,
    /// True while a continued text run is open on the surface.
    pub continued: bool,
    /// Row sub-context, present only inside a row.
    pub columns: Option<Rc<RefCell<RowContext>>>,

    // Parent-box values captured at push time, read by block advance and
    // column wrapping.
    pub parent_path: String,
    pub parent_left: f64,
    pub parent_right: f64,
    pub parent_width: f64,

    stack: Vec<Snapshot>,
}

#[derive(Debug, Clone)]
struct Snapshot {
    left: f64,
    right: f64,
    style: TextStyle,
    path: String,
    link: Option<String>,
    columns: Option<Rc<RefCell<RowContext>>>,
    parent_path: String,
    parent_left: f64,
    parent_right: f64,
    parent_width: f64,
}

impl RenderState {
    pub fn new() -> Self {
        RenderState {
            left: 0.0,
            right: 0.0,
            page_width: 0.0,
            page_height: 0.0,
            margins: Edges::default(),
            style: TextStyle::default(),
            path: "doc".to_string(),
            link: None,
            continued: false,
            columns: None,
            parent_path: String::new(),
            parent_left: 0.0,
            parent_right: 0.0,
            parent_width: 0.0,
            stack: Vec::new(),
        }
    }

    /// Width of the current content area. Recomputed on demand after any
    /// bounds mutation rather than cached.
    pub fn content_width(&self) -> f64 {
        self.page_width - self.left - self.right
    }

    /// X coordinate of the content area's right edge.
    pub fn content_right(&self) -> f64 {
        self.page_width - self.right
    }

    /// Narrow or widen the content area to `width` by moving its right edge.
    pub fn set_content_width(&mut self, width: f64) {
        self.right = self.page_width - self.left - width;
    }

    /// Snapshot the restorable fields before descending into a child, and
    /// promote the current bounds to parent-box values for the descent.
    pub fn push(&mut self) {
        self.stack.push(Snapshot {
            left: self.left,
            right: self.right,
            style: self.style.clone(),
            path: self.path.clone(),
            link: self.link.clone(),
            columns: self.columns.clone(),
            parent_path: self.parent_path.clone(),
            parent_left: self.parent_left,
            parent_right: self.parent_right,
            parent_width: self.parent_width,
        });
        self.parent_path = self.path.clone();
        self.parent_left = self.left;
        self.parent_right = self.right;
        self.parent_width = self.content_width();
    }

    /// Restore the most recent snapshot. A pop with an empty stack is a
    /// no-op, mirroring an unbalanced restore at the tree root.
    pub fn pop(&mut self) {
        let Some(s) = self.stack.pop() else { return };
        self.left = s.left;
        self.right = s.right;
        self.style = s.style;
        self.path = s.path;
        self.link = s.link;
        self.columns = s.columns;
        self.parent_path = s.parent_path;
        self.parent_left = s.parent_left;
        self.parent_right = s.parent_right;
        self.parent_width = s.parent_width;
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

impl Default for RenderState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Color;

    fn page_state() -> RenderState {
        let mut state = RenderState::new();
        state.page_width = 600.0;
        state.page_height = 800.0;
        state.left = 50.0;
        state.right = 50.0;
        state
    }

    #[test]
    fn test_content_width_recomputes() {
        let mut state = page_state();
        assert_eq!(state.content_width(), 500.0);
        state.left = 100.0;
        assert_eq!(state.content_width(), 450.0);
        state.set_content_width(200.0);
        assert_eq!(state.right, 300.0);
        assert_eq!(state.content_width(), 200.0);
    }

    #[test]
    fn test_push_pop_restores_plain_fields() {
        let mut state = page_state();
        state.path = "doc.page(1)".into();
        state.link = None;
        state.style.size = 12.0;

        state.push();
        state.left = 120.0;
        state.right = 80.0;
        state.path = "doc.page(1).p(1)".into();
        state.link = Some("https://example.com".into());
        state.style.size = 30.0;
        state.style.color = Color::hex("#ff0000");
        state.pop();

        assert_eq!(state.left, 50.0);
        assert_eq!(state.right, 50.0);
        assert_eq!(state.path, "doc.page(1)");
        assert_eq!(state.link, None);
        assert_eq!(state.style.size, 12.0);
        assert_eq!(state.style.color, Color::BLACK);
    }

    #[test]
    fn test_push_promotes_parent_bounds() {
        let mut state = page_state();
        state.path = "doc.page(1)".into();
        state.push();
        assert_eq!(state.parent_path, "doc.page(1)");
        assert_eq!(state.parent_left, 50.0);
        assert_eq!(state.parent_width, 500.0);
        state.pop();
        assert_eq!(state.parent_path, "");
    }

    #[test]
    fn test_continued_survives_pop() {
        let mut state = page_state();
        state.push();
        state.continued = true;
        state.pop();
        assert!(state.continued, "continued describes surface state, not tree state");
    }

    #[test]
    fn test_row_context_shared_across_pops() {
        let mut state = page_state();
        let row = Rc::new(RefCell::new(RowContext {
            top: 100.0,
            next: 50.0,
            bottom: None,
        }));
        state.columns = Some(row.clone());

        // first column descends, advances the shared context, and pops
        state.push();
        state
            .columns
            .as_ref()
            .unwrap()
            .borrow_mut()
            .next = 150.0;
        state.columns.as_ref().unwrap().borrow_mut().bottom = Some(140.0);
        state.pop();

        // the sibling sees the first column's placement
        let ctx = state.columns.as_ref().unwrap().borrow();
        assert_eq!(ctx.next, 150.0);
        assert_eq!(ctx.bottom, Some(140.0));
        assert_eq!(row.borrow().next, 150.0);
    }

    #[test]
    fn test_stack_depth_tracks_descent() {
        let mut state = page_state();
        assert_eq!(state.depth(), 0);
        state.push();
        state.push();
        assert_eq!(state.depth(), 2);
        state.pop();
        assert_eq!(state.depth(), 1);
        state.pop();
        state.pop(); // unbalanced pop is a no-op
        assert_eq!(state.depth(), 0);
    }
}
