//! # Rendering Engine
//!
//! The heart of folio: a depth-first walk over the document tree that turns
//! styled nodes into absolute-coordinate draw calls on a [`Surface`].
//!
//! For every element the walk resolves the style cascade, computes the box
//! geometry, moves the cursor to the box origin, and dispatches on the
//! node's behaviour. Block boxes narrow the content bounds for their
//! subtree and derive their height from how far the cursor travelled while
//! their children rendered. The traversal state is saved around every
//! descent and restored afterwards, so siblings never see each other's
//! bounds or text style. The one deliberate exception is the row
//! sub-context, shared by reference so columns can flow left-to-right and
//! wrap as a group.
//!
//! Raw text children write into the surface as continued runs: adjacent
//! text siblings merge into one visual line, and the enclosing block closes
//! the run with an empty non-continued write.

pub mod geometry;
pub mod state;

use crate::config::{Config, Props};
use crate::error::RenderError;
use crate::model::{Document, Edges, Node, PageSize, Value};
use crate::style::{self, Behaviour, Color, Display, ResolvedStyle, TextStyle};
use crate::surface::{ImageOptions, PageSetup, Surface, TextOptions};
use geometry::Geometry;
use log::{debug, trace};
use state::{RenderState, RowContext};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Renders one document onto one surface. Not reentrant; build a fresh
/// renderer per render call.
pub struct DocumentRenderer<'a, S: Surface> {
    config: Config,
    surface: &'a mut S,
    state: RenderState,
}

impl<'a, S: Surface> DocumentRenderer<'a, S> {
    pub fn new(config: Config, surface: &'a mut S) -> Self {
        DocumentRenderer {
            config,
            surface,
            state: RenderState::new(),
        }
    }

    /// Apply head-driven configuration and metadata, then render every
    /// page. Traversal errors come back annotated with the path of the
    /// node that failed.
    pub fn render(&mut self, document: &Document) -> Result<(), RenderError> {
        debug!("rendering document ({} pages)", document.pages.len());
        if let Some(head) = &document.head {
            self.config.apply_head(head);
            self.write_metadata(head);
        }
        self.render_pages(document)
            .map_err(|e| RenderError::at(&self.state.path, e))
    }

    fn render_pages(&mut self, document: &Document) -> Result<(), RenderError> {
        for (index, page) in document.pages.iter().enumerate() {
            self.state.path = format!("doc.page({})", index + 1);
            // the active text style resets to the paragraph baseline on
            // every page
            self.state.style = TextStyle::from_props(self.config.styles.get("p"), &self.config);
            self.page(page)?;
        }
        Ok(())
    }

    fn write_metadata(&mut self, head: &Node) {
        for title in head.children_named("title") {
            if let Some(text) = title.direct_text() {
                debug!("meta Title = {}", text.trim());
                self.surface.set_metadata("Title", text.trim());
            }
        }
        for meta in head.children_named("meta") {
            for item in meta.children() {
                if let (Some(tag), Some(text)) = (item.tag(), item.direct_text()) {
                    self.surface.set_metadata(&capitalize(tag), text.trim());
                }
            }
        }
    }

    /// Open a physical page: document defaults merged with page attributes,
    /// single edge keys expanded into the margin profile, and the surface's
    /// resolved view captured into state.
    fn page(&mut self, node: &Node) -> Result<(), RenderError> {
        let mut size = self.config.document.size;
        if let Some(name) = node.attr("size").and_then(|v| v.as_str()) {
            if let Some(parsed) = PageSize::from_name(name) {
                size = parsed;
            }
        }

        let mut margins = self.config.document.resolved_margins();
        if let Some(m) = node.attr("margin").and_then(Value::number) {
            margins = Edges::uniform(m);
        }
        if let Some(v) = node.attr("marginTop").and_then(Value::number) {
            margins.top = v;
        }
        if let Some(v) = node.attr("marginLeft").and_then(Value::number) {
            margins.left = v;
        }
        if let Some(v) = node.attr("marginRight").and_then(Value::number) {
            margins.right = v;
        }
        if let Some(v) = node.attr("marginBottom").and_then(Value::number) {
            margins.bottom = v;
        }

        debug!("page added {} ({:?})", self.state.path, size);
        let info = self.surface.add_page(&PageSetup { size, margins });

        self.state.page_width = info.width;
        self.state.page_height = info.height;
        self.state.margins = info.margins;
        self.state.left = info.margins.left;
        self.state.right = info.margins.right;
        self.state.continued = false;
        self.state.columns = None;
        self.surface.set_cursor(self.state.left, info.margins.top);

        self.render_children(node.children())
    }

    /// Walk the children in order, saving and restoring state around each.
    /// Element children get a path label scoped by a 1-based occurrence
    /// index per tag name.
    fn render_children(&mut self, children: &[Node]) -> Result<(), RenderError> {
        let mut indexes: HashMap<&str, usize> = HashMap::new();
        for child in children {
            self.state.push();
            match child {
                Node::Text { text } => self.text(text)?,
                Node::Element {
                    tag,
                    attrs,
                    children,
                } => {
                    let index = indexes
                        .entry(tag.as_str())
                        .and_modify(|i| *i += 1)
                        .or_insert(1);
                    self.state.path =
                        format!("{}.{}({})", self.state.parent_path, tag, index);
                    self.tag(tag, attrs, children, child)?;
                }
            }
            self.state.pop();
        }
        Ok(())
    }

    /// Resolve the style cascade, compute the box, and dispatch to the
    /// behaviour's renderer. Wraps the dispatch with the common block
    /// bookkeeping: run termination, debug outlines, and the cursor advance
    /// past the box.
    fn tag(
        &mut self,
        tag: &str,
        attrs: &Props,
        children: &[Node],
        node: &Node,
    ) -> Result<(), RenderError> {
        trace!("rendering {}", self.state.path);
        let style = style::resolve(tag, attrs, &self.config)?;

        // structural misuse fails before any geometry is computed
        if style.behaviour == Behaviour::Column && self.state.columns.is_none() {
            return Err(RenderError::ColumnOutsideRow);
        }

        self.state.style.apply(&style);

        let cursor = self.surface.cursor();
        let mut geometry = geometry::resolve_box(&self.state, cursor, &style);
        let block = style.display == Display::Block;

        self.surface.set_cursor(geometry.left, geometry.top);
        if block {
            self.state.left = geometry.left;
            self.state.right = geometry.right;
        }

        match style.behaviour {
            Behaviour::Generic => self.generic(&style, &mut geometry, children)?,
            Behaviour::Hr => self.hr(&style, &geometry),
            Behaviour::Img => self.img(&style, &geometry)?,
            Behaviour::Indent => self.indent(&style, &geometry, children)?,
            Behaviour::Row => self.row(&style, &mut geometry, children)?,
            Behaviour::Column => self.column(&style, &geometry, children)?,
            Behaviour::Anchor => self.anchor(&style, &mut geometry, children, node)?,
        }

        // a block closes any text run still open
        if block && self.state.continued {
            self.end_text_run()?;
        }

        if self.config.debug {
            let (_, y) = self.surface.cursor();
            let outline = if block { "#f77" } else { "#7f7" };
            self.surface.stroke_rect(
                geometry.left,
                geometry.top,
                self.state.page_width - geometry.right - geometry.left,
                y - geometry.top,
                None,
                Some(Color::hex(outline)),
            );
        }

        // advance past the box
        let (x, y) = self.surface.cursor();
        if block {
            self.surface
                .set_cursor(self.state.parent_left, y + style.margin.bottom);
        } else {
            self.surface.set_cursor(x + style.margin.right, y);
        }
        Ok(())
    }

    /// Terminate the open text run with an empty non-continued write,
    /// dropping the cursor below the line.
    fn end_text_run(&mut self) -> Result<(), RenderError> {
        let (x, y) = self.surface.cursor();
        self.surface.text(
            " ",
            x,
            y,
            &TextOptions {
                continued: false,
                ..Default::default()
            },
        )?;
        self.state.continued = false;
        Ok(())
    }

    /// The default behaviour: a plain box. Blocks paint their background,
    /// inset their content by padding, derive their height from the
    /// cursor's travel, and stroke an optional border; inlines just nudge
    /// the cursor by padding.
    fn generic(
        &mut self,
        style: &ResolvedStyle,
        geometry: &mut Geometry,
        children: &[Node],
    ) -> Result<(), RenderError> {
        if style.display == Display::Inline {
            self.advance_cursor(style.padding.left, 0.0);
            self.render_children(children)?;
            self.advance_cursor(style.padding.right, 0.0);
            return Ok(());
        }

        if let (Some(bg), Some(height)) = (style.background_color, geometry.height) {
            if geometry.width > 0.0 {
                self.surface
                    .fill_rect(geometry.left, geometry.top, geometry.width, height, bg);
            }
        }

        self.advance_cursor(0.0, style.padding.top);
        self.state.left += style.padding.left;
        self.state.right += style.padding.right;

        self.render_children(children)?;

        let height = match geometry.height {
            Some(h) => {
                let (x, _) = self.surface.cursor();
                self.surface.set_cursor(x, geometry.top + h);
                h
            }
            None => {
                self.advance_cursor(0.0, style.padding.bottom);
                let (_, y) = self.surface.cursor();
                let h = y - geometry.top;
                geometry.height = Some(h);
                h
            }
        };

        if let Some(line_width) = style.border {
            self.surface.stroke_rect(
                geometry.left,
                geometry.top,
                geometry.width,
                height,
                Some(line_width),
                style.border_color,
            );
        }
        Ok(())
    }

    /// A horizontal rule: a filled bar of the box's width.
    fn hr(&mut self, style: &ResolvedStyle, geometry: &Geometry) {
        let (x, y) = self.surface.cursor();
        let color = style.color.unwrap_or(self.state.style.color);
        self.surface
            .fill_rect(x, y, geometry.width, style.thickness, color);
        self.advance_cursor(0.0, style.thickness);
    }

    fn img(&mut self, style: &ResolvedStyle, geometry: &Geometry) -> Result<(), RenderError> {
        let src = style
            .src
            .as_deref()
            .ok_or_else(|| RenderError::Image("img element missing src".to_string()))?;
        let resolved = if src.starts_with("data:") {
            src.to_string()
        } else {
            self.config
                .base_path
                .join(src)
                .to_string_lossy()
                .into_owned()
        };

        let mut options = ImageOptions::default();
        if geometry.width > 0.0 {
            options.width = Some(geometry.width);
        }
        options.height = geometry.height;
        if let Some(scale) = &style.scale {
            options.scale = Some(geometry::percent_or_number(scale, 1.0));
        }
        if style.fit {
            if let (Some(w), Some(h)) = (options.width, options.height) {
                options.fit = Some((w, h));
                options.width = None;
                options.height = None;
            }
        }

        let (x, y) = self.surface.cursor();
        self.surface.draw_image(&resolved, x, y, &options)
    }

    /// Shift the content's left edge inward, render children, then
    /// optionally draw a vertical bar spanning the rendered height.
    fn indent(
        &mut self,
        style: &ResolvedStyle,
        geometry: &Geometry,
        children: &[Node],
    ) -> Result<(), RenderError> {
        self.state.left += style.padding.left;
        let (_, y) = self.surface.cursor();
        self.surface.set_cursor(self.state.left, y);

        self.render_children(children)?;

        let (_, y) = self.surface.cursor();
        let height = y - geometry.top;
        if style.thickness > 0.0 {
            if let Some(color) = style.color {
                self.surface
                    .fill_rect(geometry.left, geometry.top, style.thickness, height, color);
            }
        }
        Ok(())
    }

    /// Establish a fresh row context for column children, then behave as a
    /// generic block. The previous context (for nested rows) is restored
    /// afterwards.
    fn row(
        &mut self,
        style: &ResolvedStyle,
        geometry: &mut Geometry,
        children: &[Node],
    ) -> Result<(), RenderError> {
        let previous = self.state.columns.take();
        self.state.columns = Some(Rc::new(RefCell::new(RowContext {
            top: geometry.top,
            next: geometry.left,
            bottom: None,
        })));

        let result = self.generic(style, geometry, children);

        self.state.columns = previous;
        result
    }

    /// Place a column at the row's next insertion point, wrapping to a new
    /// line when it would overflow the parent's content width.
    fn column(
        &mut self,
        style: &ResolvedStyle,
        geometry: &Geometry,
        children: &[Node],
    ) -> Result<(), RenderError> {
        let cols = self
            .state
            .columns
            .clone()
            .ok_or(RenderError::ColumnOutsideRow)?;

        let left = {
            let mut ctx = cols.borrow_mut();
            let mut left = ctx.next + style.margin.left;

            let overflow =
                (left + geometry.width) - (self.state.parent_left + self.state.parent_width);
            if let Some(bottom) = ctx.bottom {
                if overflow > 0.0 && overflow < self.state.parent_width {
                    debug!("wrapping column {} (overflow {})", self.state.path, overflow);
                    left = self.state.parent_left + style.margin.left;
                    ctx.top = bottom;
                    ctx.bottom = None;
                }
            }

            self.surface.set_cursor(
                left + style.padding.left,
                ctx.top + style.margin.top + style.padding.top,
            );
            left
        };

        self.state.left = left + style.padding.left;
        self.state
            .set_content_width(geometry.width - style.padding.right);

        self.render_children(children)?;

        // close the run before recording the line bottom, so the bottom is
        // the real bottom of this column's content
        if self.state.continued {
            self.end_text_run()?;
        }
        self.advance_cursor(0.0, style.padding.bottom + style.margin.bottom);
        let (_, y) = self.surface.cursor();

        let mut ctx = cols.borrow_mut();
        ctx.next = left + geometry.width + style.margin.right;
        let bottom = ctx.bottom.unwrap_or(0.0).max(y);
        ctx.bottom = Some(bottom);
        drop(ctx);

        let (x, _) = self.surface.cursor();
        self.surface.set_cursor(x, bottom - style.margin.bottom);
        Ok(())
    }

    /// Resolve the link target, set it for the subtree, then behave as
    /// generic. Targets without a scheme get a secure default.
    fn anchor(
        &mut self,
        style: &ResolvedStyle,
        geometry: &mut Geometry,
        children: &[Node],
        node: &Node,
    ) -> Result<(), RenderError> {
        let mut href = style
            .href
            .clone()
            .or_else(|| node.direct_text())
            .unwrap_or_default();
        if !href.starts_with("http") {
            href = format!("https://{}", href);
        }
        self.state.link = Some(href);

        self.generic(style, geometry, children)
    }

    /// Write a raw text child at the cursor as a continued run, with the
    /// active style's whitespace handling applied.
    fn text(&mut self, content: &str) -> Result<(), RenderError> {
        let style = self.state.style.clone();
        let mut content = content.to_string();
        if style.trim {
            content = strip_line_leading_whitespace(&content);
        }
        if !style.pre {
            content = collapse_whitespace(&content);
        }

        let (x, y) = self.surface.cursor();
        let options = TextOptions {
            continued: true,
            link: self.state.link.clone(),
            align: style.align,
            underline: style.underline,
            strike: style.strike,
            line_gap: style.line_gap,
            paragraph_gap: style.paragraph_gap,
            wrap_width: (self.state.content_right() - x).max(1.0),
        };
        trace!("text at ({:.1}, {:.1}) in {}", x, y, self.state.path);

        self.surface.set_fill_color(style.color);
        self.surface.set_font(&style.font)?;
        self.surface.set_font_size(style.size);
        self.surface.text(&content, x, y, &options)?;
        self.state.continued = true;
        Ok(())
    }

    fn advance_cursor(&mut self, dx: f64, dy: f64) {
        let (x, y) = self.surface.cursor();
        self.surface.set_cursor(x + dx, y + dy);
    }
}

/// Collapse every run of whitespace (including newlines) to a single space.
fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
                in_space = true;
            }
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

/// Strip leading whitespace from every line.
fn strip_line_leading_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_line_start = true;
    for ch in s.chars() {
        if ch == '\n' {
            out.push(ch);
            at_line_start = true;
        } else if at_line_start && ch.is_whitespace() {
            // dropped
        } else {
            out.push(ch);
            at_line_start = false;
        }
    }
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("a  b\n\n  c"), "a b c");
        assert_eq!(collapse_whitespace("  x  "), " x ");
    }

    #[test]
    fn test_strip_line_leading_whitespace() {
        assert_eq!(
            strip_line_leading_whitespace("  one\n    two\nthree"),
            "one\ntwo\nthree"
        );
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("author"), "Author");
        assert_eq!(capitalize(""), "");
    }
}
