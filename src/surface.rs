//! # Drawing Surface
//!
//! The contract between the layout engine and whatever produces the final
//! document. The engine only ever speaks in absolute coordinates: it opens
//! pages, moves a cursor, writes cursor-positioned text runs, fills and
//! strokes rectangles, places images, and sets metadata. One render call
//! exclusively owns one surface for its full duration; the surface is
//! consumed exactly once by finalization.

use crate::error::RenderError;
use crate::model::{Edges, PageSize};
use crate::style::{Align, Color};

/// Page parameters the engine passes when opening a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSetup {
    pub size: PageSize,
    pub margins: Edges,
}

/// The surface's resolved view of the page it just opened. The engine
/// captures these into its traversal state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageInfo {
    pub width: f64,
    pub height: f64,
    pub margins: Edges,
}

/// Options for one text write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextOptions {
    /// Keep the run open so the next write continues on the same line.
    pub continued: bool,
    /// Hyperlink target for this segment.
    pub link: Option<String>,
    pub align: Align,
    pub underline: bool,
    pub strike: bool,
    /// Extra space between wrapped lines.
    pub line_gap: f64,
    /// Extra space after the run ends.
    pub paragraph_gap: f64,
    /// Width the run wraps within, measured from the run's origin x.
    pub wrap_width: f64,
}

/// Options for one image placement.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImageOptions {
    pub width: Option<f64>,
    pub height: Option<f64>,
    /// Uniform scale factor applied to the natural size.
    pub scale: Option<f64>,
    /// Fit the image inside this box, preserving aspect ratio. Takes
    /// precedence over `width`/`height`.
    pub fit: Option<(f64, f64)>,
}

/// The finished output: a byte stream and an optional suggested filename.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub filename: Option<String>,
}

/// The drawing/text backend consumed by the rendering engine.
///
/// Text writes own the wrapping and cursor-advance logic: after a write the
/// cursor sits at the end of the open run (continued) or below the last
/// emitted line (terminated). The engine reads the cursor back to derive
/// content heights.
pub trait Surface {
    /// Open a new physical page and return its resolved dimensions and
    /// margins.
    fn add_page(&mut self, setup: &PageSetup) -> PageInfo;

    fn cursor(&self) -> (f64, f64);
    fn set_cursor(&mut self, x: f64, y: f64);

    fn set_fill_color(&mut self, color: Color);
    /// Select a font by resolved name or file path. Unknown names fail.
    fn set_font(&mut self, font: &str) -> Result<(), RenderError>;
    fn set_font_size(&mut self, size: f64);

    /// Write text at a position with the current fill color, font, and
    /// size. Continued writes append to the open run.
    fn text(&mut self, content: &str, x: f64, y: f64, options: &TextOptions)
        -> Result<(), RenderError>;

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color);
    fn stroke_rect(
        &mut self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        line_width: Option<f64>,
        color: Option<Color>,
    );

    /// Draw an image from an already-resolved source (file path or data
    /// URI) at a position.
    fn draw_image(
        &mut self,
        src: &str,
        x: f64,
        y: f64,
        options: &ImageOptions,
    ) -> Result<(), RenderError>;

    /// Set a document metadata entry (e.g. `Title`).
    fn set_metadata(&mut self, key: &str, value: &str);

    /// Finalize the document and yield its bytes. Call once.
    fn finish(&mut self) -> Result<Vec<u8>, RenderError>;
}
