//! # Folio
//!
//! A styled-document PDF renderer.
//!
//! Folio takes a tree of document nodes (pages, blocks, inline text,
//! images, layout containers) and renders it into a paginated PDF through
//! a drawing surface that only understands absolute coordinates: pages,
//! a cursor, text runs, rectangles, images. Everything CSS-flavored, from
//! cascading named styles with `extends` chains to percentage widths and
//! row/column flow, is resolved by the engine itself
//! before anything touches the surface.
//!
//! ## Architecture
//!
//! ```text
//! Input (JSON/API)
//!       ↓
//!   [model]    — Document tree: elements, attributes, text
//!   [config]   — Style-sheet, palette, font aliases, page defaults
//!       ↓
//!   [style]    — Resolve the cascade per node
//!   [render]   — Box geometry, traversal state, behaviour dispatch
//!       ↓
//!   [surface]  — Cursor-based drawing contract
//!   [pdf]      — PDF 1.7 implementation of the surface
//! ```

pub mod config;
pub mod error;
pub mod font;
pub mod image;
pub mod model;
pub mod pdf;
pub mod render;
pub mod style;
pub mod surface;

pub use config::Config;
pub use error::RenderError;
pub use model::{Document, Node, Value};
pub use surface::{RenderedDocument, Surface};

use pdf::PdfSurface;
use render::DocumentRenderer;

/// Render a document to a PDF.
///
/// This is the primary entry point: it drives the engine over a fresh PDF
/// surface and returns the finished bytes with the document's suggested
/// filename, if any.
pub fn render(document: &Document, config: Config) -> Result<RenderedDocument, RenderError> {
    let mut surface = PdfSurface::new();
    render_onto(document, config, &mut surface)?;
    Ok(RenderedDocument {
        bytes: surface.finish()?,
        filename: document.filename.clone(),
    })
}

/// Render a document onto a caller-supplied surface. The surface is left
/// unfinalized so the caller decides how to consume it.
pub fn render_onto<S: Surface>(
    document: &Document,
    config: Config,
    surface: &mut S,
) -> Result<(), RenderError> {
    DocumentRenderer::new(config, surface).render(document)
}

/// Render a document described as JSON.
pub fn render_json(json: &str, config: Config) -> Result<RenderedDocument, RenderError> {
    let document: Document = serde_json::from_str(json)?;
    render(&document, config)
}
