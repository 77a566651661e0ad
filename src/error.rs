//! Structured error types for the rendering engine.
//!
//! Style lookup failures and structural misuse abort the render; backend
//! failures (fonts, images, output) propagate unchanged. Errors raised while
//! walking the tree are wrapped once at the top level with the failing
//! node's path label, so every failure carries its tree location.

use thiserror::Error;

/// The unified error type returned by all public API functions.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A referenced style name is absent from the style-sheet.
    #[error("style not found for {0}")]
    StyleNotFound(String),

    /// A `column` element was rendered with no enclosing `row`.
    #[error("<column> tag must be within a <row> tag")]
    ColumnOutsideRow,

    /// A font could not be resolved, loaded, or parsed.
    #[error("font error: {0}")]
    Font(String),

    /// An image could not be read or decoded.
    #[error("image error: {0}")]
    Image(String),

    /// The drawing surface was used outside its contract.
    #[error("backend error: {0}")]
    Backend(String),

    /// JSON input failed to parse as a document or configuration.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A traversal error annotated with the path of the failing node.
    #[error("{path}: {source}")]
    Traversal {
        path: String,
        #[source]
        source: Box<RenderError>,
    },
}

impl RenderError {
    /// Wrap an error with the tree path it was raised at. Already-annotated
    /// errors pass through so the deepest path wins.
    pub fn at(path: &str, err: RenderError) -> RenderError {
        match err {
            e @ RenderError::Traversal { .. } => e,
            other => RenderError::Traversal {
                path: path.to_string(),
                source: Box::new(other),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_not_found_names_style() {
        let err = RenderError::StyleNotFound("fancy".into());
        assert!(err.to_string().contains("fancy"));
    }

    #[test]
    fn test_path_annotation() {
        let err = RenderError::at("doc.page(1).p(2)", RenderError::ColumnOutsideRow);
        let msg = err.to_string();
        assert!(msg.starts_with("doc.page(1).p(2): "));
        assert!(msg.contains("<column>"));
    }

    #[test]
    fn test_annotation_keeps_deepest_path() {
        let inner = RenderError::at("doc.page(1).row(1).column(3)", RenderError::ColumnOutsideRow);
        let outer = RenderError::at("doc.page(1)", inner);
        assert!(outer.to_string().starts_with("doc.page(1).row(1).column(3)"));
    }
}
