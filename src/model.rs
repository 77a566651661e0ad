//! # Document Model
//!
//! The input representation for the rendering engine. A document is a tree of
//! element nodes, each with a tag name, an attribute map, and children; leaf
//! text nodes carry the raw character data. The tree is produced by an
//! upstream parser or built directly from JSON; the engine only reads it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A scalar attribute value.
///
/// Attributes arrive as strings when the tree comes from markup and as
/// native scalars when it comes from JSON. Numeric coercion is lenient in
/// both cases: `"50%"` and `"12pt"` both carry a usable leading number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    /// The numeric reading of this value, if it has one.
    ///
    /// Numbers read as themselves, strings as their leading decimal prefix
    /// (`"50%"` → `50.0`), booleans as nothing.
    pub fn number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n.is_finite() => Some(*n),
            Value::Text(s) => leading_number(s),
            _ => None,
        }
    }

    /// True when the value carries a usable number (including `"50%"`).
    pub fn is_numeric(&self) -> bool {
        self.number().is_some()
    }

    /// True for strings of the form `"<number>%"`.
    pub fn is_percentage(&self) -> bool {
        matches!(self, Value::Text(s) if s.trim_end().ends_with('%') && self.number().is_some())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The boolean reading of this value. `"false"`, `"0"`, `0` and empty
    /// strings are false; everything else present is true.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::Text(s) => !s.is_empty() && s != "false" && s != "0",
        }
    }

    /// Render the value as display text (for hrefs, metadata, paths).
    pub fn to_text(&self) -> String {
        match self {
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Value::Text(s) => s.clone(),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Parse the leading decimal number of a string: optional sign, digits,
/// optional fraction. Trailing garbage is ignored (`"-12.5pt"` → `-12.5`).
pub fn leading_number(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end == digits_start || (end == digits_start + 1 && bytes[digits_start] == b'.') {
        return None;
    }
    s[..end].parse().ok()
}

/// A node in the document tree: either an element with a tag, attributes
/// and children, or a raw text leaf.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Element {
        tag: String,
        #[serde(default)]
        attrs: HashMap<String, Value>,
        #[serde(default)]
        children: Vec<Node>,
    },
    Text {
        text: String,
    },
}

impl Node {
    pub fn element(tag: &str, attrs: Vec<(&str, Value)>, children: Vec<Node>) -> Self {
        Node::Element {
            tag: tag.to_string(),
            attrs: attrs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            children,
        }
    }

    pub fn text(content: &str) -> Self {
        Node::Text {
            text: content.to_string(),
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Node::Element { tag, .. } => Some(tag),
            Node::Text { .. } => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element { children, .. } => children,
            Node::Text { .. } => &[],
        }
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        match self {
            Node::Element { attrs, .. } => attrs.get(key),
            Node::Text { .. } => None,
        }
    }

    /// The concatenated text of this node's direct text children.
    pub fn direct_text(&self) -> Option<String> {
        let mut out = String::new();
        for child in self.children() {
            if let Node::Text { text } = child {
                out.push_str(text);
            }
        }
        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }

    /// Children elements with the given tag name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> {
        self.children()
            .iter()
            .filter(move |c| c.tag() == Some(name))
    }
}

/// A complete document ready for rendering: an optional head (title, meta,
/// inline configuration) and the page elements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Head element. Its children may be `title`, `meta`, or configuration
    /// sections (`styles`, `colors`, `fonts`, `document`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Node>,

    /// The page elements, rendered in order.
    #[serde(default)]
    pub pages: Vec<Node>,

    /// Suggested output filename, carried through to the rendered document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Edge values (top, right, bottom, left) used for page margins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::A3 => (841.89, 1190.55),
            PageSize::A5 => (419.53, 595.28),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Tabloid => (792.0, 1224.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }

    /// Parse a page size name as it appears in a `size` attribute.
    pub fn from_name(name: &str) -> Option<PageSize> {
        match name.to_ascii_uppercase().as_str() {
            "A4" => Some(PageSize::A4),
            "A3" => Some(PageSize::A3),
            "A5" => Some(PageSize::A5),
            "LETTER" => Some(PageSize::Letter),
            "LEGAL" => Some(PageSize::Legal),
            "TABLOID" => Some(PageSize::Tabloid),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_number() {
        assert_eq!(leading_number("50%"), Some(50.0));
        assert_eq!(leading_number("-12.5pt"), Some(-12.5));
        assert_eq!(leading_number("  3"), Some(3.0));
        assert_eq!(leading_number("abc"), None);
        assert_eq!(leading_number(""), None);
        assert_eq!(leading_number("."), None);
    }

    #[test]
    fn test_value_number() {
        assert_eq!(Value::Number(12.0).number(), Some(12.0));
        assert_eq!(Value::Text("50%".into()).number(), Some(50.0));
        assert_eq!(Value::Bool(true).number(), None);
        assert_eq!(Value::Text("wide".into()).number(), None);
    }

    #[test]
    fn test_value_percentage() {
        assert!(Value::Text("50%".into()).is_percentage());
        assert!(!Value::Text("50".into()).is_percentage());
        assert!(!Value::Number(50.0).is_percentage());
    }

    #[test]
    fn test_node_json_roundtrip() {
        let json = r#"{"tag":"p","attrs":{"color":"red","size":12},"children":[{"text":"hi"}]}"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(node.tag(), Some("p"));
        assert_eq!(node.attr("size"), Some(&Value::Number(12.0)));
        assert_eq!(node.direct_text().as_deref(), Some("hi"));
    }

    #[test]
    fn test_page_size_from_name() {
        assert_eq!(PageSize::from_name("a4"), Some(PageSize::A4));
        assert_eq!(PageSize::from_name("LETTER"), Some(PageSize::Letter));
        assert_eq!(PageSize::from_name("weird"), None);
    }
}
