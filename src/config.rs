//! # Configuration
//!
//! Document defaults, the named color palette, font aliases, and the
//! style-sheet. A configuration is built once per render call (defaults
//! first, then an optional user overlay, then any configuration sections
//! found in the document head) and is immutable for the render's duration.

use crate::error::RenderError;
use crate::model::{Edges, Node, PageSize, Value};
use log::debug;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;

/// A raw style-sheet entry: property name to scalar value. Entries may
/// carry an `extends` key naming another entry.
pub type Props = HashMap<String, Value>;

/// Page defaults applied to every page unless overridden by page attributes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageDefaults {
    pub size: PageSize,
    /// Uniform margin, used when `margins` is not given.
    pub margin: f64,
    /// Per-side margins, overriding the uniform value.
    pub margins: Option<Edges>,
}

impl Default for PageDefaults {
    fn default() -> Self {
        PageDefaults {
            size: PageSize::A4,
            margin: 72.0,
            margins: None,
        }
    }
}

impl PageDefaults {
    /// The resolved per-side margins.
    pub fn resolved_margins(&self) -> Edges {
        self.margins.unwrap_or_else(|| Edges::uniform(self.margin))
    }
}

/// The full rendering configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub document: PageDefaults,
    /// Named color palette; style color values are looked up here first.
    pub colors: HashMap<String, String>,
    /// Named font aliases; values containing a path separator resolve
    /// against `base_path` and load from disk.
    pub fonts: HashMap<String, String>,
    /// The style-sheet: name to property bag.
    pub styles: HashMap<String, Props>,
    /// Draw diagnostic outlines around every rendered box.
    pub debug: bool,
    /// Base path for resolving relative asset references.
    pub base_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            document: PageDefaults::default(),
            colors: default_colors(),
            fonts: default_fonts(),
            styles: default_styles(),
            debug: false,
            base_path: PathBuf::from("."),
        }
    }
}

/// A partial configuration, deep-merged over the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigOverlay {
    pub document: Option<PageDefaults>,
    pub colors: HashMap<String, String>,
    pub fonts: HashMap<String, String>,
    pub styles: HashMap<String, Props>,
    pub debug: Option<bool>,
    pub base_path: Option<PathBuf>,
}

impl Config {
    /// Build a configuration from a JSON overlay merged over the defaults.
    pub fn from_json(json: &str) -> Result<Config, RenderError> {
        let overlay: ConfigOverlay = serde_json::from_str(json)?;
        let mut config = Config::default();
        config.apply(overlay);
        Ok(config)
    }

    /// Merge an overlay into this configuration. Style entries merge
    /// key-wise so an overlay can tweak a single property of a builtin
    /// entry without restating the rest.
    pub fn apply(&mut self, overlay: ConfigOverlay) {
        if let Some(document) = overlay.document {
            self.document = document;
        }
        self.colors.extend(overlay.colors);
        self.fonts.extend(overlay.fonts);
        for (name, props) in overlay.styles {
            let entry = self.styles.entry(name).or_default();
            entry.extend(props);
        }
        if let Some(debug) = overlay.debug {
            self.debug = debug;
        }
        if let Some(base_path) = overlay.base_path {
            self.base_path = base_path;
        }
    }

    /// Merge configuration sections found in the document head: `styles`
    /// children become style-sheet entries, `colors` and `fonts` attributes
    /// extend the alias tables, and `document` attributes override the page
    /// defaults.
    pub fn apply_head(&mut self, head: &Node) {
        for section in head.children() {
            match section.tag() {
                Some("styles") => {
                    for entry in section.children() {
                        if let Node::Element { tag, attrs, .. } = entry {
                            debug!("head style entry '{}'", tag);
                            let slot = self.styles.entry(tag.clone()).or_default();
                            for (k, v) in attrs {
                                slot.insert(k.clone(), v.clone());
                            }
                        }
                    }
                }
                Some("colors") => {
                    if let Node::Element { attrs, .. } = section {
                        for (k, v) in attrs {
                            self.colors.insert(k.clone(), v.to_text());
                        }
                    }
                }
                Some("fonts") => {
                    if let Node::Element { attrs, .. } = section {
                        for (k, v) in attrs {
                            self.fonts.insert(k.clone(), v.to_text());
                        }
                    }
                }
                Some("document") => {
                    if let Node::Element { attrs, .. } = section {
                        self.apply_document_attrs(attrs);
                    }
                }
                _ => {}
            }
        }
    }

    fn apply_document_attrs(&mut self, attrs: &Props) {
        if let Some(size) = attrs
            .get("size")
            .and_then(|v| v.as_str())
            .and_then(PageSize::from_name)
        {
            self.document.size = size;
        }
        if let Some(m) = attrs.get("margin").and_then(Value::number) {
            self.document.margin = m;
            self.document.margins = None;
        }
        let mut margins = self.document.resolved_margins();
        let mut any_side = false;
        let mut side = |key: &str, slot: &mut f64| {
            if let Some(v) = attrs.get(key).and_then(Value::number) {
                *slot = v;
                any_side = true;
            }
        };
        side("marginTop", &mut margins.top);
        side("marginLeft", &mut margins.left);
        side("marginRight", &mut margins.right);
        side("marginBottom", &mut margins.bottom);
        if any_side {
            self.document.margins = Some(margins);
        }
    }
}

fn default_colors() -> HashMap<String, String> {
    [
        ("black", "#000000"),
        ("white", "#ffffff"),
        ("grey", "#808080"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_fonts() -> HashMap<String, String> {
    [
        ("default", "Helvetica"),
        ("bold", "Helvetica-Bold"),
        ("italic", "Helvetica-Oblique"),
        ("mono", "Courier"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// The builtin style-sheet. Every builtin tag has an entry (a tag with no
/// entry is a fatal lookup error), and the `*` wildcard closes every
/// cascade chain.
fn default_styles() -> HashMap<String, Props> {
    let styles = json!({
        "*":      { "display": "block" },
        "p":      { "display": "block", "font": "default", "size": 12, "color": "#000000",
                    "marginBottom": 12 },
        "div":    { "display": "block" },
        "h1":     { "display": "block", "font": "bold", "size": 24, "marginBottom": 12 },
        "h2":     { "display": "block", "font": "bold", "size": 18, "marginBottom": 10 },
        "h3":     { "display": "block", "font": "bold", "size": 15, "marginBottom": 8 },
        "h4":     { "display": "block", "font": "bold", "size": 13, "marginBottom": 6 },
        "pre":    { "display": "block", "font": "mono", "pre": true, "marginBottom": 12 },
        "span":   { "display": "inline" },
        "b":      { "display": "inline", "font": "bold" },
        "strong": { "display": "inline", "extends": "b" },
        "i":      { "display": "inline", "font": "italic" },
        "em":     { "display": "inline", "extends": "i" },
        "u":      { "display": "inline", "underline": true },
        "s":      { "display": "inline", "strike": true },
        "small":  { "display": "inline", "size": 9 },
        "big":    { "display": "inline", "size": 15 },
        "a":      { "display": "inline", "color": "#0000ee", "underline": true },
        "hr":     { "display": "block", "thickness": 2, "color": "#000000",
                    "marginTop": 6, "marginBottom": 6 },
        "img":    { "display": "block" },
        "indent": { "display": "block", "paddingLeft": 20 },
        "row":    { "display": "block" },
        "column": { "display": "block" },
    });
    serde_json::from_value(styles).expect("builtin style-sheet is well-formed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_builtin_tags() {
        let config = Config::default();
        for tag in [
            "*", "p", "h1", "h2", "h3", "h4", "b", "i", "u", "s", "a", "hr", "img", "indent",
            "row", "column", "pre", "div", "span",
        ] {
            assert!(config.styles.contains_key(tag), "missing builtin style {}", tag);
        }
    }

    #[test]
    fn test_overlay_merges_style_keys() {
        let mut config = Config::default();
        let overlay: ConfigOverlay =
            serde_json::from_str(r#"{"styles":{"p":{"size":14},"callout":{"display":"block"}}}"#)
                .unwrap();
        config.apply(overlay);
        let p = &config.styles["p"];
        assert_eq!(p.get("size"), Some(&Value::Number(14.0)));
        // untouched keys survive the merge
        assert_eq!(p.get("display"), Some(&Value::Text("block".into())));
        assert!(config.styles.contains_key("callout"));
    }

    #[test]
    fn test_overlay_document_defaults() {
        let config = Config::from_json(r#"{"document":{"size":"Letter","margin":36}}"#).unwrap();
        assert_eq!(config.document.size, PageSize::Letter);
        assert_eq!(config.document.resolved_margins(), Edges::uniform(36.0));
    }

    #[test]
    fn test_apply_head_styles_and_palette() {
        let mut config = Config::default();
        let head = Node::element(
            "head",
            vec![],
            vec![
                Node::element(
                    "styles",
                    vec![],
                    vec![Node::element(
                        "warning",
                        vec![("color", "#cc0000".into()), ("display", "block".into())],
                        vec![],
                    )],
                ),
                Node::element("colors", vec![("brand", "#336699".into())], vec![]),
                Node::element(
                    "document",
                    vec![("size", "A5".into()), ("marginLeft", 20.0.into())],
                    vec![],
                ),
            ],
        );
        config.apply_head(&head);
        assert!(config.styles.contains_key("warning"));
        assert_eq!(config.colors.get("brand").map(String::as_str), Some("#336699"));
        assert_eq!(config.document.size, PageSize::A5);
        assert_eq!(config.document.resolved_margins().left, 20.0);
        assert_eq!(config.document.resolved_margins().top, 72.0);
    }
}
