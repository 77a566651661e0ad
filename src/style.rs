//! # Style System
//!
//! A constrained, CSS-like cascade for document nodes. Styles are named
//! property bags in the configuration's style-sheet; a node's effective
//! style merges its inline attributes with an optional explicit `style`
//! reference, that entry's `extends` chain, the entry named after the tag
//! itself, and finally the `*` wildcard. Earlier merges win; later entries
//! only fill gaps.
//!
//! We don't try to implement CSS. We implement the cascade a paginated
//! document needs, and we implement it predictably.

use crate::config::{Config, Props};
use crate::error::RenderError;
use crate::model::{Edges, Value};
use log::trace;
use serde::{Deserialize, Serialize};

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64, // 0.0 - 1.0
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn hex(hex: &str) -> Self {
        let hex = hex.trim_start_matches('#');
        let (r, g, b) = match hex.len() {
            3 => {
                let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).unwrap_or(0);
                let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).unwrap_or(0);
                let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).unwrap_or(0);
                (r, g, b)
            }
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
                let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
                let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
                (r, g, b)
            }
            _ => (0, 0, 0),
        };
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
            a: 1.0,
        }
    }

    /// Parse a color value: `#rgb`/`#rrggbb` hex, or one of the basic named
    /// colors. Unparseable input falls back to black.
    pub fn parse(s: &str) -> Self {
        if s.starts_with('#') {
            return Color::hex(s);
        }
        match s.to_ascii_lowercase().as_str() {
            "black" => Color::BLACK,
            "white" => Color::WHITE,
            "red" => Color::rgb(1.0, 0.0, 0.0),
            "green" => Color::rgb(0.0, 0.5, 0.0),
            "blue" => Color::rgb(0.0, 0.0, 1.0),
            "yellow" => Color::rgb(1.0, 1.0, 0.0),
            "orange" => Color::rgb(1.0, 0.65, 0.0),
            "purple" => Color::rgb(0.5, 0.0, 0.5),
            "grey" | "gray" => Color::rgb(0.5, 0.5, 0.5),
            "silver" => Color::rgb(0.75, 0.75, 0.75),
            _ => Color::hex(s),
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// Text alignment within the wrap width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl Align {
    fn from_value(v: &Value) -> Option<Align> {
        match v.as_str()? {
            "left" => Some(Align::Left),
            "center" | "centre" => Some(Align::Center),
            "right" => Some(Align::Right),
            "justify" => Some(Align::Justify),
            _ => None,
        }
    }
}

/// Display mode of a box.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Display {
    Block,
    #[default]
    Inline,
}

/// The closed set of rendering behaviours a style can select.
///
/// A name in the cascade chain that matches one of these sets the node's
/// behaviour unless something earlier in the chain already did; `Generic`
/// is the declared default.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Behaviour {
    #[default]
    Generic,
    Hr,
    Img,
    Indent,
    Row,
    Column,
    Anchor,
}

impl Behaviour {
    /// Map a style/tag name to the behaviour it selects, if any.
    pub fn from_name(name: &str) -> Option<Behaviour> {
        match name {
            "hr" => Some(Behaviour::Hr),
            "img" => Some(Behaviour::Img),
            "indent" => Some(Behaviour::Indent),
            "row" => Some(Behaviour::Row),
            "column" => Some(Behaviour::Column),
            "a" => Some(Behaviour::Anchor),
            _ => None,
        }
    }
}

/// The active text style carried through traversal and inherited by
/// descendants. All fields are concrete; nodes overlay only the keys they
/// set.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub color: Color,
    pub font: String,
    pub size: f64,
    pub underline: bool,
    pub strike: bool,
    pub align: Align,
    pub line_gap: f64,
    pub paragraph_gap: f64,
    pub pre: bool,
    pub trim: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        TextStyle {
            color: Color::BLACK,
            font: "Helvetica".to_string(),
            size: 12.0,
            underline: false,
            strike: false,
            align: Align::Left,
            line_gap: 0.0,
            paragraph_gap: 0.0,
            pre: false,
            trim: false,
        }
    }
}

impl TextStyle {
    /// Overlay the text-affecting keys a resolved style actually sets.
    pub fn apply(&mut self, style: &ResolvedStyle) {
        if let Some(c) = style.color {
            self.color = c;
        }
        if let Some(ref f) = style.font {
            self.font = f.clone();
        }
        if let Some(s) = style.size {
            self.size = s;
        }
        if let Some(u) = style.underline {
            self.underline = u;
        }
        if let Some(s) = style.strike {
            self.strike = s;
        }
        if let Some(a) = style.align {
            self.align = a;
        }
        if let Some(g) = style.line_gap {
            self.line_gap = g;
        }
        if let Some(g) = style.paragraph_gap {
            self.paragraph_gap = g;
        }
        if let Some(p) = style.pre {
            self.pre = p;
        }
        if let Some(t) = style.trim {
            self.trim = t;
        }
    }

    /// Build a text style from a raw style-sheet entry (used for the
    /// per-page base style). Missing keys keep their defaults.
    pub fn from_props(props: Option<&Props>, config: &Config) -> TextStyle {
        let mut style = TextStyle::default();
        if let Some(props) = props {
            let mut cleaned = props.clone();
            normalize_props(&mut cleaned, config);
            style.apply(&extract(cleaned, None));
        }
        style
    }
}

/// The fully merged style of one rendered node instance. Text-affecting
/// keys stay optional so only explicitly set values overlay the inherited
/// text style; geometry inputs stay raw so the geometry resolver can apply
/// its own coercion rules.
#[derive(Debug, Clone, Default)]
pub struct ResolvedStyle {
    pub behaviour: Behaviour,
    pub display: Display,

    // Text-affecting keys (presence matters for inheritance)
    pub color: Option<Color>,
    pub font: Option<String>,
    pub size: Option<f64>,
    pub underline: Option<bool>,
    pub strike: Option<bool>,
    pub align: Option<Align>,
    pub line_gap: Option<f64>,
    pub paragraph_gap: Option<f64>,
    pub pre: Option<bool>,
    pub trim: Option<bool>,

    // Box model
    pub margin: Edges,
    pub padding: Edges,
    pub background_color: Option<Color>,
    /// Border line width; present when any border value was set.
    pub border: Option<f64>,
    pub border_color: Option<Color>,

    // Geometry inputs, raw as written
    pub width: Option<Value>,
    pub height: Option<Value>,
    pub top: Option<Value>,
    pub left: Option<Value>,
    pub right: Option<Value>,
    pub bottom: Option<Value>,

    // Behaviour-specific options
    pub thickness: f64,
    pub src: Option<String>,
    pub href: Option<String>,
    pub scale: Option<Value>,
    pub fit: bool,
}

/// Resolve a tag's effective style: inline attributes, the explicit `style`
/// reference, its `extends` chain, the tag-name entry, then the wildcard.
///
/// A referenced name absent from the style-sheet is a fatal error naming
/// that style. Each name is processed at most once per resolution, which
/// also makes `extends` cycles terminate.
pub fn resolve(tag: &str, attrs: &Props, config: &Config) -> Result<ResolvedStyle, RenderError> {
    let mut merged = attrs.clone();
    normalize_props(&mut merged, config);

    let mut visited: Vec<String> = Vec::new();
    let mut detected: Option<Behaviour> = None;

    if let Some(style_ref) = merged.get("style").and_then(|v| v.as_str()).map(String::from) {
        extend(&mut merged, &style_ref, &mut visited, &mut detected, config)?;
    }
    extend(&mut merged, tag, &mut visited, &mut detected, config)?;
    extend(&mut merged, "*", &mut visited, &mut detected, config)?;

    trace!("resolved style for <{}> via {:?}", tag, visited);

    Ok(extract(merged, detected))
}

fn extend(
    merged: &mut Props,
    name: &str,
    visited: &mut Vec<String>,
    detected: &mut Option<Behaviour>,
    config: &Config,
) -> Result<(), RenderError> {
    if visited.iter().any(|v| v == name) {
        return Ok(());
    }
    visited.push(name.to_string());

    if detected.is_none() && !merged.contains_key("behaviour") {
        *detected = Behaviour::from_name(name);
    }

    let entry = config
        .styles
        .get(name)
        .ok_or_else(|| RenderError::StyleNotFound(name.to_string()))?;

    let mut entry = entry.clone();
    normalize_props(&mut entry, config);

    let extends = entry.get("extends").and_then(|v| v.as_str()).map(String::from);
    for (key, value) in entry {
        merged.entry(key).or_insert(value);
    }

    if let Some(parent) = extends {
        extend(merged, &parent, visited, detected, config)?;
    }
    Ok(())
}

/// Normalize a property bag in place: look up color and font aliases,
/// resolve font paths against the base path, and expand scalar `padding`
/// and `margin` values into their four sides.
pub fn normalize_props(props: &mut Props, config: &Config) {
    for key in ["color", "backgroundColor", "borderColor"] {
        if let Some(name) = props.get(key).and_then(|v| v.as_str()) {
            if let Some(resolved) = config.colors.get(name) {
                props.insert(key.to_string(), Value::Text(resolved.clone()));
            }
        }
    }

    if let Some(name) = props.get("font").and_then(|v| v.as_str()) {
        let mut font = config.fonts.get(name).cloned().unwrap_or_else(|| name.to_string());
        if font.contains('/') {
            font = config
                .base_path
                .join(&font)
                .to_string_lossy()
                .into_owned();
        }
        props.insert("font".to_string(), Value::Text(font));
    }

    expand_edges(props, "padding");
    expand_edges(props, "margin");
}

/// A scalar edge value expands to all four sides; an independently set side
/// keeps its own value.
fn expand_edges(props: &mut Props, key: &str) {
    let scalar = match props.get(key) {
        Some(v) if v.is_numeric() && !v.is_percentage() => v.number().unwrap_or(0.0),
        _ => return,
    };
    for side in ["Top", "Left", "Right", "Bottom"] {
        let side_key = format!("{}{}", key, side);
        let v = props
            .get(&side_key)
            .and_then(Value::number)
            .unwrap_or(scalar);
        props.insert(side_key, Value::Number(v));
    }
    props.remove(key);
}

fn edges_from(props: &Props, key: &str) -> Edges {
    let side = |s: &str| {
        props
            .get(&format!("{}{}", key, s))
            .and_then(Value::number)
            .unwrap_or(0.0)
    };
    Edges {
        top: side("Top"),
        right: side("Right"),
        bottom: side("Bottom"),
        left: side("Left"),
    }
}

fn extract(merged: Props, detected: Option<Behaviour>) -> ResolvedStyle {
    let get = |key: &str| merged.get(key);
    let num = |key: &str| get(key).and_then(Value::number);
    let flag = |key: &str| get(key).map(Value::truthy);
    let text = |key: &str| get(key).and_then(|v| v.as_str()).map(String::from);
    let color = |key: &str| {
        get(key)
            .and_then(|v| v.as_str())
            .map(Color::parse)
    };

    let behaviour = merged
        .get("behaviour")
        .and_then(|v| v.as_str())
        .and_then(Behaviour::from_name)
        .or(detected)
        .unwrap_or_default();

    let display = match merged.get("display").and_then(|v| v.as_str()) {
        Some("block") => Display::Block,
        Some(_) => Display::Inline,
        None => Display::Inline,
    };

    // Any truthy border value turns the border on; a numeric one also sets
    // the line width.
    let border = match merged.get("border") {
        Some(v) if v.truthy() => Some(v.number().unwrap_or(1.0)),
        _ => None,
    };

    ResolvedStyle {
        behaviour,
        display,
        color: color("color"),
        font: text("font"),
        size: num("size"),
        underline: flag("underline"),
        strike: flag("strike"),
        align: get("align").and_then(Align::from_value),
        line_gap: num("lineGap"),
        paragraph_gap: num("paragraphGap"),
        pre: flag("pre"),
        trim: flag("trim"),
        margin: edges_from(&merged, "margin"),
        padding: edges_from(&merged, "padding"),
        background_color: color("backgroundColor"),
        border,
        border_color: color("borderColor"),
        width: get("width").cloned(),
        height: get("height").cloned(),
        top: get("top").cloned(),
        left: get("left").cloned(),
        right: get("right").cloned(),
        bottom: get("bottom").cloned(),
        thickness: num("thickness").unwrap_or(0.0),
        src: text("src"),
        href: text("href"),
        scale: get("scale").cloned(),
        fit: flag("fit").unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::collections::HashMap;

    fn config_with(extra: &[(&str, &[(&str, Value)])]) -> Config {
        let mut config = Config::default();
        for (name, props) in extra {
            let entry: Props = props
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect();
            config.styles.insert(name.to_string(), entry);
        }
        config
    }

    fn no_attrs() -> Props {
        HashMap::new()
    }

    #[test]
    fn test_extends_chain_falls_through() {
        // a -> b -> c, with `*` always last: a key undefined on a resolves
        // from b, then c, then the wildcard.
        let config = config_with(&[
            ("a", &[("extends", "b".into()), ("size", 10.0.into())]),
            ("b", &[("extends", "c".into()), ("color", "#ff0000".into())]),
            ("c", &[("font", "Courier".into()), ("color", "#00ff00".into())]),
        ]);
        let mut attrs = no_attrs();
        attrs.insert("style".into(), "a".into());
        let style = resolve("p", &attrs, &config).unwrap();
        assert_eq!(style.size, Some(10.0));
        assert_eq!(style.color, Some(Color::hex("#ff0000"))); // b wins over c
        assert_eq!(style.font.as_deref(), Some("Courier")); // falls to c
    }

    #[test]
    fn test_wildcard_applies_last() {
        let mut config = config_with(&[("plain", &[])]);
        config
            .styles
            .get_mut("*")
            .unwrap()
            .insert("size".into(), Value::Number(33.0));
        let mut attrs = no_attrs();
        attrs.insert("style".into(), "plain".into());
        let style = resolve("p", &attrs, &config).unwrap();
        // p defines size; the wildcard must not override it
        assert_ne!(style.size, Some(33.0));
    }

    #[test]
    fn test_inline_wins_over_everything() {
        let config = Config::default();
        let mut attrs = no_attrs();
        attrs.insert("size".into(), Value::Number(42.0));
        let style = resolve("h1", &attrs, &config).unwrap();
        assert_eq!(style.size, Some(42.0));
    }

    #[test]
    fn test_missing_style_is_fatal_and_named() {
        let config = Config::default();
        let mut attrs = no_attrs();
        attrs.insert("style".into(), "nonexistent".into());
        let err = resolve("p", &attrs, &config).unwrap_err();
        assert!(matches!(err, RenderError::StyleNotFound(ref n) if n == "nonexistent"));
        assert!(err.to_string().contains("nonexistent"));
    }

    #[test]
    fn test_unknown_tag_is_fatal() {
        let config = Config::default();
        let err = resolve("mystery", &no_attrs(), &config).unwrap_err();
        assert!(err.to_string().contains("mystery"));
    }

    #[test]
    fn test_extends_cycle_terminates() {
        let config = config_with(&[
            ("x", &[("extends", "y".into()), ("size", 8.0.into())]),
            ("y", &[("extends", "x".into()), ("color", "#123456".into())]),
        ]);
        let mut attrs = no_attrs();
        attrs.insert("style".into(), "x".into());
        let style = resolve("p", &attrs, &config).unwrap();
        assert_eq!(style.size, Some(8.0));
        assert_eq!(style.color, Some(Color::hex("#123456")));
    }

    #[test]
    fn test_edge_expansion() {
        let config = Config::default();
        let mut attrs = no_attrs();
        attrs.insert("padding".into(), Value::Number(10.0));
        let style = resolve("p", &attrs, &config).unwrap();
        assert_eq!(style.padding, Edges::uniform(10.0));
    }

    #[test]
    fn test_edge_side_overrides_scalar() {
        let config = Config::default();
        let mut attrs = no_attrs();
        attrs.insert("padding".into(), Value::Number(10.0));
        attrs.insert("paddingLeft".into(), Value::Number(5.0));
        let style = resolve("p", &attrs, &config).unwrap();
        assert_eq!(style.padding.left, 5.0);
        assert_eq!(style.padding.top, 10.0);
        assert_eq!(style.padding.right, 10.0);
        assert_eq!(style.padding.bottom, 10.0);
    }

    #[test]
    fn test_behaviour_detected_from_tag() {
        let config = Config::default();
        let style = resolve("hr", &no_attrs(), &config).unwrap();
        assert_eq!(style.behaviour, Behaviour::Hr);
        let style = resolve("p", &no_attrs(), &config).unwrap();
        assert_eq!(style.behaviour, Behaviour::Generic);
    }

    #[test]
    fn test_behaviour_from_referenced_style() {
        let config = config_with(&[("bar", &[("thickness", 4.0.into()), ("display", "block".into())])]);
        // A plain tag referencing a style that extends `hr` picks up the
        // hr behaviour from the chain.
        let mut config = config;
        config
            .styles
            .get_mut("bar")
            .unwrap()
            .insert("extends".into(), Value::Text("hr".into()));
        let mut attrs = no_attrs();
        attrs.insert("style".into(), "bar".into());
        let style = resolve("div", &attrs, &config).unwrap();
        assert_eq!(style.behaviour, Behaviour::Hr);
    }

    #[test]
    fn test_color_alias_resolution() {
        let mut config = Config::default();
        config.colors.insert("brand".into(), "#336699".into());
        let mut attrs = no_attrs();
        attrs.insert("color".into(), "brand".into());
        let style = resolve("p", &attrs, &config).unwrap();
        assert_eq!(style.color, Some(Color::hex("#336699")));
    }

    #[test]
    fn test_unknown_color_falls_through_raw() {
        let config = Config::default();
        let mut attrs = no_attrs();
        attrs.insert("color".into(), "#abcdef".into());
        let style = resolve("p", &attrs, &config).unwrap();
        assert_eq!(style.color, Some(Color::hex("#abcdef")));
    }

    #[test]
    fn test_font_alias_and_path_resolution() {
        let mut config = Config::default();
        config.base_path = "/assets".into();
        config.fonts.insert("brand".into(), "fonts/brand.ttf".into());
        let mut attrs = no_attrs();
        attrs.insert("font".into(), "brand".into());
        let style = resolve("p", &attrs, &config).unwrap();
        assert_eq!(style.font.as_deref(), Some("/assets/fonts/brand.ttf"));
    }

    #[test]
    fn test_text_style_apply_only_present_keys() {
        let mut base = TextStyle::default();
        base.color = Color::hex("#ff0000");
        base.size = 20.0;
        let overlay = ResolvedStyle {
            size: Some(9.0),
            ..Default::default()
        };
        base.apply(&overlay);
        assert_eq!(base.size, 9.0);
        assert_eq!(base.color, Color::hex("#ff0000")); // untouched
    }
}
