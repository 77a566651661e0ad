//! # Box Geometry
//!
//! Pure resolution of raw attribute values plus the current container
//! bounds into an absolute box. Percentages resolve against the nearest
//! enclosing resolved dimension at the moment of evaluation: widths
//! against the available content width, heights and vertical offsets
//! against the page height, horizontal offsets against the page width.
//!
//! Numeric coercion never fails: malformed or absent values fall back to
//! a supplied default or zero.

use super::state::RenderState;
use crate::model::Value;
use crate::style::{Display, ResolvedStyle};
use log::trace;

/// The computed box of one node. `width` is always resolved by the time
/// resolution finishes; `height` stays unresolved for blocks that derive
/// it from their content after children render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub top: f64,
    pub left: f64,
    /// Right inset (distance from the page's right edge).
    pub right: f64,
    pub width: f64,
    pub height: Option<f64>,
}

/// Coerce an optional value to a number, falling back to `default`.
pub fn num(value: Option<&Value>, default: f64) -> f64 {
    value.and_then(Value::number).unwrap_or(default)
}

/// Resolve a value that may be a percentage of `total`, or a plain number.
/// Anything else reads as zero.
pub fn percent_or_number(value: &Value, total: f64) -> f64 {
    if value.is_percentage() {
        value.number().unwrap_or(0.0) / 100.0 * total
    } else {
        value.number().unwrap_or(0.0)
    }
}

fn numeric<'a>(value: &'a Option<Value>) -> Option<&'a Value> {
    value.as_ref().filter(|v| v.is_numeric())
}

/// Compute the box for a node about to render, from the traversal state,
/// the drawing cursor, and the node's resolved style.
pub fn resolve_box(state: &RenderState, cursor: (f64, f64), style: &ResolvedStyle) -> Geometry {
    let base_left = match style.display {
        Display::Block => state.left,
        Display::Inline => cursor.0,
    };

    let mut top = cursor.1 + style.margin.top;
    let mut left = base_left + style.margin.left;
    let mut right = state.right + style.margin.right;
    let mut width: Option<f64> = None;
    let mut height: Option<f64> = None;

    if let Some(w) = numeric(&style.width) {
        // Width percentages resolve against the width available inside the
        // margins, not the raw container width.
        let available = state.content_width() - style.margin.left - style.margin.right;
        let w = percent_or_number(w, available);
        width = Some(w);
        right = state.page_width - left - w;
    }

    if let Some(h) = numeric(&style.height) {
        height = Some(percent_or_number(h, state.page_height));
    }

    if let Some(l) = numeric(&style.left) {
        left = percent_or_number(l, state.page_width);
    }

    if let Some(r) = numeric(&style.right) {
        if let Some(w) = width {
            right = percent_or_number(r, state.page_width);
            left = state.page_width - right - w;
        }
    }

    if let Some(t) = numeric(&style.top) {
        top = percent_or_number(t, state.page_height);
    }

    if let Some(b) = numeric(&style.bottom) {
        // Top is always resolved by this point (the cursor supplies the
        // default), so a bottom edge fixes the height.
        let bottom = percent_or_number(b, state.page_height);
        height = Some(bottom - top);
    }

    let width = width.unwrap_or_else(|| state.page_width - left - right);

    let geometry = Geometry {
        top,
        left,
        right,
        width,
        height,
    };
    trace!(
        "box {} -> {:?} (container left {} right {})",
        state.path,
        geometry,
        state.left,
        state.right
    );
    geometry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::style::resolve;
    use std::collections::HashMap;

    fn state() -> RenderState {
        let mut state = RenderState::new();
        state.page_width = 400.0;
        state.page_height = 800.0;
        state.left = 100.0;
        state.right = 100.0; // content width 200
        state
    }

    fn style_with(attrs: &[(&str, Value)]) -> ResolvedStyle {
        let attrs: HashMap<String, Value> = attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        resolve("div", &attrs, &Config::default()).unwrap()
    }

    #[test]
    fn test_num_coercion_never_fails() {
        assert_eq!(num(Some(&Value::Text("12.5".into())), 0.0), 12.5);
        assert_eq!(num(Some(&Value::Text("junk".into())), 7.0), 7.0);
        assert_eq!(num(None, 0.0), 0.0);
    }

    #[test]
    fn test_percentage_width_of_content_area() {
        // 50% inside a content area of width 200 resolves to exactly 100
        let state = state();
        let style = style_with(&[("width", "50%".into())]);
        let geometry = resolve_box(&state, (100.0, 72.0), &style);
        assert_eq!(geometry.width, 100.0);
        assert_eq!(geometry.right, 400.0 - 100.0 - 100.0);
    }

    #[test]
    fn test_percentage_width_accounts_for_margins() {
        let state = state();
        let style = style_with(&[("width", "50%".into()), ("margin", 10.0.into())]);
        // available = 200 - 10 - 10 = 180
        let geometry = resolve_box(&state, (100.0, 72.0), &style);
        assert_eq!(geometry.width, 90.0);
        assert_eq!(geometry.left, 110.0);
        assert_eq!(geometry.top, 82.0);
    }

    #[test]
    fn test_default_width_fills_container() {
        let state = state();
        let style = style_with(&[]);
        let geometry = resolve_box(&state, (100.0, 72.0), &style);
        assert_eq!(geometry.width, 200.0);
        assert_eq!(geometry.height, None);
    }

    #[test]
    fn test_block_anchors_to_container_inline_to_cursor() {
        let state = state();
        let block = style_with(&[]);
        let geometry = resolve_box(&state, (150.0, 72.0), &block);
        assert_eq!(geometry.left, 100.0);

        let mut inline = style_with(&[]);
        inline.display = Display::Inline;
        let geometry = resolve_box(&state, (150.0, 72.0), &inline);
        assert_eq!(geometry.left, 150.0);
    }

    #[test]
    fn test_explicit_left_is_page_relative() {
        let state = state();
        let style = style_with(&[("left", "25%".into())]);
        let geometry = resolve_box(&state, (100.0, 72.0), &style);
        assert_eq!(geometry.left, 100.0); // 25% of page width 400
    }

    #[test]
    fn test_right_with_known_width_recomputes_left() {
        let state = state();
        let style = style_with(&[("width", 120.0.into()), ("right", 40.0.into())]);
        let geometry = resolve_box(&state, (100.0, 72.0), &style);
        assert_eq!(geometry.right, 40.0);
        assert_eq!(geometry.left, 400.0 - 40.0 - 120.0);
    }

    #[test]
    fn test_right_without_width_is_ignored() {
        let state = state();
        let style = style_with(&[("right", 40.0.into())]);
        let geometry = resolve_box(&state, (100.0, 72.0), &style);
        // falls back to the container-derived box
        assert_eq!(geometry.left, 100.0);
        assert_eq!(geometry.width, 200.0);
    }

    #[test]
    fn test_explicit_top_overrides_cursor() {
        let state = state();
        let style = style_with(&[("top", "50%".into())]);
        let geometry = resolve_box(&state, (100.0, 72.0), &style);
        assert_eq!(geometry.top, 400.0); // 50% of page height 800
    }

    #[test]
    fn test_bottom_derives_height() {
        let state = state();
        let style = style_with(&[("top", 100.0.into()), ("bottom", 300.0.into())]);
        let geometry = resolve_box(&state, (100.0, 72.0), &style);
        assert_eq!(geometry.top, 100.0);
        assert_eq!(geometry.height, Some(200.0));
    }

    #[test]
    fn test_height_percentage_of_page() {
        let state = state();
        let style = style_with(&[("height", "10%".into())]);
        let geometry = resolve_box(&state, (100.0, 72.0), &style);
        assert_eq!(geometry.height, Some(80.0));
    }

    #[test]
    fn test_malformed_width_falls_back_to_container() {
        let state = state();
        let style = style_with(&[("width", "wide".into())]);
        let geometry = resolve_box(&state, (100.0, 72.0), &style);
        assert_eq!(geometry.width, 200.0);
    }
}
