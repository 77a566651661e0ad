//! # Font Management
//!
//! Metrics and data for the two kinds of font the surface can draw with:
//! the builtin Type1 faces (Helvetica, Times, Courier families), which need
//! no embedding, and TrueType fonts loaded from disk via ttf-parser, which
//! are embedded into the output.
//!
//! Widths for the builtin faces come from the standard AFM tables (1000
//! units per em); oblique/italic variants share their upright widths.

use crate::error::RenderError;
use std::collections::HashMap;
use std::path::Path;

/// A builtin Type1 face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

// AFM advance widths for character codes 32..=126, in 1/1000 em.
#[rustfmt::skip]
static HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333,
    278, 278, 556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278,
    584, 584, 584, 556, 1015, 667, 667, 722, 722, 667, 611, 778, 722, 278,
    500, 667, 556, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944,
    667, 667, 611, 278, 278, 278, 469, 556, 333, 556, 556, 500, 556, 556,
    278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333, 500,
    278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
static HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333,
    278, 278, 556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333,
    584, 584, 584, 611, 975, 722, 722, 722, 722, 667, 611, 778, 722, 278,
    556, 722, 611, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944,
    667, 667, 611, 333, 278, 333, 584, 556, 333, 556, 611, 556, 611, 556,
    333, 611, 611, 278, 278, 556, 278, 889, 611, 611, 611, 611, 389, 556,
    333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[rustfmt::skip]
static TIMES_WIDTHS: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333,
    250, 278, 500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278,
    564, 564, 564, 444, 921, 722, 667, 667, 722, 611, 556, 722, 722, 333,
    389, 722, 611, 889, 722, 722, 556, 722, 667, 556, 611, 722, 722, 944,
    722, 722, 611, 333, 278, 333, 469, 500, 333, 444, 500, 444, 500, 444,
    333, 500, 500, 278, 278, 500, 278, 778, 500, 500, 500, 500, 333, 389,
    278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

#[rustfmt::skip]
static TIMES_BOLD_WIDTHS: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333,
    250, 278, 500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333,
    570, 570, 570, 500, 930, 722, 667, 722, 722, 667, 611, 778, 778, 389,
    500, 778, 667, 944, 722, 778, 611, 778, 722, 556, 667, 722, 722, 1000,
    722, 722, 667, 333, 278, 333, 581, 500, 333, 500, 556, 444, 556, 444,
    333, 500, 556, 278, 333, 556, 278, 833, 556, 500, 556, 556, 444, 389,
    333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];

impl BuiltinFont {
    /// Look up a builtin face by its PDF name.
    pub fn from_name(name: &str) -> Option<BuiltinFont> {
        use BuiltinFont::*;
        match name {
            "Helvetica" => Some(Helvetica),
            "Helvetica-Bold" => Some(HelveticaBold),
            "Helvetica-Oblique" => Some(HelveticaOblique),
            "Helvetica-BoldOblique" => Some(HelveticaBoldOblique),
            "Times-Roman" => Some(TimesRoman),
            "Times-Bold" => Some(TimesBold),
            "Times-Italic" => Some(TimesItalic),
            "Times-BoldItalic" => Some(TimesBoldItalic),
            "Courier" => Some(Courier),
            "Courier-Bold" => Some(CourierBold),
            "Courier-Oblique" => Some(CourierOblique),
            "Courier-BoldOblique" => Some(CourierBoldOblique),
            _ => None,
        }
    }

    pub fn pdf_name(&self) -> &'static str {
        use BuiltinFont::*;
        match self {
            Helvetica => "Helvetica",
            HelveticaBold => "Helvetica-Bold",
            HelveticaOblique => "Helvetica-Oblique",
            HelveticaBoldOblique => "Helvetica-BoldOblique",
            TimesRoman => "Times-Roman",
            TimesBold => "Times-Bold",
            TimesItalic => "Times-Italic",
            TimesBoldItalic => "Times-BoldItalic",
            Courier => "Courier",
            CourierBold => "Courier-Bold",
            CourierOblique => "Courier-Oblique",
            CourierBoldOblique => "Courier-BoldOblique",
        }
    }

    // Oblique and italic variants share their upright advance widths.
    fn widths(&self) -> Option<&'static [u16; 95]> {
        use BuiltinFont::*;
        match self {
            Helvetica | HelveticaOblique => Some(&HELVETICA_WIDTHS),
            HelveticaBold | HelveticaBoldOblique => Some(&HELVETICA_BOLD_WIDTHS),
            TimesRoman | TimesItalic => Some(&TIMES_WIDTHS),
            TimesBold | TimesBoldItalic => Some(&TIMES_BOLD_WIDTHS),
            Courier | CourierBold | CourierOblique | CourierBoldOblique => None,
        }
    }

    fn default_width(&self) -> u16 {
        use BuiltinFont::*;
        match self {
            Courier | CourierBold | CourierOblique | CourierBoldOblique => 600,
            TimesRoman | TimesBold | TimesItalic | TimesBoldItalic => 500,
            _ => 556,
        }
    }

    /// Ascender in 1/1000 em.
    pub fn ascender(&self) -> f64 {
        use BuiltinFont::*;
        match self {
            Courier | CourierBold | CourierOblique | CourierBoldOblique => 629.0,
            TimesRoman | TimesItalic => 683.0,
            TimesBold | TimesBoldItalic => 676.0,
            _ => 718.0,
        }
    }

    /// Descender in 1/1000 em (negative).
    pub fn descender(&self) -> f64 {
        use BuiltinFont::*;
        match self {
            Courier | CourierBold | CourierOblique | CourierBoldOblique => -157.0,
            TimesRoman | TimesItalic => -217.0,
            TimesBold | TimesBoldItalic => -205.0,
            _ => -207.0,
        }
    }

    pub fn char_width(&self, ch: char, size: f64) -> f64 {
        let cp = ch as u32;
        let units = match self.widths() {
            None => self.default_width(), // fixed pitch
            Some(table) => {
                if (32..=126).contains(&cp) {
                    table[(cp - 32) as usize]
                } else {
                    self.default_width()
                }
            }
        };
        units as f64 / 1000.0 * size
    }
}

/// A TrueType font loaded for embedding, with the metrics the flow and the
/// PDF writer need. Glyph and advance maps are sampled up front so the
/// parsed face doesn't have to outlive the raw data.
#[derive(Debug, Clone)]
pub struct EmbeddedFont {
    pub data: Vec<u8>,
    pub base_name: String,
    pub units_per_em: u16,
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
    pub cap_height: i16,
    /// Global bounding box (x_min, y_min, x_max, y_max) in font units.
    pub bbox: (i16, i16, i16, i16),
    /// Character to (glyph id, advance width in font units).
    glyphs: HashMap<char, (u16, u16)>,
    default_advance: u16,
}

impl EmbeddedFont {
    pub fn parse(name: &str, data: Vec<u8>) -> Result<EmbeddedFont, RenderError> {
        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|e| RenderError::Font(format!("failed to parse '{}': {}", name, e)))?;

        let units_per_em = face.units_per_em();
        let mut glyphs = HashMap::new();
        let mut default_advance = 0u16;
        for code in 32u32..=0xFFFF {
            if let Some(ch) = char::from_u32(code) {
                if let Some(glyph_id) = face.glyph_index(ch) {
                    let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0);
                    glyphs.insert(ch, (glyph_id.0, advance));
                    if ch == ' ' {
                        default_advance = advance;
                    }
                }
            }
        }
        if default_advance == 0 {
            default_advance = units_per_em / 2;
        }

        let bbox = face.global_bounding_box();
        let ascender = face.ascender();
        let descender = face.descender();
        let line_gap = face.line_gap();
        let cap_height = face.capital_height().unwrap_or(ascender);
        drop(face);

        Ok(EmbeddedFont {
            base_name: base_font_name(name),
            units_per_em,
            ascender,
            descender,
            line_gap,
            cap_height,
            bbox: (bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max),
            glyphs,
            default_advance,
            data,
        })
    }

    pub fn glyph_id(&self, ch: char) -> u16 {
        self.glyphs.get(&ch).map(|(gid, _)| *gid).unwrap_or(0)
    }

    /// Advance width of a glyph in 1/1000 em (PDF /W units).
    pub fn advance_units(&self, ch: char) -> u16 {
        let advance = self
            .glyphs
            .get(&ch)
            .map(|(_, adv)| *adv)
            .unwrap_or(self.default_advance);
        (advance as f64 / self.units_per_em as f64 * 1000.0).round() as u16
    }

    pub fn char_width(&self, ch: char, size: f64) -> f64 {
        let advance = self
            .glyphs
            .get(&ch)
            .map(|(_, adv)| *adv)
            .unwrap_or(self.default_advance);
        advance as f64 / self.units_per_em as f64 * size
    }
}

/// Build a PDF BaseFont name from a font file path.
fn base_font_name(name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Embedded".to_string());
    let cleaned: String = stem.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if cleaned.is_empty() {
        "Embedded".to_string()
    } else {
        cleaned
    }
}

/// Font data behind a resolved font name.
#[derive(Debug, Clone)]
pub enum FontData {
    Builtin(BuiltinFont),
    Embedded(EmbeddedFont),
}

impl FontData {
    pub fn char_width(&self, ch: char, size: f64) -> f64 {
        match self {
            FontData::Builtin(f) => f.char_width(ch, size),
            FontData::Embedded(f) => f.char_width(ch, size),
        }
    }

    pub fn measure(&self, text: &str, size: f64) -> f64 {
        text.chars().map(|ch| self.char_width(ch, size)).sum()
    }

    /// Distance from the top of the line box to the baseline.
    pub fn ascent(&self, size: f64) -> f64 {
        match self {
            FontData::Builtin(f) => f.ascender() / 1000.0 * size,
            FontData::Embedded(f) => f.ascender as f64 / f.units_per_em as f64 * size,
        }
    }

    /// Height of one line box at the given size.
    pub fn line_height(&self, size: f64) -> f64 {
        match self {
            // The builtin faces carry no line gap; a flat leading keeps
            // consecutive lines readable.
            FontData::Builtin(_) => size * 1.15,
            FontData::Embedded(f) => {
                let units = (f.ascender as i32 - f.descender as i32 + f.line_gap as i32) as f64;
                (units / f.units_per_em as f64).max(1.0) * size
            }
        }
    }
}

/// The font registry behind a surface: builtin faces under their canonical
/// names, plus TTFs loaded on demand from file paths.
pub struct FontBook {
    fonts: HashMap<String, FontData>,
}

impl Default for FontBook {
    fn default() -> Self {
        Self::new()
    }
}

impl FontBook {
    pub fn new() -> Self {
        FontBook {
            fonts: HashMap::new(),
        }
    }

    /// Resolve a font name: a builtin face name, or a path to a TrueType
    /// file (loaded and cached). Anything else is an error.
    pub fn resolve(&mut self, name: &str) -> Result<&FontData, RenderError> {
        if !self.fonts.contains_key(name) {
            let data = if let Some(builtin) = BuiltinFont::from_name(name) {
                FontData::Builtin(builtin)
            } else if looks_like_path(name) {
                let bytes = std::fs::read(name).map_err(|e| {
                    RenderError::Font(format!("failed to read '{}': {}", name, e))
                })?;
                FontData::Embedded(EmbeddedFont::parse(name, bytes)?)
            } else {
                return Err(RenderError::Font(format!("unknown font '{}'", name)));
            };
            self.fonts.insert(name.to_string(), data);
        }
        Ok(&self.fonts[name])
    }

    pub fn get(&self, name: &str) -> Option<&FontData> {
        self.fonts.get(name)
    }

    /// Measure a string, treating an unresolved name as Helvetica.
    pub fn measure(&self, name: &str, text: &str, size: f64) -> f64 {
        match self.fonts.get(name) {
            Some(data) => data.measure(text, size),
            None => FontData::Builtin(BuiltinFont::Helvetica).measure(text, size),
        }
    }
}

fn looks_like_path(name: &str) -> bool {
    name.contains('/')
        || name.contains('\\')
        || name.ends_with(".ttf")
        || name.ends_with(".otf")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_width_matches_afm() {
        let w = BuiltinFont::Helvetica.char_width(' ', 12.0);
        assert!((w - 3.336).abs() < 0.001);
    }

    #[test]
    fn test_bold_is_wider() {
        let regular = BuiltinFont::Helvetica.char_width('!', 12.0);
        let bold = BuiltinFont::HelveticaBold.char_width('!', 12.0);
        assert!(bold > regular);
    }

    #[test]
    fn test_courier_is_fixed_pitch() {
        let i = BuiltinFont::Courier.char_width('i', 10.0);
        let m = BuiltinFont::Courier.char_width('M', 10.0);
        assert_eq!(i, m);
        assert!((i - 6.0).abs() < 0.001);
    }

    #[test]
    fn test_oblique_shares_upright_widths() {
        let upright = BuiltinFont::Helvetica.char_width('A', 12.0);
        let oblique = BuiltinFont::HelveticaOblique.char_width('A', 12.0);
        assert_eq!(upright, oblique);
    }

    #[test]
    fn test_book_resolves_builtin_names() {
        let mut book = FontBook::new();
        assert!(book.resolve("Helvetica").is_ok());
        assert!(book.resolve("Times-BoldItalic").is_ok());
        assert!(book.resolve("Courier-Oblique").is_ok());
    }

    #[test]
    fn test_book_rejects_unknown_names() {
        let mut book = FontBook::new();
        let err = book.resolve("Comic Sans").unwrap_err();
        assert!(err.to_string().contains("Comic Sans"));
    }

    #[test]
    fn test_missing_font_file_errors() {
        let mut book = FontBook::new();
        let err = book.resolve("/nonexistent/font.ttf").unwrap_err();
        assert!(matches!(err, RenderError::Font(_)));
    }

    #[test]
    fn test_measure_sums_advances() {
        let data = FontData::Builtin(BuiltinFont::Courier);
        let w = data.measure("abc", 10.0);
        assert!((w - 18.0).abs() < 0.001);
    }

    #[test]
    fn test_base_font_name_sanitized() {
        assert_eq!(base_font_name("/assets/fonts/My Font-1.ttf"), "MyFont1");
        assert_eq!(base_font_name(""), "Embedded");
    }
}
