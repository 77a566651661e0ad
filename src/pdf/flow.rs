//! # Text Flow
//!
//! Continued-run semantics for the PDF surface. Adjacent continued writes
//! build one logical run; the run buffers the current line as styled
//! segments, wraps greedily at UAX#14 break opportunities within the wrap
//! width, and emits each completed line as PDF text operators. A
//! non-continued write terminates the run and drops the cursor below the
//! last emitted line.

use super::{FontTable, PageBuffer};
use crate::font::FontData;
use crate::style::{Align, Color};
use crate::surface::TextOptions;
use unicode_linebreak::{linebreaks, BreakOpportunity};

/// Style of one text segment, captured from the surface's current state at
/// write time.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SegmentStyle {
    pub font: String,
    pub size: f64,
    pub color: Color,
    pub underline: bool,
    pub strike: bool,
    pub link: Option<String>,
}

#[derive(Debug, Clone)]
struct Segment {
    text: String,
    style: SegmentStyle,
    width: f64,
}

#[derive(Debug)]
struct Run {
    origin_x: f64,
    /// Top of the line currently being assembled.
    line_y: f64,
    wrap_width: f64,
    align: Align,
    line_gap: f64,
    segments: Vec<Segment>,
    line_width: f64,
}

/// At most one run is open per surface at any time.
#[derive(Debug, Default)]
pub(crate) struct Flow {
    run: Option<Run>,
}

impl Flow {
    pub fn is_open(&self) -> bool {
        self.run.is_some()
    }

    /// Write one piece of text into the flow, returning the cursor after
    /// the write: the end of the open run, or the position below the run's
    /// last line once it terminates.
    pub fn write(
        &mut self,
        fonts: &mut FontTable,
        page: &mut PageBuffer,
        content: &str,
        x: f64,
        y: f64,
        style: &SegmentStyle,
        options: &TextOptions,
    ) -> (f64, f64) {
        let run = self.run.get_or_insert_with(|| Run {
            origin_x: x,
            line_y: y,
            wrap_width: options.wrap_width.max(1.0),
            align: options.align,
            line_gap: options.line_gap,
            segments: Vec::new(),
            line_width: 0.0,
        });

        for (piece, hard_break) in break_pieces(content) {
            let piece = piece.trim_end_matches(['\n', '\r']);
            if !piece.is_empty() {
                let width = fonts.book.measure(&style.font, piece, style.size);
                let fits = run.line_width + width <= run.wrap_width;
                if !fits && run.line_width > 0.0 {
                    flush_line(fonts, page, run, style);
                }
                append_segment(run, piece, style, width);
            }
            if hard_break {
                flush_line(fonts, page, run, style);
            }
        }

        if options.continued {
            (run.origin_x + run.line_width, run.line_y)
        } else {
            flush_line(fonts, page, run, style);
            let cursor = (run.origin_x, run.line_y + options.paragraph_gap);
            self.run = None;
            cursor
        }
    }

    /// Force-close an open run (page boundary, finalization). The pending
    /// line is emitted with its own styles.
    pub fn end(&mut self, fonts: &mut FontTable, page: &mut PageBuffer) {
        if let Some(run) = self.run.as_mut() {
            if !run.segments.is_empty() {
                let style = run.segments[0].style.clone();
                flush_line(fonts, page, run, &style);
            }
        }
        self.run = None;
    }
}

fn append_segment(run: &mut Run, piece: &str, style: &SegmentStyle, width: f64) {
    run.line_width += width;
    if let Some(last) = run.segments.last_mut() {
        if last.style == *style {
            last.text.push_str(piece);
            last.width += width;
            return;
        }
    }
    run.segments.push(Segment {
        text: piece.to_string(),
        style: style.clone(),
        width,
    });
}

/// Split text at UAX#14 break opportunities. Mandatory breaks inside the
/// text (preformatted newlines) force a line flush; the implicit mandatory
/// break at end-of-text does not.
fn break_pieces(s: &str) -> Vec<(&str, bool)> {
    let mut out = Vec::new();
    let mut prev = 0;
    for (idx, opportunity) in linebreaks(s) {
        let hard = opportunity == BreakOpportunity::Mandatory && idx < s.len();
        out.push((&s[prev..idx], hard));
        prev = idx;
    }
    if prev < s.len() {
        out.push((&s[prev..], false));
    }
    out
}

/// Emit the buffered line as PDF operators and advance to the next line.
/// An empty line still advances by the fallback style's line height.
fn flush_line(fonts: &mut FontTable, page: &mut PageBuffer, run: &mut Run, fallback: &SegmentStyle) {
    let line_height = run
        .segments
        .iter()
        .map(|s| fonts.line_height(&s.style.font, s.style.size))
        .fold(0.0_f64, f64::max)
        .max(if run.segments.is_empty() {
            fonts.line_height(&fallback.font, fallback.size)
        } else {
            0.0
        });
    let max_ascent = run
        .segments
        .iter()
        .map(|s| fonts.ascent(&s.style.font, s.style.size))
        .fold(0.0_f64, f64::max);

    let line_x = match run.align {
        Align::Left | Align::Justify => run.origin_x,
        Align::Center => run.origin_x + (run.wrap_width - run.line_width) / 2.0,
        Align::Right => run.origin_x + run.wrap_width - run.line_width,
    };

    let baseline = run.line_y + max_ascent;
    let mut x = line_x;
    let segments = std::mem::take(&mut run.segments);
    for seg in &segments {
        emit_segment(fonts, page, seg, x, baseline);
        if seg.style.underline {
            let thickness = (seg.style.size * 0.06).max(0.5);
            page.fill_rect_op(x, baseline + seg.style.size * 0.08, seg.width, thickness, seg.style.color);
        }
        if seg.style.strike {
            let thickness = (seg.style.size * 0.06).max(0.5);
            page.fill_rect_op(x, baseline - seg.style.size * 0.28, seg.width, thickness, seg.style.color);
        }
        if let Some(ref url) = seg.style.link {
            page.link(x, run.line_y, seg.width, line_height, url.clone());
        }
        x += seg.width;
    }

    run.line_y += line_height + run.line_gap;
    run.line_width = 0.0;
}

fn emit_segment(fonts: &mut FontTable, page: &mut PageBuffer, seg: &Segment, x: f64, baseline: f64) {
    use std::fmt::Write;

    let font_index = fonts.index_of(&seg.style.font);
    let pdf_y = page.height - baseline;
    let c = seg.style.color;
    let _ = write!(
        page.ops,
        "BT\n/F{} {:.2} Tf\n{:.3} {:.3} {:.3} rg\n{:.2} {:.2} Td\n",
        font_index, seg.style.size, c.r, c.g, c.b, x, pdf_y
    );

    let embedded = matches!(
        fonts.book.get(&seg.style.font),
        Some(FontData::Embedded(_))
    );
    if embedded {
        // Identity-H encoding: hex glyph ids, recorded for the /W and
        // ToUnicode tables.
        let mut hex = String::new();
        for ch in seg.text.chars() {
            let (gid, units) = fonts.glyph_for(&seg.style.font, ch);
            let _ = write!(hex, "{:04X}", gid);
            fonts.record_use(&seg.style.font, gid, units, ch);
        }
        let _ = write!(page.ops, "<{}> Tj\n", hex);
    } else {
        let _ = write!(page.ops, "({}) Tj\n", encode_winansi(&seg.text));
    }
    let _ = write!(page.ops, "ET\n");
}

/// Encode text as a WinAnsi PDF string literal, escaping delimiters and
/// writing non-ASCII bytes as octal escapes. Unmappable characters become
/// `?`.
pub(crate) fn encode_winansi(text: &str) -> String {
    use std::fmt::Write;
    let mut out = String::new();
    for ch in text.chars() {
        let b = unicode_to_winansi(ch).unwrap_or(b'?');
        match b {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            0x20..=0x7E => out.push(b as char),
            _ => {
                let _ = write!(out, "\\{:03o}", b);
            }
        }
    }
    out
}

/// Map a Unicode codepoint to a WinAnsiEncoding byte. WinAnsi follows
/// Windows-1252: 0x20..=0x7E and 0xA0..=0xFF map directly, and the
/// 0x80..=0x9F range holds smart quotes, dashes, and friends.
pub(crate) fn unicode_to_winansi(ch: char) -> Option<u8> {
    let cp = ch as u32;
    if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }
    match cp {
        0x20AC => Some(0x80), // Euro sign
        0x201A => Some(0x82), // Single low-9 quotation mark
        0x0192 => Some(0x83), // Latin small letter f with hook
        0x201E => Some(0x84), // Double low-9 quotation mark
        0x2026 => Some(0x85), // Horizontal ellipsis
        0x2020 => Some(0x86), // Dagger
        0x2021 => Some(0x87), // Double dagger
        0x02C6 => Some(0x88), // Modifier letter circumflex accent
        0x2030 => Some(0x89), // Per mille sign
        0x0160 => Some(0x8A), // Latin capital letter S with caron
        0x2039 => Some(0x8B), // Single left-pointing angle quotation
        0x0152 => Some(0x8C), // Latin capital ligature OE
        0x017D => Some(0x8E), // Latin capital letter Z with caron
        0x2018 => Some(0x91), // Left single quotation mark
        0x2019 => Some(0x92), // Right single quotation mark
        0x201C => Some(0x93), // Left double quotation mark
        0x201D => Some(0x94), // Right double quotation mark
        0x2022 => Some(0x95), // Bullet
        0x2013 => Some(0x96), // En dash
        0x2014 => Some(0x97), // Em dash
        0x02DC => Some(0x98), // Small tilde
        0x2122 => Some(0x99), // Trade mark sign
        0x0161 => Some(0x9A), // Latin small letter s with caron
        0x203A => Some(0x9B), // Single right-pointing angle quotation
        0x0153 => Some(0x9C), // Latin small ligature oe
        0x017E => Some(0x9E), // Latin small letter z with caron
        0x0178 => Some(0x9F), // Latin capital letter Y with diaeresis
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_break_pieces_soft() {
        let pieces = break_pieces("hello wide world");
        let texts: Vec<&str> = pieces.iter().map(|(t, _)| *t).collect();
        assert_eq!(texts, vec!["hello ", "wide ", "world"]);
        assert!(pieces.iter().all(|(_, hard)| !hard));
    }

    #[test]
    fn test_break_pieces_mandatory_inside() {
        let pieces = break_pieces("one\ntwo");
        assert_eq!(pieces[0].0, "one\n");
        assert!(pieces[0].1, "newline inside text is a hard break");
        assert_eq!(pieces[1].0, "two");
        assert!(!pieces[1].1, "end of text is not a hard break");
    }

    #[test]
    fn test_encode_winansi_escapes() {
        assert_eq!(encode_winansi("a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(encode_winansi("café"), "caf\\351");
        assert_eq!(encode_winansi("\u{2014}"), "\\227"); // em dash
        assert_eq!(encode_winansi("\u{4E2D}"), "?"); // unmappable
    }

    #[test]
    fn test_winansi_special_range() {
        assert_eq!(unicode_to_winansi('\u{20AC}'), Some(0x80));
        assert_eq!(unicode_to_winansi('\u{2019}'), Some(0x92));
        assert_eq!(unicode_to_winansi('A'), Some(b'A'));
        assert_eq!(unicode_to_winansi('\u{0100}'), None);
    }
}
