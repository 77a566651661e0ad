//! # PDF Surface
//!
//! A from-scratch PDF 1.7 implementation of the drawing surface. We write
//! the raw bytes ourselves: the subset of the spec a document renderer
//! needs is manageable, and it keeps the engine self-contained.
//!
//! ## Structure
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- objects (catalog, pages, fonts, streams, ...)
//! ...
//! xref                <- byte offsets of each object
//! trailer             <- points at the catalog and info dict
//! %%EOF
//! ```
//!
//! Builtin Type1 faces are referenced with WinAnsiEncoding; loaded TTFs are
//! embedded as CIDFontType2 with Identity-H encoding (FontFile2, descriptor,
//! CID font, ToUnicode CMap, and the Type0 root; five objects per font).

pub mod flow;

use crate::error::RenderError;
use crate::font::{FontBook, FontData};
use crate::image::{self, ImageAsset, PixelData};
use crate::style::Color;
use crate::surface::{ImageOptions, PageInfo, PageSetup, Surface, TextOptions};
use flow::{Flow, SegmentStyle};
use log::{debug, warn};
use miniz_oxide::deflate::compress_to_vec_zlib;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as FmtWrite;
use std::io::Write as IoWrite;

/// Fonts used by the document: the registry itself, the /F index order,
/// and per-embedded-font glyph usage for the /W and ToUnicode tables.
pub(crate) struct FontTable {
    pub book: FontBook,
    used: Vec<String>,
    used_glyphs: HashMap<String, BTreeMap<u16, (u16, char)>>,
}

impl FontTable {
    fn new() -> Self {
        FontTable {
            book: FontBook::new(),
            used: Vec::new(),
            used_glyphs: HashMap::new(),
        }
    }

    /// Resource index of a font name, assigning the next /F slot on first
    /// use.
    pub fn index_of(&mut self, name: &str) -> usize {
        if let Some(i) = self.used.iter().position(|n| n == name) {
            return i;
        }
        self.used.push(name.to_string());
        self.used.len() - 1
    }

    pub fn glyph_for(&self, name: &str, ch: char) -> (u16, u16) {
        match self.book.get(name) {
            Some(FontData::Embedded(f)) => (f.glyph_id(ch), f.advance_units(ch)),
            _ => (0, 0),
        }
    }

    pub fn record_use(&mut self, name: &str, gid: u16, units: u16, ch: char) {
        self.used_glyphs
            .entry(name.to_string())
            .or_default()
            .insert(gid, (units, ch));
    }

    pub fn ascent(&self, name: &str, size: f64) -> f64 {
        match self.book.get(name) {
            Some(data) => data.ascent(size),
            None => size * 0.718,
        }
    }

    pub fn line_height(&self, name: &str, size: f64) -> f64 {
        match self.book.get(name) {
            Some(data) => data.line_height(size),
            None => size * 1.15,
        }
    }
}

struct LinkAnnot {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    url: String,
}

/// One page under construction: accumulated content-stream operators plus
/// the link rectangles and images referenced from them. Coordinates arrive
/// top-left based and flip to PDF space at emission.
pub(crate) struct PageBuffer {
    pub width: f64,
    pub height: f64,
    pub ops: String,
    links: Vec<LinkAnnot>,
    images: Vec<usize>,
}

impl PageBuffer {
    pub fn fill_rect_op(&mut self, x: f64, y: f64, w: f64, h: f64, color: Color) {
        if color.a <= 0.0 {
            return;
        }
        let _ = write!(
            self.ops,
            "q\n{:.3} {:.3} {:.3} rg\n{:.2} {:.2} {:.2} {:.2} re\nf\nQ\n",
            color.r,
            color.g,
            color.b,
            x,
            self.height - y - h,
            w,
            h
        );
    }

    pub fn stroke_rect_op(
        &mut self,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        line_width: Option<f64>,
        color: Option<Color>,
    ) {
        self.ops.push_str("q\n");
        if let Some(c) = color {
            let _ = write!(self.ops, "{:.3} {:.3} {:.3} RG\n", c.r, c.g, c.b);
        }
        if let Some(lw) = line_width {
            let _ = write!(self.ops, "{:.2} w\n", lw);
        }
        let _ = write!(
            self.ops,
            "{:.2} {:.2} {:.2} {:.2} re\nS\nQ\n",
            x,
            self.height - y - h,
            w,
            h
        );
    }

    pub fn link(&mut self, x: f64, y: f64, width: f64, height: f64, url: String) {
        self.links.push(LinkAnnot {
            x,
            y,
            width,
            height,
            url,
        });
    }
}

/// The PDF drawing surface. One instance renders one document.
pub struct PdfSurface {
    fonts: FontTable,
    pages: Vec<PageBuffer>,
    images: Vec<ImageAsset>,
    image_cache: HashMap<String, usize>,
    metadata: Vec<(String, String)>,
    flow: Flow,
    cursor: (f64, f64),
    fill_color: Color,
    font: String,
    font_size: f64,
    finished: bool,
}

impl Default for PdfSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfSurface {
    pub fn new() -> Self {
        PdfSurface {
            fonts: FontTable::new(),
            pages: Vec::new(),
            images: Vec::new(),
            image_cache: HashMap::new(),
            metadata: Vec::new(),
            flow: Flow::default(),
            cursor: (0.0, 0.0),
            fill_color: Color::BLACK,
            font: "Helvetica".to_string(),
            font_size: 12.0,
            finished: false,
        }
    }

    fn segment_style(&self, options: &TextOptions) -> SegmentStyle {
        SegmentStyle {
            font: self.font.clone(),
            size: self.font_size,
            color: self.fill_color,
            underline: options.underline,
            strike: options.strike,
            link: options.link.clone(),
        }
    }

    fn current_page(&mut self) -> Result<&mut PageBuffer, RenderError> {
        self.pages
            .last_mut()
            .ok_or_else(|| RenderError::Backend("draw call before first page".to_string()))
    }
}

impl Surface for PdfSurface {
    fn add_page(&mut self, setup: &PageSetup) -> PageInfo {
        if let Some(page) = self.pages.last_mut() {
            self.flow.end(&mut self.fonts, page);
        }
        let (width, height) = setup.size.dimensions();
        let margins = setup.margins;
        debug!("page {} ({}x{})", self.pages.len() + 1, width, height);
        self.pages.push(PageBuffer {
            width,
            height,
            ops: String::new(),
            links: Vec::new(),
            images: Vec::new(),
        });
        self.cursor = (margins.left, margins.top);
        PageInfo {
            width,
            height,
            margins,
        }
    }

    fn cursor(&self) -> (f64, f64) {
        self.cursor
    }

    fn set_cursor(&mut self, x: f64, y: f64) {
        self.cursor = (x, y);
    }

    fn set_fill_color(&mut self, color: Color) {
        self.fill_color = color;
    }

    fn set_font(&mut self, font: &str) -> Result<(), RenderError> {
        self.fonts.book.resolve(font)?;
        self.font = font.to_string();
        Ok(())
    }

    fn set_font_size(&mut self, size: f64) {
        self.font_size = size;
    }

    fn text(
        &mut self,
        content: &str,
        x: f64,
        y: f64,
        options: &TextOptions,
    ) -> Result<(), RenderError> {
        let style = self.segment_style(options);
        let page = self
            .pages
            .last_mut()
            .ok_or_else(|| RenderError::Backend("text before first page".to_string()))?;
        self.cursor = self
            .flow
            .write(&mut self.fonts, page, content, x, y, &style, options);
        Ok(())
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color) {
        match self.current_page() {
            Ok(page) => page.fill_rect_op(x, y, width, height, color),
            Err(_) => warn!("fill_rect before first page, ignored"),
        }
    }

    fn stroke_rect(
        &mut self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        line_width: Option<f64>,
        color: Option<Color>,
    ) {
        match self.current_page() {
            Ok(page) => page.stroke_rect_op(x, y, width, height, line_width, color),
            Err(_) => warn!("stroke_rect before first page, ignored"),
        }
    }

    fn draw_image(
        &mut self,
        src: &str,
        x: f64,
        y: f64,
        options: &ImageOptions,
    ) -> Result<(), RenderError> {
        let index = match self.image_cache.get(src) {
            Some(&i) => i,
            None => {
                let asset = image::load(src)?;
                self.images.push(asset);
                let i = self.images.len() - 1;
                self.image_cache.insert(src.to_string(), i);
                i
            }
        };
        let asset = &self.images[index];
        let (drawn_w, drawn_h) =
            scaled_size(asset.width_px as f64, asset.height_px as f64, options);

        let page = self.current_page()?;
        let _ = write!(
            page.ops,
            "q\n{:.4} 0 0 {:.4} {:.2} {:.2} cm\n/Im{} Do\nQ\n",
            drawn_w,
            drawn_h,
            x,
            page.height - y - drawn_h,
            index
        );
        if !page.images.contains(&index) {
            page.images.push(index);
        }
        Ok(())
    }

    fn set_metadata(&mut self, key: &str, value: &str) {
        self.metadata.retain(|(k, _)| k != key);
        self.metadata.push((key.to_string(), value.to_string()));
    }

    fn finish(&mut self) -> Result<Vec<u8>, RenderError> {
        if self.finished {
            return Err(RenderError::Backend(
                "document already finalized".to_string(),
            ));
        }
        self.finished = true;
        if let Some(page) = self.pages.last_mut() {
            self.flow.end(&mut self.fonts, page);
        }
        Ok(self.serialize())
    }
}

/// PDFKit-style image sizing: explicit width/height scale exactly, a single
/// dimension keeps the aspect ratio, `scale` multiplies the natural size,
/// and `fit` contains the image in a box.
fn scaled_size(natural_w: f64, natural_h: f64, options: &ImageOptions) -> (f64, f64) {
    if let Some((fw, fh)) = options.fit {
        let s = (fw / natural_w).min(fh / natural_h);
        return (natural_w * s, natural_h * s);
    }
    match (options.width, options.height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => (w, natural_h * w / natural_w),
        (None, Some(h)) => (natural_w * h / natural_h, h),
        (None, None) => {
            let s = options.scale.unwrap_or(1.0);
            (natural_w * s, natural_h * s)
        }
    }
}

// ── Serialization ───────────────────────────────────────────────

impl PdfSurface {
    fn serialize(&mut self) -> Vec<u8> {
        // Object 0 is the free-list placeholder; 1 is the catalog, 2 the
        // page tree root. Everything else is appended as it is built.
        let mut objects: Vec<Vec<u8>> = vec![Vec::new(), Vec::new(), Vec::new()];

        let font_ids = self.write_font_objects(&mut objects);
        let image_ids = self.write_image_objects(&mut objects);

        let font_resources: String = font_ids
            .iter()
            .enumerate()
            .map(|(i, id)| format!("/F{} {} 0 R", i, id))
            .collect::<Vec<_>>()
            .join(" ");

        let mut page_ids = Vec::new();
        for page in &self.pages {
            let compressed = compress_to_vec_zlib(page.ops.as_bytes(), 6);
            let mut content = Vec::new();
            let _ = write!(
                content,
                "<< /Length {} /Filter /FlateDecode >>\nstream\n",
                compressed.len()
            );
            content.extend_from_slice(&compressed);
            content.extend_from_slice(b"\nendstream");
            let content_id = push_object(&mut objects, content);

            let mut annot_ids = Vec::new();
            for link in &page.links {
                let annot = format!(
                    "<< /Type /Annot /Subtype /Link /Border [0 0 0] \
                     /Rect [{:.2} {:.2} {:.2} {:.2}] \
                     /A << /Type /Action /S /URI /URI ({}) >> >>",
                    link.x,
                    page.height - link.y - link.height,
                    link.x + link.width,
                    page.height - link.y,
                    escape_pdf_string(&link.url)
                );
                annot_ids.push(push_object(&mut objects, annot.into_bytes()));
            }

            let mut resources = format!("/Font << {} >>", font_resources);
            if !page.images.is_empty() {
                let xobjects: String = page
                    .images
                    .iter()
                    .map(|&i| format!("/Im{} {} 0 R", i, image_ids[i]))
                    .collect::<Vec<_>>()
                    .join(" ");
                let _ = write!(resources, " /XObject << {} >>", xobjects);
            }

            let mut dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << {} >>",
                page.width, page.height, content_id, resources
            );
            if !annot_ids.is_empty() {
                let refs: String = annot_ids
                    .iter()
                    .map(|id| format!("{} 0 R", id))
                    .collect::<Vec<_>>()
                    .join(" ");
                let _ = write!(dict, " /Annots [{}]", refs);
            }
            dict.push_str(" >>");
            page_ids.push(push_object(&mut objects, dict.into_bytes()));
        }

        objects[1] = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();
        let kids: String = page_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        objects[2] = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_ids.len()
        )
        .into_bytes();

        let info_id = if self.metadata.is_empty() {
            None
        } else {
            let mut info = String::from("<< ");
            for (key, value) in &self.metadata {
                let _ = write!(info, "/{} ({}) ", key, escape_pdf_string(value));
            }
            info.push_str("/Producer (folio) >>");
            Some(push_object(&mut objects, info.into_bytes()))
        };

        serialize_objects(&objects, info_id)
    }

    /// One object per builtin face, five per embedded TTF. Returns the
    /// root font object id for each /F index.
    fn write_font_objects(&mut self, objects: &mut Vec<Vec<u8>>) -> Vec<usize> {
        let mut ids = Vec::new();
        let used = self.fonts.used.clone();
        for name in &used {
            let id = match self.fonts.book.get(name) {
                Some(FontData::Embedded(font)) => {
                    let font = font.clone();
                    let empty = BTreeMap::new();
                    let usage = self.fonts.used_glyphs.get(name).unwrap_or(&empty);
                    write_embedded_font(objects, &font, usage)
                }
                Some(FontData::Builtin(builtin)) => {
                    let dict = format!(
                        "<< /Type /Font /Subtype /Type1 /BaseFont /{} \
                         /Encoding /WinAnsiEncoding >>",
                        builtin.pdf_name()
                    );
                    push_object(objects, dict.into_bytes())
                }
                None => {
                    // Never resolved; reference Helvetica so the index
                    // stays dense.
                    let dict = "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica \
                                /Encoding /WinAnsiEncoding >>";
                    push_object(objects, dict.as_bytes().to_vec())
                }
            };
            ids.push(id);
        }
        ids
    }

    fn write_image_objects(&self, objects: &mut Vec<Vec<u8>>) -> Vec<usize> {
        let mut ids = Vec::new();
        for asset in &self.images {
            let id = match &asset.pixels {
                PixelData::Jpeg { data, grayscale } => {
                    let space = if *grayscale { "DeviceGray" } else { "DeviceRGB" };
                    let mut obj = Vec::new();
                    let _ = write!(
                        obj,
                        "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
                         /ColorSpace /{} /BitsPerComponent 8 /Filter /DCTDecode \
                         /Length {} >>\nstream\n",
                        asset.width_px,
                        asset.height_px,
                        space,
                        data.len()
                    );
                    obj.extend_from_slice(data);
                    obj.extend_from_slice(b"\nendstream");
                    push_object(objects, obj)
                }
                PixelData::Rgb { rgb, alpha } => {
                    let smask_id = alpha.as_ref().map(|alpha| {
                        let compressed = compress_to_vec_zlib(alpha, 6);
                        let mut obj = Vec::new();
                        let _ = write!(
                            obj,
                            "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
                             /ColorSpace /DeviceGray /BitsPerComponent 8 \
                             /Filter /FlateDecode /Length {} >>\nstream\n",
                            asset.width_px,
                            asset.height_px,
                            compressed.len()
                        );
                        obj.extend_from_slice(&compressed);
                        obj.extend_from_slice(b"\nendstream");
                        push_object(objects, obj)
                    });

                    let compressed = compress_to_vec_zlib(rgb, 6);
                    let mut obj = Vec::new();
                    let smask = smask_id
                        .map(|id| format!(" /SMask {} 0 R", id))
                        .unwrap_or_default();
                    let _ = write!(
                        obj,
                        "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
                         /ColorSpace /DeviceRGB /BitsPerComponent 8 \
                         /Filter /FlateDecode{} /Length {} >>\nstream\n",
                        asset.width_px,
                        asset.height_px,
                        smask,
                        compressed.len()
                    );
                    obj.extend_from_slice(&compressed);
                    obj.extend_from_slice(b"\nendstream");
                    push_object(objects, obj)
                }
            };
            ids.push(id);
        }
        ids
    }
}

fn push_object(objects: &mut Vec<Vec<u8>>, data: Vec<u8>) -> usize {
    objects.push(data);
    objects.len() - 1
}

/// Write the five objects of a CIDFontType2 embedding and return the Type0
/// root id.
fn write_embedded_font(
    objects: &mut Vec<Vec<u8>>,
    font: &crate::font::EmbeddedFont,
    usage: &BTreeMap<u16, (u16, char)>,
) -> usize {
    let scale = 1000.0 / font.units_per_em as f64;
    let to_units = |v: i16| (v as f64 * scale).round() as i32;

    let compressed = compress_to_vec_zlib(&font.data, 6);
    let mut file_obj = Vec::new();
    let _ = write!(
        file_obj,
        "<< /Length {} /Length1 {} /Filter /FlateDecode >>\nstream\n",
        compressed.len(),
        font.data.len()
    );
    file_obj.extend_from_slice(&compressed);
    file_obj.extend_from_slice(b"\nendstream");
    let file_id = push_object(objects, file_obj);

    let descriptor = format!(
        "<< /Type /FontDescriptor /FontName /{} /Flags 32 \
         /FontBBox [{} {} {} {}] /ItalicAngle 0 /Ascent {} /Descent {} \
         /CapHeight {} /StemV 80 /FontFile2 {} 0 R >>",
        font.base_name,
        to_units(font.bbox.0),
        to_units(font.bbox.1),
        to_units(font.bbox.2),
        to_units(font.bbox.3),
        to_units(font.ascender),
        to_units(font.descender),
        to_units(font.cap_height),
        file_id
    );
    let descriptor_id = push_object(objects, descriptor.into_bytes());

    let widths: String = usage
        .iter()
        .map(|(gid, (units, _))| format!("{} [{}]", gid, units))
        .collect::<Vec<_>>()
        .join(" ");
    let cid = format!(
        "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} \
         /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
         /FontDescriptor {} 0 R /DW 1000 /W [{}] /CIDToGIDMap /Identity >>",
        font.base_name, descriptor_id, widths
    );
    let cid_id = push_object(objects, cid.into_bytes());

    let tounicode = build_tounicode(usage);
    let compressed = compress_to_vec_zlib(tounicode.as_bytes(), 6);
    let mut cmap_obj = Vec::new();
    let _ = write!(
        cmap_obj,
        "<< /Length {} /Filter /FlateDecode >>\nstream\n",
        compressed.len()
    );
    cmap_obj.extend_from_slice(&compressed);
    cmap_obj.extend_from_slice(b"\nendstream");
    let cmap_id = push_object(objects, cmap_obj);

    let type0 = format!(
        "<< /Type /Font /Subtype /Type0 /BaseFont /{} /Encoding /Identity-H \
         /DescendantFonts [{} 0 R] /ToUnicode {} 0 R >>",
        font.base_name, cid_id, cmap_id
    );
    push_object(objects, type0.into_bytes())
}

/// Minimal ToUnicode CMap: one bfchar entry per used glyph, chunked at the
/// 100-entry limit.
fn build_tounicode(usage: &BTreeMap<u16, (u16, char)>) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );
    let entries: Vec<(u16, char)> = usage.iter().map(|(gid, (_, ch))| (*gid, *ch)).collect();
    for chunk in entries.chunks(100) {
        let _ = write!(cmap, "{} beginbfchar\n", chunk.len());
        for (gid, ch) in chunk {
            let mut buf = [0u16; 2];
            let mut utf16 = String::new();
            for unit in ch.encode_utf16(&mut buf) {
                let _ = write!(utf16, "{:04X}", unit);
            }
            let _ = write!(cmap, "<{:04X}> <{}>\n", gid, utf16);
        }
        cmap.push_str("endbfchar\n");
    }
    cmap.push_str(
        "endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n",
    );
    cmap
}

pub(crate) fn escape_pdf_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('(', "\\(").replace(')', "\\)")
}

/// Lay the objects out with their xref table and trailer.
fn serialize_objects(objects: &[Vec<u8>], info_id: Option<usize>) -> Vec<u8> {
    let mut output: Vec<u8> = Vec::new();
    let mut offsets = vec![0usize; objects.len()];

    output.extend_from_slice(b"%PDF-1.7\n");
    output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

    for (i, obj) in objects.iter().enumerate().skip(1) {
        offsets[i] = output.len();
        let _ = write!(output, "{} 0 obj\n", i);
        output.extend_from_slice(obj);
        output.extend_from_slice(b"\nendobj\n\n");
    }

    let xref_offset = output.len();
    let _ = write!(output, "xref\n0 {}\n", objects.len());
    let _ = write!(output, "0000000000 65535 f \n");
    for offset in offsets.iter().skip(1) {
        let _ = write!(output, "{:010} 00000 n \n", offset);
    }

    let _ = write!(output, "trailer\n<< /Size {} /Root 1 0 R", objects.len());
    if let Some(id) = info_id {
        let _ = write!(output, " /Info {} 0 R", id);
    }
    let _ = write!(output, " >>\nstartxref\n{}\n%%EOF\n", xref_offset);

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edges, PageSize};

    fn setup() -> PageSetup {
        PageSetup {
            size: PageSize::A4,
            margins: Edges::uniform(72.0),
        }
    }

    fn assert_valid_pdf(bytes: &[u8]) {
        assert!(bytes.starts_with(b"%PDF-1.7"), "missing header");
        assert!(bytes.windows(5).any(|w| w == b"%%EOF"), "missing EOF");
        assert!(bytes.windows(4).any(|w| w == b"xref"), "missing xref");
        assert!(bytes.windows(7).any(|w| w == b"trailer"), "missing trailer");
    }

    #[test]
    fn test_empty_page_is_valid() {
        let mut surface = PdfSurface::new();
        surface.add_page(&setup());
        let bytes = surface.finish().unwrap();
        assert_valid_pdf(&bytes);
    }

    #[test]
    fn test_page_info_echoes_setup() {
        let mut surface = PdfSurface::new();
        let info = surface.add_page(&setup());
        assert_eq!(info.margins, Edges::uniform(72.0));
        assert!((info.width - 595.28).abs() < 0.01);
        assert_eq!(surface.cursor(), (72.0, 72.0));
    }

    #[test]
    fn test_text_advances_cursor() {
        let mut surface = PdfSurface::new();
        surface.add_page(&setup());
        surface.set_font("Helvetica").unwrap();
        surface.set_font_size(12.0);
        let options = TextOptions {
            continued: true,
            wrap_width: 400.0,
            ..Default::default()
        };
        surface.text("Hello", 72.0, 72.0, &options).unwrap();
        let (x, y) = surface.cursor();
        assert!(x > 72.0, "continued write advances x");
        assert_eq!(y, 72.0, "y stays on the open line");

        let done = TextOptions {
            continued: false,
            wrap_width: 400.0,
            ..Default::default()
        };
        surface.text(" world", x, y, &done).unwrap();
        let (x2, y2) = surface.cursor();
        assert_eq!(x2, 72.0, "terminated run returns to origin x");
        assert!(y2 > 72.0, "terminated run drops below the line");
    }

    #[test]
    fn test_long_text_wraps() {
        let mut surface = PdfSurface::new();
        surface.add_page(&setup());
        surface.set_font("Courier").unwrap();
        surface.set_font_size(10.0);
        // 40 chars at 6pt each = 240pt, wrap width 100 -> several lines
        let content = "aaaa bbbb cccc dddd eeee ffff gggg hhhh";
        let options = TextOptions {
            continued: false,
            wrap_width: 100.0,
            ..Default::default()
        };
        surface.text(content, 72.0, 72.0, &options).unwrap();
        let (_, y) = surface.cursor();
        assert!(y > 72.0 + 2.0 * 10.0, "wrapped text spans multiple lines");
    }

    #[test]
    fn test_unknown_font_rejected() {
        let mut surface = PdfSurface::new();
        assert!(surface.set_font("NoSuchFace").is_err());
    }

    #[test]
    fn test_text_before_page_is_error() {
        let mut surface = PdfSurface::new();
        let err = surface
            .text("x", 0.0, 0.0, &TextOptions::default())
            .unwrap_err();
        assert!(matches!(err, RenderError::Backend(_)));
    }

    #[test]
    fn test_metadata_in_output() {
        let mut surface = PdfSurface::new();
        surface.add_page(&setup());
        surface.set_metadata("Title", "Annual (Report)");
        let bytes = surface.finish().unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Title (Annual \\(Report\\))"));
    }

    #[test]
    fn test_double_finish_rejected() {
        let mut surface = PdfSurface::new();
        surface.add_page(&setup());
        surface.finish().unwrap();
        assert!(surface.finish().is_err());
    }

    #[test]
    fn test_link_produces_annotation() {
        let mut surface = PdfSurface::new();
        surface.add_page(&setup());
        surface.set_font("Helvetica").unwrap();
        let options = TextOptions {
            continued: false,
            link: Some("https://example.com".to_string()),
            wrap_width: 400.0,
            ..Default::default()
        };
        surface.text("click", 72.0, 72.0, &options).unwrap();
        let bytes = surface.finish().unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Subtype /Link"));
        assert!(text.contains("https://example.com"));
    }

    #[test]
    fn test_scaled_size_rules() {
        let natural = (100.0, 50.0);
        let fit = ImageOptions {
            fit: Some((50.0, 50.0)),
            ..Default::default()
        };
        assert_eq!(scaled_size(natural.0, natural.1, &fit), (50.0, 25.0));

        let width_only = ImageOptions {
            width: Some(200.0),
            ..Default::default()
        };
        assert_eq!(scaled_size(natural.0, natural.1, &width_only), (200.0, 100.0));

        let scaled = ImageOptions {
            scale: Some(0.5),
            ..Default::default()
        };
        assert_eq!(scaled_size(natural.0, natural.1, &scaled), (50.0, 25.0));
    }
}
