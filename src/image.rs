//! # Image Loading
//!
//! Turns an image source (a file path or a data URI) into pixel data the
//! PDF writer can embed. JPEGs pass through untouched (DCTDecode is native
//! to PDF); PNGs decode to RGB with a separate alpha channel for SMask
//! transparency.

use crate::error::RenderError;
use std::io::Cursor;

/// A decoded image ready for embedding.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub pixels: PixelData,
    pub width_px: u32,
    pub height_px: u32,
}

#[derive(Debug, Clone)]
pub enum PixelData {
    /// Raw JPEG bytes, embedded directly with DCTDecode.
    Jpeg { data: Vec<u8>, grayscale: bool },
    /// Decoded RGB pixels plus an optional alpha channel.
    Rgb {
        rgb: Vec<u8>,
        alpha: Option<Vec<u8>>,
    },
}

/// Load an image from an already-resolved source: a `data:image/...` URI
/// or a file path.
pub fn load(src: &str) -> Result<ImageAsset, RenderError> {
    let bytes = if src.starts_with("data:image/") {
        let comma = src
            .find(',')
            .ok_or_else(|| RenderError::Image(format!("malformed data URI '{}'", truncate(src))))?;
        decode_base64(&src[comma + 1..])?
    } else {
        std::fs::read(src)
            .map_err(|e| RenderError::Image(format!("failed to read '{}': {}", src, e)))?
    };
    decode(&bytes)
}

fn decode_base64(input: &str) -> Result<Vec<u8>, RenderError> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input)
        .map_err(|e| RenderError::Image(format!("base64 decode failed: {}", e)))
}

fn truncate(s: &str) -> String {
    s.chars().take(48).collect()
}

/// Detect the format from magic bytes and decode accordingly.
pub fn decode(data: &[u8]) -> Result<ImageAsset, RenderError> {
    if data.len() < 4 {
        return Err(RenderError::Image("image data too short".to_string()));
    }
    if data[0] == 0xFF && data[1] == 0xD8 {
        decode_jpeg(data)
    } else if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        decode_png(data)
    } else {
        Err(RenderError::Image(
            "unsupported image format (expected JPEG or PNG)".to_string(),
        ))
    }
}

/// JPEG: read dimensions and component count without decoding pixels.
fn decode_jpeg(data: &[u8]) -> Result<ImageAsset, RenderError> {
    let reader = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| RenderError::Image(format!("jpeg probe failed: {}", e)))?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| RenderError::Image(format!("jpeg dimensions unreadable: {}", e)))?;

    Ok(ImageAsset {
        pixels: PixelData::Jpeg {
            data: data.to_vec(),
            grayscale: jpeg_is_grayscale(data),
        },
        width_px: width,
        height_px: height,
    })
}

/// Scan JPEG markers for the SOF segment and read the component count.
fn jpeg_is_grayscale(data: &[u8]) -> bool {
    let mut i = 2; // past SOI
    while i + 1 < data.len() {
        if data[i] != 0xFF {
            break;
        }
        let marker = data[i + 1];
        let is_sof = matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF);
        if is_sof {
            if i + 9 < data.len() {
                return data[i + 9] == 1;
            }
            break;
        }
        if i + 3 < data.len() {
            let seg_len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
            i += 2 + seg_len;
        } else {
            break;
        }
    }
    false
}

/// PNG: decode to RGBA and split into RGB plus alpha.
fn decode_png(data: &[u8]) -> Result<ImageAsset, RenderError> {
    let reader = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| RenderError::Image(format!("png probe failed: {}", e)))?;
    let img = reader
        .decode()
        .map_err(|e| RenderError::Image(format!("png decode failed: {}", e)))?;

    let rgba = img.to_rgba8();
    let (width, height) = (rgba.width(), rgba.height());

    let pixel_count = (width * height) as usize;
    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    let mut translucent = false;
    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel[3]);
        if pixel[3] != 255 {
            translucent = true;
        }
    }

    Ok(ImageAsset {
        pixels: PixelData::Rgb {
            rgb,
            alpha: if translucent { Some(alpha) } else { None },
        },
        width_px: width,
        height_px: height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(pixel: [u8; 4]) -> Vec<u8> {
        let mut img = image::RgbaImage::new(1, 1);
        img.put_pixel(0, 0, image::Rgba(pixel));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), 1, 1, image::ColorType::Rgba8)
            .unwrap();
        buf
    }

    #[test]
    fn test_too_short_data() {
        assert!(decode(&[0x00, 0x01]).is_err());
    }

    #[test]
    fn test_unsupported_format() {
        assert!(decode(&[0x00, 0x01, 0x02, 0x03, 0x04]).is_err());
    }

    #[test]
    fn test_opaque_png_has_no_alpha() {
        let asset = decode(&png_bytes([255, 0, 0, 255])).unwrap();
        assert_eq!(asset.width_px, 1);
        match asset.pixels {
            PixelData::Rgb { ref rgb, ref alpha } => {
                assert_eq!(rgb, &[255, 0, 0]);
                assert!(alpha.is_none());
            }
            _ => panic!("png should decode to rgb"),
        }
    }

    #[test]
    fn test_translucent_png_keeps_alpha() {
        let asset = decode(&png_bytes([0, 255, 0, 128])).unwrap();
        match asset.pixels {
            PixelData::Rgb { ref alpha, .. } => {
                assert_eq!(alpha.as_deref(), Some(&[128][..]));
            }
            _ => panic!("png should decode to rgb"),
        }
    }

    #[test]
    fn test_jpeg_passes_through() {
        let img = image::RgbImage::from_fn(2, 2, |_, _| image::Rgb([0, 128, 255]));
        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), 2, 2, image::ColorType::Rgb8)
            .unwrap();

        let asset = decode(&buf).unwrap();
        assert_eq!((asset.width_px, asset.height_px), (2, 2));
        match asset.pixels {
            PixelData::Jpeg { ref data, grayscale } => {
                assert!(data.starts_with(&[0xFF, 0xD8]));
                assert!(!grayscale);
            }
            _ => panic!("jpeg should stay jpeg"),
        }
    }

    #[test]
    fn test_data_uri_load() {
        use base64::Engine;
        let png = png_bytes([1, 2, 3, 255]);
        let uri = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&png)
        );
        let asset = load(&uri).unwrap();
        assert_eq!(asset.width_px, 1);
    }

    #[test]
    fn test_malformed_data_uri() {
        assert!(load("data:image/png;base64").is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(load("/nonexistent/picture.png").is_err());
    }
}
