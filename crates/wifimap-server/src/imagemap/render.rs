//! Decode, square-resize and re-encode map images.

use std::io::Cursor;

use image::{imageops::FilterType, DynamicImage, ImageFormat, Rgba, RgbaImage};

use super::ProxyError;

/// Largest edge served. LINE asks for 1040 at most.
pub const MAX_SIZE_PX: u32 = 2048;

/// Parse the `{size}` path segment.
///
/// # Errors
///
/// Returns [`ProxyError::InvalidSize`] unless `raw` is an integer in
/// `1..=MAX_SIZE_PX`.
pub fn parse_size(raw: &str) -> Result<u32, ProxyError> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|size| (1..=MAX_SIZE_PX).contains(size))
        .ok_or_else(|| ProxyError::InvalidSize(raw.to_string()))
}

/// Decode any supported format. A PNG whose data stream ends early is
/// decoded up to the last complete row; the remaining rows stay transparent.
///
/// Only PNG is salvaged. A truncated JPEG or GIF, or an interlaced PNG, is a
/// decode error. The static map URL leaves `format` unset, so the upstream
/// answers with PNG.
///
/// # Errors
///
/// Returns [`ProxyError::Decode`] when not even a partial PNG can be read.
pub fn decode_lenient(bytes: &[u8]) -> Result<DynamicImage, ProxyError> {
    match image::load_from_memory(bytes) {
        Ok(img) => Ok(img),
        Err(err) => salvage_png(bytes).ok_or_else(|| ProxyError::Decode(err.to_string())),
    }
}

fn salvage_png(bytes: &[u8]) -> Option<DynamicImage> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::normalize_to_color8());
    let mut reader = decoder.read_info().ok()?;

    let (width, height, interlaced) = {
        let info = reader.info();
        (info.width, info.height, info.interlaced)
    };
    // Rows of an interlaced image arrive per pass, so a prefix is not a picture.
    if interlaced {
        return None;
    }
    let (color, _) = reader.output_color_type();

    let mut canvas = RgbaImage::new(width, height);
    let mut rows = 0u32;
    while rows < height {
        let Ok(Some(row)) = reader.next_row() else {
            break;
        };
        for (x, pixel) in (0..width).zip(row_pixels(color, row.data())) {
            canvas.put_pixel(x, rows, pixel);
        }
        rows += 1;
    }

    if rows == 0 {
        return None;
    }
    if rows < height {
        tracing::warn!(rows, height, "decoded truncated PNG, missing rows left transparent");
    }
    Some(DynamicImage::ImageRgba8(canvas))
}

fn row_pixels(color: png::ColorType, data: &[u8]) -> Vec<Rgba<u8>> {
    match color {
        png::ColorType::Grayscale => data.iter().map(|&g| Rgba([g, g, g, 255])).collect(),
        png::ColorType::GrayscaleAlpha => data
            .chunks_exact(2)
            .map(|p| Rgba([p[0], p[0], p[0], p[1]]))
            .collect(),
        png::ColorType::Rgb => data
            .chunks_exact(3)
            .map(|p| Rgba([p[0], p[1], p[2], 255]))
            .collect(),
        png::ColorType::Rgba => data
            .chunks_exact(4)
            .map(|p| Rgba([p[0], p[1], p[2], p[3]]))
            .collect(),
        // Palette output is expanded by the transformations above.
        png::ColorType::Indexed => Vec::new(),
    }
}

#[must_use]
pub fn resize_square(img: &DynamicImage, size: u32) -> DynamicImage {
    img.resize_exact(size, size, FilterType::CatmullRom)
}

/// # Errors
///
/// Returns [`ProxyError::Encode`] if PNG encoding fails.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, ProxyError> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| ProxyError::Encode(e.to_string()))?;
    Ok(buf.into_inner())
}

/// Decode, resize to `size`×`size`, encode as PNG.
///
/// # Errors
///
/// [`ProxyError::Decode`] or [`ProxyError::Encode`].
pub fn render_square_png(bytes: &[u8], size: u32) -> Result<Vec<u8>, ProxyError> {
    let img = decode_lenient(bytes)?;
    encode_png(&resize_square(&img, size))
}
