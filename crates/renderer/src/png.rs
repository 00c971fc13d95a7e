//! PNG encoding for RGBA image data (color type 6).
//!
//! Chunks are written by hand so `tEXt` metadata such as the view title can
//! ride along with the pixels.

use geoimage_common::{GeoImageError, GeoImageResult};
use std::io::Write;

const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Create a PNG image from RGBA pixel data.
pub fn create_png(pixels: &[u8], width: usize, height: usize) -> GeoImageResult<Vec<u8>> {
    create_png_with_text(pixels, width, height, &[])
}

/// Create a PNG image with `tEXt` `(keyword, text)` chunks before the pixels.
///
/// Keywords must be 1 to 79 Latin-1 characters; text must not contain NUL.
pub fn create_png_with_text(
    pixels: &[u8],
    width: usize,
    height: usize,
    text: &[(&str, &str)],
) -> GeoImageResult<Vec<u8>> {
    if width == 0 || height == 0 || pixels.len() != width * height * 4 {
        return Err(GeoImageError::Render(format!(
            "{} bytes do not form a {}x{} RGBA image",
            pixels.len(),
            width,
            height
        )));
    }

    let mut png = Vec::new();
    png.extend_from_slice(&PNG_SIGNATURE);

    // IHDR chunk
    let mut ihdr_data = Vec::with_capacity(13);
    ihdr_data.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr_data.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr_data.push(8); // bit depth
    ihdr_data.push(6); // color type (RGBA)
    ihdr_data.push(0); // compression method
    ihdr_data.push(0); // filter method
    ihdr_data.push(0); // interlace method
    write_chunk(&mut png, b"IHDR", &ihdr_data);

    for (keyword, value) in text {
        write_chunk(&mut png, b"tEXt", &text_chunk(keyword, value)?);
    }

    let idat_data = deflate_idat_rgba(pixels, width, height)
        .map_err(|e| GeoImageError::Render(format!("IDAT compression failed: {}", e)))?;
    write_chunk(&mut png, b"IDAT", &idat_data);

    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

fn text_chunk(keyword: &str, value: &str) -> GeoImageResult<Vec<u8>> {
    let valid_keyword = !keyword.is_empty()
        && keyword.len() < 80
        && keyword.bytes().all(|b| (32..=126).contains(&b));
    if !valid_keyword || value.contains('\0') {
        return Err(GeoImageError::Render(format!(
            "invalid PNG text entry '{}'",
            keyword
        )));
    }
    let mut data = Vec::with_capacity(keyword.len() + 1 + value.len());
    data.extend_from_slice(keyword.as_bytes());
    data.push(0);
    // tEXt is Latin-1; anything else is replaced
    data.extend(value.chars().map(|c| if (c as u32) < 256 { c as u8 } else { b'?' }));
    Ok(data)
}

/// Write a PNG chunk
fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let crc_data = [chunk_type.as_slice(), data].concat();
    png.extend_from_slice(&crc32fast::hash(&crc_data).to_be_bytes());
}

/// Deflate RGBA image data for IDAT chunk.
fn deflate_idat_rgba(pixels: &[u8], width: usize, height: usize) -> std::io::Result<Vec<u8>> {
    // filter byte 0 (none) before each scanline
    let mut uncompressed = Vec::with_capacity(height * (1 + width * 4));
    for row in pixels.chunks_exact(width * 4).take(height) {
        uncompressed.push(0);
        uncompressed.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&uncompressed)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_png_rgba() {
        let pixels = [
            255, 0, 0, 255, 0, 255, 0, 255, //
            0, 0, 255, 255, 255, 255, 255, 0,
        ];
        let png = create_png(&pixels, 2, 2).unwrap();
        assert_eq!(&png[0..8], &PNG_SIGNATURE);
        assert_eq!(&png[12..16], b"IHDR");

        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (2, 2));
        assert_eq!(decoded.get_pixel(1, 1).0, [255, 255, 255, 0]);
    }

    #[test]
    fn test_text_chunk_written() {
        let png = create_png_with_text(&[0, 0, 0, 255], 1, 1, &[("Title", "Static GeoImage View")])
            .unwrap();
        let needle = b"tEXtTitle\0Static GeoImage View";
        assert!(png.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn test_size_mismatch() {
        assert!(create_png(&[0, 0, 0], 1, 1).is_err());
    }

    #[test]
    fn test_invalid_keyword() {
        assert!(create_png_with_text(&[0; 4], 1, 1, &[("", "x")]).is_err());
    }
}
