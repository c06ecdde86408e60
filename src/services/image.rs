use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use std::io::Cursor;

/// Decode raw poster bytes, cap the longest side at `max_dimension`, and
/// re-encode as a quality-85 JPEG. Providers hand us anything from tiny
/// thumbnails to multi-megabyte PNGs, so everything is normalized before it
/// enters the cache.
pub fn normalize_poster(bytes: &[u8], max_dimension: u32) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes).context("Failed to decode poster image")?;

    let img = if img.width().max(img.height()) > max_dimension {
        img.resize(max_dimension, max_dimension, FilterType::Lanczos3)
    } else {
        img
    };

    encode_jpeg(&DynamicImage::ImageRgb8(img.to_rgb8()), 85)
}

/// Solid-color placeholder poster used in mock mode, 2:3 like a real one.
pub fn mock_poster() -> Result<Vec<u8>> {
    let img = RgbImage::from_pixel(400, 600, Rgb([40, 40, 80]));
    encode_jpeg(&DynamicImage::ImageRgb8(img), 90)
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    img.write_with_encoder(encoder)
        .context("Failed to encode poster as JPEG")?;
    Ok(buf.into_inner())
}
