//! Image decoding and OCR preprocessing
//!
//! Tesseract does best on large, high-contrast, low-noise input: convert to
//! grayscale, upscale tiny images, binarize with Otsu's threshold, then
//! median-filter away salt-and-pepper noise.

use std::borrow::Cow;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use imageproc::contrast::otsu_level;
use imageproc::filter::median_filter;
use tracing::debug;

use crate::config::OcrConfig;
use crate::error::{Result, SpamError};

/// Upscaling never takes the longer side past this
pub const MAX_UPSCALED_SIDE: u32 = 4000;

/// Decode a base64 image payload, with or without a `data:image/...;base64,` prefix
pub fn decode_image_payload(payload: &str) -> Result<Vec<u8>> {
    let payload = payload.trim();
    let encoded = match payload.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| SpamError::InvalidImage("malformed data URL".to_string()))?,
        None => payload,
    };

    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(SpamError::InvalidImage("image payload is empty".to_string()));
    }

    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| SpamError::InvalidImage(format!("invalid base64: {}", e)))
}

/// Accept either encoded image bytes or a base64 / data URL payload
pub fn image_bytes(input: &[u8]) -> Result<Cow<'_, [u8]>> {
    if image::guess_format(input).is_ok() {
        return Ok(Cow::Borrowed(input));
    }
    let text = std::str::from_utf8(input)
        .map_err(|_| SpamError::InvalidImage("unrecognized image format".to_string()))?;
    decode_image_payload(text).map(Cow::Owned)
}

/// Decode image bytes (PNG, JPEG, ...) into an RGB image
pub fn load_image(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(SpamError::InvalidImage("image data is empty".to_string()));
    }
    let image = image::load_from_memory(bytes)
        .map_err(|e| SpamError::InvalidImage(format!("cannot decode image: {}", e)))?;
    Ok(DynamicImage::ImageRgb8(image.to_rgb8()))
}

/// Grayscale, upscale, binarize and denoise an image for OCR
pub fn preprocess(image: &DynamicImage, config: &OcrConfig) -> GrayImage {
    let gray = upscale(image.to_luma8(), config.min_dimension, config.target_dimension);

    let level = otsu_level(&gray);
    let mut binary = gray;
    for pixel in binary.pixels_mut() {
        pixel.0[0] = if pixel.0[0] > level { 255 } else { 0 };
    }

    median_filter(&binary, 1, 1)
}

/// Scale up so the shorter side reaches `target` when it is below `min`,
/// keeping the longer side within [`MAX_UPSCALED_SIDE`]
fn upscale(gray: GrayImage, min: u32, target: u32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let shorter = width.min(height);
    let longer = width.max(height);
    if shorter == 0 || shorter >= min {
        return gray;
    }

    let scale = (target as f64 / shorter as f64).min(MAX_UPSCALED_SIDE as f64 / longer as f64);
    if scale <= 1.0 {
        debug!(width, height, "Image too elongated to upscale");
        return gray;
    }

    let new_width = ((width as f64 * scale).round() as u32).clamp(1, MAX_UPSCALED_SIDE);
    let new_height = ((height as f64 * scale).round() as u32).clamp(1, MAX_UPSCALED_SIDE);
    debug!(width, height, new_width, new_height, "Upscaling image for OCR");

    image::imageops::resize(&gray, new_width, new_height, FilterType::CatmullRom)
}
