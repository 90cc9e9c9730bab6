//! Image resizing for preview tiers.
//!
//! All functions return new `DecodedImage` instances without modifying the input.

use super::{DecodeError, DecodedImage, FilterType};

/// Resize an image to exact dimensions.
///
/// # Errors
///
/// Returns `DecodeError::CorruptedFile` if the target size is zero or the
/// source buffer does not match its dimensions.
pub fn resize(
    image: &DecodedImage,
    width: u32,
    height: u32,
    filter: FilterType,
) -> Result<DecodedImage, DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::CorruptedFile(format!(
            "Invalid resize target {width}x{height}"
        )));
    }

    if image.width == width && image.height == height {
        return Ok(image.clone());
    }

    let rgb_image = image
        .to_rgb_image()
        .ok_or_else(|| DecodeError::CorruptedFile("Failed to create RgbImage".to_string()))?;

    let resized = image::imageops::resize(&rgb_image, width, height, filter.to_image_filter());

    Ok(DecodedImage::from_rgb_image(resized))
}

/// Downscale an image to fit inside a `max_width x max_height` box.
///
/// Aspect ratio is preserved and images are never upscaled. A zero bound
/// leaves that axis unconstrained; `(0, 0)` returns the image unchanged.
pub fn fit_within(
    image: DecodedImage,
    max_width: u32,
    max_height: u32,
    filter: FilterType,
) -> Result<DecodedImage, DecodeError> {
    let (width, height) = fit_dimensions(image.width, image.height, max_width, max_height);
    if (width, height) == (image.width, image.height) {
        return Ok(image);
    }
    resize(&image, width, height, filter)
}

/// Dimensions of `width x height` scaled down to fit the bounds.
pub fn fit_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }

    let scale_w = if max_width == 0 { 1.0 } else { max_width as f64 / width as f64 };
    let scale_h = if max_height == 0 { 1.0 } else { max_height as f64 / height as f64 };
    let scale = scale_w.min(scale_h);
    if scale >= 1.0 {
        return (width, height);
    }

    let cap = |size: u32, max: u32| if max == 0 { size } else { max.min(size) };
    (
        ((width as f64 * scale).round() as u32).clamp(1, cap(width, max_width)),
        ((height as f64 * scale).round() as u32).clamp(1, cap(height, max_height)),
    )
}
