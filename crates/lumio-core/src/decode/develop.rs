//! Developing an opened file into an RGB preview.
//!
//! RAW files go through an `imagepipe` pipeline built from the sensor data
//! decoded at open time: demosaic, camera colour matrix and scaling to the
//! requested box. Bitmaps go through `image`. Either way the result is moved
//! into a Lumio-owned [`DecodedImage`] before the decoder's own buffers are
//! dropped.

use std::time::Instant;

use imagepipe::{ImageSource, Pipeline};

use super::bitmap::decode_bitmap;
use super::resize::fit_within;
use super::{DecodeError, DecodedImage, FilterType};

/// Develop decoded sensor data to 8-bit sRGB fitting inside `max_width x max_height`.
///
/// Pipeline errors are passed through as [`DecodeError::Develop`].
pub(crate) fn develop_raw(
    raw: &rawloader::RawImage,
    max_width: u32,
    max_height: u32,
) -> Result<DecodedImage, DecodeError> {
    let start = Instant::now();
    let mut pipeline =
        Pipeline::new_from_source(ImageSource::Raw(raw.clone())).map_err(DecodeError::Develop)?;
    pipeline.globals.settings.maxwidth = max_width as usize;
    pipeline.globals.settings.maxheight = max_height as usize;
    pipeline.globals.settings.linear = false;
    let srgb = pipeline.output_8bit(None).map_err(DecodeError::Develop)?;

    let (width, height) = (srgb.width as u32, srgb.height as u32);
    if width == 0 || height == 0 || srgb.data.len() != srgb.width * srgb.height * 3 {
        return Err(DecodeError::EmptyImage);
    }
    let image = DecodedImage::new(width, height, srgb.data);

    tracing::debug!(
        "Developed {} {} to {}x{} in {:.1}ms",
        raw.clean_make,
        raw.clean_model,
        width,
        height,
        start.elapsed().as_secs_f64() * 1000.0
    );

    // The pipeline may round its scale; enforce the box exactly.
    fit_within(image, max_width, max_height, FilterType::Bilinear)
}

/// Decode a bitmap and scale it into the box.
pub(crate) fn develop_bitmap(
    bytes: &[u8],
    max_width: u32,
    max_height: u32,
) -> Result<DecodedImage, DecodeError> {
    let image = decode_bitmap(bytes)?;
    fit_within(image, max_width, max_height, FilterType::Lanczos3)
}
