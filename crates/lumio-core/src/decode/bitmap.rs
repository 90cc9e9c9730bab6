//! Ordinary bitmap (JPEG / PNG) decoding with EXIF orientation handling.
//!
//! Used for embedded RAW thumbnails and for non-RAW files opened in a session.

use std::io::Cursor;

use image::ImageReader;

use super::exif_tags::ExifTags;
use super::{DecodeError, DecodedImage};

/// Decode a bitmap from bytes, applying EXIF orientation correction.
///
/// # Errors
///
/// Returns `DecodeError::CorruptedFile` if the bytes cannot be decoded.
pub fn decode_bitmap(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    let orientation = ExifTags::read(bytes).map(|t| t.orientation()).unwrap_or_default();

    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?
        .decode()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    let decoded = DecodedImage::from_rgb_image(orientation.apply(img).into_rgb8());
    if decoded.is_empty() {
        return Err(DecodeError::EmptyImage);
    }
    Ok(decoded)
}

/// Read bitmap dimensions from the header without decoding pixels.
pub(crate) fn bitmap_dimensions(bytes: &[u8]) -> Result<(u32, u32), DecodeError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?
        .into_dimensions()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))
}
