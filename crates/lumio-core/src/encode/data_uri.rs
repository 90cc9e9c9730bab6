//! Base64 data URIs for embedding images in UI bindings.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::jpeg::{encode_jpeg, EncodeError};
use crate::decode::DecodedImage;

pub const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// Wrap JPEG bytes in a `data:image/jpeg;base64,` URI.
pub fn to_data_uri(jpeg: &[u8]) -> String {
    let mut uri = String::with_capacity(JPEG_DATA_URI_PREFIX.len() + jpeg.len().div_ceil(3) * 4);
    uri.push_str(JPEG_DATA_URI_PREFIX);
    STANDARD.encode_string(jpeg, &mut uri);
    uri
}

/// Encode a decoded image as a JPEG data URI.
pub fn encode_data_uri(image: &DecodedImage, quality: u8) -> Result<String, EncodeError> {
    let jpeg = encode_jpeg(&image.pixels, image.width, image.height, quality)?;
    Ok(to_data_uri(&jpeg))
}
