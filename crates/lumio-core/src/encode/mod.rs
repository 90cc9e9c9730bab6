//! Image encoding for display.
//!
//! This module provides functionality for:
//! - Encoding RGB pixel data to JPEG with configurable quality
//! - Wrapping JPEG bytes in a `data:image/jpeg;base64,` URI for UI bindings

mod data_uri;
mod jpeg;

pub use data_uri::{encode_data_uri, to_data_uri, JPEG_DATA_URI_PREFIX};
pub use jpeg::{encode_jpeg, EncodeError};
