//! Image decoding pipeline for Lumio.
//!
//! This module provides functionality for:
//! - Developing RAW files at a requested preview size (via `imagepipe`)
//! - Decoding ordinary JPEG/PNG files with EXIF orientation
//! - Extracting embedded JPEG previews from RAW containers (fast path)
//! - Resizing for preview tiers
//! - Reading camera and shooting metadata
//!
//! All operations are synchronous; threading is left to the caller.

mod bitmap;
mod develop;
mod exif_tags;
mod metadata;
mod resize;
mod thumbnail;
mod types;

pub use bitmap::decode_bitmap;
pub use metadata::RawMetadata;
pub use resize::{fit_dimensions, fit_within, resize};
pub use thumbnail::{extract_thumbnail, is_tiff_container};
pub use types::{DecodeError, DecodedImage, FilterType, Orientation};

pub(crate) use bitmap::bitmap_dimensions;
pub(crate) use develop::{develop_bitmap, develop_raw};
pub(crate) use exif_tags::ExifTags;
pub(crate) use metadata::SensorInfo;
