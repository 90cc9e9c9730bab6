//! Decoding session over a single opened file.
//!
//! [`RawDecoder`] is the boundary to the external decoders. It holds the open
//! file and the current [`Adjustments`], and develops previews on demand.
//! [`DecodeJob`] is a cheap snapshot of that state that can be moved to a
//! worker thread.

use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::adjustments::apply_adjustments;
use crate::decode::{
    bitmap_dimensions, decode_bitmap, develop_bitmap, develop_raw, extract_thumbnail, DecodeError,
    DecodedImage, ExifTags, RawMetadata, SensorInfo,
};
use crate::Adjustments;

enum SourceKind {
    /// Sensor data decoded once at open time.
    Raw(Box<rawloader::RawImage>),
    Bitmap,
}

struct Source {
    path: PathBuf,
    bytes: Vec<u8>,
    kind: SourceKind,
    metadata: RawMetadata,
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            SourceKind::Raw(_) => "raw",
            SourceKind::Bitmap => "bitmap",
        };
        f.debug_struct("Source")
            .field("path", &self.path)
            .field("bytes", &self.bytes.len())
            .field("kind", &kind)
            .finish()
    }
}

impl Source {
    fn load(path: &Path) -> Result<Self, DecodeError> {
        let bytes = std::fs::read(path)?;
        let exif = ExifTags::read(&bytes);

        let raw_error = match rawloader::decode(&mut Cursor::new(&bytes[..])) {
            Ok(raw) => {
                let sensor = SensorInfo::from_raw(&raw);
                return Ok(Self {
                    path: path.to_path_buf(),
                    metadata: RawMetadata::from_sensor(&sensor, exif.as_ref()),
                    bytes,
                    kind: SourceKind::Raw(Box::new(raw)),
                });
            }
            Err(e) => e.to_string(),
        };

        match bitmap_dimensions(&bytes) {
            Ok((width, height)) => Ok(Self {
                path: path.to_path_buf(),
                metadata: RawMetadata::from_bitmap(width, height, exif.as_ref()),
                bytes,
                kind: SourceKind::Bitmap,
            }),
            Err(_) => Err(DecodeError::Unsupported(raw_error)),
        }
    }
}

/// A decoding session. At most one file is open at a time.
#[derive(Debug, Default)]
pub struct RawDecoder {
    source: Option<Arc<Source>>,
    adjustments: Adjustments,
}

impl RawDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a file, closing any previous one first.
    ///
    /// RAW files are recognised by `rawloader`; anything else the `image`
    /// crate can read is accepted as a plain bitmap. When neither accepts the
    /// file the RAW decoder's error is returned.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<(), DecodeError> {
        self.close();
        let path = path.as_ref();
        let source = Source::load(path)?;
        tracing::info!(
            "Opened {} ({} {}, {}x{}, raw: {})",
            path.display(),
            source.metadata.camera_make,
            source.metadata.camera_model,
            source.metadata.image_width,
            source.metadata.image_height,
            source.metadata.is_raw
        );
        self.source = Some(Arc::new(source));
        Ok(())
    }

    pub fn close(&mut self) {
        if let Some(source) = self.source.take() {
            tracing::info!("Closed {}", source.path.display());
        }
    }

    pub fn is_open(&self) -> bool {
        self.source.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.source.as_deref().map(|s| s.path.as_path())
    }

    pub fn metadata(&self) -> Option<&RawMetadata> {
        self.source.as_deref().map(|s| &s.metadata)
    }

    /// Replace the adjustments used by subsequent develops.
    pub fn set_adjustments(&mut self, adjustments: Adjustments) {
        self.adjustments = adjustments;
    }

    pub fn adjustments(&self) -> Adjustments {
        self.adjustments
    }

    /// Snapshot of the open file and current adjustments.
    pub fn job(&self) -> Result<DecodeJob, DecodeError> {
        let source = self.source.clone().ok_or(DecodeError::NotOpen)?;
        Ok(DecodeJob {
            source,
            adjustments: self.adjustments,
        })
    }

    /// Develop the open file into a `max_width x max_height` box.
    /// A zero bound leaves that axis unconstrained.
    pub fn decode_preview(&self, max_width: u32, max_height: u32) -> Result<DecodedImage, DecodeError> {
        self.job()?.develop(max_width, max_height)
    }

    /// Bytes of the JPEG preview embedded in the open file.
    pub fn thumbnail_data(&self) -> Result<Vec<u8>, DecodeError> {
        let source = self.source.as_deref().ok_or(DecodeError::NotOpen)?;
        extract_thumbnail(&source.bytes)
    }

    /// Embedded JPEG preview decoded to RGB. Adjustments are not applied.
    pub fn thumbnail(&self) -> Result<DecodedImage, DecodeError> {
        decode_bitmap(&self.thumbnail_data()?)
    }
}

/// Everything a worker needs to develop the open file.
#[derive(Debug, Clone)]
pub struct DecodeJob {
    source: Arc<Source>,
    adjustments: Adjustments,
}

impl DecodeJob {
    pub fn path(&self) -> &Path {
        &self.source.path
    }

    pub fn adjustments(&self) -> Adjustments {
        self.adjustments
    }

    /// Develop into a `max_width x max_height` box and apply the adjustments.
    pub fn develop(&self, max_width: u32, max_height: u32) -> Result<DecodedImage, DecodeError> {
        let mut image = match &self.source.kind {
            SourceKind::Raw(raw) => develop_raw(raw, max_width, max_height)?,
            SourceKind::Bitmap => develop_bitmap(&self.source.bytes, max_width, max_height)?,
        };
        apply_adjustments(&mut image.pixels, &self.adjustments);
        Ok(image)
    }
}
