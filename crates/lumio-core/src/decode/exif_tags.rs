//! EXIF tag lookup shared by bitmap decoding and metadata extraction.

use std::io::Cursor;

use chrono::NaiveDate;
use exif::{DateTime, Exif, In, Reader, Tag, Value};

use super::Orientation;

/// Parsed EXIF block of a file.
pub(crate) struct ExifTags {
    exif: Exif,
}

impl ExifTags {
    /// Parse EXIF from any container kamadak-exif understands (TIFF-based RAW,
    /// JPEG, PNG). Returns `None` when the file carries no readable EXIF.
    pub(crate) fn read(bytes: &[u8]) -> Option<Self> {
        let mut cursor = Cursor::new(bytes);
        Reader::new()
            .read_from_container(&mut cursor)
            .ok()
            .map(|exif| Self { exif })
    }

    fn value(&self, tag: Tag) -> Option<&Value> {
        self.exif.get_field(tag, In::PRIMARY).map(|f| &f.value)
    }

    pub(crate) fn string(&self, tag: Tag) -> Option<String> {
        match self.value(tag)? {
            Value::Ascii(parts) => {
                let s = parts
                    .first()
                    .map(|p| String::from_utf8_lossy(p).trim_matches(char::from(0)).trim().to_string())?;
                (!s.is_empty()).then_some(s)
            }
            _ => None,
        }
    }

    pub(crate) fn uint(&self, tag: Tag) -> Option<u32> {
        self.value(tag)?.get_uint(0)
    }

    pub(crate) fn rational(&self, tag: Tag) -> Option<f32> {
        match self.value(tag)? {
            Value::Rational(v) => v.first().filter(|r| r.denom != 0).map(|r| r.to_f64() as f32),
            _ => None,
        }
    }

    pub(crate) fn orientation(&self) -> Orientation {
        self.uint(Tag::Orientation).map(Orientation::from).unwrap_or_default()
    }

    /// DateTimeOriginal as unix seconds. `OffsetTimeOriginal` is applied when
    /// present; otherwise the local time is taken as UTC.
    pub(crate) fn timestamp(&self) -> Option<i64> {
        let mut dt = DateTime::from_ascii(self.ascii(Tag::DateTimeOriginal)?).ok()?;
        if let Some(offset) = self.ascii(Tag::OffsetTimeOriginal) {
            if dt.parse_offset(offset).is_err() {
                tracing::debug!("Ignoring malformed OffsetTimeOriginal");
            }
        }

        let naive = NaiveDate::from_ymd_opt(dt.year as i32, dt.month as u32, dt.day as u32)?
            .and_hms_opt(dt.hour as u32, dt.minute as u32, dt.second as u32)?;
        let offset_secs = dt.offset.map(|minutes| minutes as i64 * 60).unwrap_or(0);
        Some(naive.and_utc().timestamp() - offset_secs)
    }

    fn ascii(&self, tag: Tag) -> Option<&[u8]> {
        match self.value(tag)? {
            Value::Ascii(parts) => parts.first().map(Vec::as_slice),
            _ => None,
        }
    }
}
