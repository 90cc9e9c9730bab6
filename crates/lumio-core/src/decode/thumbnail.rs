//! Embedded JPEG preview extraction.
//!
//! Most RAW formats are TIFF containers that carry one or more JPEG previews
//! next to the sensor data. Pulling one out is the fast path for thumbnails:
//! no demosaicing, just a slice of the file.
//!
//! Search order:
//! 1. SubIFDs of IFD0 (the large preview on Sony/Nikon bodies)
//! 2. IFD1 (the standard EXIF thumbnail)
//! 3. IFD0 itself
//! 4. The largest `FFD8 .. FFD9` run found by scanning the file

use super::DecodeError;

const TIFF_MAGIC_LE: [u8; 4] = [0x49, 0x49, 0x2A, 0x00];
const TIFF_MAGIC_BE: [u8; 4] = [0x4D, 0x4D, 0x00, 0x2A];

const TAG_COMPRESSION: u16 = 0x0103;
const TAG_STRIP_OFFSETS: u16 = 0x0111;
const TAG_STRIP_BYTE_COUNTS: u16 = 0x0117;
const TAG_SUBIFDS: u16 = 0x014A;
const TAG_JPEG_OFFSET: u16 = 0x0201;
const TAG_JPEG_LENGTH: u16 = 0x0202;

const COMPRESSION_JPEG_OLD: u32 = 6;
const COMPRESSION_JPEG: u32 = 7;

const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_IFD: u16 = 13;

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

const MAX_IFD_ENTRIES: u16 = 1000;
const MAX_SUBIFDS: u32 = 8;
/// SubIFD previews smaller than this are treated as icons and skipped.
const MIN_SUBIFD_PREVIEW: usize = 10_000;
/// The marker scan skips the TIFF header region.
const SCAN_START: usize = 8192;
const MIN_SCANNED_PREVIEW: usize = 50_000;

/// Check if a file looks like a TIFF-based RAW container.
pub fn is_tiff_container(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && (bytes[..4] == TIFF_MAGIC_LE || bytes[..4] == TIFF_MAGIC_BE)
}

/// Extract the embedded JPEG preview bytes from a RAW file.
///
/// # Errors
///
/// - `DecodeError::NoThumbnail` - no embedded JPEG could be located
/// - `DecodeError::CorruptedFile` - the TIFF structure is truncated
pub fn extract_thumbnail(bytes: &[u8]) -> Result<Vec<u8>, DecodeError> {
    if is_tiff_container(bytes) {
        let tiff = Tiff::new(bytes);
        let ifd0 = tiff.read_ifd(tiff.u32_at(4)?)?;

        for offset in tiff.subifd_offsets(&ifd0) {
            let found = tiff.read_ifd(offset).ok().and_then(|ifd| tiff.jpeg_in(&ifd));
            if let Some(jpeg) = found.filter(|j| j.len() > MIN_SUBIFD_PREVIEW) {
                return Ok(jpeg.to_vec());
            }
        }

        if ifd0.next != 0 {
            if let Some(jpeg) = tiff.read_ifd(ifd0.next).ok().and_then(|ifd| tiff.jpeg_in(&ifd)) {
                return Ok(jpeg.to_vec());
            }
        }

        if let Some(jpeg) = tiff.jpeg_in(&ifd0) {
            return Ok(jpeg.to_vec());
        }
    }

    scan_for_largest_jpeg(bytes)
        .map(<[u8]>::to_vec)
        .ok_or(DecodeError::NoThumbnail)
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    tag: u16,
    typ: u16,
    count: u32,
    /// Inline value or offset, already in host byte order.
    value: u32,
}

struct Ifd {
    entries: Vec<Entry>,
    next: u32,
}

impl Ifd {
    fn get(&self, tag: u16) -> Option<&Entry> {
        self.entries.iter().find(|e| e.tag == tag)
    }
}

struct Tiff<'a> {
    bytes: &'a [u8],
    little_endian: bool,
}

impl<'a> Tiff<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            little_endian: bytes[..4] == TIFF_MAGIC_LE,
        }
    }

    fn slice(&self, offset: usize, len: usize) -> Option<&'a [u8]> {
        let end = offset.checked_add(len)?;
        self.bytes.get(offset..end)
    }

    fn u16_at(&self, offset: usize) -> Result<u16, DecodeError> {
        let b = self
            .slice(offset, 2)
            .ok_or_else(|| truncated("u16", offset))?;
        let b = [b[0], b[1]];
        Ok(if self.little_endian {
            u16::from_le_bytes(b)
        } else {
            u16::from_be_bytes(b)
        })
    }

    fn u32_at(&self, offset: usize) -> Result<u32, DecodeError> {
        let b = self
            .slice(offset, 4)
            .ok_or_else(|| truncated("u32", offset))?;
        let b = [b[0], b[1], b[2], b[3]];
        Ok(if self.little_endian {
            u32::from_le_bytes(b)
        } else {
            u32::from_be_bytes(b)
        })
    }

    fn read_ifd(&self, offset: u32) -> Result<Ifd, DecodeError> {
        let offset = offset as usize;
        let count = self.u16_at(offset)?;
        if count > MAX_IFD_ENTRIES {
            return Err(DecodeError::CorruptedFile(format!(
                "Too many IFD entries ({count}) at offset {offset}"
            )));
        }

        let mut entries = Vec::with_capacity(count as usize);
        for i in 0..count as usize {
            let at = offset + 2 + i * 12;
            let typ = self.u16_at(at + 2)?;
            // SHORT values sit left-justified in the 4-byte value field.
            let value = if typ == TYPE_SHORT {
                self.u16_at(at + 8)? as u32
            } else {
                self.u32_at(at + 8)?
            };
            entries.push(Entry {
                tag: self.u16_at(at)?,
                typ,
                count: self.u32_at(at + 4)?,
                value,
            });
        }

        let next = self.u32_at(offset + 2 + count as usize * 12).unwrap_or(0);
        Ok(Ifd { entries, next })
    }

    /// Offsets of the SubIFDs referenced from `ifd`.
    fn subifd_offsets(&self, ifd: &Ifd) -> Vec<u32> {
        let Some(entry) = ifd.get(TAG_SUBIFDS) else {
            return Vec::new();
        };
        if !matches!(entry.typ, TYPE_LONG | TYPE_IFD) || entry.count == 0 {
            return Vec::new();
        }
        if entry.count == 1 {
            return vec![entry.value];
        }
        (0..entry.count.min(MAX_SUBIFDS))
            .filter_map(|i| self.u32_at(entry.value as usize + i as usize * 4).ok())
            .collect()
    }

    /// The JPEG referenced by an IFD, either through the JPEGInterchangeFormat
    /// pair or through a single JPEG-compressed strip.
    fn jpeg_in(&self, ifd: &Ifd) -> Option<&'a [u8]> {
        if let (Some(off), Some(len)) = (ifd.get(TAG_JPEG_OFFSET), ifd.get(TAG_JPEG_LENGTH)) {
            if let Some(jpeg) = self.jpeg_at(off.value, len.value) {
                return Some(jpeg);
            }
        }

        let compression = ifd.get(TAG_COMPRESSION).map(|e| e.value);
        if matches!(compression, Some(COMPRESSION_JPEG_OLD | COMPRESSION_JPEG)) {
            let off = ifd.get(TAG_STRIP_OFFSETS)?;
            let len = ifd.get(TAG_STRIP_BYTE_COUNTS)?;
            if off.count == 1 && len.count == 1 {
                return self.jpeg_at(off.value, len.value);
            }
        }
        None
    }

    fn jpeg_at(&self, offset: u32, len: u32) -> Option<&'a [u8]> {
        if len == 0 {
            return None;
        }
        self.slice(offset as usize, len as usize)
            .filter(|data| data.starts_with(&JPEG_SOI))
    }
}

fn truncated(what: &str, offset: usize) -> DecodeError {
    DecodeError::CorruptedFile(format!("Failed to read {what} at offset {offset}"))
}

/// Find the largest `SOI .. EOI` run past the header region.
fn scan_for_largest_jpeg(bytes: &[u8]) -> Option<&[u8]> {
    let mut best: Option<&[u8]> = None;
    let mut pos = SCAN_START.min(bytes.len());

    while let Some(rel) = find(&bytes[pos..], &JPEG_SOI) {
        let start = pos + rel;
        let Some(end_rel) = find(&bytes[start + 2..], &JPEG_EOI) else {
            break;
        };
        let end = start + 2 + end_rel + 2;
        let candidate = &bytes[start..end];
        if candidate.len() > MIN_SCANNED_PREVIEW && best.map_or(true, |b| candidate.len() > b.len()) {
            best = Some(candidate);
        }
        pos = end;
    }

    best
}

fn find(haystack: &[u8], needle: &[u8; 2]) -> Option<usize> {
    haystack.windows(2).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Little-endian TIFF writer for synthetic containers.
    struct TiffBuilder {
        bytes: Vec<u8>,
    }

    impl TiffBuilder {
        fn new(size: usize) -> Self {
            let mut bytes = vec![0u8; size];
            bytes[..4].copy_from_slice(&TIFF_MAGIC_LE);
            bytes[4..8].copy_from_slice(&8u32.to_le_bytes());
            Self { bytes }
        }

        fn ifd(&mut self, at: usize, entries: &[(u16, u16, u32, u32)], next: u32) -> &mut Self {
            self.bytes[at..at + 2].copy_from_slice(&(entries.len() as u16).to_le_bytes());
            for (i, (tag, typ, count, value)) in entries.iter().enumerate() {
                let e = at + 2 + i * 12;
                self.bytes[e..e + 2].copy_from_slice(&tag.to_le_bytes());
                self.bytes[e + 2..e + 4].copy_from_slice(&typ.to_le_bytes());
                self.bytes[e + 4..e + 8].copy_from_slice(&count.to_le_bytes());
                self.bytes[e + 8..e + 12].copy_from_slice(&value.to_le_bytes());
            }
            let n = at + 2 + entries.len() * 12;
            self.bytes[n..n + 4].copy_from_slice(&next.to_le_bytes());
            self
        }

        fn jpeg(&mut self, at: usize, len: usize) -> &mut Self {
            self.bytes[at..at + 2].copy_from_slice(&JPEG_SOI);
            self.bytes[at + len - 2..at + len].copy_from_slice(&JPEG_EOI);
            self
        }

        fn build(&self) -> Vec<u8> {
            self.bytes.clone()
        }
    }

    #[test]
    fn test_is_tiff_container() {
        assert!(is_tiff_container(&[0x49, 0x49, 0x2A, 0x00, 0x08]));
        assert!(is_tiff_container(&[0x4D, 0x4D, 0x00, 0x2A]));
        assert!(!is_tiff_container(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!is_tiff_container(&[0x49, 0x49]));
    }

    #[test]
    fn test_jpeg_interchange_in_ifd0() {
        let bytes = TiffBuilder::new(400)
            .ifd(8, &[(TAG_JPEG_OFFSET, TYPE_LONG, 1, 200), (TAG_JPEG_LENGTH, TYPE_LONG, 1, 40)], 0)
            .jpeg(200, 40)
            .build();
        let jpeg = extract_thumbnail(&bytes).unwrap();
        assert_eq!(jpeg.len(), 40);
        assert_eq!(&jpeg[..2], &JPEG_SOI);
    }

    #[test]
    fn test_ifd1_thumbnail() {
        let bytes = TiffBuilder::new(400)
            .ifd(8, &[(0x0100, TYPE_LONG, 1, 6000)], 100)
            .ifd(100, &[(TAG_JPEG_OFFSET, TYPE_LONG, 1, 300), (TAG_JPEG_LENGTH, TYPE_LONG, 1, 64)], 0)
            .jpeg(300, 64)
            .build();
        assert_eq!(extract_thumbnail(&bytes).unwrap().len(), 64);
    }

    #[test]
    fn test_subifd_preview_preferred_over_ifd1() {
        let bytes = TiffBuilder::new(30_000)
            .ifd(8, &[(TAG_SUBIFDS, TYPE_LONG, 1, 100)], 200)
            .ifd(100, &[(TAG_JPEG_OFFSET, TYPE_LONG, 1, 1000), (TAG_JPEG_LENGTH, TYPE_LONG, 1, 20_000)], 0)
            .ifd(200, &[(TAG_JPEG_OFFSET, TYPE_LONG, 1, 500), (TAG_JPEG_LENGTH, TYPE_LONG, 1, 100)], 0)
            .jpeg(1000, 20_000)
            .jpeg(500, 100)
            .build();
        assert_eq!(extract_thumbnail(&bytes).unwrap().len(), 20_000);
    }

    #[test]
    fn test_strip_based_jpeg() {
        for compression in [COMPRESSION_JPEG_OLD, COMPRESSION_JPEG] {
            let bytes = TiffBuilder::new(400)
                .ifd(
                    8,
                    &[
                        (TAG_COMPRESSION, TYPE_SHORT, 1, compression),
                        (TAG_STRIP_OFFSETS, TYPE_LONG, 1, 250),
                        (TAG_STRIP_BYTE_COUNTS, TYPE_LONG, 1, 30),
                    ],
                    0,
                )
                .jpeg(250, 30)
                .build();
            assert_eq!(extract_thumbnail(&bytes).unwrap().len(), 30, "compression {compression}");
        }
    }

    #[test]
    fn test_uncompressed_strip_ignored() {
        let bytes = TiffBuilder::new(400)
            .ifd(
                8,
                &[
                    (TAG_COMPRESSION, TYPE_SHORT, 1, 1),
                    (TAG_STRIP_OFFSETS, TYPE_LONG, 1, 250),
                    (TAG_STRIP_BYTE_COUNTS, TYPE_LONG, 1, 30),
                ],
                0,
            )
            .jpeg(250, 30)
            .build();
        assert!(matches!(extract_thumbnail(&bytes), Err(DecodeError::NoThumbnail)));
    }

    #[test]
    fn test_out_of_bounds_and_bad_magic_rejected() {
        let bytes = TiffBuilder::new(100)
            .ifd(8, &[(TAG_JPEG_OFFSET, TYPE_LONG, 1, 90), (TAG_JPEG_LENGTH, TYPE_LONG, 1, 20)], 0)
            .build();
        assert!(matches!(extract_thumbnail(&bytes), Err(DecodeError::NoThumbnail)));

        let bytes = TiffBuilder::new(200)
            .ifd(8, &[(TAG_JPEG_OFFSET, TYPE_LONG, 1, 100), (TAG_JPEG_LENGTH, TYPE_LONG, 1, 20)], 0)
            .build();
        assert!(matches!(extract_thumbnail(&bytes), Err(DecodeError::NoThumbnail)));
    }

    #[test]
    fn test_truncated_ifd_is_corrupted() {
        let mut bytes = vec![0u8; 9];
        bytes[..4].copy_from_slice(&TIFF_MAGIC_LE);
        bytes[4..8].copy_from_slice(&8u32.to_le_bytes());
        assert!(matches!(extract_thumbnail(&bytes), Err(DecodeError::CorruptedFile(_))));

        let mut bytes = vec![0u8; 8];
        bytes[..4].copy_from_slice(&TIFF_MAGIC_LE);
        bytes[4..8].copy_from_slice(&1000u32.to_le_bytes());
        assert!(matches!(extract_thumbnail(&bytes), Err(DecodeError::CorruptedFile(_))));
    }

    #[test]
    fn test_too_many_entries() {
        let mut bytes = TiffBuilder::new(64).build();
        bytes[8..10].copy_from_slice(&1001u16.to_le_bytes());
        match extract_thumbnail(&bytes) {
            Err(DecodeError::CorruptedFile(msg)) => assert!(msg.contains("Too many IFD entries")),
            other => panic!("expected CorruptedFile, got {other:?}"),
        }
    }

    #[test]
    fn test_big_endian_ifd() {
        let mut bytes = vec![0u8; 300];
        bytes[..4].copy_from_slice(&TIFF_MAGIC_BE);
        bytes[4..8].copy_from_slice(&8u32.to_be_bytes());
        bytes[8..10].copy_from_slice(&2u16.to_be_bytes());
        let entries = [(TAG_JPEG_OFFSET, 200u32), (TAG_JPEG_LENGTH, 50u32)];
        for (i, (tag, value)) in entries.iter().enumerate() {
            let e = 10 + i * 12;
            bytes[e..e + 2].copy_from_slice(&tag.to_be_bytes());
            bytes[e + 2..e + 4].copy_from_slice(&TYPE_LONG.to_be_bytes());
            bytes[e + 4..e + 8].copy_from_slice(&1u32.to_be_bytes());
            bytes[e + 8..e + 12].copy_from_slice(&value.to_be_bytes());
        }
        bytes[200..202].copy_from_slice(&JPEG_SOI);
        assert_eq!(extract_thumbnail(&bytes).unwrap().len(), 50);
    }

    #[test]
    fn test_scan_picks_largest_jpeg() {
        let mut bytes = vec![0u8; 200_000];
        bytes[10_000..10_002].copy_from_slice(&JPEG_SOI);
        bytes[70_000..70_002].copy_from_slice(&JPEG_EOI);
        bytes[80_000..80_002].copy_from_slice(&JPEG_SOI);
        bytes[190_000..190_002].copy_from_slice(&JPEG_EOI);

        let jpeg = scan_for_largest_jpeg(&bytes).unwrap();
        assert_eq!(jpeg.len(), 190_002 - 80_000);
    }

    #[test]
    fn test_scan_not_found_cases() {
        let mut bytes = vec![0u8; 70_000];
        bytes[10_000..10_002].copy_from_slice(&JPEG_SOI);
        bytes[40_000..40_002].copy_from_slice(&JPEG_EOI);
        assert!(scan_for_largest_jpeg(&bytes).is_none(), "too small");

        let mut bytes = vec![0u8; 70_000];
        bytes[1_000..1_002].copy_from_slice(&JPEG_SOI);
        bytes[60_000..60_002].copy_from_slice(&JPEG_EOI);
        assert!(scan_for_largest_jpeg(&bytes).is_none(), "starts inside header region");

        assert!(scan_for_largest_jpeg(&[]).is_none());
        assert!(matches!(extract_thumbnail(&[1, 2, 3]), Err(DecodeError::NoThumbnail)));
    }
}
