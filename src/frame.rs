//! Fixed-offset header parsing and payload validation.
//!
//! A frame is an 80-byte ASCII header followed by a 1024-byte payload. The
//! header carries its fields at fixed offsets:
//!
//! | Bytes     | Field          |
//! |-----------|----------------|
//! | `0..3`    | sentinel `/PF` |
//! | `3..15`   | filename       |
//! | `18..20`  | part number    |
//! | `27..33`  | total parts    |
//! | `36..43`  | checksum       |
//! | `47..80`  | version stamp  |
//!
//! Numeric fields are decimal text padded with spaces. The checksum is the
//! plain sum of all payload bytes.

use std::ops::Range;

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::codec::{FRAME_LEN, HEADER_LEN, MIN_FRAME_LEN, PAYLOAD_LEN, SENTINEL};

const FILENAME: Range<usize> = 3..15;
const PART_NUMBER: Range<usize> = 18..20;
const TOTAL_PARTS: Range<usize> = 27..33;
const CHECKSUM: Range<usize> = 36..43;
const VERSION_STAMP: Range<usize> = 47..HEADER_LEN;

/// Largest part count the two-digit part number field can address.
pub const MAX_PARTS: u32 = 99;

/// Reasons a frame is dropped before reaching the assembler.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The frame cannot hold a header and a payload.
    #[error("frame too short: {len} < {MIN_FRAME_LEN}")]
    TooShort {
        /// Length of the rejected frame.
        len: usize,
    },
    /// A numeric header field is not decimal text.
    #[error("invalid numeric header field: {field}")]
    InvalidNumber {
        /// Name of the offending field.
        field: &'static str,
    },
    /// The part number lies outside `1..=total`.
    #[error("invalid part number {part} of {total}")]
    InvalidPartNumber {
        /// Declared part number.
        part: u32,
        /// Declared total part count.
        total: u32,
    },
    /// The file has more parts than a part number can address, so it could
    /// never complete.
    #[error("total parts {total} exceeds {MAX_PARTS}")]
    TooManyParts {
        /// Declared total part count.
        total: u32,
    },
    /// The filename field is blank.
    #[error("empty filename")]
    EmptyFilename,
    /// The payload sum differs from the declared checksum.
    #[error("checksum mismatch: declared {declared}, computed {computed}")]
    ChecksumMismatch {
        /// Checksum carried in the header.
        declared: u32,
        /// Sum of the received payload bytes.
        computed: u32,
    },
    /// A header value does not fit its fixed-width field.
    #[error("header field {field} does not fit {width} bytes")]
    FieldOverflow {
        /// Name of the offending field.
        field: &'static str,
        /// Width of the field on the wire.
        width: usize,
    },
}

impl FrameError {
    /// Short label used for metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TooShort { .. } => "too_short",
            Self::InvalidNumber { .. } => "invalid_number",
            Self::InvalidPartNumber { .. } => "invalid_part",
            Self::TooManyParts { .. } => "too_many_parts",
            Self::EmptyFilename => "empty_filename",
            Self::ChecksumMismatch { .. } => "checksum",
            Self::FieldOverflow { .. } => "field_overflow",
        }
    }
}

/// Sum every payload byte without truncation.
///
/// # Examples
///
/// ```
/// use byteblaster::frame::checksum;
///
/// assert_eq!(checksum(&[1, 2, 255]), 258);
/// ```
#[must_use]
pub fn checksum(payload: &[u8]) -> u32 { payload.iter().map(|byte| u32::from(*byte)).sum() }

fn text_field(header: &[u8], range: Range<usize>) -> String {
    String::from_utf8_lossy(&header[range])
        .trim_matches(|c: char| c.is_whitespace() || c == '\0')
        .to_owned()
}

fn numeric_field(
    header: &[u8],
    range: Range<usize>,
    field: &'static str,
) -> Result<u32, FrameError> {
    std::str::from_utf8(&header[range])
        .ok()
        .and_then(|text| text.trim().parse().ok())
        .ok_or(FrameError::InvalidNumber { field })
}

/// Decoded header fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    /// Logical file this frame belongs to.
    pub filename: String,
    /// One-based slot index of the payload.
    pub part_number: u32,
    /// Number of parts making up the file.
    pub total_parts: u32,
    /// Declared payload checksum.
    pub checksum: u32,
    /// Revision stamp of the file, compared as text.
    pub version_stamp: String,
}

impl FrameHeader {
    /// Decode the fixed-offset fields of an 80-byte header.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] when the header is short, a numeric field is not
    /// decimal, the filename is blank, the part count exceeds [`MAX_PARTS`], or
    /// the part number is out of range.
    pub fn parse(header: &[u8]) -> Result<Self, FrameError> {
        if header.len() < HEADER_LEN {
            return Err(FrameError::TooShort { len: header.len() });
        }
        let filename = text_field(header, FILENAME);
        if filename.is_empty() {
            return Err(FrameError::EmptyFilename);
        }
        let part_number = numeric_field(header, PART_NUMBER, "part_number")?;
        let total_parts = numeric_field(header, TOTAL_PARTS, "total_parts")?;
        if total_parts > MAX_PARTS {
            return Err(FrameError::TooManyParts { total: total_parts });
        }
        if part_number == 0 || part_number > total_parts {
            return Err(FrameError::InvalidPartNumber {
                part: part_number,
                total: total_parts,
            });
        }
        Ok(Self {
            filename,
            part_number,
            total_parts,
            checksum: numeric_field(header, CHECKSUM, "checksum")?,
            version_stamp: text_field(header, VERSION_STAMP),
        })
    }

    /// Write the header in its fixed 80-byte layout.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::FieldOverflow`] when a value is wider than its
    /// field.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<(), FrameError> {
        let mut header = [b' '; HEADER_LEN];
        header[..SENTINEL.len()].copy_from_slice(&SENTINEL);
        header[15..18].copy_from_slice(b"/PN");
        header[24..27].copy_from_slice(b"/PT");
        header[33..36].copy_from_slice(b"/CS");
        header[44..47].copy_from_slice(b"/FD");

        let fields = [
            (FILENAME, "filename", self.filename.clone()),
            (PART_NUMBER, "part_number", self.part_number.to_string()),
            (TOTAL_PARTS, "total_parts", self.total_parts.to_string()),
            (CHECKSUM, "checksum", self.checksum.to_string()),
            (VERSION_STAMP, "version_stamp", self.version_stamp.clone()),
        ];
        for (range, field, value) in fields {
            let width = range.len();
            if value.len() > width {
                return Err(FrameError::FieldOverflow { field, width });
            }
            header[range.start..range.start + value.len()].copy_from_slice(value.as_bytes());
        }
        dst.put_slice(&header);
        Ok(())
    }
}

/// A parsed frame: header plus a zero-copy view of its payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    header: FrameHeader,
    payload: Bytes,
}

impl Frame {
    /// Build a frame from a header and payload without validating either.
    #[must_use]
    pub fn new(header: FrameHeader, payload: Bytes) -> Self { Self { header, payload } }

    /// Parse a frame sliced from the stream.
    ///
    /// Bytes past the payload are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::TooShort`] for frames shorter than header plus
    /// payload, or any header error from [`FrameHeader::parse`].
    pub fn parse(frame: &Bytes) -> Result<Self, FrameError> {
        if frame.len() < MIN_FRAME_LEN {
            return Err(FrameError::TooShort { len: frame.len() });
        }
        let header = FrameHeader::parse(&frame[..HEADER_LEN])?;
        Ok(Self {
            header,
            payload: frame.slice(HEADER_LEN..MIN_FRAME_LEN),
        })
    }

    /// Parse a frame and verify its checksum.
    ///
    /// # Errors
    ///
    /// Returns any parse error or [`FrameError::ChecksumMismatch`].
    pub fn parse_validated(frame: &Bytes) -> Result<Self, FrameError> {
        let parsed = Self::parse(frame)?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Compare the payload sum with the declared checksum.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::ChecksumMismatch`] when they differ.
    pub fn validate(&self) -> Result<(), FrameError> {
        let computed = checksum(&self.payload);
        if computed == self.header.checksum {
            Ok(())
        } else {
            Err(FrameError::ChecksumMismatch {
                declared: self.header.checksum,
                computed,
            })
        }
    }

    /// Borrow the header.
    #[must_use]
    pub fn header(&self) -> &FrameHeader { &self.header }

    /// Borrow the payload.
    #[must_use]
    pub fn payload(&self) -> &Bytes { &self.payload }

    /// Split the frame into header and payload.
    #[must_use]
    pub fn into_parts(self) -> (FrameHeader, Bytes) { (self.header, self.payload) }

    /// Write the header and payload as they appear between two sentinels.
    ///
    /// The payload is zero-padded or truncated to [`PAYLOAD_LEN`], and the
    /// frame is padded to the nominal frame length.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::FieldOverflow`] from [`FrameHeader::encode`].
    pub fn encode(&self, dst: &mut BytesMut) -> Result<(), FrameError> {
        let start = dst.len();
        self.header.encode(dst)?;
        let body = &self.payload[..self.payload.len().min(PAYLOAD_LEN)];
        dst.put_slice(body);
        dst.put_bytes(0, PAYLOAD_LEN - body.len());
        dst.put_bytes(0, FRAME_LEN - (dst.len() - start));
        debug_assert!(dst[start..].starts_with(&SENTINEL));
        Ok(())
    }
}
