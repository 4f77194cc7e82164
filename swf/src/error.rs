//! Error types returned by the reader.
//!
//! Every variant carries the byte offset at which the problem was detected,
//! so a caller assembling a diagnostic can point back into the original
//! buffer without the reader needing to know anything about file names or
//! line numbers.

use crate::types::CharacterId;
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// A read ran past the end of the buffer. The cursor is left at EOF;
    /// callers must not retry the read.
    UnexpectedEndOfData { offset: usize },

    /// The first three bytes of the file were not `FWS`, `CWS`, or `ZWS`.
    BadSignature { bytes: [u8; 3] },

    /// The caller-supplied `Inflate` implementation reported a failure.
    DecompressionFailed { cause: String },

    /// A tag's declared length reaches past the remaining bytes in the
    /// stream being framed.
    TruncatedTag {
        code: u16,
        requested: u32,
        available: u32,
    },

    /// A shape record's fill-style index referenced an unrecognized fill
    /// type byte.
    UnknownFillType { value: u8, offset: usize },

    /// A morph shape's start and end record streams have a different
    /// record count or record-kind sequence.
    MorphTopologyMismatch { start_count: usize, end_count: usize },

    /// A `PlaceObject3` filter list entry used an unrecognized filter id byte.
    UnknownFilterType { value: u8, offset: usize },

    /// A null-terminated string ran past the 64KiB sanity limit without
    /// finding its terminator.
    StringTooLong { offset: usize },

    /// An `EncodedU32` did not terminate within 5 bytes.
    InvalidEncodedU32 { offset: usize },
}

/// A single tag body that failed to decode.
///
/// Framing (locating the tag and its length) already succeeded by the time
/// this is produced, so the stream position after the failing tag is known
/// and decoding of later tags continues normally.
#[derive(Debug)]
pub struct TagDecodeFailure {
    pub code: u16,
    pub offset: usize,
    pub cause: Error,
}

impl fmt::Display for TagDecodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tag {} at offset {} failed to decode: {}",
            self.code, self.offset, self.cause
        )
    }
}

/// A shape or morph-shape record stream that ran out of data before its
/// end-of-shape marker. The records decoded up to that point are still
/// returned to the caller (see [`crate::types::Shape::is_truncated`]); this
/// value is only the diagnostic describing how much was lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruncatedShape {
    pub id: CharacterId,
    pub records_decoded: usize,
}

impl fmt::Display for TruncatedShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "shape {} truncated after {} record(s); using partial shape",
            self.id, self.records_decoded
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnexpectedEndOfData { offset } => {
                write!(f, "unexpected end of data at offset {}", offset)
            }
            Error::BadSignature { bytes } => write!(
                f,
                "invalid SWF signature {:?} (expected FWS, CWS, or ZWS)",
                bytes
            ),
            Error::DecompressionFailed { cause } => write!(f, "decompression failed: {}", cause),
            Error::TruncatedTag {
                code,
                requested,
                available,
            } => write!(
                f,
                "tag {} claims a body of {} bytes but only {} remain",
                code, requested, available
            ),
            Error::UnknownFillType { value, offset } => {
                write!(f, "unknown fill style type 0x{:02x} at offset {}", value, offset)
            }
            Error::MorphTopologyMismatch {
                start_count,
                end_count,
            } => write!(
                f,
                "morph shape start/end record topology mismatch ({} vs {} records)",
                start_count, end_count
            ),
            Error::UnknownFilterType { value, offset } => {
                write!(f, "unknown filter type 0x{:02x} at offset {}", value, offset)
            }
            Error::StringTooLong { offset } => {
                write!(f, "string starting at offset {} exceeds the length limit", offset)
            }
            Error::InvalidEncodedU32 { offset } => write!(
                f,
                "EncodedU32 at offset {} did not terminate within 5 bytes",
                offset
            ),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::UnexpectedEndOfData { offset } => Some(*offset),
            Error::UnknownFillType { offset, .. } => Some(*offset),
            Error::UnknownFilterType { offset, .. } => Some(*offset),
            Error::StringTooLong { offset } => Some(*offset),
            Error::InvalidEncodedU32 { offset } => Some(*offset),
            _ => None,
        }
    }
}
