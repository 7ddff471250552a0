//! # PMU Digest Common Types
//!
//! This module defines the types shared by the digest decoder and the frame encoder:
//! error enums, the byte order parameter used by the field layout, and the fixed sizes
//! of the wire format.
//!
//! ## Key Components
//!
//! - `DecodeError`: Failures while parsing a digest buffer (truncated header, negative
//!   record count, truncated record).
//! - `FrameError`: Failures while reading back an encoded telemetry frame.
//! - `LayoutError`: Construction-time errors for an inconsistent `FieldLayout`.
//! - `ByteOrder`: Explicit little/big endian selector. Digest headers are little-endian
//!   while record payloads are big-endian, so neither order is assumed globally.
//!
//! ## Usage
//!
//! The error types are returned by `digest::decode`, `frame::TelemetrySample::from_frame`
//! and `layout::FieldLayout::new`. `ByteOrder` is carried by the layout and consulted for
//! every integer read.

use thiserror::Error;

/// Size of the digest header that precedes the records.
pub const DIGEST_HEADER_LEN: usize = 32;

/// Number of phasors carried by one record or frame in this protocol version.
pub const PHASOR_COUNT: usize = 3;

/// Wire size of one phasor: f32 magnitude followed by f32 angle.
pub const PHASOR_LEN: usize = 8;

/// Size of one telemetry record inside a digest.
pub const RECORD_STRIDE: usize = 8 + PHASOR_LEN * PHASOR_COUNT + 8;

/// Errors that abort the decoding of a digest buffer.
///
/// All variants are local and non-retriable. The decoder stops at the first error and
/// does not return the records that preceded it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The buffer is shorter than the 32-byte digest header.
    #[error("truncated digest header: expected at least {DIGEST_HEADER_LEN} bytes, got {len}")]
    TruncatedHeader { len: usize },
    /// The header declares a negative number of records.
    #[error("invalid record count in digest header: {0}")]
    InvalidRecordCount(i32),
    /// Record `index` would extend past the end of the buffer.
    #[error("truncated record at index {0}")]
    TruncatedRecord(usize),
}

/// Errors raised when reading back an encoded telemetry frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("invalid frame length: expected {expected} bytes, got {len}")]
    InvalidLength { expected: usize, len: usize },
    #[error("invalid sync word: 0x{0:04X}")]
    InvalidSync(u16),
    #[error("timestamp out of range: soc={soc}, fracsec={fracsec}")]
    InvalidTimestamp { soc: u32, fracsec: u32 },
}

/// Configuration errors detected while building a `FieldLayout`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("record stride {stride} does not match {phasor_count} phasors (expected {expected})")]
    StrideMismatch {
        stride: usize,
        phasor_count: usize,
        expected: usize,
    },
    #[error("unsupported phasor count {0}, this protocol version carries exactly {PHASOR_COUNT}")]
    UnsupportedPhasorCount(usize),
}

/// Byte order of the integers and floats in one section of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    pub fn read_u32(self, bytes: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Little => u32::from_le_bytes(bytes),
            ByteOrder::Big => u32::from_be_bytes(bytes),
        }
    }

    pub fn read_i32(self, bytes: [u8; 4]) -> i32 {
        match self {
            ByteOrder::Little => i32::from_le_bytes(bytes),
            ByteOrder::Big => i32::from_be_bytes(bytes),
        }
    }

    pub fn read_u64(self, bytes: [u8; 8]) -> u64 {
        match self {
            ByteOrder::Little => u64::from_le_bytes(bytes),
            ByteOrder::Big => u64::from_be_bytes(bytes),
        }
    }

    pub fn read_f32(self, bytes: [u8; 4]) -> f32 {
        match self {
            ByteOrder::Little => f32::from_le_bytes(bytes),
            ByteOrder::Big => f32::from_be_bytes(bytes),
        }
    }

    pub fn u32_bytes(self, value: u32) -> [u8; 4] {
        match self {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        }
    }

    pub fn i32_bytes(self, value: i32) -> [u8; 4] {
        match self {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        }
    }

    pub fn u64_bytes(self, value: u64) -> [u8; 8] {
        match self {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        }
    }

    pub fn f32_bytes(self, value: f32) -> [u8; 4] {
        match self {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        }
    }
}

/// Copies `N` bytes starting at `start` into a fixed-size array.
///
/// # Panics
///
/// Panics if `bytes` holds fewer than `start + N` bytes. Callers check lengths first.
pub(crate) fn take<const N: usize>(bytes: &[u8], start: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[start..start + N]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_stride() {
        assert_eq!(RECORD_STRIDE, 40);
    }

    #[test]
    fn test_byte_order_reads() {
        let bytes = [0x00, 0x00, 0x00, 0x01];
        assert_eq!(ByteOrder::Big.read_u32(bytes), 1);
        assert_eq!(ByteOrder::Little.read_u32(bytes), 0x0100_0000);

        let neg = ByteOrder::Little.i32_bytes(-2);
        assert_eq!(neg, [0xFE, 0xFF, 0xFF, 0xFF]);
        assert_eq!(ByteOrder::Little.read_i32(neg), -2);

        let one = ByteOrder::Big.f32_bytes(1.0);
        assert_eq!(one, [0x3F, 0x80, 0x00, 0x00]);
        assert_eq!(ByteOrder::Big.read_f32(one), 1.0);
    }

    #[test]
    fn test_error_display() {
        let err = DecodeError::TruncatedHeader { len: 3 };
        assert_eq!(
            err.to_string(),
            "truncated digest header: expected at least 32 bytes, got 3"
        );
        assert_eq!(
            DecodeError::TruncatedRecord(2).to_string(),
            "truncated record at index 2"
        );
    }
}
