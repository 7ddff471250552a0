//! # Record Field Layout
//!
//! Single source of truth for the byte offsets inside one digest record. A record is a
//! timestamp (`soc` + `fracsec`), a fixed number of phasors and two IPv4 addresses:
//!
//! ```text
//! soc[0:4] fracsec[4:8] phasor0[8:16] phasor1[16:24] phasor2[24:32] src[32:36] dst[36:40]
//! ```
//!
//! The layout also carries the byte order of the digest header and of the record payload
//! as two independent parameters, since the transport writes the header little-endian
//! and the records big-endian.

use super::common::{ByteOrder, LayoutError, PHASOR_COUNT, PHASOR_LEN};

const TIMESTAMP_LEN: usize = 8;
const ADDRESSES_LEN: usize = 8;

/// A named field of a telemetry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Soc,
    FracSec,
    /// Zero-based phasor slot.
    Phasor(usize),
    SourceIp,
    DestIp,
}

/// Byte offsets, widths and byte orders for digest records.
///
/// Validated once in [`FieldLayout::new`]; afterwards every accessor is infallible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    stride: usize,
    phasor_count: usize,
    header_order: ByteOrder,
    record_order: ByteOrder,
}

impl FieldLayout {
    /// Builds a layout and checks that `stride == 8 + 8 * phasor_count + 8`.
    ///
    /// # Returns
    ///
    /// * `Ok(FieldLayout)`: A consistent layout.
    /// * `Err(LayoutError::UnsupportedPhasorCount)`: If `phasor_count` is not 3.
    /// * `Err(LayoutError::StrideMismatch)`: If the stride does not fit the fields.
    pub fn new(
        stride: usize,
        phasor_count: usize,
        header_order: ByteOrder,
        record_order: ByteOrder,
    ) -> Result<Self, LayoutError> {
        if phasor_count != PHASOR_COUNT {
            return Err(LayoutError::UnsupportedPhasorCount(phasor_count));
        }
        let expected = TIMESTAMP_LEN + PHASOR_LEN * phasor_count + ADDRESSES_LEN;
        if stride != expected {
            return Err(LayoutError::StrideMismatch {
                stride,
                phasor_count,
                expected,
            });
        }
        Ok(FieldLayout {
            stride,
            phasor_count,
            header_order,
            record_order,
        })
    }

    /// The layout produced by the switch: 40-byte records, little-endian header,
    /// big-endian payload.
    pub const fn pmu() -> Self {
        FieldLayout {
            stride: TIMESTAMP_LEN + PHASOR_LEN * PHASOR_COUNT + ADDRESSES_LEN,
            phasor_count: PHASOR_COUNT,
            header_order: ByteOrder::Little,
            record_order: ByteOrder::Big,
        }
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn phasor_count(&self) -> usize {
        self.phasor_count
    }

    pub fn header_order(&self) -> ByteOrder {
        self.header_order
    }

    pub fn record_order(&self) -> ByteOrder {
        self.record_order
    }

    /// Returns `(start, len)` of `field` relative to the start of a record.
    ///
    /// # Panics
    ///
    /// Panics if `field` is `Field::Phasor(i)` with `i >= phasor_count`.
    pub fn offset_of(&self, field: Field) -> (usize, usize) {
        let addresses = TIMESTAMP_LEN + PHASOR_LEN * self.phasor_count;
        match field {
            Field::Soc => (0, 4),
            Field::FracSec => (4, 4),
            Field::Phasor(i) => {
                assert!(
                    i < self.phasor_count,
                    "phasor index {} out of range for {} phasors",
                    i,
                    self.phasor_count
                );
                (TIMESTAMP_LEN + PHASOR_LEN * i, PHASOR_LEN)
            }
            Field::SourceIp => (addresses, 4),
            Field::DestIp => (addresses + 4, 4),
        }
    }
}

impl Default for FieldLayout {
    fn default() -> Self {
        FieldLayout::pmu()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pmu_offsets() {
        let layout = FieldLayout::pmu();
        assert_eq!(layout.stride(), 40);
        assert_eq!(layout.offset_of(Field::Soc), (0, 4));
        assert_eq!(layout.offset_of(Field::FracSec), (4, 4));
        assert_eq!(layout.offset_of(Field::Phasor(0)), (8, 8));
        assert_eq!(layout.offset_of(Field::Phasor(1)), (16, 8));
        assert_eq!(layout.offset_of(Field::Phasor(2)), (24, 8));
        assert_eq!(layout.offset_of(Field::SourceIp), (32, 4));
        assert_eq!(layout.offset_of(Field::DestIp), (36, 4));
        assert_eq!(layout.header_order(), ByteOrder::Little);
        assert_eq!(layout.record_order(), ByteOrder::Big);
    }

    #[test]
    fn test_new_matches_pmu() {
        let layout = FieldLayout::new(40, 3, ByteOrder::Little, ByteOrder::Big).unwrap();
        assert_eq!(layout, FieldLayout::pmu());
    }

    #[test]
    fn test_stride_mismatch() {
        let err = FieldLayout::new(44, 3, ByteOrder::Little, ByteOrder::Big).unwrap_err();
        assert_eq!(
            err,
            LayoutError::StrideMismatch {
                stride: 44,
                phasor_count: 3,
                expected: 40
            }
        );
    }

    #[test]
    fn test_unsupported_phasor_count() {
        let err = FieldLayout::new(48, 4, ByteOrder::Little, ByteOrder::Big).unwrap_err();
        assert_eq!(err, LayoutError::UnsupportedPhasorCount(4));
    }

    #[test]
    #[should_panic]
    fn test_phasor_out_of_range() {
        FieldLayout::pmu().offset_of(Field::Phasor(3));
    }
}
