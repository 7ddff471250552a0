//! # Digest Decoding
//!
//! This module parses the digest buffers that the switch delivers to its controller.
//! A digest is a 32-byte header followed by `record_count` fixed-size telemetry records:
//!
//! ```text
//! magic:i32 | unused:u64 | context_id:i32 | list_id:i32 | buffer_id:u64 | record_count:i32
//! ```
//!
//! Header integers are little-endian while record payloads are big-endian. Both orders
//! come from the `FieldLayout`, so the asymmetry is explicit rather than implied.
//!
//! ## Key Components
//!
//! - `DigestHeader`: The parsed 32-byte header.
//! - `TelemetryRecord`: One decoded record (timestamp, three phasors, two addresses).
//! - `decode` / `decode_with_layout`: Validate a buffer and return a lazy record iterator.
//! - `DigestRecords`: Finite iterator over the records of one buffer, in buffer order.
//! - `encode_digest`: Builds digest bytes from a header and records (switch side).
//!
//! ## Usage
//!
//! Decoding is a pure function of the input bytes. All bounds are checked before the
//! iterator is returned, so an error aborts the whole buffer and a successful call never
//! yields a partial record.

use super::common::{take, ByteOrder, DecodeError, DIGEST_HEADER_LEN, PHASOR_COUNT};
use super::layout::{Field, FieldLayout};
use super::phasors::{decode_phasor, Phasor};
use super::utils::{ipv4_from_hex, ipv4_to_hex, Timestamp};

use serde::{Deserialize, Serialize};
use std::iter::FusedIterator;
use std::net::Ipv4Addr;

/// The fixed 32-byte header of a digest buffer.
///
/// # Fields
///
/// * `magic`: Message type tag set by the switch.
/// * `unused`: Reserved, carried through untouched.
/// * `context_id`: Switch device context.
/// * `list_id`: Digest list (learn list) identifier.
/// * `buffer_id`: Monotonic buffer number assigned by the switch.
/// * `record_count`: Number of records following the header, signed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestHeader {
    pub magic: i32,
    pub unused: u64,
    pub context_id: i32,
    pub list_id: i32,
    pub buffer_id: u64,
    pub record_count: i32,
}

impl DigestHeader {
    pub const LEN: usize = DIGEST_HEADER_LEN;

    /// Parses a header from the first 32 bytes of `bytes`.
    ///
    /// # Returns
    ///
    /// * `Ok(DigestHeader)`: The parsed header. `record_count` is not validated here.
    /// * `Err(DecodeError::TruncatedHeader)`: If fewer than 32 bytes are available.
    pub fn from_hex(bytes: &[u8], layout: &FieldLayout) -> Result<Self, DecodeError> {
        if bytes.len() < Self::LEN {
            return Err(DecodeError::TruncatedHeader { len: bytes.len() });
        }
        let order = layout.header_order();

        Ok(DigestHeader {
            magic: order.read_i32(take::<4>(bytes, 0)),
            unused: order.read_u64(take::<8>(bytes, 4)),
            context_id: order.read_i32(take::<4>(bytes, 12)),
            list_id: order.read_i32(take::<4>(bytes, 16)),
            buffer_id: order.read_u64(take::<8>(bytes, 20)),
            record_count: order.read_i32(take::<4>(bytes, 28)),
        })
    }

    pub fn to_hex(&self, layout: &FieldLayout) -> [u8; 32] {
        let order = layout.header_order();
        let mut result = [0u8; 32];
        result[0..4].copy_from_slice(&order.i32_bytes(self.magic));
        result[4..12].copy_from_slice(&order.u64_bytes(self.unused));
        result[12..16].copy_from_slice(&order.i32_bytes(self.context_id));
        result[16..20].copy_from_slice(&order.i32_bytes(self.list_id));
        result[20..28].copy_from_slice(&order.u64_bytes(self.buffer_id));
        result[28..32].copy_from_slice(&order.i32_bytes(self.record_count));
        result
    }
}

/// One decoded telemetry record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub timestamp: Timestamp,
    pub phasors: [Phasor; PHASOR_COUNT],
    pub source_address: Ipv4Addr,
    pub dest_address: Ipv4Addr,
}

impl TelemetryRecord {
    /// Decodes one record from `bytes` using the offsets of `layout`.
    ///
    /// Returns `None` when `bytes` is shorter than the layout stride.
    pub fn from_hex(bytes: &[u8], layout: &FieldLayout) -> Option<Self> {
        if bytes.len() < layout.stride() {
            return None;
        }
        Some(decode_record(bytes, layout))
    }

    /// Serializes the record in the layout's payload byte order.
    pub fn to_hex(&self, layout: &FieldLayout) -> Vec<u8> {
        let order = layout.record_order();
        let mut result = vec![0u8; layout.stride()];

        let (start, _) = layout.offset_of(Field::Soc);
        result[start..start + 4].copy_from_slice(&order.u32_bytes(self.timestamp.soc));
        let (start, _) = layout.offset_of(Field::FracSec);
        result[start..start + 4].copy_from_slice(&order.u32_bytes(self.timestamp.fracsec));

        for (i, phasor) in self.phasors.iter().enumerate() {
            let (start, len) = layout.offset_of(Field::Phasor(i));
            let magnitude = order.f32_bytes(phasor.magnitude as f32);
            let angle = order.f32_bytes(phasor.angle_radians() as f32);
            result[start..start + 4].copy_from_slice(&magnitude);
            result[start + 4..start + len].copy_from_slice(&angle);
        }

        let (start, _) = layout.offset_of(Field::SourceIp);
        result[start..start + 4].copy_from_slice(&ipv4_to_hex(self.source_address));
        let (start, _) = layout.offset_of(Field::DestIp);
        result[start..start + 4].copy_from_slice(&ipv4_to_hex(self.dest_address));

        result
    }

    /// Timestamp as fractional seconds since the epoch.
    pub fn seconds(&self) -> f64 {
        self.timestamp.as_secs_f64()
    }
}

// `record` must hold at least `layout.stride()` bytes.
fn decode_record(record: &[u8], layout: &FieldLayout) -> TelemetryRecord {
    let order = layout.record_order();

    let (soc_at, _) = layout.offset_of(Field::Soc);
    let (fracsec_at, _) = layout.offset_of(Field::FracSec);
    let timestamp = Timestamp::new(
        order.read_u32(take::<4>(record, soc_at)),
        order.read_u32(take::<4>(record, fracsec_at)),
    );

    let phasors: [Phasor; PHASOR_COUNT] = std::array::from_fn(|i| {
        let (start, _) = layout.offset_of(Field::Phasor(i));
        match order {
            ByteOrder::Big => decode_phasor(take::<8>(record, start)),
            ByteOrder::Little => {
                let magnitude = order.read_f32(take::<4>(record, start));
                let radians = order.read_f32(take::<4>(record, start + 4));
                Phasor::new(magnitude as f64, (radians as f64).to_degrees())
            }
        }
    });

    let (source_at, _) = layout.offset_of(Field::SourceIp);
    let (dest_at, _) = layout.offset_of(Field::DestIp);

    TelemetryRecord {
        timestamp,
        phasors,
        source_address: ipv4_from_hex(take::<4>(record, source_at)),
        dest_address: ipv4_from_hex(take::<4>(record, dest_at)),
    }
}

/// Lazy iterator over the records of one validated digest buffer.
///
/// The iterator only borrows the buffer. Clones walk the same bytes independently and
/// `restart` begins again at record 0.
#[derive(Debug, Clone)]
pub struct DigestRecords<'a> {
    header: DigestHeader,
    payload: &'a [u8],
    layout: FieldLayout,
    index: usize,
    count: usize,
}

impl<'a> DigestRecords<'a> {
    pub fn header(&self) -> &DigestHeader {
        &self.header
    }

    /// Number of records declared by the header.
    pub fn record_count(&self) -> usize {
        self.count
    }

    /// Returns a fresh iterator positioned at the first record.
    pub fn restart(&self) -> Self {
        DigestRecords {
            index: 0,
            ..self.clone()
        }
    }
}

impl<'a> Iterator for DigestRecords<'a> {
    type Item = TelemetryRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.count {
            return None;
        }
        let stride = self.layout.stride();
        let start = self.index * stride;
        let record = decode_record(&self.payload[start..start + stride], &self.layout);
        self.index += 1;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for DigestRecords<'_> {}

impl FusedIterator for DigestRecords<'_> {}

/// Decodes a digest buffer with the switch's record layout.
///
/// # Parameters
///
/// * `buffer`: The raw digest as delivered by the transport.
///
/// # Returns
///
/// * `Ok(DigestRecords)`: Iterator over exactly `record_count` records.
/// * `Err(DecodeError)`: `TruncatedHeader`, `InvalidRecordCount` or `TruncatedRecord`.
pub fn decode(buffer: &[u8]) -> Result<DigestRecords<'_>, DecodeError> {
    decode_with_layout(buffer, &FieldLayout::pmu())
}

/// Decodes a digest buffer with an explicit record layout.
///
/// Bytes past the last declared record are ignored.
pub fn decode_with_layout<'a>(
    buffer: &'a [u8],
    layout: &FieldLayout,
) -> Result<DigestRecords<'a>, DecodeError> {
    let header = DigestHeader::from_hex(buffer, layout)?;

    if header.record_count < 0 {
        return Err(DecodeError::InvalidRecordCount(header.record_count));
    }
    let count = header.record_count as usize;

    let payload = &buffer[DigestHeader::LEN..];
    let available = payload.len() / layout.stride();
    if count > available {
        // Records 0..available fit, so `available` is the first one that does not.
        return Err(DecodeError::TruncatedRecord(available));
    }

    Ok(DigestRecords {
        header,
        payload,
        layout: *layout,
        index: 0,
        count,
    })
}

/// Builds a digest buffer: `header` followed by each record in `records`.
///
/// The header is written as given, so its `record_count` may disagree with
/// `records.len()`; callers building test fixtures rely on that.
pub fn encode_digest(
    header: &DigestHeader,
    records: &[TelemetryRecord],
    layout: &FieldLayout,
) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(DigestHeader::LEN + records.len() * layout.stride());
    buffer.extend_from_slice(&header.to_hex(layout));
    for record in records {
        buffer.extend_from_slice(&record.to_hex(layout));
    }
    buffer
}
