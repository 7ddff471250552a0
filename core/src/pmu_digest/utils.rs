//! # Timestamp and Address Helpers
//!
//! Functions for the two fixed-width record fields that are not phasors: the
//! `soc`/`fracsec` timestamp pair and the raw IPv4 endpoint addresses.
//!
//! `fracsec` is always a count of microseconds. It is never range-checked, so a value of
//! 1_000_000 or more yields a timestamp whose "fraction" spans more than a second. This
//! mirrors what PMUs on the switch actually emit and is kept as observed.

use super::common::{take, ByteOrder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

pub const MICROS_PER_SECOND: u32 = 1_000_000;

/// A record timestamp as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// Whole seconds since the UNIX epoch.
    pub soc: u32,
    /// Microseconds, unbounded.
    pub fracsec: u32,
}

impl Timestamp {
    pub fn new(soc: u32, fracsec: u32) -> Self {
        Timestamp { soc, fracsec }
    }

    /// Parses the 8-byte `soc` + `fracsec` pair.
    pub fn from_hex(bytes: &[u8; 8], order: ByteOrder) -> Self {
        Timestamp {
            soc: order.read_u32(take::<4>(bytes, 0)),
            fracsec: order.read_u32(take::<4>(bytes, 4)),
        }
    }

    pub fn to_hex(&self, order: ByteOrder) -> [u8; 8] {
        let mut buf = [0u8; 8];
        buf[0..4].copy_from_slice(&order.u32_bytes(self.soc));
        buf[4..8].copy_from_slice(&order.u32_bytes(self.fracsec));
        buf
    }

    /// Splits a UTC time into whole seconds and the microsecond component.
    ///
    /// Seconds are truncated, then reduced modulo 2^32 to fit the 4-byte `soc` field.
    pub fn from_datetime(datetime: &DateTime<Utc>) -> Self {
        Timestamp {
            soc: datetime.timestamp() as u32,
            fracsec: datetime.timestamp_subsec_micros(),
        }
    }

    /// Seconds since the epoch: `soc + fracsec / 1_000_000`.
    pub fn as_secs_f64(&self) -> f64 {
        self.soc as f64 + self.fracsec as f64 / MICROS_PER_SECOND as f64
    }

    /// Microseconds since the epoch, exact for every `soc`/`fracsec` pair.
    pub fn as_micros(&self) -> i64 {
        self.soc as i64 * MICROS_PER_SECOND as i64 + self.fracsec as i64
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_micros(self.as_micros())
    }
}

/// Reads four bytes in network order as an IPv4 address.
pub fn ipv4_from_hex(bytes: [u8; 4]) -> Ipv4Addr {
    Ipv4Addr::from(bytes)
}

pub fn ipv4_to_hex(address: Ipv4Addr) -> [u8; 4] {
    address.octets()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_reconstruction() {
        let timestamp = Timestamp::new(1_700_000_000, 500_000);
        assert_eq!(timestamp.as_secs_f64(), 1_700_000_000.5);
        assert_eq!(timestamp.as_micros(), 1_700_000_000_500_000);
    }

    #[test]
    fn test_fracsec_overflow_is_kept() {
        // 1.5 s worth of microseconds in the fraction field
        let timestamp = Timestamp::new(10, 1_500_000);
        assert_eq!(timestamp.fracsec, 1_500_000);
        assert_eq!(timestamp.as_secs_f64(), 11.5);
        assert_eq!(
            timestamp.to_datetime().unwrap(),
            Utc.timestamp_opt(11, 500_000_000).unwrap()
        );
    }

    #[test]
    fn test_from_hex_big_endian() {
        let bytes: [u8; 8] = [
            0x65, 0x53, 0xF1, 0x00, // SOC: 1_700_000_000
            0x00, 0x07, 0xA1, 0x20, // FRACSEC: 500_000
        ];
        let timestamp = Timestamp::from_hex(&bytes, ByteOrder::Big);
        assert_eq!(timestamp, Timestamp::new(1_700_000_000, 500_000));
        assert_eq!(timestamp.to_hex(ByteOrder::Big), bytes);
    }

    #[test]
    fn test_from_datetime_truncates_to_micros() {
        let datetime = Utc.timestamp_opt(1_672_531_200, 654_321_999).unwrap();
        let timestamp = Timestamp::from_datetime(&datetime);
        assert_eq!(timestamp.soc, 1_672_531_200);
        assert_eq!(timestamp.fracsec, 654_321);
    }

    #[test]
    fn test_ipv4_helpers() {
        let address = ipv4_from_hex([192, 168, 0, 1]);
        assert_eq!(address, Ipv4Addr::new(192, 168, 0, 1));
        assert_eq!(ipv4_to_hex(address), [192, 168, 0, 1]);
    }
}
