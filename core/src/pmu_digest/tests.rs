#[cfg(test)]
mod unified_tests {
    use crate::pmu_digest::common::{DecodeError, PHASOR_COUNT};
    use crate::pmu_digest::digest::{decode, encode_digest, DigestHeader, TelemetryRecord};
    use crate::pmu_digest::frame::{self, TelemetrySample, FRAME_LEN};
    use crate::pmu_digest::layout::{Field, FieldLayout};
    use crate::pmu_digest::phasors::Phasor;
    use crate::pmu_digest::random::{random_digest, random_sample};
    use crate::pmu_digest::utils::Timestamp;

    use chrono::{TimeZone, Utc};
    use std::fs;
    use std::net::Ipv4Addr;
    use std::path::Path;

    // Reads a whitespace-separated hex dump from tests/test_data.
    fn read_hex_file(file_name: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let path = Path::new("tests/test_data").join(file_name);
        let content = fs::read_to_string(path)?;
        let hex_string: String = content.chars().filter(|c| !c.is_whitespace()).collect();

        if hex_string.len() % 2 != 0 {
            return Err("Invalid hex string: odd number of characters".into());
        }

        let mut result = Vec::with_capacity(hex_string.len() / 2);
        for i in (0..hex_string.len()).step_by(2) {
            result.push(u8::from_str_radix(&hex_string[i..i + 2], 16)?);
        }
        Ok(result)
    }

    #[test]
    fn test_single_record_digest_from_file() {
        let buffer = read_hex_file("digest_single_record.bin").unwrap();
        assert_eq!(buffer.len(), 72);

        let records = decode(&buffer).unwrap();
        let header = *records.header();
        assert_eq!(header.magic, 1);
        assert_eq!(header.context_id, 2);
        assert_eq!(header.list_id, 3);
        assert_eq!(header.record_count, 1);

        let decoded: Vec<_> = records.collect();
        assert_eq!(decoded.len(), 1);
        let record = &decoded[0];
        assert_eq!(record.timestamp, Timestamp::new(1, 0));
        assert_eq!(record.seconds(), 1.0);
        for phasor in record.phasors.iter() {
            assert_eq!(*phasor, Phasor::new(1.0, 0.0));
        }
        assert_eq!(record.source_address, Ipv4Addr::new(192, 168, 0, 1));
        assert_eq!(record.dest_address, Ipv4Addr::new(192, 168, 0, 2));
    }

    #[test]
    fn test_file_matches_encoder() {
        let buffer = read_hex_file("digest_single_record.bin").unwrap();
        let header = DigestHeader {
            magic: 1,
            unused: 0,
            context_id: 2,
            list_id: 3,
            buffer_id: 0,
            record_count: 1,
        };
        let record = TelemetryRecord {
            timestamp: Timestamp::new(1, 0),
            phasors: [Phasor::new(1.0, 0.0); PHASOR_COUNT],
            source_address: Ipv4Addr::new(192, 168, 0, 1),
            dest_address: Ipv4Addr::new(192, 168, 0, 2),
        };
        assert_eq!(encode_digest(&header, &[record], &FieldLayout::pmu()), buffer);
    }

    #[test]
    fn test_count_beyond_payload() {
        let mut buffer = read_hex_file("digest_single_record.bin").unwrap();
        buffer[28] = 2;
        assert_eq!(decode(&buffer).unwrap_err(), DecodeError::TruncatedRecord(1));

        // Trailing bytes past the declared records are ignored.
        let mut padded = read_hex_file("digest_single_record.bin").unwrap();
        padded.extend_from_slice(&[0xFF; 17]);
        assert_eq!(decode(&padded).unwrap().count(), 1);
    }

    #[test]
    fn test_layout_offsets_match_record_bytes() {
        let buffer = read_hex_file("digest_single_record.bin").unwrap();
        let layout = FieldLayout::pmu();
        let record = &buffer[DigestHeader::LEN..];

        let (start, len) = layout.offset_of(Field::SourceIp);
        assert_eq!(&record[start..start + len], &[192, 168, 0, 1]);
        let (start, len) = layout.offset_of(Field::DestIp);
        assert_eq!(&record[start..start + len], &[192, 168, 0, 2]);
        for i in 0..PHASOR_COUNT {
            let (start, _) = layout.offset_of(Field::Phasor(i));
            assert_eq!(&record[start..start + 4], &[0x3F, 0x80, 0x00, 0x00]);
        }
    }

    #[test]
    fn test_decode_is_restartable() {
        let (buffer, records) = random_digest(8);
        let iter = decode(&buffer).unwrap();
        let first: Vec<_> = iter.clone().collect();
        let second: Vec<_> = iter.restart().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), records.len());
    }

    #[test]
    fn test_frame_carries_sample_time() {
        let timestamp = Utc.timestamp_opt(1_700_000_000, 123_456_000).unwrap();
        let frame = frame::encode(timestamp, [1.0; 3], [0.0; 3]);
        assert_eq!(frame.len(), FRAME_LEN);

        let soc = u32::from_be_bytes([frame[6], frame[7], frame[8], frame[9]]);
        let fracsec = u32::from_be_bytes([frame[10], frame[11], frame[12], frame[13]]);
        assert_eq!(soc, 1_700_000_000);
        assert_eq!(fracsec, 123_456);
    }

    #[test]
    fn test_random_sample_frame_round_trip() {
        let sample = random_sample();
        let parsed = TelemetrySample::from_frame(&sample.to_frame()).unwrap();

        assert_eq!(
            parsed.timestamp.timestamp_micros(),
            sample.timestamp.timestamp_micros()
        );
        for i in 0..PHASOR_COUNT {
            assert_eq!(parsed.magnitudes[i], sample.magnitudes[i]);
            assert!((parsed.angles_degrees[i] - sample.angles_degrees[i]).abs() < 1e-4);
        }
    }
}
