//! # Random Digest Generator
//!
//! Utilities for generating random telemetry records, digest buffers and samples for
//! tests and benchmarks. Phasor values are drawn directly in f32 so that a generated
//! record survives an encode/decode cycle without precision loss.
//!
//! ## Key Components
//!
//! - `random_phasor`: A phasor with a transmission-level magnitude and a random angle.
//! - `random_record`: A record with a recent timestamp and private-range addresses.
//! - `random_digest`: A complete digest buffer together with the records it carries.
//! - `random_sample`: A `TelemetrySample` stamped with the current time.

use super::common::PHASOR_COUNT;
use super::digest::{encode_digest, DigestHeader, TelemetryRecord};
use super::frame::TelemetrySample;
use super::layout::FieldLayout;
use super::phasors::Phasor;
use super::utils::{Timestamp, MICROS_PER_SECOND};

use chrono::Utc;
use rand::Rng;
use std::f32::consts::PI;
use std::net::Ipv4Addr;

const DIGEST_MAGIC: i32 = 1;

/// Generates a phasor with a magnitude around 250 kV and an angle in (-180, 180] degrees.
pub fn random_phasor() -> Phasor {
    let mut rng = rand::rng();
    let magnitude: f32 = rng.random_range(200_000.0..300_000.0);
    let radians: f32 = rng.random_range(-PI..PI);
    Phasor::new(magnitude as f64, (radians as f64).to_degrees())
}

/// Generates a record from a PMU in 10.0.0.0/16 toward a collector in 10.1.0.0/16.
pub fn random_record() -> TelemetryRecord {
    let mut rng = rand::rng();
    let now = Utc::now().timestamp() as u32;

    TelemetryRecord {
        timestamp: Timestamp::new(
            now.wrapping_sub(rng.random_range(0..3_600)),
            rng.random_range(0..MICROS_PER_SECOND),
        ),
        phasors: std::array::from_fn(|_| random_phasor()),
        source_address: Ipv4Addr::new(10, 0, rng.random(), rng.random_range(1..255)),
        dest_address: Ipv4Addr::new(10, 1, rng.random(), rng.random_range(1..255)),
    }
}

/// Generates a digest buffer with `count` records in the switch layout.
///
/// # Returns
///
/// The encoded buffer and the records it was built from, in buffer order.
pub fn random_digest(count: usize) -> (Vec<u8>, Vec<TelemetryRecord>) {
    let mut rng = rand::rng();
    let layout = FieldLayout::pmu();
    let records: Vec<TelemetryRecord> = (0..count).map(|_| random_record()).collect();

    let header = DigestHeader {
        magic: DIGEST_MAGIC,
        unused: 0,
        context_id: 0,
        list_id: rng.random_range(1..16),
        buffer_id: rng.random(),
        record_count: count as i32,
    };

    (encode_digest(&header, &records, &layout), records)
}

/// Generates a sample stamped with the current time.
pub fn random_sample() -> TelemetrySample {
    let phasors: [Phasor; PHASOR_COUNT] = std::array::from_fn(|_| random_phasor());
    TelemetrySample::new(
        Utc::now(),
        phasors.map(|p| p.magnitude),
        phasors.map(|p| p.angle_degrees),
    )
}
