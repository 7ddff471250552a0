//! # PMU Digest Codec
//!
//! This module implements both ends of the PMU telemetry path through a programmable
//! switch: the frame a PMU emits for one sample, and the digest buffers the switch hands
//! back to its controller, each carrying a batch of fixed-size telemetry records.
//!
//! ## Submodules
//!
//! - `common`: Shared constants, the `ByteOrder` helper and the error types
//!   (`DecodeError`, `FrameError`, `LayoutError`).
//! - `layout`: `FieldLayout`, the single source of truth for record offsets and byte
//!   orders.
//! - `phasors`: Conversion between the f32 magnitude/radian wire pair and `Phasor`.
//! - `digest`: Header parsing and the lazy `DigestRecords` iterator.
//! - `frame`: The outbound telemetry frame (`encode`, `TelemetrySample`).
//! - `utils`: Timestamp and IPv4 helpers.
//! - `random`: Random records, digests and samples for tests and benchmarks.
//!
//! ## Usage
//!
//! ```no_run
//! use pmu_digest_core::pmu_digest::digest::decode;
//!
//! # let buffer: Vec<u8> = Vec::new();
//! for record in decode(&buffer)? {
//!     println!("{} {:?}", record.seconds(), record.phasors);
//! }
//! # Ok::<(), pmu_digest_core::pmu_digest::common::DecodeError>(())
//! ```

pub mod common;
pub mod digest;
pub mod frame;
pub mod layout;
pub mod phasors;
pub mod random;
pub mod utils;

#[cfg(test)]
mod tests;
