//! # PMU Digest Telemetry
//!
//! This crate encodes PMU telemetry frames and decodes the digest buffers a programmable
//! switch returns for them. Digest records are turned into Arrow record batches so that
//! they can be persisted or analysed like any other timeseries.
//!
//! ## Submodules
//!
//! - `pmu_digest`: The wire codec.
//!   - `layout`: Record offsets and byte orders.
//!   - `phasors`: f32 magnitude/radian pairs to and from degrees.
//!   - `digest`: Digest header parsing and the lazy record iterator.
//!   - `frame`: The outbound telemetry frame.
//!   - `utils`: Timestamp and IPv4 helpers.
//!   - `random`: Generated records, digests and samples for testing.
//! - `batch`: Converts decoded records into Arrow record batches.
//! - `samples`: Reads PMU sample CSV files into `TelemetrySample` values.
//!
//! ## Usage
//!
//! The codec itself is pure and synchronous. Networking (sending frames, receiving
//! digests) lives in the `pmu_digest_cli` crate, which builds on these modules.

pub mod batch;
pub mod pmu_digest;
pub mod samples;
