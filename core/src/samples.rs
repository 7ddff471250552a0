//! # PMU Sample Files
//!
//! Reads recorded PMU measurements from CSV into `TelemetrySample` values ready to be
//! framed and sent. Every column is read as text through Arrow's CSV reader and parsed
//! here, so files with mixed or quoted numeric formats do not depend on schema inference.
//!
//! ## Key Components
//!
//! - `SampleColumns`: Names of the timestamp, magnitude and angle columns.
//! - `read_samples_csv`: Reads a whole file into memory, in file order.
//! - `parse_timestamp`: Accepts RFC 3339 or `YYYY-MM-DD HH:MM:SS[.ffffff]` (UTC).

use crate::pmu_digest::common::PHASOR_COUNT;
use crate::pmu_digest::frame::TelemetrySample;

use arrow::array::{Array, StringArray};
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("failed to read sample file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse sample file: {0}")]
    Arrow(#[from] ArrowError),
    #[error("missing column '{0}'")]
    MissingColumn(String),
    #[error("row {row}: invalid timestamp '{value}'")]
    InvalidTimestamp { row: usize, value: String },
    #[error("row {row}: invalid number '{value}' in column '{column}'")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },
}

/// Column names of a PMU sample file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleColumns {
    pub time: String,
    pub magnitudes: [String; PHASOR_COUNT],
    pub angles: [String; PHASOR_COUNT],
}

impl Default for SampleColumns {
    fn default() -> Self {
        SampleColumns {
            time: "TimeTag".to_string(),
            magnitudes: std::array::from_fn(|i| format!("Magnitude{:02}", i + 1)),
            angles: std::array::from_fn(|i| format!("Angle{:02}", i + 1)),
        }
    }
}

/// Parses a sample timestamp as UTC, truncated to microseconds.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.with_timezone(&Utc).trunc_subsecs(6));
    }
    // `%.f` also matches an absent fraction.
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
        .ok()
        .map(|naive| naive.trunc_subsecs(6).and_utc())
}

/// Reads a PMU sample CSV file.
///
/// # Parameters
///
/// * `path`: CSV file with a header row.
/// * `columns`: Which columns hold the timestamp, magnitudes and angles (degrees).
///
/// # Returns
///
/// * `Ok(Vec<TelemetrySample>)`: One sample per data row, in file order.
/// * `Err(SampleError)`: On I/O or CSV errors, a missing column, or an unparsable value.
pub fn read_samples_csv(
    path: impl AsRef<Path>,
    columns: &SampleColumns,
) -> Result<Vec<TelemetrySample>, SampleError> {
    let mut file = File::open(path)?;

    // Only the header names are needed; every column is then read as Utf8.
    let (inferred, _) = Format::default()
        .with_header(true)
        .infer_schema(&mut file, Some(1))?;
    let schema = Schema::new(
        inferred
            .fields()
            .iter()
            .map(|f| Field::new(f.name(), DataType::Utf8, true))
            .collect::<Vec<_>>(),
    );
    file.seek(SeekFrom::Start(0))?;

    let reader = ReaderBuilder::new(Arc::new(schema))
        .with_header(true)
        .build(file)?;

    let mut samples = Vec::new();
    for batch in reader {
        let batch = batch?;
        let row_offset = samples.len();
        samples.extend(batch_to_samples(&batch, columns, row_offset)?);
    }
    Ok(samples)
}

fn text_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, SampleError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| SampleError::MissingColumn(name.to_string()))
}

fn number_at(
    array: &StringArray,
    column: &str,
    index: usize,
    row: usize,
) -> Result<f64, SampleError> {
    let value = if array.is_null(index) {
        ""
    } else {
        array.value(index)
    };
    value.trim().parse().map_err(|_| SampleError::InvalidNumber {
        row,
        column: column.to_string(),
        value: value.to_string(),
    })
}

fn batch_to_samples(
    batch: &RecordBatch,
    columns: &SampleColumns,
    row_offset: usize,
) -> Result<Vec<TelemetrySample>, SampleError> {
    let time = text_column(batch, &columns.time)?;
    let mut magnitudes = Vec::with_capacity(PHASOR_COUNT);
    let mut angles = Vec::with_capacity(PHASOR_COUNT);
    for i in 0..PHASOR_COUNT {
        magnitudes.push(text_column(batch, &columns.magnitudes[i])?);
        angles.push(text_column(batch, &columns.angles[i])?);
    }

    let mut samples = Vec::with_capacity(batch.num_rows());
    for index in 0..batch.num_rows() {
        let row = row_offset + index;
        let value = if time.is_null(index) {
            ""
        } else {
            time.value(index)
        };
        let timestamp = parse_timestamp(value).ok_or_else(|| SampleError::InvalidTimestamp {
            row,
            value: value.to_string(),
        })?;

        let mut sample = TelemetrySample::new(timestamp, [0.0; PHASOR_COUNT], [0.0; PHASOR_COUNT]);
        for i in 0..PHASOR_COUNT {
            sample.magnitudes[i] = number_at(magnitudes[i], &columns.magnitudes[i], index, row)?;
            sample.angles_degrees[i] = number_at(angles[i], &columns.angles[i], index, row)?;
        }
        samples.push(sample);
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_columns() {
        let columns = SampleColumns::default();
        assert_eq!(columns.time, "TimeTag");
        assert_eq!(columns.magnitudes[0], "Magnitude01");
        assert_eq!(columns.angles[2], "Angle03");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(
            parse_timestamp("2023-11-14 22:13:20.500000"),
            Some(Utc.timestamp_opt(1_700_000_000, 500_000_000).unwrap())
        );
        assert_eq!(
            parse_timestamp("2023-11-14 22:13:20"),
            Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap())
        );
        assert_eq!(
            parse_timestamp("2023-11-14T22:13:20.25Z"),
            Some(Utc.timestamp_opt(1_700_000_000, 250_000_000).unwrap())
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_parse_timestamp_truncates_nanos() {
        let parsed = parse_timestamp("2023-11-14 22:13:20.123456789").unwrap();
        assert_eq!(parsed.timestamp_subsec_micros(), 123_456);
        assert_eq!(parsed.timestamp_subsec_nanos(), 123_456_000);
    }
}
