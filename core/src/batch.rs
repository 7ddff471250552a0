//! # Digest Records to Arrow
//!
//! Builds Arrow record batches from decoded telemetry records. The column set is the
//! persisted format of the digest log:
//!
//! ```text
//! Datetime, Phasor0Magnitude, Phasor0Angle, ..., Phasor2Angle, SourceIP, DestIP
//! ```
//!
//! `Datetime` is a UTC microsecond timestamp built from `soc` and `fracsec` without
//! normalising the fraction. Angles are in degrees.

use crate::pmu_digest::common::PHASOR_COUNT;
use crate::pmu_digest::digest::TelemetryRecord;

use arrow::array::{ArrayRef, Float64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

pub const DATETIME_COLUMN: &str = "Datetime";
pub const SOURCE_IP_COLUMN: &str = "SourceIP";
pub const DEST_IP_COLUMN: &str = "DestIP";

/// Timezone of the `Datetime` column. A fixed offset resolves without a timezone database.
pub const UTC_OFFSET: &str = "+00:00";

pub fn magnitude_column(index: usize) -> String {
    format!("Phasor{}Magnitude", index)
}

pub fn angle_column(index: usize) -> String {
    format!("Phasor{}Angle", index)
}

/// Schema of a telemetry record batch.
pub fn telemetry_schema() -> Schema {
    let mut fields = vec![Field::new(
        DATETIME_COLUMN,
        DataType::Timestamp(TimeUnit::Microsecond, Some(UTC_OFFSET.into())),
        false,
    )];

    for i in 0..PHASOR_COUNT {
        fields.push(Field::new(magnitude_column(i), DataType::Float64, false));
        fields.push(Field::new(angle_column(i), DataType::Float64, false));
    }

    fields.push(Field::new(SOURCE_IP_COLUMN, DataType::Utf8, false));
    fields.push(Field::new(DEST_IP_COLUMN, DataType::Utf8, false));

    Schema::new(fields)
}

/// Converts records into a single record batch, one row per record in input order.
///
/// # Parameters
///
/// * `records`: Decoded records, typically one digest's worth.
///
/// # Returns
///
/// * `Ok(RecordBatch)`: A batch with the `telemetry_schema` columns.
/// * `Err(ArrowError)`: If Arrow rejects the assembled columns.
pub fn records_to_batch(records: &[TelemetryRecord]) -> Result<RecordBatch, ArrowError> {
    let schema = Arc::new(telemetry_schema());

    let timestamps = TimestampMicrosecondArray::from(
        records
            .iter()
            .map(|r| r.timestamp.as_micros())
            .collect::<Vec<_>>(),
    )
    .with_timezone(UTC_OFFSET);

    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());
    arrays.push(Arc::new(timestamps));

    for i in 0..PHASOR_COUNT {
        arrays.push(Arc::new(Float64Array::from(
            records
                .iter()
                .map(|r| r.phasors[i].magnitude)
                .collect::<Vec<_>>(),
        )));
        arrays.push(Arc::new(Float64Array::from(
            records
                .iter()
                .map(|r| r.phasors[i].angle_degrees)
                .collect::<Vec<_>>(),
        )));
    }

    arrays.push(Arc::new(StringArray::from_iter_values(
        records.iter().map(|r| r.source_address.to_string()),
    )));
    arrays.push(Arc::new(StringArray::from_iter_values(
        records.iter().map(|r| r.dest_address.to_string()),
    )));

    RecordBatch::try_new(schema, arrays)
}
