// DataFusion ResultConverter
//
// Turns Arrow record batches into row records by zipping each row's values
// with the batch's column names, in schema order.

use datafusion::arrow::array::*;
use datafusion::arrow::datatypes::{DataType, TimeUnit};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::arrow::util::display::array_value_to_string;
use serde_json::{json, Value as JsonValue};
use anyhow::{Result, Context, anyhow};
use chrono::{DateTime, NaiveDate};

use crate::models::Record;

/// Days between 0001-01-01 (CE day 1) and the Unix epoch
const UNIX_EPOCH_CE_DAYS: i32 = 719_163;

macro_rules! downcast_value {
    ($array:expr, $row:expr, $ty:ty) => {{
        let typed = $array
            .as_any()
            .downcast_ref::<$ty>()
            .ok_or_else(|| anyhow!("Failed to downcast to {}", stringify!($ty)))?;
        typed.value($row)
    }};
}

/// Converts Arrow query results into records
pub struct DataFusionResultConverter;

impl DataFusionResultConverter {
    /// Convert every row of every batch, preserving batch and row order
    pub fn batches_to_records(batches: &[RecordBatch]) -> Result<Vec<Record>> {
        let total = batches.iter().map(|b| b.num_rows()).sum();
        let mut records = Vec::with_capacity(total);

        for batch in batches {
            records.extend(Self::batch_to_records(batch)?);
        }

        Ok(records)
    }

    /// Convert at most `limit` rows, walking batches in order
    pub fn batches_to_records_limited(
        batches: &[RecordBatch],
        limit: Option<usize>,
    ) -> Result<Vec<Record>> {
        let Some(limit) = limit else {
            return Self::batches_to_records(batches);
        };

        let mut records = Vec::with_capacity(limit);
        for batch in batches {
            let remaining = limit - records.len();
            if remaining == 0 {
                break;
            }
            let take = remaining.min(batch.num_rows());
            records.extend(Self::batch_to_records(&batch.slice(0, take))?);
        }

        Ok(records)
    }

    /// Convert a single RecordBatch to records
    pub fn batch_to_records(batch: &RecordBatch) -> Result<Vec<Record>> {
        let schema = batch.schema();
        let mut records = Vec::with_capacity(batch.num_rows());

        for row_idx in 0..batch.num_rows() {
            let mut record = Record::with_capacity(batch.num_columns());

            for (col_idx, field) in schema.fields().iter().enumerate() {
                let value = Self::array_value_to_json(batch.column(col_idx), row_idx)
                    .with_context(|| format!("Failed to convert column '{}'", field.name()))?;
                record.insert(field.name().clone(), value);
            }

            records.push(record);
        }

        Ok(records)
    }

    /// Convert a single array value to JSON
    fn array_value_to_json(array: &ArrayRef, row_idx: usize) -> Result<JsonValue> {
        if array.is_null(row_idx) {
            return Ok(JsonValue::Null);
        }

        let value = match array.data_type() {
            DataType::Boolean => json!(downcast_value!(array, row_idx, BooleanArray)),

            DataType::Int8 => json!(downcast_value!(array, row_idx, Int8Array)),
            DataType::Int16 => json!(downcast_value!(array, row_idx, Int16Array)),
            DataType::Int32 => json!(downcast_value!(array, row_idx, Int32Array)),
            DataType::Int64 => json!(downcast_value!(array, row_idx, Int64Array)),
            DataType::UInt8 => json!(downcast_value!(array, row_idx, UInt8Array)),
            DataType::UInt16 => json!(downcast_value!(array, row_idx, UInt16Array)),
            DataType::UInt32 => json!(downcast_value!(array, row_idx, UInt32Array)),
            DataType::UInt64 => json!(downcast_value!(array, row_idx, UInt64Array)),

            DataType::Float32 => json!(downcast_value!(array, row_idx, Float32Array)),
            DataType::Float64 => json!(downcast_value!(array, row_idx, Float64Array)),

            DataType::Decimal128(_, scale) => {
                let raw = downcast_value!(array, row_idx, Decimal128Array);
                json!(raw as f64 / 10_f64.powi(*scale as i32))
            }

            DataType::Utf8 => json!(downcast_value!(array, row_idx, StringArray)),
            DataType::LargeUtf8 => json!(downcast_value!(array, row_idx, LargeStringArray)),
            DataType::Utf8View => json!(downcast_value!(array, row_idx, StringViewArray)),

            DataType::Date32 => {
                let days = downcast_value!(array, row_idx, Date32Array);
                let date = NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_CE_DAYS)
                    .ok_or_else(|| anyhow!("Invalid date value"))?;
                json!(date.format("%Y-%m-%d").to_string())
            }
            DataType::Date64 => {
                let millis = downcast_value!(array, row_idx, Date64Array);
                let datetime = DateTime::from_timestamp_millis(millis)
                    .ok_or_else(|| anyhow!("Invalid date value"))?;
                json!(datetime.format("%Y-%m-%d").to_string())
            }

            DataType::Timestamp(unit, _) => {
                let timestamp = match unit {
                    TimeUnit::Second => {
                        DateTime::from_timestamp(downcast_value!(array, row_idx, TimestampSecondArray), 0)
                    }
                    TimeUnit::Millisecond => DateTime::from_timestamp_millis(
                        downcast_value!(array, row_idx, TimestampMillisecondArray),
                    ),
                    TimeUnit::Microsecond => DateTime::from_timestamp_micros(
                        downcast_value!(array, row_idx, TimestampMicrosecondArray),
                    ),
                    TimeUnit::Nanosecond => Some(DateTime::from_timestamp_nanos(
                        downcast_value!(array, row_idx, TimestampNanosecondArray),
                    )),
                };

                let dt = timestamp.ok_or_else(|| anyhow!("Invalid timestamp value"))?;
                json!(dt.to_rfc3339())
            }

            // Lists, structs, binary, durations...
            _ => json!(array_value_to_string(array, row_idx)?),
        };

        Ok(value)
    }
}
