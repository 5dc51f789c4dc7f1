// JSON records adapter
//
// Row-oriented in-process data (`Vec<Record>`). Rows are converted once into an
// Arrow batch so the embedded engine can query them; exports return the
// original rows.

use std::sync::Arc;

use datafusion::arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use datafusion::arrow::datatypes::{DataType, Field, Schema};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::datasource::{MemTable, TableProvider};
use serde_json::Value;

use crate::api::middleware::AppError;
use crate::models::{DatasetKind, FieldMeta, Record, RawField};
use super::adapter::{AdapterOptions, DatasetAdapter, ExecutionHook};
use super::fields::FieldSet;
use super::handle::DatasetHandle;

pub struct JsonRecordsAdapter {
    rows: Arc<Vec<Record>>,
    table: Arc<MemTable>,
    fields: FieldSet,
}

impl JsonRecordsAdapter {
    pub fn from_handle(
        handle: &DatasetHandle,
        options: &AdapterOptions,
    ) -> Result<Box<dyn DatasetAdapter>, AppError> {
        let rows = handle
            .downcast_arc::<Vec<Record>>()
            .ok_or_else(|| AppError::UnsupportedDatasetType(handle.type_name().to_string()))?;

        Ok(Box::new(Self::try_new(rows, options)?))
    }

    pub fn try_new(rows: Arc<Vec<Record>>, options: &AdapterOptions) -> Result<Self, AppError> {
        let batch = records_to_batch(&rows)?;
        let schema = batch.schema();
        let table = MemTable::try_new(schema.clone(), vec![vec![batch]])
            .map_err(|e| AppError::Validation(format!("Failed to build table from records: {}", e)))?;
        let fields = FieldSet::from_schema(&schema, &options.field_specs);

        Ok(Self {
            rows,
            table: Arc::new(table),
            fields,
        })
    }
}

#[async_trait::async_trait]
impl DatasetAdapter for JsonRecordsAdapter {
    fn dataset_kind(&self) -> DatasetKind {
        DatasetKind::EmbeddedColumnar
    }

    async fn data_size(&self) -> Result<usize, AppError> {
        Ok(self.rows.len())
    }

    fn raw_fields(&self) -> &[RawField] {
        &self.fields.raw
    }

    fn field_metadata(&self) -> &[FieldMeta] {
        &self.fields.metas
    }

    async fn to_records(&self, limit: Option<usize>) -> Result<Vec<Record>, AppError> {
        let take = limit.unwrap_or(self.rows.len());
        Ok(self.rows.iter().take(take).cloned().collect())
    }

    fn execution_hook(&self) -> ExecutionHook<'_> {
        let table: Arc<dyn TableProvider> = self.table.clone();
        ExecutionHook::Embedded(table)
    }
}

/// Column type inferred from the non-null values of one column
#[derive(Debug, Clone, Copy, PartialEq)]
enum ColumnType {
    Unknown,
    Int,
    Float,
    Bool,
    Text,
}

impl ColumnType {
    fn widen(self, value: &Value) -> Self {
        let seen = match value {
            Value::Null => return self,
            Value::Bool(_) => ColumnType::Bool,
            Value::Number(n) if n.is_i64() => ColumnType::Int,
            Value::Number(_) => ColumnType::Float,
            _ => ColumnType::Text,
        };

        match (self, seen) {
            (ColumnType::Unknown, seen) => seen,
            (current, seen) if current == seen => current,
            (ColumnType::Int, ColumnType::Float) | (ColumnType::Float, ColumnType::Int) => {
                ColumnType::Float
            }
            _ => ColumnType::Text,
        }
    }

    fn data_type(self) -> DataType {
        match self {
            ColumnType::Int => DataType::Int64,
            ColumnType::Float => DataType::Float64,
            ColumnType::Bool => DataType::Boolean,
            ColumnType::Unknown | ColumnType::Text => DataType::Utf8,
        }
    }
}

/// Convert rows into one Arrow batch.
///
/// Columns appear in first-seen order across rows; a key missing from a row is null.
pub fn records_to_batch(rows: &[Record]) -> Result<RecordBatch, AppError> {
    let mut columns: Vec<(String, ColumnType)> = Vec::new();

    for row in rows {
        for (key, value) in row {
            match columns.iter_mut().find(|(name, _)| name == key) {
                Some(column) => column.1 = column.1.widen(value),
                None => columns.push((key.clone(), ColumnType::Unknown.widen(value))),
            }
        }
    }

    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, column_type)| Field::new(name, column_type.data_type(), true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let arrays: Vec<ArrayRef> = columns
        .iter()
        .map(|(name, column_type)| {
            let values = rows.iter().map(|row| row.get(name).filter(|v| !v.is_null()));
            let array: ArrayRef = match column_type {
                ColumnType::Int => Arc::new(Int64Array::from(
                    values.map(|v| v.and_then(Value::as_i64)).collect::<Vec<_>>(),
                )),
                ColumnType::Float => Arc::new(Float64Array::from(
                    values.map(|v| v.and_then(Value::as_f64)).collect::<Vec<_>>(),
                )),
                ColumnType::Bool => Arc::new(BooleanArray::from(
                    values.map(|v| v.and_then(Value::as_bool)).collect::<Vec<_>>(),
                )),
                ColumnType::Unknown | ColumnType::Text => Arc::new(StringArray::from(
                    values
                        .map(|v| {
                            v.map(|v| match v {
                                Value::String(s) => s.clone(),
                                other => other.to_string(),
                            })
                        })
                        .collect::<Vec<_>>(),
                )),
            };
            array
        })
        .collect();

    if arrays.is_empty() {
        // A batch without columns cannot carry a row count through the engine.
        if !rows.is_empty() {
            return Err(AppError::Validation(format!(
                "{} record(s) have no fields to query",
                rows.len()
            )));
        }
        return Ok(RecordBatch::new_empty(schema));
    }

    RecordBatch::try_new(schema, arrays)
        .map_err(|e| AppError::Validation(format!("Failed to create RecordBatch: {}", e)))
}
