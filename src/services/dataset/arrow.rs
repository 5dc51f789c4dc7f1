// Arrow batch adapter: in-process columnar data queried through the embedded engine
use std::sync::Arc;

use datafusion::arrow::datatypes::SchemaRef;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::datasource::{MemTable, TableProvider};

use crate::api::middleware::AppError;
use crate::models::{DatasetKind, FieldMeta, Record, RawField};
use crate::services::datafusion::DataFusionResultConverter;
use super::adapter::{AdapterOptions, DatasetAdapter, ExecutionHook};
use super::fields::FieldSet;
use super::handle::DatasetHandle;

pub struct ArrowBatchAdapter {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
    table: Arc<MemTable>,
    fields: FieldSet,
}

impl ArrowBatchAdapter {
    /// Build from a `RecordBatch` or a non-empty `Vec<RecordBatch>` handle
    pub fn from_handle(
        handle: &DatasetHandle,
        options: &AdapterOptions,
    ) -> Result<Box<dyn DatasetAdapter>, AppError> {
        let batches = if let Some(batch) = handle.downcast_ref::<RecordBatch>() {
            vec![batch.clone()]
        } else if let Some(batches) = handle.downcast_ref::<Vec<RecordBatch>>() {
            batches.clone()
        } else {
            return Err(AppError::UnsupportedDatasetType(handle.type_name().to_string()));
        };

        let schema = batches
            .first()
            .map(|batch| batch.schema())
            .ok_or_else(|| {
                AppError::Validation("An empty batch list carries no schema".to_string())
            })?;

        Ok(Box::new(Self::try_new(schema, batches, options)?))
    }

    pub fn try_new(
        schema: SchemaRef,
        batches: Vec<RecordBatch>,
        options: &AdapterOptions,
    ) -> Result<Self, AppError> {
        let table = MemTable::try_new(schema.clone(), vec![batches.clone()])
            .map_err(|e| AppError::Validation(format!("Inconsistent record batches: {}", e)))?;
        let fields = FieldSet::from_schema(&schema, &options.field_specs);

        Ok(Self {
            schema,
            batches,
            table: Arc::new(table),
            fields,
        })
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.batches.iter().map(|batch| batch.num_rows()).sum()
    }
}

#[async_trait::async_trait]
impl DatasetAdapter for ArrowBatchAdapter {
    fn dataset_kind(&self) -> DatasetKind {
        DatasetKind::EmbeddedColumnar
    }

    async fn data_size(&self) -> Result<usize, AppError> {
        Ok(self.row_count())
    }

    fn raw_fields(&self) -> &[RawField] {
        &self.fields.raw
    }

    fn field_metadata(&self) -> &[FieldMeta] {
        &self.fields.metas
    }

    async fn to_records(&self, limit: Option<usize>) -> Result<Vec<Record>, AppError> {
        Ok(DataFusionResultConverter::batches_to_records_limited(&self.batches, limit)?)
    }

    fn execution_hook(&self) -> ExecutionHook<'_> {
        let table: Arc<dyn TableProvider> = self.table.clone();
        ExecutionHook::Embedded(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafusion::arrow::array::{Int64Array, StringArray};
    use datafusion::arrow::datatypes::{DataType, Field, Schema};
    use serde_json::json;

    fn batch(values: Vec<i64>) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("x", DataType::Int64, false),
            Field::new("label", DataType::Utf8, false),
        ]));
        let labels: Vec<String> = values.iter().map(|v| format!("row{}", v)).collect();
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(values)),
                Arc::new(StringArray::from(labels)),
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_single_batch_handle() {
        let handle = DatasetHandle::new(batch(vec![1, 2, 3]));
        let adapter = ArrowBatchAdapter::from_handle(&handle, &AdapterOptions::default()).unwrap();

        assert_eq!(adapter.dataset_kind(), DatasetKind::EmbeddedColumnar);
        assert_eq!(adapter.data_size().await.unwrap(), 3);
        assert_eq!(adapter.raw_fields().len(), 2);
        assert_eq!(adapter.raw_fields()[0].fid, "x");
        assert!(matches!(adapter.execution_hook(), ExecutionHook::Embedded(_)));
    }

    #[tokio::test]
    async fn test_to_records_with_limit() {
        let handle = DatasetHandle::new(vec![batch(vec![1, 2]), batch(vec![3])]);
        let adapter = ArrowBatchAdapter::from_handle(&handle, &AdapterOptions::default()).unwrap();

        let all = adapter.to_records(None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2]["x"], json!(3));

        let limited = adapter.to_records(Some(2)).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[1]["label"], json!("row2"));
    }

    #[test]
    fn test_empty_batch_list_is_rejected() {
        let handle = DatasetHandle::new(Vec::<RecordBatch>::new());
        let result = ArrowBatchAdapter::from_handle(&handle, &AdapterOptions::default());
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_raw_fields_are_stable() {
        let handle = DatasetHandle::new(batch(vec![1]));
        let adapter = ArrowBatchAdapter::from_handle(&handle, &AdapterOptions::default()).unwrap();
        assert_eq!(adapter.raw_fields(), adapter.raw_fields());
    }
}
