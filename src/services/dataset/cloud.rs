// Cloud dataset adapter: an opaque dataset id resolved by a remote service
use crate::api::middleware::AppError;
use crate::models::{DatasetKind, FieldMeta, Record, RawField};
use super::adapter::{AdapterOptions, DatasetAdapter, ExecutionHook};
use super::fields::FieldSet;
use super::handle::DatasetHandle;

pub struct CloudDatasetAdapter {
    dataset_id: String,
    fields: FieldSet,
}

impl CloudDatasetAdapter {
    pub fn from_handle(
        handle: &DatasetHandle,
        options: &AdapterOptions,
    ) -> Result<Box<dyn DatasetAdapter>, AppError> {
        let dataset_id = handle
            .downcast_ref::<String>()
            .ok_or_else(|| AppError::UnsupportedDatasetType(handle.type_name().to_string()))?;

        if dataset_id.trim().is_empty() {
            return Err(AppError::Validation("Cloud dataset id cannot be empty".to_string()));
        }

        Ok(Box::new(Self {
            dataset_id: dataset_id.clone(),
            fields: FieldSet::from_specs(&options.field_specs),
        }))
    }

    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }
}

#[async_trait::async_trait]
impl DatasetAdapter for CloudDatasetAdapter {
    fn dataset_kind(&self) -> DatasetKind {
        DatasetKind::CloudReference
    }

    async fn data_size(&self) -> Result<usize, AppError> {
        Err(AppError::NotImplemented(format!(
            "Row counting on cloud dataset {}",
            self.dataset_id
        )))
    }

    fn raw_fields(&self) -> &[RawField] {
        &self.fields.raw
    }

    fn field_metadata(&self) -> &[FieldMeta] {
        &self.fields.metas
    }

    async fn to_records(&self, _limit: Option<usize>) -> Result<Vec<Record>, AppError> {
        Err(AppError::NotImplemented(format!(
            "Record export from cloud dataset {}",
            self.dataset_id
        )))
    }

    fn execution_hook(&self) -> ExecutionHook<'_> {
        ExecutionHook::Deferred
    }
}
