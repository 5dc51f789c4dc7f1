// Dataset adapter trait for multi-backend support
use std::sync::Arc;

use datafusion::datasource::TableProvider;

use crate::api::middleware::AppError;
use crate::models::{DatasetKind, FieldMeta, FieldSpec, Record, RawField};
use super::distributed::DistributedFrame;

/// Options applied when an adapter is built from a dataset handle
#[derive(Debug, Clone, Default)]
pub struct AdapterOptions {
    /// Per-field overrides of inferred roles and display names
    pub field_specs: Vec<FieldSpec>,
}

impl AdapterOptions {
    pub fn with_field_specs(field_specs: Vec<FieldSpec>) -> Self {
        Self { field_specs }
    }
}

/// Backend-specific handle the query router uses to execute against an adapter
pub enum ExecutionHook<'a> {
    /// Frame that can be registered in the embedded engine
    Embedded(Arc<dyn TableProvider>),
    /// Frame living on a distributed engine
    Distributed(&'a DistributedFrame),
    /// Backend whose execution is not available yet
    Deferred,
}

/// Uniform capability view over one dataset representation
#[async_trait::async_trait]
pub trait DatasetAdapter: Send + Sync {
    /// Execution model; fixed for the adapter's lifetime
    fn dataset_kind(&self) -> DatasetKind;

    /// Number of rows
    async fn data_size(&self) -> Result<usize, AppError>;

    /// Fields in column order, stable across calls
    fn raw_fields(&self) -> &[RawField];

    /// Field metadata consumed by the payload translator
    fn field_metadata(&self) -> &[FieldMeta];

    /// Export up to `limit` rows (all rows when `None`) in native order
    async fn to_records(&self, limit: Option<usize>) -> Result<Vec<Record>, AppError>;

    fn execution_hook(&self) -> ExecutionHook<'_>;
}
