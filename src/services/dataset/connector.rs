// Database connector adapter.
//
// Describes a remote database view. Only the field catalog is available; row
// export and query execution are not implemented for connectors yet.
use url::Url;

use crate::api::middleware::AppError;
use crate::models::{DatasetKind, FieldMeta, Record, RawField};
use super::adapter::{AdapterOptions, DatasetAdapter, ExecutionHook};
use super::fields::FieldSet;
use super::handle::DatasetHandle;

/// Remote database view: connection URL plus the SQL defining the view
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    url: Url,
    view_sql: String,
}

impl Connector {
    pub fn new(url: &str, view_sql: impl Into<String>) -> Result<Self, AppError> {
        let view_sql = view_sql.into();

        let url = Url::parse(url)
            .map_err(|e| AppError::Validation(format!("Invalid connector URL: {}", e)))?;
        if url.host_str().is_none() && url.scheme() != "sqlite" {
            return Err(AppError::Validation(format!(
                "Connector URL must name a host: {}",
                url
            )));
        }
        if view_sql.trim().is_empty() {
            return Err(AppError::Validation("Connector view SQL cannot be empty".to_string()));
        }

        Ok(Self { url, view_sql })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn view_sql(&self) -> &str {
        &self.view_sql
    }

    /// Database flavour taken from the URL scheme (e.g. "postgresql")
    pub fn dialect_name(&self) -> &str {
        self.url.scheme()
    }
}

pub struct DatabaseConnectorAdapter {
    connector: Connector,
    fields: FieldSet,
}

impl DatabaseConnectorAdapter {
    pub fn from_handle(
        handle: &DatasetHandle,
        options: &AdapterOptions,
    ) -> Result<Box<dyn DatasetAdapter>, AppError> {
        let connector = handle
            .downcast_ref::<Connector>()
            .ok_or_else(|| AppError::UnsupportedDatasetType(handle.type_name().to_string()))?;

        Ok(Box::new(Self {
            connector: connector.clone(),
            fields: FieldSet::from_specs(&options.field_specs),
        }))
    }

    fn unavailable(&self, operation: &str) -> AppError {
        AppError::NotImplemented(format!(
            "{} on {} connector datasets",
            operation,
            self.connector.dialect_name()
        ))
    }
}

#[async_trait::async_trait]
impl DatasetAdapter for DatabaseConnectorAdapter {
    fn dataset_kind(&self) -> DatasetKind {
        DatasetKind::DatabaseConnector
    }

    async fn data_size(&self) -> Result<usize, AppError> {
        Err(self.unavailable("Row counting"))
    }

    fn raw_fields(&self) -> &[RawField] {
        &self.fields.raw
    }

    fn field_metadata(&self) -> &[FieldMeta] {
        &self.fields.metas
    }

    async fn to_records(&self, _limit: Option<usize>) -> Result<Vec<Record>, AppError> {
        Err(self.unavailable("Record export"))
    }

    fn execution_hook(&self) -> ExecutionHook<'_> {
        ExecutionHook::Deferred
    }
}
