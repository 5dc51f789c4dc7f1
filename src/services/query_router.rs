// Query Router
//
// Executes one SQL statement against a set of named adapters. The strategy is
// chosen from the adapters' shared dataset kind: embedded frames are registered
// in a per-call scope of the caller's DataFusion engine, distributed frames
// become temporary views on their session, and backends without execution
// support are refused. Whatever a call registers is removed before it returns.

use std::sync::Arc;

use crate::api::middleware::AppError;
use crate::models::{DatasetKind, Record};
use super::datafusion::{DataFusionResultConverter, DialectTranslationService, QueryEngine};
use super::dataset::{DatasetAdapter, DistributedFrame, DistributedRow, ExecutionHook};

/// An adapter registered under a dataset name
pub struct NamedAdapter {
    pub name: String,
    pub adapter: Box<dyn DatasetAdapter>,
}

impl NamedAdapter {
    pub fn new(name: impl Into<String>, adapter: Box<dyn DatasetAdapter>) -> Self {
        Self {
            name: name.into(),
            adapter,
        }
    }
}

/// How a statement is executed for a dataset kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// Registered in the embedded engine
    Embedded,
    /// Submitted to a distributed engine session
    Distributed,
    /// Known backend with no execution support yet
    Deferred(DatasetKind),
}

impl ExecutionStrategy {
    pub fn for_kind(kind: DatasetKind) -> Self {
        match kind {
            DatasetKind::EmbeddedColumnar => ExecutionStrategy::Embedded,
            DatasetKind::DistributedColumnar => ExecutionStrategy::Distributed,
            DatasetKind::DatabaseConnector | DatasetKind::CloudReference => {
                ExecutionStrategy::Deferred(kind)
            }
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, ExecutionStrategy::Deferred(_))
    }
}

/// Kind shared by every dataset; mixed kinds cannot be executed together
pub fn common_kind(datasets: &[NamedAdapter]) -> Result<DatasetKind, AppError> {
    let first = datasets
        .first()
        .ok_or_else(|| AppError::Validation("No dataset is registered".to_string()))?;
    let kind = first.adapter.dataset_kind();

    if let Some(other) = datasets
        .iter()
        .find(|dataset| dataset.adapter.dataset_kind() != kind)
    {
        return Err(AppError::Validation(format!(
            "Datasets must share one kind: '{}' is {} but '{}' is {}",
            first.name,
            kind,
            other.name,
            other.adapter.dataset_kind()
        )));
    }

    Ok(kind)
}

pub struct QueryRouter {
    engine: Arc<QueryEngine>,
    dialects: DialectTranslationService,
}

impl QueryRouter {
    pub fn new(engine: Arc<QueryEngine>) -> Self {
        Self::with_dialects(engine, DialectTranslationService::new())
    }

    pub fn with_dialects(engine: Arc<QueryEngine>, dialects: DialectTranslationService) -> Self {
        Self { engine, dialects }
    }

    /// Execute `sql` with every dataset visible under its registry name
    pub async fn execute(
        &self,
        sql: &str,
        datasets: &[NamedAdapter],
    ) -> Result<Vec<Record>, AppError> {
        let kind = common_kind(datasets)?;
        let strategy = ExecutionStrategy::for_kind(kind);
        tracing::info!(
            "Dispatching query over {} dataset(s) with {:?} strategy",
            datasets.len(),
            strategy
        );

        match strategy {
            ExecutionStrategy::Embedded => self.execute_embedded(sql, datasets).await,
            ExecutionStrategy::Distributed => self.execute_distributed(sql, datasets).await,
            ExecutionStrategy::Deferred(kind) => Err(AppError::NotImplemented(format!(
                "Query execution on {} datasets",
                kind
            ))),
        }
    }

    async fn execute_embedded(
        &self,
        sql: &str,
        datasets: &[NamedAdapter],
    ) -> Result<Vec<Record>, AppError> {
        self.engine.ensure_time_zone().await;

        // Registrations live in this call's scope and go away with it.
        let scope = self.engine.scope();
        for dataset in datasets {
            let ExecutionHook::Embedded(table) = dataset.adapter.execution_hook() else {
                return Err(AppError::Internal(format!(
                    "Dataset '{}' cannot be registered in the embedded engine",
                    dataset.name
                )));
            };
            scope.register_table(&dataset.name, table)?;
        }

        let batches = scope.execute(sql).await?;
        let records = DataFusionResultConverter::batches_to_records(&batches)?;
        tracing::debug!("Embedded query returned {} row(s)", records.len());

        Ok(records)
    }

    async fn execute_distributed(
        &self,
        sql: &str,
        datasets: &[NamedAdapter],
    ) -> Result<Vec<Record>, AppError> {
        let frames = datasets
            .iter()
            .map(|dataset| match dataset.adapter.execution_hook() {
                ExecutionHook::Distributed(frame) => Ok((dataset.name.as_str(), frame)),
                _ => Err(AppError::Internal(format!(
                    "Dataset '{}' is not a distributed frame",
                    dataset.name
                ))),
            })
            .collect::<Result<Vec<(&str, &DistributedFrame)>, _>>()?;

        let session = match frames.first() {
            Some((_, frame)) => frame.session().clone(),
            None => return Err(AppError::Validation("No dataset is registered".to_string())),
        };
        if frames
            .iter()
            .any(|(_, frame)| !Arc::ptr_eq(frame.session(), &session))
        {
            return Err(AppError::Validation(
                "Distributed datasets must share one session".to_string(),
            ));
        }

        let mut created: Vec<&str> = Vec::with_capacity(frames.len());
        let outcome: Result<Vec<DistributedRow>, AppError> = async {
            for (name, frame) in &frames {
                session.create_or_replace_temp_view(frame, name).await?;
                created.push(*name);
            }

            let translated = self
                .dialects
                .translate_query(sql, session.dialect())
                .await
                .map_err(|e| AppError::Translation(format!("{:#}", e)))?;

            session.sql(&translated).await
        }
        .await;

        for name in created {
            if let Err(e) = session.drop_temp_view(name).await {
                tracing::warn!("Failed to drop temporary view '{}': {}", name, e);
            }
        }

        let rows = outcome?;
        tracing::debug!("Distributed query returned {} row(s)", rows.len());
        Ok(rows.into_iter().map(DistributedRow::into_record).collect())
    }
}
