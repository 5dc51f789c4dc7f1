// Multi-Dataset Coordinator
//
// Public façade over a fixed, ordered registry of named datasets. Field listings,
// exports and queries all see the datasets in registration order.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::api::middleware::AppError;
use crate::models::{DataQueryPayload, DatasetKind, FieldCatalog, RawField, Record};
use crate::validation::validate_dataset_name;
use super::datafusion::QueryEngine;
use super::dataset::{AdapterOptions, DatasetAdapter, DatasetHandle};
use super::payload_sql::{PayloadSqlTranslator, VIRTUAL_VIEW_NAME};
use super::query_router::{common_kind, ExecutionStrategy, NamedAdapter, QueryRouter};
use super::resolver::AdapterRegistry;

/// A caller dataset to be resolved into an adapter
#[derive(Debug, Clone)]
pub struct DatasetRegistration {
    pub name: String,
    pub handle: DatasetHandle,
    pub options: AdapterOptions,
}

impl DatasetRegistration {
    pub fn new(name: impl Into<String>, handle: DatasetHandle) -> Self {
        Self {
            name: name.into(),
            handle,
            options: AdapterOptions::default(),
        }
    }

    pub fn with_options(mut self, options: AdapterOptions) -> Self {
        self.options = options;
        self
    }
}

pub struct MultiDatasetCoordinator {
    datasets: Vec<NamedAdapter>,
    catalog: FieldCatalog,
    router: QueryRouter,
}

impl MultiDatasetCoordinator {
    /// Build from already constructed adapters, in registry order
    pub fn new(
        adapters: Vec<(String, Box<dyn DatasetAdapter>)>,
        engine: Arc<QueryEngine>,
    ) -> Result<Self, AppError> {
        Self::with_router(adapters, QueryRouter::new(engine))
    }

    pub fn with_router(
        adapters: Vec<(String, Box<dyn DatasetAdapter>)>,
        router: QueryRouter,
    ) -> Result<Self, AppError> {
        let mut seen = HashSet::new();
        for (name, _) in &adapters {
            validate_dataset_name(name)?;
            if !seen.insert(name.as_str()) {
                return Err(AppError::Validation(format!(
                    "Dataset name '{}' is registered twice",
                    name
                )));
            }
        }

        let datasets: Vec<NamedAdapter> = adapters
            .into_iter()
            .map(|(name, adapter)| NamedAdapter::new(name, adapter))
            .collect();
        let kind = common_kind(&datasets)?;

        let mut catalog = FieldCatalog::new();
        for dataset in &datasets {
            catalog.insert(dataset.name.clone(), dataset.adapter.field_metadata().to_vec());
        }

        tracing::info!(
            "Coordinator ready with {} {} dataset(s)",
            datasets.len(),
            kind
        );

        Ok(Self {
            datasets,
            catalog,
            router,
        })
    }

    /// Resolve each handle through `registry`, then build the coordinator
    pub fn from_registrations(
        registry: &AdapterRegistry,
        registrations: Vec<DatasetRegistration>,
        engine: Arc<QueryEngine>,
    ) -> Result<Self, AppError> {
        let adapters = registrations
            .into_iter()
            .map(|registration| {
                let adapter = registry.create_adapter(&registration.handle, &registration.options)?;
                Ok((registration.name, adapter))
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        Self::new(adapters, engine)
    }

    /// Total rows across every dataset
    pub async fn data_size(&self) -> Result<usize, AppError> {
        let mut total = 0;
        for dataset in &self.datasets {
            total += dataset.adapter.data_size().await?;
        }
        Ok(total)
    }

    /// Per-dataset export, independent of SQL execution
    pub async fn to_records(
        &self,
        limit: Option<usize>,
    ) -> Result<BTreeMap<String, Vec<Record>>, AppError> {
        let mut exported = BTreeMap::new();
        for dataset in &self.datasets {
            let records = dataset.adapter.to_records(limit).await?;
            exported.insert(dataset.name.clone(), records);
        }
        Ok(exported)
    }

    /// Export of one registered dataset
    pub async fn dataset_records(
        &self,
        name: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Record>, AppError> {
        let dataset = self
            .datasets
            .iter()
            .find(|dataset| dataset.name == name)
            .ok_or_else(|| AppError::NotFound(format!("Dataset '{}' is not registered", name)))?;
        dataset.adapter.to_records(limit).await
    }

    /// Fields of every dataset, tagged with their dataset name
    pub fn raw_fields(&self) -> Vec<RawField> {
        self.datasets
            .iter()
            .flat_map(|dataset| {
                dataset
                    .adapter
                    .raw_fields()
                    .iter()
                    .cloned()
                    .map(move |field| field.with_dataset(dataset.name.as_str()))
            })
            .collect()
    }

    /// Kind of the first registered dataset; the registry is homogeneous
    pub fn dataset_kind(&self) -> DatasetKind {
        self.datasets
            .first()
            .map(|dataset| dataset.adapter.dataset_kind())
            .unwrap_or(DatasetKind::EmbeddedColumnar)
    }

    /// Strategy queries will use, so callers can check availability up front
    pub fn execution_strategy(&self) -> ExecutionStrategy {
        ExecutionStrategy::for_kind(self.dataset_kind())
    }

    pub fn dataset_names(&self) -> Vec<&str> {
        self.datasets.iter().map(|dataset| dataset.name.as_str()).collect()
    }

    pub async fn get_datas_by_sql(&self, sql: &str) -> Result<Vec<Record>, AppError> {
        self.router.execute(sql, &self.datasets).await
    }

    pub async fn get_datas_by_payload(
        &self,
        payload: &DataQueryPayload,
    ) -> Result<Vec<Record>, AppError> {
        let sql = PayloadSqlTranslator::translate(VIRTUAL_VIEW_NAME, payload, &self.catalog)?;
        self.get_datas_by_sql(&sql).await
    }

    /// Run each statement in order; the first failure aborts the batch
    pub async fn batch_get_datas_by_sql<S: AsRef<str>>(
        &self,
        queries: &[S],
    ) -> Result<Vec<Vec<Record>>, AppError> {
        let mut results = Vec::with_capacity(queries.len());
        for (index, sql) in queries.iter().enumerate() {
            let records = self.get_datas_by_sql(sql.as_ref()).await.inspect_err(|e| {
                tracing::warn!("Batch query {} failed: {}", index, e);
            })?;
            results.push(records);
        }
        Ok(results)
    }

    pub async fn batch_get_datas_by_payload(
        &self,
        payloads: &[DataQueryPayload],
    ) -> Result<Vec<Vec<Record>>, AppError> {
        let mut results = Vec::with_capacity(payloads.len());
        for (index, payload) in payloads.iter().enumerate() {
            let records = self.get_datas_by_payload(payload).await.inspect_err(|e| {
                tracing::warn!("Batch payload {} failed: {}", index, e);
            })?;
            results.push(records);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalyticType, FieldMeta, SemanticType};
    use crate::services::datafusion::DataFusionSessionManager;
    use crate::services::dataset::distributed::testing::{sample_schema, RecordingSession};
    use crate::services::dataset::{DistributedFrame, ExecutionHook, FieldSet};
    use serde_json::json;

    /// Adapter with a fixed size and field list, for coordinator-level behavior
    struct StaticAdapter {
        size: usize,
        fields: FieldSet,
    }

    impl StaticAdapter {
        fn boxed(size: usize, fid: &str, semantic_type: SemanticType) -> Box<dyn DatasetAdapter> {
            let raw = RawField {
                fid: fid.to_string(),
                name: fid.to_string(),
                semantic_type,
                analytic_type: AnalyticType::Dimension,
                dataset: None,
            };
            let meta = FieldMeta {
                fid: fid.to_string(),
                data_type: "Utf8".to_string(),
                semantic_type,
                analytic_type: AnalyticType::Dimension,
            };
            Box::new(Self {
                size,
                fields: FieldSet {
                    raw: vec![raw],
                    metas: vec![meta],
                },
            })
        }
    }

    #[async_trait::async_trait]
    impl DatasetAdapter for StaticAdapter {
        fn dataset_kind(&self) -> DatasetKind {
            DatasetKind::EmbeddedColumnar
        }

        async fn data_size(&self) -> Result<usize, AppError> {
            Ok(self.size)
        }

        fn raw_fields(&self) -> &[RawField] {
            &self.fields.raw
        }

        fn field_metadata(&self) -> &[FieldMeta] {
            &self.fields.metas
        }

        async fn to_records(&self, _limit: Option<usize>) -> Result<Vec<Record>, AppError> {
            Ok(Vec::new())
        }

        fn execution_hook(&self) -> ExecutionHook<'_> {
            ExecutionHook::Deferred
        }
    }

    fn engine() -> Arc<QueryEngine> {
        Arc::new(DataFusionSessionManager::default_config().create_engine().unwrap())
    }

    fn rows(value: serde_json::Value) -> DatasetHandle {
        let rows: Vec<Record> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row.as_object().cloned().unwrap())
            .collect();
        DatasetHandle::new(rows)
    }

    fn json_coordinator(datasets: Vec<(&str, serde_json::Value)>) -> MultiDatasetCoordinator {
        let registrations = datasets
            .into_iter()
            .map(|(name, value)| DatasetRegistration::new(name, rows(value)))
            .collect();
        MultiDatasetCoordinator::from_registrations(&AdapterRegistry::default(), registrations, engine())
            .unwrap()
    }

    #[tokio::test]
    async fn test_data_size_sums_datasets() {
        let coordinator = MultiDatasetCoordinator::new(
            vec![
                ("a".to_string(), StaticAdapter::boxed(10, "x", SemanticType::Nominal)),
                ("b".to_string(), StaticAdapter::boxed(25, "y", SemanticType::Nominal)),
                ("c".to_string(), StaticAdapter::boxed(0, "z", SemanticType::Nominal)),
            ],
            engine(),
        )
        .unwrap();

        assert_eq!(coordinator.data_size().await.unwrap(), 35);
    }

    #[test]
    fn test_raw_fields_are_tagged_in_registry_order() {
        let coordinator = MultiDatasetCoordinator::new(
            vec![
                ("a".to_string(), StaticAdapter::boxed(1, "id", SemanticType::Quantitative)),
                ("b".to_string(), StaticAdapter::boxed(1, "name", SemanticType::Nominal)),
            ],
            engine(),
        )
        .unwrap();

        let fields = coordinator.raw_fields();
        let tagged: Vec<(&str, Option<&str>)> = fields
            .iter()
            .map(|field| (field.fid.as_str(), field.dataset.as_deref()))
            .collect();
        assert_eq!(tagged, vec![("id", Some("a")), ("name", Some("b"))]);
        assert_eq!(fields[0].semantic_type, SemanticType::Quantitative);
        assert_eq!(coordinator.dataset_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_registry_validation() {
        let duplicate = MultiDatasetCoordinator::new(
            vec![
                ("a".to_string(), StaticAdapter::boxed(1, "x", SemanticType::Nominal)),
                ("a".to_string(), StaticAdapter::boxed(1, "y", SemanticType::Nominal)),
            ],
            engine(),
        );
        assert!(matches!(duplicate, Err(AppError::Validation(_))));

        let bad_name = MultiDatasetCoordinator::new(
            vec![("my table".to_string(), StaticAdapter::boxed(1, "x", SemanticType::Nominal))],
            engine(),
        );
        assert!(matches!(bad_name, Err(AppError::Validation(_))));

        let empty = MultiDatasetCoordinator::new(Vec::new(), engine());
        assert!(matches!(empty, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_unsupported_handle_fails_at_construction() {
        let result = MultiDatasetCoordinator::from_registrations(
            &AdapterRegistry::default(),
            vec![DatasetRegistration::new("ds", DatasetHandle::new(3.5_f64))],
            engine(),
        );
        assert!(matches!(result, Err(AppError::UnsupportedDatasetType(_))));
    }

    #[tokio::test]
    async fn test_sql_round_trip() {
        let coordinator = json_coordinator(vec![("ds", json!([{"x": 1}, {"x": 2}]))]);

        let records = coordinator.get_datas_by_sql("SELECT * FROM ds").await.unwrap();
        let expected: Vec<Record> = vec![
            json!({"x": 1}).as_object().cloned().unwrap(),
            json!({"x": 2}).as_object().cloned().unwrap(),
        ];
        assert_eq!(records, expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_queries_share_one_engine() {
        let coordinator = Arc::new(json_coordinator(vec![("ds", json!([{"x": 1}, {"x": 2}]))]));

        let tasks: Vec<_> = (0..200)
            .map(|_| {
                let coordinator = coordinator.clone();
                tokio::spawn(async move {
                    coordinator.get_datas_by_sql("SELECT COUNT(*) AS n FROM ds").await
                })
            })
            .collect();

        for task in tasks {
            let records = task.await.unwrap().unwrap();
            assert_eq!(records[0]["n"], json!(2));
        }
    }

    #[tokio::test]
    async fn test_to_records_per_dataset() {
        let coordinator = json_coordinator(vec![
            ("a", json!([{"x": 1}, {"x": 2}, {"x": 3}])),
            ("b", json!([{"y": "p"}])),
        ]);

        let exported = coordinator.to_records(Some(2)).await.unwrap();
        assert_eq!(exported["a"].len(), 2);
        assert_eq!(exported["b"].len(), 1);
        assert_eq!(coordinator.data_size().await.unwrap(), 4);
        assert_eq!(coordinator.dataset_kind(), DatasetKind::EmbeddedColumnar);
        assert!(coordinator.execution_strategy().is_available());
    }

    #[tokio::test]
    async fn test_dataset_records_by_name() {
        let coordinator = json_coordinator(vec![
            ("a", json!([{"x": 1}, {"x": 2}])),
            ("b", json!([{"y": "p"}])),
        ]);

        let records = coordinator.dataset_records("b", None).await.unwrap();
        assert_eq!(records, vec![json!({"y": "p"}).as_object().cloned().unwrap()]);

        let missing = coordinator.dataset_records("c", None).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_payload_query() {
        let coordinator = json_coordinator(vec![(
            "sales",
            json!([
                {"city": "Oslo", "price": 10},
                {"city": "Oslo", "price": 5},
                {"city": "Rome", "price": 7}
            ]),
        )]);

        let payload = DataQueryPayload::from_value(json!({
            "workflow": [
                {"type": "view", "query": [{
                    "op": "aggregate",
                    "groupBy": ["city"],
                    "measures": [{"field": "price", "agg": "sum", "asFieldKey": "total"}]
                }]},
                {"type": "sort", "by": ["total"], "sort": "descending"}
            ]
        }))
        .unwrap();

        let records = coordinator.get_datas_by_payload(&payload).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["city"], json!("Oslo"));
        assert_eq!(records[0]["total"], json!(15));
        assert_eq!(records[1]["city"], json!("Rome"));
    }

    #[tokio::test]
    async fn test_batch_sql_matches_single_calls() {
        let coordinator = json_coordinator(vec![("ds", json!([{"x": 1}, {"x": 2}]))]);
        let queries = [
            "SELECT x FROM ds WHERE x = 1",
            "SELECT COUNT(*) AS n FROM ds",
        ];

        let batch = coordinator.batch_get_datas_by_sql(&queries).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], coordinator.get_datas_by_sql(queries[0]).await.unwrap());
        assert_eq!(batch[1], coordinator.get_datas_by_sql(queries[1]).await.unwrap());
    }

    #[tokio::test]
    async fn test_batch_stops_at_first_failure() {
        let session = RecordingSession::failing();
        let frame = DistributedFrame::new("frame-1", sample_schema(), session.clone());
        let coordinator = MultiDatasetCoordinator::from_registrations(
            &AdapterRegistry::default(),
            vec![DatasetRegistration::new("people", DatasetHandle::new(frame))],
            engine(),
        )
        .unwrap();

        let result = coordinator
            .batch_get_datas_by_sql(&["SELECT 1", "SELECT 2"])
            .await;

        assert!(matches!(result, Err(AppError::QueryExecution(_))));
        let submitted: Vec<String> = session
            .calls()
            .into_iter()
            .filter(|call| call.starts_with("sql"))
            .collect();
        assert_eq!(submitted, vec!["sql SELECT 1"]);
    }

    #[tokio::test]
    async fn test_batch_payload_translation_error_aborts() {
        let coordinator = json_coordinator(vec![("ds", json!([{"x": 1}]))]);
        let good = DataQueryPayload::from_value(json!({
            "workflow": [{"type": "view", "query": [{"op": "raw", "fields": ["x"]}]}]
        }))
        .unwrap();
        let bad = DataQueryPayload::from_value(json!({
            "workflow": [{"type": "view", "query": [{"op": "raw", "fields": ["nope"]}]}]
        }))
        .unwrap();

        let result = coordinator.batch_get_datas_by_payload(&[good.clone(), bad]).await;
        assert!(matches!(result, Err(AppError::Translation(_))));

        let ok = coordinator.batch_get_datas_by_payload(&[good]).await.unwrap();
        assert_eq!(ok[0].len(), 1);
    }
}
