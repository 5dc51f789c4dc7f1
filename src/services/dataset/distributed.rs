// Distributed frame adapter
//
// A distributed frame lives on an external compute engine (e.g. a Spark cluster).
// The engine is reached through `DistributedSession`; queries against it are
// transpiled from the canonical dialect before submission.

use std::fmt;
use std::sync::Arc;

use datafusion::arrow::datatypes::SchemaRef;
use serde_json::Value;

use crate::api::middleware::AppError;
use crate::models::{DatasetKind, FieldMeta, Record, RawField};
use crate::services::datafusion::SqlDialect;
use super::adapter::{AdapterOptions, DatasetAdapter, ExecutionHook};
use super::fields::FieldSet;
use super::handle::DatasetHandle;

/// One row returned by a distributed engine, as ordered (column, value) pairs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistributedRow {
    values: Vec<(String, Value)>,
}

impl DistributedRow {
    pub fn new(values: Vec<(String, Value)>) -> Self {
        Self { values }
    }

    /// Expand into a name -> value record
    pub fn into_record(self) -> Record {
        self.values.into_iter().collect()
    }
}

/// Session on an external distributed SQL engine
#[async_trait::async_trait]
pub trait DistributedSession: Send + Sync {
    /// Dialect statements must be written in before `sql` is called
    fn dialect(&self) -> SqlDialect;

    async fn count(&self, frame: &DistributedFrame) -> Result<usize, AppError>;

    async fn collect(
        &self,
        frame: &DistributedFrame,
        limit: Option<usize>,
    ) -> Result<Vec<DistributedRow>, AppError>;

    async fn create_or_replace_temp_view(
        &self,
        frame: &DistributedFrame,
        name: &str,
    ) -> Result<(), AppError>;

    async fn drop_temp_view(&self, name: &str) -> Result<(), AppError>;

    async fn sql(&self, sql: &str) -> Result<Vec<DistributedRow>, AppError>;
}

/// A frame on a distributed engine, with its locally known schema
#[derive(Clone)]
pub struct DistributedFrame {
    frame_id: String,
    schema: SchemaRef,
    session: Arc<dyn DistributedSession>,
}

impl DistributedFrame {
    pub fn new(
        frame_id: impl Into<String>,
        schema: SchemaRef,
        session: Arc<dyn DistributedSession>,
    ) -> Self {
        Self {
            frame_id: frame_id.into(),
            schema,
            session,
        }
    }

    pub fn frame_id(&self) -> &str {
        &self.frame_id
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn session(&self) -> &Arc<dyn DistributedSession> {
        &self.session
    }
}

impl fmt::Debug for DistributedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributedFrame")
            .field("frame_id", &self.frame_id)
            .field("dialect", &self.session.dialect())
            .finish()
    }
}

pub struct DistributedFrameAdapter {
    frame: Arc<DistributedFrame>,
    fields: FieldSet,
}

impl DistributedFrameAdapter {
    pub fn from_handle(
        handle: &DatasetHandle,
        options: &AdapterOptions,
    ) -> Result<Box<dyn DatasetAdapter>, AppError> {
        let frame = handle
            .downcast_arc::<DistributedFrame>()
            .ok_or_else(|| AppError::UnsupportedDatasetType(handle.type_name().to_string()))?;

        Ok(Box::new(Self::new(frame, options)))
    }

    pub fn new(frame: Arc<DistributedFrame>, options: &AdapterOptions) -> Self {
        let fields = FieldSet::from_schema(frame.schema(), &options.field_specs);
        Self { frame, fields }
    }
}

#[async_trait::async_trait]
impl DatasetAdapter for DistributedFrameAdapter {
    fn dataset_kind(&self) -> DatasetKind {
        DatasetKind::DistributedColumnar
    }

    async fn data_size(&self) -> Result<usize, AppError> {
        self.frame.session().count(&self.frame).await
    }

    fn raw_fields(&self) -> &[RawField] {
        &self.fields.raw
    }

    fn field_metadata(&self) -> &[FieldMeta] {
        &self.fields.metas
    }

    async fn to_records(&self, limit: Option<usize>) -> Result<Vec<Record>, AppError> {
        let rows = self.frame.session().collect(&self.frame, limit).await?;
        Ok(rows.into_iter().map(DistributedRow::into_record).collect())
    }

    fn execution_hook(&self) -> ExecutionHook<'_> {
        ExecutionHook::Distributed(&self.frame)
    }
}

/// In-memory stand-in for a distributed engine that records every call
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    use datafusion::arrow::datatypes::{DataType, Field, Schema};

    pub struct RecordingSession {
        pub calls: Mutex<Vec<String>>,
        pub rows: Vec<DistributedRow>,
        pub fail_sql: bool,
    }

    impl RecordingSession {
        pub fn new(rows: Vec<DistributedRow>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                rows,
                fail_sql: false,
            })
        }

        pub fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                rows: Vec::new(),
                fail_sql: true,
            })
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn log(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait::async_trait]
    impl DistributedSession for RecordingSession {
        fn dialect(&self) -> SqlDialect {
            SqlDialect::Spark
        }

        async fn count(&self, frame: &DistributedFrame) -> Result<usize, AppError> {
            self.log(format!("count {}", frame.frame_id()));
            Ok(self.rows.len())
        }

        async fn collect(
            &self,
            frame: &DistributedFrame,
            limit: Option<usize>,
        ) -> Result<Vec<DistributedRow>, AppError> {
            self.log(format!("collect {}", frame.frame_id()));
            Ok(self.rows.iter().take(limit.unwrap_or(usize::MAX)).cloned().collect())
        }

        async fn create_or_replace_temp_view(
            &self,
            frame: &DistributedFrame,
            name: &str,
        ) -> Result<(), AppError> {
            self.log(format!("view {} as {}", frame.frame_id(), name));
            Ok(())
        }

        async fn drop_temp_view(&self, name: &str) -> Result<(), AppError> {
            self.log(format!("drop {}", name));
            Ok(())
        }

        async fn sql(&self, sql: &str) -> Result<Vec<DistributedRow>, AppError> {
            self.log(format!("sql {}", sql));
            if self.fail_sql {
                return Err(AppError::QueryExecution("AnalysisException: boom".to_string()));
            }
            Ok(self.rows.clone())
        }
    }

    pub fn sample_schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("city", DataType::Utf8, true),
        ]))
    }

    pub fn sample_rows() -> Vec<DistributedRow> {
        vec![
            DistributedRow::new(vec![
                ("id".to_string(), Value::from(1)),
                ("city".to_string(), Value::from("Oslo")),
            ]),
            DistributedRow::new(vec![
                ("id".to_string(), Value::from(2)),
                ("city".to_string(), Value::Null),
            ]),
        ]
    }
}
