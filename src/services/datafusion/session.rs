// DataFusion SessionManager
//
// Creates the embedded query engine handles. A `QueryEngine` holds the base
// DataFusion SessionContext and hands out a `QueryScope` per call: a session
// sharing the engine's configuration and runtime but with its own catalog, so
// concurrent calls never see or remove each other's registrations.

use datafusion::datasource::TableProvider;
use datafusion::common::TableReference;
use datafusion::prelude::*;
use datafusion::arrow::record_batch::RecordBatch;
use std::sync::Arc;
use tokio::sync::OnceCell;
use anyhow::{Result, Context};

/// Configuration for DataFusion sessions
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Batch size for query execution
    pub batch_size: usize,
    /// Number of partitions for parallel execution
    pub target_partitions: usize,
    /// Session time zone applied before the first query
    pub time_zone: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            batch_size: 8192,
            target_partitions: num_cpus::get(),
            time_zone: "UTC".to_string(),
        }
    }
}

/// Creates configured `QueryEngine` handles
///
/// # Example
/// ```rust,ignore
/// let manager = DataFusionSessionManager::new(SessionConfig::default());
/// let engine = Arc::new(manager.create_engine()?);
/// let coordinator = MultiDatasetCoordinator::new(adapters, engine)?;
/// ```
pub struct DataFusionSessionManager {
    config: SessionConfig,
}

impl DataFusionSessionManager {
    /// Create a new SessionManager with the given configuration
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Create a new SessionManager with default configuration
    pub fn default_config() -> Self {
        Self::new(SessionConfig::default())
    }

    /// Create a new DataFusion SessionContext
    pub fn create_session(&self) -> Result<SessionContext> {
        let config = datafusion::execution::config::SessionConfig::new()
            .with_batch_size(self.config.batch_size)
            .with_target_partitions(self.config.target_partitions.max(1))
            .with_information_schema(true);

        Ok(SessionContext::new_with_config(config))
    }

    /// Create an engine handle backed by a fresh session
    pub fn create_engine(&self) -> Result<QueryEngine> {
        let ctx = self
            .create_session()
            .context("Failed to create DataFusion session")?;

        Ok(QueryEngine::new(ctx, self.config.time_zone.clone()))
    }
}

/// Caller-owned handle to the embedded analytical engine
pub struct QueryEngine {
    ctx: SessionContext,
    time_zone: String,
    time_zone_applied: OnceCell<()>,
}

impl QueryEngine {
    pub fn new(ctx: SessionContext, time_zone: impl Into<String>) -> Self {
        Self {
            ctx,
            time_zone: time_zone.into(),
            time_zone_applied: OnceCell::new(),
        }
    }

    /// Apply the session time zone once per engine.
    ///
    /// Best effort: some configurations reject the setting, which only affects
    /// how datetimes are displayed, so failures are logged and swallowed.
    pub async fn ensure_time_zone(&self) {
        self.time_zone_applied
            .get_or_init(|| async {
                let statement = format!(
                    "SET datafusion.execution.time_zone = '{}'",
                    self.time_zone.replace('\'', "''")
                );
                if let Err(e) = self.ctx.sql(&statement).await {
                    tracing::debug!("Ignoring time zone setting failure: {}", e);
                }
            })
            .await;
    }

    /// Open a session for one call.
    ///
    /// The scope copies the engine's current options (time zone included) and
    /// shares its runtime. Its tables are dropped with it.
    pub fn scope(&self) -> QueryScope {
        let ctx = SessionContext::new_with_config_rt(self.ctx.copied_config(), self.ctx.runtime_env());
        QueryScope { ctx }
    }
}

/// Tables and statements of a single embedded call
pub struct QueryScope {
    ctx: SessionContext,
}

impl QueryScope {
    /// Register a table provider under `name`, replacing any previous registration
    pub fn register_table(
        &self,
        name: &str,
        provider: Arc<dyn TableProvider>,
    ) -> datafusion::error::Result<()> {
        let table = TableReference::bare(name);
        self.ctx.deregister_table(table.clone())?;
        self.ctx.register_table(table, provider)?;
        tracing::debug!("Registered dataset '{}' in embedded engine", name);
        Ok(())
    }

    /// Run a statement verbatim and collect every batch
    pub async fn execute(&self, sql: &str) -> datafusion::error::Result<Vec<RecordBatch>> {
        self.ctx.sql(sql).await?.collect().await
    }
}
