// Dialect Translation Service
//
// Looks up the translator registered for a target dialect and moves canonical
// SQL into it.

use std::sync::Arc;
use std::collections::HashMap;
use anyhow::{Result, anyhow, Context};
use serde::{Deserialize, Serialize};

use super::dialect::{DialectTranslator, DataFusionDialectTranslator, SparkDialectTranslator};

/// SQL dialects a statement can be translated into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    /// Canonical dialect of the embedded engine
    DataFusion,
    Spark,
}

impl SqlDialect {
    pub fn as_str(&self) -> &str {
        match self {
            SqlDialect::DataFusion => "DataFusion",
            SqlDialect::Spark => "Spark",
        }
    }
}

/// Registry of dialect translators
///
/// # Example
/// ```rust,ignore
/// let service = DialectTranslationService::new();
/// let spark_sql = service
///     .translate_query(r#"SELECT "id" FROM "orders""#, SqlDialect::Spark)
///     .await?;
/// // Result: "SELECT `id` FROM `orders`"
/// ```
pub struct DialectTranslationService {
    translators: HashMap<SqlDialect, Arc<dyn DialectTranslator>>,
}

impl DialectTranslationService {
    /// Create a new translation service with default translators
    pub fn new() -> Self {
        let mut translators: HashMap<SqlDialect, Arc<dyn DialectTranslator>> = HashMap::new();

        translators.insert(
            SqlDialect::DataFusion,
            Arc::new(DataFusionDialectTranslator::new()),
        );
        translators.insert(SqlDialect::Spark, Arc::new(SparkDialectTranslator::new()));

        Self { translators }
    }

    /// Register a custom dialect translator, replacing any existing one
    pub fn register_translator(
        &mut self,
        dialect: SqlDialect,
        translator: Arc<dyn DialectTranslator>,
    ) {
        self.translators.insert(dialect, translator);
    }

    /// Translate a canonical SQL statement into `target`
    pub async fn translate_query(&self, canonical_sql: &str, target: SqlDialect) -> Result<String> {
        let translator = self
            .translators
            .get(&target)
            .ok_or_else(|| anyhow!("No translator registered for {:?}", target))?;

        let translated = translator
            .translate(canonical_sql)
            .await
            .with_context(|| {
                format!("Failed to translate query to {} dialect", translator.dialect_name())
            })?;

        if translated != canonical_sql {
            tracing::debug!(
                "Translated query to {}: {} -> {}",
                translator.dialect_name(),
                canonical_sql,
                translated
            );
        }

        Ok(translated)
    }
}

impl Default for DialectTranslationService {
    fn default() -> Self {
        Self::new()
    }
}
