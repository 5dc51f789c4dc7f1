// DataFusion DialectTranslator
//
// Defines the trait and implementations for moving canonical (DataFusion) SQL
// into the SQL dialect of a target engine.

use anyhow::{Result, Context, anyhow};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use async_trait::async_trait;

/// Trait for translating canonical SQL to an engine-specific dialect
#[async_trait]
pub trait DialectTranslator: Send + Sync {
    /// Get the name of this dialect (e.g., "DataFusion", "Spark")
    fn dialect_name(&self) -> &str;

    /// Translate canonical SQL to the target dialect
    ///
    /// # Errors
    /// Returns error if SQL cannot be parsed or translation fails
    async fn translate(&self, canonical_sql: &str) -> Result<String>;
}

/// Canonical dialect: statements are already in the embedded engine's syntax
pub struct DataFusionDialectTranslator;

impl DataFusionDialectTranslator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DataFusionDialectTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DialectTranslator for DataFusionDialectTranslator {
    fn dialect_name(&self) -> &str {
        "DataFusion"
    }

    async fn translate(&self, canonical_sql: &str) -> Result<String> {
        Ok(canonical_sql.to_string())
    }
}

/// Spark SQL dialect translator
///
/// Spark quotes identifiers with backticks and escapes quotes inside string
/// literals with a backslash (adjacent `'a' 'b'` literals concatenate).
pub struct SparkDialectTranslator;

impl SparkDialectTranslator {
    pub fn new() -> Self {
        Self
    }

    /// Rewrite quoting: `"ident"` -> `` `ident` ``, `""` -> `"` inside identifiers,
    /// `''` -> `\'` and `\` -> `\\` inside literals
    fn translate_quoting(&self, sql: &str) -> String {
        let mut result = String::with_capacity(sql.len());
        let mut in_string = false;
        let mut in_identifier = false;
        let mut chars = sql.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '\'' if !in_identifier => {
                    if in_string && chars.peek() == Some(&'\'') {
                        chars.next();
                        result.push_str("\\'");
                    } else {
                        in_string = !in_string;
                        result.push(ch);
                    }
                }
                '\\' if in_string => result.push_str("\\\\"),
                '"' if in_identifier && chars.peek() == Some(&'"') => {
                    chars.next();
                    result.push('"');
                }
                '"' if !in_string => {
                    in_identifier = !in_identifier;
                    result.push('`');
                }
                '`' if in_identifier => result.push_str("``"),
                _ => result.push(ch),
            }
        }

        result
    }
}

impl Default for SparkDialectTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DialectTranslator for SparkDialectTranslator {
    fn dialect_name(&self) -> &str {
        "Spark"
    }

    async fn translate(&self, canonical_sql: &str) -> Result<String> {
        let statements = Parser::parse_sql(&GenericDialect {}, canonical_sql)
            .context("Failed to parse SQL for Spark translation")?;

        if statements.is_empty() {
            return Err(anyhow!("Empty SQL statement"));
        }

        Ok(self.translate_quoting(canonical_sql))
    }
}
