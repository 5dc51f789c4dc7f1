use sqlparser::ast::Statement;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use crate::api::middleware::AppError;

/// Longest accepted dataset name
const MAX_DATASET_NAME_LEN: usize = 128;

/// SQL validation for statements received from clients
pub struct SqlValidator;

impl SqlValidator {
    /// Ensure `sql` is exactly one read-only query
    pub fn validate_select_only(sql: &str) -> Result<String, AppError> {
        let dialect = GenericDialect {};
        let statements = Parser::parse_sql(&dialect, sql)
            .map_err(|e| AppError::Validation(format!("SQL parsing error: {}", e)))?;

        let statement = match statements.as_slice() {
            [statement] => statement,
            [] => return Err(AppError::Validation("Empty SQL query".to_string())),
            _ => {
                return Err(AppError::Validation(format!(
                    "Expected a single statement, found {}",
                    statements.len()
                )))
            }
        };

        match statement {
            Statement::Query(_) => Ok(sql.trim().trim_end_matches(';').to_string()),
            other => Err(AppError::Validation(format!(
                "Only SELECT queries are permitted. Found: {}",
                Self::statement_keyword(other)
            ))),
        }
    }

    /// Leading keyword of a statement, for error messages
    fn statement_keyword(statement: &Statement) -> String {
        statement
            .to_string()
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_uppercase()
    }
}

/// Dataset names double as table identifiers in every dialect, so they are
/// restricted to `[A-Za-z_][A-Za-z0-9_]*`
pub fn validate_dataset_name(name: &str) -> Result<(), AppError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid_start || !valid_rest {
        return Err(AppError::Validation(format!(
            "Dataset name '{}' must start with a letter or underscore and contain only letters, digits and underscores",
            name
        )));
    }
    if name.len() > MAX_DATASET_NAME_LEN {
        return Err(AppError::Validation(format!(
            "Dataset name '{}' is longer than {} characters",
            name, MAX_DATASET_NAME_LEN
        )));
    }

    Ok(())
}
