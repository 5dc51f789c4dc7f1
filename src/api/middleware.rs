use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use datafusion::error::DataFusionError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// No registered adapter recognizes the dataset handle
    #[error("Unsupported data type: {0}")]
    UnsupportedDatasetType(String),

    /// Payload could not be turned into SQL, or SQL could not be moved to a target dialect
    #[error("Translation error: {0}")]
    Translation(String),

    /// The executing engine rejected or failed the statement
    #[error("Query execution error: {0}")]
    QueryExecution(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code used in HTTP error bodies
    pub fn code(&self) -> &'static str {
        match self {
            AppError::UnsupportedDatasetType(_) => "UNSUPPORTED_DATASET_TYPE",
            AppError::Translation(_) => "TRANSLATION_ERROR",
            AppError::QueryExecution(_) => "QUERY_EXECUTION_ERROR",
            AppError::NotImplemented(_) => "NOT_IMPLEMENTED",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorDetail {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::UnsupportedDatasetType(_)
            | AppError::Translation(_)
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            AppError::QueryExecution(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let code = self.code();
        let error_detail = match self {
            AppError::QueryExecution(msg) => {
                let detail = ErrorDetail::new(code, msg.clone());
                if msg.contains("not found") {
                    detail.with_details(
                        "Check that every table in the query is a registered dataset name.",
                    )
                } else {
                    detail
                }
            }
            other => ErrorDetail::new(code, other.to_string()),
        };

        let body = Json(ErrorResponse {
            error: error_detail,
        });

        (status, body).into_response()
    }
}

/// Convert anyhow::Error to AppError
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(format!("{:#}", err))
    }
}

/// Native engine failures keep their message verbatim
impl From<DataFusionError> for AppError {
    fn from(err: DataFusionError) -> Self {
        AppError::QueryExecution(err.to_string())
    }
}
