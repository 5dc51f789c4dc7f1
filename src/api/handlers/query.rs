use axum::{extract::State, Json};

use crate::api::handlers::AppState;
use crate::api::middleware::AppError;
use crate::models::{
    BatchPayloadQueryRequest, BatchQueryResponse, BatchSqlQueryRequest, DataQueryPayload,
    PayloadQueryRequest, QueryResponse, SqlQueryRequest,
};
use crate::validation::SqlValidator;

fn check_batch_size(len: usize, max: usize) -> Result<(), AppError> {
    if len > max {
        return Err(AppError::Validation(format!(
            "Batch of {} queries exceeds the limit of {}",
            len, max
        )));
    }
    Ok(())
}

fn prepare_sql(sql: &str) -> Result<String, AppError> {
    let sql = sql.trim();
    if sql.is_empty() {
        return Err(AppError::Validation("SQL query cannot be empty".to_string()));
    }
    SqlValidator::validate_select_only(sql)
}

/// Execute one SQL statement over the registered datasets
pub async fn execute_sql(
    State(state): State<AppState>,
    Json(request): Json<SqlQueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    let sql = prepare_sql(&request.sql)?;
    tracing::info!("Executing SQL query: {}", sql);

    let records = state.coordinator.get_datas_by_sql(&sql).await?;
    Ok(Json(QueryResponse::new(records)))
}

pub async fn execute_sql_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchSqlQueryRequest>,
) -> Result<Json<BatchQueryResponse>, AppError> {
    check_batch_size(request.queries.len(), state.config.query.max_batch_size)?;

    // Validate everything up front so a bad statement never follows executed ones
    let queries = request
        .queries
        .iter()
        .map(|sql| prepare_sql(sql))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::info!("Executing batch of {} SQL queries", queries.len());

    let results = state.coordinator.batch_get_datas_by_sql(&queries).await?;
    Ok(Json(BatchQueryResponse { results }))
}

/// Translate a visual query payload and execute it
pub async fn execute_payload(
    State(state): State<AppState>,
    Json(request): Json<PayloadQueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    let payload = DataQueryPayload::from_value(request.payload)?;
    tracing::info!("Executing payload query");

    let records = state.coordinator.get_datas_by_payload(&payload).await?;
    Ok(Json(QueryResponse::new(records)))
}

pub async fn execute_payload_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchPayloadQueryRequest>,
) -> Result<Json<BatchQueryResponse>, AppError> {
    check_batch_size(request.payloads.len(), state.config.query.max_batch_size)?;

    let payloads = request
        .payloads
        .into_iter()
        .map(DataQueryPayload::from_value)
        .collect::<Result<Vec<_>, _>>()?;
    tracing::info!("Executing batch of {} payload queries", payloads.len());

    let results = state.coordinator.batch_get_datas_by_payload(&payloads).await?;
    Ok(Json(BatchQueryResponse { results }))
}
