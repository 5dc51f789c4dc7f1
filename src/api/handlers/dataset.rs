use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    Json,
};

use crate::api::handlers::AppState;
use crate::api::middleware::AppError;
use crate::models::{DatasetRecordsResponse, DatasetSummary, RecordsQuery};

/// Size, kind and fields of the registered datasets
pub async fn list_datasets(
    State(state): State<AppState>,
) -> Result<Json<DatasetSummary>, AppError> {
    let coordinator = &state.coordinator;

    Ok(Json(DatasetSummary {
        data_size: coordinator.data_size().await?,
        dataset_kind: coordinator.dataset_kind(),
        fields: coordinator.raw_fields(),
    }))
}

/// Export rows of every dataset, or of the one named by `dataset`
pub async fn get_records(
    State(state): State<AppState>,
    Query(params): Query<RecordsQuery>,
) -> Result<Json<DatasetRecordsResponse>, AppError> {
    tracing::info!(
        "Exporting dataset records (dataset: {:?}, limit: {:?})",
        params.dataset,
        params.limit
    );

    let records = match params.dataset {
        Some(name) => {
            let rows = state.coordinator.dataset_records(&name, params.limit).await?;
            BTreeMap::from([(name, rows)])
        }
        None => state.coordinator.to_records(params.limit).await?,
    };
    Ok(Json(DatasetRecordsResponse { records }))
}
