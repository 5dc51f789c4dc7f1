use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use std::sync::Arc;

use crate::api::handlers::{dataset, query, AppState};
use crate::config::Config;
use crate::services::MultiDatasetCoordinator;

/// Create router with application state
pub fn create_router_with_state(coordinator: Arc<MultiDatasetCoordinator>, config: Config) -> Router {
    let state = AppState {
        coordinator,
        config,
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/api/datasets", get(dataset::list_datasets))
        .route("/api/datasets/records", get(dataset::get_records))
        .route("/api/query/sql", post(query::execute_sql))
        .route("/api/query/sql/batch", post(query::execute_sql_batch))
        .route("/api/query/payload", post(query::execute_payload))
        .route("/api/query/payload/batch", post(query::execute_payload_batch))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
