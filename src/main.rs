use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

use walker_query_backend::api;
use walker_query_backend::config::Config;
use walker_query_backend::services::datafusion::DataFusionSessionManager;
use walker_query_backend::services::{
    AdapterRegistry, BackendFeatures, DatasetSource, MultiDatasetCoordinator,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!("Starting server on {}", config.server_address());

    let features = BackendFeatures::from_names(&config.enabled_backends())?;
    let registry = AdapterRegistry::new(features);
    let engine = Arc::new(DataFusionSessionManager::new(config.session_config()).create_engine()?);

    let sources = DatasetSource::parse_list(&config.datasets.sources)?;
    if sources.is_empty() {
        error!("No datasets configured; set DATASETS to name=path entries");
        return Err("no datasets configured".into());
    }

    let mut registrations = Vec::with_capacity(sources.len());
    for source in sources {
        registrations.push(source.into_registration().await?);
    }

    let coordinator = MultiDatasetCoordinator::from_registrations(&registry, registrations, engine)
        .map_err(|e| {
            error!("Failed to register datasets: {}", e);
            e
        })?;

    info!("Serving datasets: {}", coordinator.dataset_names().join(", "));
    if !coordinator.execution_strategy().is_available() {
        warn!(
            "{} datasets cannot be queried yet; only catalog and export endpoints will succeed",
            coordinator.dataset_kind()
        );
    }

    // Create router with state
    let app: Router = api::routes::create_router_with_state(Arc::new(coordinator), config.clone());

    // Start server
    let addr: SocketAddr = config.server_address().parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
