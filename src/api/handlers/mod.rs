pub mod dataset;
pub mod query;

use std::sync::Arc;

use crate::config::Config;
use crate::services::MultiDatasetCoordinator;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<MultiDatasetCoordinator>,
    pub config: Config,
}
