use serde::Deserialize;
use std::env;

use crate::services::datafusion::SessionConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub backends: BackendsConfig,
    pub datasets: DatasetsConfig,
    pub query: QueryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub batch_size: usize,
    pub target_partitions: usize,
    pub time_zone: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendsConfig {
    /// Comma-separated backend names; empty enables every backend
    pub enabled: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetsConfig {
    /// `name=path` entries separated by commas
    pub sources: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    /// Largest accepted batch request
    pub max_batch_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub style: String,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Try to load from .env file
        let _ = dotenv::dotenv();

        let mut builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("engine.batch_size", 8192)?
            .set_default("engine.target_partitions", num_cpus::get() as u64)?
            .set_default("engine.time_zone", "UTC")?
            .set_default("backends.enabled", "")?
            .set_default("datasets.sources", "")?
            .set_default("query.max_batch_size", 100)?
            .set_default("logging.level", "info")?
            .set_default("logging.style", "auto")?;

        if let Ok(host) = env::var("HOST") {
            builder = builder.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            builder = builder.set_override("server.port", port.parse::<u16>().unwrap_or(3000))?;
        }

        if let Ok(batch_size) = env::var("ENGINE_BATCH_SIZE") {
            if let Ok(batch_size) = batch_size.parse::<u64>() {
                builder = builder.set_override("engine.batch_size", batch_size)?;
            }
        }

        if let Ok(partitions) = env::var("ENGINE_TARGET_PARTITIONS") {
            if let Ok(partitions) = partitions.parse::<u64>() {
                builder = builder.set_override("engine.target_partitions", partitions)?;
            }
        }

        if let Ok(time_zone) = env::var("ENGINE_TIME_ZONE") {
            builder = builder.set_override("engine.time_zone", time_zone)?;
        }

        if let Ok(enabled) = env::var("ENABLED_BACKENDS") {
            builder = builder.set_override("backends.enabled", enabled)?;
        }

        if let Ok(sources) = env::var("DATASETS") {
            builder = builder.set_override("datasets.sources", sources)?;
        }

        if let Ok(max_batch) = env::var("QUERY_MAX_BATCH_SIZE") {
            if let Ok(max_batch) = max_batch.parse::<u64>() {
                builder = builder.set_override("query.max_batch_size", max_batch)?;
            }
        }

        if let Ok(log_level) = env::var("RUST_LOG") {
            builder = builder.set_override("logging.level", log_level)?;
        }

        if let Ok(log_style) = env::var("RUST_LOG_STYLE") {
            builder = builder.set_override("logging.style", log_style)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Embedded engine settings
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            batch_size: self.engine.batch_size,
            target_partitions: self.engine.target_partitions,
            time_zone: self.engine.time_zone.clone(),
        }
    }

    /// Backend names listed in `backends.enabled`
    pub fn enabled_backends(&self) -> Vec<String> {
        self.backends
            .enabled
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        env::remove_var("HOST");
        env::remove_var("PORT");
        env::remove_var("ENABLED_BACKENDS");
        env::remove_var("QUERY_MAX_BATCH_SIZE");

        let config = Config::from_env();
        assert!(config.is_ok());

        let config = config.unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.query.max_batch_size, 100);
        assert!(config.enabled_backends().is_empty());
        assert!(config.session_config().target_partitions >= 1);
    }

    #[test]
    fn test_enabled_backends_parsing() {
        let mut config = Config::from_env().unwrap();
        config.backends.enabled = "arrow, json_records,,".to_string();
        assert_eq!(config.enabled_backends(), vec!["arrow", "json_records"]);
    }
}
