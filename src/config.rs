use crate::error::{CovisitError, CovisitResult};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub graph: GraphConfig,
    pub storage: StorageConfig,
    pub data: DataConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Training parameters for the co-visitation graph.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Minimum accumulated transition count for an edge to survive.
    pub min_weight: u32,
    /// Days of visit history considered by a training run.
    pub lookback_days: u32,
    /// Fewer visit records than this is treated as insufficient data.
    pub min_visit_records: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            min_weight: 2,
            lookback_days: 180,
            min_visit_records: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Surreal,
    Rocksdb,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for the RocksDB backend.
    pub path: PathBuf,
    /// SurrealDB endpoint, e.g. `memory`.
    pub surreal_endpoint: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: PathBuf::from("data/covisit"),
            surreal_endpoint: "memory".to_string(),
        }
    }
}

/// JSON files backing the visit-history and catalog collaborators.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub visits_path: Option<PathBuf>,
    pub catalog_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
}

pub fn load_config(path: Option<&Path>) -> CovisitResult<AppConfig> {
    let mut builder = Config::builder().add_source(File::with_name("covisit").required(false));

    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("COVISIT").separator("__"));

    let config = builder
        .build()
        .map_err(|err| CovisitError::Config(err.to_string()))?;

    let parsed: AppConfig = config
        .try_deserialize()
        .map_err(|err| CovisitError::Config(err.to_string()))?;

    if parsed.graph.min_weight == 0 {
        return Err(CovisitError::Config(
            "graph.min_weight must be at least 1".to_string(),
        ));
    }
    if !(30..=365).contains(&parsed.graph.lookback_days) {
        return Err(CovisitError::Config(format!(
            "graph.lookback_days must be within 30..=365, got {}",
            parsed.graph.lookback_days
        )));
    }

    Ok(parsed)
}
