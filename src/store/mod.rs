pub mod graph;
pub mod persistent;
pub mod surreal;

pub use graph::{GraphStore, InMemoryGraphStore, StoredEdge};
pub use surreal::SurrealGraphStore;

#[cfg(feature = "rocksdb-storage")]
pub use persistent::{open_db, RocksGraphStore};

use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::CovisitResult;

/// Open the graph store selected by configuration.
pub async fn open_graph_store(config: &StorageConfig) -> CovisitResult<Arc<dyn GraphStore>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(InMemoryGraphStore::new())),
        StorageBackend::Surreal => Ok(Arc::new(
            SurrealGraphStore::connect(&config.surreal_endpoint).await?,
        )),
        #[cfg(feature = "rocksdb-storage")]
        StorageBackend::Rocksdb => Ok(Arc::new(RocksGraphStore::new(open_db(&config.path)?))),
        #[cfg(not(feature = "rocksdb-storage"))]
        StorageBackend::Rocksdb => Err(crate::error::CovisitError::Config(
            "storage.backend = rocksdb requires the rocksdb-storage feature".to_string(),
        )),
    }
}
