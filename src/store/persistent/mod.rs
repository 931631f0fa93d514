//! Persistent edge storage using RocksDB.
//!
//! This module is only available when the `rocksdb-storage` feature is enabled.

#[cfg(feature = "rocksdb-storage")]
pub mod rocks_graph;

#[cfg(feature = "rocksdb-storage")]
pub use rocks_graph::RocksGraphStore;

#[cfg(feature = "rocksdb-storage")]
use rocksdb::{Options, DB};
#[cfg(feature = "rocksdb-storage")]
use std::path::Path;
#[cfg(feature = "rocksdb-storage")]
use std::sync::Arc;

#[cfg(feature = "rocksdb-storage")]
use crate::error::{CovisitError, CovisitResult};

/// Column family names
#[cfg(feature = "rocksdb-storage")]
pub const CF_EDGES: &str = "co_visitation_edges";

/// Opens a RocksDB instance with all required column families.
#[cfg(feature = "rocksdb-storage")]
pub fn open_db<P: AsRef<Path>>(path: P) -> CovisitResult<Arc<DB>> {
    let mut opts = Options::default();
    opts.create_if_missing(true);
    opts.create_missing_column_families(true);

    let db = DB::open_cf(&opts, path, [CF_EDGES])
        .map_err(|e| CovisitError::Store(format!("Failed to open RocksDB: {}", e)))?;

    Ok(Arc::new(db))
}
