//! RocksDB-backed graph store implementation.

use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{BoundColumnFamily, IteratorMode, WriteBatch, DB};
use std::sync::Arc;

use crate::error::{CovisitError, CovisitResult};
use crate::model::destination::DestinationId;
use crate::model::edge::GraphEdge;
use crate::store::graph::{sort_by_weight_desc, GraphStore, StoredEdge};

use super::CF_EDGES;

/// RocksDB-backed graph store; one key per (source, dest) pair.
#[derive(Clone)]
pub struct RocksGraphStore {
    db: Arc<DB>,
}

impl RocksGraphStore {
    /// Create a new RocksDB graph store.
    pub fn new(db: Arc<DB>) -> Self {
        Self { db }
    }

    fn cf_edges(&self) -> CovisitResult<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(CF_EDGES)
            .ok_or_else(|| CovisitError::Store("Missing edges column family".to_string()))
    }

    /// Key format: [source (8 bytes)][dest (8 bytes)], sign bit flipped so
    /// byte order matches numeric order.
    fn edge_key(source: DestinationId, dest: DestinationId) -> [u8; 16] {
        let mut key = [0u8; 16];
        key[..8].copy_from_slice(&((source as u64) ^ (1 << 63)).to_be_bytes());
        key[8..].copy_from_slice(&((dest as u64) ^ (1 << 63)).to_be_bytes());
        key
    }

    fn serialize_edge(edge: &StoredEdge) -> CovisitResult<Vec<u8>> {
        bincode::serialize(edge)
            .map_err(|e| CovisitError::Store(format!("Failed to serialize edge: {}", e)))
    }

    fn deserialize_edge(bytes: &[u8]) -> CovisitResult<StoredEdge> {
        bincode::deserialize(bytes)
            .map_err(|e| CovisitError::Store(format!("Failed to deserialize edge: {}", e)))
    }
}

#[async_trait]
impl GraphStore for RocksGraphStore {
    async fn save(&self, edges: &[GraphEdge]) -> CovisitResult<usize> {
        let cf = self.cf_edges()?;
        let now = Utc::now();
        let mut batch = WriteBatch::default();

        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, _) = item
                .map_err(|e| CovisitError::Store(format!("Failed to iterate edges: {}", e)))?;
            batch.delete_cf(&cf, key);
        }

        let mut keys = std::collections::BTreeSet::new();
        for edge in edges {
            let key = Self::edge_key(edge.source_id, edge.dest_id);
            batch.put_cf(&cf, key, Self::serialize_edge(&StoredEdge::from_edge(edge, now))?);
            keys.insert(key);
        }

        self.db
            .write(batch)
            .map_err(|e| CovisitError::Store(format!("Failed to write edges: {}", e)))?;

        Ok(keys.len())
    }

    async fn load(&self) -> CovisitResult<Vec<StoredEdge>> {
        let cf = self.cf_edges()?;
        let mut edges = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item
                .map_err(|e| CovisitError::Store(format!("Failed to iterate edges: {}", e)))?;
            edges.push(Self::deserialize_edge(&value)?);
        }
        sort_by_weight_desc(&mut edges);
        Ok(edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::persistent::open_db;

    #[test]
    fn test_key_order_matches_numeric_order() {
        let keys = [
            RocksGraphStore::edge_key(-5, 0),
            RocksGraphStore::edge_key(0, -1),
            RocksGraphStore::edge_key(0, 3),
            RocksGraphStore::edge_key(7, 1),
        ];
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_save_load_and_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        {
            let store = RocksGraphStore::new(open_db(dir.path()).unwrap());
            store
                .save(&[GraphEdge::new(1, 2, 3), GraphEdge::new(2, 1, 8)])
                .await
                .unwrap();
        }

        let store = RocksGraphStore::new(open_db(dir.path()).unwrap());
        let loaded = store.load().await.unwrap();
        let edges: Vec<_> = loaded.iter().map(|e| (e.source_id, e.dest_id, e.weight)).collect();
        assert_eq!(edges, vec![(2, 1, 8), (1, 2, 3)]);
    }

    #[tokio::test]
    async fn test_save_replaces_previous_edges() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = RocksGraphStore::new(open_db(dir.path()).unwrap());
        store.save(&[GraphEdge::new(1, 2, 3)]).await.unwrap();
        assert_eq!(store.save(&[GraphEdge::new(5, 6, 2)]).await.unwrap(), 1);

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].edge().key(), (5, 6));
    }
}
