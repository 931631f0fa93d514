use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::error::CovisitResult;
use crate::model::destination::DestinationId;
use crate::model::edge::GraphEdge;

// ---------------------------------------------------------------------------
// GraphStore trait: durable storage for co-visitation edges
// ---------------------------------------------------------------------------

/// Trait for backends that persist and reload graph edges.
///
/// Failures are reported to the caller; they never touch the graph that is
/// currently being served.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Replace the persisted edge set with `edges`, upserting by
    /// (source_id, dest_id). Weight, frequency and the update timestamp are
    /// overwritten on collision. Returns the number of edges written.
    async fn save(&self, edges: &[GraphEdge]) -> CovisitResult<usize>;

    /// All persisted edges, heaviest first.
    async fn load(&self) -> CovisitResult<Vec<StoredEdge>>;

    /// Number of persisted edges.
    async fn edge_count(&self) -> CovisitResult<usize> {
        Ok(self.load().await?.len())
    }
}

/// An edge as persisted, with the time it was last written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEdge {
    pub source_id: DestinationId,
    pub dest_id: DestinationId,
    pub weight: u32,
    pub frequency: u32,
    pub updated_at: DateTime<Utc>,
}

impl StoredEdge {
    pub fn from_edge(edge: &GraphEdge, updated_at: DateTime<Utc>) -> Self {
        Self {
            source_id: edge.source_id,
            dest_id: edge.dest_id,
            weight: edge.weight,
            frequency: edge.frequency,
            updated_at,
        }
    }

    pub fn edge(&self) -> GraphEdge {
        GraphEdge::new(self.source_id, self.dest_id, self.weight).with_frequency(self.frequency)
    }
}

/// Order edges heaviest first, ties by (source, dest) for stable display.
pub fn sort_by_weight_desc(edges: &mut [StoredEdge]) {
    edges.sort_by(|a, b| {
        b.weight
            .cmp(&a.weight)
            .then(a.source_id.cmp(&b.source_id))
            .then(a.dest_id.cmp(&b.dest_id))
    });
}

// ---------------------------------------------------------------------------
// InMemoryGraphStore: for testing and fallback
// ---------------------------------------------------------------------------

/// Graph store keeping edges in a map keyed by (source, dest).
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    edges: RwLock<BTreeMap<(DestinationId, DestinationId), StoredEdge>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn save(&self, edges: &[GraphEdge]) -> CovisitResult<usize> {
        let now = Utc::now();
        let mut stored = self.edges.write().await;
        stored.clear();
        for edge in edges {
            stored.insert(edge.key(), StoredEdge::from_edge(edge, now));
        }
        Ok(stored.len())
    }

    async fn load(&self) -> CovisitResult<Vec<StoredEdge>> {
        let mut edges: Vec<StoredEdge> = self.edges.read().await.values().cloned().collect();
        sort_by_weight_desc(&mut edges);
        Ok(edges)
    }

    async fn edge_count(&self) -> CovisitResult<usize> {
        Ok(self.edges.read().await.len())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
