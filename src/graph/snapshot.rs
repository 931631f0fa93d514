use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::graph::CoVisitationGraph;

/// A published, immutable graph version.
#[derive(Debug)]
pub struct GraphSnapshot {
    /// Monotonically increasing publish counter, starting at 1.
    pub generation: u64,
    pub published_at: DateTime<Utc>,
    pub graph: CoVisitationGraph,
}

/// Holder of the graph currently served to readers.
///
/// Readers clone the `Arc` and keep querying their snapshot while a new
/// graph is built elsewhere; `publish` only swaps the pointer.
#[derive(Debug, Default)]
pub struct GraphHandle {
    current: RwLock<Option<Arc<GraphSnapshot>>>,
}

impl GraphHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// The snapshot in use right now, if any graph has been published.
    pub async fn snapshot(&self) -> Option<Arc<GraphSnapshot>> {
        self.current.read().await.clone()
    }

    /// Replace the served graph wholesale.
    pub async fn publish(&self, graph: CoVisitationGraph) -> Arc<GraphSnapshot> {
        let mut current = self.current.write().await;
        install(&mut current, graph)
    }

    /// Publish `graph` only if nothing has been published yet.
    ///
    /// Returns `None`, dropping `graph`, when another graph got there first.
    /// Used for lazy loads so a slow reload never replaces a fresher graph.
    pub async fn publish_if_empty(&self, graph: CoVisitationGraph) -> Option<Arc<GraphSnapshot>> {
        let mut current = self.current.write().await;
        if current.is_some() {
            return None;
        }
        Some(install(&mut current, graph))
    }

    pub async fn is_published(&self) -> bool {
        self.current.read().await.is_some()
    }
}

fn install(current: &mut Option<Arc<GraphSnapshot>>, graph: CoVisitationGraph) -> Arc<GraphSnapshot> {
    let generation = current.as_ref().map_or(1, |s| s.generation + 1);
    let snapshot = Arc::new(GraphSnapshot {
        generation,
        published_at: Utc::now(),
        graph,
    });
    *current = Some(Arc::clone(&snapshot));

    info!(
        generation,
        nodes = snapshot.graph.node_count(),
        edges = snapshot.graph.edge_count(),
        "Published co-visitation graph"
    );
    snapshot
}
