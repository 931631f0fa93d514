//! The co-visitation graph and the machinery that builds and publishes it.
//!
//! A [`CoVisitationGraph`] is immutable once built. Nodes are mapped to dense
//! `u32` indices (ascending by destination id) and successors are stored in
//! compressed sparse row form: `offsets[i]..offsets[i + 1]` indexes the
//! `targets`/`weights` arrays for node `i`, with targets ascending. Iterating
//! the successors of a place therefore costs O(out-degree), and a single edge
//! lookup is a binary search within that range.

pub mod builder;
pub mod snapshot;

pub use builder::{build_co_visitation_graph, GraphBuilder};
pub use snapshot::{GraphHandle, GraphSnapshot};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::model::destination::DestinationId;
use crate::model::edge::{EdgeWeight, GraphEdge};

// ---------------------------------------------------------------------------
// GraphStats
// ---------------------------------------------------------------------------

/// Summary statistics recorded when a graph is built or reloaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    /// Raw consecutive-pair count, including pairs later filtered out.
    /// `None` for graphs reloaded from a store.
    pub transitions: Option<u64>,
    /// User sequences that contributed at least one transition.
    pub sequences: Option<usize>,
    /// Threshold the graph was filtered with, when known.
    pub min_weight: Option<u32>,
    /// Sum of per-node out-degree divided by node count.
    pub avg_out_degree: f64,
    /// When the edges were counted. For reloaded graphs this is the newest
    /// stored edge's write time, `None` if unknown.
    pub trained_at: Option<DateTime<Utc>>,
}

/// How a graph came to be, fed into its statistics.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct BuildInfo {
    pub transitions: Option<u64>,
    pub sequences: Option<usize>,
    pub min_weight: Option<u32>,
    pub trained_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// CoVisitationGraph
// ---------------------------------------------------------------------------

/// Directed weighted graph of "visited A, then B" transitions.
#[derive(Debug, Clone)]
pub struct CoVisitationGraph {
    ids: Vec<DestinationId>,
    index: HashMap<DestinationId, u32>,
    offsets: Vec<usize>,
    targets: Vec<u32>,
    weights: Vec<EdgeWeight>,
    stats: GraphStats,
}

impl CoVisitationGraph {
    /// A graph with no nodes and no edges.
    pub fn empty() -> Self {
        Self::assemble(Vec::new(), BuildInfo::default())
    }

    /// Rebuild a graph from a persisted edge list.
    ///
    /// Edge order is irrelevant. Edges with zero weight are ignored and a
    /// repeated (source, dest) key keeps the last occurrence.
    pub fn from_edges(edges: impl IntoIterator<Item = GraphEdge>) -> Self {
        let mut edges: Vec<GraphEdge> = edges.into_iter().filter(|e| e.weight > 0).collect();
        edges.sort_by_key(GraphEdge::key);

        let mut deduped: Vec<GraphEdge> = Vec::with_capacity(edges.len());
        for edge in edges {
            match deduped.last_mut() {
                Some(last) if last.key() == edge.key() => *last = edge,
                _ => deduped.push(edge),
            }
        }

        Self::assemble(deduped, BuildInfo::default())
    }

    /// Build the dense adjacency arrays. `edges` must be sorted by key and unique.
    pub(crate) fn assemble(edges: Vec<GraphEdge>, info: BuildInfo) -> Self {
        let ids: Vec<DestinationId> = edges
            .iter()
            .flat_map(|e| [e.source_id, e.dest_id])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index: HashMap<DestinationId, u32> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i as u32))
            .collect();

        let mut offsets = vec![0usize; ids.len() + 1];
        let mut targets = Vec::with_capacity(edges.len());
        let mut weights = Vec::with_capacity(edges.len());
        for edge in &edges {
            offsets[index[&edge.source_id] as usize + 1] += 1;
            targets.push(index[&edge.dest_id]);
            weights.push(edge.weights());
        }
        for i in 1..offsets.len() {
            offsets[i] += offsets[i - 1];
        }

        let nodes = ids.len();
        let edge_count = targets.len();
        let stats = GraphStats {
            nodes,
            edges: edge_count,
            transitions: info.transitions,
            sequences: info.sequences,
            min_weight: info.min_weight,
            avg_out_degree: if nodes == 0 {
                0.0
            } else {
                edge_count as f64 / nodes as f64
            },
            trained_at: info.trained_at,
        };

        Self {
            ids,
            index,
            offsets,
            targets,
            weights,
            stats,
        }
    }

    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    pub fn edge_count(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether the destination is an endpoint of any retained edge.
    pub fn contains(&self, id: DestinationId) -> bool {
        self.index.contains_key(&id)
    }

    /// All node ids, ascending.
    pub fn nodes(&self) -> &[DestinationId] {
        &self.ids
    }

    pub fn stats(&self) -> &GraphStats {
        &self.stats
    }

    /// Record when the edges of a reloaded graph were originally written.
    pub fn with_trained_at(mut self, trained_at: DateTime<Utc>) -> Self {
        self.stats.trained_at = Some(trained_at);
        self
    }

    fn edge_range(&self, id: DestinationId) -> std::ops::Range<usize> {
        match self.index.get(&id) {
            Some(&i) => self.offsets[i as usize]..self.offsets[i as usize + 1],
            None => 0..0,
        }
    }

    pub fn out_degree(&self, id: DestinationId) -> usize {
        self.edge_range(id).len()
    }

    /// Outgoing edges of `id`, ascending by target id.
    pub fn successors(
        &self,
        id: DestinationId,
    ) -> impl Iterator<Item = (DestinationId, EdgeWeight)> + '_ {
        self.edge_range(id)
            .map(move |e| (self.ids[self.targets[e] as usize], self.weights[e]))
    }

    /// The direct edge `source -> dest`, if retained.
    pub fn edge(&self, source: DestinationId, dest: DestinationId) -> Option<EdgeWeight> {
        let dest_index = *self.index.get(&dest)?;
        let range = self.edge_range(source);
        let start = range.start;
        self.targets[range]
            .binary_search(&dest_index)
            .ok()
            .map(|pos| self.weights[start + pos])
    }

    /// Every edge, ordered by (source, dest).
    pub fn edges(&self) -> impl Iterator<Item = GraphEdge> + '_ {
        (0..self.ids.len()).flat_map(move |i| {
            let source_id = self.ids[i];
            (self.offsets[i]..self.offsets[i + 1]).map(move |e| GraphEdge {
                source_id,
                dest_id: self.ids[self.targets[e] as usize],
                weight: self.weights[e].weight,
                frequency: self.weights[e].frequency,
            })
        })
    }
}

impl Default for CoVisitationGraph {
    fn default() -> Self {
        Self::empty()
    }
}
