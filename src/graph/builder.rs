use chrono::Utc;
use std::collections::HashMap;

use tracing::info;

use crate::graph::{BuildInfo, CoVisitationGraph};
use crate::ingest::extract_sequences;
use crate::model::destination::DestinationId;
use crate::model::edge::GraphEdge;
use crate::model::visit::VisitEvent;

/// Default minimum edge weight.
pub const DEFAULT_MIN_WEIGHT: u32 = 2;

/// Turns visit sequences into a filtered co-visitation graph.
#[derive(Debug, Clone, Copy)]
pub struct GraphBuilder {
    min_weight: u32,
}

impl GraphBuilder {
    /// A `min_weight` of zero is treated as one: every edge has weight >= 1.
    pub fn new(min_weight: u32) -> Self {
        Self {
            min_weight: min_weight.max(1),
        }
    }

    pub fn min_weight(&self) -> u32 {
        self.min_weight
    }

    /// Count every consecutive pair across all sequences and keep the pairs
    /// seen at least `min_weight` times.
    ///
    /// Consecutive repeats (A, A) are counted like any other pair and may
    /// produce self-loops.
    pub fn build<S: AsRef<[DestinationId]>>(&self, sequences: &[S]) -> CoVisitationGraph {
        let mut counts: HashMap<(DestinationId, DestinationId), u32> = HashMap::new();
        let mut transitions: u64 = 0;
        let mut contributing = 0usize;

        for sequence in sequences {
            let sequence = sequence.as_ref();
            if sequence.len() >= 2 {
                contributing += 1;
            }
            for pair in sequence.windows(2) {
                *counts.entry((pair[0], pair[1])).or_insert(0) += 1;
                transitions += 1;
            }
        }

        let distinct_pairs = counts.len();
        let mut kept: Vec<GraphEdge> = counts
            .into_iter()
            .filter(|(_, count)| *count >= self.min_weight)
            .map(|((src, dst), count)| GraphEdge::new(src, dst, count))
            .collect();
        kept.sort_unstable_by_key(GraphEdge::key);

        let graph = CoVisitationGraph::assemble(
            kept,
            BuildInfo {
                transitions: Some(transitions),
                sequences: Some(contributing),
                min_weight: Some(self.min_weight),
                trained_at: Some(Utc::now()),
            },
        );

        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            transitions,
            distinct_pairs,
            min_weight = self.min_weight,
            "Graph built"
        );

        graph
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_WEIGHT)
    }
}

/// Extract sequences from raw visits and build the graph in one pass.
pub fn build_co_visitation_graph(visits: &[VisitEvent], min_weight: u32) -> CoVisitationGraph {
    let sequences = extract_sequences(visits);
    GraphBuilder::new(min_weight).build(&sequences)
}
