use serde::{Deserialize, Serialize};

use crate::model::destination::DestinationId;

// ---------------------------------------------------------------------------
// GraphEdge: a "visited A then B" transition in the co-visitation graph
// ---------------------------------------------------------------------------

/// A directed, weighted edge of the co-visitation graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Place visited first.
    pub source_id: DestinationId,
    /// Place visited immediately afterwards.
    pub dest_id: DestinationId,
    /// Number of user sequences containing the consecutive pair.
    pub weight: u32,
    /// Mirrors `weight` for graphs built from visit history.
    pub frequency: u32,
}

impl GraphEdge {
    /// Create an edge whose frequency equals its weight.
    pub fn new(source_id: DestinationId, dest_id: DestinationId, weight: u32) -> Self {
        Self {
            source_id,
            dest_id,
            weight,
            frequency: weight,
        }
    }

    /// Set a frequency distinct from the weight (e.g. when reloaded from a store).
    pub fn with_frequency(mut self, frequency: u32) -> Self {
        self.frequency = frequency;
        self
    }

    /// The (source, destination) key edges are upserted by.
    pub fn key(&self) -> (DestinationId, DestinationId) {
        (self.source_id, self.dest_id)
    }

    pub fn weights(&self) -> EdgeWeight {
        EdgeWeight {
            weight: self.weight,
            frequency: self.frequency,
        }
    }
}

/// The compact payload stored per successor in the adjacency arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeWeight {
    pub weight: u32,
    pub frequency: u32,
}
