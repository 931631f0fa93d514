use serde::{Deserialize, Serialize};

use crate::model::destination::DestinationId;

// ---------------------------------------------------------------------------
// Suggestion and itinerary result types
// ---------------------------------------------------------------------------

/// A ranked successor of the current place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub destination_id: DestinationId,
    /// Edge weight divided by the heaviest outgoing edge of the current place.
    pub score: f64,
    pub weight: u32,
    pub frequency: u32,
    pub reason: String,
    /// Present only when distance filtering ran and both places have coordinates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

/// A destination placed into an itinerary day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryPlace {
    pub destination_id: DestinationId,
    pub name: String,
    pub category: Option<String>,
    pub lat: f64,
    pub lng: f64,
    /// Combined graph/distance score that selected this place; `None` for the day's anchor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// One day of an optimized itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryDay {
    /// 1-based day index.
    pub day: usize,
    pub places: Vec<ItineraryPlace>,
}

/// Result of greedy multi-day itinerary optimization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedItinerary {
    pub days: Vec<ItineraryDay>,
    /// Sum of consecutive within-day distances; cross-day legs are not counted.
    pub total_distance_km: f64,
    pub optimization_method: String,
    /// Resolved destinations that did not fit into `max_days`.
    #[serde(default)]
    pub unscheduled: Vec<DestinationId>,
}

impl OptimizedItinerary {
    pub const METHOD: &'static str = "graph_and_distance";

    pub fn empty() -> Self {
        Self {
            days: Vec::new(),
            total_distance_km: 0.0,
            optimization_method: Self::METHOD.to_string(),
            unscheduled: Vec::new(),
        }
    }

    /// Total number of places across all days.
    pub fn place_count(&self) -> usize {
        self.days.iter().map(|d| d.places.len()).sum()
    }
}
