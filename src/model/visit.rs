use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::destination::DestinationId;

/// A single recorded visit, supplied by the visit-history source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitEvent {
    pub user_id: Uuid,
    pub destination_id: DestinationId,
    pub visited_at: DateTime<Utc>,
}

impl VisitEvent {
    pub fn new(user_id: Uuid, destination_id: DestinationId, visited_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            destination_id,
            visited_at,
        }
    }
}

/// One user's destinations, ascending by visit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    pub user_id: Uuid,
    pub destinations: Vec<DestinationId>,
}

impl Sequence {
    /// Number of consecutive (src, dst) pairs in this sequence.
    pub fn transition_count(&self) -> usize {
        self.destinations.len().saturating_sub(1)
    }
}

impl AsRef<[DestinationId]> for Sequence {
    fn as_ref(&self) -> &[DestinationId] {
        &self.destinations
    }
}
