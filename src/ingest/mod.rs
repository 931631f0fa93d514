use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::model::destination::DestinationId;
use crate::model::visit::{Sequence, VisitEvent};

// ---------------------------------------------------------------------------
// Sequence extraction: raw visits -> per-user, time-ordered destination lists
// ---------------------------------------------------------------------------

/// Group visits by user and order each group by visit time.
///
/// Users with fewer than two visits produce no transitions and are left out.
/// Output is ordered by user id; visits sharing a timestamp are ordered by
/// destination id so that identical input always yields identical sequences.
pub fn extract_sequences(visits: &[VisitEvent]) -> Vec<Sequence> {
    let mut by_user: BTreeMap<Uuid, Vec<(DateTime<Utc>, DestinationId)>> = BTreeMap::new();
    for visit in visits {
        by_user
            .entry(visit.user_id)
            .or_default()
            .push((visit.visited_at, visit.destination_id));
    }

    let users = by_user.len();
    let sequences: Vec<Sequence> = by_user
        .into_iter()
        .filter(|(_, visits)| visits.len() >= 2)
        .map(|(user_id, mut visits)| {
            visits.sort_unstable();
            Sequence {
                user_id,
                destinations: visits.into_iter().map(|(_, dest)| dest).collect(),
            }
        })
        .collect();

    debug!(
        visits = visits.len(),
        users,
        sequences = sequences.len(),
        "Extracted visit sequences"
    );

    sequences
}

/// Keep only visits at or after `since`.
pub fn within_window(visits: Vec<VisitEvent>, since: DateTime<Utc>) -> Vec<VisitEvent> {
    visits
        .into_iter()
        .filter(|v| v.visited_at >= since)
        .collect()
}
