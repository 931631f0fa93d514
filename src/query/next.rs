use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::CovisitResult;
use crate::geo::{haversine_km, round_km};
use crate::graph::CoVisitationGraph;
use crate::model::destination::DestinationId;
use crate::model::suggestion::Suggestion;
use crate::source::catalog::DestinationCatalog;

// ---------------------------------------------------------------------------
// Next-place suggestions
// ---------------------------------------------------------------------------

/// Options for [`suggest_next_places`].
#[derive(Debug, Clone)]
pub struct SuggestOptions {
    /// Maximum number of suggestions returned.
    pub limit: usize,
    /// Destinations that must not be suggested.
    pub exclude: HashSet<DestinationId>,
    /// Whether to drop successors farther than `max_distance_km`.
    pub consider_distance: bool,
    /// Distance cap in km; zero or less disables the filter.
    pub max_distance_km: f64,
}

impl Default for SuggestOptions {
    fn default() -> Self {
        Self {
            limit: 5,
            exclude: HashSet::new(),
            consider_distance: true,
            max_distance_km: 10.0,
        }
    }
}

impl SuggestOptions {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn excluding(mut self, ids: impl IntoIterator<Item = DestinationId>) -> Self {
        self.exclude.extend(ids);
        self
    }

    pub fn with_max_distance(mut self, km: f64) -> Self {
        self.consider_distance = true;
        self.max_distance_km = km;
        self
    }

    pub fn without_distance(mut self) -> Self {
        self.consider_distance = false;
        self
    }

    fn filters_distance(&self) -> bool {
        self.consider_distance && self.max_distance_km > 0.0
    }
}

/// Rank the successors of `current`, excluded ids removed.
///
/// Scores are normalized by the heaviest remaining successor, so the first
/// entry always scores exactly 1.0. Ties are broken by ascending id.
pub fn rank_successors(
    graph: &CoVisitationGraph,
    current: DestinationId,
    exclude: &HashSet<DestinationId>,
) -> Vec<Suggestion> {
    let candidates: Vec<_> = graph
        .successors(current)
        .filter(|(id, _)| !exclude.contains(id))
        .collect();

    let Some(max_weight) = candidates.iter().map(|(_, w)| w.weight).max() else {
        return Vec::new();
    };

    let mut ranked: Vec<Suggestion> = candidates
        .into_iter()
        .map(|(destination_id, w)| Suggestion {
            destination_id,
            score: w.weight as f64 / max_weight as f64,
            weight: w.weight,
            frequency: w.frequency,
            reason: format!("Visited by {} users after this place", w.frequency),
            distance_km: None,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.destination_id.cmp(&b.destination_id))
    });
    ranked
}

/// Suggest places commonly visited right after `current`.
///
/// A place without outgoing edges yields an empty list. When distance
/// filtering is requested, up to `2 * limit` top-ranked candidates are
/// located and those beyond `max_distance_km` (or without coordinates) are
/// dropped. If the current place cannot be located, or the catalog fails,
/// the ranking is returned unfiltered.
pub async fn suggest_next_places(
    graph: &CoVisitationGraph,
    catalog: &dyn DestinationCatalog,
    current: DestinationId,
    options: &SuggestOptions,
) -> Vec<Suggestion> {
    if options.limit == 0 {
        return Vec::new();
    }

    let mut ranked = rank_successors(graph, current, &options.exclude);
    if ranked.is_empty() {
        debug!(current, "No successors for destination");
        return ranked;
    }

    if options.filters_distance() {
        match filter_by_distance(catalog, current, &ranked, options).await {
            Ok(Some(filtered)) => return filtered,
            Ok(None) => debug!(current, "Current destination has no coordinates; distance filter skipped"),
            Err(e) => warn!(current, error = %e, "Distance filtering failed; returning unfiltered suggestions"),
        }
    }

    ranked.truncate(options.limit);
    ranked
}

/// `Ok(None)` when the origin has no known location.
async fn filter_by_distance(
    catalog: &dyn DestinationCatalog,
    current: DestinationId,
    ranked: &[Suggestion],
    options: &SuggestOptions,
) -> CovisitResult<Option<Vec<Suggestion>>> {
    let Some(origin) = catalog.get_location(current).await? else {
        return Ok(None);
    };

    let mut kept = Vec::with_capacity(options.limit);
    for suggestion in ranked.iter().take(options.limit.saturating_mul(2)) {
        let Some(location) = catalog.get_location(suggestion.destination_id).await? else {
            continue;
        };
        let distance = haversine_km(&origin, &location);
        if distance <= options.max_distance_km {
            kept.push(Suggestion {
                distance_km: Some(round_km(distance)),
                ..suggestion.clone()
            });
            if kept.len() == options.limit {
                break;
            }
        }
    }
    Ok(Some(kept))
}
