use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::CovisitResult;
use crate::graph::CoVisitationGraph;
use crate::model::destination::{DestinationId, DestinationSummary};
use crate::model::suggestion::Suggestion;
use crate::query::next::{suggest_next_places, SuggestOptions};
use crate::source::catalog::DestinationCatalog;

/// Successors considered at each step of the walk.
pub const STEP_CANDIDATES: usize = 10;

#[derive(Debug, Clone)]
pub struct DayOptions {
    /// Preferred categories; when set, the first candidate whose category
    /// contains one of these (case-insensitively) is chosen.
    pub categories: Option<Vec<String>>,
    /// Upper bound on the number of places, start included.
    pub max_places: usize,
}

impl Default for DayOptions {
    fn default() -> Self {
        Self {
            categories: None,
            max_places: 5,
        }
    }
}

impl DayOptions {
    pub fn with_max_places(mut self, max_places: usize) -> Self {
        self.max_places = max_places;
        self
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = Some(categories);
        self
    }
}

/// Compose a day by walking the graph greedily from `start`.
///
/// Each step takes the best-ranked unvisited successor of the current place
/// (distance filter on), preferring one in `categories` when any matches.
/// The walk stops at `max_places` or at a place with no eligible successor.
/// Returns an empty list when `start` is not in the graph. Places the
/// catalog does not know are left out of the result.
pub async fn suggest_complete_day(
    graph: &CoVisitationGraph,
    catalog: &dyn DestinationCatalog,
    start: DestinationId,
    options: &DayOptions,
) -> CovisitResult<Vec<DestinationSummary>> {
    if !graph.contains(start) {
        debug!(start, "Start destination not in graph");
        return Ok(Vec::new());
    }

    let categories = options
        .categories
        .as_deref()
        .filter(|wanted| !wanted.is_empty());

    let mut sequence = vec![start];
    let mut visited: HashSet<DestinationId> = HashSet::from([start]);
    let mut current = start;

    while sequence.len() < options.max_places {
        let step = SuggestOptions {
            limit: STEP_CANDIDATES,
            exclude: visited.clone(),
            ..SuggestOptions::default()
        };
        let candidates = suggest_next_places(graph, catalog, current, &step).await;
        let Some(best) = candidates.first() else {
            break;
        };

        let next = match categories {
            Some(wanted) => first_in_categories(catalog, &candidates, wanted)
                .await
                .unwrap_or(best.destination_id),
            None => best.destination_id,
        };

        sequence.push(next);
        visited.insert(next);
        current = next;
    }

    debug!(start, places = sequence.len(), "Composed day");

    let mut day = Vec::with_capacity(sequence.len());
    for id in sequence {
        match catalog.get_destination(id).await? {
            Some(destination) => day.push(destination.summary()),
            None => warn!(destination_id = id, "Destination missing from catalog; left out of day"),
        }
    }
    Ok(day)
}

async fn first_in_categories(
    catalog: &dyn DestinationCatalog,
    candidates: &[Suggestion],
    wanted: &[String],
) -> Option<DestinationId> {
    for candidate in candidates {
        match catalog.get_destination(candidate.destination_id).await {
            Ok(Some(d)) if d.matches_any_category(wanted) => return Some(d.id),
            Ok(_) => {}
            Err(e) => {
                debug!(destination_id = candidate.destination_id, error = %e, "Category lookup failed")
            }
        }
    }
    None
}
