use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::CovisitResult;
use crate::geo::{haversine_km, round_km, Coordinates};
use crate::graph::CoVisitationGraph;
use crate::model::destination::DestinationId;
use crate::model::suggestion::{ItineraryDay, ItineraryPlace, OptimizedItinerary};
use crate::source::catalog::DestinationCatalog;

pub const MAX_PLACES_PER_DAY: usize = 4;

/// Share of the combined score taken by the co-visitation edge.
pub const GRAPH_WEIGHT: f64 = 0.6;
/// Share of the combined score taken by proximity.
pub const DISTANCE_WEIGHT: f64 = 0.4;
/// Edge weight that maps to a graph score of 1.0. Heavier edges score higher.
pub const GRAPH_WEIGHT_SCALE: f64 = 10.0;
/// Distance at which the proximity score reaches zero.
pub const DISTANCE_HORIZON_KM: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct ItineraryOptions {
    pub max_days: usize,
}

impl Default for ItineraryOptions {
    fn default() -> Self {
        Self { max_days: 3 }
    }
}

/// Score of moving from the last placed destination to a candidate.
///
/// `edge_weight` is the weight of the edge last -> candidate, `None` when
/// there is no such edge.
pub fn combined_score(edge_weight: Option<u32>, distance_km: f64) -> f64 {
    let graph_score = edge_weight.map_or(0.0, |w| w as f64 / GRAPH_WEIGHT_SCALE);
    let distance_score = (1.0 - distance_km / DISTANCE_HORIZON_KM).max(0.0);
    GRAPH_WEIGHT * graph_score + DISTANCE_WEIGHT * distance_score
}

fn location(place: &ItineraryPlace) -> Coordinates {
    Coordinates::new(place.lat, place.lng)
}

/// Sum of consecutive leg distances within one day.
pub fn day_distance_km(day: &ItineraryDay) -> f64 {
    day.places
        .windows(2)
        .map(|leg| haversine_km(&location(&leg[0]), &location(&leg[1])))
        .sum()
}

/// Split `destination_ids` into up to `max_days` days.
///
/// Ids are de-duplicated (first occurrence wins) and resolved through the
/// catalog; unknown ids and ids without coordinates are left out. Each day
/// is anchored on the first remaining destination in input order, then
/// extended greedily with the best [`combined_score`] from the last placed
/// destination, up to [`MAX_PLACES_PER_DAY`]. Destinations left once
/// `max_days` are filled are reported in `unscheduled`.
///
/// An empty graph or empty input yields an itinerary with no days.
pub async fn optimize_itinerary(
    graph: &CoVisitationGraph,
    catalog: &dyn DestinationCatalog,
    destination_ids: &[DestinationId],
    options: &ItineraryOptions,
) -> CovisitResult<OptimizedItinerary> {
    if graph.is_empty() || destination_ids.is_empty() {
        return Ok(OptimizedItinerary::empty());
    }

    let mut remaining = resolve_places(catalog, destination_ids).await?;
    let mut days: Vec<ItineraryDay> = Vec::new();

    while days.len() < options.max_days && !remaining.is_empty() {
        let anchor = remaining.remove(0);
        let mut places = vec![anchor];

        while places.len() < MAX_PLACES_PER_DAY {
            let Some(last) = places.last() else { break };
            let Some((index, score)) = best_next(graph, last, &remaining) else {
                break;
            };
            let mut next = remaining.remove(index);
            next.score = Some(score);
            places.push(next);
        }

        days.push(ItineraryDay {
            day: days.len() + 1,
            places,
        });
    }

    let total: f64 = days.iter().map(day_distance_km).sum();
    let itinerary = OptimizedItinerary {
        days,
        total_distance_km: round_km(total),
        optimization_method: OptimizedItinerary::METHOD.to_string(),
        unscheduled: remaining.iter().map(|p| p.destination_id).collect(),
    };

    debug!(
        requested = destination_ids.len(),
        days = itinerary.days.len(),
        places = itinerary.place_count(),
        unscheduled = itinerary.unscheduled.len(),
        total_distance_km = itinerary.total_distance_km,
        "Optimized itinerary"
    );
    Ok(itinerary)
}

/// Highest-scoring candidate after `last`; the earliest one wins ties.
fn best_next(
    graph: &CoVisitationGraph,
    last: &ItineraryPlace,
    remaining: &[ItineraryPlace],
) -> Option<(usize, f64)> {
    let from = location(last);
    let mut best: Option<(usize, f64)> = None;
    for (index, candidate) in remaining.iter().enumerate() {
        let distance = haversine_km(&from, &location(candidate));
        let weight = graph
            .edge(last.destination_id, candidate.destination_id)
            .map(|w| w.weight);
        let score = combined_score(weight, distance);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((index, score));
        }
    }
    best
}

async fn resolve_places(
    catalog: &dyn DestinationCatalog,
    destination_ids: &[DestinationId],
) -> CovisitResult<Vec<ItineraryPlace>> {
    let mut seen = HashSet::with_capacity(destination_ids.len());
    let mut places = Vec::with_capacity(destination_ids.len());

    for &id in destination_ids {
        if !seen.insert(id) {
            continue;
        }
        let Some(destination) = catalog.get_destination(id).await? else {
            warn!(destination_id = id, "Unknown destination; left out of itinerary");
            continue;
        };
        let Some(at) = destination.coordinates() else {
            warn!(destination_id = id, "Destination has no coordinates; left out of itinerary");
            continue;
        };
        places.push(ItineraryPlace {
            destination_id: id,
            name: destination.name,
            category: destination.category,
            lat: at.lat,
            lng: at.lng,
            score: None,
        });
    }
    Ok(places)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::destination::Destination;
    use crate::query::test_support::{catalog, graph, place, FailingCatalog};

    const X: DestinationId = 10;
    const Y: DestinationId = 11;
    const P: DestinationId = 20;
    const Q: DestinationId = 21;

    fn day_ids(it: &OptimizedItinerary) -> Vec<Vec<DestinationId>> {
        it.days
            .iter()
            .map(|d| d.places.iter().map(|p| p.destination_id).collect())
            .collect()
    }

    /// A graph with one unrelated edge so the optimizer has something loaded.
    fn unrelated_graph() -> CoVisitationGraph {
        graph(1, &[vec![P, Q]])
    }

    #[test]
    fn test_combined_score() {
        assert!((combined_score(None, 10.0) - 0.32).abs() < 1e-12);
        assert!((combined_score(Some(10), 0.0) - 1.0).abs() < 1e-12);
        assert_eq!(combined_score(None, 80.0), 0.0);
        // Edges heavier than the scale push the graph share past 0.6.
        assert!(combined_score(Some(20), 50.0) > 1.0);
    }

    #[tokio::test]
    async fn test_two_places_without_edge() {
        let cat = catalog(vec![place(X, 0.0), place(Y, 10.0)]);
        let opts = ItineraryOptions { max_days: 1 };
        let it = optimize_itinerary(&unrelated_graph(), &cat, &[X, Y], &opts)
            .await
            .unwrap();

        assert_eq!(day_ids(&it), vec![vec![X, Y]]);
        assert_eq!(it.days[0].day, 1);
        assert!(it.days[0].places[0].score.is_none());
        let score = it.days[0].places[1].score.unwrap();
        assert!((score - 0.32).abs() < 1e-9, "got {score}");
        assert!((it.total_distance_km - 10.0).abs() < 0.01);
        assert_eq!(it.optimization_method, "graph_and_distance");
        assert!(it.unscheduled.is_empty());
    }

    #[tokio::test]
    async fn test_edge_beats_proximity() {
        // X -> Q has weight 3: 0.6 * 0.3 + 0.4 * (1 - 20/50) = 0.42
        // X -> Y has no edge: 0.4 * (1 - 5/50) = 0.36
        let g = graph(1, &[vec![X, Q], vec![X, Q], vec![X, Q]]);
        let cat = catalog(vec![place(X, 0.0), place(Y, 5.0), place(Q, 20.0)]);
        let it = optimize_itinerary(&g, &cat, &[X, Y, Q], &ItineraryOptions::default())
            .await
            .unwrap();
        assert_eq!(day_ids(&it), vec![vec![X, Q, Y]]);
    }

    #[tokio::test]
    async fn test_days_split_and_cross_day_legs_ignored() {
        let ids: Vec<DestinationId> = (1..=6).collect();
        // Day 1 clusters around 0 km, day 2 anchors far away at 1000 km.
        let mut places: Vec<Destination> = (1..=4).map(|id| place(id, id as f64)).collect();
        places.push(place(5, 1000.0));
        places.push(place(6, 1003.0));
        let g = graph(1, &[vec![1, 2]]);
        let it = optimize_itinerary(&g, &catalog(places), &ids, &ItineraryOptions::default())
            .await
            .unwrap();

        assert_eq!(day_ids(&it), vec![vec![1, 2, 3, 4], vec![5, 6]]);
        assert_eq!(it.days[1].day, 2);
        // 3 km inside day 1, 3 km inside day 2; the 996 km hop is not counted.
        assert!((it.total_distance_km - 6.0).abs() < 0.01, "got {}", it.total_distance_km);
        assert!(it.days.iter().all(|d| d.places.len() <= MAX_PLACES_PER_DAY));
    }

    #[tokio::test]
    async fn test_overflow_is_unscheduled() {
        let ids: Vec<DestinationId> = (1..=6).collect();
        let cat = catalog(ids.iter().map(|&id| place(id, id as f64)).collect());
        let it = optimize_itinerary(&unrelated_graph(), &cat, &ids, &ItineraryOptions { max_days: 1 })
            .await
            .unwrap();
        assert_eq!(it.place_count(), 4);
        assert_eq!(it.unscheduled, vec![5, 6]);
    }

    #[tokio::test]
    async fn test_input_is_deduplicated_and_unresolved_dropped() {
        let cat = catalog(vec![place(X, 0.0), place(Y, 1.0), Destination::new(P, "p", "P")]);
        let it = optimize_itinerary(
            &unrelated_graph(),
            &cat,
            &[X, Y, X, P, 999],
            &ItineraryOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(day_ids(&it), vec![vec![X, Y]]);
        assert!(it.unscheduled.is_empty());
    }

    #[tokio::test]
    async fn test_single_place_is_one_day() {
        let cat = catalog(vec![place(X, 0.0)]);
        let it = optimize_itinerary(&unrelated_graph(), &cat, &[X], &ItineraryOptions::default())
            .await
            .unwrap();
        assert_eq!(day_ids(&it), vec![vec![X]]);
        assert_eq!(it.total_distance_km, 0.0);
    }

    #[tokio::test]
    async fn test_empty_inputs() {
        let cat = catalog(vec![place(X, 0.0), place(Y, 1.0)]);
        let empty_graph = CoVisitationGraph::empty();
        let it = optimize_itinerary(&empty_graph, &cat, &[X, Y], &ItineraryOptions::default())
            .await
            .unwrap();
        assert!(it.days.is_empty());
        assert_eq!(it.total_distance_km, 0.0);

        let it = optimize_itinerary(&unrelated_graph(), &cat, &[], &ItineraryOptions::default())
            .await
            .unwrap();
        assert!(it.days.is_empty());
    }

    #[tokio::test]
    async fn test_catalog_failure_surfaces() {
        let result =
            optimize_itinerary(&unrelated_graph(), &FailingCatalog, &[X], &ItineraryOptions::default())
                .await;
        assert!(result.is_err());
    }
}
