use async_trait::async_trait;

use crate::error::{CovisitError, CovisitResult};
use crate::geo::EARTH_RADIUS_KM;
use crate::graph::{CoVisitationGraph, GraphBuilder};
use crate::model::destination::{Destination, DestinationId};
use crate::source::catalog::{DestinationCatalog, InMemoryCatalog};

/// Longitude offset on the equator that lies `km` east of (0, 0).
pub fn east_of_origin(km: f64) -> f64 {
    (km / EARTH_RADIUS_KM).to_degrees()
}

/// A destination on the equator `km` east of (0, 0).
pub fn place(id: DestinationId, km: f64) -> Destination {
    Destination::new(id, format!("place-{id}"), format!("Place {id}"))
        .with_city("Equatoria")
        .with_location(0.0, east_of_origin(km))
}

pub fn graph(min_weight: u32, sequences: &[Vec<DestinationId>]) -> CoVisitationGraph {
    GraphBuilder::new(min_weight).build(sequences)
}

pub fn catalog(places: Vec<Destination>) -> InMemoryCatalog {
    InMemoryCatalog::from_destinations(places)
}

/// Catalog whose every lookup fails.
pub struct FailingCatalog;

#[async_trait]
impl DestinationCatalog for FailingCatalog {
    async fn get_destination(&self, id: DestinationId) -> CovisitResult<Option<Destination>> {
        Err(CovisitError::Catalog(format!("lookup of {id} timed out")))
    }
}
