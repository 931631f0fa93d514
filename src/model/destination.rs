use serde::{Deserialize, Serialize};

use crate::geo::Coordinates;

/// Catalog identifier of a destination (place).
pub type DestinationId = i64;

// ---------------------------------------------------------------------------
// Destination: a catalog entry as returned by the destination catalog
// ---------------------------------------------------------------------------

/// A destination record resolved through the catalog collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub id: DestinationId,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Destination {
    pub fn new(id: DestinationId, slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            slug: slug.into(),
            name: name.into(),
            category: None,
            city: None,
            latitude: None,
            longitude: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn with_location(mut self, lat: f64, lng: f64) -> Self {
        self.latitude = Some(lat);
        self.longitude = Some(lng);
        self
    }

    /// Coordinates, if the catalog knows both latitude and longitude.
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        }
    }

    /// Case-insensitive substring match of the category against an allow-list.
    pub fn matches_any_category(&self, categories: &[String]) -> bool {
        let category = self.category.as_deref().unwrap_or_default().to_lowercase();
        categories
            .iter()
            .any(|wanted| category.contains(&wanted.to_lowercase()))
    }

    pub fn summary(&self) -> DestinationSummary {
        DestinationSummary {
            destination_id: self.id,
            name: self.name.clone(),
            slug: self.slug.clone(),
            category: self.category.clone(),
            city: self.city.clone(),
        }
    }
}

/// The client-facing view of a destination in a day plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationSummary {
    pub destination_id: DestinationId,
    pub name: String,
    pub slug: String,
    pub category: Option<String>,
    pub city: Option<String>,
}
