use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{CovisitError, CovisitResult};
use crate::geo::Coordinates;
use crate::model::destination::{Destination, DestinationId};

// ---------------------------------------------------------------------------
// DestinationCatalog trait: id -> destination details lookup
// ---------------------------------------------------------------------------

/// Lookup of destination details by id.
///
/// `Ok(None)` is the not-found signal; `Err` is reserved for lookup failures.
#[async_trait]
pub trait DestinationCatalog: Send + Sync {
    async fn get_destination(&self, id: DestinationId) -> CovisitResult<Option<Destination>>;

    /// Coordinates of a destination, `None` if unknown or not located.
    async fn get_location(&self, id: DestinationId) -> CovisitResult<Option<Coordinates>> {
        Ok(self
            .get_destination(id)
            .await?
            .and_then(|d| d.coordinates()))
    }
}

// ---------------------------------------------------------------------------
// InMemoryCatalog: for tests, demos and JSON-file backed deployments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    destinations: HashMap<DestinationId, Destination>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_destinations(destinations: impl IntoIterator<Item = Destination>) -> Self {
        Self {
            destinations: destinations.into_iter().map(|d| (d.id, d)).collect(),
        }
    }

    /// Load a JSON array of destinations.
    pub fn from_json_file(path: impl AsRef<Path>) -> CovisitResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CovisitError::Catalog(format!("cannot read {}: {e}", path.display())))?;
        let destinations: Vec<Destination> = serde_json::from_str(&raw).map_err(|e| {
            CovisitError::Catalog(format!("invalid destinations in {}: {e}", path.display()))
        })?;
        Ok(Self::from_destinations(destinations))
    }

    pub fn insert(&mut self, destination: Destination) {
        self.destinations.insert(destination.id, destination);
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }
}

#[async_trait]
impl DestinationCatalog for InMemoryCatalog {
    async fn get_destination(&self, id: DestinationId) -> CovisitResult<Option<Destination>> {
        Ok(self.destinations.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_lookup_and_location() {
        let catalog = InMemoryCatalog::from_destinations(vec![
            Destination::new(1, "a", "A").with_location(10.0, 20.0),
            Destination::new(2, "b", "B"),
        ]);
        assert_eq!(catalog.get_destination(1).await.unwrap().unwrap().name, "A");
        assert!(catalog.get_destination(3).await.unwrap().is_none());
        assert_eq!(
            catalog.get_location(1).await.unwrap(),
            Some(Coordinates::new(10.0, 20.0))
        );
        assert!(catalog.get_location(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": 7, "slug": "tate", "name": "Tate Modern", "category": "museum",
                 "city": "London", "latitude": 51.5076, "longitude": -0.0994}}]"#
        )
        .unwrap();

        let catalog = InMemoryCatalog::from_json_file(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        let tate = catalog.get_destination(7).await.unwrap().unwrap();
        assert_eq!(tate.city.as_deref(), Some("London"));
        assert!(tate.coordinates().is_some());
    }

    #[test]
    fn test_from_json_file_rejects_malformed_catalog() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"id": 7}}"#).unwrap();
        assert!(matches!(
            InMemoryCatalog::from_json_file(file.path()),
            Err(CovisitError::Catalog(_))
        ));
    }
}
