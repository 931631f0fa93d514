use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;

use crate::error::{CovisitError, CovisitResult};
use crate::ingest::within_window;
use crate::model::visit::VisitEvent;

/// Supplier of deduplicated visit records for training.
#[async_trait]
pub trait VisitSource: Send + Sync {
    /// All visits at or after `since`.
    async fn fetch_visits(&self, since: DateTime<Utc>) -> CovisitResult<Vec<VisitEvent>>;
}

/// Visit source over a fixed list of records.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVisitSource {
    visits: Vec<VisitEvent>,
}

impl InMemoryVisitSource {
    pub fn new(visits: Vec<VisitEvent>) -> Self {
        Self { visits }
    }

    /// Load a JSON array of `{user_id, destination_id, visited_at}` records.
    pub fn from_json_file(path: impl AsRef<Path>) -> CovisitResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CovisitError::VisitSource(format!("cannot read {}: {e}", path.display()))
        })?;
        let visits = serde_json::from_str(&raw).map_err(|e| {
            CovisitError::VisitSource(format!("invalid visit records in {}: {e}", path.display()))
        })?;
        Ok(Self::new(visits))
    }

    pub fn len(&self) -> usize {
        self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }
}

#[async_trait]
impl VisitSource for InMemoryVisitSource {
    async fn fetch_visits(&self, since: DateTime<Utc>) -> CovisitResult<Vec<VisitEvent>> {
        Ok(within_window(self.visits.clone(), since))
    }
}
