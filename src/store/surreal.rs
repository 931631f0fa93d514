use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use surrealdb::engine::any::{connect, Any};
use surrealdb::Surreal;
use tracing::debug;

use crate::error::{CovisitError, CovisitResult};
use crate::model::destination::DestinationId;
use crate::model::edge::GraphEdge;
use crate::store::graph::{sort_by_weight_desc, GraphStore, StoredEdge};

const EDGE_TABLE: &str = "co_visitation_edge";
const NAMESPACE: &str = "covisit";
const DATABASE: &str = "covisit";

fn store_err(context: &str) -> impl Fn(surrealdb::Error) -> CovisitError + '_ {
    move |e| CovisitError::Store(format!("{}: {}", context, e))
}

/// Row written by `save`; `id` becomes the record key.
#[derive(Debug, Serialize)]
struct EdgeRow {
    id: String,
    source_id: DestinationId,
    dest_id: DestinationId,
    weight: u32,
    frequency: u32,
    updated_at: DateTime<Utc>,
}

impl EdgeRow {
    fn new(edge: &GraphEdge, updated_at: DateTime<Utc>) -> Self {
        Self {
            id: SurrealGraphStore::record_key(edge),
            source_id: edge.source_id,
            dest_id: edge.dest_id,
            weight: edge.weight,
            frequency: edge.frequency,
            updated_at,
        }
    }
}

/// SurrealDB-backed graph store. Each edge is one record keyed by
/// `source_dest` so that writes upsert.
#[derive(Clone)]
pub struct SurrealGraphStore {
    db: Arc<Surreal<Any>>,
}

impl SurrealGraphStore {
    /// Connect to an endpoint such as `memory` and prepare the schema.
    pub async fn connect(endpoint: &str) -> CovisitResult<Self> {
        let db = connect(endpoint)
            .await
            .map_err(store_err("Failed to connect to SurrealDB"))?;
        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(store_err("Failed to select namespace"))?;

        Self::init_schema(&db).await?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Create a new in-memory database instance.
    pub async fn new_memory() -> CovisitResult<Self> {
        Self::connect("memory").await
    }

    async fn init_schema(db: &Surreal<Any>) -> CovisitResult<()> {
        db.query(format!("DEFINE TABLE IF NOT EXISTS {EDGE_TABLE} SCHEMALESS"))
            .query(format!(
                "DEFINE INDEX IF NOT EXISTS {EDGE_TABLE}_weight ON {EDGE_TABLE} FIELDS weight"
            ))
            .query(format!(
                "DEFINE INDEX IF NOT EXISTS {EDGE_TABLE}_source ON {EDGE_TABLE} FIELDS source_id"
            ))
            .await
            .map_err(store_err("Failed to define schema"))?
            .check()
            .map_err(store_err("Failed to define schema"))?;
        Ok(())
    }

    fn record_key(edge: &GraphEdge) -> String {
        format!("{}_{}", edge.source_id, edge.dest_id)
    }

    /// Check if the database is reachable.
    pub async fn health(&self) -> CovisitResult<bool> {
        self.db
            .version()
            .await
            .map_err(store_err("Health check failed"))?;
        Ok(true)
    }
}

#[async_trait]
impl GraphStore for SurrealGraphStore {
    async fn save(&self, edges: &[GraphEdge]) -> CovisitResult<usize> {
        let now = Utc::now();

        // Last write wins for repeated (source, dest) pairs.
        let rows: Vec<EdgeRow> = edges
            .iter()
            .map(|edge| (edge.key(), EdgeRow::new(edge, now)))
            .collect::<BTreeMap<_, _>>()
            .into_values()
            .collect();
        let written = rows.len();

        // Clear and refill in one transaction so readers never see a
        // partial edge set.
        let statements = if rows.is_empty() {
            format!("BEGIN TRANSACTION; DELETE {EDGE_TABLE}; COMMIT TRANSACTION;")
        } else {
            format!(
                "BEGIN TRANSACTION; DELETE {EDGE_TABLE}; \
                 INSERT INTO {EDGE_TABLE} $rows; COMMIT TRANSACTION;"
            )
        };
        self.db
            .query(statements)
            .bind(("rows", rows))
            .await
            .map_err(store_err("Failed to replace edges"))?
            .check()
            .map_err(store_err("Failed to replace edges"))?;

        debug!(written, "Saved edges to SurrealDB");
        Ok(written)
    }

    async fn load(&self) -> CovisitResult<Vec<StoredEdge>> {
        let mut response = self
            .db
            .query(format!(
                "SELECT source_id, dest_id, weight, frequency, updated_at \
                 FROM {EDGE_TABLE} ORDER BY weight DESC"
            ))
            .await
            .map_err(store_err("Failed to load edges"))?;

        let mut edges: Vec<StoredEdge> = response
            .take(0)
            .map_err(store_err("Failed to parse edge rows"))?;
        sort_by_weight_desc(&mut edges);
        Ok(edges)
    }

    async fn edge_count(&self) -> CovisitResult<usize> {
        let mut response = self
            .db
            .query(format!("SELECT count() FROM {EDGE_TABLE} GROUP ALL"))
            .await
            .map_err(store_err("Failed to count edges"))?;
        let count: Option<usize> = response
            .take((0, "count"))
            .map_err(store_err("Failed to parse edge count"))?;
        Ok(count.unwrap_or(0))
    }
}
