//! The sequencing engine: owns the served graph snapshot and the external
//! collaborators, and ties training, persistence and queries together.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::{AppConfig, GraphConfig};
use crate::error::{CovisitError, CovisitResult};
use crate::graph::{build_co_visitation_graph, CoVisitationGraph, GraphHandle, GraphSnapshot, GraphStats};
use crate::model::destination::{DestinationId, DestinationSummary};
use crate::model::suggestion::{OptimizedItinerary, Suggestion};
use crate::query::{self, DayOptions, ItineraryOptions, SuggestOptions};
use crate::source::{DestinationCatalog, InMemoryCatalog, InMemoryVisitSource, VisitSource};
use crate::store::{open_graph_store, GraphStore, StoredEdge};

// ---------------------------------------------------------------------------
// Training and status reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainOutcome {
    /// A non-empty graph was built and published.
    Trained,
    /// Fewer visit records than `graph.min_visit_records`; nothing was built.
    InsufficientData,
    /// The build produced no edges; the served graph was left untouched.
    EmptyGraph,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainReport {
    pub outcome: TrainOutcome,
    pub visits: usize,
    pub min_weight: u32,
    pub lookback_days: u32,
    pub stats: Option<GraphStats>,
    /// Generation of the published snapshot, when one was published.
    pub generation: Option<u64>,
    /// Whether the new edge set reached the graph store.
    pub persisted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphState {
    NotTrained,
    Ready,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphStatus {
    pub status: GraphState,
    pub nodes: usize,
    pub edges: usize,
    pub trained_at: Option<DateTime<Utc>>,
    pub generation: Option<u64>,
    pub stats: Option<GraphStats>,
}

// ---------------------------------------------------------------------------
// SequencingEngine
// ---------------------------------------------------------------------------

pub struct SequencingEngine {
    graph: GraphHandle,
    catalog: Arc<dyn DestinationCatalog>,
    visits: Arc<dyn VisitSource>,
    store: Arc<dyn GraphStore>,
    config: GraphConfig,
    training: Mutex<()>,
}

impl SequencingEngine {
    pub fn new(
        catalog: Arc<dyn DestinationCatalog>,
        visits: Arc<dyn VisitSource>,
        store: Arc<dyn GraphStore>,
        config: GraphConfig,
    ) -> Self {
        Self {
            graph: GraphHandle::new(),
            catalog,
            visits,
            store,
            config,
            training: Mutex::new(()),
        }
    }

    /// Wire up collaborators from configuration: JSON-file catalog and visit
    /// history (empty when no path is configured) and the configured store.
    pub async fn from_config(config: &AppConfig) -> CovisitResult<Self> {
        let catalog = match &config.data.catalog_path {
            Some(path) => InMemoryCatalog::from_json_file(path)?,
            None => {
                warn!("No data.catalog_path configured; destination catalog is empty");
                InMemoryCatalog::new()
            }
        };
        let visits = match &config.data.visits_path {
            Some(path) => InMemoryVisitSource::from_json_file(path)?,
            None => {
                warn!("No data.visits_path configured; visit history is empty");
                InMemoryVisitSource::default()
            }
        };
        let store = open_graph_store(&config.storage).await?;

        info!(
            destinations = catalog.len(),
            visits = visits.len(),
            backend = ?config.storage.backend,
            "Sequencing engine configured"
        );

        Ok(Self::new(
            Arc::new(catalog),
            Arc::new(visits),
            store,
            config.graph.clone(),
        ))
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn catalog(&self) -> &dyn DestinationCatalog {
        self.catalog.as_ref()
    }

    pub fn is_training(&self) -> bool {
        self.training.try_lock().is_err()
    }

    /// Rebuild the graph from visit history.
    ///
    /// Parameters default to the configured ones. Only one training runs at
    /// a time; a concurrent call fails with `TrainingInProgress`. An empty
    /// build never replaces the graph being served.
    pub async fn train(
        &self,
        min_weight: Option<u32>,
        lookback_days: Option<u32>,
    ) -> CovisitResult<TrainReport> {
        let _guard = self
            .training
            .try_lock()
            .map_err(|_| CovisitError::TrainingInProgress)?;

        let min_weight = min_weight.unwrap_or(self.config.min_weight).max(1);
        let lookback_days = lookback_days.unwrap_or(self.config.lookback_days);
        let since = Utc::now() - Duration::days(i64::from(lookback_days));

        info!(min_weight, lookback_days, "Training co-visitation graph");

        let visits = self.visits.fetch_visits(since).await?;
        let visit_count = visits.len();
        let mut report = TrainReport {
            outcome: TrainOutcome::InsufficientData,
            visits: visit_count,
            min_weight,
            lookback_days,
            stats: None,
            generation: None,
            persisted: false,
        };

        if visit_count < self.config.min_visit_records {
            warn!(
                visits = visit_count,
                required = self.config.min_visit_records,
                "Insufficient visit data; graph not rebuilt"
            );
            return Ok(report);
        }

        let graph = tokio::task::spawn_blocking(move || {
            build_co_visitation_graph(&visits, min_weight)
        })
        .await
        .map_err(|e| CovisitError::Internal(format!("graph build task failed: {e}")))?;

        report.stats = Some(graph.stats().clone());
        if graph.is_empty() {
            report.outcome = TrainOutcome::EmptyGraph;
            warn!(visits = visit_count, min_weight, "Graph is empty; no sequences survived the threshold");
            return Ok(report);
        }

        let snapshot = self.publish(graph).await;
        report.outcome = TrainOutcome::Trained;
        report.generation = Some(snapshot.generation);
        report.persisted = self.save_graph(&snapshot.graph).await;

        info!(
            nodes = snapshot.graph.node_count(),
            edges = snapshot.graph.edge_count(),
            transitions = snapshot.graph.stats().transitions,
            persisted = report.persisted,
            "Graph training complete"
        );
        Ok(report)
    }

    /// Make `graph` the one served to new queries.
    pub async fn publish(&self, graph: CoVisitationGraph) -> Arc<GraphSnapshot> {
        self.graph.publish(graph).await
    }

    pub async fn snapshot(&self) -> Option<Arc<GraphSnapshot>> {
        self.graph.snapshot().await
    }

    /// The served snapshot, loading it from the graph store on first use.
    pub async fn ensure_graph(&self) -> CovisitResult<Arc<GraphSnapshot>> {
        if let Some(snapshot) = self.graph.snapshot().await {
            return Ok(snapshot);
        }
        if self.load_graph().await {
            if let Some(snapshot) = self.graph.snapshot().await {
                return Ok(snapshot);
            }
        }
        Err(CovisitError::GraphNotReady)
    }

    /// Persist every edge of `graph`, replacing what the store held.
    pub async fn save_graph(&self, graph: &CoVisitationGraph) -> bool {
        let edges: Vec<_> = graph.edges().collect();
        match self.store.save(&edges).await {
            Ok(written) => {
                info!(edges = written, "Saved graph edges");
                true
            }
            Err(e) => {
                error!(error = %e, edges = edges.len(), "Failed to save graph edges");
                false
            }
        }
    }

    /// Reload the graph from the store and publish it.
    ///
    /// Returns false, leaving the served graph alone, when the store is
    /// empty or unreadable. A graph published while the store was being
    /// read (by a training run) wins over the reloaded edges.
    pub async fn load_graph(&self) -> bool {
        let stored = match self.store.load().await {
            Ok(stored) => stored,
            Err(e) => {
                error!(error = %e, "Failed to load graph edges");
                return false;
            }
        };
        if stored.is_empty() {
            info!("Graph store holds no edges");
            return false;
        }

        let written = stored.iter().map(|e| e.updated_at).max();
        let mut graph = CoVisitationGraph::from_edges(stored.iter().map(StoredEdge::edge));
        if let Some(written) = written {
            graph = graph.with_trained_at(written);
        }
        let (edges, nodes) = (graph.edge_count(), graph.node_count());
        match self.graph.publish_if_empty(graph).await {
            Some(_) => info!(edges, nodes, "Loaded graph from store"),
            None => debug!(edges, "Graph published during reload; stored edges discarded"),
        }
        true
    }

    pub async fn status(&self) -> GraphStatus {
        match self.ensure_graph().await {
            Ok(snapshot) => {
                let stats = snapshot.graph.stats();
                GraphStatus {
                    status: GraphState::Ready,
                    nodes: stats.nodes,
                    edges: stats.edges,
                    trained_at: stats.trained_at,
                    generation: Some(snapshot.generation),
                    stats: Some(stats.clone()),
                }
            }
            Err(_) => GraphStatus {
                status: GraphState::NotTrained,
                nodes: 0,
                edges: 0,
                trained_at: None,
                generation: None,
                stats: None,
            },
        }
    }

    pub async fn suggest_next_places(
        &self,
        current: DestinationId,
        options: &SuggestOptions,
    ) -> CovisitResult<Vec<Suggestion>> {
        let snapshot = self.ensure_graph().await?;
        Ok(query::suggest_next_places(&snapshot.graph, self.catalog(), current, options).await)
    }

    pub async fn suggest_complete_day(
        &self,
        start: DestinationId,
        options: &DayOptions,
    ) -> CovisitResult<Vec<DestinationSummary>> {
        let snapshot = self.ensure_graph().await?;
        query::suggest_complete_day(&snapshot.graph, self.catalog(), start, options).await
    }

    pub async fn optimize_itinerary(
        &self,
        destination_ids: &[DestinationId],
        options: &ItineraryOptions,
    ) -> CovisitResult<OptimizedItinerary> {
        let snapshot = self.ensure_graph().await?;
        query::optimize_itinerary(&snapshot.graph, self.catalog(), destination_ids, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::destination::Destination;
    use crate::model::edge::GraphEdge;
    use crate::model::visit::VisitEvent;
    use crate::store::InMemoryGraphStore;
    use async_trait::async_trait;
    use uuid::Uuid;

    const A: DestinationId = 1;
    const B: DestinationId = 2;
    const C: DestinationId = 3;
    const D: DestinationId = 4;

    /// Users walking A -> B -> C (twice) and A -> B -> D, visited an hour apart.
    fn scenario_visits() -> Vec<VisitEvent> {
        let base = Utc::now() - Duration::days(2);
        let paths = [[A, B, C], [A, B, D], [A, B, C], [A, B, C]];
        paths
            .iter()
            .enumerate()
            .flat_map(|(user, path)| {
                let user_id = Uuid::from_u128(user as u128 + 1);
                path.iter().enumerate().map(move |(step, &dest)| {
                    VisitEvent::new(user_id, dest, base + Duration::hours(step as i64))
                })
            })
            .collect()
    }

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::from_destinations([A, B, C, D].map(|id| {
            Destination::new(id, format!("d{id}"), format!("D{id}"))
                .with_location(0.0, 0.01 * id as f64)
        }))
    }

    fn engine_with(visits: Vec<VisitEvent>, store: Arc<dyn GraphStore>) -> SequencingEngine {
        SequencingEngine::new(
            Arc::new(catalog()),
            Arc::new(InMemoryVisitSource::new(visits)),
            store,
            GraphConfig::default(),
        )
    }

    struct BrokenStore;

    #[async_trait]
    impl GraphStore for BrokenStore {
        async fn save(&self, _edges: &[GraphEdge]) -> CovisitResult<usize> {
            Err(CovisitError::Store("disk full".into()))
        }

        async fn load(&self) -> CovisitResult<Vec<StoredEdge>> {
            Err(CovisitError::Store("connection refused".into()))
        }
    }

    /// Serves a fixed edge set, optionally after a delay. Saves are dropped.
    struct FixedStore {
        edges: Vec<StoredEdge>,
        delay: std::time::Duration,
    }

    #[async_trait]
    impl GraphStore for FixedStore {
        async fn save(&self, edges: &[GraphEdge]) -> CovisitResult<usize> {
            Ok(edges.len())
        }

        async fn load(&self) -> CovisitResult<Vec<StoredEdge>> {
            tokio::time::sleep(self.delay).await;
            Ok(self.edges.clone())
        }
    }

    #[tokio::test]
    async fn test_train_publishes_and_persists() {
        let store = Arc::new(InMemoryGraphStore::new());
        let engine = engine_with(scenario_visits(), store.clone());

        let report = engine.train(None, None).await.unwrap();
        assert_eq!(report.outcome, TrainOutcome::Trained);
        assert_eq!(report.visits, 12);
        assert_eq!(report.generation, Some(1));
        assert!(report.persisted);

        let stats = report.stats.unwrap();
        // A->B: 4, B->C: 3; B->D (1) is dropped.
        assert_eq!(stats.edges, 2);
        assert_eq!(stats.transitions, Some(8));
        assert_eq!(stats.sequences, Some(4));
        assert_eq!(store.edge_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_insufficient_data_publishes_nothing() {
        let visits = scenario_visits().into_iter().take(9).collect();
        let engine = engine_with(visits, Arc::new(InMemoryGraphStore::new()));

        let report = engine.train(None, None).await.unwrap();
        assert_eq!(report.outcome, TrainOutcome::InsufficientData);
        assert!(report.stats.is_none());
        assert!(engine.snapshot().await.is_none());
        assert!(matches!(
            engine.suggest_next_places(A, &SuggestOptions::default()).await,
            Err(CovisitError::GraphNotReady)
        ));
    }

    #[tokio::test]
    async fn test_empty_build_keeps_serving_graph() {
        let engine = engine_with(scenario_visits(), Arc::new(InMemoryGraphStore::new()));
        engine.train(None, None).await.unwrap();

        let report = engine.train(Some(50), None).await.unwrap();
        assert_eq!(report.outcome, TrainOutcome::EmptyGraph);
        let snapshot = engine.snapshot().await.unwrap();
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.graph.edge_count(), 2);
    }

    #[tokio::test]
    async fn test_lazy_load_from_store() {
        let store = Arc::new(InMemoryGraphStore::new());
        store
            .save(&[GraphEdge::new(A, B, 3), GraphEdge::new(B, C, 2)])
            .await
            .unwrap();
        let engine = engine_with(Vec::new(), store);
        assert!(engine.snapshot().await.is_none());

        let out = engine
            .suggest_next_places(A, &SuggestOptions::default())
            .await
            .unwrap();
        assert_eq!(out[0].destination_id, B);
        assert_eq!(out[0].weight, 3);

        let status = engine.status().await;
        assert_eq!(status.status, GraphState::Ready);
        assert_eq!(status.edges, 2);
        assert!(status.trained_at.is_some());
        assert_eq!(status.stats.unwrap().transitions, None);
    }

    #[tokio::test]
    async fn test_reload_reports_store_write_time() {
        let written = Utc::now() - Duration::days(4);
        let store = Arc::new(FixedStore {
            edges: vec![StoredEdge::from_edge(&GraphEdge::new(A, B, 3), written)],
            delay: std::time::Duration::ZERO,
        });
        let engine = engine_with(Vec::new(), store);
        assert!(engine.load_graph().await);

        let status = engine.status().await;
        assert_eq!(status.trained_at, Some(written));
    }

    #[tokio::test]
    async fn test_slow_reload_does_not_replace_trained_graph() {
        let store = Arc::new(FixedStore {
            edges: vec![StoredEdge::from_edge(&GraphEdge::new(7, 8, 9), Utc::now())],
            delay: std::time::Duration::from_millis(200),
        });
        let base = Utc::now() - Duration::days(1);
        let visits: Vec<_> = (0..5u128)
            .flat_map(|user| {
                let user_id = Uuid::from_u128(user + 1);
                [1, 2, 3].into_iter().enumerate().map(move |(step, dest)| {
                    VisitEvent::new(user_id, dest, base + Duration::hours(step as i64))
                })
            })
            .collect();
        let engine = Arc::new(engine_with(visits, store));

        let reader = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.ensure_graph().await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let report = engine.train(None, None).await.unwrap();
        assert_eq!(report.outcome, TrainOutcome::Trained);

        let served = reader.await.unwrap().unwrap();
        assert!(served.graph.edge(1, 2).is_some());

        let snapshot = engine.snapshot().await.unwrap();
        assert_eq!(snapshot.generation, 1);
        assert!(snapshot.graph.edge(1, 2).is_some());
        assert!(snapshot.graph.edge(7, 8).is_none());
    }

    #[tokio::test]
    async fn test_status_not_trained() {
        let engine = engine_with(Vec::new(), Arc::new(InMemoryGraphStore::new()));
        let status = engine.status().await;
        assert_eq!(status.status, GraphState::NotTrained);
        assert_eq!(status.nodes, 0);
        assert!(status.trained_at.is_none());
    }

    #[tokio::test]
    async fn test_store_failures_are_contained() {
        let engine = engine_with(scenario_visits(), Arc::new(BrokenStore));
        assert!(!engine.load_graph().await);

        let report = engine.train(None, None).await.unwrap();
        assert_eq!(report.outcome, TrainOutcome::Trained);
        assert!(!report.persisted);
        // The trained graph is still served.
        let day = engine
            .suggest_complete_day(A, &DayOptions::default())
            .await
            .unwrap();
        let ids: Vec<_> = day.iter().map(|d| d.destination_id).collect();
        assert_eq!(ids, vec![A, B, C]);
    }

    #[tokio::test]
    async fn test_concurrent_training_is_rejected() {
        let engine = engine_with(scenario_visits(), Arc::new(InMemoryGraphStore::new()));
        let _held = engine.training.lock().await;
        assert!(matches!(
            engine.train(None, None).await,
            Err(CovisitError::TrainingInProgress)
        ));
    }

    #[tokio::test]
    async fn test_itinerary_through_engine() {
        let engine = engine_with(scenario_visits(), Arc::new(InMemoryGraphStore::new()));
        engine.train(None, None).await.unwrap();
        let it = engine
            .optimize_itinerary(&[A, B, C], &ItineraryOptions::default())
            .await
            .unwrap();
        assert_eq!(it.days.len(), 1);
        assert_eq!(it.place_count(), 3);
    }
}
