pub mod config;
pub mod engine;
pub mod error;
pub mod geo;
pub mod graph;
pub mod ingest;
pub mod model;
pub mod query;
pub mod server;
pub mod source;
pub mod store;

pub use config::{load_config, AppConfig};
pub use engine::{GraphState, GraphStatus, SequencingEngine, TrainOutcome, TrainReport};
pub use error::{CovisitError, CovisitResult};
pub use graph::{CoVisitationGraph, GraphBuilder, GraphStats};
pub use model::*;
