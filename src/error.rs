use thiserror::Error;

/// Central error type for co-visitation engine operations.
#[derive(Error, Debug)]
pub enum CovisitError {
    #[error("Graph not built yet; train the graph first")]
    GraphNotReady,

    #[error("A graph training run is already in progress")]
    TrainingInProgress,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Visit source error: {0}")]
    VisitSource(String),

    #[error("Graph store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for engine results.
pub type CovisitResult<T> = Result<T, CovisitError>;
