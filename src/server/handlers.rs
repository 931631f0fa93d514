use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::engine::GraphStatus;
use crate::error::{CovisitError, CovisitResult};
use crate::model::destination::{DestinationId, DestinationSummary};
use crate::model::suggestion::{OptimizedItinerary, Suggestion};
use crate::query::{DayOptions, ItineraryOptions, SuggestOptions};
use crate::server::AppState;

// ---------------------------------------------------------------------------
// Request and response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SuggestNextRequest {
    pub destination_id: DestinationId,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub exclude_ids: Option<Vec<DestinationId>>,
    /// Zero disables distance filtering.
    #[serde(default = "default_max_distance_km")]
    pub max_distance_km: f64,
}

#[derive(Debug, Serialize)]
pub struct SuggestNextResponse {
    pub destination_id: DestinationId,
    pub suggestions: Vec<Suggestion>,
    pub total: usize,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteDayRequest {
    pub starting_place_id: DestinationId,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default = "default_max_places")]
    pub max_places: usize,
}

#[derive(Debug, Serialize)]
pub struct CompleteDayResponse {
    pub starting_place_id: DestinationId,
    pub sequence: Vec<DestinationSummary>,
    pub total_places: usize,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct OptimizeItineraryRequest {
    pub destination_ids: Vec<DestinationId>,
    #[serde(default = "default_max_days")]
    pub max_days: usize,
}

#[derive(Debug, Serialize)]
pub struct OptimizeItineraryResponse {
    #[serde(flatten)]
    pub itinerary: OptimizedItinerary,
    pub generated_at: DateTime<Utc>,
}

/// Omitted fields fall back to the engine's configured training parameters.
#[derive(Debug, Default, Deserialize)]
pub struct TrainGraphRequest {
    pub min_weight: Option<u32>,
    pub historical_days: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct TrainGraphResponse {
    pub status: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub status: GraphStatus,
    pub generated_at: DateTime<Utc>,
}

fn default_limit() -> usize {
    5
}

fn default_max_distance_km() -> f64 {
    10.0
}

fn default_max_places() -> usize {
    5
}

fn default_max_days() -> usize {
    3
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn check_range<T: PartialOrd + std::fmt::Display>(
    field: &str,
    value: T,
    min: T,
    max: T,
) -> CovisitResult<()> {
    if value < min || value > max {
        return Err(CovisitError::InvalidRequest(format!(
            "{field} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(())
}

impl SuggestNextRequest {
    fn validate(&self) -> CovisitResult<()> {
        check_range("limit", self.limit, 1, 20)?;
        if self.max_distance_km.is_nan() || self.max_distance_km < 0.0 {
            return Err(CovisitError::InvalidRequest(
                "max_distance_km must be a non-negative number".into(),
            ));
        }
        Ok(())
    }

    fn options(&self) -> SuggestOptions {
        SuggestOptions {
            limit: self.limit,
            exclude: self.exclude_ids.iter().flatten().copied().collect(),
            consider_distance: self.max_distance_km > 0.0,
            max_distance_km: self.max_distance_km,
        }
    }
}

impl CompleteDayRequest {
    fn validate(&self) -> CovisitResult<()> {
        check_range("max_places", self.max_places, 2, 10)
    }
}

impl OptimizeItineraryRequest {
    fn validate(&self) -> CovisitResult<()> {
        check_range("max_days", self.max_days, 1, 7)
    }
}

impl TrainGraphRequest {
    fn validate(&self) -> CovisitResult<()> {
        if self.min_weight == Some(0) {
            return Err(CovisitError::InvalidRequest(
                "min_weight must be at least 1".into(),
            ));
        }
        if let Some(days) = self.historical_days {
            check_range("historical_days", days, 30, 365)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<CovisitError> for ApiError {
    fn from(err: CovisitError) -> Self {
        let status = match &err {
            CovisitError::GraphNotReady => StatusCode::SERVICE_UNAVAILABLE,
            CovisitError::TrainingInProgress => StatusCode::CONFLICT,
            CovisitError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => {
                error!(error = %err, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn graph_status(State(engine): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: engine.status().await,
        generated_at: Utc::now(),
    })
}

pub async fn train_graph(
    State(engine): State<AppState>,
    Json(request): Json<TrainGraphRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate()?;
    if engine.is_training() {
        return Err(CovisitError::TrainingInProgress.into());
    }

    let days = request
        .historical_days
        .unwrap_or(engine.config().lookback_days);
    info!(min_weight = ?request.min_weight, historical_days = days, "Graph training requested");

    let worker = engine.clone();
    tokio::spawn(async move {
        match worker.train(request.min_weight, Some(days)).await {
            Ok(report) => info!(outcome = ?report.outcome, persisted = report.persisted, "Background training finished"),
            Err(e) => error!(error = %e, "Background training failed"),
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(TrainGraphResponse {
            status: "started",
            message: format!("Graph training started. Building graph from last {days} days."),
        }),
    ))
}

pub async fn suggest_next(
    State(engine): State<AppState>,
    Json(request): Json<SuggestNextRequest>,
) -> Result<Json<SuggestNextResponse>, ApiError> {
    request.validate()?;
    let suggestions = engine
        .suggest_next_places(request.destination_id, &request.options())
        .await?;

    Ok(Json(SuggestNextResponse {
        destination_id: request.destination_id,
        total: suggestions.len(),
        suggestions,
        generated_at: Utc::now(),
    }))
}

pub async fn complete_day(
    State(engine): State<AppState>,
    Json(request): Json<CompleteDayRequest>,
) -> Result<Json<CompleteDayResponse>, ApiError> {
    request.validate()?;
    let options = DayOptions {
        categories: request.categories,
        max_places: request.max_places,
    };
    let sequence = engine
        .suggest_complete_day(request.starting_place_id, &options)
        .await?;

    Ok(Json(CompleteDayResponse {
        starting_place_id: request.starting_place_id,
        total_places: sequence.len(),
        sequence,
        generated_at: Utc::now(),
    }))
}

pub async fn optimize_itinerary(
    State(engine): State<AppState>,
    Json(request): Json<OptimizeItineraryRequest>,
) -> Result<Json<OptimizeItineraryResponse>, ApiError> {
    request.validate()?;
    let options = ItineraryOptions {
        max_days: request.max_days,
    };
    let itinerary = engine
        .optimize_itinerary(&request.destination_ids, &options)
        .await?;

    Ok(Json(OptimizeItineraryResponse {
        itinerary,
        generated_at: Utc::now(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggest_validation() {
        let mut req = SuggestNextRequest {
            destination_id: 1,
            limit: 5,
            exclude_ids: None,
            max_distance_km: 10.0,
        };
        assert!(req.validate().is_ok());

        req.limit = 21;
        assert!(req.validate().is_err());
        req.limit = 0;
        assert!(req.validate().is_err());

        req.limit = 5;
        req.max_distance_km = -1.0;
        assert!(req.validate().is_err());
        req.max_distance_km = f64::NAN;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_zero_distance_disables_filter() {
        let req = SuggestNextRequest {
            destination_id: 1,
            limit: 3,
            exclude_ids: Some(vec![4, 5]),
            max_distance_km: 0.0,
        };
        let opts = req.options();
        assert!(!opts.consider_distance);
        assert_eq!(opts.exclude.len(), 2);
    }

    #[test]
    fn test_request_defaults() {
        let req: SuggestNextRequest = serde_json::from_str(r#"{"destination_id": 9}"#).unwrap();
        assert_eq!(req.limit, 5);
        assert_eq!(req.max_distance_km, 10.0);

        let day: CompleteDayRequest =
            serde_json::from_str(r#"{"starting_place_id": 9}"#).unwrap();
        assert_eq!(day.max_places, 5);
        assert!(day.validate().is_ok());

        let it: OptimizeItineraryRequest =
            serde_json::from_str(r#"{"destination_ids": [1, 2], "max_days": 8}"#).unwrap();
        assert!(it.validate().is_err());
    }

    #[test]
    fn test_train_validation() {
        let ok = TrainGraphRequest {
            min_weight: Some(3),
            historical_days: Some(90),
        };
        assert!(ok.validate().is_ok());
        assert!(TrainGraphRequest::default().validate().is_ok());

        let zero = TrainGraphRequest {
            min_weight: Some(0),
            historical_days: None,
        };
        assert!(zero.validate().is_err());

        let short = TrainGraphRequest {
            min_weight: None,
            historical_days: Some(7),
        };
        let err = short.validate().unwrap_err();
        assert!(matches!(&err, CovisitError::InvalidRequest(msg) if msg.contains("historical_days")));
        assert_eq!(ApiError::from(err).status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            ApiError::from(CovisitError::GraphNotReady).status,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(CovisitError::TrainingInProgress).status,
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(CovisitError::InvalidRequest("limit".into())).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(CovisitError::Store("down".into())).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
