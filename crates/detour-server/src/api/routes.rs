//! REST API routes.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info_span, warn, Instrument};

use detour_core::{BoundingBox, IngestSummary, PathResult};

use crate::api::request_id::RequestId;
use crate::ingest::IngestError;
use crate::pathfinder::PathfinderError;
use crate::persistence::{graph, GraphCounts};
use crate::state::AppState;

type ApiError = (StatusCode, Json<Value>);

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/route", post(find_route))
        .route("/v1/network/ingest", post(ingest_area))
        .route("/v1/network/stats", get(network_stats))
}

// === Request types ===

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    pub start: Option<PointInput>,
    pub end: Option<PointInput>,
}

#[derive(Debug, Deserialize)]
pub struct PointInput {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

// === Handlers ===

async fn find_route(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<RouteRequest>, JsonRejection>,
) -> Result<Json<PathResult>, ApiError> {
    let Json(request) = payload.map_err(|rejection| bad_request(rejection.body_text()))?;
    let (start_lat, start_lng) = point(request.start.as_ref(), "start")?;
    let (end_lat, end_lng) = point(request.end.as_ref(), "end")?;

    let span = info_span!(
        "route",
        request_id = %request_id,
        from = %format!("{start_lat:.5},{start_lng:.5}"),
        to = %format!("{end_lat:.5},{end_lng:.5}")
    );
    let result = state
        .pathfinder
        .find_path(start_lat, start_lng, end_lat, end_lng)
        .instrument(span)
        .await
        .map_err(pathfinder_error)?;

    result.map(Json).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "No route found" })),
        )
    })
}

async fn ingest_area(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<BoundingBox>, JsonRejection>,
) -> Result<Json<IngestSummary>, ApiError> {
    let Json(bbox) = payload.map_err(|rejection| bad_request(rejection.body_text()))?;
    bbox.validate().map_err(|err| bad_request(err.to_string()))?;

    let span = info_span!("ingest", request_id = %request_id, area = %bbox.cache_key());
    let summary = state
        .pathfinder
        .ingest(&bbox)
        .instrument(span)
        .await
        .map_err(ingest_error)?;
    Ok(Json(summary))
}

async fn network_stats(State(state): State<Arc<AppState>>) -> Result<Json<GraphCounts>, ApiError> {
    graph::graph_counts(state.database().pool())
        .await
        .map(Json)
        .map_err(|err| internal_error(err.to_string()))
}

// === Error mapping ===

fn point(input: Option<&PointInput>, name: &str) -> Result<(f64, f64), ApiError> {
    match input {
        Some(PointInput {
            lat: Some(lat),
            lng: Some(lng),
        }) => Ok((*lat, *lng)),
        _ => Err(bad_request(format!("{name} must include lat and lng"))),
    }
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "Invalid request", "message": message.into() })),
    )
}

fn internal_error(message: String) -> ApiError {
    error!(%message, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal error", "message": message })),
    )
}

fn pathfinder_error(err: PathfinderError) -> ApiError {
    match err {
        PathfinderError::InvalidInput(err) => bad_request(err.to_string()),
        PathfinderError::Ingestion(err) => ingest_error(err),
        other => internal_error(other.to_string()),
    }
}

fn ingest_error(err: IngestError) -> ApiError {
    match err {
        IngestError::Store(err) => internal_error(err.to_string()),
        other => {
            warn!(error = %other, "map data ingestion failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "Map data ingestion failed", "message": other.to_string() })),
            )
        }
    }
}
