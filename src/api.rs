//! HTTP surface over [`SafetyService`].

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::coordinate::Coordinate;
use crate::error::Error;
use crate::location::PanicAlert;
use crate::provider::DEFAULT_NEARBY_RADIUS_M;
use crate::reports::{ReportKind, ReportStats, SafetyReport, Severity};
use crate::route::{RoutePair, RouteRole};
use crate::safety::{Bounds, DEFAULT_HEATMAP_STEPS, HeatmapPoint};
use crate::service::{PointSafety, SafetyService};

type AppState = Arc<SafetyService>;

/// All routes, with a permissive CORS layer so a local web UI can call in.
pub fn router(service: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/route", post(compose_route).get(current_route).delete(clear_route))
        .route("/route/search", get(search_route))
        .route("/route/select", post(select_route))
        .route("/geocode", get(geocode))
        .route("/nearby", get(nearby))
        .route("/safety", get(point_safety))
        .route("/heatmap", get(heatmap))
        .route("/reports", get(list_reports).post(add_report))
        .route("/reports/stats", get(report_stats))
        .route("/reports/submit", post(submit_report))
        .route("/location", post(update_location))
        .route("/location/tracking", post(set_tracking))
        .route("/panic", post(trigger_panic))
        .layer(cors)
        .with_state(service)
}

// --- Errors ---

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (status, Json(ErrorResponse { error: error.to_string() })).into_response()
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidCoordinate(_) | Self::InvalidHeatmap(_) => StatusCode::BAD_REQUEST,
            Self::LocationUnavailable(_) => StatusCode::CONFLICT,
            Self::ProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_) | Self::Seed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_response(status, self)
    }
}

// --- DTOs ---

#[derive(Debug, Deserialize)]
struct RouteRequest {
    start: Coordinate, // [lat, lng]
    end: Coordinate,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    from: String,
    to: String,
}

#[derive(Debug, Deserialize)]
struct SelectRequest {
    role: RouteRole,
}

#[derive(Debug, Deserialize)]
struct GeocodeQuery {
    q: String,
}

#[derive(Debug, Deserialize)]
struct NearbyQuery {
    lat: f64,
    lng: f64,
    category: String,
    radius: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct PointQuery {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct HeatmapQuery {
    south: f64,
    west: f64,
    north: f64,
    east: f64,
    steps: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ReportsQuery {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct NewReport {
    #[serde(rename = "type")]
    kind: ReportKind,
    location: Coordinate,
    description: String,
    severity: Severity,
}

#[derive(Debug, Deserialize)]
struct SubmitReport {
    #[serde(rename = "type")]
    kind: ReportKind,
    description: String,
    severity: Severity,
}

#[derive(Debug, Deserialize)]
struct TrackingRequest {
    enabled: bool,
}

#[derive(Debug, Serialize)]
struct LocationResponse {
    tracking: bool,
    accepted: bool,
    current: Option<Coordinate>,
}

// --- Handlers ---

async fn compose_route(
    State(service): State<AppState>,
    Json(req): Json<RouteRequest>,
) -> Result<Json<RoutePair>, Error> {
    Ok(Json(service.compose_routes(req.start, req.end).await?))
}

async fn current_route(State(service): State<AppState>) -> Response {
    match service.current_routes() {
        Some(pair) => Json(pair).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "no route computed"),
    }
}

async fn clear_route(State(service): State<AppState>) -> StatusCode {
    service.clear_routes();
    StatusCode::NO_CONTENT
}

async fn search_route(State(service): State<AppState>, Query(q): Query<SearchQuery>) -> Result<Response, Error> {
    Ok(match service.search_route(&q.from, &q.to).await? {
        Some(pair) => Json(pair).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "location not found"),
    })
}

async fn select_route(State(service): State<AppState>, Json(req): Json<SelectRequest>) -> Response {
    service.select_route(req.role);
    match service.current_routes() {
        Some(pair) => Json(pair.get(req.role).clone()).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn geocode(State(service): State<AppState>, Query(q): Query<GeocodeQuery>) -> impl IntoResponse {
    Json(service.geocode(&q.q).await)
}

async fn nearby(State(service): State<AppState>, Query(q): Query<NearbyQuery>) -> impl IntoResponse {
    let center = Coordinate::new(q.lat, q.lng);
    let radius = q.radius.unwrap_or(DEFAULT_NEARBY_RADIUS_M);
    Json(service.nearby(center, &q.category, radius).await)
}

async fn point_safety(
    State(service): State<AppState>,
    Query(q): Query<PointQuery>,
) -> Result<Json<PointSafety>, Error> {
    Ok(Json(service.score_point(Coordinate::new(q.lat, q.lng))?))
}

async fn heatmap(
    State(service): State<AppState>,
    Query(q): Query<HeatmapQuery>,
) -> Result<Json<Vec<HeatmapPoint>>, Error> {
    let bounds = Bounds {
        south: q.south,
        west: q.west,
        north: q.north,
        east: q.east,
    };
    Ok(Json(service.heatmap(&bounds, q.steps.unwrap_or(DEFAULT_HEATMAP_STEPS))?))
}

async fn list_reports(State(service): State<AppState>, Query(q): Query<ReportsQuery>) -> Json<Vec<SafetyReport>> {
    Json(match q.limit {
        Some(limit) => service.reports().recent(limit),
        None => service.reports().all(),
    })
}

async fn add_report(
    State(service): State<AppState>,
    Json(req): Json<NewReport>,
) -> Result<(StatusCode, Json<SafetyReport>), Error> {
    let location = req.location.validate()?;
    let report = service.add_report(req.kind, location, req.description, req.severity);
    Ok((StatusCode::CREATED, Json(report)))
}

async fn report_stats(State(service): State<AppState>) -> Json<ReportStats> {
    Json(service.reports().stats())
}

async fn submit_report(
    State(service): State<AppState>,
    Json(req): Json<SubmitReport>,
) -> Result<(StatusCode, Json<SafetyReport>), Error> {
    let report = service.submit_report(req.kind, req.description, req.severity)?;
    Ok((StatusCode::CREATED, Json(report)))
}

async fn update_location(
    State(service): State<AppState>,
    Json(fix): Json<PointQuery>,
) -> Result<Json<LocationResponse>, Error> {
    let tracker = service.location();
    let accepted = tracker.update(Coordinate::new(fix.lat, fix.lng))?;
    Ok(Json(LocationResponse {
        tracking: tracker.is_tracking(),
        accepted,
        current: tracker.current(),
    }))
}

async fn set_tracking(State(service): State<AppState>, Json(req): Json<TrackingRequest>) -> Json<LocationResponse> {
    let tracker = service.location();
    if req.enabled {
        tracker.start_tracking();
    } else {
        tracker.stop_tracking();
    }
    Json(LocationResponse {
        tracking: tracker.is_tracking(),
        accepted: false,
        current: tracker.current(),
    })
}

async fn trigger_panic(State(service): State<AppState>) -> Result<Json<PanicAlert>, Error> {
    Ok(Json(service.trigger_panic()?))
}
