use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::poi::overpass::{DEFAULT_RADIUS_M, MAX_RADIUS_M, MIN_RADIUS_M, OverpassClient};
use crate::poi::{MAX_POIS, Poi};
use crate::routing::providers::{GeoProvider, GoogleProvider, OrsProvider};
use crate::routing::{
    Coordinate, MATRIX_MAX_COORDS, MATRIX_MIN_COORDS, Metric, ROUTE_MAX_COORDS, ROUTE_MIN_COORDS,
    RouteOptions, RouteResult, TravelProfile, validate_coordinates,
};

pub mod error;

use error::ApiError;

pub struct AppState {
    pub ors: OrsProvider,
    pub google: GoogleProvider,
    pub overpass: OverpassClient,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/route", post(compute_route))
        .route("/matrix", post(compute_matrix))
        .route("/poi", get(search_poi))
        .route("/pois-overpass", get(pois_overpass))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    coords: Vec<Coordinate>,
    profile: Option<String>,
    #[serde(default)]
    options: RouteOptions,
    provider: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MatrixRequest {
    coords: Vec<Coordinate>,
    profile: Option<String>,
    metrics: Option<Vec<Metric>>,
    provider: Option<String>,
}

#[derive(Serialize)]
struct MatrixResponse {
    provider: &'static str,
    durations: Option<Vec<Vec<Option<f64>>>>,
    distances: Option<Vec<Vec<Option<f64>>>>,
    metadata: MatrixMetadata,
}

#[derive(Serialize)]
struct MatrixMetadata {
    profile: &'static str,
    locations: usize,
    metrics: Vec<Metric>,
}

#[derive(Debug, Deserialize)]
pub struct PoiQuery {
    city: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(rename = "type")]
    poi_type: Option<String>,
    limit: Option<usize>,
    radius: Option<f64>,
}

#[derive(Serialize)]
struct PoiResponse {
    pois: Vec<Poi>,
}

#[derive(Debug, Deserialize)]
pub struct OverpassQuery {
    lat: Option<f64>,
    lon: Option<f64>,
    radius: Option<f64>,
}

#[derive(Serialize)]
struct OverpassPoiResponse {
    pois: Vec<Poi>,
    metadata: OverpassMetadata,
}

#[derive(Serialize)]
struct OverpassMetadata {
    count: usize,
    radius_m: f64,
    source: &'static str,
}

async fn compute_route(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RouteRequest>, JsonRejection>,
) -> Result<Json<RouteResult>, ApiError> {
    let Json(req) = payload.map_err(bad_body)?;
    validate_route_coords(&req.coords)?;

    let profile = parse_profile(req.profile.as_deref());
    let provider = select_provider(&state, req.provider.as_deref())?;

    tracing::info!(
        coords = req.coords.len(),
        profile = profile.as_str(),
        provider = provider.tag(),
        "route request"
    );
    let result = provider
        .compute_route(&req.coords, profile, &req.options)
        .await?;
    Ok(Json(result))
}

async fn compute_matrix(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MatrixRequest>, JsonRejection>,
) -> Result<Json<MatrixResponse>, ApiError> {
    let Json(req) = payload.map_err(bad_body)?;
    validate_matrix_coords(&req.coords)?;
    let metrics = validate_metrics(req.metrics)?;

    let profile = parse_profile(req.profile.as_deref());
    let provider = select_provider(&state, req.provider.as_deref())?;

    tracing::info!(
        coords = req.coords.len(),
        profile = profile.as_str(),
        provider = provider.tag(),
        "matrix request"
    );
    let result = provider
        .compute_matrix(&req.coords, profile, &metrics)
        .await?;

    Ok(Json(MatrixResponse {
        provider: provider.tag(),
        durations: result.durations,
        distances: result.distances,
        metadata: MatrixMetadata {
            profile: profile.as_str(),
            locations: req.coords.len(),
            metrics,
        },
    }))
}

async fn search_poi(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PoiQuery>, QueryRejection>,
) -> Result<Json<PoiResponse>, ApiError> {
    let Query(req) = query.map_err(bad_query)?;
    let radius = req.radius.unwrap_or(DEFAULT_RADIUS_M);
    validate_radius(radius)?;
    let limit = req.limit.unwrap_or(20).min(MAX_POIS);

    let center = match (&req.city, req.lat, req.lon) {
        (Some(city), _, _) => state.ors.geocode(city).await?,
        (None, Some(lat), Some(lon)) => {
            let coord = [lon, lat];
            if !validate_coordinates(&[coord]) {
                return Err(ApiError::BadRequest(
                    "lat/lon out of range (lon in [-180, 180], lat in [-90, 90])".to_string(),
                ));
            }
            coord
        }
        _ => {
            return Err(ApiError::BadRequest(
                "provide either city or both lat and lon".to_string(),
            ));
        }
    };

    tracing::info!(?center, radius, limit, "poi search request");
    let pois = state
        .google
        .search_poi(center, radius, req.poi_type.as_deref(), limit)
        .await?;
    Ok(Json(PoiResponse { pois }))
}

async fn pois_overpass(
    State(state): State<Arc<AppState>>,
    query: Result<Query<OverpassQuery>, QueryRejection>,
) -> Result<Json<OverpassPoiResponse>, ApiError> {
    let Query(req) = query.map_err(bad_query)?;
    let (Some(lat), Some(lon)) = (req.lat, req.lon) else {
        return Err(ApiError::BadRequest(
            "lat and lon query parameters are required".to_string(),
        ));
    };
    if !validate_coordinates(&[[lon, lat]]) {
        return Err(ApiError::BadRequest(
            "lat/lon out of range (lon in [-180, 180], lat in [-90, 90])".to_string(),
        ));
    }
    let radius = req.radius.unwrap_or(DEFAULT_RADIUS_M);
    validate_radius(radius)?;

    tracing::info!(lat, lon, radius, "overpass poi request");
    let pois = state.overpass.search(lat, lon, radius).await?;
    let metadata = OverpassMetadata {
        count: pois.len(),
        radius_m: radius,
        source: "overpass",
    };
    Ok(Json(OverpassPoiResponse { pois, metadata }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn bad_body(rejection: JsonRejection) -> ApiError {
    ApiError::BadRequest(format!("invalid request body: {rejection}"))
}

fn bad_query(rejection: QueryRejection) -> ApiError {
    ApiError::BadRequest(format!("invalid query parameters: {rejection}"))
}

fn parse_profile(profile: Option<&str>) -> TravelProfile {
    profile.map(TravelProfile::parse).unwrap_or_default()
}

fn select_provider<'a>(state: &'a AppState, tag: Option<&str>) -> Result<GeoProvider<'a>, ApiError> {
    match tag {
        None | Some("openrouteservice") | Some("ors") => {
            Ok(GeoProvider::OpenRouteService(&state.ors))
        }
        Some("google") => Ok(GeoProvider::Google(&state.google)),
        Some(other) => Err(ApiError::BadRequest(format!(
            "unknown provider: {other} (expected openrouteservice or google)"
        ))),
    }
}

fn validate_route_coords(coords: &[Coordinate]) -> Result<(), ApiError> {
    if coords.len() < ROUTE_MIN_COORDS || coords.len() > ROUTE_MAX_COORDS {
        return Err(ApiError::BadRequest(format!(
            "coords must contain {ROUTE_MIN_COORDS} to {ROUTE_MAX_COORDS} entries, got {}",
            coords.len()
        )));
    }
    ensure_coordinate_ranges(coords)
}

fn validate_matrix_coords(coords: &[Coordinate]) -> Result<(), ApiError> {
    if coords.len() < MATRIX_MIN_COORDS || coords.len() > MATRIX_MAX_COORDS {
        return Err(ApiError::BadRequest(format!(
            "coords must contain {MATRIX_MIN_COORDS} to {MATRIX_MAX_COORDS} entries, got {}",
            coords.len()
        )));
    }
    ensure_coordinate_ranges(coords)
}

fn ensure_coordinate_ranges(coords: &[Coordinate]) -> Result<(), ApiError> {
    if !validate_coordinates(coords) {
        return Err(ApiError::BadRequest(
            "coordinates must be finite [lon, lat] pairs with lon in [-180, 180] and lat in [-90, 90]"
                .to_string(),
        ));
    }
    Ok(())
}

/// Requested metrics default to both; an explicit empty list is rejected.
fn validate_metrics(metrics: Option<Vec<Metric>>) -> Result<Vec<Metric>, ApiError> {
    match metrics {
        None => Ok(vec![Metric::Duration, Metric::Distance]),
        Some(metrics) if metrics.is_empty() => Err(ApiError::BadRequest(
            "metrics must contain at least one of duration, distance".to_string(),
        )),
        Some(metrics) => Ok(metrics),
    }
}

fn validate_radius(radius: f64) -> Result<(), ApiError> {
    if !radius.is_finite() || !(MIN_RADIUS_M..=MAX_RADIUS_M).contains(&radius) {
        return Err(ApiError::BadRequest(format!(
            "radius must be between {MIN_RADIUS_M} and {MAX_RADIUS_M} meters"
        )));
    }
    Ok(())
}
