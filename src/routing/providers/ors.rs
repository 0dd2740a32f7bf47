//! OpenRouteService client.
//!
//! Speaks the ORS v2 REST API: directions, matrix, and geocode search. ORS
//! has no single waypoint-optimizing directions call, so multi-stop routes
//! are composed from the matrix endpoint plus the nearest-neighbor
//! sequencer, with the final coordinate pinned as the destination.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::routing::providers::{ProviderError, classify_status};
use crate::routing::sequencer::nearest_neighbor_order;
use crate::routing::{
    Coordinate, Instruction, MatrixResult, Metric, RouteOptions, RouteResult, TravelProfile,
    line_string_from_latlng, polyline,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openrouteservice.org";

pub struct OrsProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

// Structured error payload ORS returns on non-success responses.
#[derive(Deserialize)]
struct OrsErrorPayload {
    error: OrsErrorDetail,
}

#[derive(Deserialize)]
struct OrsErrorDetail {
    #[allow(unused)]
    #[serde(default)]
    code: u32,
    message: String,
}

#[derive(Deserialize)]
struct DirectionsResponse {
    routes: Vec<OrsRoute>,
}

#[derive(Deserialize)]
struct OrsRoute {
    summary: OrsSummary,
    geometry: String,
    #[serde(default)]
    segments: Vec<OrsSegment>,
}

#[derive(Deserialize, Clone, Copy)]
struct OrsSummary {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

#[derive(Deserialize)]
struct OrsSegment {
    #[serde(default)]
    steps: Vec<OrsStep>,
}

#[derive(Deserialize)]
struct OrsStep {
    instruction: String,
    distance: f64,
    duration: f64,
}

#[derive(Deserialize)]
struct MatrixResponse {
    durations: Option<Vec<Vec<Option<f64>>>>,
    distances: Option<Vec<Vec<Option<f64>>>>,
}

#[derive(Deserialize)]
struct GeocodeResponse {
    features: Vec<GeocodeFeature>,
}

#[derive(Deserialize)]
struct GeocodeFeature {
    geometry: GeocodeGeometry,
}

#[derive(Deserialize)]
struct GeocodeGeometry {
    coordinates: [f64; 2],
}

impl OrsProvider {
    pub fn new(client: Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    fn key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ProviderError::Credentials)
    }

    pub async fn compute_route(
        &self,
        coords: &[Coordinate],
        profile: TravelProfile,
        options: &RouteOptions,
    ) -> Result<RouteResult, ProviderError> {
        if coords.len() == 2 {
            return self.directions(coords, profile, options, None).await;
        }

        // Multi-stop: fetch a duration matrix, order origin + intermediates
        // greedily, keep the last coordinate as the fixed destination.
        let matrix = self
            .compute_matrix(coords, profile, &[Metric::Duration])
            .await?;
        let durations = matrix
            .durations
            .ok_or(ProviderError::Malformed("durations"))?;
        let grid: Vec<Vec<f64>> = durations
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| cell.unwrap_or(f64::INFINITY))
                    .collect()
            })
            .collect();

        let order = plan_visit_order(&grid);
        let reordered: Vec<Coordinate> = order.iter().map(|&i| coords[i]).collect();

        tracing::debug!(?order, "reordered intermediate stops via nearest-neighbor");
        self.directions(&reordered, profile, options, Some(order))
            .await
    }

    async fn directions(
        &self,
        coords: &[Coordinate],
        profile: TravelProfile,
        options: &RouteOptions,
        waypoint_order: Option<Vec<usize>>,
    ) -> Result<RouteResult, ProviderError> {
        let key = self.key()?;
        let url = format!("{}/v2/directions/{}", self.base_url, profile.as_str());

        let mut body = json!({
            "coordinates": coords,
            "instructions": options.instructions,
        });
        if let Some(language) = &options.language {
            body["language"] = json!(language);
        }

        tracing::debug!(coords = coords.len(), profile = profile.as_str(), "calling ORS directions");
        let response = self
            .client
            .post(&url)
            .header("Authorization", key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(classify_ors_failure(status, &text));
        }

        let parsed: DirectionsResponse = serde_json::from_str(&text)?;
        let route = parsed
            .routes
            .into_iter()
            .next()
            .ok_or(ProviderError::Malformed("routes"))?;

        let geometry = line_string_from_latlng(&polyline::decode(&route.geometry));
        let instructions = route
            .segments
            .iter()
            .flat_map(|segment| &segment.steps)
            .map(|step| Instruction {
                instruction: step.instruction.clone(),
                distance: step.distance,
                duration: step.duration,
            })
            .collect();

        Ok(RouteResult {
            provider: "openrouteservice",
            geometry,
            distance: route.summary.distance,
            duration: route.summary.duration,
            summary: route_summary(route.summary.distance, route.summary.duration),
            instructions,
            waypoint_order,
        })
    }

    pub async fn compute_matrix(
        &self,
        coords: &[Coordinate],
        profile: TravelProfile,
        metrics: &[Metric],
    ) -> Result<MatrixResult, ProviderError> {
        let key = self.key()?;
        let url = format!("{}/v2/matrix/{}", self.base_url, profile.as_str());

        let metric_names: Vec<&str> = metrics
            .iter()
            .map(|m| match m {
                Metric::Duration => "duration",
                Metric::Distance => "distance",
            })
            .collect();
        let body = json!({
            "locations": coords,
            "metrics": metric_names,
        });

        tracing::debug!(coords = coords.len(), profile = profile.as_str(), "calling ORS matrix");
        let response = self
            .client
            .post(&url)
            .header("Authorization", key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(classify_ors_failure(status, &text));
        }

        let parsed: MatrixResponse = serde_json::from_str(&text)?;
        normalize_matrix(parsed, metrics, coords.len())
    }

    /// Resolves a city name to a coordinate via the ORS geocode search.
    pub async fn geocode(&self, city: &str) -> Result<Coordinate, ProviderError> {
        let key = self.key()?;
        let url = format!("{}/geocode/search", self.base_url);

        tracing::debug!(city, "calling ORS geocode");
        let response = self
            .client
            .get(&url)
            .query(&[("api_key", key), ("text", city), ("size", "1")])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(classify_ors_failure(status, &text));
        }

        let parsed: GeocodeResponse = serde_json::from_str(&text)?;
        parsed
            .features
            .first()
            .map(|f| f.geometry.coordinates)
            .ok_or_else(|| ProviderError::NotFound {
                message: format!("no geocode results for city: {city}"),
            })
    }
}

/// Prefers the structured ORS error message when the body parses, falling
/// back to the raw (truncated) body.
fn classify_ors_failure(status: reqwest::StatusCode, body: &str) -> ProviderError {
    match serde_json::from_str::<OrsErrorPayload>(body) {
        Ok(payload) => classify_status(status, &payload.error.message),
        Err(_) => classify_status(status, body),
    }
}

/// Visiting order for a multi-stop route: greedy over origin plus
/// intermediates, destination pinned last.
fn plan_visit_order(grid: &[Vec<f64>]) -> Vec<usize> {
    let n = grid.len();
    let head: Vec<Vec<f64>> = grid[..n - 1]
        .iter()
        .map(|row| row[..n - 1].to_vec())
        .collect();

    let mut order = nearest_neighbor_order(&head, 0);
    order.push(n - 1);
    order
}

/// Filters the upstream grids down to the requested metrics and checks each
/// grid is square with the request's dimensions. Unrequested metrics become
/// `None`.
fn normalize_matrix(
    response: MatrixResponse,
    metrics: &[Metric],
    expected: usize,
) -> Result<MatrixResult, ProviderError> {
    let durations = if metrics.contains(&Metric::Duration) {
        Some(checked_grid(response.durations, expected, "durations")?)
    } else {
        None
    };

    let distances = if metrics.contains(&Metric::Distance) {
        Some(checked_grid(response.distances, expected, "distances")?)
    } else {
        None
    };

    Ok(MatrixResult {
        durations,
        distances,
    })
}

/// Rejects a missing or jagged grid; every row must have `expected` columns
/// so downstream indexing is safe.
fn checked_grid(
    grid: Option<Vec<Vec<Option<f64>>>>,
    expected: usize,
    field: &'static str,
) -> Result<Vec<Vec<Option<f64>>>, ProviderError> {
    let grid = grid.ok_or(ProviderError::Malformed(field))?;
    if grid.len() != expected || grid.iter().any(|row| row.len() != expected) {
        return Err(ProviderError::Malformed(field));
    }
    Ok(grid)
}

fn route_summary(distance: f64, duration: f64) -> String {
    format!("{:.1} km, {:.0} min", distance / 1000.0, duration / 60.0)
}
