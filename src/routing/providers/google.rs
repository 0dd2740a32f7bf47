//! Google Maps client.
//!
//! Covers the three upstream surfaces the service needs: Directions (with
//! native waypoint optimization), Distance Matrix, and Places nearby search.
//! Google signals most failures through a `status` string in a 200 body, so
//! classification happens on both the HTTP status and the payload status.

use reqwest::Client;
use serde::Deserialize;

use crate::poi::{Category, Poi};
use crate::routing::providers::{ProviderError, classify_status, truncate_diagnostic};
use crate::routing::{
    Coordinate, Instruction, MatrixResult, Metric, RouteOptions, RouteResult, TravelProfile,
    line_string_from_latlng, polyline,
};

pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com";

pub struct GoogleProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<GoogleRoute>,
}

#[derive(Deserialize)]
struct GoogleRoute {
    #[serde(default)]
    summary: String,
    overview_polyline: OverviewPolyline,
    #[serde(default)]
    legs: Vec<GoogleLeg>,
    #[serde(default)]
    waypoint_order: Vec<usize>,
}

#[derive(Deserialize)]
struct OverviewPolyline {
    points: String,
}

#[derive(Deserialize)]
struct GoogleLeg {
    distance: ValueField,
    duration: ValueField,
    #[serde(default)]
    steps: Vec<GoogleStep>,
}

#[derive(Deserialize)]
struct GoogleStep {
    #[serde(default)]
    html_instructions: String,
    distance: ValueField,
    duration: ValueField,
}

#[derive(Deserialize, Clone, Copy)]
struct ValueField {
    value: f64,
}

#[derive(Deserialize)]
struct DistanceMatrixResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Deserialize)]
struct MatrixElement {
    status: String,
    duration: Option<ValueField>,
    distance: Option<ValueField>,
}

#[derive(Deserialize)]
struct PlacesResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<PlaceResult>,
}

#[derive(Deserialize)]
struct PlaceResult {
    place_id: String,
    #[serde(default)]
    name: String,
    geometry: PlaceGeometry,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Deserialize)]
struct PlaceGeometry {
    location: PlaceLocation,
}

#[derive(Deserialize)]
struct PlaceLocation {
    lat: f64,
    lng: f64,
}

impl GoogleProvider {
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
        let key = self.key()?;
        let url = format!("{}/maps/api/directions/json", self.base_url);
        let n = coords.len();

        let mut params = vec![
            ("origin".to_string(), latlng_param(coords[0])),
            ("destination".to_string(), latlng_param(coords[n - 1])),
            ("mode".to_string(), profile.mode().google_mode().to_string()),
            ("key".to_string(), key.to_string()),
        ];
        if n > 2 {
            // First coordinate fixed as origin, last as destination,
            // intermediates free for Google to reorder.
            let waypoints: Vec<String> = coords[1..n - 1].iter().map(|&c| latlng_param(c)).collect();
            params.push((
                "waypoints".to_string(),
                format!("optimize:true|{}", waypoints.join("|")),
            ));
        }
        if let Some(language) = &options.language {
            params.push(("language".to_string(), language.clone()));
        }

        tracing::debug!(coords = n, mode = profile.mode().google_mode(), "calling Google directions");
        let response = self.client.get(&url).query(&params).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(classify_status(status, &text));
        }

        let parsed: DirectionsResponse = serde_json::from_str(&text)?;
        if let Some(err) = classify_google_status(&parsed.status, parsed.error_message.as_deref()) {
            return Err(err);
        }

        let route = parsed
            .routes
            .into_iter()
            .next()
            .ok_or(ProviderError::Malformed("routes"))?;

        let geometry = line_string_from_latlng(&polyline::decode(&route.overview_polyline.points));
        let distance: f64 = route.legs.iter().map(|leg| leg.distance.value).sum();
        let duration: f64 = route.legs.iter().map(|leg| leg.duration.value).sum();
        let instructions = if options.instructions {
            route
                .legs
                .iter()
                .flat_map(|leg| &leg.steps)
                .map(|step| Instruction {
                    instruction: strip_tags(&step.html_instructions),
                    distance: step.distance.value,
                    duration: step.duration.value,
                })
                .collect()
        } else {
            Vec::new()
        };
        let waypoint_order = (n > 2)
            .then(|| full_visit_order(&route.waypoint_order, n))
            .transpose()?;

        Ok(RouteResult {
            provider: "google",
            geometry,
            distance,
            duration,
            summary: route.summary,
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
        let url = format!("{}/maps/api/distancematrix/json", self.base_url);

        let locations: Vec<String> = coords.iter().map(|&c| latlng_param(c)).collect();
        let joined = locations.join("|");
        let params = [
            ("origins", joined.as_str()),
            ("destinations", joined.as_str()),
            ("mode", profile.mode().google_mode()),
            ("key", key),
        ];

        tracing::debug!(coords = coords.len(), "calling Google distance matrix");
        let response = self.client.get(&url).query(&params).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(classify_status(status, &text));
        }

        let parsed: DistanceMatrixResponse = serde_json::from_str(&text)?;
        if let Some(err) = classify_google_status(&parsed.status, parsed.error_message.as_deref()) {
            return Err(err);
        }

        normalize_matrix(parsed, metrics, coords.len())
    }

    /// Keyword search for places around a point. Results are normalized to
    /// the shared POI shape and capped at `limit`.
    pub async fn search_poi(
        &self,
        center: Coordinate,
        radius: f64,
        keyword: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Poi>, ProviderError> {
        let key = self.key()?;
        let url = format!("{}/maps/api/place/nearbysearch/json", self.base_url);

        let mut params = vec![
            ("location".to_string(), latlng_param(center)),
            ("radius".to_string(), format!("{radius}")),
            ("key".to_string(), key.to_string()),
        ];
        if let Some(keyword) = keyword {
            params.push(("keyword".to_string(), keyword.to_string()));
        }

        tracing::debug!(?center, radius, "calling Google places nearby search");
        let response = self.client.get(&url).query(&params).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(classify_status(status, &text));
        }

        let parsed: PlacesResponse = serde_json::from_str(&text)?;
        // ZERO_RESULTS is a legitimate empty answer for a places search.
        if parsed.status != "ZERO_RESULTS" {
            if let Some(err) =
                classify_google_status(&parsed.status, parsed.error_message.as_deref())
            {
                return Err(err);
            }
        }

        Ok(normalize_places(parsed.results, limit))
    }
}

fn latlng_param(coord: Coordinate) -> String {
    // Google expects "lat,lng"; our wire order is [lon, lat].
    format!("{},{}", coord[1], coord[0])
}

/// Maps Google's payload-level status string to an error class. `None`
/// means success.
fn classify_google_status(status: &str, error_message: Option<&str>) -> Option<ProviderError> {
    let message = || {
        truncate_diagnostic(error_message.unwrap_or(status))
    };
    match status {
        "OK" => None,
        "NOT_FOUND" | "ZERO_RESULTS" => Some(ProviderError::NotFound { message: message() }),
        "INVALID_REQUEST" | "MAX_WAYPOINTS_EXCEEDED" | "MAX_ELEMENTS_EXCEEDED"
        | "MAX_ROUTE_LENGTH_EXCEEDED" => Some(ProviderError::InvalidParams { message: message() }),
        "OVER_QUERY_LIMIT" => Some(ProviderError::RateLimited),
        "OVER_DAILY_LIMIT" => Some(ProviderError::QuotaExceeded),
        "REQUEST_DENIED" => Some(ProviderError::Credentials),
        _ => Some(ProviderError::Upstream {
            status: 200,
            body: message(),
        }),
    }
}

/// Expands Google's intermediate-only `waypoint_order` into a full visiting
/// order over the request's coordinate indices. The order must cover every
/// intermediate; anything else would not be a permutation.
fn full_visit_order(
    intermediate_order: &[usize],
    n: usize,
) -> Result<Vec<usize>, ProviderError> {
    if intermediate_order.len() != n - 2 {
        return Err(ProviderError::Malformed("waypoint_order"));
    }

    let mut order = Vec::with_capacity(n);
    order.push(0);
    order.extend(intermediate_order.iter().map(|&i| i + 1));
    order.push(n - 1);
    Ok(order)
}

/// Reshapes the rows/elements grid into the normalized metric arrays.
/// Elements with a non-OK status become `null` cells.
fn normalize_matrix(
    response: DistanceMatrixResponse,
    metrics: &[Metric],
    expected: usize,
) -> Result<MatrixResult, ProviderError> {
    if response.rows.len() != expected {
        return Err(ProviderError::Malformed("rows"));
    }

    let want_durations = metrics.contains(&Metric::Duration);
    let want_distances = metrics.contains(&Metric::Distance);

    let mut durations = want_durations.then(|| Vec::with_capacity(expected));
    let mut distances = want_distances.then(|| Vec::with_capacity(expected));

    for row in &response.rows {
        if row.elements.len() != expected {
            return Err(ProviderError::Malformed("elements"));
        }
        if let Some(durations) = durations.as_mut() {
            durations.push(
                row.elements
                    .iter()
                    .map(|e| (e.status == "OK").then(|| e.duration.map(|v| v.value)).flatten())
                    .collect::<Vec<Option<f64>>>(),
            );
        }
        if let Some(distances) = distances.as_mut() {
            distances.push(
                row.elements
                    .iter()
                    .map(|e| (e.status == "OK").then(|| e.distance.map(|v| v.value)).flatten())
                    .collect::<Vec<Option<f64>>>(),
            );
        }
    }

    Ok(MatrixResult {
        durations,
        distances,
    })
}

fn normalize_places(results: Vec<PlaceResult>, limit: usize) -> Vec<Poi> {
    results
        .into_iter()
        .filter(|place| {
            place.geometry.location.lat.is_finite() && place.geometry.location.lng.is_finite()
        })
        .map(|place| {
            let (category, kind) = categorize_place_types(&place.types);
            Poi {
                id: format!("google:{}", place.place_id),
                name: if place.name.is_empty() {
                    "Unnamed POI".to_string()
                } else {
                    place.name
                },
                lat: place.geometry.location.lat,
                lon: place.geometry.location.lng,
                category,
                kind,
            }
        })
        .take(limit)
        .collect()
}

/// Derives a coarse category from Google place types, food first.
fn categorize_place_types(types: &[String]) -> (Category, String) {
    let kind = types
        .first()
        .cloned()
        .unwrap_or_else(|| "unknown".to_string());

    for t in types {
        match t.as_str() {
            "restaurant" | "cafe" | "bakery" | "food" | "meal_takeaway" | "meal_delivery" => {
                return (Category::Food, kind);
            }
            _ => {}
        }
    }
    for t in types {
        match t.as_str() {
            "tourist_attraction" | "museum" | "art_gallery" | "church" | "place_of_worship" => {
                return (Category::Tourism, kind);
            }
            "park" => return (Category::Leisure, kind),
            "store" | "shopping_mall" | "supermarket" => return (Category::Shop, kind),
            _ => {}
        }
    }
    (Category::Other, kind)
}

/// Removes HTML markup from Google's step instructions.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}
