use geojson::ser::serialize_geometry;
use serde::{Deserialize, Serialize};

pub mod polyline;
pub mod providers;
pub mod sequencer;

/// A `[lon, lat]` pair in degrees, WGS84. This is the wire order used by
/// every request body and upstream API in this service.
pub type Coordinate = [f64; 2];

pub const ROUTE_MIN_COORDS: usize = 2;
pub const ROUTE_MAX_COORDS: usize = 50;
pub const MATRIX_MIN_COORDS: usize = 2;
pub const MATRIX_MAX_COORDS: usize = 25;

/// Returns true when every coordinate is finite and within
/// lon ∈ [-180, 180], lat ∈ [-90, 90].
pub fn validate_coordinates(coords: &[Coordinate]) -> bool {
    coords.iter().all(|&[lon, lat]| {
        lon.is_finite()
            && lat.is_finite()
            && (-180.0..=180.0).contains(&lon)
            && (-90.0..=90.0).contains(&lat)
    })
}

/// Abstract travel profile requested by the caller.
///
/// Profiles follow the OpenRouteService naming; the Google adapter collapses
/// them to its three travel modes via [`TravelProfile::mode`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TravelProfile {
    DrivingCar,
    DrivingHgv,
    CyclingRegular,
    CyclingRoad,
    CyclingMountain,
    CyclingElectric,
    #[default]
    FootWalking,
    FootHiking,
    Wheelchair,
}

impl TravelProfile {
    /// Parses a profile string. Unrecognized values fall back to
    /// `foot-walking` rather than erroring, so the mapping stays total.
    pub fn parse(s: &str) -> Self {
        match s {
            "driving-car" => Self::DrivingCar,
            "driving-hgv" => Self::DrivingHgv,
            "cycling-regular" => Self::CyclingRegular,
            "cycling-road" => Self::CyclingRoad,
            "cycling-mountain" => Self::CyclingMountain,
            "cycling-electric" => Self::CyclingElectric,
            "foot-walking" => Self::FootWalking,
            "foot-hiking" => Self::FootHiking,
            "wheelchair" => Self::Wheelchair,
            _ => Self::FootWalking,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DrivingCar => "driving-car",
            Self::DrivingHgv => "driving-hgv",
            Self::CyclingRegular => "cycling-regular",
            Self::CyclingRoad => "cycling-road",
            Self::CyclingMountain => "cycling-mountain",
            Self::CyclingElectric => "cycling-electric",
            Self::FootWalking => "foot-walking",
            Self::FootHiking => "foot-hiking",
            Self::Wheelchair => "wheelchair",
        }
    }

    /// Collapses the profile to a provider travel mode. Many-to-one by
    /// design; wheelchair routes as walking.
    pub fn mode(&self) -> TravelMode {
        match self {
            Self::DrivingCar | Self::DrivingHgv => TravelMode::Driving,
            Self::CyclingRegular
            | Self::CyclingRoad
            | Self::CyclingMountain
            | Self::CyclingElectric => TravelMode::Cycling,
            Self::FootWalking | Self::FootHiking | Self::Wheelchair => TravelMode::Walking,
        }
    }
}

/// Provider-side travel mode. The Google APIs only distinguish these three.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TravelMode {
    Driving,
    Cycling,
    Walking,
}

impl TravelMode {
    pub fn google_mode(&self) -> &'static str {
        match self {
            Self::Driving => "driving",
            Self::Cycling => "bicycling",
            Self::Walking => "walking",
        }
    }
}

/// A matrix metric the caller may request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Duration,
    Distance,
}

/// Caller-tunable routing options with documented defaults, validated once
/// at the request boundary.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RouteOptions {
    /// Language hint forwarded to the upstream directions call.
    pub language: Option<String>,
    /// Whether to request per-step instructions. Defaults to true.
    pub instructions: bool,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            language: None,
            instructions: true,
        }
    }
}

/// One normalized turn instruction.
#[derive(Clone, Debug, Serialize)]
pub struct Instruction {
    pub instruction: String,
    /// Meters covered by this step.
    pub distance: f64,
    /// Seconds taken by this step.
    pub duration: f64,
}

/// Provider-independent route result. Distances are meters and durations
/// seconds regardless of upstream; geometry is always a decoded coordinate
/// sequence serialized as GeoJSON.
#[derive(Debug, Serialize)]
pub struct RouteResult {
    pub provider: &'static str,
    #[serde(serialize_with = "serialize_geometry")]
    pub geometry: geo_types::LineString<f64>,
    pub distance: f64,
    pub duration: f64,
    pub summary: String,
    pub instructions: Vec<Instruction>,
    /// Full visiting order over the request's coordinate indices, present
    /// when intermediate stops were reordered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waypoint_order: Option<Vec<usize>>,
}

/// Provider-independent matrix result. An unrequested metric is `None` and
/// serializes as JSON `null`; cells are `null` when a pair is unreachable.
#[derive(Debug, Serialize)]
pub struct MatrixResult {
    pub durations: Option<Vec<Vec<Option<f64>>>>,
    pub distances: Option<Vec<Vec<Option<f64>>>>,
}

/// Converts `(lat, lng)` pairs from a decoded polyline into a line string.
pub fn line_string_from_latlng(points: &[(f64, f64)]) -> geo_types::LineString<f64> {
    points.iter().map(|&(lat, lng)| (lng, lat)).collect()
}
