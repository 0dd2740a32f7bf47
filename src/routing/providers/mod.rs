use thiserror::Error;

use crate::routing::{Coordinate, MatrixResult, Metric, RouteOptions, RouteResult, TravelProfile};

pub mod google;
pub mod ors;

pub use google::GoogleProvider;
pub use ors::OrsProvider;

/// Maximum bytes of an upstream error body kept in diagnostics.
const MAX_DIAGNOSTIC_BYTES: usize = 300;

/// Upstream failure, classified by what the caller can do about it.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("missing or invalid upstream API credential")]
    Credentials,

    #[error("upstream rejected request parameters: {message}")]
    InvalidParams { message: String },

    #[error("upstream could not resolve the request: {message}")]
    NotFound { message: String },

    #[error("upstream rate limit exceeded")]
    RateLimited,

    #[error("upstream quota exhausted or access forbidden")]
    QuotaExceeded,

    #[error("upstream request failed with status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("upstream response missing expected field: {0}")]
    Malformed(&'static str),

    #[error("failed to reach upstream: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to parse upstream response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Classifies a non-success upstream status into an error class, carrying a
/// truncated diagnostic payload.
pub(crate) fn classify_status(status: reqwest::StatusCode, body: &str) -> ProviderError {
    let message = truncate_diagnostic(body);
    match status.as_u16() {
        401 => ProviderError::Credentials,
        403 => ProviderError::QuotaExceeded,
        404 => ProviderError::NotFound { message },
        400 | 406 | 422 => ProviderError::InvalidParams { message },
        429 => ProviderError::RateLimited,
        _ => ProviderError::Upstream {
            status: status.as_u16(),
            body: message,
        },
    }
}

pub(crate) fn truncate_diagnostic(body: &str) -> String {
    if body.len() <= MAX_DIAGNOSTIC_BYTES {
        return body.to_string();
    }
    let mut end = MAX_DIAGNOSTIC_BYTES;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}

/// One logical routing interface over the two upstream providers.
///
/// Selection is runtime dispatch on the request's `provider` tag; both
/// variants normalize to the same result types (meters, seconds, decoded
/// geometry).
pub enum GeoProvider<'a> {
    OpenRouteService(&'a OrsProvider),
    Google(&'a GoogleProvider),
}

impl GeoProvider<'_> {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::OpenRouteService(_) => "openrouteservice",
            Self::Google(_) => "google",
        }
    }

    pub async fn compute_route(
        &self,
        coords: &[Coordinate],
        profile: TravelProfile,
        options: &RouteOptions,
    ) -> Result<RouteResult, ProviderError> {
        match self {
            Self::OpenRouteService(ors) => ors.compute_route(coords, profile, options).await,
            Self::Google(google) => google.compute_route(coords, profile, options).await,
        }
    }

    pub async fn compute_matrix(
        &self,
        coords: &[Coordinate],
        profile: TravelProfile,
        metrics: &[Metric],
    ) -> Result<MatrixResult, ProviderError> {
        match self {
            Self::OpenRouteService(ors) => ors.compute_matrix(coords, profile, metrics).await,
            Self::Google(google) => google.compute_matrix(coords, profile, metrics).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn status_classification() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, ""),
            ProviderError::Credentials
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, ""),
            ProviderError::QuotaExceeded
        ));
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, "no route"),
            ProviderError::NotFound { .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, "bad coords"),
            ProviderError::InvalidParams { .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ProviderError::RateLimited
        ));
        match classify_status(StatusCode::BAD_GATEWAY, "oops") {
            ProviderError::Upstream { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "oops");
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[test]
    fn diagnostic_payload_is_truncated() {
        let long = "x".repeat(1000);
        let truncated = truncate_diagnostic(&long);
        assert!(truncated.len() < long.len());
        assert!(truncated.ends_with('…'));

        let short = "short body";
        assert_eq!(truncate_diagnostic(short), short);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // Multi-byte characters straddling the cut must not split.
        let body = "é".repeat(400);
        let truncated = truncate_diagnostic(&body);
        assert!(truncated.chars().count() > 0);
    }
}
