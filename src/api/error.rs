use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use thiserror::Error;

use crate::routing::providers::ProviderError;

/// Caller-facing error. Every failure path resolves to one of these and is
/// emitted with a stable status code and a uniform `{error, details?}` body;
/// nothing propagates unhandled and nothing is retried.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed body or schema/validation failure, resolved before any
    /// upstream call.
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Provider(err) => match err {
                ProviderError::InvalidParams { .. } => StatusCode::BAD_REQUEST,
                ProviderError::NotFound { .. } => StatusCode::NOT_FOUND,
                ProviderError::RateLimited | ProviderError::QuotaExceeded => {
                    StatusCode::TOO_MANY_REQUESTS
                }
                ProviderError::Credentials => StatusCode::INTERNAL_SERVER_ERROR,
                ProviderError::Upstream { .. }
                | ProviderError::Malformed(_)
                | ProviderError::Transport(_)
                | ProviderError::Parse(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            Self::Provider(ProviderError::Upstream { status, body }) => {
                Some(json!({ "status": status, "body": body }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "request failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "request rejected");
        }

        let mut body = json!({ "error": self.to_string() });
        if let Some(details) = self.details() {
            body["details"] = details;
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_bad_requests() {
        let err = ApiError::BadRequest("coords must contain 2 to 50 entries".to_string());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn provider_classes_map_to_stable_status_codes() {
        let cases: Vec<(ProviderError, StatusCode)> = vec![
            (
                ProviderError::InvalidParams {
                    message: String::new(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                ProviderError::NotFound {
                    message: String::new(),
                },
                StatusCode::NOT_FOUND,
            ),
            (ProviderError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
            (ProviderError::QuotaExceeded, StatusCode::TOO_MANY_REQUESTS),
            (ProviderError::Credentials, StatusCode::INTERNAL_SERVER_ERROR),
            (
                ProviderError::Upstream {
                    status: 503,
                    body: String::new(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (ProviderError::Malformed("routes"), StatusCode::BAD_GATEWAY),
        ];

        for (provider_err, expected) in cases {
            assert_eq!(ApiError::from(provider_err).status(), expected);
        }
    }

    #[test]
    fn upstream_failures_carry_diagnostic_details() {
        let err = ApiError::from(ProviderError::Upstream {
            status: 503,
            body: "service unavailable".to_string(),
        });
        let details = err.details().expect("upstream errors carry details");
        assert_eq!(details["status"], 503);
        assert_eq!(details["body"], "service unavailable");

        let plain = ApiError::BadRequest("nope".to_string());
        assert!(plain.details().is_none());
    }
}
