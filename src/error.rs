//! Error types for the intake gateway.
//!
//! Taxonomy:
//! - `ConfigError` — a collaborator is unconfigured; the step is skipped.
//! - `DispatchError` — a downstream call failed (non-2xx, network,
//!   timeout). Logged, never surfaced to the HTTP caller.
//! - `LlmError` — analyzer call failed; the pipeline continues with a
//!   null analysis.
//! - `ApiError` — the only errors that reach the HTTP caller: validation
//!   (400), file limits (413), and uncaught orchestration bugs (500).

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Configuration-related errors. Missing keys are not errors (they
/// disable the collaborator); only malformed values fail startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Downstream collaborator errors. Every fan-out step maps these into a
/// logged outcome; none can fail the HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("{service} request failed: {reason}")]
    Request { service: &'static str, reason: String },

    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} response was malformed: {reason}")]
    InvalidResponse { service: &'static str, reason: String },
}

impl DispatchError {
    /// Wrap a reqwest transport error (connect failure, timeout, TLS).
    pub fn request(service: &'static str, err: reqwest::Error) -> Self {
        Self::Request {
            service,
            reason: err.to_string(),
        }
    }
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors returned to the HTTP caller.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Unexpected field: {0}")]
    UnexpectedField(String),

    #[error("{0}")]
    FileLimit(String),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::UnexpectedField(field) => (
                StatusCode::BAD_REQUEST,
                format!("Unexpected field: {field}"),
            ),
            Self::FileLimit(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg.clone()),
            Self::Internal(err) => {
                tracing::error!(error = %err, "Unhandled error in request handler");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "ok": false, "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_400() {
        let resp = ApiError::Validation("email is required".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn file_limit_maps_to_413() {
        let resp = ApiError::FileLimit("too many files".into()).into_response();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn internal_maps_to_500() {
        let resp = ApiError::Internal(anyhow::anyhow!("boom")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn dispatch_error_display_includes_service() {
        let err = DispatchError::Status {
            service: "mailchimp",
            status: 401,
            body: "bad key".into(),
        };
        assert!(err.to_string().contains("mailchimp"));
        assert!(err.to_string().contains("401"));
    }
}
