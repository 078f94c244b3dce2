//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use autopilot_domain::error::AutopilotError;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`AutopilotError`] to an HTTP response with appropriate status code.
#[derive(Debug)]
pub struct ApiError(AutopilotError);

impl From<AutopilotError> for ApiError {
    fn from(err: AutopilotError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AutopilotError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            AutopilotError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            AutopilotError::Storage(_) | AutopilotError::Probe(_) | AutopilotError::Action(_) => {
                tracing::error!(error = ?self.0, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
