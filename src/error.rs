use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{debug, error};
use serde::Serialize;
use thiserror::Error;

/// Failures the relay surfaces to its callers. Malformed SSE lines are not
/// represented here: both hops recover from those locally by skipping the line.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A required request field was missing or blank. Maps to HTTP 400.
    #[error("{0}")]
    Validation(String),

    /// Reaching or reading from the upstream chat service failed. Maps to
    /// HTTP 500 when it happens before any bytes were sent; mid-stream it
    /// terminates the outbound body instead.
    #[error("{0}")]
    Upstream(String),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match &self {
            RelayError::Validation(msg) => {
                debug!("Rejected chat request: {}", msg);
                StatusCode::BAD_REQUEST
            }
            RelayError::Upstream(msg) => {
                error!("Upstream chat request failed: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorBody {
            success: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
