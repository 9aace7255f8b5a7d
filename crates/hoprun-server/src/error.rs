//! HTTP rendering of service errors

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hoprun_services::ServiceError;
use serde_json::json;

/// A [`ServiceError`] on its way to the client.
///
/// Only the error code and the public message are rendered. The detail
/// carried by the error stays in the logs.
#[derive(Debug)]
pub struct AppError(pub ServiceError);

pub type AppResult<T> = Result<T, AppError>;

impl From<ServiceError> for AppError {
    fn from(error: ServiceError) -> Self {
        Self(error)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::warn!(error = %self.0, status = status.as_u16(), "request failed");
        } else {
            tracing::debug!(error = %self.0, status = status.as_u16(), "request rejected");
        }

        let body = json!({
            "error": self.0.code(),
            "message": self.0.public_message(),
        });
        (status, Json(body)).into_response()
    }
}
