use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Failed to fetch konsultasi summary")]
    DataSource(#[source] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::DataSource(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self {
            ApiError::Unauthorized => json!({ "error": self.to_string() }),
            ApiError::DataSource(cause) => {
                error!(error = %format!("{cause:#}"), "summary request failed");
                json!({ "error": self.to_string(), "details": format!("{cause:#}") })
            }
        };
        (self.status(), Json(body)).into_response()
    }
}
