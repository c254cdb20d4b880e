use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::AccessScope;
use crate::source::ConsultationSource;
use crate::summary::{self, Envelope, SummaryOptions};

/// Header carrying the caller id, set by the authenticating proxy in front
/// of this service.
pub const USER_ID_HEADER: &str = "x-user-id";

pub struct AppState {
    pub source: Arc<dyn ConsultationSource>,
    pub options: SummaryOptions,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/v1/konsultasi/summary", get(konsultasi_summary))
        .with_state(state)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

fn caller_id(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or(ApiError::Unauthorized)
}

async fn konsultasi_summary(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = caller_id(&headers)?;

    let unit_ids = state
        .source
        .unit_ids_for_user(user_id)
        .await
        .map_err(ApiError::DataSource)?;
    let scope = AccessScope::from_unit_ids(unit_ids);

    let dataset = state
        .source
        .load_dataset()
        .await
        .map_err(ApiError::DataSource)?;

    let result = summary::summarize(&dataset, &scope, Utc::now(), state.options);
    info!(
        %user_id,
        access_level = scope.label(),
        total = result.overview.total,
        "served konsultasi summary"
    );
    Ok(Json(Envelope::ok(result)))
}
