use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    api::error::ApiError,
    manager::{AppState, EvaluationReport},
    stats::PeriodStats,
};

pub async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

/// GET /api/v1/status - latest evaluation cycle.
///
/// Everything the dashboard renders in one payload: fleet totals, the
/// active decision, flow states, autonomy. 503 until the first tick has
/// completed.
pub async fn get_status(
    State(st): State<AppState>,
) -> Result<Json<EvaluationReport>, ApiError> {
    st.manager
        .latest_report()
        .await
        .map(Json)
        .ok_or_else(|| {
            ApiError::ServiceUnavailable("no evaluation cycle has completed yet".to_string())
        })
}

/// GET /api/v1/statistics/recent - reduced statistics over the retained
/// sample window.
pub async fn get_recent_statistics(State(st): State<AppState>) -> Json<PeriodStats> {
    Json(st.manager.recent_stats().await)
}
