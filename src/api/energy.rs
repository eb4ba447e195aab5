use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    api::error::ApiError,
    manager::{AppState, DecisionRecord, DEFAULT_HISTORY_LIMIT},
    policy::{EnergyManagementConfig, PolicyUpdate},
};

/// GET /api/v1/energy-management - current policy.
pub async fn get_config(State(st): State<AppState>) -> Json<EnergyManagementConfig> {
    Json(st.manager.config().await)
}

/// PUT /api/v1/energy-management - partial policy update.
///
/// Field-level PATCH semantics: absent fields keep their stored value.
/// An invalid merge is rejected in full and the stored policy is
/// unchanged.
pub async fn update_config(
    State(st): State<AppState>,
    Json(update): Json<PolicyUpdate>,
) -> Result<Json<EnergyManagementConfig>, ApiError> {
    let updated = st.manager.update_config(update).await?;
    Ok(Json(updated))
}

/// GET /api/v1/energy-management/decision - latest arbitration outcome.
pub async fn get_decision(
    State(st): State<AppState>,
) -> Result<Json<DecisionRecord>, ApiError> {
    st.manager
        .last_decision()
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no decision recorded yet".to_string()))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// GET /api/v1/energy-management/history?limit=N - recent decisions in
/// chronological order.
pub async fn get_history(
    State(st): State<AppState>,
    Query(q): Query<HistoryQuery>,
) -> Json<Vec<DecisionRecord>> {
    let limit = q.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Json(st.manager.decision_history(limit).await)
}
