//! Statistics snapshot endpoint.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::stats::{count_created_on, StatsSnapshot};

#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    pub user_count: usize,
    pub registered_today: usize,
}

/// POST /api/v1/stats/snapshot
///
/// Counts users, counts users registered on the current UTC day, and
/// appends one snapshot record to the statistics collection.
pub async fn snapshot(State(state): State<AppState>) -> Result<Json<SnapshotResponse>, ApiError> {
    let now = Utc::now();
    let users = state.store.fetch_all(&state.config.store.users()).await?;

    let user_count = users.len();
    let registered_today = count_created_on(&users, now.date_naive());

    let snapshot = StatsSnapshot::at(user_count, now);
    let payload = serde_json::to_value(&snapshot)
        .ok()
        .and_then(|value| value.as_object().cloned())
        .ok_or_else(|| ApiError::Internal("Snapshot did not serialize to an object".to_string()))?;
    state
        .store
        .create(&state.config.store.statistics(), &payload)
        .await?;

    info!(user_count, registered_today, "Statistics snapshot appended");
    Ok(Json(SnapshotResponse {
        user_count,
        registered_today,
    }))
}
