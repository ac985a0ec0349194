//! User export, retirement, and deletion-intent sweep endpoints.

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::ServiceKey;
use crate::middleware::{record_export_generated, record_user_retired};
use crate::routes::parse_window;
use crate::services::ExportFile;
use domain::services::{
    export, filter_records,
    retirement::{self, RetireOutcome, RetirementPolicy, SweepReport, UpdateAccounting},
    Criteria,
};

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub from_date: Option<String>,
    pub to_date: Option<String>,
}

/// GET /api/v1/users/export
///
/// CSV export of users with a non-empty email, windowed on `created_at`.
/// An empty result is a 404.
pub async fn export(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let window = parse_window(
        query.from_date.as_deref(),
        query.to_date.as_deref(),
        state.config.exports.users_boundary_format,
    )?;

    let records = state.store.fetch_all(&state.config.store.users()).await?;
    let outcome = filter_records(records, &Criteria::users_with_email(window));
    if outcome.matched.is_empty() {
        return Err(ApiError::NotFound(
            "No users match the requested window".to_string(),
        ));
    }

    let table = export::project(&outcome.matched, export::USER_COLUMNS);
    let bytes = export::to_csv(&table).map_err(|err| ApiError::Internal(err.to_string()))?;

    let file = ExportFile::write(&state.config.exports.dir, "users", &bytes)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    record_export_generated("users");

    info!(
        rows = table.rows.len(),
        excluded = outcome.excluded,
        "User export generated"
    );
    file.into_response()
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))
}

#[derive(Debug, Serialize)]
pub struct RetireResponse {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accounting: Option<UpdateAccounting>,
}

impl From<RetireOutcome> for RetireResponse {
    fn from(outcome: RetireOutcome) -> Self {
        match outcome {
            RetireOutcome::AlreadyRetired => Self {
                outcome: "already_retired",
                replacement_id: None,
                accounting: None,
            },
            RetireOutcome::Deleted {
                replacement_id,
                accounting,
            } => Self {
                outcome: "deleted",
                replacement_id: Some(replacement_id),
                accounting: Some(accounting),
            },
            RetireOutcome::Retained {
                replacement_id,
                accounting,
            } => Self {
                outcome: "retained",
                replacement_id: Some(replacement_id),
                accounting: Some(accounting),
            },
        }
    }
}

/// POST /api/v1/users/{user_id}/retire
///
/// Destructive: replaces the user with an anonymized record, re-points
/// referencing transactions, and deletes the original only when the
/// accounting guard allows it.
pub async fn retire(
    _key: ServiceKey,
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<RetireResponse>, ApiError> {
    let policy = retirement_policy(&state);
    let outcome = retirement::retire_user(
        state.store.as_ref(),
        &state.config.store.users(),
        &state.config.store.transactions(),
        user_id,
        &policy,
    )
    .await?;

    if matches!(outcome, RetireOutcome::Deleted { .. }) {
        record_user_retired();
    }
    Ok(Json(outcome.into()))
}

/// POST /api/v1/users/retire-sweep
///
/// Retires every user whose deletion intent is old enough.
pub async fn retire_sweep(
    _key: ServiceKey,
    State(state): State<AppState>,
) -> Result<Json<SweepReport>, ApiError> {
    let policy = retirement_policy(&state);
    let report = retirement::sweep(
        state.store.as_ref(),
        &state.config.store.users(),
        &state.config.store.transactions(),
        &policy,
        Utc::now(),
    )
    .await?;

    for _ in &report.retired {
        record_user_retired();
    }
    info!(
        examined = report.examined,
        retired = report.retired.len(),
        retained = report.retained.len(),
        skipped = report.skipped,
        failed = report.failed,
        "Deletion-intent sweep finished"
    );
    Ok(Json(report))
}

fn retirement_policy(state: &AppState) -> RetirementPolicy {
    RetirementPolicy {
        strict: state.config.retirement.strict,
        min_intent_days: state.config.retirement.deletion_intent_min_days,
    }
}
