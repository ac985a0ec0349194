//! Transaction lookup and export endpoints.

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::ServiceKey;
use crate::middleware::record_export_generated;
use crate::routes::parse_window;
use crate::services::ExportFile;
use domain::services::{
    enrich::{self, JoinSpec},
    export, filter_records, Criteria,
};
use shared::dates::TimeWindow;

#[derive(Debug, Deserialize, Validate)]
pub struct LookupRequest {
    #[validate(range(min = 1, message = "must be a positive id"))]
    pub partner_id: i64,
}

/// POST /api/v1/transactions/lookup
///
/// Finalized transactions referencing the partner, echoed as fetched.
/// An empty result is a 200 with an empty array.
pub async fn lookup(
    _key: ServiceKey,
    State(state): State<AppState>,
    Json(request): Json<LookupRequest>,
) -> Result<Json<Vec<Value>>, ApiError> {
    request.validate()?;

    let records = state.store.fetch_all(&state.config.store.transactions()).await?;
    let outcome = filter_records(
        records,
        &Criteria::finalized_for_partner(request.partner_id, TimeWindow::default()),
    );

    info!(
        partner_id = request.partner_id,
        matched = outcome.matched.len(),
        excluded = outcome.excluded,
        "Transaction lookup"
    );
    Ok(Json(outcome.matched))
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub from_date: Option<String>,
    pub to_date: Option<String>,
}

/// GET /api/v1/transactions/export/{partner_id}
///
/// CSV export of finalized partner transactions with coupon names
/// attached. An empty result is a 404, unlike the JSON lookup.
pub async fn export(
    State(state): State<AppState>,
    Path(partner_id): Path<i64>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let window = parse_window(
        query.from_date.as_deref(),
        query.to_date.as_deref(),
        state.config.exports.transactions_boundary_format,
    )?;

    let records = state.store.fetch_all(&state.config.store.transactions()).await?;
    let outcome = filter_records(records, &Criteria::finalized_for_partner(partner_id, window));
    if outcome.matched.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No finalized transactions for partner {partner_id}"
        )));
    }

    let mut matched = outcome.matched;
    enrich::annotate(
        &mut matched,
        state.store.as_ref(),
        &state.config.store.coupons(),
        &JoinSpec::coupon_names(),
    )
    .await;

    let table = export::project(&matched, export::TRANSACTION_COLUMNS);
    let bytes = export::to_csv(&table).map_err(|err| ApiError::Internal(err.to_string()))?;

    let file = ExportFile::write(&state.config.exports.dir, "transactions", &bytes)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    record_export_generated("transactions");

    info!(
        partner_id,
        rows = table.rows.len(),
        excluded = outcome.excluded,
        "Transaction export generated"
    );
    file.into_response()
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))
}
