//! Health check endpoint handlers.

use axum::Json;
use chrono::Utc;
use serde::Serialize;

use shared::dates;

/// Liveness payload: fixed status, package version, current UTC time.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// GET /api/health (alias GET /ping).
///
/// The relay holds no state, so liveness is the only health there is;
/// upstream availability shows up per request instead.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: dates::format_record_timestamp(&Utc::now()),
    })
}
