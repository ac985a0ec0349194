//! Bulk email endpoint.

use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::info;
use validator::{Validate, ValidateEmail, ValidationError};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::ServiceKey;
use crate::middleware::record_email_batches;
use domain::services::mailer::{select_recipients, send_bulk, SendReport};

#[derive(Debug, Deserialize, Validate)]
pub struct BulkSendRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub template_id: String,

    /// Explicit recipient list. Absent means every eligible user from
    /// the user collection.
    #[validate(custom(function = validate_recipients))]
    pub recipients: Option<Vec<String>>,
}

fn validate_recipients(recipients: &[String]) -> Result<(), ValidationError> {
    for recipient in recipients {
        if !recipient.validate_email() {
            let mut error = ValidationError::new("email");
            error.message = Some("malformed address".into());
            return Err(error);
        }
    }
    Ok(())
}

/// POST /api/v1/email/bulk-send
///
/// Sends a template to an explicit recipient list, or to every user with
/// a usable email address, chunked at the configured batch size.
pub async fn bulk_send(
    _key: ServiceKey,
    State(state): State<AppState>,
    Json(request): Json<BulkSendRequest>,
) -> Result<Json<SendReport>, ApiError> {
    request.validate()?;

    let recipients = match request.recipients {
        Some(recipients) => recipients,
        None => {
            let users = state.store.fetch_all(&state.config.store.users()).await?;
            select_recipients(&users)
        }
    };

    let report = send_bulk(
        state.mailer.as_ref(),
        &request.template_id,
        &recipients,
        state.config.email.batch_size,
    )
    .await;
    record_email_batches(report.batches_sent, report.batches_failed);

    info!(
        template_id = %request.template_id,
        recipients = report.recipients,
        batches_sent = report.batches_sent,
        batches_failed = report.batches_failed,
        "Bulk email send finished"
    );
    Ok(Json(report))
}
