//! Bulk-email abstraction and recipient selection.
//!
//! The HTTP client for the transactional-email API lives in the api
//! crate; business logic targets this trait so tests can record batches
//! instead of sending them.

use std::sync::Mutex;

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::models::user;

/// Errors surfaced by a mail send attempt.
#[derive(Debug, Error)]
pub enum MailError {
    /// The email API credential is absent from configuration.
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    /// The email API answered with a non-success status.
    #[error("Email API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The request never produced a response.
    #[error("Email request failed: {0}")]
    Transport(String),
}

/// One outbound send: a template and the addresses it goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailBatch {
    pub template_id: String,
    pub recipients: Vec<String>,
}

/// Bulk-send seam over the transactional-email API. Single attempt per
/// batch, no retries.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send_batch(&self, batch: &EmailBatch) -> Result<(), MailError>;
}

/// Recipients drawn from the user collection: a non-empty email that is
/// neither the retired convention nor attached to a pending deletion.
pub fn select_recipients(users: &[Value]) -> Vec<String> {
    users
        .iter()
        .filter_map(|record| {
            let email = record.get(user::EMAIL_FIELD).and_then(Value::as_str)?;
            if email.is_empty() || user::is_retired_email(email) {
                return None;
            }
            if record.get(user::DELETE_REQUESTED_FIELD).and_then(Value::as_bool) == Some(true) {
                return None;
            }
            Some(email.to_string())
        })
        .collect()
}

/// Accounting of one bulk send.
#[derive(Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct SendReport {
    pub recipients: usize,
    pub batches_sent: usize,
    pub batches_failed: usize,
}

/// Sends `recipients` in sequential chunks of at most `batch_size`.
///
/// A failed batch is logged and counted; the remaining batches are still
/// attempted.
pub async fn send_bulk(
    mailer: &dyn Mailer,
    template_id: &str,
    recipients: &[String],
    batch_size: usize,
) -> SendReport {
    let mut report = SendReport {
        recipients: recipients.len(),
        ..Default::default()
    };

    for chunk in recipients.chunks(batch_size.max(1)) {
        let batch = EmailBatch {
            template_id: template_id.to_string(),
            recipients: chunk.to_vec(),
        };
        match mailer.send_batch(&batch).await {
            Ok(()) => report.batches_sent += 1,
            Err(err) => {
                warn!(
                    template_id,
                    batch_size = chunk.len(),
                    error = %err,
                    "Email batch failed"
                );
                report.batches_failed += 1;
            }
        }
    }

    report
}

/// Recording mailer for tests. Batches are captured in order; failures
/// can be simulated wholesale.
#[derive(Debug, Default)]
pub struct MockMailer {
    batches: Mutex<Vec<EmailBatch>>,
    fail_all: Mutex<bool>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent send fail.
    pub fn fail_all(&self) {
        *self.fail_all.lock().unwrap() = true;
    }

    /// Batches attempted so far, in order.
    pub fn batches(&self) -> Vec<EmailBatch> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Mailer for MockMailer {
    async fn send_batch(&self, batch: &EmailBatch) -> Result<(), MailError> {
        self.batches.lock().unwrap().push(batch.clone());
        if *self.fail_all.lock().unwrap() {
            return Err(MailError::Api {
                status: 500,
                body: "simulated email failure".to_string(),
            });
        }
        Ok(())
    }
}
