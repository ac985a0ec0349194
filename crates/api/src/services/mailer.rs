//! HTTP client for the transactional-email API.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use crate::config::EmailConfig;
use domain::services::mailer::{EmailBatch, MailError, Mailer};

pub struct EmailApiClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl EmailApiClient {
    pub fn new(config: &EmailConfig) -> Result<Self, MailError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|err| MailError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl Mailer for EmailApiClient {
    async fn send_batch(&self, batch: &EmailBatch) -> Result<(), MailError> {
        if self.api_key.is_empty() {
            return Err(MailError::MissingCredential("email.api_key".to_string()));
        }
        if self.api_url.is_empty() {
            return Err(MailError::MissingCredential("email.api_url".to_string()));
        }

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "template_id": batch.template_id,
                "recipients": batch.recipients,
            }))
            .send()
            .await
            .map_err(|err| MailError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Api {
                status: status.as_u16(),
                body,
            });
        }

        debug!(
            template_id = %batch.template_id,
            recipients = batch.recipients.len(),
            "Email batch accepted"
        );
        Ok(())
    }
}
