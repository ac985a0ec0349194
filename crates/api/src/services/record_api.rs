//! HTTP implementation of the record-store trait.
//!
//! One application on the upstream store holds several collections; every
//! call is a single bearer-authenticated request. Collection reads
//! normalize the two historical response shapes (bare list, or a wrapper
//! object with a `records`/`users` list field) to a plain list.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::StoreConfig;
use domain::services::record_store::{CollectionRef, RecordStore, StoreError};

/// Wrapper fields the store has used for list responses across revisions.
const LIST_FIELDS: [&str; 2] = ["records", "users"];

/// Upper bound on pages per collection fetch. A paging upstream that
/// never yields a short page must not turn one fetch into an infinite
/// loop.
const MAX_PAGES: usize = 1000;

pub struct RecordApiClient {
    client: Client,
    base_url: String,
    api_key: String,
    page_size: usize,
}

impl RecordApiClient {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| StoreError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            page_size: config.page_size,
        })
    }

    fn collection_url(&self, collection: &CollectionRef) -> String {
        format!("{}/{}", self.base_url, collection.id)
    }

    fn record_url(&self, collection: &CollectionRef, id: i64) -> String {
        format!("{}/{}/{}", self.base_url, collection.id, id)
    }

    /// Bearer credential for a collection: its own key when configured,
    /// the application-wide one otherwise.
    fn bearer<'a>(&'a self, collection: &'a CollectionRef) -> &'a str {
        collection.api_key.as_deref().unwrap_or(&self.api_key)
    }

    async fn decode(response: reqwest::Response) -> Result<Value, StoreError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| StoreError::Transport(err.to_string()))?;

        if !status.is_success() {
            return Err(StoreError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|err| StoreError::Decode(err.to_string()))
    }

    async fn fetch_page(
        &self,
        collection: &CollectionRef,
        page: Option<(usize, usize)>,
    ) -> Result<Vec<Value>, StoreError> {
        let mut request = self
            .client
            .get(self.collection_url(collection))
            .bearer_auth(self.bearer(collection));
        if let Some((offset, limit)) = page {
            request = request.query(&[("offset", offset), ("limit", limit)]);
        }

        let response = request
            .send()
            .await
            .map_err(|err| StoreError::Transport(err.to_string()))?;
        normalize_records(Self::decode(response).await?)
    }
}

/// Normalizes a collection read to a bare list.
fn normalize_records(value: Value) -> Result<Vec<Value>, StoreError> {
    match value {
        Value::Array(records) => Ok(records),
        Value::Object(mut fields) => {
            for field in LIST_FIELDS {
                if let Some(Value::Array(records)) = fields.remove(field) {
                    return Ok(records);
                }
            }
            Err(StoreError::UnexpectedFormat(
                "object without a records/users list field".to_string(),
            ))
        }
        other => Err(StoreError::UnexpectedFormat(format!(
            "expected a list, got {}",
            json_type(&other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl RecordStore for RecordApiClient {
    async fn fetch_all(&self, collection: &CollectionRef) -> Result<Vec<Value>, StoreError> {
        if self.page_size == 0 {
            return self.fetch_page(collection, None).await;
        }

        let mut records = Vec::new();
        let mut offset = 0;
        let mut previous: Option<Vec<Value>> = None;
        for _ in 0..MAX_PAGES {
            let page = self
                .fetch_page(collection, Some((offset, self.page_size)))
                .await?;
            if page.len() < self.page_size {
                records.extend(page);
                debug!(collection = %collection.id, count = records.len(), "Fetched collection");
                return Ok(records);
            }
            // A store revision that ignores offset/limit answers every
            // page with the same full listing; one copy is enough.
            if previous.as_ref() == Some(&page) {
                debug!(
                    collection = %collection.id,
                    count = records.len(),
                    "Upstream repeated the previous page, treating the listing as unpaginated"
                );
                return Ok(records);
            }
            offset += page.len();
            previous = Some(page.clone());
            records.extend(page);
        }

        Err(StoreError::UnexpectedFormat(format!(
            "collection {} listing did not terminate within {MAX_PAGES} pages",
            collection.id
        )))
    }

    async fn fetch_one(&self, collection: &CollectionRef, id: i64) -> Result<Value, StoreError> {
        let response = self
            .client
            .get(self.record_url(collection, id))
            .bearer_auth(self.bearer(collection))
            .send()
            .await
            .map_err(|err| StoreError::Transport(err.to_string()))?;

        let value = Self::decode(response).await?;
        if !value.is_object() {
            return Err(StoreError::UnexpectedFormat(format!(
                "expected a record object, got {}",
                json_type(&value)
            )));
        }
        Ok(value)
    }

    async fn create(
        &self,
        collection: &CollectionRef,
        payload: &Map<String, Value>,
    ) -> Result<Value, StoreError> {
        let response = self
            .client
            .post(self.collection_url(collection))
            .bearer_auth(self.bearer(collection))
            .json(payload)
            .send()
            .await
            .map_err(|err| StoreError::Transport(err.to_string()))?;
        Self::decode(response).await
    }

    async fn update(
        &self,
        collection: &CollectionRef,
        id: i64,
        payload: &Map<String, Value>,
    ) -> Result<Value, StoreError> {
        let response = self
            .client
            .put(self.record_url(collection, id))
            .bearer_auth(self.bearer(collection))
            .json(payload)
            .send()
            .await
            .map_err(|err| StoreError::Transport(err.to_string()))?;
        Self::decode(response).await
    }

    async fn delete(&self, collection: &CollectionRef, id: i64) -> Result<(), StoreError> {
        let response = self
            .client
            .delete(self.record_url(collection, id))
            .bearer_auth(self.bearer(collection))
            .send()
            .await
            .map_err(|err| StoreError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
