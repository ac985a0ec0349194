//! Record-store abstraction over the upstream collection API.
//!
//! The HTTP client lives in the api crate; business logic talks to this
//! trait so tests can run against the in-memory double.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{Map, Value};
use thiserror::Error;

use shared::dates;

/// Errors surfaced by record-store calls.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A credential required for the call is absent from configuration.
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    /// The store answered with a non-success status.
    #[error("Upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The response body was not valid JSON.
    #[error("Failed to decode upstream response: {0}")]
    Decode(String),

    /// The body decoded but its shape violates the collection contract.
    #[error("Unexpected upstream response format: {0}")]
    UnexpectedFormat(String),

    /// The request never produced a response.
    #[error("Upstream request failed: {0}")]
    Transport(String),
}

impl StoreError {
    /// True for failures caused by the store rejecting the credential.
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            StoreError::Upstream {
                status: 401 | 403,
                ..
            }
        )
    }
}

/// A collection within the store application. Collections guarded by a
/// separate credential carry their own key; the rest use the
/// application-wide one.
#[derive(Debug, Clone)]
pub struct CollectionRef {
    pub id: String,
    pub api_key: Option<String>,
}

impl CollectionRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            api_key: None,
        }
    }

    pub fn with_key(id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            api_key: Some(api_key.into()),
        }
    }
}

/// Collection-scoped CRUD against the upstream record store.
///
/// Every call is a single attempt. Callers decide whether a failure is
/// fatal or degrades the operation.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// All records of the collection, normalized to a bare list.
    async fn fetch_all(&self, collection: &CollectionRef) -> Result<Vec<Value>, StoreError>;

    /// A single record by id.
    async fn fetch_one(&self, collection: &CollectionRef, id: i64) -> Result<Value, StoreError>;

    /// Creates a record and returns the stored representation.
    async fn create(
        &self,
        collection: &CollectionRef,
        payload: &Map<String, Value>,
    ) -> Result<Value, StoreError>;

    /// Partially updates a record by id.
    async fn update(
        &self,
        collection: &CollectionRef,
        id: i64,
        payload: &Map<String, Value>,
    ) -> Result<Value, StoreError>;

    /// Deletes a record by id.
    async fn delete(&self, collection: &CollectionRef, id: i64) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct InMemoryState {
    collections: HashMap<String, Vec<Value>>,
    fetch_failures: HashMap<String, u16>,
    create_failures: HashMap<String, u16>,
    update_failures: HashMap<(String, i64), u16>,
    delete_failures: HashMap<(String, i64), u16>,
    next_id: i64,
    calls: Vec<String>,
}

/// In-memory record store for tests and local development.
///
/// Mimics the real store: ids are assigned on create, timestamps are
/// stamped, and failures can be simulated per collection or per record.
/// Every call is logged so tests can assert that an operation never
/// reached the store.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    state: Mutex<InMemoryState>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the contents of a collection.
    pub fn seed(&self, collection_id: &str, records: Vec<Value>) {
        let mut state = self.state.lock().unwrap();
        let max_id = records
            .iter()
            .filter_map(|r| r.get("id").and_then(Value::as_i64))
            .max()
            .unwrap_or(0);
        state.next_id = state.next_id.max(max_id);
        state.collections.insert(collection_id.to_string(), records);
    }

    /// Makes every fetch of `collection_id` fail with `status`.
    pub fn fail_fetch(&self, collection_id: &str, status: u16) {
        let mut state = self.state.lock().unwrap();
        state
            .fetch_failures
            .insert(collection_id.to_string(), status);
    }

    /// Makes every create in `collection_id` fail with `status`.
    pub fn fail_create(&self, collection_id: &str, status: u16) {
        let mut state = self.state.lock().unwrap();
        state
            .create_failures
            .insert(collection_id.to_string(), status);
    }

    /// Makes updates of one record fail with `status`.
    pub fn fail_update(&self, collection_id: &str, id: i64, status: u16) {
        let mut state = self.state.lock().unwrap();
        state
            .update_failures
            .insert((collection_id.to_string(), id), status);
    }

    /// Makes deletes of one record fail with `status`.
    pub fn fail_delete(&self, collection_id: &str, id: i64, status: u16) {
        let mut state = self.state.lock().unwrap();
        state
            .delete_failures
            .insert((collection_id.to_string(), id), status);
    }

    /// Calls seen so far, in order, as `op:collection[:id]` strings.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Current contents of a collection.
    pub fn records(&self, collection_id: &str) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .collections
            .get(collection_id)
            .cloned()
            .unwrap_or_default()
    }

    fn simulated(status: u16) -> StoreError {
        StoreError::Upstream {
            status,
            body: "simulated upstream failure".to_string(),
        }
    }
}

#[async_trait::async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn fetch_all(&self, collection: &CollectionRef) -> Result<Vec<Value>, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("fetch_all:{}", collection.id));

        if let Some(&status) = state.fetch_failures.get(&collection.id) {
            return Err(Self::simulated(status));
        }
        Ok(state
            .collections
            .get(&collection.id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_one(&self, collection: &CollectionRef, id: i64) -> Result<Value, StoreError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("fetch_one:{}:{}", collection.id, id));

        if let Some(&status) = state.fetch_failures.get(&collection.id) {
            return Err(Self::simulated(status));
        }
        state
            .collections
            .get(&collection.id)
            .and_then(|records| {
                records
                    .iter()
                    .find(|r| r.get("id").and_then(Value::as_i64) == Some(id))
            })
            .cloned()
            .ok_or(StoreError::Upstream {
                status: 404,
                body: format!("record {id} not found"),
            })
    }

    async fn create(
        &self,
        collection: &CollectionRef,
        payload: &Map<String, Value>,
    ) -> Result<Value, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("create:{}", collection.id));

        if let Some(&status) = state.create_failures.get(&collection.id) {
            return Err(Self::simulated(status));
        }

        state.next_id += 1;
        let id = state.next_id;
        let now = dates::format_record_timestamp(&chrono::Utc::now());

        let mut record = payload.clone();
        record.insert("id".to_string(), Value::from(id));
        record.insert("created_at".to_string(), Value::String(now.clone()));
        record.insert("updated_at".to_string(), Value::String(now));

        let stored = Value::Object(record);
        state
            .collections
            .entry(collection.id.clone())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        collection: &CollectionRef,
        id: i64,
        payload: &Map<String, Value>,
    ) -> Result<Value, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("update:{}:{}", collection.id, id));

        if let Some(&status) = state.update_failures.get(&(collection.id.clone(), id)) {
            return Err(Self::simulated(status));
        }

        let records = state
            .collections
            .get_mut(&collection.id)
            .ok_or(StoreError::Upstream {
                status: 404,
                body: format!("record {id} not found"),
            })?;
        let record = records
            .iter_mut()
            .find(|r| r.get("id").and_then(Value::as_i64) == Some(id))
            .ok_or(StoreError::Upstream {
                status: 404,
                body: format!("record {id} not found"),
            })?;
        let fields = record
            .as_object_mut()
            .ok_or_else(|| StoreError::UnexpectedFormat("record is not an object".to_string()))?;

        for (key, value) in payload {
            fields.insert(key.clone(), value.clone());
        }
        Ok(record.clone())
    }

    async fn delete(&self, collection: &CollectionRef, id: i64) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("delete:{}:{}", collection.id, id));

        if let Some(&status) = state.delete_failures.get(&(collection.id.clone(), id)) {
            return Err(Self::simulated(status));
        }

        let records = state
            .collections
            .get_mut(&collection.id)
            .ok_or(StoreError::Upstream {
                status: 404,
                body: format!("record {id} not found"),
            })?;
        let position = records
            .iter()
            .position(|r| r.get("id").and_then(Value::as_i64) == Some(id))
            .ok_or(StoreError::Upstream {
                status: 404,
                body: format!("record {id} not found"),
            })?;
        records.remove(position);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transactions() -> CollectionRef {
        CollectionRef::new("transactions")
    }

    #[tokio::test]
    async fn test_fetch_all_returns_seeded_records() {
        let store = InMemoryRecordStore::new();
        store.seed("transactions", vec![json!({ "id": 1 }), json!({ "id": 2 })]);

        let records = store.fetch_all(&transactions()).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(store.calls(), vec!["fetch_all:transactions"]);
    }

    #[tokio::test]
    async fn test_fetch_all_unseeded_collection_is_empty() {
        let store = InMemoryRecordStore::new();
        let records = store.fetch_all(&transactions()).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_simulated_fetch_failure() {
        let store = InMemoryRecordStore::new();
        store.fail_fetch("transactions", 503);

        let err = store.fetch_all(&transactions()).await.unwrap_err();
        assert!(matches!(err, StoreError::Upstream { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_timestamps() {
        let store = InMemoryRecordStore::new();
        store.seed("users", vec![json!({ "id": 40 })]);

        let mut payload = Map::new();
        payload.insert("email".to_string(), json!("anna@example.com"));

        let users = CollectionRef::new("users");
        let created = store.create(&users, &payload).await.unwrap();

        assert_eq!(created.get("id"), Some(&json!(41)));
        assert_eq!(created.get("email"), Some(&json!("anna@example.com")));
        assert!(created.get("created_at").is_some());
        assert_eq!(store.records("users").len(), 2);
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = InMemoryRecordStore::new();
        store.seed(
            "transactions",
            vec![json!({ "id": 1, "user_transaction": [5], "spend_value": 100 })],
        );

        let mut payload = Map::new();
        payload.insert("user_transaction".to_string(), json!([77]));

        let updated = store.update(&transactions(), 1, &payload).await.unwrap();
        assert_eq!(updated.get("user_transaction"), Some(&json!([77])));
        assert_eq!(updated.get("spend_value"), Some(&json!(100)));
    }

    #[tokio::test]
    async fn test_update_missing_record_is_upstream_404() {
        let store = InMemoryRecordStore::new();
        store.seed("transactions", vec![]);

        let payload = Map::new();
        let err = store.update(&transactions(), 99, &payload).await.unwrap_err();
        assert!(matches!(err, StoreError::Upstream { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let store = InMemoryRecordStore::new();
        store.seed("users", vec![json!({ "id": 1 }), json!({ "id": 2 })]);

        let users = CollectionRef::new("users");
        store.delete(&users, 1).await.unwrap();

        let remaining = store.records("users");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].get("id"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_simulated_update_failure_is_per_record() {
        let store = InMemoryRecordStore::new();
        store.seed(
            "transactions",
            vec![json!({ "id": 1 }), json!({ "id": 2 })],
        );
        store.fail_update("transactions", 1, 401);

        let payload = Map::new();
        let err = store.update(&transactions(), 1, &payload).await.unwrap_err();
        assert!(err.is_authorization());

        assert!(store.update(&transactions(), 2, &payload).await.is_ok());
    }

    #[test]
    fn test_is_authorization_classification() {
        let unauthorized = StoreError::Upstream {
            status: 401,
            body: String::new(),
        };
        let forbidden = StoreError::Upstream {
            status: 403,
            body: String::new(),
        };
        let server = StoreError::Upstream {
            status: 500,
            body: String::new(),
        };
        let transport = StoreError::Transport("connection refused".to_string());

        assert!(unauthorized.is_authorization());
        assert!(forbidden.is_authorization());
        assert!(!server.is_authorization());
        assert!(!transport.is_authorization());
    }
}
