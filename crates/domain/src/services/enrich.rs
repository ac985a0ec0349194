//! Lookup-collection enrichment of filtered records.
//!
//! Attaches a display value from a secondary collection to each primary
//! record via a relation field. The lookup fetch is best-effort: when it
//! fails the records are still annotated, just with empty strings, so a
//! broken coupon catalog never takes down a transaction export.

use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;

use crate::models::{coupon, transaction};
use crate::services::record_store::{CollectionRef, RecordStore};

/// Field names steering one enrichment pass.
#[derive(Debug, Clone)]
pub struct JoinSpec {
    /// Relation field on the primary record. When it holds more than one
    /// id only the first is looked up.
    pub foreign_key_field: &'static str,
    /// Id field on the lookup records.
    pub lookup_id_field: &'static str,
    /// Field on the lookup records carrying the display value.
    pub lookup_value_field: &'static str,
    /// Field written onto every primary record. Always set, possibly to
    /// an empty string.
    pub target_field: &'static str,
}

impl JoinSpec {
    /// Coupon names onto transactions via the coupon relation.
    pub fn coupon_names() -> Self {
        Self {
            foreign_key_field: transaction::COUPON_RELATION_FIELD,
            lookup_id_field: coupon::ID_FIELD,
            lookup_value_field: coupon::NAME_FIELD,
            target_field: transaction::COUPON_NAME_FIELD,
        }
    }
}

/// Annotates every record in place with the looked-up display value.
///
/// A failed lookup fetch degrades to an empty mapping instead of failing
/// the caller; a missing relation or an unknown id annotates an empty
/// string, never a missing field.
pub async fn annotate(
    records: &mut [Value],
    store: &dyn RecordStore,
    lookup: &CollectionRef,
    spec: &JoinSpec,
) {
    let mapping = match store.fetch_all(lookup).await {
        Ok(lookup_records) => build_mapping(&lookup_records, spec),
        Err(err) => {
            warn!(
                collection = %lookup.id,
                error = %err,
                "Lookup fetch failed, enrichment degrades to empty values"
            );
            HashMap::new()
        }
    };

    for record in records.iter_mut() {
        let Some(fields) = record.as_object_mut() else {
            continue;
        };
        let value = fields
            .get(spec.foreign_key_field)
            .and_then(Value::as_array)
            .and_then(|ids| ids.first())
            .and_then(Value::as_i64)
            .and_then(|id| mapping.get(&id))
            .cloned()
            .unwrap_or_default();
        fields.insert(spec.target_field.to_string(), Value::String(value));
    }
}

fn build_mapping(lookup_records: &[Value], spec: &JoinSpec) -> HashMap<i64, String> {
    lookup_records
        .iter()
        .filter_map(|record| {
            let id = record.get(spec.lookup_id_field).and_then(Value::as_i64)?;
            let value = record.get(spec.lookup_value_field).and_then(Value::as_str)?;
            Some((id, value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::record_store::InMemoryRecordStore;
    use serde_json::json;

    fn coupons_ref() -> CollectionRef {
        CollectionRef::new("coupons")
    }

    fn seeded_store() -> InMemoryRecordStore {
        let store = InMemoryRecordStore::new();
        store.seed(
            "coupons",
            vec![
                json!({ "id": 3, "name": "Spring promo" }),
                json!({ "id": 9, "name": "Welcome" }),
            ],
        );
        store
    }

    #[tokio::test]
    async fn test_annotate_attaches_first_relation_match() {
        let store = seeded_store();
        let mut records = vec![
            json!({ "id": 1, "coupon_transaction": [3] }),
            json!({ "id": 2, "coupon_transaction": [9, 3] }),
        ];

        annotate(&mut records, &store, &coupons_ref(), &JoinSpec::coupon_names()).await;

        assert_eq!(records[0].get("coupon_name"), Some(&json!("Spring promo")));
        // Multi-valued relation: only the first id is looked up.
        assert_eq!(records[1].get("coupon_name"), Some(&json!("Welcome")));
    }

    #[tokio::test]
    async fn test_annotate_unknown_or_missing_key_yields_empty_string() {
        let store = seeded_store();
        let mut records = vec![
            json!({ "id": 1, "coupon_transaction": [404] }),
            json!({ "id": 2, "coupon_transaction": [] }),
            json!({ "id": 3 }),
        ];

        annotate(&mut records, &store, &coupons_ref(), &JoinSpec::coupon_names()).await;

        for record in &records {
            assert_eq!(record.get("coupon_name"), Some(&json!("")));
        }
    }

    #[tokio::test]
    async fn test_annotate_degrades_on_lookup_failure() {
        let store = seeded_store();
        store.fail_fetch("coupons", 500);

        let mut records = vec![
            json!({ "id": 1, "coupon_transaction": [3] }),
            json!({ "id": 2, "coupon_transaction": [9] }),
        ];

        annotate(&mut records, &store, &coupons_ref(), &JoinSpec::coupon_names()).await;

        // No record dropped, every record annotated with an empty string.
        assert_eq!(records.len(), 2);
        for record in &records {
            assert_eq!(record.get("coupon_name"), Some(&json!("")));
        }
    }

    #[tokio::test]
    async fn test_annotate_skips_malformed_lookup_records() {
        let store = InMemoryRecordStore::new();
        store.seed(
            "coupons",
            vec![
                json!({ "id": 3, "name": "Spring promo" }),
                json!({ "id": 4 }),
                json!({ "name": "orphan" }),
            ],
        );

        let mut records = vec![json!({ "id": 1, "coupon_transaction": [4] })];
        annotate(&mut records, &store, &coupons_ref(), &JoinSpec::coupon_names()).await;
        assert_eq!(records[0].get("coupon_name"), Some(&json!("")));
    }
}
