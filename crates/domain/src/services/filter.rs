//! Ordered conjunctive filter over raw store records.
//!
//! Per-record problems never abort a request: a record that is not an
//! object, misses a required field, or carries an unparseable timestamp is
//! excluded (with a logged warning for timestamps) and processing
//! continues. Output preserves input order and returns records unmodified.

use serde_json::Value;
use tracing::warn;

use crate::models::{transaction, user};
use shared::dates::{self, TimeWindow};

/// What a record must satisfy to pass. Checks run in a fixed order:
/// well-formed object, status equality, relation membership, required
/// non-empty text, time window on the timestamp field.
#[derive(Debug, Clone)]
pub struct Criteria {
    status: Option<(&'static str, &'static str)>,
    relation: Option<(&'static str, i64)>,
    required_text: Option<&'static str>,
    timestamp_field: &'static str,
    window: TimeWindow,
}

impl Criteria {
    /// Finalized transactions referencing `partner_id`, windowed on
    /// `updated_at` when the window is active.
    pub fn finalized_for_partner(partner_id: i64, window: TimeWindow) -> Self {
        Self {
            status: Some((transaction::STATUS_FIELD, transaction::STATUS_FINALIZED)),
            relation: Some((transaction::PARTNER_RELATION_FIELD, partner_id)),
            required_text: None,
            timestamp_field: transaction::UPDATED_AT_FIELD,
            window,
        }
    }

    /// Users with a non-empty email, windowed on `created_at` when the
    /// window is active.
    pub fn users_with_email(window: TimeWindow) -> Self {
        Self {
            status: None,
            relation: None,
            required_text: Some(user::EMAIL_FIELD),
            timestamp_field: user::CREATED_AT_FIELD,
            window,
        }
    }
}

/// Result of a filter pass.
#[derive(Debug)]
pub struct FilterOutcome {
    pub matched: Vec<Value>,
    pub excluded: usize,
}

/// Applies `criteria` to every record, keeping input order.
pub fn filter_records(records: Vec<Value>, criteria: &Criteria) -> FilterOutcome {
    let total = records.len();
    let matched: Vec<Value> = records
        .into_iter()
        .filter(|record| matches_criteria(record, criteria))
        .collect();

    FilterOutcome {
        excluded: total - matched.len(),
        matched,
    }
}

fn matches_criteria(record: &Value, criteria: &Criteria) -> bool {
    let Some(fields) = record.as_object() else {
        return false;
    };

    if let Some((field, expected)) = criteria.status {
        if fields.get(field).and_then(Value::as_str) != Some(expected) {
            return false;
        }
    }

    if let Some((field, id)) = criteria.relation {
        let referenced = fields
            .get(field)
            .and_then(Value::as_array)
            .is_some_and(|ids| ids.iter().any(|v| v.as_i64() == Some(id)));
        if !referenced {
            return false;
        }
    }

    if let Some(field) = criteria.required_text {
        let present = fields
            .get(field)
            .and_then(Value::as_str)
            .is_some_and(|text| !text.is_empty());
        if !present {
            return false;
        }
    }

    if criteria.window.is_active() {
        let Some(raw) = fields.get(criteria.timestamp_field).and_then(Value::as_str) else {
            warn!(
                field = criteria.timestamp_field,
                record_id = ?fields.get("id"),
                "Record has no timestamp under an active date filter, excluded"
            );
            return false;
        };
        match dates::parse_record_timestamp(raw) {
            Ok(instant) => {
                if !criteria.window.contains(&instant) {
                    return false;
                }
            }
            Err(err) => {
                warn!(
                    field = criteria.timestamp_field,
                    record_id = ?fields.get("id"),
                    value = raw,
                    error = %err,
                    "Record timestamp unparseable under an active date filter, excluded"
                );
                return false;
            }
        }
    }

    true
}
