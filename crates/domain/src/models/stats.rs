//! Statistics snapshot record appended by the stats endpoint.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::models::user;
use shared::dates;

/// Record appended to the statistics collection, one per snapshot run.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub user_number: usize,
    pub registered_date: String,
}

impl StatsSnapshot {
    pub fn at(user_number: usize, now: DateTime<Utc>) -> Self {
        Self {
            user_number,
            registered_date: dates::format_record_timestamp(&now),
        }
    }
}

/// Number of records whose `created_at` falls on `day` (UTC). Records with
/// a missing or malformed timestamp are not counted.
pub fn count_created_on(records: &[Value], day: NaiveDate) -> usize {
    records
        .iter()
        .filter(|record| {
            record
                .get(user::CREATED_AT_FIELD)
                .and_then(Value::as_str)
                .and_then(|raw| dates::parse_record_timestamp(raw).ok())
                .is_some_and(|instant| instant.date_naive() == day)
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_snapshot_serializes_store_timestamp_format() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 8, 30, 45).unwrap();
        let snapshot = StatsSnapshot::at(120, now);

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(
            value,
            json!({
                "user_number": 120,
                "registered_date": "2024-03-15T08:30:45.000Z"
            })
        );
    }

    #[test]
    fn test_count_created_on_matches_calendar_day() {
        let records = vec![
            json!({ "id": 1, "created_at": "2024-03-15T00:00:00.000Z" }),
            json!({ "id": 2, "created_at": "2024-03-15T23:59:59.000Z" }),
            json!({ "id": 3, "created_at": "2024-03-14T23:59:59.000Z" }),
            json!({ "id": 4 }),
            json!({ "id": 5, "created_at": "not a date" }),
        ];

        let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(count_created_on(&records, day), 2);
    }

    #[test]
    fn test_count_created_on_empty() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(count_created_on(&[], day), 0);
    }
}
