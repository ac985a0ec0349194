//! Tabular projection of records into a CSV export.
//!
//! A projection is driven by an ordered column table: field name, display
//! label, and how the cell is rendered. Columns absent from every record
//! are dropped rather than emitted empty, so the same table serves every
//! revision of a collection's schema.

use serde_json::Value;
use tracing::warn;

use crate::models::{transaction, user};
use shared::dates;

/// Localized cell tokens for boolean columns.
const YES_TOKEN: &str = "Igen";
const NO_TOKEN: &str = "Nem";

/// How a column's cells are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Raw value rendered as text.
    Text,
    /// Store timestamp reformatted to minute precision, with a
    /// column-level fallback to the raw values.
    Date,
    /// Boolean literals rendered as localized yes/no tokens.
    Boolean,
}

/// One column of an export: source field, display label, rendering.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub field: &'static str,
    pub label: &'static str,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    const fn text(field: &'static str, label: &'static str) -> Self {
        Self {
            field,
            label,
            kind: ColumnKind::Text,
        }
    }

    const fn date(field: &'static str, label: &'static str) -> Self {
        Self {
            field,
            label,
            kind: ColumnKind::Date,
        }
    }

}

/// Column order of the partner transaction export. The coupon-name
/// column is written by the enrichment pass and follows the coupon
/// relation it resolves.
pub const TRANSACTION_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::text(transaction::ID_FIELD, "Tranzakció azonosítója"),
    ColumnSpec::text(transaction::STATUS_FIELD, "Tranzakció státusza"),
    ColumnSpec::text(transaction::USER_RELATION_FIELD, "User id-ja"),
    ColumnSpec::text(transaction::PARTNER_RELATION_FIELD, "Partner id-ja"),
    ColumnSpec::text(transaction::COUPON_RELATION_FIELD, "Kupon id-ja"),
    ColumnSpec::text(transaction::COUPON_NAME_FIELD, "Kupon neve"),
    ColumnSpec::text(transaction::SPEND_FIELD, "Költés"),
    ColumnSpec::text(transaction::DISCOUNT_FIELD, "Kedvezmény %"),
    ColumnSpec::text(transaction::SAVED_FIELD, "Spórolás"),
    ColumnSpec::text(transaction::HUNICOIN_FIELD, "Hunicoinok száma"),
    ColumnSpec::text(transaction::COMMISSION_FIELD, "Jutalék összege"),
    ColumnSpec::date(transaction::UPDATED_AT_FIELD, "Tranzakció dátuma"),
];

/// Column order of the user export.
pub const USER_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::text(user::ID_FIELD, "Felhasználó azonosító"),
    ColumnSpec::text(user::EMAIL_FIELD, "Email cím"),
    ColumnSpec::text(user::PHONE_FIELD, "Telefonszám"),
    ColumnSpec::date(user::CREATED_AT_FIELD, "Regisztráció dátuma"),
    ColumnSpec::date(user::UPDATED_AT_FIELD, "Utolsó módosítás dátuma"),
    ColumnSpec::text(user::FIRST_NAME_FIELD, "Keresztnév"),
    ColumnSpec::text(user::LAST_NAME_FIELD, "Vezetéknév"),
    ColumnSpec::text(user::STATUS_FIELD, "Státusz"),
];

/// A rendered table: one header row plus data rows, column order fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Projects records through a column table.
///
/// Keeps the table's order, restricted to columns present in at least one
/// record. Date columns fall back to the raw values for the whole column
/// when any present value fails to parse, so a schema drift shows up in
/// the export instead of producing a half-reformatted column.
pub fn project(records: &[Value], columns: &[ColumnSpec]) -> Table {
    let retained: Vec<&ColumnSpec> = columns
        .iter()
        .filter(|column| {
            records
                .iter()
                .any(|record| record.get(column.field).is_some())
        })
        .collect();

    let header = retained
        .iter()
        .map(|column| column.label.to_string())
        .collect();

    let rows = records
        .iter()
        .map(|record| {
            retained
                .iter()
                .map(|column| render_cell(record.get(column.field), column, records))
                .collect()
        })
        .collect();

    Table { header, rows }
}

/// Serializes a table as CSV with a header row and no index column.
pub fn to_csv(table: &Table) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.header)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))
}

fn render_cell(value: Option<&Value>, column: &ColumnSpec, records: &[Value]) -> String {
    let Some(value) = value else {
        return String::new();
    };
    match column.kind {
        ColumnKind::Text => render_plain(value),
        ColumnKind::Boolean => match value {
            Value::Bool(true) => YES_TOKEN.to_string(),
            Value::Bool(false) => NO_TOKEN.to_string(),
            other => render_plain(other),
        },
        ColumnKind::Date => {
            if column_parses(records, column.field) {
                match value.as_str().map(dates::parse_record_timestamp) {
                    Some(Ok(instant)) => dates::format_minute(&instant),
                    _ => render_plain(value),
                }
            } else {
                render_plain(value)
            }
        }
    }
}

/// True when every present value of a date column parses as a store
/// timestamp. One bad value leaves the whole column raw.
fn column_parses(records: &[Value], field: &str) -> bool {
    let mut seen = false;
    for record in records {
        match record.get(field) {
            None | Some(Value::Null) => continue,
            Some(Value::String(raw)) => {
                if dates::parse_record_timestamp(raw).is_err() {
                    warn!(field, value = %raw, "Unparseable date value, column left raw");
                    return false;
                }
                seen = true;
            }
            Some(_) => return false,
        }
    }
    seen
}

fn render_plain(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(items) => items
            .iter()
            .map(render_plain)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    }
}
