//! User record vocabulary, the retired-email naming convention, and the
//! anonymized replacement payload built by the retirement workflow.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::models::transaction;

/// Field names used by the users collection.
pub const ID_FIELD: &str = "id";
pub const EMAIL_FIELD: &str = "email";
pub const FIRST_NAME_FIELD: &str = "first_name";
pub const LAST_NAME_FIELD: &str = "last_name";
pub const PHONE_FIELD: &str = "phone";
pub const STATUS_FIELD: &str = "status";
pub const CREATED_AT_FIELD: &str = "created_at";
pub const UPDATED_AT_FIELD: &str = "updated_at";
pub const DELETE_REQUESTED_FIELD: &str = "delete_requested";
pub const DELETE_REQUESTED_AT_FIELD: &str = "delete_requested_at";

/// Domain for anonymized replacement addresses. `.invalid` is reserved by
/// RFC 2606 and can never receive mail.
const RETIRED_EMAIL_DOMAIN: &str = "retired.invalid";

lazy_static::lazy_static! {
    static ref RETIRED_EMAIL: regex::Regex =
        regex::Regex::new(r"^deleted\.user\.\d+@").unwrap();
}

/// Address assigned to the anonymized replacement of `user_id`.
pub fn retired_email_for(user_id: i64) -> String {
    format!("deleted.user.{user_id}@{RETIRED_EMAIL_DOMAIN}")
}

/// True when `email` follows the retired naming convention. The sweep uses
/// this to skip users that were already retired.
pub fn is_retired_email(email: &str) -> bool {
    RETIRED_EMAIL.is_match(email)
}

/// Typed view of a user record. Named fields are the ones the relay reads
/// or rewrites; everything else is captured in `extra` and carried through
/// unmodified when a replacement is created.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub delete_requested: Option<bool>,
    #[serde(default)]
    pub delete_requested_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    /// True when this user has asked for deletion.
    pub fn deletion_requested(&self) -> bool {
        self.delete_requested == Some(true)
    }

    /// True when this record is the anonymized replacement left behind by
    /// an earlier retirement.
    pub fn is_retired(&self) -> bool {
        self.email.as_deref().is_some_and(is_retired_email)
    }

    /// Create payload for the anonymized replacement of this user.
    ///
    /// Identity fields are overwritten with the retired convention, the
    /// deletion-intent flag is cleared, and every field the relay never
    /// reads carries over unchanged. Store-managed fields (`id`, the
    /// timestamps) and the transaction relation are left out; transactions
    /// are re-pointed on their own side instead.
    pub fn anonymized_replacement(&self) -> Map<String, Value> {
        let mut payload = self.extra.clone();
        payload.remove(transaction::USER_RELATION_FIELD);
        payload.insert(
            EMAIL_FIELD.to_string(),
            Value::String(retired_email_for(self.id)),
        );
        payload.insert(
            FIRST_NAME_FIELD.to_string(),
            Value::String("Deleted".to_string()),
        );
        payload.insert(
            LAST_NAME_FIELD.to_string(),
            Value::String("User".to_string()),
        );
        payload.insert(PHONE_FIELD.to_string(), Value::String(String::new()));
        payload.insert(DELETE_REQUESTED_FIELD.to_string(), Value::Bool(false));
        payload
    }
}
