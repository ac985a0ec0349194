//! Transaction record vocabulary and the typed view used by the
//! retirement workflow.

use serde::Deserialize;

/// Field names used by the transactions collection.
pub const ID_FIELD: &str = "id";
pub const STATUS_FIELD: &str = "transaction_status";
pub const USER_RELATION_FIELD: &str = "user_transaction";
pub const PARTNER_RELATION_FIELD: &str = "partner_transaction";
pub const COUPON_RELATION_FIELD: &str = "coupon_transaction";
pub const UPDATED_AT_FIELD: &str = "updated_at";
pub const SPEND_FIELD: &str = "spend_value";
pub const DISCOUNT_FIELD: &str = "discount_value";
pub const SAVED_FIELD: &str = "saved_value";
pub const HUNICOIN_FIELD: &str = "hunicoin_value";
pub const COMMISSION_FIELD: &str = "jutalek_value";

/// Status value marking a completed transaction.
pub const STATUS_FINALIZED: &str = "finalized";

/// Column written by the coupon-name enrichment.
pub const COUPON_NAME_FIELD: &str = "coupon_name";

/// Minimal typed view of a transaction record. Only the id and the user
/// relation matter when re-pointing transactions; everything else stays in
/// the raw JSON value it came from.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionRef {
    pub id: i64,
    #[serde(default)]
    pub user_transaction: Option<Vec<i64>>,
}

impl TransactionRef {
    /// Returns the user relation with `from` replaced by `to`, preserving
    /// the order and the other members. `None` when the transaction does
    /// not reference `from` at all.
    pub fn repointed_relation(&self, from: i64, to: i64) -> Option<Vec<i64>> {
        let ids = self.user_transaction.as_ref()?;
        if !ids.contains(&from) {
            return None;
        }
        Some(
            ids.iter()
                .map(|&id| if id == from { to } else { id })
                .collect(),
        )
    }
}
