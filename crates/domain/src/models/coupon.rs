//! Coupon record field names, consumed by the coupon-name enrichment.

/// Field names used by the coupons collection.
pub const ID_FIELD: &str = "id";
pub const NAME_FIELD: &str = "name";
