//! Domain models for the Loyalty Relay.

pub mod coupon;
pub mod stats;
pub mod transaction;
pub mod user;

pub use stats::StatsSnapshot;
pub use transaction::TransactionRef;
pub use user::UserRecord;
