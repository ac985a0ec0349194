//! Domain layer for the Loyalty Relay backend.
//!
//! This crate contains:
//! - Record vocabularies for the store collections (transactions, users, coupons, statistics)
//! - The record-store abstraction and its in-memory test double
//! - Business logic services (filtering, enrichment, tabular export, retirement, bulk mail)

pub mod models;
pub mod services;
