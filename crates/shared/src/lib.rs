//! Shared utilities and common types for the Loyalty Relay backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Date boundary parsing and time-window arithmetic
//! - Cryptographic utilities (hashing for credential comparison)

pub mod crypto;
pub mod dates;
