//! Custom Axum extractors.

pub mod service_key;

pub use service_key::{ServiceKey, SERVICE_KEY_HEADER};
