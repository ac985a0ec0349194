//! Cryptographic utilities for credential comparison.

use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input and returns it as a hex string.
///
/// Service keys are compared by digest rather than raw value so the
/// configured secret never sits next to request data in a comparison.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
