//! Service-key authentication extractor.
//!
//! The sensitive endpoints (transaction lookup, retirement, bulk email)
//! require the internal service credential in the `X-API-Key` header.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::app::AppState;
use crate::error::ApiError;
use shared::crypto::sha256_hex;

/// Header carrying the internal service credential.
pub const SERVICE_KEY_HEADER: &str = "X-API-Key";

/// Proof that the request carried the configured service key.
///
/// Comparison runs over SHA-256 digests so the configured secret never
/// sits next to request data in a comparison. An empty configured key
/// disables the guarded endpoints rather than opening them.
#[derive(Debug, Clone, Copy)]
pub struct ServiceKey;

impl ServiceKey {
    fn validate(configured: &str, provided: Option<&str>) -> Result<Self, ApiError> {
        if configured.is_empty() {
            return Err(ApiError::ConfigMissing("auth.service_key".to_string()));
        }
        let provided = provided
            .ok_or_else(|| ApiError::Unauthorized("Invalid or missing service key".to_string()))?;
        if sha256_hex(provided) != sha256_hex(configured) {
            return Err(ApiError::Unauthorized(
                "Invalid or missing service key".to_string(),
            ));
        }
        Ok(ServiceKey)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for ServiceKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get(SERVICE_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        Self::validate(&state.config.auth.service_key, provided)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_matching_key() {
        assert!(ServiceKey::validate("secret", Some("secret")).is_ok());
    }

    #[test]
    fn test_validate_rejects_wrong_key() {
        let err = ServiceKey::validate("secret", Some("other")).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn test_validate_rejects_missing_header() {
        let err = ServiceKey::validate("secret", None).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn test_validate_unconfigured_key_is_config_error_not_open_door() {
        let err = ServiceKey::validate("", Some("anything")).unwrap_err();
        assert!(matches!(err, ApiError::ConfigMissing(_)));

        let err = ServiceKey::validate("", None).unwrap_err();
        assert!(matches!(err, ApiError::ConfigMissing(_)));
    }
}
