use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use domain::services::record_store::StoreError;
use shared::dates::DateError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Non-success answer from an upstream API, echoed to the caller.
    #[error("Upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// A required credential is absent from configuration.
    #[error("Missing configuration: {0}")]
    ConfigMissing(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            ApiError::Upstream { status, body } => {
                tracing::error!(upstream_status = status, "Upstream error: {}", body);
                // The upstream status is propagated when it is a valid
                // HTTP status, with its body echoed for diagnosis.
                let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY);
                (status, "upstream_error", self.to_string())
            }
            ApiError::ConfigMissing(msg) => {
                tracing::error!("Missing configuration: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "config_missing",
                    "Service is not configured for this operation".into(),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                )
            }
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::MissingCredential(name) => ApiError::ConfigMissing(name),
            StoreError::Upstream { status, body } => ApiError::Upstream { status, body },
            StoreError::Decode(msg) => ApiError::Internal(format!("Upstream decode: {msg}")),
            StoreError::UnexpectedFormat(msg) => {
                ApiError::Internal(format!("Upstream format: {msg}"))
            }
            StoreError::Transport(msg) => ApiError::Internal(format!("Upstream transport: {msg}")),
        }
    }
}

impl From<domain::services::retirement::RetireError> for ApiError {
    fn from(err: domain::services::retirement::RetireError) -> Self {
        use domain::services::retirement::RetireError;
        match err {
            RetireError::Store(err) => err.into(),
            RetireError::Malformed(id, msg) => {
                ApiError::Internal(format!("User record {id} is malformed: {msg}"))
            }
        }
    }
}

impl From<DateError> for ApiError {
    fn from(err: DateError) -> Self {
        match err {
            DateError::InvalidBoundary { .. } | DateError::InvalidRange { .. } => {
                ApiError::Validation(err.to_string())
            }
            // Record timestamps are swallowed during filtering; one
            // reaching here is a programming error.
            DateError::InvalidTimestamp(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    let message = e.message.clone().map(|m| m.to_string()).unwrap_or_default();
                    format!("{field}: {message}")
                })
            })
            .collect();

        ApiError::Validation(details.join("; "))
    }
}
