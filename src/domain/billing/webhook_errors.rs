//! Webhook error types.
//!
//! The HTTP status decides whether the provider redelivers: 2xx is
//! acknowledged, 4xx is treated as a permanent rejection of that delivery,
//! 5xx enters the provider's retry schedule.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    /// HMAC did not match the shared secret.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signed too long ago (replay window exceeded).
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Signed in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Payload or signature header could not be parsed.
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// A referenced entity (plan, user) cannot be resolved.
    #[error("Data integrity: {0}")]
    DataIntegrity(String),

    /// The billing provider API failed while fetching detail.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Storage or transaction failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// True for the signature family of failures.
    pub fn is_unverified(&self) -> bool {
        matches!(
            self,
            WebhookError::InvalidSignature
                | WebhookError::TimestampOutOfRange
                | WebhookError::InvalidTimestamp
        )
    }

    /// Returns true if a redelivery could succeed without anyone intervening.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Database(_) | WebhookError::Provider(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp
            | WebhookError::ParseError(_)
            | WebhookError::MissingField(_) => StatusCode::BAD_REQUEST,

            // Loud, and retried by the provider until the plan catalog is fixed.
            WebhookError::DataIntegrity(_)
            | WebhookError::Provider(_)
            | WebhookError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::DataIntegrity | ErrorCode::PlanNotFound | ErrorCode::UserNotFound => {
                WebhookError::DataIntegrity(err.to_string())
            }
            _ => WebhookError::Database(err.to_string()),
        }
    }
}
