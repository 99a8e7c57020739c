//! Add-on, checkout and subscription query errors.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, PlanId, UserId, ValidationError};

use super::AddonType;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    #[error("No active subscription for user {0}")]
    NoActiveSubscription(UserId),

    #[error("Add-on not found for this resource")]
    AddonNotFound,

    /// Unknown or retired plan.
    #[error("Plan {0} not found")]
    PlanNotFound(PlanId),

    #[error("A {0} add-on already exists for this resource")]
    AddonExists(AddonType),

    /// The deployment has no provider price configured for this add-on type.
    #[error("No price configured for add-on type {0}")]
    PriceNotConfigured(AddonType),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Billing provider error: {0}")]
    Provider(String),

    /// The provider holds an item this service has no row for.
    #[error("Provider item {remote_item_id} has no local record: {reason}")]
    Unreconciled { remote_item_id: String, reason: String },

    #[error("Temporary failure: {0}")]
    Transient(String),
}

impl BillingError {
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::NoActiveSubscription(_) => ErrorCode::SubscriptionNotFound,
            BillingError::AddonNotFound => ErrorCode::SubscriptionItemNotFound,
            BillingError::PlanNotFound(_) => ErrorCode::PlanNotFound,
            BillingError::AddonExists(_) => ErrorCode::DuplicateSubscriptionItem,
            BillingError::PriceNotConfigured(_) => ErrorCode::InternalError,
            BillingError::Validation(_) => ErrorCode::ValidationFailed,
            BillingError::Provider(_) => ErrorCode::PaymentProviderError,
            BillingError::Unreconciled { .. } => ErrorCode::DataIntegrity,
            BillingError::Transient(_) => ErrorCode::DatabaseError,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, BillingError::Transient(_) | BillingError::Provider(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BillingError::NoActiveSubscription(_)
            | BillingError::AddonNotFound
            | BillingError::PlanNotFound(_) => StatusCode::NOT_FOUND,
            BillingError::AddonExists(_) => StatusCode::CONFLICT,
            BillingError::Validation(_) => StatusCode::BAD_REQUEST,
            BillingError::Provider(_) => StatusCode::BAD_GATEWAY,
            BillingError::PriceNotConfigured(_) | BillingError::Unreconciled { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            BillingError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        BillingError::Validation(err.to_string())
    }
}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::SubscriptionItemNotFound => BillingError::AddonNotFound,
            ErrorCode::ValidationFailed => BillingError::Validation(err.message),
            _ => BillingError::Transient(err.to_string()),
        }
    }
}
