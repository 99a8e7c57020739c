//! Invitation lifecycle and membership error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotFound | 404 |
//! | TeamNotFound | 404 |
//! | MemberNotFound | 404 |
//! | Expired | 410 |
//! | Conflict | 409 |
//! | AlreadyPending | 409 |
//! | AlreadyMember | 409 |
//! | Forbidden | 403 |
//! | InvalidRole | 400 |
//! | OwnerProtected | 400 |
//! | Validation | 400 |
//! | Transient | 503 |

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, GuardError, InvitationId, TeamId, ValidationError};

use super::{InvitationStatus, Role};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvitationError {
    #[error("Invitation not found")]
    NotFound,

    #[error("Team {0} not found")]
    TeamNotFound(TeamId),

    #[error("User is not a member of this team")]
    MemberNotFound,

    #[error("Invitation {0} has expired")]
    Expired(InvitationId),

    /// The invitation is no longer pending; carries what was actually stored.
    #[error("Invitation is already {observed}")]
    Conflict { observed: InvitationStatus },

    #[error("A pending invitation already exists for this email")]
    AlreadyPending,

    #[error("User is already a member of this team")]
    AlreadyMember,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Invitations and role changes may grant admin or member, never owner.
    #[error("Role {0} cannot be granted")]
    InvalidRole(Role),

    /// The owner membership cannot be removed or have its role changed.
    #[error("The team owner cannot be {0}")]
    OwnerProtected(&'static str),

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Storage or transaction failure; safe to retry.
    #[error("Temporary failure: {0}")]
    Transient(String),
}

impl InvitationError {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        InvitationError::Forbidden(reason.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            InvitationError::NotFound => ErrorCode::InvitationNotFound,
            InvitationError::TeamNotFound(_) => ErrorCode::TeamNotFound,
            InvitationError::MemberNotFound => ErrorCode::MembershipNotFound,
            InvitationError::Expired(_) => ErrorCode::InvitationExpired,
            InvitationError::Conflict { .. } => ErrorCode::Conflict,
            InvitationError::AlreadyPending => ErrorCode::DuplicateInvitation,
            InvitationError::AlreadyMember => ErrorCode::DuplicateMembership,
            InvitationError::Forbidden(_) => ErrorCode::Forbidden,
            InvitationError::InvalidRole(_)
            | InvitationError::OwnerProtected(_)
            | InvitationError::Validation(_) => ErrorCode::ValidationFailed,
            InvitationError::Transient(_) => ErrorCode::DatabaseError,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, InvitationError::Transient(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            InvitationError::NotFound
            | InvitationError::TeamNotFound(_)
            | InvitationError::MemberNotFound => StatusCode::NOT_FOUND,
            InvitationError::Expired(_) => StatusCode::GONE,
            InvitationError::Conflict { .. }
            | InvitationError::AlreadyPending
            | InvitationError::AlreadyMember => StatusCode::CONFLICT,
            InvitationError::Forbidden(_) => StatusCode::FORBIDDEN,
            InvitationError::InvalidRole(_)
            | InvitationError::OwnerProtected(_)
            | InvitationError::Validation(_) => StatusCode::BAD_REQUEST,
            InvitationError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<ValidationError> for InvitationError {
    fn from(err: ValidationError) -> Self {
        InvitationError::Validation(err.to_string())
    }
}

impl From<DomainError> for InvitationError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::InvitationNotFound => InvitationError::NotFound,
            ErrorCode::DuplicateInvitation => InvitationError::AlreadyPending,
            ErrorCode::DuplicateMembership => InvitationError::AlreadyMember,
            ErrorCode::ValidationFailed => InvitationError::Validation(err.message),
            ErrorCode::Forbidden => InvitationError::Forbidden(err.message),
            _ => InvitationError::Transient(err.to_string()),
        }
    }
}

impl From<GuardError<InvitationStatus>> for InvitationError {
    fn from(err: GuardError<InvitationStatus>) -> Self {
        match err {
            GuardError::Conflict { observed, .. } => InvitationError::Conflict { observed },
            GuardError::NotFound { .. } => InvitationError::NotFound,
            GuardError::InvalidTransition { from, .. } => InvitationError::Conflict { observed: from },
            GuardError::Storage(e) => e.into(),
        }
    }
}
