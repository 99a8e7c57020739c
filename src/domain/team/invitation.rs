//! Team invitation aggregate and its lifecycle.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{
    AuthenticatedUser, Email, GuardedEntity, InvitationId, StateMachine, TeamId, Timestamp, UserId,
    ValidationError,
};

use super::{InvitationError, Role};

/// Days an invitation stays valid unless configured otherwise.
pub const DEFAULT_EXPIRY_DAYS: i64 = 7;

/// Random bytes in a token (256 bits).
const TOKEN_BYTES: usize = 32;

/// Invitation status.
///
/// `Pending` is the only non-terminal state. `Expired` is reported by
/// [`Invitation::effective_status`] for pending rows past their expiry; it is
/// computed at read time and never written by the accept or decline paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
    Cancelled,
    Expired,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Declined => "declined",
            InvitationStatus::Cancelled => "cancelled",
            InvitationStatus::Expired => "expired",
        }
    }
}

impl StateMachine for InvitationStatus {
    fn valid_transitions(&self) -> Vec<Self> {
        use InvitationStatus::*;
        match self {
            Pending => vec![Accepted, Declined, Cancelled, Expired],
            Accepted | Declined | Cancelled | Expired => vec![],
        }
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvitationStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvitationStatus::Pending),
            "accepted" => Ok(InvitationStatus::Accepted),
            "declined" => Ok(InvitationStatus::Declined),
            "cancelled" => Ok(InvitationStatus::Cancelled),
            "expired" => Ok(InvitationStatus::Expired),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown invitation status '{}'", other),
            )),
        }
    }
}

/// Opaque bearer token delivered in the invitation link.
///
/// 32 bytes from the OS RNG, hex-encoded. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct InvitationToken(String);

impl InvitationToken {
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Parses a token presented by a caller.
    ///
    /// Only the shape is checked; existence is a storage question.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        if raw.len() != TOKEN_BYTES * 2 || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ValidationError::invalid_format("token", "expected 64 hex characters"));
        }
        Ok(Self(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for InvitationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InvitationToken(..)")
    }
}

/// An offer for `email` to join `team_id` with `role`.
///
/// # Invariants
///
/// - `role` is never `Owner`
/// - at most one stored-pending invitation exists per `(team_id, email)`
/// - status only changes through the guarded transition in the handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitation {
    pub id: InvitationId,
    pub team_id: TeamId,
    pub inviter_id: UserId,
    pub email: Email,
    pub role: Role,
    pub token: InvitationToken,
    pub status: InvitationStatus,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Invitation {
    /// Issues a fresh pending invitation with a new token.
    pub fn issue(
        team_id: TeamId,
        inviter_id: UserId,
        email: Email,
        role: Role,
        now: Timestamp,
        expiry_days: i64,
    ) -> Result<Self, ValidationError> {
        let role = role.ensure_grantable()?;
        if expiry_days <= 0 {
            return Err(ValidationError::out_of_range("expiry_days", 1, 365, expiry_days));
        }

        Ok(Self {
            id: InvitationId::new(),
            team_id,
            inviter_id,
            email,
            role,
            token: InvitationToken::generate(),
            status: InvitationStatus::Pending,
            expires_at: now.plus_days(expiry_days),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        now.is_after(&self.expires_at)
    }

    /// Stored status, with pending-but-past-expiry reported as `Expired`.
    pub fn effective_status(&self, now: Timestamp) -> InvitationStatus {
        if self.status == InvitationStatus::Pending && self.is_expired(now) {
            InvitationStatus::Expired
        } else {
            self.status
        }
    }

    /// Preconditions shared by accept and decline, checked in order:
    /// still pending, not expired, addressed to the acting user.
    pub fn ensure_respondable(
        &self,
        acting_user: &AuthenticatedUser,
        now: Timestamp,
    ) -> Result<(), InvitationError> {
        if self.status != InvitationStatus::Pending {
            return Err(InvitationError::Conflict {
                observed: self.status,
            });
        }
        if self.is_expired(now) {
            return Err(InvitationError::Expired(self.id));
        }
        if self.email != acting_user.email {
            return Err(InvitationError::Forbidden(
                "invitation was sent to a different email address".to_string(),
            ));
        }
        Ok(())
    }
}

impl GuardedEntity for Invitation {
    type Key = InvitationId;
    type Status = InvitationStatus;
    const NAME: &'static str = "invitation";
}
