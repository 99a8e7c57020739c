//! Team storage port.
//!
//! Invitation handlers run their whole read-check-write sequence inside one
//! storage transaction obtained from [`TeamStore::begin`]. The transaction is
//! committed explicitly; dropping it without `commit` rolls back.

use async_trait::async_trait;

use crate::domain::foundation::{ConditionalWrite, DomainError, Email, InvitationId, TeamId, UserId};
use crate::domain::team::{Invitation, InvitationToken, Membership, Role, Team};

/// Result of an insert-or-find on a natural key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindOrCreate<T> {
    /// A row already existed; it is returned unchanged.
    Found(T),
    /// This call inserted the row.
    Created(T),
}

impl<T> FindOrCreate<T> {
    pub fn was_created(&self) -> bool {
        matches!(self, FindOrCreate::Created(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            FindOrCreate::Found(t) | FindOrCreate::Created(t) => t,
        }
    }
}

/// Entry point for team persistence.
#[async_trait]
pub trait TeamStore: Send + Sync {
    /// Opens a transaction.
    async fn begin(&self) -> Result<Box<dyn TeamTransaction>, DomainError>;

    async fn find_team(&self, id: &TeamId) -> Result<Option<Team>, DomainError>;

    async fn find_membership(
        &self,
        team_id: &TeamId,
        user_id: &UserId,
    ) -> Result<Option<Membership>, DomainError>;

    /// Stored-pending invitations for a team, newest first.
    ///
    /// Expiry is not applied here; callers filter with `effective_status`.
    async fn list_pending_invitations(&self, team_id: &TeamId) -> Result<Vec<Invitation>, DomainError>;

    /// Read-only token lookup for the public invitation preview.
    async fn find_invitation_by_token(
        &self,
        token: &InvitationToken,
    ) -> Result<Option<Invitation>, DomainError>;
}

/// Operations available inside a team transaction.
///
/// The `ConditionalWrite<Invitation>` supertrait is what the transition guard
/// uses for every invitation status change.
#[async_trait]
pub trait TeamTransaction: ConditionalWrite<Invitation> + Send {
    async fn insert_team(&mut self, team: &Team) -> Result<(), DomainError>;

    /// Plain insert; `DuplicateMembership` if `(user_id, team_id)` exists.
    async fn insert_membership(&mut self, membership: &Membership) -> Result<(), DomainError>;

    /// Inserts `membership` unless a row for its `(user_id, team_id)` exists,
    /// in which case the existing row is returned untouched.
    async fn find_or_create_membership(
        &mut self,
        membership: &Membership,
    ) -> Result<FindOrCreate<Membership>, DomainError>;

    async fn find_membership(
        &mut self,
        team_id: &TeamId,
        user_id: &UserId,
    ) -> Result<Option<Membership>, DomainError>;

    /// Sets the role of a non-owner membership. Returns rows changed; an
    /// owner row or a missing row yields 0.
    async fn update_member_role(
        &mut self,
        team_id: &TeamId,
        user_id: &UserId,
        role: Role,
    ) -> Result<u64, DomainError>;

    /// Deletes a non-owner membership. Returns rows deleted; the owner row
    /// is never removed.
    async fn remove_member(&mut self, team_id: &TeamId, user_id: &UserId) -> Result<u64, DomainError>;

    /// Whether a user with this email already belongs to the team.
    async fn has_member_with_email(&mut self, team_id: &TeamId, email: &Email) -> Result<bool, DomainError>;

    async fn find_invitation_by_token(
        &mut self,
        token: &InvitationToken,
    ) -> Result<Option<Invitation>, DomainError>;

    /// Looks up an invitation scoped to a team; other teams' ids are not found.
    async fn find_invitation(
        &mut self,
        team_id: &TeamId,
        id: &InvitationId,
    ) -> Result<Option<Invitation>, DomainError>;

    async fn find_pending_invitation(
        &mut self,
        team_id: &TeamId,
        email: &Email,
    ) -> Result<Option<Invitation>, DomainError>;

    /// `DuplicateInvitation` if a pending invitation for `(team_id, email)` exists.
    async fn insert_invitation(&mut self, invitation: &Invitation) -> Result<(), DomainError>;

    async fn commit(self: Box<Self>) -> Result<(), DomainError>;
}
