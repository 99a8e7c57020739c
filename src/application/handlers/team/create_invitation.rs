//! CreateInvitationHandler - Issues a pending invitation to join a team.

use std::sync::Arc;

use crate::domain::foundation::{
    attempt_transition, Email, TeamId, Timestamp, UserId,
};
use crate::domain::team::{Invitation, InvitationError, InvitationStatus, Role};
use crate::ports::TeamStore;

#[derive(Debug, Clone)]
pub struct CreateInvitationCommand {
    pub inviter_id: UserId,
    pub team_id: TeamId,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct CreateInvitationResult {
    pub invitation: Invitation,
}

/// Handler for creating invitations.
///
/// Only owners and admins may invite, and only to the `admin` or `member`
/// role. A stale pending invitation for the same address (past its expiry)
/// is cancelled so a fresh one can be issued.
pub struct CreateInvitationHandler {
    store: Arc<dyn TeamStore>,
    expiry_days: i64,
}

impl CreateInvitationHandler {
    pub fn new(store: Arc<dyn TeamStore>, expiry_days: i64) -> Self {
        Self { store, expiry_days }
    }

    pub async fn handle(
        &self,
        cmd: CreateInvitationCommand,
    ) -> Result<CreateInvitationResult, InvitationError> {
        let email = Email::new(&cmd.email)?;
        let role = cmd
            .role
            .ensure_grantable()
            .map_err(|_| InvitationError::InvalidRole(cmd.role))?;
        let now = Timestamp::now();

        self.store
            .find_team(&cmd.team_id)
            .await?
            .ok_or(InvitationError::TeamNotFound(cmd.team_id))?;

        let mut tx = self.store.begin().await?;

        let inviter = tx.find_membership(&cmd.team_id, &cmd.inviter_id).await?;
        if !inviter.map_or(false, |m| m.can_manage_invitations()) {
            tracing::warn!(team_id = %cmd.team_id, inviter_id = %cmd.inviter_id, "invitation rejected: inviter lacks permission");
            return Err(InvitationError::forbidden("only team owners and admins can invite"));
        }

        if tx.has_member_with_email(&cmd.team_id, &email).await? {
            return Err(InvitationError::AlreadyMember);
        }

        if let Some(existing) = tx.find_pending_invitation(&cmd.team_id, &email).await? {
            if !existing.is_expired(now) {
                return Err(InvitationError::AlreadyPending);
            }
            attempt_transition::<Invitation, _>(
                tx.as_mut(),
                &existing.id,
                InvitationStatus::Pending,
                InvitationStatus::Cancelled,
            )
            .await?;
            tracing::debug!(invitation_id = %existing.id, "stale pending invitation cancelled before re-invite");
        }

        let invitation = Invitation::issue(cmd.team_id, cmd.inviter_id, email, role, now, self.expiry_days)?;
        tx.insert_invitation(&invitation).await?;
        tx.commit().await?;

        tracing::info!(
            invitation_id = %invitation.id,
            team_id = %invitation.team_id,
            role = %invitation.role,
            "invitation created"
        );

        Ok(CreateInvitationResult { invitation })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::team::fixtures::{team_with_owner, TeamFixture};
    use crate::domain::team::DEFAULT_EXPIRY_DAYS;

    fn handler(fx: &TeamFixture) -> CreateInvitationHandler {
        CreateInvitationHandler::new(Arc::new(fx.store.clone()), DEFAULT_EXPIRY_DAYS)
    }

    fn command(fx: &TeamFixture, inviter: UserId, email: &str, role: Role) -> CreateInvitationCommand {
        CreateInvitationCommand {
            inviter_id: inviter,
            team_id: fx.team.id,
            email: email.to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn owner_invites_member() {
        let fx = team_with_owner().await;

        let result = handler(&fx)
            .handle(command(&fx, fx.owner.id, "New@Example.com", Role::Member))
            .await
            .unwrap();

        let invitation = result.invitation;
        assert_eq!(invitation.email.as_str(), "new@example.com");
        assert_eq!(invitation.status, InvitationStatus::Pending);
        assert_eq!(invitation.token.as_str().len(), 64);
        assert_eq!(
            invitation.expires_at,
            invitation.created_at.plus_days(DEFAULT_EXPIRY_DAYS)
        );
        assert!(fx.store.invitation(&invitation.id).is_some());
    }

    #[tokio::test]
    async fn admin_may_invite() {
        let fx = team_with_owner().await;
        let admin = fx.add_member("admin@example.com", Role::Admin).await;

        let result = handler(&fx)
            .handle(command(&fx, admin.id, "x@example.com", Role::Admin))
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn plain_member_is_forbidden() {
        let fx = team_with_owner().await;
        let member = fx.add_member("m@example.com", Role::Member).await;

        let err = handler(&fx)
            .handle(command(&fx, member.id, "x@example.com", Role::Member))
            .await
            .unwrap_err();

        assert!(matches!(err, InvitationError::Forbidden(_)));
    }

    #[tokio::test]
    async fn outsider_is_forbidden() {
        let fx = team_with_owner().await;

        let err = handler(&fx)
            .handle(command(&fx, UserId::new(), "x@example.com", Role::Member))
            .await
            .unwrap_err();

        assert!(matches!(err, InvitationError::Forbidden(_)));
    }

    #[tokio::test]
    async fn owner_role_cannot_be_offered() {
        let fx = team_with_owner().await;

        let err = handler(&fx)
            .handle(command(&fx, fx.owner.id, "x@example.com", Role::Owner))
            .await
            .unwrap_err();

        assert_eq!(err, InvitationError::InvalidRole(Role::Owner));
    }

    #[tokio::test]
    async fn duplicate_pending_invitation_conflicts() {
        let fx = team_with_owner().await;
        fx.invitation("dup@example.com", Role::Member);

        let err = handler(&fx)
            .handle(command(&fx, fx.owner.id, "DUP@example.com", Role::Member))
            .await
            .unwrap_err();

        assert_eq!(err, InvitationError::AlreadyPending);
    }

    #[tokio::test]
    async fn existing_member_conflicts() {
        let fx = team_with_owner().await;
        fx.add_member("taken@example.com", Role::Member).await;

        let err = handler(&fx)
            .handle(command(&fx, fx.owner.id, "taken@example.com", Role::Member))
            .await
            .unwrap_err();

        assert_eq!(err, InvitationError::AlreadyMember);
    }

    #[tokio::test]
    async fn stale_invitation_is_replaced() {
        let fx = team_with_owner().await;
        let stale = fx.invitation_aged("late@example.com", Role::Member, 10);

        let fresh = handler(&fx)
            .handle(command(&fx, fx.owner.id, "late@example.com", Role::Member))
            .await
            .unwrap()
            .invitation;

        assert_ne!(fresh.id, stale.id);
        assert_eq!(fx.store.invitation(&stale.id).unwrap().status, InvitationStatus::Cancelled);
    }

    #[tokio::test]
    async fn unknown_team_is_not_found() {
        let fx = team_with_owner().await;
        let mut cmd = command(&fx, fx.owner.id, "x@example.com", Role::Member);
        cmd.team_id = TeamId::new();

        let err = handler(&fx).handle(cmd).await.unwrap_err();

        assert!(matches!(err, InvitationError::TeamNotFound(_)));
    }
}
