//! AcceptInvitationHandler - Joins the acting user to the inviting team.

use std::sync::Arc;

use crate::domain::foundation::{
    attempt_transition, AuthenticatedUser, InvitationId, TeamId, Timestamp, TransitionOutcome,
};
use crate::domain::team::{Invitation, InvitationError, InvitationStatus, InvitationToken, Membership};
use crate::ports::TeamStore;

#[derive(Debug, Clone)]
pub struct AcceptInvitationCommand {
    pub token: String,
    pub user: AuthenticatedUser,
}

#[derive(Debug, Clone)]
pub struct AcceptInvitationResult {
    pub invitation_id: InvitationId,
    pub team_id: TeamId,
    pub membership: Membership,

    /// `AlreadySatisfied` when a concurrent accept won the transition.
    pub outcome: TransitionOutcome,
}

/// Handler for accepting invitations.
///
/// In one transaction: look up by token, check the invitation is pending,
/// unexpired and addressed to the acting user, insert-or-find the membership,
/// then move the invitation `pending -> accepted` through the guard. An
/// expired invitation is reported but left as stored.
pub struct AcceptInvitationHandler {
    store: Arc<dyn TeamStore>,
}

impl AcceptInvitationHandler {
    pub fn new(store: Arc<dyn TeamStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        cmd: AcceptInvitationCommand,
    ) -> Result<AcceptInvitationResult, InvitationError> {
        // A malformed token cannot match any row.
        let token = InvitationToken::parse(&cmd.token).map_err(|_| InvitationError::NotFound)?;
        let now = Timestamp::now();

        let mut tx = self.store.begin().await?;

        let invitation = tx
            .find_invitation_by_token(&token)
            .await?
            .ok_or(InvitationError::NotFound)?;

        if let Err(err) = invitation.ensure_respondable(&cmd.user, now) {
            tracing::warn!(invitation_id = %invitation.id, user_id = %cmd.user.id, error = %err, "accept rejected");
            return Err(err);
        }

        let membership = tx
            .find_or_create_membership(&Membership::invited(
                cmd.user.id,
                invitation.team_id,
                invitation.role,
                now,
            ))
            .await?
            .into_inner();

        let outcome = attempt_transition::<Invitation, _>(
            tx.as_mut(),
            &invitation.id,
            InvitationStatus::Pending,
            InvitationStatus::Accepted,
        )
        .await
        .map_err(|err| {
            tracing::warn!(invitation_id = %invitation.id, error = %err, "accept lost transition race");
            InvitationError::from(err)
        })?;

        tx.commit().await?;

        tracing::info!(
            invitation_id = %invitation.id,
            team_id = %invitation.team_id,
            user_id = %cmd.user.id,
            applied = outcome.was_applied(),
            "invitation accepted"
        );

        Ok(AcceptInvitationResult {
            invitation_id: invitation.id,
            team_id: invitation.team_id,
            membership,
            outcome,
        })
    }
}
