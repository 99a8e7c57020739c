//! CancelInvitationHandler - A team owner or admin withdraws an invitation.

use std::sync::Arc;

use crate::domain::foundation::{attempt_transition, InvitationId, TeamId, TransitionOutcome, UserId};
use crate::domain::team::{Invitation, InvitationError, InvitationStatus};
use crate::ports::TeamStore;

#[derive(Debug, Clone)]
pub struct CancelInvitationCommand {
    pub requestor_id: UserId,
    pub team_id: TeamId,
    pub invitation_id: InvitationId,
}

#[derive(Debug, Clone)]
pub struct CancelInvitationResult {
    pub invitation_id: InvitationId,
    pub outcome: TransitionOutcome,
}

/// Moves a stored-pending invitation to `cancelled`.
///
/// Expiry is not checked: an invitation past its expiry is still pending in
/// storage and may be withdrawn.
pub struct CancelInvitationHandler {
    store: Arc<dyn TeamStore>,
}

impl CancelInvitationHandler {
    pub fn new(store: Arc<dyn TeamStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        cmd: CancelInvitationCommand,
    ) -> Result<CancelInvitationResult, InvitationError> {
        let mut tx = self.store.begin().await?;

        let requestor = tx.find_membership(&cmd.team_id, &cmd.requestor_id).await?;
        if !requestor.map_or(false, |m| m.can_manage_invitations()) {
            tracing::warn!(team_id = %cmd.team_id, requestor_id = %cmd.requestor_id, "cancel rejected: requestor lacks permission");
            return Err(InvitationError::forbidden("only team owners and admins can cancel invitations"));
        }

        let invitation = tx
            .find_invitation(&cmd.team_id, &cmd.invitation_id)
            .await?
            .ok_or(InvitationError::NotFound)?;

        if invitation.status != InvitationStatus::Pending {
            return Err(InvitationError::Conflict {
                observed: invitation.status,
            });
        }

        let outcome = attempt_transition::<Invitation, _>(
            tx.as_mut(),
            &invitation.id,
            InvitationStatus::Pending,
            InvitationStatus::Cancelled,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(invitation_id = %invitation.id, team_id = %cmd.team_id, "invitation cancelled");

        Ok(CancelInvitationResult {
            invitation_id: invitation.id,
            outcome,
        })
    }
}
