//! DeclineInvitationHandler - The invited user turns an invitation down.

use std::sync::Arc;

use crate::domain::foundation::{
    attempt_transition, AuthenticatedUser, InvitationId, Timestamp, TransitionOutcome,
};
use crate::domain::team::{Invitation, InvitationError, InvitationStatus, InvitationToken};
use crate::ports::TeamStore;

#[derive(Debug, Clone)]
pub struct DeclineInvitationCommand {
    pub token: String,
    pub user: AuthenticatedUser,
}

#[derive(Debug, Clone)]
pub struct DeclineInvitationResult {
    pub invitation_id: InvitationId,
    pub outcome: TransitionOutcome,
}

/// Same preconditions as accept; moves `pending -> declined`.
pub struct DeclineInvitationHandler {
    store: Arc<dyn TeamStore>,
}

impl DeclineInvitationHandler {
    pub fn new(store: Arc<dyn TeamStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        cmd: DeclineInvitationCommand,
    ) -> Result<DeclineInvitationResult, InvitationError> {
        let token = InvitationToken::parse(&cmd.token).map_err(|_| InvitationError::NotFound)?;
        let now = Timestamp::now();

        let mut tx = self.store.begin().await?;

        let invitation = tx
            .find_invitation_by_token(&token)
            .await?
            .ok_or(InvitationError::NotFound)?;

        if let Err(err) = invitation.ensure_respondable(&cmd.user, now) {
            tracing::warn!(invitation_id = %invitation.id, user_id = %cmd.user.id, error = %err, "decline rejected");
            return Err(err);
        }

        let outcome = attempt_transition::<Invitation, _>(
            tx.as_mut(),
            &invitation.id,
            InvitationStatus::Pending,
            InvitationStatus::Declined,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(invitation_id = %invitation.id, user_id = %cmd.user.id, "invitation declined");

        Ok(DeclineInvitationResult {
            invitation_id: invitation.id,
            outcome,
        })
    }
}
