//! ListInvitationsHandler - Query for a team's outstanding invitations.

use std::sync::Arc;

use crate::domain::foundation::{TeamId, Timestamp, UserId};
use crate::domain::team::{Invitation, InvitationError, InvitationStatus};
use crate::ports::TeamStore;

#[derive(Debug, Clone)]
pub struct ListInvitationsQuery {
    pub requestor_id: UserId,
    pub team_id: TeamId,
}

/// Any member may list; expired invitations are left out.
pub struct ListInvitationsHandler {
    store: Arc<dyn TeamStore>,
}

impl ListInvitationsHandler {
    pub fn new(store: Arc<dyn TeamStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, query: ListInvitationsQuery) -> Result<Vec<Invitation>, InvitationError> {
        self.store
            .find_team(&query.team_id)
            .await?
            .ok_or(InvitationError::TeamNotFound(query.team_id))?;

        if self
            .store
            .find_membership(&query.team_id, &query.requestor_id)
            .await?
            .is_none()
        {
            return Err(InvitationError::forbidden("not a member of this team"));
        }

        let now = Timestamp::now();
        let invitations = self
            .store
            .list_pending_invitations(&query.team_id)
            .await?
            .into_iter()
            .filter(|i| i.effective_status(now) == InvitationStatus::Pending)
            .collect();

        Ok(invitations)
    }
}
