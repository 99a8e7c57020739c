//! GetInvitationDetailsHandler - Public preview of an invitation by its token.

use std::sync::Arc;

use crate::domain::foundation::{Email, InvitationId, TeamId, Timestamp};
use crate::domain::team::{InvitationError, InvitationStatus, InvitationToken, Role};
use crate::ports::TeamStore;

#[derive(Debug, Clone)]
pub struct GetInvitationDetailsQuery {
    pub token: String,
}

/// What the invitation landing page shows before the user signs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationDetails {
    pub invitation_id: InvitationId,
    pub team_id: TeamId,
    pub team_name: String,
    pub email: Email,
    pub role: Role,
    /// Effective status; a pending invitation past its expiry reads `expired`.
    pub status: InvitationStatus,
    pub expires_at: Timestamp,
}

/// Holding the token is the only credential. Invitations in any state are
/// described so the page can say why an old link no longer works.
pub struct GetInvitationDetailsHandler {
    store: Arc<dyn TeamStore>,
}

impl GetInvitationDetailsHandler {
    pub fn new(store: Arc<dyn TeamStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, query: GetInvitationDetailsQuery) -> Result<InvitationDetails, InvitationError> {
        let token = InvitationToken::parse(&query.token).map_err(|_| InvitationError::NotFound)?;

        let invitation = self
            .store
            .find_invitation_by_token(&token)
            .await?
            .ok_or(InvitationError::NotFound)?;
        let team = self
            .store
            .find_team(&invitation.team_id)
            .await?
            .ok_or(InvitationError::TeamNotFound(invitation.team_id))?;

        Ok(InvitationDetails {
            invitation_id: invitation.id,
            team_id: team.id,
            team_name: team.name,
            status: invitation.effective_status(Timestamp::now()),
            email: invitation.email,
            role: invitation.role,
            expires_at: invitation.expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::team::fixtures::team_with_owner;

    fn query(token: &str) -> GetInvitationDetailsQuery {
        GetInvitationDetailsQuery {
            token: token.to_string(),
        }
    }

    #[tokio::test]
    async fn describes_pending_invitation() {
        let fx = team_with_owner().await;
        let invitation = fx.invitation("bob@example.com", Role::Admin);

        let details = GetInvitationDetailsHandler::new(Arc::new(fx.store.clone()))
            .handle(query(invitation.token.as_str()))
            .await
            .unwrap();

        assert_eq!(details.invitation_id, invitation.id);
        assert_eq!(details.team_name, "Acme");
        assert_eq!(details.email.as_str(), "bob@example.com");
        assert_eq!(details.role, Role::Admin);
        assert_eq!(details.status, InvitationStatus::Pending);
    }

    #[tokio::test]
    async fn overdue_invitation_reads_expired() {
        let fx = team_with_owner().await;
        let invitation = fx.invitation_aged("bob@example.com", Role::Member, 8);

        let details = GetInvitationDetailsHandler::new(Arc::new(fx.store.clone()))
            .handle(query(invitation.token.as_str()))
            .await
            .unwrap();

        assert_eq!(details.status, InvitationStatus::Expired);
        assert_eq!(fx.store.invitation(&invitation.id).unwrap().status, InvitationStatus::Pending);
    }

    #[tokio::test]
    async fn answered_invitation_reports_stored_status() {
        let fx = team_with_owner().await;
        let mut invitation = fx.invitation_aged("bob@example.com", Role::Member, 8);
        invitation.status = InvitationStatus::Accepted;
        fx.store.put_invitation(invitation.clone());

        let details = GetInvitationDetailsHandler::new(Arc::new(fx.store.clone()))
            .handle(query(invitation.token.as_str()))
            .await
            .unwrap();

        assert_eq!(details.status, InvitationStatus::Accepted);
    }

    #[tokio::test]
    async fn malformed_and_unknown_tokens_are_not_found() {
        let fx = team_with_owner().await;
        let handler = GetInvitationDetailsHandler::new(Arc::new(fx.store.clone()));

        assert_eq!(handler.handle(query("nope")).await.unwrap_err(), InvitationError::NotFound);
        assert_eq!(
            handler.handle(query(InvitationToken::generate().as_str())).await.unwrap_err(),
            InvitationError::NotFound
        );
    }
}
