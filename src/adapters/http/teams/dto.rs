//! Request and response bodies for team and invitation endpoints.

use serde::{Deserialize, Serialize};

use crate::application::handlers::team::{AcceptInvitationResult, CreateTeamResult, InvitationDetails};
use crate::domain::foundation::{InvitationId, MembershipId, TeamId, Timestamp, TransitionOutcome, UserId};
use crate::domain::team::{Invitation, InvitationStatus, Membership, Role};

// ════════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInvitationRequest {
    pub email: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Member
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMemberRoleRequest {
    pub role: Role,
}

// ════════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct MembershipResponse {
    pub id: MembershipId,
    pub team_id: TeamId,
    pub user_id: UserId,
    pub role: Role,
    pub created_at: Timestamp,
}

impl From<Membership> for MembershipResponse {
    fn from(m: Membership) -> Self {
        Self {
            id: m.id,
            team_id: m.team_id,
            user_id: m.user_id,
            role: m.role,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamResponse {
    pub id: TeamId,
    pub name: String,
    pub created_at: Timestamp,
    pub owner: MembershipResponse,
}

impl From<CreateTeamResult> for TeamResponse {
    fn from(result: CreateTeamResult) -> Self {
        Self {
            id: result.team.id,
            name: result.team.name,
            created_at: result.team.created_at,
            owner: result.owner.into(),
        }
    }
}

/// An invitation as seen by team managers. The token is never listed.
#[derive(Debug, Clone, Serialize)]
pub struct InvitationResponse {
    pub id: InvitationId,
    pub team_id: TeamId,
    pub email: String,
    pub role: Role,
    /// Status with expiry applied.
    pub status: InvitationStatus,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

impl InvitationResponse {
    pub fn at(invitation: &Invitation, now: Timestamp) -> Self {
        Self {
            id: invitation.id,
            team_id: invitation.team_id,
            email: invitation.email.as_str().to_string(),
            role: invitation.role,
            status: invitation.effective_status(now),
            expires_at: invitation.expires_at,
            created_at: invitation.created_at,
        }
    }
}

/// Public preview of an invitation, looked up by its token.
#[derive(Debug, Clone, Serialize)]
pub struct InvitationDetailsResponse {
    pub invitation_id: InvitationId,
    pub team_id: TeamId,
    pub team_name: String,
    pub email: String,
    pub role: Role,
    pub status: InvitationStatus,
    pub expires_at: Timestamp,
}

impl From<InvitationDetails> for InvitationDetailsResponse {
    fn from(details: InvitationDetails) -> Self {
        Self {
            invitation_id: details.invitation_id,
            team_id: details.team_id,
            team_name: details.team_name,
            email: details.email.as_str().to_string(),
            role: details.role,
            status: details.status,
            expires_at: details.expires_at,
        }
    }
}

/// Returned once, to the inviter, so the token can be delivered out of band.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedInvitationResponse {
    #[serde(flatten)]
    pub invitation: InvitationResponse,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvitationListResponse {
    pub invitations: Vec<InvitationResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AcceptInvitationResponse {
    pub invitation_id: InvitationId,
    pub team_id: TeamId,
    pub membership: MembershipResponse,
    /// False when an earlier identical request had already accepted it.
    pub changed: bool,
}

impl From<AcceptInvitationResult> for AcceptInvitationResponse {
    fn from(result: AcceptInvitationResult) -> Self {
        Self {
            invitation_id: result.invitation_id,
            team_id: result.team_id,
            membership: result.membership.into(),
            changed: result.outcome.was_applied(),
        }
    }
}

/// Result of a decline or cancel.
#[derive(Debug, Clone, Serialize)]
pub struct InvitationTransitionResponse {
    pub invitation_id: InvitationId,
    pub status: InvitationStatus,
    pub changed: bool,
}

impl InvitationTransitionResponse {
    pub fn new(invitation_id: InvitationId, status: InvitationStatus, outcome: TransitionOutcome) -> Self {
        Self {
            invitation_id,
            status,
            changed: outcome.was_applied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Email, UserId};
    use crate::domain::team::DEFAULT_EXPIRY_DAYS;

    #[test]
    fn role_defaults_to_member() {
        let req: CreateInvitationRequest = serde_json::from_str(r#"{"email":"a@example.com"}"#).unwrap();
        assert_eq!(req.role, Role::Member);
    }

    #[test]
    fn role_change_requires_a_known_role() {
        let req: UpdateMemberRoleRequest = serde_json::from_str(r#"{"role":"admin"}"#).unwrap();
        assert_eq!(req.role, Role::Admin);
        assert!(serde_json::from_str::<UpdateMemberRoleRequest>(r#"{"role":"root"}"#).is_err());
    }

    #[test]
    fn listed_invitation_shows_expiry_and_hides_token() {
        let issued_at = Timestamp::now().minus_days(DEFAULT_EXPIRY_DAYS + 1);
        let invitation = Invitation::issue(
            TeamId::new(),
            UserId::new(),
            Email::new("late@example.com").unwrap(),
            Role::Member,
            issued_at,
            DEFAULT_EXPIRY_DAYS,
        )
        .unwrap();

        let json = serde_json::to_value(InvitationResponse::at(&invitation, Timestamp::now())).unwrap();
        assert_eq!(json["status"], "expired");
        assert!(json.get("token").is_none());
    }
}
