//! HTTP handlers for team and invitation endpoints.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::adapters::http::error::ApiError;
use crate::adapters::http::middleware::RequireAuth;
use crate::application::handlers::team::{
    AcceptInvitationCommand, AcceptInvitationHandler, CancelInvitationCommand, CancelInvitationHandler,
    CreateInvitationCommand, CreateInvitationHandler, CreateTeamCommand, CreateTeamHandler,
    DeclineInvitationCommand, DeclineInvitationHandler, GetInvitationDetailsHandler,
    GetInvitationDetailsQuery, ListInvitationsHandler, ListInvitationsQuery, RemoveMemberCommand,
    RemoveMemberHandler, UpdateMemberRoleCommand, UpdateMemberRoleHandler,
};
use crate::domain::foundation::{InvitationId, TeamId, Timestamp, UserId};
use crate::domain::team::InvitationStatus;
use crate::ports::TeamStore;

use super::dto::{
    AcceptInvitationResponse, CreateInvitationRequest, CreateTeamRequest, CreatedInvitationResponse,
    InvitationDetailsResponse, InvitationListResponse, InvitationResponse, InvitationTransitionResponse,
    MembershipResponse, TeamResponse, UpdateMemberRoleRequest,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Dependencies shared by the team endpoints. Handlers are built per request.
#[derive(Clone)]
pub struct TeamsAppState {
    pub store: Arc<dyn TeamStore>,
    pub invitation_expiry_days: i64,
}

impl TeamsAppState {
    pub fn new(store: Arc<dyn TeamStore>, invitation_expiry_days: i64) -> Self {
        Self {
            store,
            invitation_expiry_days,
        }
    }

    pub fn create_team_handler(&self) -> CreateTeamHandler {
        CreateTeamHandler::new(self.store.clone())
    }

    pub fn create_invitation_handler(&self) -> CreateInvitationHandler {
        CreateInvitationHandler::new(self.store.clone(), self.invitation_expiry_days)
    }

    pub fn accept_invitation_handler(&self) -> AcceptInvitationHandler {
        AcceptInvitationHandler::new(self.store.clone())
    }

    pub fn decline_invitation_handler(&self) -> DeclineInvitationHandler {
        DeclineInvitationHandler::new(self.store.clone())
    }

    pub fn cancel_invitation_handler(&self) -> CancelInvitationHandler {
        CancelInvitationHandler::new(self.store.clone())
    }

    pub fn list_invitations_handler(&self) -> ListInvitationsHandler {
        ListInvitationsHandler::new(self.store.clone())
    }

    pub fn invitation_details_handler(&self) -> GetInvitationDetailsHandler {
        GetInvitationDetailsHandler::new(self.store.clone())
    }

    pub fn remove_member_handler(&self) -> RemoveMemberHandler {
        RemoveMemberHandler::new(self.store.clone())
    }

    pub fn update_member_role_handler(&self) -> UpdateMemberRoleHandler {
        UpdateMemberRoleHandler::new(self.store.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Teams
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/teams
pub async fn create_team(
    State(state): State<TeamsAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<CreateTeamRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .create_team_handler()
        .handle(CreateTeamCommand {
            owner_id: user.id,
            name: request.name,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(TeamResponse::from(result))))
}

// ════════════════════════════════════════════════════════════════════════════════
// Members
// ════════════════════════════════════════════════════════════════════════════════

/// PATCH /api/teams/:team_id/members/:user_id
pub async fn update_member_role(
    State(state): State<TeamsAppState>,
    RequireAuth(user): RequireAuth,
    Path((team_id, user_id)): Path<(TeamId, UserId)>,
    Json(request): Json<UpdateMemberRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let membership = state
        .update_member_role_handler()
        .handle(UpdateMemberRoleCommand {
            requestor_id: user.id,
            team_id,
            user_id,
            role: request.role,
        })
        .await?;

    Ok(Json(MembershipResponse::from(membership)))
}

/// DELETE /api/teams/:team_id/members/:user_id
pub async fn remove_member(
    State(state): State<TeamsAppState>,
    RequireAuth(user): RequireAuth,
    Path((team_id, user_id)): Path<(TeamId, UserId)>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .remove_member_handler()
        .handle(RemoveMemberCommand {
            requestor_id: user.id,
            team_id,
            user_id,
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// ════════════════════════════════════════════════════════════════════════════════
// Invitations (team side)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/teams/:team_id/invitations
pub async fn list_invitations(
    State(state): State<TeamsAppState>,
    RequireAuth(user): RequireAuth,
    Path(team_id): Path<TeamId>,
) -> Result<impl IntoResponse, ApiError> {
    let invitations = state
        .list_invitations_handler()
        .handle(ListInvitationsQuery {
            requestor_id: user.id,
            team_id,
        })
        .await?;

    let now = Timestamp::now();
    Ok(Json(InvitationListResponse {
        invitations: invitations
            .iter()
            .map(|invitation| InvitationResponse::at(invitation, now))
            .collect(),
    }))
}

/// POST /api/teams/:team_id/invitations
pub async fn create_invitation(
    State(state): State<TeamsAppState>,
    RequireAuth(user): RequireAuth,
    Path(team_id): Path<TeamId>,
    Json(request): Json<CreateInvitationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .create_invitation_handler()
        .handle(CreateInvitationCommand {
            inviter_id: user.id,
            team_id,
            email: request.email,
            role: request.role,
        })
        .await?;

    let invitation = result.invitation;
    let response = CreatedInvitationResponse {
        invitation: InvitationResponse::at(&invitation, Timestamp::now()),
        token: invitation.token.as_str().to_string(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// DELETE /api/teams/:team_id/invitations/:invitation_id
pub async fn cancel_invitation(
    State(state): State<TeamsAppState>,
    RequireAuth(user): RequireAuth,
    Path((team_id, invitation_id)): Path<(TeamId, InvitationId)>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .cancel_invitation_handler()
        .handle(CancelInvitationCommand {
            requestor_id: user.id,
            team_id,
            invitation_id,
        })
        .await?;

    Ok(Json(InvitationTransitionResponse::new(
        result.invitation_id,
        InvitationStatus::Cancelled,
        result.outcome,
    )))
}

// ════════════════════════════════════════════════════════════════════════════════
// Invitations (invitee side)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/invitations/:token
///
/// Public: the token in the link is the credential.
pub async fn get_invitation_details(
    State(state): State<TeamsAppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let details = state
        .invitation_details_handler()
        .handle(GetInvitationDetailsQuery { token })
        .await?;

    Ok(Json(InvitationDetailsResponse::from(details)))
}

/// POST /api/invitations/:token/accept
pub async fn accept_invitation(
    State(state): State<TeamsAppState>,
    RequireAuth(user): RequireAuth,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .accept_invitation_handler()
        .handle(AcceptInvitationCommand { token, user })
        .await?;

    Ok(Json(AcceptInvitationResponse::from(result)))
}

/// POST /api/invitations/:token/decline
pub async fn decline_invitation(
    State(state): State<TeamsAppState>,
    RequireAuth(user): RequireAuth,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .decline_invitation_handler()
        .handle(DeclineInvitationCommand { token, user })
        .await?;

    Ok(Json(InvitationTransitionResponse::new(
        result.invitation_id,
        InvitationStatus::Declined,
        result.outcome,
    )))
}
