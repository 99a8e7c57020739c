//! Axum routes for teams and invitations.

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::handlers::{
    accept_invitation, cancel_invitation, create_invitation, create_team, decline_invitation,
    get_invitation_details, list_invitations, remove_member, update_member_role, TeamsAppState,
};

/// Team management routes.
///
/// - `POST /teams`
/// - `GET /teams/:team_id/invitations`
/// - `POST /teams/:team_id/invitations`
/// - `DELETE /teams/:team_id/invitations/:invitation_id`
/// - `PATCH /teams/:team_id/members/:user_id`
/// - `DELETE /teams/:team_id/members/:user_id`
pub fn team_routes() -> Router<TeamsAppState> {
    Router::new()
        .route("/teams", post(create_team))
        .route(
            "/teams/:team_id/invitations",
            get(list_invitations).post(create_invitation),
        )
        .route("/teams/:team_id/invitations/:invitation_id", delete(cancel_invitation))
        .route(
            "/teams/:team_id/members/:user_id",
            delete(remove_member).patch(update_member_role),
        )
}

/// Routes used by the invited user, addressed by token.
pub fn invitation_routes() -> Router<TeamsAppState> {
    Router::new()
        .route("/invitations/:token/accept", post(accept_invitation))
        .route("/invitations/:token/decline", post(decline_invitation))
}

/// Token-addressed preview; mounted outside the auth layer.
pub fn invitation_preview_routes() -> Router<TeamsAppState> {
    Router::new().route("/invitations/:token", get(get_invitation_details))
}

/// All authenticated team endpoints, ready to be nested under `/api`.
pub fn teams_router() -> Router<TeamsAppState> {
    team_routes().merge(invitation_routes())
}
