//! HTTP adapter for teams and invitations.
//!
//! - `POST /api/teams` - Create a team owned by the caller
//! - `GET /api/teams/:team_id/invitations` - List pending invitations
//! - `POST /api/teams/:team_id/invitations` - Invite an email address
//! - `DELETE /api/teams/:team_id/invitations/:invitation_id` - Cancel an invitation
//! - `PATCH /api/teams/:team_id/members/:user_id` - Change a member's role
//! - `DELETE /api/teams/:team_id/members/:user_id` - Remove a member
//! - `GET /api/invitations/:token` - Public invitation preview
//! - `POST /api/invitations/:token/accept` - Accept as the invited user
//! - `POST /api/invitations/:token/decline` - Decline as the invited user

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::TeamsAppState;
pub use routes::{invitation_preview_routes, teams_router};
