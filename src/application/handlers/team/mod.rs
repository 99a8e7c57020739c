//! Team and invitation handlers.
//!
//! ## Commands
//! - Creating a team with its owner
//! - Creating, accepting, declining and cancelling invitations
//! - Removing members and changing their roles
//!
//! ## Queries
//! - Listing a team's pending invitations
//! - Previewing an invitation by token
//!
//! Every command runs inside one `TeamTransaction`. Invitation status changes
//! go through `attempt_transition`, so racing callers are settled by the
//! conditional write rather than by the precondition checks. Member writes
//! never match the owner row.

mod accept_invitation;
mod cancel_invitation;
mod create_invitation;
mod create_team;
mod decline_invitation;
mod get_invitation_details;
mod list_invitations;
mod remove_member;
mod update_member_role;

// Commands
pub use accept_invitation::{AcceptInvitationCommand, AcceptInvitationHandler, AcceptInvitationResult};
pub use cancel_invitation::{CancelInvitationCommand, CancelInvitationHandler, CancelInvitationResult};
pub use create_invitation::{CreateInvitationCommand, CreateInvitationHandler, CreateInvitationResult};
pub use create_team::{CreateTeamCommand, CreateTeamHandler, CreateTeamResult};
pub use decline_invitation::{DeclineInvitationCommand, DeclineInvitationHandler, DeclineInvitationResult};
pub use remove_member::{RemoveMemberCommand, RemoveMemberHandler};
pub use update_member_role::{UpdateMemberRoleCommand, UpdateMemberRoleHandler};

// Queries
pub use get_invitation_details::{GetInvitationDetailsHandler, GetInvitationDetailsQuery, InvitationDetails};
pub use list_invitations::{ListInvitationsHandler, ListInvitationsQuery};
