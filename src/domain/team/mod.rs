//! Team domain - tenants, memberships and the invitation lifecycle.
//!
//! # Invitation state machine
//!
//! ```text
//!            ┌──► accepted   (invited user)
//!   pending ─┼──► declined   (invited user)
//!            ├──► cancelled  (team owner/admin)
//!            └╌╌► expired    (computed from expires_at, never written here)
//! ```

mod errors;
mod invitation;
mod membership;
mod role;

pub use errors::InvitationError;
pub use invitation::{Invitation, InvitationStatus, InvitationToken, DEFAULT_EXPIRY_DAYS};
pub use membership::{Membership, Team};
pub use role::Role;
