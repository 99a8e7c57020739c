//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, errors, the state machine trait and
//! the conditional transition guard shared by the team and billing domains.

mod auth;
mod email;
mod errors;
mod guard;
mod ids;
mod state_machine;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser};
pub use email::Email;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use guard::{attempt_transition, ConditionalWrite, GuardError, GuardedEntity, TransitionOutcome};
pub use ids::{InvitationId, MembershipId, PlanId, SubscriptionId, SubscriptionItemId, TeamId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
