//! State machine trait for status enums.
//!
//! Entity lifecycles (invitations, subscriptions) describe their legal moves
//! once, here, and every write path asks the same question before touching
//! storage.

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// Implementors list their outgoing edges in `valid_transitions`; the other
/// methods derive from it.
///
/// ```ignore
/// impl StateMachine for InvitationStatus {
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             Pending => vec![Accepted, Declined, Cancelled, Expired],
///             _ => vec![],
///         }
///     }
/// }
///
/// let next = InvitationStatus::Pending.transition_to(InvitationStatus::Accepted)?;
/// ```
pub trait StateMachine: Sized + Clone + PartialEq + std::fmt::Debug {
    /// Returns all valid target states from the current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Returns true if the move from self to target is legal.
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    /// Performs the transition, or reports why it is illegal.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// A terminal state has no outgoing transitions.
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
