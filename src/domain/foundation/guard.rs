//! Conditional state transitions with re-read classification.
//!
//! Every status change that can race with another external trigger goes
//! through [`attempt_transition`]:
//!
//! 1. `UPDATE ... SET status = target WHERE key = $1 AND status = expected`
//! 2. one row changed: the caller's transition happened ([`TransitionOutcome::Applied`])
//! 3. zero rows changed: re-read the row inside the same transaction and classify
//!    - already at `target`: someone else did the same thing ([`TransitionOutcome::AlreadySatisfied`])
//!    - any other status: [`GuardError::Conflict`] carrying what was observed
//!    - row gone: [`GuardError::NotFound`]
//!
//! A zero-row update is never itself an error. Storage only needs row-level
//! atomic conditional writes; no in-process locking is involved.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use super::{DomainError, ErrorCode, StateMachine};

/// An entity whose status is protected by conditional writes.
pub trait GuardedEntity {
    type Key: fmt::Display + Send + Sync;
    type Status: StateMachine + fmt::Display + Send + Sync;

    /// Entity name used in logs and conflict reports.
    const NAME: &'static str;
}

/// Storage capability required by the guard.
///
/// Implemented by transaction types so the write and the re-read observe the
/// same transactional snapshot rules.
#[async_trait]
pub trait ConditionalWrite<E: GuardedEntity>: Send {
    /// Sets status to `target` only where it currently equals `expected`.
    /// Returns the number of rows changed.
    async fn compare_and_set(
        &mut self,
        key: &E::Key,
        expected: E::Status,
        target: E::Status,
    ) -> Result<u64, DomainError>;

    /// Reads the current stored status, if the row exists.
    async fn read_status(&mut self, key: &E::Key) -> Result<Option<E::Status>, DomainError>;
}

/// Successful guard outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// This call moved the row from `expected` to `target`.
    Applied,
    /// The row was already at `target`; nothing was written.
    AlreadySatisfied,
}

impl TransitionOutcome {
    pub fn was_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError<S: fmt::Debug + fmt::Display> {
    #[error("{entity} {key} is {observed}, expected {expected}")]
    Conflict {
        entity: &'static str,
        key: String,
        expected: S,
        observed: S,
    },

    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },

    #[error("{entity} cannot move from {from} to {to}")]
    InvalidTransition { entity: &'static str, from: S, to: S },

    #[error(transparent)]
    Storage(#[from] DomainError),
}

impl<S: fmt::Debug + fmt::Display> GuardError<S> {
    /// Only storage failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GuardError::Storage(e) if e.is_transient())
    }
}

impl<S: fmt::Debug + fmt::Display> From<GuardError<S>> for DomainError {
    fn from(err: GuardError<S>) -> Self {
        match err {
            GuardError::Storage(e) => e,
            GuardError::Conflict { .. } => DomainError::new(ErrorCode::Conflict, err.to_string()),
            GuardError::NotFound { .. } => DomainError::new(ErrorCode::InternalError, err.to_string()),
            GuardError::InvalidTransition { .. } => {
                DomainError::new(ErrorCode::InvalidStateTransition, err.to_string())
            }
        }
    }
}

/// Attempts `expected -> target` on the entity identified by `key`.
pub async fn attempt_transition<E, W>(
    writer: &mut W,
    key: &E::Key,
    expected: E::Status,
    target: E::Status,
) -> Result<TransitionOutcome, GuardError<E::Status>>
where
    E: GuardedEntity,
    W: ConditionalWrite<E> + ?Sized,
{
    if !expected.can_transition_to(&target) {
        return Err(GuardError::InvalidTransition {
            entity: E::NAME,
            from: expected,
            to: target,
        });
    }

    let rows = writer
        .compare_and_set(key, expected.clone(), target.clone())
        .await?;
    if rows > 0 {
        tracing::debug!(entity = E::NAME, key = %key, from = %expected, to = %target, "transition applied");
        return Ok(TransitionOutcome::Applied);
    }

    match writer.read_status(key).await? {
        Some(observed) if observed == target => {
            tracing::debug!(entity = E::NAME, key = %key, status = %target, "transition already satisfied");
            Ok(TransitionOutcome::AlreadySatisfied)
        }
        Some(observed) => {
            tracing::info!(
                entity = E::NAME,
                key = %key,
                expected = %expected,
                observed = %observed,
                "conditional transition lost the race"
            );
            Err(GuardError::Conflict {
                entity: E::NAME,
                key: key.to_string(),
                expected,
                observed,
            })
        }
        None => Err(GuardError::NotFound {
            entity: E::NAME,
            key: key.to_string(),
        }),
    }
}
