//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (IDs, errors, state machine, transition guard)
//! - `team` - Teams, memberships and the invitation lifecycle
//! - `billing` - Plans, subscriptions, add-ons and provider webhook events

pub mod billing;
pub mod foundation;
pub mod team;
