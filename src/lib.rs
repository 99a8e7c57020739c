//! Tenant Core - team invitations and subscription billing for a multi-tenant SaaS.
//!
//! Two workflows share one storage discipline: every state change is a
//! conditional update inside a transaction, and a write that matched nothing
//! is reclassified by re-reading the row.
//!
//! - Invitation lifecycle: create, accept, decline, cancel.
//! - Billing webhooks: verified provider events reconciled into local
//!   subscriptions, plus add-on line items.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
