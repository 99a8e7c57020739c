//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `TeamStore` / `TeamTransaction` - Teams, memberships and invitations
//! - `BillingStore` / `BillingTransaction` - Plans, subscriptions and add-on items
//!
//! ## External Service Ports
//!
//! - `BillingProvider` - Subscription detail and add-on line items
//! - `SessionValidator` - Bearer token validation

mod billing_provider;
mod billing_store;
mod session_validator;
mod team_store;

pub use billing_provider::{
    BillingProvider, CheckoutRequest, CheckoutSession, PaymentError, PaymentErrorCode,
    ProviderSubscription, ProviderSubscriptionItem,
};
pub use billing_store::{BillingStore, BillingTransaction};
pub use session_validator::SessionValidator;
pub use team_store::{FindOrCreate, TeamStore, TeamTransaction};
