//! Stripe billing provider adapter.
//!
//! Implements the `BillingProvider` port against the Stripe REST API, plus a
//! scriptable mock for tests.
//!
//! Secrets are held in `secrecy::SecretString`. Webhook signature checking is
//! not done here; it is pure domain logic in `domain::billing::WebhookVerifier`.

mod mock_billing_provider;
mod stripe_adapter;
mod stripe_types;

pub use mock_billing_provider::{MethodCall, MockBillingProvider};
pub use stripe_adapter::{StripeBillingAdapter, StripeConfig};
