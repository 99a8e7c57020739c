//! Billing domain - plans, provider-mirrored subscriptions, add-ons and the
//! signed webhook events that keep them in sync.
//!
//! The billing provider is the source of truth for subscription state. Local
//! rows are a projection keyed by the provider's identifiers, which is what
//! makes redelivered events harmless: every write is an upsert or an
//! overwrite keyed by an external id.

mod errors;
mod plan;
mod provider_event;
mod subscription;
mod webhook_errors;
mod webhook_verifier;

pub use errors::BillingError;
pub use plan::Plan;
pub use provider_event::{
    CheckoutSessionObject, InvoiceObject, PriceObject, ProviderEvent, ProviderEventData,
    ProviderEventType, SubscriptionItemList, SubscriptionItemObject, SubscriptionObject,
};
pub use subscription::{AddonType, Subscription, SubscriptionItem, SubscriptionState, SubscriptionStatus};
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{sign_payload, SignatureHeader, WebhookVerifier, MAX_CLOCK_SKEW_SECS, MAX_EVENT_AGE_SECS};
