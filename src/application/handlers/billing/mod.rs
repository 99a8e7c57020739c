//! Billing handlers.
//!
//! ## Commands
//! - Starting a hosted checkout for a plan
//! - Processing signed provider webhooks
//! - Adding and removing subscription add-ons
//!
//! ## Queries
//! - Get the current subscription and its add-ons

mod add_addon;
mod create_checkout;
mod get_subscription;
mod process_webhook;
mod remove_addon;

// Commands
pub use add_addon::{AddAddonCommand, AddAddonHandler, AddAddonResult, AddonPrices};
pub use create_checkout::{CheckoutUrls, CreateCheckoutCommand, CreateCheckoutHandler};
pub use process_webhook::{ProcessWebhookCommand, ProcessWebhookHandler, WebhookOutcome};
pub use remove_addon::{RemoveAddonCommand, RemoveAddonHandler, RemoveAddonResult};

// Queries
pub use get_subscription::{GetSubscriptionHandler, GetSubscriptionQuery, SubscriptionView};
