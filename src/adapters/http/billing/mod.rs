//! HTTP adapter for subscriptions, add-ons and the provider webhook.
//!
//! - `GET /api/billing/subscription` - Current subscription with its add-ons
//! - `POST /api/billing/checkout` - Start a hosted checkout for a plan
//! - `POST /api/billing/addons` - Attach an add-on
//! - `DELETE /api/billing/addons/:resource_id` - Detach an add-on
//! - `POST /api/webhooks/stripe` - Signed provider events

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::BillingAppState;
pub use routes::{billing_routes, webhook_routes};
