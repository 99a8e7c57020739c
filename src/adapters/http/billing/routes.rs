//! Axum routes for billing.

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::handlers::{
    add_addon, create_checkout, get_subscription, handle_stripe_webhook, remove_addon, BillingAppState,
};

/// Authenticated billing routes.
///
/// - `GET /billing/subscription`
/// - `POST /billing/checkout`
/// - `POST /billing/addons`
/// - `DELETE /billing/addons/:resource_id`
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/billing/subscription", get(get_subscription))
        .route("/billing/checkout", post(create_checkout))
        .route("/billing/addons", post(add_addon))
        .route("/billing/addons/:resource_id", delete(remove_addon))
}

/// Provider webhooks. Authenticated by signature, not by bearer token.
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/webhooks/stripe", post(handle_stripe_webhook))
}
