//! HTTP handlers for billing endpoints and the provider webhook.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::adapters::http::error::ApiError;
use crate::adapters::http::middleware::RequireAuth;
use crate::application::handlers::billing::{
    AddAddonCommand, AddAddonHandler, AddonPrices, CheckoutUrls, CreateCheckoutCommand,
    CreateCheckoutHandler, GetSubscriptionHandler, GetSubscriptionQuery, ProcessWebhookCommand,
    ProcessWebhookHandler, RemoveAddonCommand, RemoveAddonHandler, WebhookOutcome,
};
use crate::ports::{BillingProvider, BillingStore};

use super::dto::{AddAddonRequest, AddonResponse, CheckoutResponse, CreateCheckoutRequest, WebhookAck};

/// Header carrying the provider's webhook signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct BillingAppState {
    pub store: Arc<dyn BillingStore>,
    pub provider: Arc<dyn BillingProvider>,
    pub prices: AddonPrices,
    pub checkout_urls: CheckoutUrls,
    /// Built once; it owns the webhook verifier.
    pub webhook: Arc<ProcessWebhookHandler>,
}

impl BillingAppState {
    pub fn get_subscription_handler(&self) -> GetSubscriptionHandler {
        GetSubscriptionHandler::new(self.store.clone())
    }

    pub fn create_checkout_handler(&self) -> CreateCheckoutHandler {
        CreateCheckoutHandler::new(self.store.clone(), self.provider.clone(), self.checkout_urls.clone())
    }

    pub fn add_addon_handler(&self) -> AddAddonHandler {
        AddAddonHandler::new(self.store.clone(), self.provider.clone(), self.prices.clone())
    }

    pub fn remove_addon_handler(&self) -> RemoveAddonHandler {
        RemoveAddonHandler::new(self.store.clone(), self.provider.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Subscription and add-ons
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/billing/subscription
pub async fn get_subscription(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let view = state
        .get_subscription_handler()
        .handle(GetSubscriptionQuery { user_id: user.id })
        .await?;
    Ok(Json(view))
}

/// POST /api/billing/checkout
pub async fn create_checkout(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<CreateCheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .create_checkout_handler()
        .handle(CreateCheckoutCommand {
            user,
            plan_id: request.plan_id,
            yearly: request.is_yearly,
        })
        .await?;

    Ok(Json(CheckoutResponse {
        session_id: session.id,
        url: session.url,
    }))
}

/// POST /api/billing/addons
pub async fn add_addon(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<AddAddonRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .add_addon_handler()
        .handle(AddAddonCommand {
            user_id: user.id,
            item_type: request.item_type,
            resource_id: request.resource_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(AddonResponse { item: result.item })))
}

/// DELETE /api/billing/addons/:resource_id
pub async fn remove_addon(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Path(resource_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .remove_addon_handler()
        .handle(RemoveAddonCommand {
            user_id: user.id,
            resource_id,
        })
        .await?;

    Ok(Json(AddonResponse { item: result.item }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/stripe
///
/// Takes the raw body; the signature covers the exact bytes received.
pub async fn handle_stripe_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::bad_request("MISSING_SIGNATURE", "Missing Stripe-Signature header"))?;

    let outcome = state
        .webhook
        .handle(ProcessWebhookCommand {
            payload: body.to_vec(),
            signature: signature.to_string(),
        })
        .await?;

    match &outcome {
        WebhookOutcome::Reconciled {
            event_id,
            external_subscription_id,
        } => tracing::info!(%event_id, %external_subscription_id, "webhook reconciled"),
        WebhookOutcome::NoOp { event_id, reason } => tracing::info!(%event_id, %reason, "webhook no-op"),
        WebhookOutcome::Ignored { event_id, event_type } => {
            tracing::debug!(%event_id, %event_type, "webhook event type ignored")
        }
    }

    Ok((StatusCode::OK, Json(WebhookAck::received())))
}
