//! Request and response bodies for billing endpoints.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::billing::{AddonType, SubscriptionItem};

#[derive(Debug, Clone, Deserialize)]
pub struct AddAddonRequest {
    pub item_type: AddonType,
    #[serde(default)]
    pub resource_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCheckoutRequest {
    pub plan_id: String,
    #[serde(default)]
    pub is_yearly: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddonResponse {
    pub item: SubscriptionItem,
}

/// Body returned to the provider for every acknowledged delivery.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self { received: true }
    }
}
