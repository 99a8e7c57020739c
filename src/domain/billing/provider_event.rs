//! Billing provider webhook events.
//!
//! Only the fields the reconciler reads are modelled; everything else in the
//! provider payload is ignored by serde.

use serde::{Deserialize, Serialize};

use super::WebhookError;

/// Webhook event envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderEvent {
    /// Provider event id (`evt_...`).
    pub id: String,

    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix seconds.
    pub created: i64,

    pub data: ProviderEventData,

    #[serde(default)]
    pub livemode: bool,

    #[serde(default)]
    pub api_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderEventData {
    /// The object the event is about; shape depends on `type`.
    pub object: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_attributes: Option<serde_json::Value>,
}

impl ProviderEvent {
    pub fn parsed_type(&self) -> ProviderEventType {
        ProviderEventType::from_type_str(&self.event_type)
    }

    /// Deserializes `data.object` as `T`.
    pub fn object<T: serde::de::DeserializeOwned>(&self) -> Result<T, WebhookError> {
        serde_json::from_value(self.data.object.clone()).map_err(|e| {
            WebhookError::ParseError(format!("{} object: {}", self.event_type, e))
        })
    }
}

/// Event types the reconciler acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderEventType {
    CheckoutSessionCompleted,
    SubscriptionUpdated,
    SubscriptionDeleted,
    InvoicePaid,
    InvoicePaymentFailed,
    /// Anything else; acknowledged without action.
    Unknown,
}

impl ProviderEventType {
    pub fn from_type_str(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "customer.subscription.updated" => Self::SubscriptionUpdated,
            "customer.subscription.deleted" => Self::SubscriptionDeleted,
            "invoice.paid" => Self::InvoicePaid,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::SubscriptionUpdated => "customer.subscription.updated",
            Self::SubscriptionDeleted => "customer.subscription.deleted",
            Self::InvoicePaid => "invoice.paid",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
            Self::Unknown => "unknown",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Event payload objects
// ════════════════════════════════════════════════════════════════════════════════

/// `checkout.session` object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckoutSessionObject {
    pub id: String,

    /// Our user id, passed to the provider when the session was created.
    pub client_reference_id: Option<String>,

    pub customer: Option<String>,

    pub subscription: Option<String>,
}

/// `subscription` object as embedded in subscription events.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscriptionObject {
    pub id: String,

    pub status: String,

    pub current_period_start: i64,

    pub current_period_end: i64,

    #[serde(default)]
    pub cancel_at_period_end: bool,

    #[serde(default)]
    pub items: SubscriptionItemList,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubscriptionItemList {
    #[serde(default)]
    pub data: Vec<SubscriptionItemObject>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscriptionItemObject {
    pub id: String,
    pub price: PriceObject,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PriceObject {
    pub id: String,
}

impl SubscriptionObject {
    /// Price of the first item; plans are sold as a single base item.
    pub fn primary_price_id(&self) -> Option<&str> {
        self.items.data.first().map(|item| item.price.id.as_str())
    }
}

/// `invoice` object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvoiceObject {
    pub id: String,

    /// draft, open, paid, void, uncollectible
    #[serde(default)]
    pub status: Option<String>,

    /// Linked subscription id; absent for one-off invoices.
    #[serde(default)]
    pub subscription: Option<String>,
}

impl InvoiceObject {
    pub fn is_paid(&self) -> bool {
        self.status.as_deref() == Some("paid")
    }
}
