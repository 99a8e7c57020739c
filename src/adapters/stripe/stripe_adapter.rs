//! Stripe billing provider adapter.
//!
//! Implements `BillingProvider` against the Stripe REST API using form-encoded
//! requests and HTTP basic auth with the secret key.
//!
//! ```ignore
//! let config = StripeConfig::new(api_key);
//! let adapter = StripeBillingAdapter::new(config);
//! ```

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::domain::billing::SubscriptionStatus;
use crate::ports::{
    BillingProvider, CheckoutRequest, CheckoutSession, PaymentError, PaymentErrorCode,
    ProviderSubscription, ProviderSubscriptionItem,
};

use super::stripe_types::{
    StripeCheckoutSession, StripeErrorEnvelope, StripeSubscription, StripeSubscriptionItem,
};

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,
}

impl StripeConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }
}

pub struct StripeBillingAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeBillingAdapter {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    /// Turns a non-2xx response into a `PaymentError`.
    async fn error_from_response(&self, operation: &str, response: reqwest::Response) -> PaymentError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<StripeErrorEnvelope>(&body).ok();
        let provider_code = parsed.as_ref().and_then(|e| e.error.code.clone());
        let message = parsed
            .as_ref()
            .and_then(|e| e.error.message.clone())
            .unwrap_or_else(|| body.clone());

        let code = match (status, provider_code.as_deref()) {
            (_, Some("resource_missing")) | (reqwest::StatusCode::NOT_FOUND, _) => PaymentErrorCode::NotFound,
            (reqwest::StatusCode::UNAUTHORIZED, _) => PaymentErrorCode::AuthenticationError,
            (reqwest::StatusCode::TOO_MANY_REQUESTS, _) => PaymentErrorCode::RateLimitExceeded,
            (s, _) if s.is_server_error() => PaymentErrorCode::ProviderError,
            (s, _) if s.is_client_error() => PaymentErrorCode::InvalidRequest,
            _ => PaymentErrorCode::Unknown,
        };

        if code != PaymentErrorCode::NotFound {
            tracing::error!(
                operation,
                status = status.as_u16(),
                error_type = parsed.as_ref().and_then(|e| e.error.error_type.as_deref()),
                error = %message,
                "Stripe request failed"
            );
        }

        let err = PaymentError::new(code, format!("Stripe API error: {}", message));
        match provider_code {
            Some(c) => err.with_provider_code(c),
            None => err,
        }
    }
}

fn parse_failure(e: reqwest::Error) -> PaymentError {
    PaymentError::new(
        PaymentErrorCode::ProviderError,
        format!("Failed to parse Stripe response: {}", e),
    )
}

/// Form fields for `POST /v1/checkout/sessions`.
fn checkout_params(request: CheckoutRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("mode", "subscription".to_string()),
        ("line_items[0][price]", request.price_id),
        ("line_items[0][quantity]", "1".to_string()),
        ("client_reference_id", request.user_id.to_string()),
        ("success_url", request.success_url),
        ("cancel_url", request.cancel_url),
    ];
    match request.customer_id {
        Some(customer_id) => params.push(("customer", customer_id)),
        None => params.push(("customer_email", request.customer_email)),
    }
    params
}

impl From<StripeSubscription> for ProviderSubscription {
    fn from(sub: StripeSubscription) -> Self {
        let price_id = sub.items.data.first().map(|i| i.price.id.clone());
        ProviderSubscription {
            id: sub.id,
            customer_id: sub.customer,
            status: SubscriptionStatus::from(sub.status),
            current_period_start: sub.current_period_start,
            current_period_end: sub.current_period_end,
            cancel_at_period_end: sub.cancel_at_period_end,
            price_id,
        }
    }
}

#[async_trait]
impl BillingProvider for StripeBillingAdapter {
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession, PaymentError> {
        let user_id = request.user_id;
        let response = self
            .http_client
            .post(self.url("/v1/checkout/sessions"))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(&checkout_params(request))
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(self.error_from_response("create_checkout_session", response).await);
        }

        let session: StripeCheckoutSession = response.json().await.map_err(parse_failure)?;
        let url = session.url.ok_or_else(|| {
            PaymentError::new(PaymentErrorCode::ProviderError, "Stripe checkout session has no url")
        })?;
        tracing::info!(%user_id, session_id = %session.id, "Stripe checkout session created");

        Ok(CheckoutSession { id: session.id, url })
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<ProviderSubscription>, PaymentError> {
        let response = self
            .http_client
            .get(self.url(&format!("/v1/subscriptions/{}", subscription_id)))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        if !response.status().is_success() {
            let err = self.error_from_response("get_subscription", response).await;
            return if err.is_not_found() { Ok(None) } else { Err(err) };
        }

        let sub: StripeSubscription = response.json().await.map_err(parse_failure)?;
        Ok(Some(sub.into()))
    }

    async fn create_subscription_item(
        &self,
        subscription_id: &str,
        price_id: &str,
        quantity: i64,
    ) -> Result<ProviderSubscriptionItem, PaymentError> {
        let params = [
            ("subscription", subscription_id.to_string()),
            ("price", price_id.to_string()),
            ("quantity", quantity.to_string()),
        ];

        let response = self
            .http_client
            .post(self.url("/v1/subscription_items"))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(&params)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(self.error_from_response("create_subscription_item", response).await);
        }

        let item: StripeSubscriptionItem = response.json().await.map_err(parse_failure)?;
        tracing::info!(subscription_id, item_id = %item.id, price_id, "Stripe subscription item created");

        Ok(ProviderSubscriptionItem {
            id: item.id,
            price_id: item.price.id,
            quantity: item.quantity,
        })
    }

    async fn delete_subscription_item(&self, item_id: &str) -> Result<(), PaymentError> {
        let response = self
            .http_client
            .delete(self.url(&format!("/v1/subscription_items/{}", item_id)))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(self.error_from_response("delete_subscription_item", response).await);
        }

        tracing::info!(item_id, "Stripe subscription item deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::stripe_types::{StripeList, StripePrice};

    #[test]
    fn base_url_drops_trailing_slash() {
        let config = StripeConfig::new(SecretString::new("sk_test_x".into()))
            .with_base_url("http://localhost:12111/");
        assert_eq!(config.api_base_url(), "http://localhost:12111");
    }

    #[test]
    fn converts_subscription_keeping_unknown_status() {
        let sub = StripeSubscription {
            id: "sub_1".into(),
            customer: "cus_1".into(),
            status: "some_future_status".into(),
            current_period_start: 1,
            current_period_end: 2,
            cancel_at_period_end: true,
            items: StripeList {
                data: vec![StripeSubscriptionItem {
                    id: "si_1".into(),
                    price: StripePrice { id: "price_pro".into() },
                    quantity: 1,
                }],
            },
        };

        let converted = ProviderSubscription::from(sub);
        assert_eq!(converted.price_id.as_deref(), Some("price_pro"));
        assert_eq!(converted.status.as_str(), "some_future_status");
        assert!(converted.cancel_at_period_end);
    }

    fn checkout_request(customer_id: Option<&str>) -> CheckoutRequest {
        CheckoutRequest {
            user_id: crate::domain::foundation::UserId::new(),
            price_id: "price_pro_m".into(),
            customer_id: customer_id.map(String::from),
            customer_email: "payer@example.com".into(),
            success_url: "https://app.example.com/ok".into(),
            cancel_url: "https://app.example.com/cancel".into(),
        }
    }

    #[test]
    fn checkout_reuses_known_customer() {
        let params = checkout_params(checkout_request(Some("cus_1")));
        assert!(params.contains(&("customer", "cus_1".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "customer_email"));
        assert!(params.contains(&("mode", "subscription".to_string())));
    }

    #[test]
    fn checkout_without_customer_prefills_email() {
        let request = checkout_request(None);
        let user_id = request.user_id.to_string();
        let params = checkout_params(request);
        assert!(params.contains(&("customer_email", "payer@example.com".to_string())));
        assert!(params.contains(&("client_reference_id", user_id)));
        assert!(params.contains(&("line_items[0][price]", "price_pro_m".to_string())));
    }

    #[tokio::test]
    async fn unreachable_api_is_a_retryable_network_error() {
        let adapter = StripeBillingAdapter::new(
            StripeConfig::new(SecretString::new("sk_test_x".into())).with_base_url("http://127.0.0.1:9"),
        );

        let err = adapter.delete_subscription_item("si_1").await.unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::NetworkError);
        assert!(err.retryable);
    }
}
