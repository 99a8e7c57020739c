//! Mock billing provider for testing.
//!
//! Supports:
//! - Pre-configured subscriptions
//! - Error injection, per method or for the next call
//! - Call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::ports::{
    BillingProvider, CheckoutRequest, CheckoutSession, PaymentError, ProviderSubscription,
    ProviderSubscriptionItem,
};

/// Mock billing provider for testing.
///
/// ```ignore
/// let mock = MockBillingProvider::new();
/// mock.add_subscription(ProviderSubscription { id: "sub_1".into(), ... });
/// mock.set_method_error("delete_subscription_item", PaymentError::not_found("item"));
/// ```
#[derive(Clone, Default)]
pub struct MockBillingProvider {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    subscriptions: HashMap<String, ProviderSubscription>,

    /// Items created through this mock, by item id.
    items: HashMap<String, ProviderSubscriptionItem>,

    next_item_seq: u32,

    next_session_seq: u32,

    /// Every checkout request received, in order.
    checkouts: Vec<CheckoutRequest>,

    /// Error to return on next call (consumed).
    next_error: Option<PaymentError>,

    /// Errors returned on every call to the named method.
    method_errors: HashMap<String, PaymentError>,

    call_log: Vec<MethodCall>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockBillingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    pub fn add_subscription(&self, subscription: ProviderSubscription) {
        let id = subscription.id.clone();
        self.state().subscriptions.insert(id, subscription);
    }

    pub fn set_error(&self, error: PaymentError) {
        self.state().next_error = Some(error);
    }

    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.state().method_errors.insert(method.to_string(), error);
    }

    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state().call_log.iter().filter(|c| c.method == method).count()
    }

    pub fn checkout_requests(&self) -> Vec<CheckoutRequest> {
        self.state().checkouts.clone()
    }

    /// Whether the provider currently holds an item with this id.
    pub fn has_item(&self, item_id: &str) -> bool {
        self.state().items.contains_key(item_id)
    }

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.state().call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_error(&self, method: &str) -> Result<(), PaymentError> {
        let mut state = self.state();

        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }
        Ok(())
    }
}

#[async_trait]
impl BillingProvider for MockBillingProvider {
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession, PaymentError> {
        self.record_call(
            "create_checkout_session",
            vec![request.user_id.to_string(), request.price_id.clone()],
        );
        self.check_error("create_checkout_session")?;

        let mut state = self.state();
        state.next_session_seq += 1;
        let id = format!("cs_mock_{}", state.next_session_seq);
        state.checkouts.push(request);
        Ok(CheckoutSession {
            url: format!("https://checkout.stripe.com/c/pay/{}", id),
            id,
        })
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<ProviderSubscription>, PaymentError> {
        self.record_call("get_subscription", vec![subscription_id.to_string()]);
        self.check_error("get_subscription")?;

        Ok(self.state().subscriptions.get(subscription_id).cloned())
    }

    async fn create_subscription_item(
        &self,
        subscription_id: &str,
        price_id: &str,
        quantity: i64,
    ) -> Result<ProviderSubscriptionItem, PaymentError> {
        self.record_call(
            "create_subscription_item",
            vec![subscription_id.to_string(), price_id.to_string(), quantity.to_string()],
        );
        self.check_error("create_subscription_item")?;

        let mut state = self.state();
        state.next_item_seq += 1;
        let item = ProviderSubscriptionItem {
            id: format!("si_mock_{}", state.next_item_seq),
            price_id: price_id.to_string(),
            quantity,
        };
        state.items.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    async fn delete_subscription_item(&self, item_id: &str) -> Result<(), PaymentError> {
        self.record_call("delete_subscription_item", vec![item_id.to_string()]);
        self.check_error("delete_subscription_item")?;

        match self.state().items.remove(item_id) {
            Some(_) => Ok(()),
            None => Err(PaymentError::not_found("subscription item").with_provider_code("resource_missing")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::SubscriptionStatus;

    #[tokio::test]
    async fn returns_configured_subscription() {
        let mock = MockBillingProvider::new();
        mock.add_subscription(ProviderSubscription {
            id: "sub_1".into(),
            customer_id: "cus_1".into(),
            status: SubscriptionStatus::Active,
            current_period_start: 0,
            current_period_end: 1,
            cancel_at_period_end: false,
            price_id: Some("price_pro".into()),
        });

        assert!(mock.get_subscription("sub_1").await.unwrap().is_some());
        assert!(mock.get_subscription("sub_2").await.unwrap().is_none());
        assert_eq!(mock.call_count("get_subscription"), 2);
    }

    #[tokio::test]
    async fn next_error_is_consumed_once() {
        let mock = MockBillingProvider::new();
        mock.set_error(PaymentError::network("reset"));

        assert!(mock.get_subscription("sub_1").await.is_err());
        assert!(mock.get_subscription("sub_1").await.is_ok());
    }

    #[tokio::test]
    async fn checkout_sessions_are_numbered_and_recorded() {
        let mock = MockBillingProvider::new();
        let request = CheckoutRequest {
            user_id: crate::domain::foundation::UserId::new(),
            price_id: "price_pro_m".into(),
            customer_id: None,
            customer_email: "a@example.com".into(),
            success_url: "s".into(),
            cancel_url: "c".into(),
        };

        let session = mock.create_checkout_session(request.clone()).await.unwrap();

        assert_eq!(session.id, "cs_mock_1");
        assert!(session.url.ends_with("cs_mock_1"));
        assert_eq!(mock.checkout_requests(), vec![request]);
    }

    #[tokio::test]
    async fn deleting_unknown_item_is_not_found() {
        let mock = MockBillingProvider::new();
        let item = mock.create_subscription_item("sub_1", "price_rd", 1).await.unwrap();

        mock.delete_subscription_item(&item.id).await.unwrap();
        let err = mock.delete_subscription_item(&item.id).await.unwrap_err();

        assert!(err.is_not_found());
        assert!(!mock.has_item(&item.id));
    }
}
