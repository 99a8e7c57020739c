//! GetSubscriptionHandler - Query for the user's current subscription.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::billing::{BillingError, Subscription, SubscriptionItem};
use crate::domain::foundation::UserId;
use crate::ports::BillingStore;

#[derive(Debug, Clone)]
pub struct GetSubscriptionQuery {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionView {
    pub subscription: Subscription,
    pub items: Vec<SubscriptionItem>,
}

pub struct GetSubscriptionHandler {
    store: Arc<dyn BillingStore>,
}

impl GetSubscriptionHandler {
    pub fn new(store: Arc<dyn BillingStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, query: GetSubscriptionQuery) -> Result<SubscriptionView, BillingError> {
        let subscription = self
            .store
            .find_latest_active_subscription(&query.user_id)
            .await?
            .ok_or(BillingError::NoActiveSubscription(query.user_id))?;
        let items = self.store.list_items(&subscription.id).await?;

        Ok(SubscriptionView { subscription, items })
    }
}
