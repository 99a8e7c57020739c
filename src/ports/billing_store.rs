//! Billing storage port.
//!
//! Reads that happen before an external provider call go through
//! [`BillingStore`] directly; the local writes that follow happen in a
//! [`BillingTransaction`], so no transaction is ever open across network I/O.
//!
//! Subscription status only changes through the transition guard, via the
//! `ConditionalWrite<Subscription>` supertrait keyed by external id.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::billing::{AddonType, Plan, Subscription, SubscriptionItem, SubscriptionState};
use crate::domain::foundation::{
    ConditionalWrite, DomainError, PlanId, SubscriptionId, SubscriptionItemId, Timestamp, UserId,
};

#[async_trait]
pub trait BillingStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn BillingTransaction>, DomainError>;

    async fn find_plan(&self, id: &PlanId) -> Result<Option<Plan>, DomainError>;

    /// Provider customer id recorded for the user, if any.
    async fn find_customer_id(&self, user_id: &UserId) -> Result<Option<String>, DomainError>;

    /// Plan whose monthly or yearly price equals `price_id`.
    async fn find_plan_by_price(&self, price_id: &str) -> Result<Option<Plan>, DomainError>;

    async fn find_subscription_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Most recently created subscription with status `active`.
    async fn find_latest_active_subscription(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError>;

    async fn find_item(
        &self,
        subscription_id: &SubscriptionId,
        item_type: AddonType,
        related_resource_id: Option<Uuid>,
    ) -> Result<Option<SubscriptionItem>, DomainError>;

    async fn list_items(&self, subscription_id: &SubscriptionId) -> Result<Vec<SubscriptionItem>, DomainError>;
}

#[async_trait]
pub trait BillingTransaction: ConditionalWrite<Subscription> + Send {
    /// Records the provider customer id on the user row. Returns rows changed.
    async fn set_customer_id(&mut self, user_id: &UserId, customer_id: &str) -> Result<u64, DomainError>;

    /// Inserts, or overwrites the provider-owned fields of, the row with the
    /// same `external_id`. Returns the stored row (the original local id
    /// survives redelivery). A row already in a final status is returned
    /// untouched.
    async fn upsert_subscription(&mut self, subscription: &Subscription) -> Result<Subscription, DomainError>;

    async fn find_subscription_by_external_id(
        &mut self,
        external_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Overwrites plan, period and cancel flag, but only while the stored
    /// status still equals `state.status`. The status itself is moved by the
    /// guard beforehand. Returns rows changed.
    async fn update_subscription_state(
        &mut self,
        external_id: &str,
        state: &SubscriptionState,
        now: Timestamp,
    ) -> Result<u64, DomainError>;

    /// `DuplicateSubscriptionItem` on a clashing external id or
    /// `(subscription, type, resource)` combination.
    async fn insert_item(&mut self, item: &SubscriptionItem) -> Result<(), DomainError>;

    async fn delete_item(&mut self, id: &SubscriptionItemId) -> Result<u64, DomainError>;

    async fn commit(self: Box<Self>) -> Result<(), DomainError>;
}
