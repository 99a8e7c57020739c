//! `BillingStore` over the in-memory tables.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::billing::{
    AddonType, Plan, Subscription, SubscriptionItem, SubscriptionState, SubscriptionStatus,
};
use crate::domain::foundation::{
    ConditionalWrite, DomainError, ErrorCode, PlanId, StateMachine, SubscriptionId,
    SubscriptionItemId, Timestamp, UserId,
};
use crate::ports::{BillingStore, BillingTransaction};

use super::{find_item, items_of, InMemoryStore, Tables, UndoLog};

#[async_trait]
impl BillingStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn BillingTransaction>, DomainError> {
        Ok(Box::new(InMemoryBillingTransaction {
            log: UndoLog::new(self.tables.clone()),
        }))
    }

    async fn find_plan(&self, id: &PlanId) -> Result<Option<Plan>, DomainError> {
        Ok(self.lock().plans.iter().find(|p| p.id == *id).cloned())
    }

    async fn find_customer_id(&self, user_id: &UserId) -> Result<Option<String>, DomainError> {
        Ok(self.customer_id(user_id))
    }

    async fn find_plan_by_price(&self, price_id: &str) -> Result<Option<Plan>, DomainError> {
        Ok(self.lock().plans.iter().find(|p| p.matches_price(price_id)).cloned())
    }

    async fn find_subscription_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(by_external_id(&self.lock(), external_id))
    }

    async fn find_latest_active_subscription(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .lock()
            .subscriptions
            .values()
            .filter(|s| s.user_id == *user_id && s.status == SubscriptionStatus::Active)
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn find_item(
        &self,
        subscription_id: &SubscriptionId,
        item_type: AddonType,
        related_resource_id: Option<Uuid>,
    ) -> Result<Option<SubscriptionItem>, DomainError> {
        Ok(find_item(&self.lock(), subscription_id, item_type, related_resource_id))
    }

    async fn list_items(&self, subscription_id: &SubscriptionId) -> Result<Vec<SubscriptionItem>, DomainError> {
        Ok(items_of(&self.lock(), subscription_id))
    }
}

fn by_external_id(tables: &Tables, external_id: &str) -> Option<Subscription> {
    tables
        .subscriptions
        .values()
        .find(|s| s.external_id == external_id)
        .cloned()
}

pub struct InMemoryBillingTransaction {
    log: UndoLog,
}

impl InMemoryBillingTransaction {
    /// Replaces the subscription row with `id`, remembering the old value.
    fn overwrite_subscription(&mut self, updated: Subscription, previous: Subscription) {
        let id = updated.id;
        self.log.lock().subscriptions.insert(id, updated);
        self.log.push(Box::new(move |t| {
            t.subscriptions.insert(id, previous);
        }));
    }
}

#[async_trait]
impl ConditionalWrite<Subscription> for InMemoryBillingTransaction {
    async fn compare_and_set(
        &mut self,
        key: &String,
        expected: SubscriptionStatus,
        target: SubscriptionStatus,
    ) -> Result<u64, DomainError> {
        let previous = {
            let mut tables = self.log.lock();
            match tables
                .subscriptions
                .values_mut()
                .find(|s| s.external_id == *key && s.status == expected)
            {
                Some(row) => {
                    let previous = row.clone();
                    row.status = target;
                    row.updated_at = Timestamp::now();
                    Some(previous)
                }
                None => None,
            }
        };

        let Some(previous) = previous else {
            return Ok(0);
        };
        self.log.push(Box::new(move |t| {
            t.subscriptions.insert(previous.id, previous);
        }));
        Ok(1)
    }

    async fn read_status(&mut self, key: &String) -> Result<Option<SubscriptionStatus>, DomainError> {
        Ok(by_external_id(&self.log.lock(), key).map(|s| s.status))
    }
}

#[async_trait]
impl BillingTransaction for InMemoryBillingTransaction {
    async fn set_customer_id(&mut self, user_id: &UserId, customer_id: &str) -> Result<u64, DomainError> {
        let previous = {
            let mut tables = self.log.lock();
            match tables.users.get_mut(user_id) {
                Some(user) => std::mem::replace(&mut user.customer_id, Some(customer_id.to_string())),
                None => return Ok(0),
            }
        };
        let id = *user_id;
        self.log.push(Box::new(move |t| {
            if let Some(user) = t.users.get_mut(&id) {
                user.customer_id = previous;
            }
        }));
        Ok(1)
    }

    async fn upsert_subscription(&mut self, subscription: &Subscription) -> Result<Subscription, DomainError> {
        let existing = by_external_id(&self.log.lock(), &subscription.external_id);
        match existing {
            Some(previous) if previous.status.is_terminal() => Ok(previous),
            Some(previous) => {
                let mut stored = previous.clone();
                stored.user_id = subscription.user_id;
                stored.apply(subscription.state(), subscription.updated_at);
                self.overwrite_subscription(stored.clone(), previous);
                Ok(stored)
            }
            None => {
                let id = subscription.id;
                self.log.lock().subscriptions.insert(id, subscription.clone());
                self.log.push(Box::new(move |t| {
                    t.subscriptions.remove(&id);
                }));
                Ok(subscription.clone())
            }
        }
    }

    async fn find_subscription_by_external_id(
        &mut self,
        external_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(by_external_id(&self.log.lock(), external_id))
    }

    async fn update_subscription_state(
        &mut self,
        external_id: &str,
        state: &SubscriptionState,
        now: Timestamp,
    ) -> Result<u64, DomainError> {
        let previous = {
            let mut tables = self.log.lock();
            match tables
                .subscriptions
                .values_mut()
                .find(|s| s.external_id == external_id && s.status == state.status)
            {
                Some(row) => {
                    let previous = row.clone();
                    row.apply(state.clone(), now);
                    Some(previous)
                }
                None => None,
            }
        };

        let Some(previous) = previous else {
            return Ok(0);
        };
        self.log.push(Box::new(move |t| {
            t.subscriptions.insert(previous.id, previous);
        }));
        Ok(1)
    }

    async fn insert_item(&mut self, item: &SubscriptionItem) -> Result<(), DomainError> {
        {
            let mut tables = self.log.lock();
            let clash = tables.items.values().any(|i| i.external_item_id == item.external_item_id)
                || find_item(&tables, &item.subscription_id, item.item_type, item.related_resource_id)
                    .is_some();
            if clash {
                return Err(DomainError::new(
                    ErrorCode::DuplicateSubscriptionItem,
                    "subscription item already exists",
                ));
            }
            tables.items.insert(item.id, item.clone());
        }
        let id = item.id;
        self.log.push(Box::new(move |t| {
            t.items.remove(&id);
        }));
        Ok(())
    }

    async fn delete_item(&mut self, id: &SubscriptionItemId) -> Result<u64, DomainError> {
        let Some(removed) = self.log.lock().items.remove(id) else {
            return Ok(0);
        };
        self.log.push(Box::new(move |t| {
            t.items.insert(removed.id, removed);
        }));
        Ok(1)
    }

    async fn commit(mut self: Box<Self>) -> Result<(), DomainError> {
        self.log.commit();
        Ok(())
    }
}
