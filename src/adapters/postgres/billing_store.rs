//! PostgreSQL implementation of the billing storage port.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::billing::{
    AddonType, Plan, Subscription, SubscriptionItem, SubscriptionState, SubscriptionStatus,
};
use crate::domain::foundation::{
    ConditionalWrite, DomainError, PlanId, SubscriptionId, SubscriptionItemId, Timestamp, UserId,
};
use crate::ports::{BillingStore, BillingTransaction};

use super::rows::{db_error, ItemRow, PlanRow, SubscriptionRow, ITEM_COLUMNS, SUBSCRIPTION_COLUMNS};

#[derive(Clone)]
pub struct PostgresBillingStore {
    pool: PgPool,
}

impl PostgresBillingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn select_subscriptions(filter: &str) -> String {
    format!("SELECT {} FROM subscriptions WHERE {}", SUBSCRIPTION_COLUMNS, filter)
}

fn select_items(filter: &str) -> String {
    format!("SELECT {} FROM subscription_items WHERE {}", ITEM_COLUMNS, filter)
}

#[async_trait]
impl BillingStore for PostgresBillingStore {
    async fn begin(&self) -> Result<Box<dyn BillingTransaction>, DomainError> {
        let tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;
        Ok(Box::new(PostgresBillingTransaction { tx }))
    }

    async fn find_plan(&self, id: &PlanId) -> Result<Option<Plan>, DomainError> {
        let row: Option<PlanRow> = sqlx::query_as(
            "SELECT id, name, monthly_price_id, yearly_price_id, active FROM plans WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find plan"))?;

        row.map(Plan::try_from).transpose()
    }

    async fn find_customer_id(&self, user_id: &UserId) -> Result<Option<String>, DomainError> {
        let customer_id: Option<Option<String>> =
            sqlx::query_scalar("SELECT billing_customer_id FROM users WHERE id = $1")
                .bind(user_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("find customer id"))?;

        Ok(customer_id.flatten())
    }

    async fn find_plan_by_price(&self, price_id: &str) -> Result<Option<Plan>, DomainError> {
        let row: Option<PlanRow> = sqlx::query_as(
            "SELECT id, name, monthly_price_id, yearly_price_id, active FROM plans \
             WHERE monthly_price_id = $1 OR yearly_price_id = $1",
        )
        .bind(price_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find plan"))?;

        row.map(Plan::try_from).transpose()
    }

    async fn find_subscription_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&select_subscriptions("external_id = $1"))
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("find subscription"))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_latest_active_subscription(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&select_subscriptions(
            "user_id = $1 AND status = 'active' ORDER BY created_at DESC LIMIT 1",
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find active subscription"))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_item(
        &self,
        subscription_id: &SubscriptionId,
        item_type: AddonType,
        related_resource_id: Option<Uuid>,
    ) -> Result<Option<SubscriptionItem>, DomainError> {
        let row: Option<ItemRow> = sqlx::query_as(&select_items(
            "subscription_id = $1 AND item_type = $2 AND related_resource_id IS NOT DISTINCT FROM $3",
        ))
        .bind(subscription_id.as_uuid())
        .bind(item_type.as_str())
        .bind(related_resource_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find subscription item"))?;

        row.map(SubscriptionItem::try_from).transpose()
    }

    async fn list_items(&self, subscription_id: &SubscriptionId) -> Result<Vec<SubscriptionItem>, DomainError> {
        let rows: Vec<ItemRow> = sqlx::query_as(&select_items("subscription_id = $1 ORDER BY created_at"))
            .bind(subscription_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list subscription items"))?;

        rows.into_iter().map(SubscriptionItem::try_from).collect()
    }
}

pub struct PostgresBillingTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ConditionalWrite<Subscription> for PostgresBillingTransaction {
    async fn compare_and_set(
        &mut self,
        key: &String,
        expected: SubscriptionStatus,
        target: SubscriptionStatus,
    ) -> Result<u64, DomainError> {
        let result = sqlx::query(
            "UPDATE subscriptions SET status = $3, updated_at = $4 WHERE external_id = $1 AND status = $2",
        )
        .bind(key)
        .bind(expected.as_str())
        .bind(target.as_str())
        .bind(Timestamp::now().as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("update subscription status"))?;

        Ok(result.rows_affected())
    }

    async fn read_status(&mut self, key: &String) -> Result<Option<SubscriptionStatus>, DomainError> {
        let status: Option<String> = sqlx::query_scalar("SELECT status FROM subscriptions WHERE external_id = $1")
            .bind(key)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_error("read subscription status"))?;

        Ok(status.map(SubscriptionStatus::from))
    }
}

#[async_trait]
impl BillingTransaction for PostgresBillingTransaction {
    async fn set_customer_id(&mut self, user_id: &UserId, customer_id: &str) -> Result<u64, DomainError> {
        let result = sqlx::query("UPDATE users SET billing_customer_id = $2 WHERE id = $1")
            .bind(user_id.as_uuid())
            .bind(customer_id)
            .execute(&mut *self.tx)
            .await
            .map_err(db_error("record customer id"))?;

        Ok(result.rows_affected())
    }

    async fn upsert_subscription(&mut self, subscription: &Subscription) -> Result<Subscription, DomainError> {
        // Redelivery overwrites provider-owned fields; id and created_at survive.
        // Rows in a final status are left alone and come back from the re-select.
        let final_statuses: Vec<String> = SubscriptionStatus::FINAL
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "INSERT INTO subscriptions ({cols}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT ON CONSTRAINT subscriptions_external_id_key DO UPDATE SET \
                user_id = EXCLUDED.user_id, \
                plan_id = EXCLUDED.plan_id, \
                status = EXCLUDED.status, \
                current_period_start = EXCLUDED.current_period_start, \
                current_period_end = EXCLUDED.current_period_end, \
                cancel_at_period_end = EXCLUDED.cancel_at_period_end, \
                updated_at = EXCLUDED.updated_at \
             WHERE subscriptions.status <> ALL($11) \
             RETURNING {cols}",
            cols = SUBSCRIPTION_COLUMNS
        ))
        .bind(subscription.id.as_uuid())
        .bind(subscription.user_id.as_uuid())
        .bind(subscription.plan_id.as_str())
        .bind(&subscription.external_id)
        .bind(subscription.status.as_str())
        .bind(subscription.current_period_start.as_datetime())
        .bind(subscription.current_period_end.as_datetime())
        .bind(subscription.cancel_at_period_end)
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .bind(&final_statuses)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("upsert subscription"))?;

        match row {
            Some(row) => Subscription::try_from(row),
            None => self
                .find_subscription_by_external_id(&subscription.external_id)
                .await?
                .ok_or_else(|| DomainError::database("upserted subscription vanished")),
        }
    }

    async fn find_subscription_by_external_id(
        &mut self,
        external_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&select_subscriptions("external_id = $1"))
            .bind(external_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_error("find subscription"))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn update_subscription_state(
        &mut self,
        external_id: &str,
        state: &SubscriptionState,
        now: Timestamp,
    ) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                plan_id = $2,
                current_period_start = $4,
                current_period_end = $5,
                cancel_at_period_end = $6,
                updated_at = $7
            WHERE external_id = $1 AND status = $3
            "#,
        )
        .bind(external_id)
        .bind(state.plan_id.as_str())
        .bind(state.status.as_str())
        .bind(state.current_period_start.as_datetime())
        .bind(state.current_period_end.as_datetime())
        .bind(state.cancel_at_period_end)
        .bind(now.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("update subscription"))?;

        Ok(result.rows_affected())
    }

    async fn insert_item(&mut self, item: &SubscriptionItem) -> Result<(), DomainError> {
        sqlx::query(&format!(
            "INSERT INTO subscription_items ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            ITEM_COLUMNS
        ))
        .bind(item.id.as_uuid())
        .bind(item.subscription_id.as_uuid())
        .bind(&item.external_item_id)
        .bind(&item.external_price_id)
        .bind(item.item_type.as_str())
        .bind(item.related_resource_id)
        .bind(item.quantity)
        .bind(item.created_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("insert subscription item"))?;

        Ok(())
    }

    async fn delete_item(&mut self, id: &SubscriptionItemId) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM subscription_items WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(db_error("delete subscription item"))?;

        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx.commit().await.map_err(db_error("commit transaction"))
    }
}
