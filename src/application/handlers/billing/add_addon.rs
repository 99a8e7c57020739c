//! AddAddonHandler - Attaches a billable add-on to the user's subscription.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::billing::{AddonType, BillingError, SubscriptionItem};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::{BillingProvider, BillingStore};

/// Provider price ids for each add-on type, from configuration.
#[derive(Debug, Clone, Default)]
pub struct AddonPrices {
    pub reserved_domain: Option<String>,
    pub custom_domain: Option<String>,
}

impl AddonPrices {
    pub fn price_for(&self, item_type: AddonType) -> Option<&str> {
        let price = match item_type {
            AddonType::ReservedDomain => self.reserved_domain.as_deref(),
            AddonType::CustomDomain => self.custom_domain.as_deref(),
        };
        price.filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct AddAddonCommand {
    pub user_id: UserId,
    pub item_type: AddonType,
    pub resource_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct AddAddonResult {
    pub item: SubscriptionItem,
}

/// The provider item is created first, outside any transaction; the local row
/// is written only after that succeeds.
pub struct AddAddonHandler {
    store: Arc<dyn BillingStore>,
    provider: Arc<dyn BillingProvider>,
    prices: AddonPrices,
}

impl AddAddonHandler {
    pub fn new(store: Arc<dyn BillingStore>, provider: Arc<dyn BillingProvider>, prices: AddonPrices) -> Self {
        Self {
            store,
            provider,
            prices,
        }
    }

    pub async fn handle(&self, cmd: AddAddonCommand) -> Result<AddAddonResult, BillingError> {
        let price_id = self
            .prices
            .price_for(cmd.item_type)
            .ok_or(BillingError::PriceNotConfigured(cmd.item_type))?;

        let subscription = self
            .store
            .find_latest_active_subscription(&cmd.user_id)
            .await?
            .ok_or(BillingError::NoActiveSubscription(cmd.user_id))?;

        if self
            .store
            .find_item(&subscription.id, cmd.item_type, cmd.resource_id)
            .await?
            .is_some()
        {
            return Err(BillingError::AddonExists(cmd.item_type));
        }

        let remote = self
            .provider
            .create_subscription_item(&subscription.external_id, price_id, 1)
            .await
            .map_err(|e| BillingError::Provider(e.to_string()))?;

        let item = SubscriptionItem::new(
            subscription.id,
            &remote.id,
            &remote.price_id,
            cmd.item_type,
            cmd.resource_id,
            remote.quantity.max(1),
            Timestamp::now(),
        )?;

        if let Err(err) = self.persist(&item).await {
            return Err(self.release(&remote.id, &subscription.external_id, cmd.item_type, err).await);
        }

        tracing::info!(
            item_id = %item.id,
            subscription_id = %subscription.id,
            item_type = %item.item_type,
            "add-on attached"
        );
        Ok(AddAddonResult { item })
    }

    /// Cleans up after a failed local write. The provider item was created by
    /// this call, so when another request won the insert it is removed again.
    /// Anything else leaves a billed item with no local row.
    async fn release(
        &self,
        remote_item_id: &str,
        external_subscription_id: &str,
        item_type: AddonType,
        err: DomainError,
    ) -> BillingError {
        if err.code == ErrorCode::DuplicateSubscriptionItem {
            match self.provider.delete_subscription_item(remote_item_id).await {
                Ok(()) => {
                    tracing::warn!(
                        remote_item_id,
                        external_subscription_id,
                        item_type = %item_type,
                        "concurrent add-on lost the insert; provider item removed"
                    );
                    return BillingError::AddonExists(item_type);
                }
                Err(delete_err) => {
                    tracing::error!(
                        remote_item_id,
                        external_subscription_id,
                        item_type = %item_type,
                        error = %delete_err,
                        "duplicate add-on could not be removed at provider; needs manual reconciliation"
                    );
                    return BillingError::Unreconciled {
                        remote_item_id: remote_item_id.to_string(),
                        reason: delete_err.to_string(),
                    };
                }
            }
        }

        tracing::error!(
            remote_item_id,
            external_subscription_id,
            item_type = %item_type,
            error = %err,
            "add-on created at provider but local write failed; needs manual reconciliation"
        );
        BillingError::Unreconciled {
            remote_item_id: remote_item_id.to_string(),
            reason: err.to_string(),
        }
    }

    async fn persist(&self, item: &SubscriptionItem) -> Result<(), DomainError> {
        let mut tx = self.store.begin().await?;
        tx.insert_item(item).await?;
        tx.commit().await
    }
}
