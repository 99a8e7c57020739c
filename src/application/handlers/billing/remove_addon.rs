//! RemoveAddonHandler - Detaches the add-on billed for a resource.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::billing::{AddonType, BillingError, SubscriptionItem};
use crate::domain::foundation::UserId;
use crate::ports::{BillingProvider, BillingStore};

#[derive(Debug, Clone)]
pub struct RemoveAddonCommand {
    pub user_id: UserId,
    pub resource_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct RemoveAddonResult {
    pub item: SubscriptionItem,
}

/// Deletes the provider item, then the local row. A provider that no longer
/// has the item counts as success so the local row does not linger.
pub struct RemoveAddonHandler {
    store: Arc<dyn BillingStore>,
    provider: Arc<dyn BillingProvider>,
}

impl RemoveAddonHandler {
    pub fn new(store: Arc<dyn BillingStore>, provider: Arc<dyn BillingProvider>) -> Self {
        Self { store, provider }
    }

    pub async fn handle(&self, cmd: RemoveAddonCommand) -> Result<RemoveAddonResult, BillingError> {
        let subscription = self
            .store
            .find_latest_active_subscription(&cmd.user_id)
            .await?
            .ok_or(BillingError::NoActiveSubscription(cmd.user_id))?;

        let mut found = None;
        for item_type in AddonType::ALL {
            found = self
                .store
                .find_item(&subscription.id, item_type, Some(cmd.resource_id))
                .await?;
            if found.is_some() {
                break;
            }
        }
        let item = found.ok_or(BillingError::AddonNotFound)?;

        match self.provider.delete_subscription_item(&item.external_item_id).await {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {
                tracing::warn!(remote_item_id = %item.external_item_id, "add-on already gone at provider; removing local row");
            }
            Err(err) => return Err(BillingError::Provider(err.to_string())),
        }

        let mut tx = self.store.begin().await?;
        tx.delete_item(&item.id).await?;
        tx.commit().await?;

        tracing::info!(item_id = %item.id, resource_id = %cmd.resource_id, "add-on removed");
        Ok(RemoveAddonResult { item })
    }
}
