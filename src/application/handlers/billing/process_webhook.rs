//! ProcessWebhookHandler - Reconciles local subscriptions with provider events.
//!
//! Every write is keyed by the provider's subscription id, so redelivered and
//! reordered events converge on the provider's state instead of duplicating
//! rows. Status changes go through the transition guard, so a late event can
//! never revive a subscription that has reached a final status. Calls to the
//! provider, and plan lookups, happen before the local transaction opens.

use std::sync::Arc;

use crate::domain::billing::{
    CheckoutSessionObject, InvoiceObject, Plan, ProviderEvent, ProviderEventType, Subscription,
    SubscriptionObject, SubscriptionState, SubscriptionStatus, WebhookError, WebhookVerifier,
};
use crate::domain::foundation::{
    attempt_transition, ConditionalWrite, DomainError, GuardError, PlanId, StateMachine, Timestamp,
    TransitionOutcome, UserId,
};
use crate::ports::{BillingProvider, BillingStore, BillingTransaction};

/// Command to process a webhook delivery.
#[derive(Debug, Clone)]
pub struct ProcessWebhookCommand {
    /// Raw request body, exactly as signed.
    pub payload: Vec<u8>,
    /// Value of the signature header.
    pub signature: String,
}

/// Result of moving a subscription's status inside a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StatusChange {
    Applied,
    /// Already at the target status.
    Unchanged,
    /// No local row for this external id.
    Untracked,
    /// The row is in a final status and stays there.
    Final(SubscriptionStatus),
}

/// What a delivery did. Every variant is acknowledged to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Local subscription written.
    Reconciled {
        event_id: String,
        external_subscription_id: String,
    },
    /// Recognised event that had nothing to change locally.
    NoOp { event_id: String, reason: &'static str },
    /// Event type this service does not act on.
    Ignored { event_id: String, event_type: String },
}

pub struct ProcessWebhookHandler {
    verifier: WebhookVerifier,
    store: Arc<dyn BillingStore>,
    provider: Arc<dyn BillingProvider>,
}

impl ProcessWebhookHandler {
    pub fn new(
        verifier: WebhookVerifier,
        store: Arc<dyn BillingStore>,
        provider: Arc<dyn BillingProvider>,
    ) -> Self {
        Self {
            verifier,
            store,
            provider,
        }
    }

    /// Verifies the signature, then processes the event.
    ///
    /// Nothing is read or written unless the signature checks out.
    pub async fn handle(&self, cmd: ProcessWebhookCommand) -> Result<WebhookOutcome, WebhookError> {
        let event = self
            .verifier
            .verify_and_parse(&cmd.payload, &cmd.signature)
            .map_err(|err| {
                tracing::warn!(error = %err, "webhook rejected before processing");
                err
            })?;

        self.process(&event).await
    }

    /// Processes an already verified event.
    pub async fn process(&self, event: &ProviderEvent) -> Result<WebhookOutcome, WebhookError> {
        tracing::info!(event_id = %event.id, event_type = %event.event_type, livemode = event.livemode, "processing webhook event");

        let result = match event.parsed_type() {
            ProviderEventType::CheckoutSessionCompleted => self.checkout_completed(event).await,
            ProviderEventType::SubscriptionUpdated => self.subscription_updated(event).await,
            ProviderEventType::SubscriptionDeleted => self.subscription_deleted(event).await,
            ProviderEventType::InvoicePaid => self.invoice_paid(event).await,
            ProviderEventType::InvoicePaymentFailed => self.invoice_payment_failed(event).await,
            ProviderEventType::Unknown => {
                tracing::debug!(event_id = %event.id, event_type = %event.event_type, "ignoring unhandled event type");
                Ok(WebhookOutcome::Ignored {
                    event_id: event.id.clone(),
                    event_type: event.event_type.clone(),
                })
            }
        };

        if let Err(err) = &result {
            tracing::error!(
                event_id = %event.id,
                event_type = %event.event_type,
                retryable = err.is_retryable(),
                error = %err,
                "webhook processing failed"
            );
        }
        result
    }

    async fn checkout_completed(&self, event: &ProviderEvent) -> Result<WebhookOutcome, WebhookError> {
        let session: CheckoutSessionObject = event.object()?;
        let user_ref = session
            .client_reference_id
            .ok_or(WebhookError::MissingField("client_reference_id"))?;
        let customer_id = session.customer.ok_or(WebhookError::MissingField("customer"))?;
        let subscription_id = session
            .subscription
            .ok_or(WebhookError::MissingField("subscription"))?;
        let user_id: UserId = user_ref.parse().map_err(|_| {
            WebhookError::ParseError(format!("client_reference_id '{}' is not a user id", user_ref))
        })?;

        // Outside the transaction: no lock is held across the network call.
        let detail = self
            .provider
            .get_subscription(&subscription_id)
            .await
            .map_err(|e| WebhookError::Provider(e.to_string()))?
            .ok_or_else(|| {
                WebhookError::DataIntegrity(format!("provider has no subscription {}", subscription_id))
            })?;

        let price_id = detail.price_id.as_deref().ok_or_else(|| {
            WebhookError::DataIntegrity(format!("subscription {} has no price", subscription_id))
        })?;
        let plan = match self.store.find_plan_by_price(price_id).await? {
            Some(plan) => plan,
            None => {
                tracing::error!(
                    price_id,
                    subscription_id = %subscription_id,
                    user_id = %user_id,
                    "no plan matches subscription price; checkout not reconciled"
                );
                return Err(WebhookError::DataIntegrity(format!("no plan for price {}", price_id)));
            }
        };

        let state = SubscriptionState {
            plan_id: plan.id,
            status: detail.status.clone(),
            current_period_start: unix(detail.current_period_start)?,
            current_period_end: unix(detail.current_period_end)?,
            cancel_at_period_end: detail.cancel_at_period_end,
        };
        let now = Timestamp::now();

        let incoming = state.status.clone();
        let mut tx = self.store.begin().await?;
        if tx.set_customer_id(&user_id, &customer_id).await? == 0 {
            return Err(WebhookError::DataIntegrity(format!("user {} not found", user_id)));
        }
        let stored = tx
            .upsert_subscription(&Subscription::from_provider(user_id, &subscription_id, state, now))
            .await?;
        tx.commit().await?;

        if stored.status.is_terminal() && stored.status != incoming {
            tracing::info!(
                external_id = %stored.external_id,
                status = %stored.status,
                incoming = %incoming,
                "checkout for an ended subscription left unchanged"
            );
        }

        tracing::info!(
            subscription_id = %stored.id,
            external_id = %stored.external_id,
            plan_id = %stored.plan_id,
            status = %stored.status,
            "subscription reconciled from checkout"
        );

        Ok(WebhookOutcome::Reconciled {
            event_id: event.id.clone(),
            external_subscription_id: subscription_id,
        })
    }

    async fn subscription_updated(&self, event: &ProviderEvent) -> Result<WebhookOutcome, WebhookError> {
        let object: SubscriptionObject = event.object()?;
        let matched_plan = match object.primary_price_id() {
            Some(price_id) => self.store.find_plan_by_price(price_id).await?,
            None => None,
        };

        let mut tx = self.store.begin().await?;
        let Some(existing) = tx.find_subscription_by_external_id(&object.id).await? else {
            // Erroring here would make the provider retry an event we can never apply.
            tracing::info!(external_id = %object.id, "update for untracked subscription ignored");
            return Ok(WebhookOutcome::NoOp {
                event_id: event.id.clone(),
                reason: "subscription not tracked",
            });
        };

        let state = SubscriptionState {
            plan_id: pick_plan(&object, matched_plan, &existing.plan_id),
            status: SubscriptionStatus::from(object.status.as_str()),
            current_period_start: unix(object.current_period_start)?,
            current_period_end: unix(object.current_period_end)?,
            cancel_at_period_end: object.cancel_at_period_end,
        };

        match move_status(tx.as_mut(), &object.id, &state.status).await? {
            StatusChange::Applied | StatusChange::Unchanged => {}
            StatusChange::Untracked => {
                return Ok(WebhookOutcome::NoOp {
                    event_id: event.id.clone(),
                    reason: "subscription not tracked",
                });
            }
            StatusChange::Final(current) => {
                tracing::info!(external_id = %object.id, status = %current, incoming = %state.status, "update for ended subscription ignored");
                return Ok(WebhookOutcome::NoOp {
                    event_id: event.id.clone(),
                    reason: "subscription already ended",
                });
            }
        }

        // The status write above holds the row; a zero here means another
        // delivery changed it in between, and redelivery will re-evaluate.
        let rows = tx.update_subscription_state(&object.id, &state, Timestamp::now()).await?;
        if rows == 0 {
            return Err(WebhookError::Database(format!(
                "subscription {} changed while being updated",
                object.id
            )));
        }
        tx.commit().await?;

        tracing::info!(external_id = %object.id, status = %state.status, plan_id = %state.plan_id, "subscription updated");
        Ok(WebhookOutcome::Reconciled {
            event_id: event.id.clone(),
            external_subscription_id: object.id,
        })
    }

    async fn subscription_deleted(&self, event: &ProviderEvent) -> Result<WebhookOutcome, WebhookError> {
        let object: SubscriptionObject = event.object()?;
        let status = SubscriptionStatus::from(object.status.as_str());
        self.set_status(event, &object.id, status).await
    }

    async fn invoice_paid(&self, event: &ProviderEvent) -> Result<WebhookOutcome, WebhookError> {
        let invoice: InvoiceObject = event.object()?;
        if !invoice.is_paid() {
            return Ok(WebhookOutcome::NoOp {
                event_id: event.id.clone(),
                reason: "invoice not paid",
            });
        }
        let Some(subscription_id) = invoice.subscription else {
            return Ok(WebhookOutcome::NoOp {
                event_id: event.id.clone(),
                reason: "invoice not linked to a subscription",
            });
        };
        self.set_status(event, &subscription_id, SubscriptionStatus::Active).await
    }

    async fn invoice_payment_failed(&self, event: &ProviderEvent) -> Result<WebhookOutcome, WebhookError> {
        let invoice: InvoiceObject = event.object()?;
        let Some(subscription_id) = invoice.subscription else {
            return Ok(WebhookOutcome::NoOp {
                event_id: event.id.clone(),
                reason: "invoice not linked to a subscription",
            });
        };
        self.set_status(event, &subscription_id, SubscriptionStatus::PastDue).await
    }

    /// Status-only change. Untracked, already-applied and ended
    /// subscriptions are all acknowledged without a write.
    async fn set_status(
        &self,
        event: &ProviderEvent,
        external_id: &str,
        status: SubscriptionStatus,
    ) -> Result<WebhookOutcome, WebhookError> {
        let mut tx = self.store.begin().await?;
        let change = move_status(tx.as_mut(), external_id, &status).await?;
        tx.commit().await?;

        let reason = match change {
            StatusChange::Applied => {
                tracing::info!(external_id, status = %status, "subscription status set");
                return Ok(WebhookOutcome::Reconciled {
                    event_id: event.id.clone(),
                    external_subscription_id: external_id.to_string(),
                });
            }
            StatusChange::Unchanged => "status already applied",
            StatusChange::Untracked => "subscription not tracked",
            StatusChange::Final(_) => "subscription already ended",
        };

        tracing::info!(external_id, status = %status, ?change, %reason, "status change not applied");
        Ok(WebhookOutcome::NoOp {
            event_id: event.id.clone(),
            reason,
        })
    }
}

/// Moves the stored status to `target` through the transition guard.
///
/// The expected status is whatever the row holds now. A concurrent writer
/// that lands first surfaces as a guard conflict: a final status is
/// reported as such, anything else is retryable.
async fn move_status(
    tx: &mut dyn BillingTransaction,
    external_id: &str,
    target: &SubscriptionStatus,
) -> Result<StatusChange, WebhookError> {
    let key = external_id.to_string();
    let Some(current) = tx.read_status(&key).await? else {
        return Ok(StatusChange::Untracked);
    };
    if current == *target {
        return Ok(StatusChange::Unchanged);
    }
    if current.is_terminal() {
        return Ok(StatusChange::Final(current));
    }

    match attempt_transition::<Subscription, _>(tx, &key, current, target.clone()).await {
        Ok(TransitionOutcome::Applied) => Ok(StatusChange::Applied),
        Ok(TransitionOutcome::AlreadySatisfied) => Ok(StatusChange::Unchanged),
        Err(GuardError::Conflict { observed, .. }) if observed.is_terminal() => Ok(StatusChange::Final(observed)),
        Err(GuardError::NotFound { .. }) => Ok(StatusChange::Untracked),
        Err(err) => Err(WebhookError::Database(DomainError::from(err).to_string())),
    }
}

/// Plan for the event's current price, or the stored plan when the event
/// carries no price or no plan matches it.
fn pick_plan(object: &SubscriptionObject, matched: Option<Plan>, current: &PlanId) -> PlanId {
    match (object.primary_price_id(), matched) {
        (_, Some(plan)) => plan.id,
        (None, None) => current.clone(),
        (Some(price_id), None) => {
            tracing::warn!(
                external_id = %object.id,
                price_id,
                kept_plan = %current,
                "no plan matches updated price; keeping current plan"
            );
            current.clone()
        }
    }
}

fn unix(secs: i64) -> Result<Timestamp, WebhookError> {
    Timestamp::from_unix_secs(secs).map_err(|e| WebhookError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::adapters::stripe::MockBillingProvider;
    use crate::domain::billing::{sign_payload, Plan};
    use crate::domain::foundation::Email;
    use crate::ports::{PaymentError, ProviderSubscription};
    use secrecy::SecretString;
    use serde_json::json;

    const SECRET: &str = "whsec_unit_test";
    const PERIOD_START: i64 = 1_700_000_000;
    const PERIOD_END: i64 = 1_702_592_000;

    struct Harness {
        store: InMemoryStore,
        provider: MockBillingProvider,
        handler: ProcessWebhookHandler,
        user: UserId,
    }

    fn harness() -> Harness {
        let store = InMemoryStore::new();
        let provider = MockBillingProvider::new();
        let user = UserId::new();
        store.register_user(user, Email::new("payer@example.com").unwrap());
        store.add_plan(Plan {
            id: PlanId::new("pro").unwrap(),
            name: "Pro".into(),
            monthly_price_id: "price_pro_monthly".into(),
            yearly_price_id: Some("price_pro_yearly".into()),
            active: true,
        });
        store.add_plan(Plan {
            id: PlanId::new("team").unwrap(),
            name: "Team".into(),
            monthly_price_id: "price_team_monthly".into(),
            yearly_price_id: None,
            active: true,
        });
        provider.add_subscription(ProviderSubscription {
            id: "sub_1".into(),
            customer_id: "cus_1".into(),
            status: SubscriptionStatus::Active,
            current_period_start: PERIOD_START,
            current_period_end: PERIOD_END,
            cancel_at_period_end: false,
            price_id: Some("price_pro_yearly".into()),
        });

        let handler = ProcessWebhookHandler::new(
            WebhookVerifier::new(SecretString::new(SECRET.into())),
            Arc::new(store.clone()),
            Arc::new(provider.clone()),
        );
        Harness {
            store,
            provider,
            handler,
            user,
        }
    }

    fn event(event_type: &str, object: serde_json::Value) -> ProviderEvent {
        serde_json::from_value(json!({
            "id": format!("evt_{}", uuid::Uuid::new_v4().simple()),
            "type": event_type,
            "created": PERIOD_START,
            "data": {"object": object},
            "livemode": false
        }))
        .unwrap()
    }

    fn checkout(user: UserId) -> ProviderEvent {
        event(
            "checkout.session.completed",
            json!({"id": "cs_1", "client_reference_id": user.to_string(), "customer": "cus_1", "subscription": "sub_1"}),
        )
    }

    fn subscription_object(status: &str, price: &str) -> serde_json::Value {
        json!({
            "id": "sub_1",
            "status": status,
            "current_period_start": PERIOD_START,
            "current_period_end": PERIOD_END + 100,
            "cancel_at_period_end": true,
            "items": {"data": [{"id": "si_base", "price": {"id": price}}]}
        })
    }

    // ══════════════════════════════════════════════════════════════
    // Signature gate
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn signed_delivery_is_processed() {
        let h = harness();
        let payload = serde_json::to_vec(&checkout(h.user)).unwrap();
        let signature = sign_payload(SECRET, chrono::Utc::now().timestamp(), &payload);

        let outcome = h
            .handler
            .handle(ProcessWebhookCommand { payload, signature })
            .await
            .unwrap();

        assert!(matches!(outcome, WebhookOutcome::Reconciled { .. }));
    }

    #[tokio::test]
    async fn extreme_signature_timestamp_is_rejected() {
        let h = harness();
        let payload = serde_json::to_vec(&checkout(h.user)).unwrap();

        let err = h
            .handler
            .handle(ProcessWebhookCommand {
                payload,
                signature: format!("t={},v1=00", i64::MIN),
            })
            .await
            .unwrap_err();

        assert_eq!(err, WebhookError::TimestampOutOfRange);
        assert!(h.store.subscriptions_by_external_id("sub_1").is_empty());
    }

    #[tokio::test]
    async fn bad_signature_touches_nothing() {
        let h = harness();
        let payload = serde_json::to_vec(&checkout(h.user)).unwrap();
        let signature = sign_payload("whsec_wrong", chrono::Utc::now().timestamp(), &payload);

        let err = h
            .handler
            .handle(ProcessWebhookCommand { payload, signature })
            .await
            .unwrap_err();

        assert!(err.is_unverified());
        assert_eq!(h.provider.call_count("get_subscription"), 0);
        assert!(h.store.subscriptions_by_external_id("sub_1").is_empty());
    }

    // ══════════════════════════════════════════════════════════════
    // checkout.session.completed
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn checkout_creates_subscription_and_records_customer() {
        let h = harness();

        h.handler.process(&checkout(h.user)).await.unwrap();

        let rows = h.store.subscriptions_by_external_id("sub_1");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].plan_id.as_str(), "pro");
        assert_eq!(rows[0].user_id, h.user);
        assert_eq!(rows[0].current_period_end.as_unix_secs(), PERIOD_END);
        assert_eq!(h.store.customer_id(&h.user).as_deref(), Some("cus_1"));
    }

    #[tokio::test]
    async fn redelivered_checkout_keeps_one_row() {
        let h = harness();
        let delivery = checkout(h.user);

        h.handler.process(&delivery).await.unwrap();
        h.handler.process(&delivery).await.unwrap();

        assert_eq!(h.store.subscriptions_by_external_id("sub_1").len(), 1);
    }

    #[tokio::test]
    async fn redelivered_checkout_takes_latest_provider_detail() {
        let h = harness();
        let delivery = checkout(h.user);
        h.handler.process(&delivery).await.unwrap();
        let first = h.store.subscriptions_by_external_id("sub_1")[0].clone();

        h.provider.add_subscription(ProviderSubscription {
            id: "sub_1".into(),
            customer_id: "cus_1".into(),
            status: SubscriptionStatus::PastDue,
            current_period_start: PERIOD_END,
            current_period_end: PERIOD_END + 2_592_000,
            cancel_at_period_end: true,
            price_id: Some("price_team_monthly".into()),
        });
        h.handler.process(&delivery).await.unwrap();

        let rows = h.store.subscriptions_by_external_id("sub_1");
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.id, first.id);
        assert_eq!(row.created_at, first.created_at);
        assert_eq!(row.plan_id.as_str(), "team");
        assert_eq!(row.status, SubscriptionStatus::PastDue);
        assert_eq!(row.current_period_start.as_unix_secs(), PERIOD_END);
        assert_eq!(row.current_period_end.as_unix_secs(), PERIOD_END + 2_592_000);
        assert!(row.cancel_at_period_end);
    }

    #[tokio::test]
    async fn checkout_redelivered_after_delete_keeps_canceled() {
        let h = harness();
        let delivery = checkout(h.user);
        h.handler.process(&delivery).await.unwrap();
        h.handler
            .process(&event("customer.subscription.deleted", subscription_object("canceled", "price_pro_yearly")))
            .await
            .unwrap();

        // Provider detail fetched before the delete landed still says active.
        h.handler.process(&delivery).await.unwrap();

        let rows = h.store.subscriptions_by_external_id("sub_1");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, SubscriptionStatus::Canceled);
    }

    #[tokio::test]
    async fn checkout_missing_customer_is_shape_error() {
        let h = harness();
        let ev = event(
            "checkout.session.completed",
            json!({"id": "cs_1", "client_reference_id": h.user.to_string(), "subscription": "sub_1"}),
        );

        let err = h.handler.process(&ev).await.unwrap_err();

        assert_eq!(err, WebhookError::MissingField("customer"));
        assert_eq!(h.provider.call_count("get_subscription"), 0);
    }

    #[tokio::test]
    async fn checkout_for_unknown_price_writes_nothing() {
        let h = harness();
        h.provider.add_subscription(ProviderSubscription {
            id: "sub_1".into(),
            customer_id: "cus_1".into(),
            status: SubscriptionStatus::Active,
            current_period_start: PERIOD_START,
            current_period_end: PERIOD_END,
            cancel_at_period_end: false,
            price_id: Some("price_legacy".into()),
        });

        let err = h.handler.process(&checkout(h.user)).await.unwrap_err();

        assert!(matches!(err, WebhookError::DataIntegrity(_)));
        assert!(err.status_code().is_server_error());
        assert!(h.store.subscriptions_by_external_id("sub_1").is_empty());
        assert_eq!(h.store.customer_id(&h.user), None);
    }

    #[tokio::test]
    async fn checkout_provider_failure_is_retryable() {
        let h = harness();
        h.provider.set_error(PaymentError::network("connection reset"));

        let err = h.handler.process(&checkout(h.user)).await.unwrap_err();

        assert!(err.is_retryable());
    }

    // ══════════════════════════════════════════════════════════════
    // customer.subscription.*
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn update_for_untracked_subscription_is_noop() {
        let h = harness();

        let outcome = h
            .handler
            .process(&event("customer.subscription.updated", subscription_object("active", "price_pro_monthly")))
            .await
            .unwrap();

        assert!(matches!(outcome, WebhookOutcome::NoOp { .. }));
        assert!(h.store.subscriptions_by_external_id("sub_1").is_empty());
    }

    #[tokio::test]
    async fn update_overwrites_state_and_plan() {
        let h = harness();
        h.handler.process(&checkout(h.user)).await.unwrap();

        h.handler
            .process(&event("customer.subscription.updated", subscription_object("past_due", "price_team_monthly")))
            .await
            .unwrap();

        let row = &h.store.subscriptions_by_external_id("sub_1")[0];
        assert_eq!(row.plan_id.as_str(), "team");
        assert_eq!(row.status, SubscriptionStatus::PastDue);
        assert!(row.cancel_at_period_end);
        assert_eq!(row.current_period_end.as_unix_secs(), PERIOD_END + 100);
    }

    /// Records the order of pool-level calls.
    struct RecordingStore {
        inner: InMemoryStore,
        calls: std::sync::Mutex<Vec<&'static str>>,
    }

    impl RecordingStore {
        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait::async_trait]
    impl BillingStore for RecordingStore {
        async fn begin(&self) -> Result<Box<dyn BillingTransaction>, DomainError> {
            self.record("begin");
            BillingStore::begin(&self.inner).await
        }

        async fn find_plan(&self, id: &crate::domain::foundation::PlanId) -> Result<Option<Plan>, DomainError> {
            self.inner.find_plan(id).await
        }

        async fn find_customer_id(&self, user_id: &UserId) -> Result<Option<String>, DomainError> {
            self.inner.find_customer_id(user_id).await
        }

        async fn find_plan_by_price(&self, price_id: &str) -> Result<Option<Plan>, DomainError> {
            self.record("find_plan_by_price");
            self.inner.find_plan_by_price(price_id).await
        }

        async fn find_subscription_by_external_id(&self, external_id: &str) -> Result<Option<Subscription>, DomainError> {
            BillingStore::find_subscription_by_external_id(&self.inner, external_id).await
        }

        async fn find_latest_active_subscription(&self, user_id: &UserId) -> Result<Option<Subscription>, DomainError> {
            self.inner.find_latest_active_subscription(user_id).await
        }

        async fn find_item(
            &self,
            subscription_id: &crate::domain::foundation::SubscriptionId,
            item_type: crate::domain::billing::AddonType,
            related_resource_id: Option<uuid::Uuid>,
        ) -> Result<Option<crate::domain::billing::SubscriptionItem>, DomainError> {
            self.inner.find_item(subscription_id, item_type, related_resource_id).await
        }

        async fn list_items(
            &self,
            subscription_id: &crate::domain::foundation::SubscriptionId,
        ) -> Result<Vec<crate::domain::billing::SubscriptionItem>, DomainError> {
            self.inner.list_items(subscription_id).await
        }
    }

    #[tokio::test]
    async fn update_resolves_plan_before_opening_a_transaction() {
        let h = harness();
        h.handler.process(&checkout(h.user)).await.unwrap();
        let recording = Arc::new(RecordingStore {
            inner: h.store.clone(),
            calls: std::sync::Mutex::new(Vec::new()),
        });
        let handler = ProcessWebhookHandler::new(
            WebhookVerifier::new(SecretString::new(SECRET.into())),
            recording.clone(),
            Arc::new(h.provider.clone()),
        );

        handler
            .process(&event("customer.subscription.updated", subscription_object("active", "price_team_monthly")))
            .await
            .unwrap();

        assert_eq!(*recording.calls.lock().unwrap(), vec!["find_plan_by_price", "begin"]);
        assert_eq!(h.store.subscriptions_by_external_id("sub_1")[0].plan_id.as_str(), "team");
    }

    #[tokio::test]
    async fn update_with_unknown_price_keeps_plan() {
        let h = harness();
        h.handler.process(&checkout(h.user)).await.unwrap();

        h.handler
            .process(&event("customer.subscription.updated", subscription_object("active", "price_mystery")))
            .await
            .unwrap();

        assert_eq!(h.store.subscriptions_by_external_id("sub_1")[0].plan_id.as_str(), "pro");
    }

    #[tokio::test]
    async fn delete_applies_event_status() {
        let h = harness();
        h.handler.process(&checkout(h.user)).await.unwrap();

        h.handler
            .process(&event("customer.subscription.deleted", subscription_object("canceled", "price_pro_yearly")))
            .await
            .unwrap();

        assert_eq!(
            h.store.subscriptions_by_external_id("sub_1")[0].status,
            SubscriptionStatus::Canceled
        );
    }

    #[tokio::test]
    async fn stale_update_after_delete_is_ignored() {
        let h = harness();
        h.handler.process(&checkout(h.user)).await.unwrap();
        h.handler
            .process(&event("customer.subscription.deleted", subscription_object("canceled", "price_pro_yearly")))
            .await
            .unwrap();

        let outcome = h
            .handler
            .process(&event("customer.subscription.updated", subscription_object("active", "price_team_monthly")))
            .await
            .unwrap();

        assert!(matches!(outcome, WebhookOutcome::NoOp { reason: "subscription already ended", .. }));
        let row = &h.store.subscriptions_by_external_id("sub_1")[0];
        assert_eq!(row.status, SubscriptionStatus::Canceled);
        assert_eq!(row.plan_id.as_str(), "pro");
        assert!(!row.cancel_at_period_end);
    }

    #[tokio::test]
    async fn update_keeping_status_still_refreshes_terms() {
        let h = harness();
        h.handler.process(&checkout(h.user)).await.unwrap();

        let outcome = h
            .handler
            .process(&event("customer.subscription.updated", subscription_object("active", "price_pro_monthly")))
            .await
            .unwrap();

        assert!(matches!(outcome, WebhookOutcome::Reconciled { .. }));
        let row = &h.store.subscriptions_by_external_id("sub_1")[0];
        assert_eq!(row.status, SubscriptionStatus::Active);
        assert!(row.cancel_at_period_end);
        assert_eq!(row.current_period_end.as_unix_secs(), PERIOD_END + 100);
    }

    #[tokio::test]
    async fn delete_for_untracked_subscription_succeeds() {
        let h = harness();

        let outcome = h
            .handler
            .process(&event("customer.subscription.deleted", subscription_object("canceled", "price_pro_yearly")))
            .await;

        assert!(matches!(outcome, Ok(WebhookOutcome::NoOp { .. })));
    }

    // ══════════════════════════════════════════════════════════════
    // invoice.*
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn paid_invoice_reactivates_subscription() {
        let h = harness();
        h.handler.process(&checkout(h.user)).await.unwrap();
        h.handler
            .process(&event("invoice.payment_failed", json!({"id": "in_1", "status": "open", "subscription": "sub_1"})))
            .await
            .unwrap();
        assert_eq!(h.store.subscriptions_by_external_id("sub_1")[0].status, SubscriptionStatus::PastDue);

        let paid = event("invoice.paid", json!({"id": "in_1", "status": "paid", "subscription": "sub_1"}));
        h.handler.process(&paid).await.unwrap();
        h.handler.process(&paid).await.unwrap();

        assert_eq!(h.store.subscriptions_by_external_id("sub_1")[0].status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn replayed_payment_failure_stays_past_due() {
        let h = harness();
        h.handler.process(&checkout(h.user)).await.unwrap();
        let failed = event("invoice.payment_failed", json!({"id": "in_1", "status": "open", "subscription": "sub_1"}));

        let first = h.handler.process(&failed).await.unwrap();
        let second = h.handler.process(&failed).await.unwrap();

        assert!(matches!(first, WebhookOutcome::Reconciled { .. }));
        assert!(matches!(second, WebhookOutcome::NoOp { reason: "status already applied", .. }));
        let rows = h.store.subscriptions_by_external_id("sub_1");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, SubscriptionStatus::PastDue);
    }

    #[tokio::test]
    async fn late_invoices_cannot_revive_a_deleted_subscription() {
        let h = harness();
        h.handler.process(&checkout(h.user)).await.unwrap();
        h.handler
            .process(&event("customer.subscription.deleted", subscription_object("canceled", "price_pro_yearly")))
            .await
            .unwrap();

        for ev in [
            event("invoice.paid", json!({"id": "in_1", "status": "paid", "subscription": "sub_1"})),
            event("invoice.payment_failed", json!({"id": "in_2", "status": "open", "subscription": "sub_1"})),
        ] {
            let outcome = h.handler.process(&ev).await.unwrap();
            assert!(matches!(outcome, WebhookOutcome::NoOp { reason: "subscription already ended", .. }));
        }

        assert_eq!(h.store.subscriptions_by_external_id("sub_1")[0].status, SubscriptionStatus::Canceled);
    }

    #[tokio::test]
    async fn unpaid_or_unlinked_invoices_are_ignored() {
        let h = harness();
        h.handler.process(&checkout(h.user)).await.unwrap();

        for object in [
            json!({"id": "in_1", "status": "open", "subscription": "sub_1"}),
            json!({"id": "in_2", "status": "paid"}),
        ] {
            let outcome = h.handler.process(&event("invoice.paid", object)).await.unwrap();
            assert!(matches!(outcome, WebhookOutcome::NoOp { .. }));
        }
    }

    #[tokio::test]
    async fn unknown_event_type_is_acknowledged() {
        let h = harness();

        let outcome = h
            .handler
            .process(&event("customer.created", json!({"id": "cus_9"})))
            .await
            .unwrap();

        assert!(matches!(outcome, WebhookOutcome::Ignored { .. }));
    }
}
