//! Signed webhook deliveries and add-on management, end to end.
//!
//! Every delivery goes through signature verification exactly as it arrives
//! over HTTP: raw bytes plus the signature header.

use std::sync::Arc;

use secrecy::SecretString;
use serde_json::{json, Value};
use uuid::Uuid;

use tenant_core::adapters::memory::InMemoryStore;
use tenant_core::adapters::stripe::MockBillingProvider;
use tenant_core::application::{
    AddAddonCommand, AddAddonHandler, AddonPrices, GetSubscriptionHandler, GetSubscriptionQuery,
    ProcessWebhookCommand, ProcessWebhookHandler, RemoveAddonCommand, RemoveAddonHandler, WebhookOutcome,
};
use tenant_core::domain::billing::{
    sign_payload, AddonType, BillingError, Plan, SubscriptionStatus, WebhookError, WebhookVerifier,
};
use tenant_core::domain::foundation::{Email, PlanId, UserId};
use tenant_core::ports::ProviderSubscription;

const SECRET: &str = "whsec_integration";
const PERIOD_START: i64 = 1_700_000_000;
const PERIOD_END: i64 = 1_702_592_000;

// =============================================================================
// Test Infrastructure
// =============================================================================

struct Billing {
    store: InMemoryStore,
    provider: MockBillingProvider,
    webhooks: ProcessWebhookHandler,
    user: UserId,
}

fn plan(id: &str, monthly: &str) -> Plan {
    Plan {
        id: PlanId::new(id).unwrap(),
        name: id.to_uppercase(),
        monthly_price_id: monthly.to_string(),
        yearly_price_id: None,
        active: true,
    }
}

fn billing() -> Billing {
    let store = InMemoryStore::new();
    let provider = MockBillingProvider::new();
    let user = UserId::new();
    store.register_user(user, Email::new("payer@example.com").unwrap());
    store.add_plan(plan("pro", "price_pro"));
    store.add_plan(plan("team", "price_team"));
    provider.add_subscription(ProviderSubscription {
        id: "sub_live".into(),
        customer_id: "cus_live".into(),
        status: SubscriptionStatus::Active,
        current_period_start: PERIOD_START,
        current_period_end: PERIOD_END,
        cancel_at_period_end: false,
        price_id: Some("price_pro".into()),
    });

    let webhooks = ProcessWebhookHandler::new(
        WebhookVerifier::new(SecretString::new(SECRET.to_string())),
        Arc::new(store.clone()),
        Arc::new(provider.clone()),
    );

    Billing {
        store,
        provider,
        webhooks,
        user,
    }
}

fn delivery(id: &str, event_type: &str, object: Value) -> ProcessWebhookCommand {
    let payload = json!({
        "id": id,
        "type": event_type,
        "created": PERIOD_START,
        "data": {"object": object},
        "livemode": false
    })
    .to_string()
    .into_bytes();
    let signature = sign_payload(SECRET, chrono::Utc::now().timestamp(), &payload);
    ProcessWebhookCommand { payload, signature }
}

fn subscription_object(status: &str, price: &str) -> Value {
    json!({
        "id": "sub_live",
        "status": status,
        "current_period_start": PERIOD_START,
        "current_period_end": PERIOD_END,
        "cancel_at_period_end": false,
        "items": {"data": [{"id": "si_base", "price": {"id": price}}]}
    })
}

impl Billing {
    fn checkout(&self) -> ProcessWebhookCommand {
        delivery(
            "evt_checkout",
            "checkout.session.completed",
            json!({
                "id": "cs_1",
                "client_reference_id": self.user.to_string(),
                "customer": "cus_live",
                "subscription": "sub_live"
            }),
        )
    }

    fn status(&self) -> SubscriptionStatus {
        let rows = self.store.subscriptions_by_external_id("sub_live");
        assert_eq!(rows.len(), 1, "expected exactly one local subscription row");
        rows[0].status.clone()
    }

    fn prices() -> AddonPrices {
        AddonPrices {
            reserved_domain: Some("price_reserved".into()),
            custom_domain: Some("price_custom".into()),
        }
    }
}

// =============================================================================
// Subscription lifecycle
// =============================================================================

#[tokio::test]
async fn subscription_follows_provider_events() {
    let b = billing();

    b.webhooks.handle(b.checkout()).await.unwrap();
    assert_eq!(b.status(), SubscriptionStatus::Active);
    assert_eq!(b.store.customer_id(&b.user).as_deref(), Some("cus_live"));

    b.webhooks
        .handle(delivery("evt_fail", "invoice.payment_failed", json!({"id": "in_1", "subscription": "sub_live"})))
        .await
        .unwrap();
    assert_eq!(b.status(), SubscriptionStatus::PastDue);

    b.webhooks
        .handle(delivery(
            "evt_paid",
            "invoice.paid",
            json!({"id": "in_2", "subscription": "sub_live", "paid": true, "status": "paid"}),
        ))
        .await
        .unwrap();
    assert_eq!(b.status(), SubscriptionStatus::Active);

    b.webhooks
        .handle(delivery(
            "evt_upgrade",
            "customer.subscription.updated",
            subscription_object("active", "price_team"),
        ))
        .await
        .unwrap();
    let upgraded = &b.store.subscriptions_by_external_id("sub_live")[0];
    assert_eq!(upgraded.plan_id.as_str(), "team");

    b.webhooks
        .handle(delivery(
            "evt_deleted",
            "customer.subscription.deleted",
            subscription_object("canceled", "price_team"),
        ))
        .await
        .unwrap();
    assert_eq!(b.status(), SubscriptionStatus::Canceled);
}

#[tokio::test]
async fn redelivered_checkout_keeps_one_row() {
    let b = billing();

    b.webhooks.handle(b.checkout()).await.unwrap();
    let first_id = b.store.subscriptions_by_external_id("sub_live")[0].id;
    b.webhooks.handle(b.checkout()).await.unwrap();

    let rows = b.store.subscriptions_by_external_id("sub_live");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, first_id);
}

#[tokio::test]
async fn redelivered_checkout_mirrors_the_latest_provider_detail() {
    let b = billing();
    b.webhooks.handle(b.checkout()).await.unwrap();
    let first_id = b.store.subscriptions_by_external_id("sub_live")[0].id;

    b.provider.add_subscription(ProviderSubscription {
        id: "sub_live".into(),
        customer_id: "cus_live".into(),
        status: SubscriptionStatus::Trialing,
        current_period_start: PERIOD_END,
        current_period_end: PERIOD_END + 86_400,
        cancel_at_period_end: true,
        price_id: Some("price_team".into()),
    });
    b.webhooks.handle(b.checkout()).await.unwrap();

    let rows = b.store.subscriptions_by_external_id("sub_live");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, first_id);
    assert_eq!(rows[0].status, SubscriptionStatus::Trialing);
    assert_eq!(rows[0].plan_id.as_str(), "team");
    assert_eq!(rows[0].current_period_start.as_unix_secs(), PERIOD_END);
    assert_eq!(rows[0].current_period_end.as_unix_secs(), PERIOD_END + 86_400);
    assert!(rows[0].cancel_at_period_end);
}

#[tokio::test]
async fn replayed_payment_failure_is_harmless() {
    let b = billing();
    b.webhooks.handle(b.checkout()).await.unwrap();
    let failed = || delivery("evt_fail", "invoice.payment_failed", json!({"id": "in_1", "subscription": "sub_live"}));

    b.webhooks.handle(failed()).await.unwrap();
    b.webhooks.handle(failed()).await.unwrap();

    assert_eq!(b.status(), SubscriptionStatus::PastDue);
}

#[tokio::test]
async fn events_arriving_after_deletion_do_not_revive_the_subscription() {
    let b = billing();
    b.webhooks.handle(b.checkout()).await.unwrap();
    b.webhooks
        .handle(delivery(
            "evt_deleted",
            "customer.subscription.deleted",
            subscription_object("canceled", "price_pro"),
        ))
        .await
        .unwrap();

    let late = [
        delivery(
            "evt_paid",
            "invoice.paid",
            json!({"id": "in_2", "subscription": "sub_live", "status": "paid"}),
        ),
        delivery("evt_fail", "invoice.payment_failed", json!({"id": "in_3", "subscription": "sub_live"})),
        delivery(
            "evt_stale_update",
            "customer.subscription.updated",
            subscription_object("active", "price_team"),
        ),
    ];
    for cmd in late {
        let outcome = b.webhooks.handle(cmd).await.unwrap();
        assert!(matches!(outcome, WebhookOutcome::NoOp { .. }));
        assert_eq!(b.status(), SubscriptionStatus::Canceled);
    }

    b.webhooks.handle(b.checkout()).await.unwrap();
    assert_eq!(b.status(), SubscriptionStatus::Canceled);
    assert_eq!(b.store.subscriptions_by_external_id("sub_live")[0].plan_id.as_str(), "pro");
}

#[tokio::test]
async fn update_for_untracked_subscription_is_acknowledged_noop() {
    let b = billing();

    let outcome = b
        .webhooks
        .handle(delivery(
            "evt_orphan",
            "customer.subscription.updated",
            subscription_object("active", "price_pro"),
        ))
        .await
        .unwrap();

    assert!(matches!(outcome, WebhookOutcome::NoOp { .. }));
    assert!(b.store.subscriptions_by_external_id("sub_live").is_empty());
}

#[tokio::test]
async fn checkout_for_unknown_price_fails_loudly_and_writes_nothing() {
    let b = billing();
    b.provider.add_subscription(ProviderSubscription {
        id: "sub_live".into(),
        customer_id: "cus_live".into(),
        status: SubscriptionStatus::Active,
        current_period_start: PERIOD_START,
        current_period_end: PERIOD_END,
        cancel_at_period_end: false,
        price_id: Some("price_legacy".into()),
    });

    let err = b.webhooks.handle(b.checkout()).await.unwrap_err();

    assert!(matches!(err, WebhookError::DataIntegrity(_)));
    assert!(err.status_code().is_server_error());
    assert!(b.store.subscriptions_by_external_id("sub_live").is_empty());
    assert!(b.store.customer_id(&b.user).is_none());
}

#[tokio::test]
async fn tampered_delivery_is_rejected_before_any_read() {
    let b = billing();
    let mut cmd = b.checkout();
    cmd.payload.extend_from_slice(b" ");

    let err = b.webhooks.handle(cmd).await.unwrap_err();

    assert_eq!(err, WebhookError::InvalidSignature);
    assert_eq!(b.provider.call_count("get_subscription"), 0);
}

// =============================================================================
// Add-ons
// =============================================================================

#[tokio::test]
async fn addon_lifecycle_after_checkout() {
    let b = billing();
    b.webhooks.handle(b.checkout()).await.unwrap();

    let store = Arc::new(b.store.clone());
    let provider = Arc::new(b.provider.clone());
    let add = AddAddonHandler::new(store.clone(), provider.clone(), Billing::prices());
    let remove = RemoveAddonHandler::new(store.clone(), provider.clone());
    let get = GetSubscriptionHandler::new(store.clone());
    let domain = Uuid::new_v4();

    let added = add
        .handle(AddAddonCommand {
            user_id: b.user,
            item_type: AddonType::CustomDomain,
            resource_id: Some(domain),
        })
        .await
        .unwrap();
    assert_eq!(added.item.external_price_id, "price_custom");
    assert!(b.provider.has_item(&added.item.external_item_id));

    let duplicate = add
        .handle(AddAddonCommand {
            user_id: b.user,
            item_type: AddonType::CustomDomain,
            resource_id: Some(domain),
        })
        .await
        .unwrap_err();
    assert_eq!(duplicate, BillingError::AddonExists(AddonType::CustomDomain));

    let view = get.handle(GetSubscriptionQuery { user_id: b.user }).await.unwrap();
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.subscription.external_id, "sub_live");

    remove
        .handle(RemoveAddonCommand {
            user_id: b.user,
            resource_id: domain,
        })
        .await
        .unwrap();
    assert!(!b.provider.has_item(&added.item.external_item_id));

    let gone = remove
        .handle(RemoveAddonCommand {
            user_id: b.user,
            resource_id: domain,
        })
        .await
        .unwrap_err();
    assert_eq!(gone, BillingError::AddonNotFound);

    let view = get.handle(GetSubscriptionQuery { user_id: b.user }).await.unwrap();
    assert!(view.items.is_empty());
}

#[tokio::test]
async fn addons_require_an_active_subscription() {
    let b = billing();
    let add = AddAddonHandler::new(Arc::new(b.store.clone()), Arc::new(b.provider.clone()), Billing::prices());

    let err = add
        .handle(AddAddonCommand {
            user_id: b.user,
            item_type: AddonType::ReservedDomain,
            resource_id: Some(Uuid::new_v4()),
        })
        .await
        .unwrap_err();

    assert_eq!(err, BillingError::NoActiveSubscription(b.user));
    assert_eq!(b.provider.call_count("create_subscription_item"), 0);
}
