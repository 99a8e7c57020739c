//! HTTP surface end to end: signed webhook in, subscription and add-ons out.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use tenant_core::adapters::auth::MockSessionValidator;
use tenant_core::adapters::http::{build_router, AppDependencies, BillingAppState, TeamsAppState};
use tenant_core::adapters::memory::InMemoryStore;
use tenant_core::adapters::stripe::MockBillingProvider;
use tenant_core::application::{AddonPrices, CheckoutUrls, ProcessWebhookHandler};
use tenant_core::config::ServerConfig;
use tenant_core::domain::billing::{sign_payload, Plan, SubscriptionStatus, WebhookVerifier};
use tenant_core::domain::foundation::PlanId;
use tenant_core::ports::ProviderSubscription;

const SECRET: &str = "whsec_http_api";

fn app() -> (Router, Arc<MockSessionValidator>, InMemoryStore) {
    let store = InMemoryStore::new();
    store.add_plan(Plan {
        id: PlanId::new("pro").unwrap(),
        name: "Pro".into(),
        monthly_price_id: "price_pro".into(),
        yearly_price_id: None,
        active: true,
    });

    let provider = Arc::new(MockBillingProvider::new());
    provider.add_subscription(ProviderSubscription {
        id: "sub_http".into(),
        customer_id: "cus_http".into(),
        status: SubscriptionStatus::Active,
        current_period_start: 1_700_000_000,
        current_period_end: 1_702_592_000,
        cancel_at_period_end: false,
        price_id: Some("price_pro".into()),
    });
    let sessions = Arc::new(MockSessionValidator::new());

    let webhook = ProcessWebhookHandler::new(
        WebhookVerifier::new(SecretString::new(SECRET.to_string())),
        Arc::new(store.clone()),
        provider.clone(),
    );
    let deps = AppDependencies {
        teams: TeamsAppState::new(Arc::new(store.clone()), 7),
        billing: BillingAppState {
            store: Arc::new(store.clone()),
            provider,
            prices: AddonPrices {
                reserved_domain: Some("price_reserved".into()),
                custom_domain: Some("price_custom".into()),
            },
            checkout_urls: CheckoutUrls::for_frontend("https://app.example.com"),
            webhook: Arc::new(webhook),
        },
        auth: sessions.clone(),
    };

    (build_router(deps, &ServerConfig::default()), sessions, store)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn authed(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json");
    match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn checkout_webhook_then_manage_addons() {
    let (router, sessions, store) = app();
    let payer = sessions.issue("payer-token", "payer@example.com").unwrap();
    store.register_user(payer.id, payer.email.clone());

    let payload = json!({
        "id": "evt_http_checkout",
        "type": "checkout.session.completed",
        "created": 1_700_000_000,
        "data": {"object": {
            "id": "cs_http",
            "client_reference_id": payer.id.to_string(),
            "customer": "cus_http",
            "subscription": "sub_http"
        }},
        "livemode": false
    })
    .to_string()
    .into_bytes();
    let signature = sign_payload(SECRET, chrono::Utc::now().timestamp(), &payload);
    let webhook = Request::post("/api/webhooks/stripe")
        .header("Stripe-Signature", signature)
        .body(Body::from(payload))
        .unwrap();

    let (status, ack) = send(&router, webhook).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, json!({"received": true}));

    let (status, view) = send(&router, authed("GET", "/api/billing/subscription", "payer-token", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["subscription"]["external_id"], "sub_http");
    assert_eq!(view["subscription"]["status"], "active");
    assert_eq!(view["items"].as_array().unwrap().len(), 0);

    let domain = Uuid::new_v4();
    let add = json!({"item_type": "reserved_domain", "resource_id": domain});
    let (status, added) = send(&router, authed("POST", "/api/billing/addons", "payer-token", Some(add.clone()))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(added["item"]["external_price_id"], "price_reserved");

    let (status, _) = send(&router, authed("POST", "/api/billing/addons", "payer-token", Some(add))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let uri = format!("/api/billing/addons/{}", domain);
    let (status, _) = send(&router, authed("DELETE", &uri, "payer-token", None)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&router, authed("DELETE", &uri, "payer-token", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stale_webhook_signature_is_a_client_error() {
    let (router, _, store) = app();
    let payload = br#"{"id":"evt_old","type":"invoice.paid","created":0,"data":{"object":{"id":"in_1"}}}"#.to_vec();
    let signature = sign_payload(SECRET, chrono::Utc::now().timestamp() - 3600, &payload);

    let request = Request::post("/api/webhooks/stripe")
        .header("Stripe-Signature", signature)
        .body(Body::from(payload))
        .unwrap();
    let (status, body) = send(&router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_SIGNATURE");
    assert!(store.subscriptions_by_external_id("sub_http").is_empty());
}

#[tokio::test]
async fn checkout_session_for_a_plan() {
    let (router, sessions, store) = app();
    let payer = sessions.issue("payer-token", "payer@example.com").unwrap();
    store.register_user(payer.id, payer.email.clone());

    let (status, session) = send(
        &router,
        authed("POST", "/api/billing/checkout", "payer-token", Some(json!({"plan_id": "pro"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["session_id"], "cs_mock_1");
    assert!(session["url"].as_str().unwrap().starts_with("https://"));

    let (status, _) = send(
        &router,
        authed(
            "POST",
            "/api/billing/checkout",
            "payer-token",
            Some(json!({"plan_id": "pro", "is_yearly": true})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &router,
        authed("POST", "/api/billing/checkout", "payer-token", Some(json!({"plan_id": "enterprise"}))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "PLAN_NOT_FOUND");
}
