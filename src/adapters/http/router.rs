//! Assembles the full HTTP application.
//!
//! ```text
//! /health                         public
//! /api/webhooks/stripe            public, signature verified
//! /api/invitations/:token         public preview, token is the credential
//! /api/teams/...                  bearer token
//! /api/invitations/...            bearer token
//! /api/billing/...                bearer token
//! ```

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;

use super::billing::{billing_routes, webhook_routes, BillingAppState};
use super::middleware::{auth_middleware, AuthState};
use super::teams::{invitation_preview_routes, teams_router, TeamsAppState};

/// Everything the routers need, already wired to concrete adapters.
#[derive(Clone)]
pub struct AppDependencies {
    pub teams: TeamsAppState,
    pub billing: BillingAppState,
    pub auth: AuthState,
}

/// Builds the application router with its middleware stack.
pub fn build_router(deps: AppDependencies, server: &ServerConfig) -> Router {
    let authenticated = Router::new()
        .merge(teams_router().with_state(deps.teams.clone()))
        .merge(billing_routes().with_state(deps.billing.clone()))
        .layer(middleware::from_fn_with_state(deps.auth, auth_middleware));

    let api = Router::new()
        .merge(authenticated)
        .merge(invitation_preview_routes().with_state(deps.teams))
        .merge(webhook_routes().with_state(deps.billing));

    let mut router = Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    if let Some(cors) = cors_layer(&server.cors_origins_list()) {
        router = router.layer(cors);
    }

    router
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `None` when no origins are configured, which leaves the API same-origin only.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_origin(AllowOrigin::list(allowed)),
    )
}
