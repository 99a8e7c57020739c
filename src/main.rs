//! tenant-core server binary.
//!
//! Loads configuration from `TENANT_CORE__*` environment variables (and a
//! `.env` file when present), connects to PostgreSQL, applies migrations and
//! serves the HTTP API until Ctrl-C or SIGTERM.

use std::sync::Arc;

use secrecy::SecretString;
use thiserror::Error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tenant_core::adapters::auth::{JwtConfig, JwtSessionValidator};
use tenant_core::adapters::http::{build_router, AppDependencies, BillingAppState, TeamsAppState};
use tenant_core::adapters::postgres::{run_migrations, PostgresBillingStore, PostgresTeamStore};
use tenant_core::adapters::stripe::{StripeBillingAdapter, StripeConfig};
use tenant_core::application::handlers::billing::{AddonPrices, CheckoutUrls, ProcessWebhookHandler};
use tenant_core::config::{AppConfig, ConfigError};
use tenant_core::domain::billing::WebhookVerifier;
use tenant_core::ports::{BillingProvider, BillingStore, SessionValidator, TeamStore};

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migrations failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("server I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!(error = %err, "tenant-core exited with an error");
        eprintln!("tenant-core: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate().map_err(ConfigError::from)?;

    let addr = config.server.socket_addr().map_err(ConfigError::from)?;

    tracing::info!(
        environment = ?config.server.environment,
        stripe_test_mode = config.billing.is_test_mode(),
        "starting tenant-core"
    );

    let pool = config.database.pool_options().connect(&config.database.url).await?;
    if config.database.run_migrations {
        run_migrations(&pool).await?;
        tracing::info!("database migrations applied");
    }

    let team_store: Arc<dyn TeamStore> = Arc::new(PostgresTeamStore::new(pool.clone()));
    let billing_store: Arc<dyn BillingStore> = Arc::new(PostgresBillingStore::new(pool));

    let provider: Arc<dyn BillingProvider> = Arc::new(StripeBillingAdapter::new(
        StripeConfig::new(SecretString::new(config.billing.stripe_api_key.clone()))
            .with_base_url(config.billing.api_base_url.clone()),
    ));

    let sessions: Arc<dyn SessionValidator> = Arc::new(JwtSessionValidator::new(
        JwtConfig::new(
            SecretString::new(config.auth.jwt_secret.clone()),
            config.auth.issuer.clone(),
            config.auth.audience.clone(),
        )
        .with_leeway(config.auth.leeway_secs),
    ));

    let webhook = ProcessWebhookHandler::new(
        WebhookVerifier::new(SecretString::new(config.billing.stripe_webhook_secret.clone())),
        billing_store.clone(),
        provider.clone(),
    );

    let deps = AppDependencies {
        teams: TeamsAppState::new(team_store, config.invitations.expiry_days),
        billing: BillingAppState {
            store: billing_store,
            provider,
            prices: AddonPrices {
                reserved_domain: config.billing.reserved_domain_price_id.clone(),
                custom_domain: config.billing.custom_domain_price_id.clone(),
            },
            checkout_urls: CheckoutUrls::for_frontend(&config.billing.frontend_url),
            webhook: Arc::new(webhook),
        },
        auth: sessions,
    };

    let router = build_router(deps, &config.server);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shut down cleanly");
    Ok(())
}

/// `RUST_LOG` wins over the configured level. Production logs are JSON.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.is_production() {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
