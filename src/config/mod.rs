//! Application configuration.
//!
//! Values come from environment variables prefixed with `TENANT_CORE`, with
//! `__` separating nested keys. A `.env` file is read first when present.
//!
//! ```no_run
//! use tenant_core::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod auth;
mod billing;
mod database;
mod error;
mod invitations;
mod server;

pub use auth::AuthConfig;
pub use billing::BillingConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use invitations::InvitationConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    pub database: DatabaseConfig,

    pub auth: AuthConfig,

    pub billing: BillingConfig,

    #[serde(default)]
    pub invitations: InvitationConfig,
}

impl AppConfig {
    /// Loads configuration from the environment.
    ///
    /// - `TENANT_CORE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `TENANT_CORE__BILLING__STRIPE_API_KEY=...` -> `billing.stripe_api_key`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required value is missing or cannot be
    /// parsed into its field type.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("TENANT_CORE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Semantic checks across every section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.auth.validate()?;
        self.billing.validate(self.server.environment)?;
        self.invitations.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
