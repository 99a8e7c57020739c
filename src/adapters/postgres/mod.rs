//! PostgreSQL adapters for the storage ports.
//!
//! - `PostgresTeamStore` - teams, memberships and invitations
//! - `PostgresBillingStore` - plans, subscriptions and add-on items
//!
//! Schema lives in `migrations/` and is applied with [`run_migrations`].

mod billing_store;
mod rows;
mod team_store;

pub use billing_store::{PostgresBillingStore, PostgresBillingTransaction};
pub use team_store::{PostgresTeamStore, PostgresTeamTransaction};

use sqlx::PgPool;

/// Applies pending migrations from `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
