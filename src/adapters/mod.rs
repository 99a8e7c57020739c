//! Adapters - Implementations of port interfaces.
//!
//! - `auth` - Bearer token validation (HS256 JWT)
//! - `http` - Axum router, extractors and error rendering
//! - `memory` - In-memory stores for tests and local development
//! - `postgres` - PostgreSQL stores backed by sqlx
//! - `stripe` - Billing provider client and its scripted mock

pub mod auth;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;
