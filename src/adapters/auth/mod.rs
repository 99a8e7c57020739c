//! Authentication adapters implementing the `SessionValidator` port.
//!
//! - `jwt` - HS256 shared-secret tokens from the identity service
//! - `mock` - Fixed token table for tests and local runs

mod jwt;
mod mock;

pub use jwt::{issue_token, Audience, JwtConfig, JwtSessionValidator, SessionClaims};
pub use mock::MockSessionValidator;
