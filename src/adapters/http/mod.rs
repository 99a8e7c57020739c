//! HTTP adapters - REST API implementations.
//!
//! Each area has its own module with `dto`, `handlers` and `routes`;
//! [`router::build_router`] puts them together behind the shared middleware.

pub mod billing;
pub mod error;
pub mod middleware;
pub mod router;
pub mod teams;

pub use billing::BillingAppState;
pub use error::{ApiError, ErrorBody};
pub use router::{build_router, AppDependencies};
pub use teams::TeamsAppState;
