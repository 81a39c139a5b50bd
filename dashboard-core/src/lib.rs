//! dashboard-core: shared HTTP and observability plumbing for the payout dashboard.
pub mod error;
pub mod middleware;
pub mod observability;

pub use axum;
pub use tracing;
