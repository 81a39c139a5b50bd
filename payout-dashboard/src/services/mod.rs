pub mod in_flight;
pub mod metrics;
pub mod payout_api;
