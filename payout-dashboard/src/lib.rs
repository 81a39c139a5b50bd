pub mod config;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod services;
pub mod session;
pub mod startup;
pub mod validation;

use services::{in_flight::InFlightActions, payout_api::PayoutApiClient};
use std::sync::Arc;

/// Shared application state: the payout API client and the in-flight action registry.
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<PayoutApiClient>,
    pub in_flight: InFlightActions,
}

impl AppState {
    pub fn new(api: Arc<PayoutApiClient>) -> Self {
        Self {
            api,
            in_flight: InFlightActions::default(),
        }
    }
}
