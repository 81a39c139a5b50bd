use dashboard_core::observability::{init_tracing, shutdown_tracing};
use dotenvy::dotenv;
use payout_dashboard::config::get_configuration;
use payout_dashboard::services::metrics::init_metrics;
use payout_dashboard::services::payout_api::PayoutApiClient;
use payout_dashboard::startup::build_router;
use payout_dashboard::AppState;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        "payout-dashboard",
        &configuration.telemetry.log_level,
        configuration.telemetry.otlp_endpoint.as_deref(),
    )?;

    init_metrics()?;

    let api = Arc::new(PayoutApiClient::new(&configuration.api));
    info!(api_base_url = %api.base_url(), "Payout API client configured");

    let app = build_router(AppState::new(api), &configuration.server);

    let address = format!(
        "{}:{}",
        configuration.server.host, configuration.server.port
    );
    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    info!("Starting payout-dashboard on {}", address);
    let served = axum::serve(listener, app).await.map_err(|e| {
        tracing::error!("Server error: {}", e);
        anyhow::anyhow!("Server error: {}", e)
    });

    shutdown_tracing();
    served
}
