use axum::response::Redirect;
use dashboard_core::error::AppError;
use tower_sessions::Session;

use crate::session::SessionContext;

/// Send signed-in users to their payouts and everyone else to the login form.
pub async fn index(session: Session) -> Result<Redirect, AppError> {
    let mut context = SessionContext::new(session);
    context.hydrate().await?;

    Ok(match context.authenticated() {
        Some(_) => Redirect::to("/payouts"),
        None => Redirect::to("/login"),
    })
}

pub async fn health_check() -> &'static str {
    "OK"
}

/// Prometheus scrape endpoint.
pub async fn metrics() -> String {
    crate::services::metrics::get_metrics()
}
