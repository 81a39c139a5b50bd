use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use dashboard_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use time::Duration;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::ServerSettings;
use crate::handlers::{
    app::{health_check, index, metrics},
    auth::{login_handler, login_page, logout_handler},
    payouts::{
        approve_payout, create_payout, list_payouts, new_payout_page, payout_detail,
        reject_payout, submit_payout,
    },
    vendors::{create_vendor, delete_vendor, edit_vendor_page, list_vendors, new_vendor_page, update_vendor},
};
use crate::AppState;

pub fn build_router(state: AppState, server: &ServerSettings) -> Router {
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(server.secure_cookies)
        .with_expiry(Expiry::OnInactivity(Duration::hours(
            server.session_idle_hours,
        )));

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/login", get(login_page).post(login_handler))
        .route("/logout", post(logout_handler))
        .route("/vendors", get(list_vendors).post(create_vendor))
        .route("/vendors/new", get(new_vendor_page))
        .route("/vendors/:id", post(update_vendor))
        .route("/vendors/:id/edit", get(edit_vendor_page))
        .route("/vendors/:id/delete", post(delete_vendor))
        .route("/payouts", get(list_payouts).post(create_payout))
        .route("/payouts/new", get(new_payout_page))
        .route("/payouts/:id", get(payout_detail))
        .route("/payouts/:id/submit", post(submit_payout))
        .route("/payouts/:id/approve", post(approve_payout))
        .route("/payouts/:id/reject", post(reject_payout))
        .layer(session_layer)
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
