pub mod app;
pub mod auth;
pub mod payouts;
pub mod vendors;

use axum::response::{IntoResponse, Redirect, Response};
use dashboard_core::error::AppError;

use crate::session::AuthUser;

/// Post/redirect/get: queue a banner for the next page and redirect to it.
pub(crate) async fn redirect_with_flash(
    auth: &AuthUser,
    message: impl Into<String>,
    to: &str,
) -> Result<Response, AppError> {
    auth.flash(message).await?;
    Ok(Redirect::to(to).into_response())
}
