use askama::Template;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use dashboard_core::error::AppError;
use tower_sessions::Session;

use crate::session::{take_flash, LoginFailure, SessionContext};
use crate::validation::{FieldErrors, LoginForm};
use crate::AppState;

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub email: String,
    pub errors: FieldErrors,
    pub banner: Option<String>,
}

pub async fn login_page(session: Session) -> Result<Response, AppError> {
    let mut context = SessionContext::new(session);
    context.hydrate().await?;
    if context.authenticated().is_some() {
        return Ok(Redirect::to("/payouts").into_response());
    }

    let banner = take_flash(context.storage()).await?;
    Ok(LoginTemplate {
        email: String::new(),
        errors: FieldErrors::new(),
        banner,
    }
    .into_response())
}

pub async fn login_handler(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let credentials = match form.parse() {
        Ok(credentials) => credentials,
        Err(errors) => {
            return Ok(LoginTemplate {
                email: form.email,
                errors,
                banner: None,
            }
            .into_response());
        }
    };

    // Fresh session id for the authenticated session
    session
        .cycle_id()
        .await
        .map_err(|e| AppError::SessionError(e.to_string()))?;

    let mut context = SessionContext::new(session);
    match context.login(&state.api, &credentials).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, role = %user.role, "User logged in");
            Ok(Redirect::to("/payouts").into_response())
        }
        Err(LoginFailure::Rejected(e)) => {
            tracing::warn!(email = %credentials.email, error = %e, "Login rejected");
            Ok(LoginTemplate {
                email: credentials.email,
                errors: FieldErrors::new(),
                banner: Some(e.to_string()),
            }
            .into_response())
        }
        Err(LoginFailure::Storage(e)) => Err(e.into()),
    }
}

pub async fn logout_handler(session: Session) -> Result<Redirect, AppError> {
    let mut context = SessionContext::new(session);
    context.logout().await?;
    tracing::info!("User logged out");
    Ok(Redirect::to("/login"))
}
