use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Failures that end an HTTP request without a rendered page.
///
/// Upstream API failures are shown to the operator as a banner; this type
/// covers what is left: a broken session store and unexpected internal errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let status = self.status();
        let error = match self {
            AppError::SessionError(msg) => {
                tracing::error!(error = %msg, "Session storage failure");
                "Session error"
            }
            AppError::InternalError(err) => {
                tracing::error!(error = ?err, "Internal error");
                "Internal server error"
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: error.to_string(),
            }),
        )
            .into_response()
    }
}
