//! Client for the payout REST API.
//!
//! Every call except login carries the bearer token. Non-2xx responses never
//! surface as transport failures: they resolve to [`ApiError::Rejected`] built
//! from the `{error, message?}` body. No retries, no caching.

use axum::body::Bytes;
use dashboard_core::observability::{TracedClientExt, TracedRequest};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ApiSettings;
use crate::lifecycle::PayoutAction;
use crate::models::{Payout, PayoutStatus, User, Vendor};
use crate::validation::{NewPayout, VendorInput};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The API answered with a non-2xx status.
    #[error("{message}")]
    Rejected {
        status: StatusCode,
        kind: String,
        message: String,
    },

    #[error("Could not reach the payout service: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response from the payout service: {0}")]
    Decode(String),
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiError {
    /// Build the error for a non-2xx response. The body's `message` is
    /// preferred, then `error`, then a generic fallback.
    pub fn from_response_body(status: StatusCode, body: &[u8]) -> Self {
        let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
        let kind = parsed
            .error
            .clone()
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| "Error".to_string());
        let message = parsed
            .message
            .filter(|m| !m.is_empty())
            .or(parsed.error.filter(|e| !e.is_empty()))
            .unwrap_or_else(|| {
                format!(
                    "Request failed ({})",
                    status.canonical_reason().unwrap_or(status.as_str())
                )
            });

        ApiError::Rejected {
            status,
            kind,
            message,
        }
    }

    pub fn not_found(message: &str) -> Self {
        ApiError::Rejected {
            status: StatusCode::NOT_FOUND,
            kind: "Not found".to_string(),
            message: message.to_string(),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status(),
            ApiError::Decode(_) => None,
        }
    }

    /// Short error category for logs and metrics.
    pub fn kind(&self) -> &str {
        match self {
            ApiError::Rejected { kind, .. } => kind,
            ApiError::Transport(_) => "transport",
            ApiError::Decode(_) => "decode",
        }
    }
}

/// Success bodies are `{data: ...}`.
#[derive(Debug, Deserialize)]
struct Data<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: Secret<String>,
    pub user: User,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RejectRequest<'a> {
    decision_reason: &'a str,
}

/// Query for `GET /payouts`. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PayoutFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PayoutStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,
}

pub struct PayoutApiClient {
    client: Client,
    base_url: String,
}

fn decode<T: DeserializeOwned>(body: &[u8], path: &str) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::error!(path = %path, error = %e, "Unreadable payout API response");
        ApiError::Decode(e.to_string())
    })
}

impl PayoutApiClient {
    pub fn new(settings: &ApiSettings) -> Self {
        Self::with_client(Client::new(), &settings.base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send the request and return the success body, or the API's error.
    async fn fetch(&self, request: TracedRequest, path: &str) -> ApiResult<Bytes> {
        let response = request.send().await.map_err(|e| {
            tracing::error!(path = %path, error = %e, "Payout API request failed");
            ApiError::Transport(e)
        })?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let error = ApiError::from_response_body(status, &body);
            tracing::warn!(
                path = %path,
                status = status.as_u16(),
                kind = %error.kind(),
                "Payout API rejected request"
            );
            return Err(error);
        }
        Ok(body)
    }

    async fn send<T: DeserializeOwned>(&self, request: TracedRequest, path: &str) -> ApiResult<T> {
        let body = self.fetch(request, path).await?;
        decode::<Data<T>>(&body, path).map(|wrapped| wrapped.data)
    }

    /// Like `send`, for endpoints whose success body carries nothing we need.
    async fn send_discarding(&self, request: TracedRequest, path: &str) -> ApiResult<()> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.bytes().await?;
        let error = ApiError::from_response_body(status, &body);
        tracing::warn!(
            path = %path,
            status = status.as_u16(),
            kind = %error.kind(),
            "Payout API rejected request"
        );
        Err(error)
    }

    /// Exchange credentials for a token. The login body is accepted both bare
    /// (`{token, user}`) and wrapped in `{data}`.
    pub async fn login(&self, email: &str, password: &Secret<String>) -> ApiResult<LoginResponse> {
        let path = "/auth/login";
        let request = self.client.traced_post(&self.url(path)).json(&LoginRequest {
            email,
            password: password.expose_secret(),
        });
        let body = self.fetch(request, path).await?;

        match serde_json::from_slice::<Data<LoginResponse>>(&body) {
            Ok(wrapped) => Ok(wrapped.data),
            Err(_) => decode::<LoginResponse>(&body, path),
        }
    }

    pub async fn list_vendors(&self, token: &Secret<String>) -> ApiResult<Vec<Vendor>> {
        let path = "/vendors";
        let request = self
            .client
            .traced_get(&self.url(path))
            .bearer_auth(token.expose_secret());
        self.send(request, path).await
    }

    /// Find one vendor. The API has no single-vendor read, so this scans the list.
    pub async fn get_vendor(&self, token: &Secret<String>, id: &str) -> ApiResult<Vendor> {
        self.list_vendors(token)
            .await?
            .into_iter()
            .find(|vendor| vendor.id == id)
            .ok_or_else(|| ApiError::not_found("Vendor not found"))
    }

    pub async fn create_vendor(
        &self,
        token: &Secret<String>,
        vendor: &VendorInput,
    ) -> ApiResult<Vendor> {
        let path = "/vendors";
        let request = self
            .client
            .traced_post(&self.url(path))
            .bearer_auth(token.expose_secret())
            .json(vendor);
        self.send(request, path).await
    }

    pub async fn update_vendor(
        &self,
        token: &Secret<String>,
        id: &str,
        vendor: &VendorInput,
    ) -> ApiResult<Vendor> {
        let path = format!("/vendors/{id}");
        let request = self
            .client
            .traced_put(&self.url(&path))
            .bearer_auth(token.expose_secret())
            .json(vendor);
        self.send(request, &path).await
    }

    pub async fn delete_vendor(&self, token: &Secret<String>, id: &str) -> ApiResult<()> {
        let path = format!("/vendors/{id}");
        let request = self
            .client
            .traced_delete(&self.url(&path))
            .bearer_auth(token.expose_secret());
        self.send_discarding(request, &path).await
    }

    pub async fn list_payouts(
        &self,
        token: &Secret<String>,
        filter: &PayoutFilter,
    ) -> ApiResult<Vec<Payout>> {
        let path = "/payouts";
        let request = self
            .client
            .traced_get(&self.url(path))
            .bearer_auth(token.expose_secret())
            .query(filter);
        self.send(request, path).await
    }

    /// Payout detail, including the audit trail.
    pub async fn get_payout(&self, token: &Secret<String>, id: &str) -> ApiResult<Payout> {
        let path = format!("/payouts/{id}");
        let request = self
            .client
            .traced_get(&self.url(&path))
            .bearer_auth(token.expose_secret());
        self.send(request, &path).await
    }

    /// Create a payout. The API always creates it as a draft.
    pub async fn create_payout(
        &self,
        token: &Secret<String>,
        payout: &NewPayout,
    ) -> ApiResult<Payout> {
        let path = "/payouts";
        let request = self
            .client
            .traced_post(&self.url(path))
            .bearer_auth(token.expose_secret())
            .json(payout);
        self.send(request, path).await
    }

    pub async fn submit_payout(&self, token: &Secret<String>, id: &str) -> ApiResult<Payout> {
        self.transition(token, id, PayoutAction::Submit, None).await
    }

    pub async fn approve_payout(&self, token: &Secret<String>, id: &str) -> ApiResult<Payout> {
        self.transition(token, id, PayoutAction::Approve, None).await
    }

    pub async fn reject_payout(
        &self,
        token: &Secret<String>,
        id: &str,
        decision_reason: &str,
    ) -> ApiResult<Payout> {
        self.transition(token, id, PayoutAction::Reject, Some(decision_reason))
            .await
    }

    async fn transition(
        &self,
        token: &Secret<String>,
        id: &str,
        action: PayoutAction,
        decision_reason: Option<&str>,
    ) -> ApiResult<Payout> {
        let path = format!("/payouts/{id}/{}", action.as_str());
        let mut request = self
            .client
            .traced_post(&self.url(&path))
            .bearer_auth(token.expose_secret());
        if let Some(decision_reason) = decision_reason {
            request = request.json(&RejectRequest { decision_reason });
        }
        self.send(request, &path).await
    }
}
