#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response},
    Router,
};
use payout_dashboard::config::ServerSettings;
use payout_dashboard::services::payout_api::PayoutApiClient;
use payout_dashboard::startup::build_router;
use payout_dashboard::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const OPS_EMAIL: &str = "ops@acme.in";
pub const FINANCE_EMAIL: &str = "finance@acme.in";
pub const PASSWORD: &str = "secret";

pub fn api_client(server: &MockServer) -> PayoutApiClient {
    PayoutApiClient::with_client(reqwest::Client::new(), &server.uri())
}

pub fn test_server_settings() -> ServerSettings {
    ServerSettings {
        host: "127.0.0.1".to_string(),
        port: 0,
        secure_cookies: false,
        session_idle_hours: 1,
    }
}

/// Dashboard router talking to the mock API.
pub fn test_router(server: &MockServer) -> Router {
    build_router(
        AppState::new(Arc::new(api_client(server))),
        &test_server_settings(),
    )
}

pub fn user_json(id: &str, email: &str, role: &str) -> Value {
    json!({ "id": id, "email": email, "role": role })
}

pub fn vendor_json(id: &str, name: &str) -> Value {
    json!({
        "_id": id,
        "name": name,
        "upi_id": "acme@upi",
        "bank_account": "001122334455",
        "ifsc": "HDFC0001234",
        "is_active": true,
        "createdAt": "2024-05-01T09:00:00.000Z"
    })
}

pub fn audit_json(id: &str, action: &str, email: &str, reason: Option<&str>) -> Value {
    let mut entry = json!({
        "_id": id,
        "action": action,
        "performed_by_email": email,
        "createdAt": "2024-05-01T10:00:00.000Z"
    });
    if let Some(reason) = reason {
        entry["metadata"] = json!({ "decision_reason": reason });
    }
    entry
}

pub fn payout_json(id: &str, status: &str, audit: Vec<Value>) -> Value {
    let mut payout = json!({
        "_id": id,
        "vendor_id": vendor_json("v1", "Acme Supplies"),
        "amount": 500,
        "mode": "UPI",
        "status": status,
        "createdAt": "2024-05-01T10:00:00.000Z",
        "updatedAt": "2024-05-01T10:00:00.000Z",
        "audit": audit
    });
    if status == "Rejected" {
        payout["decision_reason"] = json!("Bad account");
    }
    payout
}

pub fn data(value: Value) -> Value {
    json!({ "data": value })
}

pub async fn mount_login(server: &MockServer, email: &str, token: &str, role: &str) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({ "email": email, "password": PASSWORD })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": token,
            "user": user_json(&format!("user-{role}"), email, role)
        })))
        .mount(server)
        .await;
}

pub fn form_request(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// `name=value` of the session cookie set on a response.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Sign in through the login form and return the session cookie.
pub async fn sign_in(app: &Router, email: &str) -> String {
    let body = format!("email={}&password={PASSWORD}", email.replace('@', "%40"));
    let response = app
        .clone()
        .oneshot(form_request("/login", &body, None))
        .await
        .unwrap();
    assert_eq!(location(&response), Some("/payouts"));
    session_cookie(&response).expect("login sets a session cookie")
}
