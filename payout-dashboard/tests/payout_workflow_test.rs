//! OPS submits a draft, FINANCE rejects it, and OPS is then blocked from
//! resubmitting, driven through the session store, API client and lifecycle
//! rules against a mock API.

mod common;

use common::*;
use payout_dashboard::lifecycle::{self, ActionAvailability, LifecycleError, PayoutAction};
use payout_dashboard::models::{AuditAction, PayoutStatus, Role};
use payout_dashboard::session::{
    MemoryStorage, SessionContext, SessionStorage, TokenState, TOKEN_KEY,
};
use payout_dashboard::validation::{LoginForm, RejectForm};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn signed_in(
    server: &MockServer,
    email: &str,
) -> (SessionContext<MemoryStorage>, payout_dashboard::models::User) {
    let credentials = LoginForm {
        email: email.to_uppercase(),
        password: PASSWORD.to_string(),
    }
    .parse()
    .unwrap();

    let mut context = SessionContext::new(MemoryStorage::default());
    let user = context
        .login(&api_client(server), &credentials)
        .await
        .unwrap();
    (context, user)
}

#[tokio::test]
async fn submit_then_reject_then_blocked() {
    let server = MockServer::start().await;
    mount_login(&server, OPS_EMAIL, "tok-ops", "OPS").await;
    mount_login(&server, FINANCE_EMAIL, "tok-fin", "FINANCE").await;

    let created = audit_json("a1", "CREATED", OPS_EMAIL, None);
    let submitted = audit_json("a2", "SUBMITTED", OPS_EMAIL, None);
    let rejected = audit_json("a3", "REJECTED", FINANCE_EMAIL, Some("Bad account"));

    // Detail reads return the draft once, then the rejected payout
    Mock::given(method("GET"))
        .and(path("/payouts/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(data(payout_json(
            "p1",
            "Draft",
            vec![created.clone()],
        ))))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/payouts/p1/submit"))
        .and(header("authorization", "Bearer tok-ops"))
        .respond_with(ResponseTemplate::new(200).set_body_json(data(payout_json(
            "p1",
            "Submitted",
            vec![created.clone(), submitted.clone()],
        ))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/payouts/p1/reject"))
        .and(header("authorization", "Bearer tok-fin"))
        .and(body_json(json!({ "decision_reason": "Bad account" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(data(payout_json(
            "p1",
            "Rejected",
            vec![created.clone(), submitted.clone(), rejected.clone()],
        ))))
        .expect(1)
        .mount(&server)
        .await;

    let api = api_client(&server);

    // OPS submits the draft
    let (ops_session, ops) = signed_in(&server, OPS_EMAIL).await;
    assert_eq!(ops.role, Role::Ops);
    let (_, ops_token) = ops_session.authenticated().unwrap();

    let draft = api.get_payout(&ops_token, "p1").await.unwrap();
    let availability = ActionAvailability::for_role(ops.role, draft.status);
    assert!(availability.can_submit);
    assert_eq!(
        lifecycle::authorize(ops.role, draft.status, PayoutAction::Submit),
        Ok(PayoutStatus::Submitted)
    );

    let payout = api.submit_payout(&ops_token, "p1").await.unwrap();
    assert_eq!(payout.status, PayoutStatus::Submitted);
    assert_eq!(
        payout.audit.last().map(|e| e.action),
        Some(PayoutAction::Submit.audit_action())
    );
    assert_eq!(payout.audit.len(), draft.audit.len() + 1);

    // Availability follows the returned status, not the one shown before
    assert!(!ActionAvailability::for_role(ops.role, payout.status).can_submit);

    // FINANCE rejects with a reason
    let (finance_session, finance) = signed_in(&server, FINANCE_EMAIL).await;
    let (_, finance_token) = finance_session.authenticated().unwrap();
    assert!(ActionAvailability::for_role(finance.role, payout.status).can_reject);

    let reason = RejectForm {
        decision_reason: "  Bad account ".into(),
    }
    .parse()
    .unwrap();
    lifecycle::authorize(finance.role, payout.status, PayoutAction::Reject).unwrap();
    let payout = api
        .reject_payout(&finance_token, "p1", &reason)
        .await
        .unwrap();

    assert_eq!(payout.status, PayoutStatus::Rejected);
    assert_eq!(payout.decision_reason(), Some("Bad account"));
    let last = payout.audit.last().unwrap();
    assert_eq!(last.action, AuditAction::Rejected);
    assert_eq!(last.decision_reason(), Some("Bad account"));
    assert_eq!(last.performed_by_email, FINANCE_EMAIL);

    // Refetching returns the status just set
    Mock::given(method("GET"))
        .and(path("/payouts/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(data(payout_json(
            "p1",
            "Rejected",
            vec![created, submitted, rejected],
        ))))
        .expect(2)
        .mount(&server)
        .await;
    let first = api.get_payout(&ops_token, "p1").await.unwrap();
    let second = api.get_payout(&ops_token, "p1").await.unwrap();
    assert_eq!(first.status, PayoutStatus::Rejected);
    assert_eq!(second.status, first.status);

    // OPS can no longer submit; the guard refuses before any request
    let availability = ActionAvailability::for_role(ops.role, first.status);
    assert!(!availability.any());
    assert_eq!(
        lifecycle::authorize(ops.role, first.status, PayoutAction::Submit),
        Err(LifecycleError::WrongStatus {
            action: PayoutAction::Submit,
            status: PayoutStatus::Rejected,
        })
    );
}

#[tokio::test]
async fn failed_login_leaves_session_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "Unauthorized",
            "message": "Invalid email or password"
        })))
        .mount(&server)
        .await;

    let storage = MemoryStorage::default();
    let mut context = SessionContext::new(storage.clone());
    context.hydrate().await.unwrap();

    let credentials = LoginForm {
        email: OPS_EMAIL.into(),
        password: "wrong".into(),
    }
    .parse()
    .unwrap();
    let err = context
        .login(&api_client(&server), &credentials)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Invalid email or password");
    assert!(context.authenticated().is_none());
    assert_eq!(storage.read(TOKEN_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn restored_session_survives_reload() {
    let server = MockServer::start().await;
    mount_login(&server, FINANCE_EMAIL, "tok-fin", "FINANCE").await;

    let (context, user) = signed_in(&server, FINANCE_EMAIL).await;

    let mut reloaded = SessionContext::new(context.storage().clone());
    assert!(matches!(reloaded.token_state(), TokenState::Undetermined));
    assert!(matches!(
        reloaded.hydrate().await.unwrap(),
        TokenState::Present(_)
    ));
    assert_eq!(reloaded.user(), Some(&user));
}
