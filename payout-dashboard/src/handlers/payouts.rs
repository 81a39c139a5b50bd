use askama::Template;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Form,
};
use dashboard_core::error::AppError;
use serde::Deserialize;

use super::redirect_with_flash;
use crate::lifecycle::{self, ActionAvailability, PayoutAction};
use crate::models::{Payout, PayoutMode, PayoutStatus, User, Vendor};
use crate::services::metrics::record_action;
use crate::services::payout_api::PayoutFilter;
use crate::session::AuthUser;
use crate::validation::{FieldErrors, PayoutForm, RejectForm};
use crate::AppState;

#[derive(Template)]
#[template(path = "pages/payouts.html")]
pub struct PayoutsTemplate {
    pub user: User,
    pub flash: Option<String>,
    pub current_page: &'static str,
    pub payouts: Vec<Payout>,
    pub vendors: Vec<Vendor>,
    pub statuses: [PayoutStatus; 4],
    pub filter_status: String,
    pub filter_vendor: String,
    pub can_create: bool,
    pub load_error: Option<String>,
}

#[derive(Template)]
#[template(path = "pages/payout_new.html")]
pub struct NewPayoutTemplate {
    pub user: User,
    pub flash: Option<String>,
    pub current_page: &'static str,
    pub vendors: Vec<Vendor>,
    pub modes: [PayoutMode; 3],
    pub form: PayoutForm,
    pub errors: FieldErrors,
}

#[derive(Template)]
#[template(path = "pages/payout_detail.html")]
pub struct PayoutDetailTemplate {
    pub user: User,
    pub flash: Option<String>,
    pub current_page: &'static str,
    pub payout: Payout,
    pub actions: ActionAvailability,
    /// Text typed into the rejection reason box, kept when it is re-shown.
    pub reject_reason: String,
    pub errors: FieldErrors,
}

impl PayoutDetailTemplate {
    pub fn new(user: User, flash: Option<String>, payout: Payout) -> Self {
        Self {
            actions: ActionAvailability::for_role(user.role, payout.status),
            user,
            flash,
            current_page: "payouts",
            payout,
            reject_reason: String::new(),
            errors: FieldErrors::new(),
        }
    }
}

/// Query string of the payout list. Empty values mean "no filter".
#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub vendor_id: Option<String>,
}

impl ListParams {
    pub fn to_filter(&self) -> PayoutFilter {
        let non_empty = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        PayoutFilter {
            status: non_empty(&self.status).and_then(|s| s.parse().ok()),
            vendor_id: non_empty(&self.vendor_id),
        }
    }
}

/// Body of the submit and approve forms: the status the page was showing.
#[derive(Debug, Deserialize)]
pub struct ActionForm {
    #[serde(default)]
    pub expected_status: String,
}

#[derive(Debug, Deserialize)]
pub struct RejectActionForm {
    #[serde(default)]
    pub expected_status: String,
    #[serde(default)]
    pub decision_reason: String,
}

pub async fn list_payouts(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Response, AppError> {
    let flash = auth.take_flash().await?;
    let filter = params.to_filter();

    let (payouts, vendors) = tokio::join!(
        state.api.list_payouts(&auth.token, &filter),
        state.api.list_vendors(&auth.token)
    );

    let (payouts, load_error) = match payouts {
        Ok(payouts) => (payouts, None),
        Err(e) => (Vec::new(), Some(e.to_string())),
    };
    let vendors = vendors.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Vendor filter options unavailable");
        Vec::new()
    });

    Ok(PayoutsTemplate {
        can_create: lifecycle::can_create(auth.user.role),
        user: auth.user,
        flash,
        current_page: "payouts",
        payouts,
        vendors,
        statuses: PayoutStatus::ALL,
        filter_status: filter.status.map(|s| s.to_string()).unwrap_or_default(),
        filter_vendor: filter.vendor_id.unwrap_or_default(),
        load_error,
    }
    .into_response())
}

async fn new_payout_template(
    state: &AppState,
    auth: &AuthUser,
    form: PayoutForm,
) -> NewPayoutTemplate {
    let vendors = match state.api.list_vendors(&auth.token).await {
        Ok(vendors) => vendors.into_iter().filter(|v| v.is_active).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Vendor options unavailable");
            Vec::new()
        }
    };

    NewPayoutTemplate {
        user: auth.user.clone(),
        flash: None,
        current_page: "payouts",
        vendors,
        modes: PayoutMode::ALL,
        form,
        errors: FieldErrors::new(),
    }
}

pub async fn new_payout_page(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Response, AppError> {
    if let Err(e) = lifecycle::authorize_create(auth.user.role) {
        return redirect_with_flash(&auth, e.to_string(), "/payouts").await;
    }

    let flash = auth.take_flash().await?;
    let mut template = new_payout_template(&state, &auth, PayoutForm::default()).await;
    template.flash = flash;
    Ok(template.into_response())
}

pub async fn create_payout(
    State(state): State<AppState>,
    auth: AuthUser,
    Form(form): Form<PayoutForm>,
) -> Result<Response, AppError> {
    if let Err(e) = lifecycle::authorize_create(auth.user.role) {
        record_action("payout_create", "blocked");
        return redirect_with_flash(&auth, e.to_string(), "/payouts").await;
    }

    let request = match form.parse() {
        Ok(request) => request,
        Err(errors) => {
            record_action("payout_create", "invalid");
            let mut template = new_payout_template(&state, &auth, form).await;
            template.errors = errors;
            return Ok(template.into_response());
        }
    };

    let _guard = match state.in_flight.try_begin(&auth.user.id, "payout:new", "create") {
        Ok(guard) => guard,
        Err(conflict) => {
            record_action("payout_create", "blocked");
            let mut template = new_payout_template(&state, &auth, form).await;
            template.flash = Some(conflict.to_string());
            return Ok(template.into_response());
        }
    };

    match state.api.create_payout(&auth.token, &request).await {
        Ok(payout) => {
            record_action("payout_create", "success");
            tracing::info!(
                payout_id = %payout.id,
                user_id = %auth.user.id,
                status = %payout.status,
                "Payout created"
            );
            let detail = format!("/payouts/{}", payout.id);
            redirect_with_flash(&auth, "Payout created as draft", &detail).await
        }
        Err(e) => {
            record_action("payout_create", "error");
            let mut template = new_payout_template(&state, &auth, form).await;
            template.flash = Some(e.to_string());
            Ok(template.into_response())
        }
    }
}

pub async fn payout_detail(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let flash = auth.take_flash().await?;

    match state.api.get_payout(&auth.token, &id).await {
        Ok(payout) => Ok(PayoutDetailTemplate::new(auth.user, flash, payout).into_response()),
        Err(e) => redirect_with_flash(&auth, e.to_string(), "/payouts").await,
    }
}

pub async fn submit_payout(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Form(form): Form<ActionForm>,
) -> Result<Response, AppError> {
    run_action(&state, &auth, &id, PayoutAction::Submit, &form.expected_status, None).await
}

pub async fn approve_payout(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Form(form): Form<ActionForm>,
) -> Result<Response, AppError> {
    run_action(&state, &auth, &id, PayoutAction::Approve, &form.expected_status, None).await
}

pub async fn reject_payout(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Form(form): Form<RejectActionForm>,
) -> Result<Response, AppError> {
    let reason = RejectForm {
        decision_reason: form.decision_reason.clone(),
    }
    .parse();

    match reason {
        Ok(reason) => {
            run_action(
                &state,
                &auth,
                &id,
                PayoutAction::Reject,
                &form.expected_status,
                Some(&reason),
            )
            .await
        }
        Err(errors) => {
            record_action(PayoutAction::Reject.as_str(), "invalid");
            let payout = match state.api.get_payout(&auth.token, &id).await {
                Ok(payout) => payout,
                Err(e) => return redirect_with_flash(&auth, e.to_string(), "/payouts").await,
            };

            let mut template = PayoutDetailTemplate::new(auth.user, None, payout);
            template.reject_reason = form.decision_reason;
            template.errors = errors;
            Ok(template.into_response())
        }
    }
}

/// Guard, send and report one lifecycle action, then return to the detail
/// page. The detail page refetches the payout, so the controls it offers are
/// derived from the status the API now reports.
async fn run_action(
    state: &AppState,
    auth: &AuthUser,
    id: &str,
    action: PayoutAction,
    expected_status: &str,
    decision_reason: Option<&str>,
) -> Result<Response, AppError> {
    let detail = format!("/payouts/{id}");

    let Ok(displayed) = expected_status.parse::<PayoutStatus>() else {
        return redirect_with_flash(auth, "Payout status unknown, please try again", &detail).await;
    };

    // Refused locally: no request reaches the API
    if let Err(e) = lifecycle::authorize(auth.user.role, displayed, action) {
        record_action(action.as_str(), "blocked");
        tracing::info!(
            payout_id = %id,
            user_id = %auth.user.id,
            action = %action,
            reason = %e,
            "Payout action blocked"
        );
        return redirect_with_flash(auth, e.to_string(), &detail).await;
    }

    let _guard = match state.in_flight.try_begin(&auth.user.id, id, action.as_str()) {
        Ok(guard) => guard,
        Err(conflict) => {
            record_action(action.as_str(), "blocked");
            return redirect_with_flash(auth, conflict.to_string(), &detail).await;
        }
    };

    let result = match action {
        PayoutAction::Submit => state.api.submit_payout(&auth.token, id).await,
        PayoutAction::Approve => state.api.approve_payout(&auth.token, id).await,
        PayoutAction::Reject => {
            state
                .api
                .reject_payout(&auth.token, id, decision_reason.unwrap_or_default())
                .await
        }
    };

    match result {
        Ok(payout) => {
            record_action(action.as_str(), "success");
            if payout.status != action.target_status() {
                tracing::warn!(
                    payout_id = %id,
                    expected = %action.target_status(),
                    actual = %payout.status,
                    "Payout API returned an unexpected status"
                );
            }
            tracing::info!(
                payout_id = %id,
                user_id = %auth.user.id,
                action = %action,
                status = %payout.status,
                "Payout action applied"
            );
            redirect_with_flash(auth, format!("Payout {}", payout.status), &detail).await
        }
        Err(e) => {
            record_action(action.as_str(), "error");
            redirect_with_flash(auth, e.to_string(), &detail).await
        }
    }
}
