//! Vendor pages. Any signed-in role may manage vendors; the API decides
//! whether a mutation is allowed.

use askama::Template;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Form,
};
use dashboard_core::error::AppError;
use serde::Deserialize;

use super::redirect_with_flash;
use crate::models::{User, Vendor};
use crate::services::metrics::record_action;
use crate::session::AuthUser;
use crate::validation::{FieldErrors, VendorForm};
use crate::AppState;

#[derive(Template)]
#[template(path = "pages/vendors.html")]
pub struct VendorsTemplate {
    pub user: User,
    pub flash: Option<String>,
    pub current_page: &'static str,
    pub vendors: Vec<Vendor>,
    pub search: String,
    pub load_error: Option<String>,
}

/// `?q=` on the vendor list: a case-insensitive match on the vendor name.
#[derive(Debug, Deserialize, Default)]
pub struct VendorSearch {
    #[serde(default)]
    pub q: Option<String>,
}

impl VendorSearch {
    pub fn term(&self) -> &str {
        self.q.as_deref().map(str::trim).unwrap_or_default()
    }

    pub fn matches(&self, vendor: &Vendor) -> bool {
        let term = self.term();
        term.is_empty() || vendor.name.to_lowercase().contains(&term.to_lowercase())
    }
}

#[derive(Template)]
#[template(path = "pages/vendor_form.html")]
pub struct VendorFormTemplate {
    pub user: User,
    pub flash: Option<String>,
    pub current_page: &'static str,
    /// Set when editing an existing vendor.
    pub vendor_id: Option<String>,
    pub form: VendorForm,
    pub errors: FieldErrors,
}

impl VendorFormTemplate {
    fn new(auth: &AuthUser, vendor_id: Option<String>, form: VendorForm) -> Self {
        Self {
            user: auth.user.clone(),
            flash: None,
            current_page: "vendors",
            vendor_id,
            form,
            errors: FieldErrors::new(),
        }
    }

    fn with_errors(mut self, errors: FieldErrors) -> Self {
        self.errors = errors;
        self
    }

    fn with_banner(mut self, message: impl Into<String>) -> Self {
        self.flash = Some(message.into());
        self
    }

    /// Where the form posts to.
    pub fn action(&self) -> String {
        match &self.vendor_id {
            Some(id) => format!("/vendors/{id}"),
            None => "/vendors".to_string(),
        }
    }
}

pub async fn list_vendors(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(search): Query<VendorSearch>,
) -> Result<Response, AppError> {
    let flash = auth.take_flash().await?;

    let (vendors, load_error) = match state.api.list_vendors(&auth.token).await {
        Ok(vendors) => (
            vendors.into_iter().filter(|v| search.matches(v)).collect(),
            None,
        ),
        Err(e) => (Vec::new(), Some(e.to_string())),
    };

    Ok(VendorsTemplate {
        user: auth.user,
        flash,
        current_page: "vendors",
        vendors,
        search: search.term().to_string(),
        load_error,
    }
    .into_response())
}

pub async fn new_vendor_page(auth: AuthUser) -> Result<Response, AppError> {
    let flash = auth.take_flash().await?;
    let mut template = VendorFormTemplate::new(&auth, None, VendorForm::default());
    template.flash = flash;
    Ok(template.into_response())
}

pub async fn create_vendor(
    State(state): State<AppState>,
    auth: AuthUser,
    Form(form): Form<VendorForm>,
) -> Result<Response, AppError> {
    let input = match form.parse() {
        Ok(input) => input,
        Err(errors) => {
            record_action("vendor_create", "invalid");
            return Ok(VendorFormTemplate::new(&auth, None, form)
                .with_errors(errors)
                .into_response());
        }
    };

    let _guard = match state.in_flight.try_begin(&auth.user.id, "vendor:new", "create") {
        Ok(guard) => guard,
        Err(conflict) => {
            record_action("vendor_create", "blocked");
            return Ok(VendorFormTemplate::new(&auth, None, form)
                .with_banner(conflict.to_string())
                .into_response());
        }
    };

    match state.api.create_vendor(&auth.token, &input).await {
        Ok(vendor) => {
            record_action("vendor_create", "success");
            tracing::info!(vendor_id = %vendor.id, user_id = %auth.user.id, "Vendor created");
            redirect_with_flash(&auth, format!("Vendor {} created", vendor.name), "/vendors").await
        }
        Err(e) => {
            record_action("vendor_create", "error");
            Ok(VendorFormTemplate::new(&auth, None, form)
                .with_banner(e.to_string())
                .into_response())
        }
    }
}

pub async fn edit_vendor_page(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let flash = auth.take_flash().await?;

    match state.api.get_vendor(&auth.token, &id).await {
        Ok(vendor) => {
            let mut template = VendorFormTemplate::new(&auth, Some(id), VendorForm::from(&vendor));
            template.flash = flash;
            Ok(template.into_response())
        }
        Err(e) => redirect_with_flash(&auth, e.to_string(), "/vendors").await,
    }
}

pub async fn update_vendor(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Form(form): Form<VendorForm>,
) -> Result<Response, AppError> {
    let input = match form.parse() {
        Ok(input) => input,
        Err(errors) => {
            record_action("vendor_update", "invalid");
            return Ok(VendorFormTemplate::new(&auth, Some(id), form)
                .with_errors(errors)
                .into_response());
        }
    };

    let target = format!("vendor:{id}");
    let _guard = match state.in_flight.try_begin(&auth.user.id, &target, "update") {
        Ok(guard) => guard,
        Err(conflict) => {
            record_action("vendor_update", "blocked");
            return Ok(VendorFormTemplate::new(&auth, Some(id), form)
                .with_banner(conflict.to_string())
                .into_response());
        }
    };

    match state.api.update_vendor(&auth.token, &id, &input).await {
        Ok(vendor) => {
            record_action("vendor_update", "success");
            tracing::info!(vendor_id = %vendor.id, user_id = %auth.user.id, "Vendor updated");
            redirect_with_flash(&auth, format!("Vendor {} updated", vendor.name), "/vendors").await
        }
        Err(e) => {
            record_action("vendor_update", "error");
            Ok(VendorFormTemplate::new(&auth, Some(id), form)
                .with_banner(e.to_string())
                .into_response())
        }
    }
}

pub async fn delete_vendor(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let target = format!("vendor:{id}");
    let _guard = match state.in_flight.try_begin(&auth.user.id, &target, "delete") {
        Ok(guard) => guard,
        Err(conflict) => {
            record_action("vendor_delete", "blocked");
            return redirect_with_flash(&auth, conflict.to_string(), "/vendors").await;
        }
    };

    match state.api.delete_vendor(&auth.token, &id).await {
        Ok(()) => {
            record_action("vendor_delete", "success");
            tracing::info!(vendor_id = %id, user_id = %auth.user.id, "Vendor deleted");
            redirect_with_flash(&auth, "Vendor deleted", "/vendors").await
        }
        Err(e) => {
            record_action("vendor_delete", "error");
            redirect_with_flash(&auth, e.to_string(), "/vendors").await
        }
    }
}
