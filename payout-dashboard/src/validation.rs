//! Form validation for the dashboard's inputs.
//!
//! Each form arrives as raw strings. `parse` normalizes it (trimming, case
//! folding) and returns either the typed input or one message per field. A
//! "required" message always wins over other messages for the same field.

use rust_decimal::Decimal;
use secrecy::Secret;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use validator::{Validate, ValidationErrors};

use crate::models::{PayoutMode, Vendor};

/// Field name to human-readable message.
pub type FieldErrors = BTreeMap<String, String>;

pub const AMOUNT_REQUIRED: &str = "Amount is required";
pub const AMOUNT_NOT_POSITIVE: &str = "Amount must be greater than 0";
pub const AMOUNT_TOO_LARGE: &str = "Amount is too large";

/// Largest accepted payout: 999,999,999,999.99.
pub fn max_payout_amount() -> Decimal {
    Decimal::new(99_999_999_999_999, 2)
}

fn require(errors: &mut FieldErrors, field: &str, value: &str, message: &str) {
    if value.trim().is_empty() {
        errors.insert(field.to_string(), message.to_string());
    }
}

/// Fold validator output into `errors`, keeping any message already recorded
/// for a field.
fn collect(errors: &mut FieldErrors, result: Result<(), ValidationErrors>) {
    let Err(validation_errors) = result else {
        return;
    };
    for (field, field_errors) in validation_errors.field_errors() {
        if let Some(first) = field_errors.first() {
            let message = first
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| first.code.to_string());
            errors.entry(field.to_string()).or_insert(message);
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[derive(Deserialize, Default, Clone, Validate)]
pub struct LoginForm {
    #[serde(default)]
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 3, message = "Password must be at least 3 characters"))]
    pub password: String,
}

#[derive(Debug)]
pub struct LoginCredentials {
    pub email: String,
    pub password: Secret<String>,
}

impl LoginForm {
    pub fn parse(&self) -> Result<LoginCredentials, FieldErrors> {
        let normalized = LoginForm {
            email: self.email.trim().to_lowercase(),
            password: self.password.clone(),
        };

        let mut errors = FieldErrors::new();
        require(&mut errors, "email", &normalized.email, "Email is required");
        if normalized.password.is_empty() {
            errors.insert("password".into(), "Password is required".into());
        }
        collect(&mut errors, normalized.validate());

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(LoginCredentials {
            email: normalized.email,
            password: Secret::new(normalized.password),
        })
    }
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct VendorForm {
    #[serde(default)]
    #[validate(length(
        min = 2,
        max = 255,
        message = "Vendor name must be between 2 and 255 characters"
    ))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 255, message = "UPI ID must be at most 255 characters"))]
    pub upi_id: String,
    #[serde(default)]
    #[validate(length(max = 255, message = "Bank account must be at most 255 characters"))]
    pub bank_account: String,
    #[serde(default)]
    #[validate(length(max = 100, message = "IFSC must be at most 100 characters"))]
    pub ifsc: String,
    /// "true"/"false" from the form select; absent means active.
    #[serde(default)]
    pub is_active: Option<String>,
}

impl Default for VendorForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            upi_id: String::new(),
            bank_account: String::new(),
            ifsc: String::new(),
            is_active: Some("true".to_string()),
        }
    }
}

impl From<&Vendor> for VendorForm {
    fn from(vendor: &Vendor) -> Self {
        Self {
            name: vendor.name.clone(),
            upi_id: vendor.upi_id.clone().unwrap_or_default(),
            bank_account: vendor.bank_account.clone().unwrap_or_default(),
            ifsc: vendor.ifsc.clone().unwrap_or_default(),
            is_active: Some(vendor.is_active.to_string()),
        }
    }
}

/// Vendor fields as sent to the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upi_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ifsc: Option<String>,
    pub is_active: bool,
}

fn parse_flag(value: Option<&str>) -> bool {
    !matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("false" | "off" | "0")
    )
}

impl VendorForm {
    pub fn is_active(&self) -> bool {
        parse_flag(self.is_active.as_deref())
    }

    pub fn parse(&self) -> Result<VendorInput, FieldErrors> {
        let normalized = VendorForm {
            name: self.name.trim().to_string(),
            upi_id: self.upi_id.trim().to_string(),
            bank_account: self.bank_account.trim().to_string(),
            ifsc: self.ifsc.trim().to_string(),
            is_active: self.is_active.clone(),
        };

        let mut errors = FieldErrors::new();
        require(&mut errors, "name", &normalized.name, "Vendor name is required");
        collect(&mut errors, normalized.validate());

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(VendorInput {
            upi_id: non_empty(&normalized.upi_id),
            bank_account: non_empty(&normalized.bank_account),
            ifsc: non_empty(&normalized.ifsc),
            is_active: normalized.is_active(),
            name: normalized.name,
        })
    }
}

#[derive(Debug, Deserialize, Default, Clone, Validate)]
pub struct PayoutForm {
    #[serde(default)]
    pub vendor_id: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    #[validate(length(max = 500, message = "Note must be at most 500 characters"))]
    pub note: String,
}

/// Body of `POST /payouts`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPayout {
    pub vendor_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub mode: PayoutMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Parse a payout amount: a number greater than 0 and at most
/// [`max_payout_amount`].
pub fn parse_amount(raw: &str) -> Result<Decimal, &'static str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AMOUNT_REQUIRED);
    }
    // Decimal's parser skips `_` separators; a typed number never has them
    if trimmed.contains('_') {
        return Err(AMOUNT_NOT_POSITIVE);
    }

    let amount = match Decimal::from_str(trimmed).or_else(|_| Decimal::from_scientific(trimmed)) {
        Ok(amount) => amount,
        // Numbers too wide for a Decimal are still numbers, just too large
        Err(_) => {
            return Err(match trimmed.parse::<f64>() {
                Ok(value) if value >= 1.0 => AMOUNT_TOO_LARGE,
                _ => AMOUNT_NOT_POSITIVE,
            });
        }
    };

    if amount <= Decimal::ZERO {
        return Err(AMOUNT_NOT_POSITIVE);
    }
    if amount > max_payout_amount() {
        return Err(AMOUNT_TOO_LARGE);
    }
    Ok(amount)
}

impl PayoutForm {
    pub fn parse(&self) -> Result<NewPayout, FieldErrors> {
        let normalized = PayoutForm {
            vendor_id: self.vendor_id.trim().to_string(),
            amount: self.amount.trim().to_string(),
            mode: self.mode.trim().to_string(),
            note: self.note.trim().to_string(),
        };

        let mut errors = FieldErrors::new();
        require(&mut errors, "vendor_id", &normalized.vendor_id, "Please select a vendor");

        let amount = parse_amount(&normalized.amount)
            .map_err(|message| errors.insert("amount".into(), message.into()))
            .ok();

        let mode = if normalized.mode.is_empty() {
            errors.insert("mode".into(), "Please select a payment mode".into());
            None
        } else {
            normalized
                .mode
                .parse::<PayoutMode>()
                .map_err(|_| {
                    errors.insert("mode".into(), "Please select a valid payment mode".into())
                })
                .ok()
        };

        collect(&mut errors, normalized.validate());

        match (amount, mode) {
            (Some(amount), Some(mode)) if errors.is_empty() => Ok(NewPayout {
                note: non_empty(&normalized.note),
                vendor_id: normalized.vendor_id,
                amount,
                mode,
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, Validate)]
pub struct RejectForm {
    #[serde(default)]
    #[validate(length(
        min = 3,
        max = 500,
        message = "Rejection reason must be between 3 and 500 characters"
    ))]
    pub decision_reason: String,
}

impl RejectForm {
    /// The trimmed reason to send with the rejection.
    pub fn parse(&self) -> Result<String, FieldErrors> {
        let normalized = RejectForm {
            decision_reason: self.decision_reason.trim().to_string(),
        };

        let mut errors = FieldErrors::new();
        require(
            &mut errors,
            "decision_reason",
            &normalized.decision_reason,
            "Rejection reason is required",
        );
        collect(&mut errors, normalized.validate());

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(normalized.decision_reason)
    }
}
