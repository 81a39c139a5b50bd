//! Payout model as returned by the payout API.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::vendor::VendorRef;

/// Payout lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayoutStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

impl PayoutStatus {
    pub const ALL: [PayoutStatus; 4] = [
        PayoutStatus::Draft,
        PayoutStatus::Submitted,
        PayoutStatus::Approved,
        PayoutStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutStatus::Draft => "Draft",
            PayoutStatus::Submitted => "Submitted",
            PayoutStatus::Approved => "Approved",
            PayoutStatus::Rejected => "Rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PayoutStatus::Approved | PayoutStatus::Rejected)
    }

    /// Utility classes for the status badge.
    pub fn badge_class(&self) -> &'static str {
        match self {
            PayoutStatus::Draft => "bg-gray-100 text-gray-700",
            PayoutStatus::Submitted => "bg-blue-50 text-blue-700",
            PayoutStatus::Approved => "bg-emerald-50 text-emerald-700",
            PayoutStatus::Rejected => "bg-red-50 text-red-700",
        }
    }
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayoutStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PayoutStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown payout status '{s}'"))
    }
}

/// Transfer rail used for the payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PayoutMode {
    Upi,
    Imps,
    Neft,
}

impl PayoutMode {
    pub const ALL: [PayoutMode; 3] = [PayoutMode::Upi, PayoutMode::Imps, PayoutMode::Neft];

    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutMode::Upi => "UPI",
            PayoutMode::Imps => "IMPS",
            PayoutMode::Neft => "NEFT",
        }
    }
}

impl fmt::Display for PayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayoutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PayoutMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| format!("unknown payout mode '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Created,
    Submitted,
    Approved,
    Rejected,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Created => "CREATED",
            AuditAction::Submitted => "SUBMITTED",
            AuditAction::Approved => "APPROVED",
            AuditAction::Rejected => "REJECTED",
        }
    }

    pub fn dot_class(&self) -> &'static str {
        match self {
            AuditAction::Created => "bg-gray-800",
            AuditAction::Submitted => "bg-blue-600",
            AuditAction::Approved => "bg-emerald-600",
            AuditAction::Rejected => "bg-red-600",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_reason: Option<String>,
}

/// One recorded lifecycle transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutAuditEntry {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub action: AuditAction,
    pub performed_by_email: String,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Option<AuditMetadata>,
}

impl PayoutAuditEntry {
    pub fn decision_reason(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.decision_reason.as_deref())
    }

    pub fn timestamp_display(&self) -> String {
        format_timestamp(self.created_at)
    }
}

/// Wire shape of a payout, before the decision reason is checked against the
/// status.
#[derive(Deserialize)]
struct PayoutRecord {
    #[serde(rename = "_id", alias = "id")]
    id: String,
    vendor_id: VendorRef,
    amount: Decimal,
    mode: PayoutMode,
    #[serde(default)]
    note: Option<String>,
    status: PayoutStatus,
    #[serde(default)]
    decision_reason: Option<String>,
    #[serde(rename = "createdAt", default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    audit: Vec<PayoutAuditEntry>,
}

/// A payout. `decision_reason` is only ever set when the status is
/// `Rejected`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "PayoutRecord")]
pub struct Payout {
    pub id: String,
    pub vendor: VendorRef,
    pub amount: Decimal,
    pub mode: PayoutMode,
    pub note: Option<String>,
    pub status: PayoutStatus,
    decision_reason: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Only populated by the detail endpoint.
    pub audit: Vec<PayoutAuditEntry>,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl From<PayoutRecord> for Payout {
    fn from(record: PayoutRecord) -> Self {
        let reason = non_blank(record.decision_reason.as_deref());

        let decision_reason = match (record.status, reason) {
            (PayoutStatus::Rejected, Some(reason)) => Some(reason),
            (PayoutStatus::Rejected, None) => {
                // Fall back to the reason recorded on the rejection audit entry
                let from_audit = record
                    .audit
                    .iter()
                    .rev()
                    .find(|entry| entry.action == AuditAction::Rejected)
                    .and_then(|entry| non_blank(entry.decision_reason()));
                if from_audit.is_none() {
                    tracing::warn!(
                        payout_id = %record.id,
                        "Rejected payout carries no decision_reason"
                    );
                }
                from_audit
            }
            (status, Some(_)) => {
                tracing::warn!(
                    payout_id = %record.id,
                    status = %status,
                    "Ignoring decision_reason on a payout that is not rejected"
                );
                None
            }
            (_, None) => None,
        };

        Payout {
            id: record.id,
            vendor: record.vendor_id,
            amount: record.amount,
            mode: record.mode,
            note: record.note.filter(|n| !n.trim().is_empty()),
            status: record.status,
            decision_reason,
            created_at: record.created_at,
            updated_at: record.updated_at,
            audit: record.audit,
        }
    }
}

impl Payout {
    pub fn decision_reason(&self) -> Option<&str> {
        self.decision_reason.as_deref()
    }

    pub fn vendor_name(&self) -> &str {
        self.vendor.display_name()
    }

    pub fn amount_display(&self) -> String {
        format_amount(self.amount)
    }

    pub fn created_display(&self) -> String {
        format_timestamp(self.created_at)
    }

    pub fn updated_display(&self) -> String {
        format_timestamp(self.updated_at)
    }
}

/// Rupee amount with thousands separators, e.g. `₹1,250.5`.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp(2).normalize();
    let text = rounded.abs().to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(frac) => format!("{sign}₹{grouped}.{frac}"),
        None => format!("{sign}₹{grouped}"),
    }
}

pub fn format_timestamp(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp
        .map(|t| t.format("%d %b %Y, %H:%M").to_string())
        .unwrap_or_else(|| "—".to_string())
}
