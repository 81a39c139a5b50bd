use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const NO_VALUE: &str = "—";

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vendor {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upi_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ifsc: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Vendor {
    pub fn upi_display(&self) -> &str {
        self.upi_id.as_deref().filter(|s| !s.is_empty()).unwrap_or(NO_VALUE)
    }

    pub fn bank_display(&self) -> String {
        match (self.bank_account.as_deref(), self.ifsc.as_deref()) {
            (Some(account), Some(ifsc)) if !account.is_empty() && !ifsc.is_empty() => {
                format!("{account} ({ifsc})")
            }
            (Some(account), _) if !account.is_empty() => account.to_string(),
            _ => NO_VALUE.to_string(),
        }
    }
}

/// How a payout points at its vendor: list endpoints may return only the id,
/// detail endpoints embed the vendor document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum VendorRef {
    Embedded(Vendor),
    Reference(String),
}

impl VendorRef {
    pub fn id(&self) -> &str {
        match self {
            VendorRef::Embedded(vendor) => &vendor.id,
            VendorRef::Reference(id) => id,
        }
    }

    /// Vendor name, or "—" when only the id is known.
    pub fn display_name(&self) -> &str {
        match self {
            VendorRef::Embedded(vendor) => &vendor.name,
            VendorRef::Reference(_) => NO_VALUE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reference_and_embedded_forms() {
        let by_id: VendorRef = serde_json::from_value(json!("v1")).unwrap();
        assert_eq!(by_id, VendorRef::Reference("v1".into()));
        assert_eq!(by_id.display_name(), "—");
        assert_eq!(by_id.id(), "v1");

        let embedded: VendorRef =
            serde_json::from_value(json!({"_id": "v2", "name": "Acme Supplies"})).unwrap();
        assert_eq!(embedded.display_name(), "Acme Supplies");
        assert_eq!(embedded.id(), "v2");
    }

    #[test]
    fn vendor_defaults_to_active() {
        let vendor: Vendor = serde_json::from_value(json!({"_id": "v1", "name": "Acme"})).unwrap();
        assert!(vendor.is_active);
        assert_eq!(vendor.upi_display(), "—");
        assert_eq!(vendor.bank_display(), "—");
    }

    #[test]
    fn bank_display_includes_ifsc() {
        let vendor: Vendor = serde_json::from_value(json!({
            "_id": "v1",
            "name": "Acme",
            "bank_account": "0012345",
            "ifsc": "HDFC0001",
            "is_active": false
        }))
        .unwrap();
        assert_eq!(vendor.bank_display(), "0012345 (HDFC0001)");
        assert!(!vendor.is_active);
    }
}
