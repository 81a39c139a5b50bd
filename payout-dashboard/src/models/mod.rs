pub mod payout;
pub mod user;
pub mod vendor;

pub use payout::{
    format_amount, format_timestamp, AuditAction, AuditMetadata, Payout, PayoutAuditEntry,
    PayoutMode, PayoutStatus,
};
pub use user::{Role, User};
pub use vendor::{Vendor, VendorRef};
