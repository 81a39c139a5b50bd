//! Payout lifecycle rules as seen from the dashboard.
//!
//! ```text
//! (none) --create/OPS--> Draft --submit/OPS--> Submitted --approve/FINANCE--> Approved
//!                                                      \--reject/FINANCE---> Rejected
//! ```
//!
//! The payout API is the authority for every transition. These rules only
//! decide which controls to offer and stop an action locally, before any
//! network call, when its guard does not hold. Nothing here mutates a payout.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::models::{AuditAction, PayoutStatus, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutAction {
    Submit,
    Approve,
    Reject,
}

impl PayoutAction {
    pub const ALL: [PayoutAction; 3] = [
        PayoutAction::Submit,
        PayoutAction::Approve,
        PayoutAction::Reject,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutAction::Submit => "submit",
            PayoutAction::Approve => "approve",
            PayoutAction::Reject => "reject",
        }
    }

    pub fn required_role(&self) -> Role {
        match self {
            PayoutAction::Submit => Role::Ops,
            PayoutAction::Approve | PayoutAction::Reject => Role::Finance,
        }
    }

    /// The only status the action may start from.
    pub fn source_status(&self) -> PayoutStatus {
        match self {
            PayoutAction::Submit => PayoutStatus::Draft,
            PayoutAction::Approve | PayoutAction::Reject => PayoutStatus::Submitted,
        }
    }

    pub fn target_status(&self) -> PayoutStatus {
        match self {
            PayoutAction::Submit => PayoutStatus::Submitted,
            PayoutAction::Approve => PayoutStatus::Approved,
            PayoutAction::Reject => PayoutStatus::Rejected,
        }
    }

    /// Audit entry the API records when the action succeeds.
    pub fn audit_action(&self) -> AuditAction {
        match self {
            PayoutAction::Submit => AuditAction::Submitted,
            PayoutAction::Approve => AuditAction::Approved,
            PayoutAction::Reject => AuditAction::Rejected,
        }
    }
}

impl fmt::Display for PayoutAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("Only {required} users can {action} payouts")]
    WrongRole { action: PayoutAction, required: Role },

    #[error("Cannot {action} a payout that is {status}")]
    WrongStatus {
        action: PayoutAction,
        status: PayoutStatus,
    },

    #[error("Only OPS users can create payouts")]
    CreateNotAllowed,
}

/// Which lifecycle controls a user may use on a payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ActionAvailability {
    pub can_submit: bool,
    pub can_approve: bool,
    pub can_reject: bool,
}

impl ActionAvailability {
    /// Derive availability from the caller's role and the payout's current
    /// status. Recompute after every successful action from the status the
    /// API returned.
    pub fn for_role(role: Role, status: PayoutStatus) -> Self {
        Self {
            can_submit: role == Role::Ops && status == PayoutStatus::Draft,
            can_approve: role == Role::Finance && status == PayoutStatus::Submitted,
            can_reject: role == Role::Finance && status == PayoutStatus::Submitted,
        }
    }

    pub fn allows(&self, action: PayoutAction) -> bool {
        match action {
            PayoutAction::Submit => self.can_submit,
            PayoutAction::Approve => self.can_approve,
            PayoutAction::Reject => self.can_reject,
        }
    }

    /// Status the payout would move to, if the action is available.
    pub fn preview(&self, action: PayoutAction) -> Option<PayoutStatus> {
        self.allows(action).then(|| action.target_status())
    }

    pub fn any(&self) -> bool {
        self.can_submit || self.can_approve || self.can_reject
    }
}

/// Check an action against the role and the status currently displayed.
///
/// Returns the status the payout moves to when the guard holds.
pub fn authorize(
    role: Role,
    status: PayoutStatus,
    action: PayoutAction,
) -> Result<PayoutStatus, LifecycleError> {
    if role != action.required_role() {
        return Err(LifecycleError::WrongRole {
            action,
            required: action.required_role(),
        });
    }
    if status != action.source_status() {
        return Err(LifecycleError::WrongStatus { action, status });
    }
    Ok(action.target_status())
}

pub fn can_create(role: Role) -> bool {
    role == Role::Ops
}

/// New payouts always start as drafts.
pub fn authorize_create(role: Role) -> Result<PayoutStatus, LifecycleError> {
    if can_create(role) {
        Ok(PayoutStatus::Draft)
    } else {
        Err(LifecycleError::CreateNotAllowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLES: [Role; 2] = [Role::Ops, Role::Finance];

    #[test]
    fn availability_matches_transition_table() {
        let expected = |role: Role, status: PayoutStatus| match (role, status) {
            (Role::Ops, PayoutStatus::Draft) => (true, false, false),
            (Role::Finance, PayoutStatus::Submitted) => (false, true, true),
            _ => (false, false, false),
        };

        for role in ROLES {
            for status in PayoutStatus::ALL {
                let a = ActionAvailability::for_role(role, status);
                assert_eq!(
                    (a.can_submit, a.can_approve, a.can_reject),
                    expected(role, status),
                    "role {role} status {status}"
                );
            }
        }
    }

    #[test]
    fn ops_sees_nothing_on_submitted() {
        let a = ActionAvailability::for_role(Role::Ops, PayoutStatus::Submitted);
        assert_eq!(a, ActionAvailability::default());
        assert!(!a.any());
    }

    #[test]
    fn authorize_agrees_with_availability() {
        for role in ROLES {
            for status in PayoutStatus::ALL {
                let availability = ActionAvailability::for_role(role, status);
                for action in PayoutAction::ALL {
                    let result = authorize(role, status, action);
                    assert_eq!(result.is_ok(), availability.allows(action));
                    assert_eq!(result.ok(), availability.preview(action));
                }
            }
        }
    }

    #[test]
    fn authorize_reports_role_before_status() {
        assert_eq!(
            authorize(Role::Ops, PayoutStatus::Draft, PayoutAction::Approve),
            Err(LifecycleError::WrongRole {
                action: PayoutAction::Approve,
                required: Role::Finance
            })
        );
        let err = authorize(Role::Ops, PayoutStatus::Rejected, PayoutAction::Submit).unwrap_err();
        assert_eq!(err.to_string(), "Cannot submit a payout that is Rejected");
    }

    #[test]
    fn terminal_statuses_offer_no_actions() {
        for role in ROLES {
            for status in [PayoutStatus::Approved, PayoutStatus::Rejected] {
                assert!(!ActionAvailability::for_role(role, status).any());
            }
        }
    }

    #[test]
    fn transitions_record_matching_audit_action() {
        assert_eq!(PayoutAction::Submit.audit_action(), AuditAction::Submitted);
        assert_eq!(PayoutAction::Approve.audit_action(), AuditAction::Approved);
        assert_eq!(PayoutAction::Reject.audit_action(), AuditAction::Rejected);
    }

    #[test]
    fn only_ops_creates_drafts() {
        assert_eq!(authorize_create(Role::Ops), Ok(PayoutStatus::Draft));
        assert_eq!(
            authorize_create(Role::Finance),
            Err(LifecycleError::CreateNotAllowed)
        );
    }
}
