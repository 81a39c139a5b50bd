use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller role as issued by the payout API at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Ops,
    Finance,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Ops => "OPS",
            Role::Finance => "FINANCE",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The signed-in user. Never modified locally once login returns it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    pub email: String,
    pub role: Role,
}

impl User {
    pub fn name(&self) -> &str {
        self.email.split('@').next().unwrap_or("User")
    }

    pub fn initials(&self) -> String {
        let initials: String = self.name().chars().take(2).collect();
        if initials.is_empty() {
            "U".to_string()
        } else {
            initials.to_uppercase()
        }
    }
}
