//! Credential records and roles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse authorization label attached to a credential record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Management,
    Clinician,
    Nurse,
    Admin,
    /// Any role name outside the known set; grants nothing
    Other(String),
}

impl Role {
    /// Map a role name from the credential store.
    pub fn from_label(label: &str) -> Self {
        match label {
            "management" => Role::Management,
            "clinician" => Role::Clinician,
            "nurse" => Role::Nurse,
            "admin" => Role::Admin,
            other => Role::Other(other.to_string()),
        }
    }

    /// Role name as stored.
    pub fn as_str(&self) -> &str {
        match self {
            Role::Management => "management",
            Role::Clinician => "clinician",
            Role::Nurse => "nurse",
            Role::Admin => "admin",
            Role::Other(label) => label,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the credential store. Never persisted by the registry.
#[derive(Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,
    pub password: String,
    pub role: Role,
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}
