//! Fixed role → operation table.

use serde::{Deserialize, Serialize};

use crate::models::Role;

/// Registry operations a session can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    RetrievePatient,
    RegisterPatient,
    AddVisit,
    RemovePatient,
    CountVisits,
    KeyStatistics,
}

impl Operation {
    pub fn label(&self) -> &'static str {
        match self {
            Operation::RetrievePatient => "Retrieve Patient",
            Operation::RegisterPatient => "Add Patient",
            Operation::AddVisit => "Add Visit",
            Operation::RemovePatient => "Remove Patient",
            Operation::CountVisits => "Count Visits",
            Operation::KeyStatistics => "Generate Key Statistics",
        }
    }

    /// Whether the operation changes the registry.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Operation::RegisterPatient | Operation::AddVisit | Operation::RemovePatient
        )
    }
}

const CARE_TEAM: &[Operation] = &[
    Operation::RetrievePatient,
    Operation::RegisterPatient,
    Operation::AddVisit,
    Operation::RemovePatient,
    Operation::CountVisits,
];

/// Operations granted to a role.
pub fn permitted_operations(role: &Role) -> &'static [Operation] {
    match role {
        Role::Management => &[Operation::KeyStatistics],
        Role::Admin => &[Operation::KeyStatistics, Operation::CountVisits],
        Role::Clinician | Role::Nurse => CARE_TEAM,
        Role::Other(_) => &[],
    }
}

pub fn is_permitted(role: &Role, operation: Operation) -> bool {
    permitted_operations(role).contains(&operation)
}
