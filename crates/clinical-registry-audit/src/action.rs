//! Audited actions.

use clinical_registry_core::auth::Operation;

/// Actions written to the usage log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsageAction {
    Login,
    FailedLogin,
    GenerateKeyStatistics,
    AddPatient,
    AddVisit,
    RemovePatient,
    RetrievePatient,
    CountVisits,
}

impl UsageAction {
    const ALL: [UsageAction; 8] = [
        UsageAction::Login,
        UsageAction::FailedLogin,
        UsageAction::GenerateKeyStatistics,
        UsageAction::AddPatient,
        UsageAction::AddVisit,
        UsageAction::RemovePatient,
        UsageAction::RetrievePatient,
        UsageAction::CountVisits,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            UsageAction::Login => "Login",
            UsageAction::FailedLogin => "Failed Login Attempt",
            UsageAction::GenerateKeyStatistics => "Generate Key Statistics",
            UsageAction::AddPatient => "Add Patient",
            UsageAction::AddVisit => "Add Visit",
            UsageAction::RemovePatient => "Remove Patient",
            UsageAction::RetrievePatient => "Retrieve Patient",
            UsageAction::CountVisits => "Count Visits",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.label() == label)
    }
}

impl From<Operation> for UsageAction {
    fn from(operation: Operation) -> Self {
        match operation {
            Operation::RetrievePatient => UsageAction::RetrievePatient,
            Operation::RegisterPatient => UsageAction::AddPatient,
            Operation::AddVisit => UsageAction::AddVisit,
            Operation::RemovePatient => UsageAction::RemovePatient,
            Operation::CountVisits => UsageAction::CountVisits,
            Operation::KeyStatistics => UsageAction::GenerateKeyStatistics,
        }
    }
}
