//! Patient models.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::visit::Visit;

/// Demographic fields recorded once per patient.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Demographics {
    pub gender: String,
    pub race: String,
    pub age: u32,
    pub ethnicity: String,
    pub insurance: String,
    pub zip_code: String,
}

/// Patient attributes that can be grouped and counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DemographicAttribute {
    Gender,
    Race,
    Ethnicity,
    Insurance,
    ZipCode,
}

impl DemographicAttribute {
    pub const ALL: [DemographicAttribute; 5] = [
        DemographicAttribute::Gender,
        DemographicAttribute::Race,
        DemographicAttribute::Ethnicity,
        DemographicAttribute::Insurance,
        DemographicAttribute::ZipCode,
    ];

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            DemographicAttribute::Gender => "Gender",
            DemographicAttribute::Race => "Race",
            DemographicAttribute::Ethnicity => "Ethnicity",
            DemographicAttribute::Insurance => "Insurance",
            DemographicAttribute::ZipCode => "Zip code",
        }
    }
}

impl Demographics {
    /// Value of a groupable attribute.
    pub fn value(&self, attribute: DemographicAttribute) -> &str {
        match attribute {
            DemographicAttribute::Gender => &self.gender,
            DemographicAttribute::Race => &self.race,
            DemographicAttribute::Ethnicity => &self.ethnicity,
            DemographicAttribute::Insurance => &self.insurance,
            DemographicAttribute::ZipCode => &self.zip_code,
        }
    }
}

/// A registered patient and the visits they own, in arrival order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Patient {
    /// Registry key
    pub patient_id: String,
    /// Demographics, fixed at first registration
    pub demographics: Demographics,
    /// Visits in insertion order (not sorted by date)
    pub visits: Vec<Visit>,
}

impl Patient {
    /// Create a patient with no visits.
    pub fn new(patient_id: impl Into<String>, demographics: Demographics) -> Self {
        Self {
            patient_id: patient_id.into(),
            demographics,
            visits: Vec::new(),
        }
    }

    /// Append a visit.
    pub fn add_visit(&mut self, visit: Visit) {
        self.visits.push(visit);
    }

    /// Check whether a visit id is already used by this patient.
    pub fn has_visit(&self, visit_id: &str) -> bool {
        self.visits.iter().any(|v| v.visit_id == visit_id)
    }
}

impl fmt::Display for Patient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.demographics;
        writeln!(f, "Patient information for ID: {}", self.patient_id)?;
        writeln!(f, "Gender: {}", d.gender)?;
        writeln!(f, "Race: {}", d.race)?;
        writeln!(f, "Age: {}", d.age)?;
        writeln!(f, "Ethnicity: {}", d.ethnicity)?;
        writeln!(f, "Insurance: {}", d.insurance)?;
        writeln!(f, "Zip code: {}", d.zip_code)?;
        writeln!(f, "Visits:")?;
        for visit in &self.visits {
            writeln!(f, "Visit ID: {}", visit.visit_id)?;
            writeln!(f, "Visit time: {}", visit.visit_date_string())?;
            writeln!(f, "Department: {}", visit.department)?;
            writeln!(f, "Chief complaint: {}", visit.chief_complaint)?;
        }
        Ok(())
    }
}
