//! Read-only aggregation queries over a registry.
//!
//! Every query is a full scan; results are keyed in sorted order so the
//! same registry always yields the same output.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::DemographicAttribute;
use crate::registry::Registry;

/// Category value → count.
pub type Counts = BTreeMap<String, usize>;

/// Patients per value of a demographic attribute.
pub fn count_by_attribute(registry: &Registry, attribute: DemographicAttribute) -> Counts {
    let mut counts = Counts::new();
    for patient in registry.patients() {
        *counts
            .entry(patient.demographics.value(attribute).to_string())
            .or_default() += 1;
    }
    counts
}

/// Patients per insurance.
pub fn count_by_insurance(registry: &Registry) -> Counts {
    count_by_attribute(registry, DemographicAttribute::Insurance)
}

/// Visits per department. A patient seen by several departments counts once
/// in each.
pub fn count_by_department(registry: &Registry) -> Counts {
    let mut counts = Counts::new();
    for visit in registry.patients().flat_map(|p| &p.visits) {
        *counts.entry(visit.department.clone()).or_default() += 1;
    }
    counts
}

/// Visits across all patients on the given date.
pub fn count_visits_on_date(registry: &Registry, date: NaiveDate) -> usize {
    registry
        .patients()
        .flat_map(|p| &p.visits)
        .filter(|v| v.visit_time == date)
        .count()
}

/// Registry-wide summary shown to management.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStatistics {
    pub total_patients: usize,
    pub total_visits: usize,
    pub by_insurance: Counts,
    pub by_gender: Counts,
    pub by_race: Counts,
    pub by_ethnicity: Counts,
    pub by_department: Counts,
}

impl KeyStatistics {
    /// Compute the summary.
    pub fn from_registry(registry: &Registry) -> Self {
        Self {
            total_patients: registry.len(),
            total_visits: registry.visit_count(),
            by_insurance: count_by_insurance(registry),
            by_gender: count_by_attribute(registry, DemographicAttribute::Gender),
            by_race: count_by_attribute(registry, DemographicAttribute::Race),
            by_ethnicity: count_by_attribute(registry, DemographicAttribute::Ethnicity),
            by_department: count_by_department(registry),
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for KeyStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total Patients: {}", self.total_patients)?;
        let sections = [
            ("Patients by Insurance", &self.by_insurance),
            ("Patients by Gender", &self.by_gender),
            ("Patients by Race", &self.by_race),
            ("Patients by Ethnicity", &self.by_ethnicity),
            ("Patients by Visit Department", &self.by_department),
        ];
        for (i, (title, counts)) in sections.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}:", title)?;
            for (value, count) in counts.iter() {
                writeln!(f, "{}: {}", value, count)?;
            }
        }
        Ok(())
    }
}
