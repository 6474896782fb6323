//! In-memory patient repository.
//!
//! The [`Registry`] is the only writer of the patient collection. Patients
//! keep their insertion position, replacing an id keeps the original slot,
//! and every patient owns its visits outright.

mod ids;

pub use ids::*;

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::models::{NewVisit, Patient, ValidationError, Visit};

/// How many generated ids to try before giving up on a collision-free one.
const MAX_ID_ATTEMPTS: usize = 32;

/// Repository errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error("Visit {visit_id} already exists for patient {patient_id}")]
    DuplicateVisit { patient_id: String, visit_id: String },

    #[error("No unused visit id for patient {patient_id} after {attempts} attempts")]
    VisitIdsExhausted { patient_id: String, attempts: usize },

    #[error("Invalid visit: {0}")]
    InvalidVisit(#[from] ValidationError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Mapping from patient id to patient, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    patients: Vec<Patient>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of patients.
    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    /// Number of visits across all patients.
    pub fn visit_count(&self) -> usize {
        self.patients.iter().map(|p| p.visits.len()).sum()
    }

    /// Patients in insertion order.
    pub fn patients(&self) -> impl Iterator<Item = &Patient> {
        self.patients.iter()
    }

    pub fn contains(&self, patient_id: &str) -> bool {
        self.index.contains_key(patient_id)
    }

    /// Insert a patient, replacing any existing entry with the same id.
    ///
    /// A replacement takes the old entry's position and discards its visits
    /// wholesale. Returns the replaced patient.
    ///
    /// The id is not validated here. A blank id cannot be written to the
    /// registry file; interactive callers go through
    /// `Session::register_patient`, which rejects it.
    pub fn add_patient(&mut self, patient: Patient) -> Option<Patient> {
        match self.index.get(&patient.patient_id) {
            Some(&slot) => {
                debug!(patient_id = %patient.patient_id, "replacing patient");
                Some(std::mem::replace(&mut self.patients[slot], patient))
            }
            None => {
                self.index
                    .insert(patient.patient_id.clone(), self.patients.len());
                self.patients.push(patient);
                None
            }
        }
    }

    /// Append a visit to an existing patient.
    ///
    /// Visits with a blank id, department or complaint are rejected, since the
    /// registry file could not read them back.
    pub fn add_visit(&mut self, patient_id: &str, visit: Visit) -> RegistryResult<()> {
        let patient = self.patient_mut(patient_id)?;
        visit.validate()?;
        if patient.has_visit(&visit.visit_id) {
            return Err(RegistryError::DuplicateVisit {
                patient_id: patient_id.to_string(),
                visit_id: visit.visit_id,
            });
        }
        patient.add_visit(visit);
        Ok(())
    }

    /// Create a visit with a generated id and append it to a patient.
    ///
    /// Ids already used by the same patient are redrawn.
    pub fn record_visit(
        &mut self,
        patient_id: &str,
        visit: NewVisit,
        ids: &mut dyn VisitIdGenerator,
    ) -> RegistryResult<&Visit> {
        let patient = self.patient_mut(patient_id)?;

        let visit_id = (0..MAX_ID_ATTEMPTS)
            .map(|_| ids.next_visit_id())
            .find(|candidate| !patient.has_visit(candidate))
            .ok_or_else(|| RegistryError::VisitIdsExhausted {
                patient_id: patient_id.to_string(),
                attempts: MAX_ID_ATTEMPTS,
            })?;

        let visit = visit.into_visit(visit_id);
        visit.validate()?;

        debug!(patient_id, visit_id = %visit.visit_id, "recording visit");
        patient.add_visit(visit);
        let last = patient.visits.len() - 1;
        Ok(&patient.visits[last])
    }

    /// Remove a patient and every visit it owns.
    ///
    /// An unknown id is an ordinary outcome and yields `None`.
    pub fn remove_patient(&mut self, patient_id: &str) -> Option<Patient> {
        let slot = self.index.remove(patient_id)?;
        let removed = self.patients.remove(slot);
        for patient in &self.patients[slot..] {
            if let Some(i) = self.index.get_mut(&patient.patient_id) {
                *i -= 1;
            }
        }
        debug!(patient_id, visits = removed.visits.len(), "removed patient");
        Some(removed)
    }

    /// Look up a patient.
    pub fn retrieve_patient(&self, patient_id: &str) -> Option<&Patient> {
        self.index.get(patient_id).map(|&slot| &self.patients[slot])
    }

    fn patient_mut(&mut self, patient_id: &str) -> RegistryResult<&mut Patient> {
        match self.index.get(patient_id) {
            Some(&slot) => Ok(&mut self.patients[slot]),
            None => Err(RegistryError::PatientNotFound(patient_id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Demographics;
    use chrono::NaiveDate;

    fn patient(id: &str) -> Patient {
        Patient::new(
            id,
            Demographics {
                gender: "Male".into(),
                race: "White".into(),
                age: 50,
                ethnicity: "Non-Hispanic".into(),
                insurance: "Private".into(),
                zip_code: "10001".into(),
            },
        )
    }

    fn visit(id: &str, day: u32) -> Visit {
        Visit::new(
            id,
            NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            "ER",
            "Cough",
        )
    }

    #[test]
    fn test_add_and_retrieve() {
        let mut registry = Registry::new();
        assert!(registry.add_patient(patient("P1")).is_none());

        let found = registry.retrieve_patient("P1").unwrap();
        assert_eq!(found.demographics.age, 50);
        assert!(registry.retrieve_patient("P2").is_none());
    }

    #[test]
    fn test_replace_discards_old_visits() {
        let mut registry = Registry::new();
        registry.add_patient(patient("P1"));
        registry.add_patient(patient("P2"));
        registry.add_visit("P1", visit("V1", 1)).unwrap();

        let mut replacement = patient("P1");
        replacement.demographics.age = 51;
        let old = registry.add_patient(replacement).unwrap();

        assert_eq!(old.visits.len(), 1);
        let current = registry.retrieve_patient("P1").unwrap();
        assert_eq!(current.demographics.age, 51);
        assert!(current.visits.is_empty());
        assert_eq!(registry.len(), 2);

        // Replacement keeps its original position
        let order: Vec<_> = registry.patients().map(|p| p.patient_id.as_str()).collect();
        assert_eq!(order, vec!["P1", "P2"]);
    }

    #[test]
    fn test_add_visit_unknown_patient() {
        let mut registry = Registry::new();
        let err = registry.add_visit("P9", visit("V1", 1)).unwrap_err();
        assert_eq!(err, RegistryError::PatientNotFound("P9".into()));
    }

    #[test]
    fn test_add_visit_keeps_insertion_order() {
        let mut registry = Registry::new();
        registry.add_patient(patient("P1"));
        registry.add_visit("P1", visit("V2", 9)).unwrap();
        registry.add_visit("P1", visit("V1", 1)).unwrap();

        let ids: Vec<_> = registry
            .retrieve_patient("P1")
            .unwrap()
            .visits
            .iter()
            .map(|v| v.visit_id.as_str())
            .collect();
        assert_eq!(ids, vec!["V2", "V1"]);
        assert_eq!(registry.visit_count(), 2);
    }

    #[test]
    fn test_duplicate_visit_rejected() {
        let mut registry = Registry::new();
        registry.add_patient(patient("P1"));
        registry.add_visit("P1", visit("V1", 1)).unwrap();
        let err = registry.add_visit("P1", visit("V1", 2)).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateVisit { .. }));

        // Same visit id under another patient is fine
        registry.add_patient(patient("P2"));
        registry.add_visit("P2", visit("V1", 1)).unwrap();
    }

    #[test]
    fn test_blank_visit_fields_rejected() {
        let mut registry = Registry::new();
        registry.add_patient(patient("P1"));

        let mut blank_department = visit("V1", 1);
        blank_department.department = " ".into();
        let err = registry.add_visit("P1", blank_department).unwrap_err();
        assert_eq!(
            err,
            RegistryError::InvalidVisit(ValidationError::Blank { field: "Visit_department" })
        );

        let mut blank_id = visit("V1", 1);
        blank_id.visit_id = String::new();
        assert!(matches!(
            registry.add_visit("P1", blank_id),
            Err(RegistryError::InvalidVisit(_))
        ));
        assert_eq!(registry.visit_count(), 0);

        // Hand-built drafts bypass NewVisit::parse and are still checked
        let draft = NewVisit {
            visit_time: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            department: "ER".into(),
            chief_complaint: "\n".into(),
        };
        let mut ids = SequentialVisitIds::new("V");
        assert!(matches!(
            registry.record_visit("P1", draft, &mut ids),
            Err(RegistryError::InvalidVisit(_))
        ));
        assert_eq!(registry.visit_count(), 0);
    }

    #[test]
    fn test_record_visit_skips_used_ids() {
        let mut registry = Registry::new();
        registry.add_patient(patient("P1"));
        registry.add_visit("P1", visit("V1", 1)).unwrap();

        let mut ids = SequentialVisitIds::new("V");
        let draft = NewVisit::parse("2024-03-05", "Radiology", "Fracture").unwrap();
        let recorded = registry.record_visit("P1", draft, &mut ids).unwrap();
        assert_eq!(recorded.visit_id, "V2");
        assert_eq!(recorded.department, "Radiology");
    }

    #[test]
    fn test_record_visit_gives_up_on_constant_ids() {
        struct Constant;
        impl VisitIdGenerator for Constant {
            fn next_visit_id(&mut self) -> String {
                "SAME".into()
            }
        }

        let mut registry = Registry::new();
        registry.add_patient(patient("P1"));
        registry.add_visit("P1", visit("SAME", 1)).unwrap();

        let draft = NewVisit::parse("2024-03-05", "ER", "Cough").unwrap();
        let err = registry.record_visit("P1", draft, &mut Constant).unwrap_err();
        assert!(matches!(err, RegistryError::VisitIdsExhausted { .. }));
    }

    #[test]
    fn test_remove_patient() {
        let mut registry = Registry::new();
        registry.add_patient(patient("P1"));
        registry.add_patient(patient("P2"));
        registry.add_patient(patient("P3"));
        registry.add_visit("P1", visit("V1", 1)).unwrap();

        let removed = registry.remove_patient("P1").unwrap();
        assert_eq!(removed.visits.len(), 1);
        assert!(registry.remove_patient("P1").is_none());
        assert_eq!(registry.visit_count(), 0);

        // Index stays consistent after shifting
        assert_eq!(registry.retrieve_patient("P3").unwrap().patient_id, "P3");
        registry.add_visit("P3", visit("V9", 3)).unwrap();
        assert_eq!(registry.retrieve_patient("P3").unwrap().visits.len(), 1);
    }
}
