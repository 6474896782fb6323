//! Visit and clinical note models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::validation::{format_visit_date, parse_visit_date, require, ValidationResult};

/// A single visit, owned by exactly one patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Visit {
    /// Unique within the owning patient only
    pub visit_id: String,
    /// Calendar date of the visit (no time of day)
    pub visit_time: NaiveDate,
    /// Department that saw the patient
    pub department: String,
    /// Presenting complaint
    pub chief_complaint: String,
    /// Clinical notes (not persisted)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
}

impl Visit {
    /// Create a visit from already-validated values.
    pub fn new(
        visit_id: impl Into<String>,
        visit_time: NaiveDate,
        department: impl Into<String>,
        chief_complaint: impl Into<String>,
    ) -> Self {
        Self {
            visit_id: visit_id.into(),
            visit_time,
            department: department.into(),
            chief_complaint: chief_complaint.into(),
            notes: Vec::new(),
        }
    }

    /// Attach a clinical note.
    pub fn add_note(&mut self, note: Note) {
        self.notes.push(note);
    }

    /// Check the free-text fields the registry file needs to read the visit back.
    pub fn validate(&self) -> ValidationResult<()> {
        require("Visit_ID", &self.visit_id)?;
        require("Visit_department", &self.department)?;
        require("Chief_complaint", &self.chief_complaint)?;
        Ok(())
    }

    /// Visit date as `YYYY-MM-DD`.
    pub fn visit_date_string(&self) -> String {
        format_visit_date(self.visit_time)
    }
}

/// Visit fields entered by a user before an id has been generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVisit {
    pub visit_time: NaiveDate,
    pub department: String,
    pub chief_complaint: String,
}

impl NewVisit {
    /// Validate raw text entry.
    pub fn parse(visit_time: &str, department: &str, chief_complaint: &str) -> ValidationResult<Self> {
        Ok(Self {
            visit_time: parse_visit_date(visit_time)?,
            department: require("Visit_department", department)?,
            chief_complaint: require("Chief_complaint", chief_complaint)?,
        })
    }

    /// Bind a generated id.
    pub fn into_visit(self, visit_id: String) -> Visit {
        Visit::new(visit_id, self.visit_time, self.department, self.chief_complaint)
    }
}

/// A clinical note attached to a visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Note {
    pub note_id: String,
    pub note_type: String,
}
