//! Registry file codec.
//!
//! The registry file is a denormalized join: every row carries one patient's
//! demographics next to one of that patient's visits.
//!
//! ```text
//! Patient_ID,Gender,Race,Age,Ethnicity,Insurance,Zip_code,Visit_ID,Visit_time,Visit_department,Chief_complaint
//! P1,Female,Asian,34,Non-Hispanic,Medicare,02139,V1,2024-03-01,ER,Headache
//! P1,Female,Asian,34,Non-Hispanic,Medicare,02139,V2,2024-03-09,Neurology,Migraine
//! P2,Male,White,61,Hispanic,Private,10001,,,,
//! ```
//!
//! Decoding rules:
//! - the first accepted row for a patient id supplies its demographics, later
//!   rows only contribute visits
//! - a row with the six demographic columns blank is a visit-only row and must
//!   name a patient created by an earlier row
//! - a row with any visit column blank registers the patient without a visit
//! - a bad row is skipped or aborts the load, per [`InvalidRowPolicy`]
//!
//! Encoding writes patients and visits in insertion order. A patient without
//! visits gets a single row with the visit columns empty, so every registry
//! survives a save/load cycle.

pub mod delimited;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{
    format_visit_date, parse_age, parse_visit_date, Demographics, Patient, ValidationError, Visit,
};
use crate::registry::{Registry, RegistryError};

use self::delimited::{parse_records, write_record, DelimitedError, Record};

/// Column contract, in order.
pub const COLUMNS: [&str; 11] = [
    "Patient_ID",
    "Gender",
    "Race",
    "Age",
    "Ethnicity",
    "Insurance",
    "Zip_code",
    "Visit_ID",
    "Visit_time",
    "Visit_department",
    "Chief_complaint",
];

/// Header spelling written by older exports for the zip column.
const LEGACY_ZIP_HEADER: &str = "Zip code";

const ZIP_COLUMN: usize = 6;
const DEMOGRAPHIC_COLUMNS: std::ops::Range<usize> = 1..7;
const VISIT_COLUMNS: std::ops::Range<usize> = 7..11;

/// Codec errors.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed registry file: {0}")]
    Delimited(#[from] DelimitedError),

    #[error("Registry file has no header row")]
    MissingHeader,

    #[error("Unexpected header: expected {expected}, found {found}")]
    Header { expected: String, found: String },

    #[error("Invalid row: {0}")]
    Row(#[from] RowError),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// A single rejected row.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {kind}")]
pub struct RowError {
    /// 1-based line the row starts on
    pub line: usize,
    /// Patient id on the row, when one was present
    pub patient_id: Option<String>,
    pub kind: RowErrorKind,
}

/// Why a row was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowErrorKind {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("Patient_ID is blank")]
    BlankPatientId,

    #[error("{field}: {source}")]
    Invalid {
        field: &'static str,
        #[source]
        source: ValidationError,
    },

    #[error("visit-only row references a patient with no earlier row")]
    UnknownPatient,

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// What to do with a row that cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidRowPolicy {
    /// Record the row in the [`DecodeReport`], log a warning, keep going
    #[default]
    Skip,
    /// Fail the whole decode
    Abort,
}

/// Summary of a decode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeReport {
    /// Data rows read (header excluded)
    pub rows_read: usize,
    /// Rows rejected under [`InvalidRowPolicy::Skip`]
    pub skipped: Vec<RowError>,
}

impl DecodeReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// A decoded registry and its report.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub registry: Registry,
    pub report: DecodeReport,
}

/// Decode registry file contents.
pub fn decode(input: &str, policy: InvalidRowPolicy) -> CodecResult<Decoded> {
    let mut records = parse_records(input)?.into_iter();
    let header = records.next().ok_or(CodecError::MissingHeader)?;
    check_header(&header.fields)?;

    let mut registry = Registry::new();
    let mut report = DecodeReport::default();

    for record in records {
        report.rows_read += 1;
        if let Err(err) = decode_row(&mut registry, &record) {
            match policy {
                InvalidRowPolicy::Abort => return Err(err.into()),
                InvalidRowPolicy::Skip => {
                    warn!(line = err.line, error = %err.kind, "skipping registry row");
                    report.skipped.push(err);
                }
            }
        }
    }

    Ok(Decoded { registry, report })
}

/// Encode a registry, one row per (patient, visit) pair.
pub fn encode(registry: &Registry) -> String {
    let mut out = String::new();
    write_record(&mut out, &COLUMNS);

    for patient in registry.patients() {
        let d = &patient.demographics;
        let age = d.age.to_string();
        let demographics: [&str; 7] = [
            &patient.patient_id,
            &d.gender,
            &d.race,
            &age,
            &d.ethnicity,
            &d.insurance,
            &d.zip_code,
        ];

        if patient.visits.is_empty() {
            let mut row: Vec<&str> = demographics.to_vec();
            row.extend(["", "", "", ""]);
            write_record(&mut out, &row);
            continue;
        }

        for visit in &patient.visits {
            let date = format_visit_date(visit.visit_time);
            let mut row: Vec<&str> = demographics.to_vec();
            row.extend([
                visit.visit_id.as_str(),
                date.as_str(),
                visit.department.as_str(),
                visit.chief_complaint.as_str(),
            ]);
            write_record(&mut out, &row);
        }
    }

    out
}

/// Load a registry from disk.
pub fn load_registry<P: AsRef<Path>>(path: P, policy: InvalidRowPolicy) -> CodecResult<Decoded> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| CodecError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let decoded = decode(&contents, policy)?;
    info!(
        path = %path.display(),
        patients = decoded.registry.len(),
        visits = decoded.registry.visit_count(),
        skipped = decoded.report.skipped.len(),
        "loaded registry"
    );
    Ok(decoded)
}

/// Rewrite the registry file in full.
///
/// Contents go to a temporary file in the same directory which is then
/// renamed over the target, so readers never observe a half-written file.
pub fn save_registry<P: AsRef<Path>>(path: P, registry: &Registry) -> CodecResult<()> {
    let path = path.as_ref();
    let write_err = |source| CodecError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(encode(registry).as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    info!(
        path = %path.display(),
        patients = registry.len(),
        visits = registry.visit_count(),
        "saved registry"
    );
    Ok(())
}

fn check_header(fields: &[String]) -> CodecResult<()> {
    let matches = fields.len() == COLUMNS.len()
        && fields.iter().zip(COLUMNS).enumerate().all(|(i, (found, expected))| {
            found == expected || (i == ZIP_COLUMN && found == LEGACY_ZIP_HEADER)
        });

    if matches {
        Ok(())
    } else {
        Err(CodecError::Header {
            expected: COLUMNS.join(","),
            found: fields.join(","),
        })
    }
}

fn decode_row(registry: &mut Registry, record: &Record) -> Result<(), RowError> {
    let fields = &record.fields;
    let fail = |patient_id: Option<&str>, kind: RowErrorKind| RowError {
        line: record.line,
        patient_id: patient_id.map(str::to_string),
        kind,
    };

    if fields.len() != COLUMNS.len() {
        return Err(fail(
            None,
            RowErrorKind::FieldCount {
                expected: COLUMNS.len(),
                found: fields.len(),
            },
        ));
    }

    let patient_id = fields[0].as_str();
    if patient_id.trim().is_empty() {
        return Err(fail(None, RowErrorKind::BlankPatientId));
    }
    let invalid = |field: &'static str, source: ValidationError| {
        fail(Some(patient_id), RowErrorKind::Invalid { field, source })
    };

    let visit =
        decode_visit(&fields[VISIT_COLUMNS], record.line).map_err(|e| invalid("Visit_time", e))?;
    let visit_only = fields[DEMOGRAPHIC_COLUMNS].iter().all(|f| f.trim().is_empty());

    if !registry.contains(patient_id) {
        if visit_only {
            return Err(fail(Some(patient_id), RowErrorKind::UnknownPatient));
        }
        let demographics = Demographics {
            gender: fields[1].clone(),
            race: fields[2].clone(),
            age: parse_age(&fields[3]).map_err(|e| invalid("Age", e))?,
            ethnicity: fields[4].clone(),
            insurance: fields[5].clone(),
            zip_code: fields[6].clone(),
        };
        registry.add_patient(Patient::new(patient_id, demographics));
    } else if !visit_only {
        debug!(patient_id, line = record.line, "repeat row, keeping first demographics");
    }

    if let Some(visit) = visit {
        registry
            .add_visit(patient_id, visit)
            .map_err(|e| fail(Some(patient_id), e.into()))?;
    }
    Ok(())
}

/// Decode the four visit columns. Blank columns mean "no visit on this row";
/// a present but malformed date is an error.
fn decode_visit(fields: &[String], line: usize) -> Result<Option<Visit>, ValidationError> {
    let [visit_id, visit_time, department, complaint] = fields else {
        return Ok(None);
    };

    let date = if visit_time.trim().is_empty() {
        None
    } else {
        Some(parse_visit_date(visit_time)?)
    };

    let blank = [visit_id, department, complaint]
        .iter()
        .any(|f| f.trim().is_empty());
    match date {
        Some(date) if !blank => Ok(Some(Visit::new(
            visit_id.as_str(),
            date,
            department.as_str(),
            complaint.as_str(),
        ))),
        _ => {
            if fields.iter().any(|f| !f.trim().is_empty()) {
                warn!(line, "incomplete visit columns, registering patient without this visit");
            }
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const HEADER: &str = "Patient_ID,Gender,Race,Age,Ethnicity,Insurance,Zip_code,Visit_ID,Visit_time,Visit_department,Chief_complaint\n";

    fn file(rows: &[&str]) -> String {
        let mut s = HEADER.to_string();
        for row in rows {
            s.push_str(row);
            s.push('\n');
        }
        s
    }

    #[test]
    fn test_repeat_rows_append_visits() {
        let input = file(&[
            "P1,Female,Asian,34,Non-Hispanic,Medicare,02139,V1,2024-03-01,ER,Headache",
            "P1,Male,White,99,Hispanic,None,99999,V2,2024-03-09,Neurology,Migraine",
        ]);
        let decoded = decode(&input, InvalidRowPolicy::Abort).unwrap();

        assert_eq!(decoded.registry.len(), 1);
        let p1 = decoded.registry.retrieve_patient("P1").unwrap();
        assert_eq!(p1.demographics.gender, "Female");
        assert_eq!(p1.demographics.age, 34);
        assert_eq!(p1.demographics.zip_code, "02139");
        assert_eq!(p1.visits.len(), 2);
        assert_eq!(p1.visits[0].visit_id, "V1");
        assert_eq!(p1.visits[1].visit_time, NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert!(decoded.report.is_clean());
        assert_eq!(decoded.report.rows_read, 2);
    }

    #[test]
    fn test_missing_visit_fields_register_patient_only() {
        let input = file(&[
            "P1,Female,Asian,34,Non-Hispanic,Medicare,02139,,,,",
            "P2,Male,White,61,Hispanic,Private,10001,V1,2024-03-01,,Cough",
        ]);
        let decoded = decode(&input, InvalidRowPolicy::Abort).unwrap();

        assert_eq!(decoded.registry.len(), 2);
        assert_eq!(decoded.registry.visit_count(), 0);
    }

    #[test]
    fn test_invalid_date_skips_row() {
        let input = file(&[
            "P1,Female,Asian,34,Non-Hispanic,Medicare,02139,V1,2024-03-01,ER,Headache",
            "P1,Female,Asian,34,Non-Hispanic,Medicare,02139,V2,03/09/2024,ER,Headache",
            "P2,Male,White,61,Hispanic,Private,10001,V1,2024-13-01,ER,Cough",
        ]);
        let decoded = decode(&input, InvalidRowPolicy::Skip).unwrap();

        assert_eq!(decoded.registry.len(), 1);
        assert_eq!(decoded.registry.visit_count(), 1);
        assert_eq!(decoded.report.skipped.len(), 2);

        let first = &decoded.report.skipped[0];
        assert_eq!(first.line, 3);
        assert_eq!(first.patient_id.as_deref(), Some("P1"));
        assert!(matches!(
            first.kind,
            RowErrorKind::Invalid { field: "Visit_time", .. }
        ));
    }

    #[test]
    fn test_invalid_date_aborts_under_abort_policy() {
        let input = file(&["P1,Female,Asian,34,Non-Hispanic,Medicare,02139,V1,2024-3-1,ER,Headache"]);
        let err = decode(&input, InvalidRowPolicy::Abort).unwrap_err();
        match err {
            CodecError::Row(row) => assert_eq!(row.line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_age_rejected() {
        let input = file(&["P1,Female,Asian,-4,Non-Hispanic,Medicare,02139,V1,2024-03-01,ER,Headache"]);
        let decoded = decode(&input, InvalidRowPolicy::Skip).unwrap();
        assert!(decoded.registry.is_empty());
        assert!(matches!(
            decoded.report.skipped[0].kind,
            RowErrorKind::Invalid { field: "Age", .. }
        ));
    }

    #[test]
    fn test_visit_only_row() {
        let input = file(&[
            "P1,Female,Asian,34,Non-Hispanic,Medicare,02139,V1,2024-03-01,ER,Headache",
            "P1,,,,,,,V2,2024-03-02,ER,Follow-up",
            "P9,,,,,,,V1,2024-03-02,ER,Follow-up",
        ]);
        let decoded = decode(&input, InvalidRowPolicy::Skip).unwrap();

        assert_eq!(decoded.registry.retrieve_patient("P1").unwrap().visits.len(), 2);
        assert!(decoded.registry.retrieve_patient("P9").is_none());
        assert_eq!(decoded.report.skipped[0].kind, RowErrorKind::UnknownPatient);
    }

    #[test]
    fn test_duplicate_visit_id_rejected() {
        let input = file(&[
            "P1,Female,Asian,34,Non-Hispanic,Medicare,02139,V1,2024-03-01,ER,Headache",
            "P1,Female,Asian,34,Non-Hispanic,Medicare,02139,V1,2024-03-02,ER,Headache",
        ]);
        let decoded = decode(&input, InvalidRowPolicy::Skip).unwrap();
        assert_eq!(decoded.registry.visit_count(), 1);
        assert!(matches!(
            decoded.report.skipped[0].kind,
            RowErrorKind::Registry(RegistryError::DuplicateVisit { .. })
        ));
    }

    #[test]
    fn test_field_count_and_blank_id() {
        let input = file(&[
            "P1,Female,Asian,34",
            ",Female,Asian,34,Non-Hispanic,Medicare,02139,V1,2024-03-01,ER,Headache",
        ]);
        let decoded = decode(&input, InvalidRowPolicy::Skip).unwrap();
        assert!(decoded.registry.is_empty());
        assert_eq!(
            decoded.report.skipped[0].kind,
            RowErrorKind::FieldCount { expected: 11, found: 4 }
        );
        assert_eq!(decoded.report.skipped[1].kind, RowErrorKind::BlankPatientId);
    }

    #[test]
    fn test_header_checks() {
        assert!(matches!(decode("", InvalidRowPolicy::Skip), Err(CodecError::MissingHeader)));
        assert!(matches!(
            decode("Patient_ID,Gender\n", InvalidRowPolicy::Skip),
            Err(CodecError::Header { .. })
        ));

        let legacy = HEADER.replace("Zip_code", "Zip code");
        assert!(decode(&legacy, InvalidRowPolicy::Abort).is_ok());
    }

    #[test]
    fn test_byte_order_mark_before_header() {
        let input = format!(
            "\u{feff}{}",
            file(&["P1,Female,Asian,34,Non-Hispanic,Medicare,02139,V1,2024-03-01,ER,Headache"])
        );
        let decoded = decode(&input, InvalidRowPolicy::Abort).unwrap();
        assert!(decoded.report.is_clean());
        assert_eq!(decoded.registry.retrieve_patient("P1").unwrap().visits.len(), 1);
    }

    #[test]
    fn test_encode_layout() {
        let mut registry = Registry::new();
        registry.add_patient(Patient::new(
            "P1",
            Demographics {
                gender: "Female".into(),
                race: "Asian".into(),
                age: 34,
                ethnicity: "Non-Hispanic".into(),
                insurance: "Blue Cross, PPO".into(),
                zip_code: "02139".into(),
            },
        ));
        registry
            .add_visit(
                "P1",
                Visit::new("V1", NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), "ER", "Headache"),
            )
            .unwrap();
        registry.add_patient(Patient::new("P2", Demographics::default()));

        let text = encode(&registry);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER.trim_end());
        assert_eq!(
            lines[1],
            "P1,Female,Asian,34,Non-Hispanic,\"Blue Cross, PPO\",02139,V1,2024-03-01,ER,Headache"
        );
        assert_eq!(lines[2], "P2,,,0,,,,,,,");

        let decoded = decode(&text, InvalidRowPolicy::Abort).unwrap();
        assert_eq!(decoded.registry, registry);
    }
}
