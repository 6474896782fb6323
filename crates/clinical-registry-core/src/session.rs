//! Session context.
//!
//! A [`Session`] is what the presentation layer holds after a successful
//! login: who is acting, with which role, and the registry loaded for them.
//! Each operation checks the role table first; mutations rewrite the whole
//! registry file before returning.
//!
//! One session works on one private copy of the registry. Nothing here is
//! synchronized and concurrent sessions over the same file are unsupported.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::auth::{self, is_permitted, AuthError, AuthOutcome, Operation};
use crate::codec::{self, CodecError, DecodeReport};
use crate::config::RegistryConfig;
use crate::models::{
    self, parse_visit_date, Demographics, NewVisit, Patient, Role, ValidationError, Visit,
};
use crate::registry::{Registry, RegistryError, VisitIdGenerator};
use crate::stats::{self, KeyStatistics};

/// Session errors.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Role {role} is not permitted to {}", .operation.label())]
    Forbidden { role: Role, operation: Operation },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Result of a login attempt.
#[derive(Debug)]
pub enum LoginOutcome {
    Started(Session),
    Rejected,
}

/// Result of registering a new patient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// Patient created with its first visit
    Registered { visit_id: String },
    /// The id is taken; record a visit on the existing patient instead
    AlreadyRegistered,
}

/// An authorized user working on a loaded registry.
#[derive(Debug)]
pub struct Session {
    username: String,
    role: Role,
    registry: Registry,
    registry_path: PathBuf,
    report: DecodeReport,
}

impl Session {
    /// Check credentials and, on success, load the registry.
    pub fn login(config: &RegistryConfig, username: &str, password: &str) -> SessionResult<LoginOutcome> {
        let (username, role) = match auth::authorize(&config.credentials_path, username, password)? {
            AuthOutcome::Authorized { username, role } => (username, role),
            AuthOutcome::Rejected => return Ok(LoginOutcome::Rejected),
        };

        let decoded = codec::load_registry(&config.registry_path, config.invalid_row_policy)?;
        info!(username = %username, role = %role, "session started");

        Ok(LoginOutcome::Started(Self {
            username,
            role,
            registry: decoded.registry,
            registry_path: config.registry_path.clone(),
            report: decoded.report,
        }))
    }

    /// Start a session over an already-loaded registry.
    pub fn from_parts(
        username: impl Into<String>,
        role: Role,
        registry: Registry,
        registry_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            username: username.into(),
            role,
            registry,
            registry_path: registry_path.into(),
            report: DecodeReport::default(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_path(&self) -> &Path {
        &self.registry_path
    }

    /// Rows skipped while loading.
    pub fn decode_report(&self) -> &DecodeReport {
        &self.report
    }

    /// Whether this session's role grants an operation.
    pub fn can(&self, operation: Operation) -> bool {
        is_permitted(&self.role, operation)
    }

    /// Look up a patient. `None` when the id is unknown.
    pub fn retrieve_patient(&self, patient_id: &str) -> SessionResult<Option<&Patient>> {
        self.require(Operation::RetrievePatient)?;
        Ok(self.registry.retrieve_patient(patient_id))
    }

    /// Register a new patient together with their first visit.
    ///
    /// A blank patient id is rejected before anything changes. If the first
    /// visit is refused the patient is not kept either.
    pub fn register_patient(
        &mut self,
        patient_id: &str,
        demographics: Demographics,
        first_visit: NewVisit,
        ids: &mut dyn VisitIdGenerator,
    ) -> SessionResult<Registration> {
        self.require(Operation::RegisterPatient)?;
        models::require("Patient_ID", patient_id)?;
        if self.registry.contains(patient_id) {
            return Ok(Registration::AlreadyRegistered);
        }

        self.registry
            .add_patient(Patient::new(patient_id, demographics));
        let recorded = self
            .registry
            .record_visit(patient_id, first_visit, ids)
            .map(|visit| visit.visit_id.clone());
        let visit_id = match recorded {
            Ok(visit_id) => visit_id,
            Err(err) => {
                self.registry.remove_patient(patient_id);
                return Err(err.into());
            }
        };
        self.persist()?;

        Ok(Registration::Registered { visit_id })
    }

    /// Record a visit for an existing patient. `None` when the id is unknown.
    pub fn add_visit(
        &mut self,
        patient_id: &str,
        visit: NewVisit,
        ids: &mut dyn VisitIdGenerator,
    ) -> SessionResult<Option<Visit>> {
        self.require(Operation::AddVisit)?;
        if !self.registry.contains(patient_id) {
            return Ok(None);
        }

        let visit = self.registry.record_visit(patient_id, visit, ids)?.clone();
        self.persist()?;
        Ok(Some(visit))
    }

    /// Remove a patient and all their visits. `None` when the id is unknown.
    pub fn remove_patient(&mut self, patient_id: &str) -> SessionResult<Option<Patient>> {
        self.require(Operation::RemovePatient)?;
        let removed = self.registry.remove_patient(patient_id);
        if removed.is_some() {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Count visits on a date entered as `YYYY-MM-DD`.
    pub fn count_visits_on(&self, date: &str) -> SessionResult<usize> {
        self.require(Operation::CountVisits)?;
        let date = parse_visit_date(date)?;
        Ok(stats::count_visits_on_date(&self.registry, date))
    }

    /// Registry-wide summary.
    pub fn key_statistics(&self) -> SessionResult<KeyStatistics> {
        self.require(Operation::KeyStatistics)?;
        Ok(KeyStatistics::from_registry(&self.registry))
    }

    fn require(&self, operation: Operation) -> SessionResult<()> {
        if self.can(operation) {
            Ok(())
        } else {
            warn!(
                username = %self.username,
                role = %self.role,
                operation = operation.label(),
                "operation denied"
            );
            Err(SessionError::Forbidden {
                role: self.role.clone(),
                operation,
            })
        }
    }

    fn persist(&self) -> SessionResult<()> {
        codec::save_registry(&self.registry_path, &self.registry)?;
        Ok(())
    }
}
