//! Credential check against the local credential store.
//!
//! The store is a delimited file with `username`, `password` and `role`
//! columns holding plaintext pre-shared secrets. Matching is exact on both
//! username and password; there is no hashing, throttling or lockout.
//! Rows too short to carry all three columns are skipped with a warning so
//! one bad line does not lock out every other user.

mod permissions;

pub use permissions::*;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::codec::delimited::{parse_records, DelimitedError};
use crate::models::{Role, UserRecord};

/// Credential store errors.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Failed to read credential store {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed credential store: {0}")]
    Delimited(#[from] DelimitedError),

    #[error("Credential store has no header row")]
    MissingHeader,

    #[error("Credential store is missing the {0} column")]
    MissingColumn(&'static str),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Result of a credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authorized { username: String, role: Role },
    Rejected,
}

impl AuthOutcome {
    pub fn role(&self) -> Option<&Role> {
        match self {
            AuthOutcome::Authorized { role, .. } => Some(role),
            AuthOutcome::Rejected => None,
        }
    }
}

/// Parsed credential store.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    users: Vec<UserRecord>,
}

impl CredentialStore {
    /// Read a credential store from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> AuthResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| AuthError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    /// Parse credential store contents. Columns are located by header name.
    pub fn parse(input: &str) -> AuthResult<Self> {
        let mut records = parse_records(input)?.into_iter();
        let header = records.next().ok_or(AuthError::MissingHeader)?;
        let column = |name: &'static str| {
            header
                .fields
                .iter()
                .position(|f| f.trim() == name)
                .ok_or(AuthError::MissingColumn(name))
        };
        let username_col = column("username")?;
        let password_col = column("password")?;
        let role_col = column("role")?;
        let width = username_col.max(password_col).max(role_col) + 1;

        let users = records
            .filter_map(|record| {
                if record.fields.len() < width {
                    warn!(
                        line = record.line,
                        expected = header.fields.len(),
                        found = record.fields.len(),
                        "skipping short credential row"
                    );
                    return None;
                }
                Some(UserRecord {
                    username: record.fields[username_col].clone(),
                    password: record.fields[password_col].clone(),
                    role: Role::from_label(&record.fields[role_col]),
                })
            })
            .collect::<Vec<_>>();

        Ok(Self { users })
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Check a credential pair. The first record matching both fields wins.
    pub fn authenticate(&self, username: &str, password: &str) -> AuthOutcome {
        self.users
            .iter()
            .find(|u| u.username == username && u.password == password)
            .map(|u| AuthOutcome::Authorized {
                username: u.username.clone(),
                role: u.role.clone(),
            })
            .unwrap_or(AuthOutcome::Rejected)
    }
}

/// Check a credential pair against the store at `path`, read fresh.
pub fn authorize<P: AsRef<Path>>(path: P, username: &str, password: &str) -> AuthResult<AuthOutcome> {
    let store = CredentialStore::load(path)?;
    debug!(users = store.len(), "credential store loaded");

    let outcome = store.authenticate(username, password);
    match outcome.role() {
        Some(role) => info!(username, role = %role, "login accepted"),
        None => info!(username, "login rejected"),
    }
    Ok(outcome)
}
