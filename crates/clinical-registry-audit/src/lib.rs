//! Usage audit log for clinical registry sessions.
//!
//! An append-only delimited file with one line per user action:
//!
//! ```text
//! nurse1,nurse,2024-03-01 09:15:02,Login
//! nurse1,nurse,2024-03-01 09:16:40,Add Visit
//! mallory,Unknown,2024-03-01 09:20:11,Failed Login Attempt
//! ```
//!
//! The registry core never writes here; the presentation layer records an
//! entry after each core operation completes.

mod action;

pub use action::*;

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use clinical_registry_core::codec::delimited::{parse_records, write_record, DelimitedError};
use clinical_registry_core::models::Role;
use thiserror::Error;
use tracing::debug;

/// Timestamp format of log entries.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Role written for actions by unauthenticated users.
pub const UNKNOWN_ROLE: &str = "Unknown";

/// Usage log errors.
#[derive(Error, Debug)]
pub enum UsageLogError {
    #[error("Failed to access usage log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed usage log: {0}")]
    Delimited(#[from] DelimitedError),

    #[error("Usage log line {line}: {reason}")]
    Entry { line: usize, reason: String },
}

pub type UsageLogResult<T> = Result<T, UsageLogError>;

/// One audit entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageEntry {
    pub username: String,
    /// Role name, or [`UNKNOWN_ROLE`]
    pub role: String,
    pub timestamp: NaiveDateTime,
    pub action: UsageAction,
}

/// Handle on a usage log file.
#[derive(Debug, Clone)]
pub struct UsageLog {
    path: PathBuf,
}

impl UsageLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry stamped with the local time.
    ///
    /// `role` is `None` for actions by users who never authenticated.
    pub fn record(&self, username: &str, role: Option<&Role>, action: UsageAction) -> UsageLogResult<()> {
        self.record_at(username, role, action, Local::now().naive_local())
    }

    /// Append an entry with an explicit timestamp.
    pub fn record_at(
        &self,
        username: &str,
        role: Option<&Role>,
        action: UsageAction,
        timestamp: NaiveDateTime,
    ) -> UsageLogResult<()> {
        let role = role.map(Role::as_str).unwrap_or(UNKNOWN_ROLE);
        let stamp = timestamp.format(TIMESTAMP_FORMAT).to_string();

        let mut line = String::new();
        write_record(&mut line, &[username, role, stamp.as_str(), action.label()]);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error(source))?;
        file.write_all(line.as_bytes())
            .map_err(|source| self.io_error(source))?;

        debug!(username, role, action = action.label(), "usage recorded");
        Ok(())
    }

    /// Read every entry back. A missing file has no entries.
    pub fn entries(&self) -> UsageLogResult<Vec<UsageEntry>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(self.io_error(source)),
        };

        parse_records(&contents)?
            .into_iter()
            .map(|record| {
                let [username, role, timestamp, action] = record.fields.as_slice() else {
                    return Err(UsageLogError::Entry {
                        line: record.line,
                        reason: format!("expected 4 fields, found {}", record.fields.len()),
                    });
                };
                let timestamp = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
                    .map_err(|e| UsageLogError::Entry {
                        line: record.line,
                        reason: format!("bad timestamp {:?}: {}", timestamp, e),
                    })?;
                let action = UsageAction::from_label(action).ok_or_else(|| UsageLogError::Entry {
                    line: record.line,
                    reason: format!("unknown action {:?}", action),
                })?;
                Ok(UsageEntry {
                    username: username.clone(),
                    role: role.clone(),
                    timestamp,
                    action,
                })
            })
            .collect()
    }

    fn io_error(&self, source: std::io::Error) -> UsageLogError {
        UsageLogError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
