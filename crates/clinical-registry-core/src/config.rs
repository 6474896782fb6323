//! Registry configuration.
//!
//! ```toml
//! registry_path = "data/Project_patient_information.csv"
//! credentials_path = "data/Project_credentials.csv"
//! usage_log_path = "data/usage_statistics.csv"
//! invalid_row_policy = "skip"   # or "abort"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::InvalidRowPolicy;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// File locations and decode policy for a registry session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registry file (patients and visits)
    pub registry_path: PathBuf,
    /// Credential store
    pub credentials_path: PathBuf,
    /// Append-only usage audit log
    pub usage_log_path: PathBuf,
    /// Handling of undecodable registry rows
    pub invalid_row_policy: InvalidRowPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            registry_path: PathBuf::from("Project_patient_information.csv"),
            credentials_path: PathBuf::from("Project_credentials.csv"),
            usage_log_path: PathBuf::from("usage_statistics.csv"),
            invalid_row_policy: InvalidRowPolicy::Skip,
        }
    }
}

impl RegistryConfig {
    /// Load from a TOML file. Missing keys take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// All three files inside one directory, with their default names.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        let defaults = Self::default();
        Self {
            registry_path: dir.join(defaults.registry_path),
            credentials_path: dir.join(defaults.credentials_path),
            usage_log_path: dir.join(defaults.usage_log_path),
            invalid_row_policy: defaults.invalid_row_policy,
        }
    }
}
