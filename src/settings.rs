//! Package settings
//!
//! Controls how a document is laid out and written. Settings are plain RON,
//! every field optional:
//!
//! ```text
//! (
//!   compress_records: true,
//!   root_name: "My Game",
//! )
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identifier::DEFAULT_ATTEMPT_LIMIT;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageSettings {
    /// Brotli compress record files on save (reading always auto-detects)
    pub compress_records: bool,
    /// Collision retries before identifier issuance fails
    pub identifier_attempts: usize,
    /// Name given to the root folder of a new project tree
    pub root_name: String,
    /// Folders created under the root of a new project
    pub default_folders: Vec<String>,
}

impl Default for PackageSettings {
    fn default() -> Self {
        Self {
            compress_records: false,
            identifier_attempts: DEFAULT_ATTEMPT_LIMIT,
            root_name: "Game".to_string(),
            default_folders: vec!["Scenes".to_string(), "Assets".to_string()],
        }
    }
}

impl PackageSettings {
    /// Load settings from a RON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Parse settings from RON text and validate them
    pub fn from_ron_str(s: &str) -> Result<Self, SettingsError> {
        let settings: Self = ron::from_str(s)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.identifier_attempts < DEFAULT_ATTEMPT_LIMIT {
            return Err(SettingsError::Invalid(format!(
                "identifier_attempts must be at least {}, got {}",
                DEFAULT_ATTEMPT_LIMIT, self.identifier_attempts
            )));
        }
        if self.root_name.trim().is_empty() {
            return Err(SettingsError::Invalid("root_name is empty".to_string()));
        }
        Ok(())
    }
}
