//! Common types used throughout the provisioning crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cloud storage provider backing a project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Dropbox,
    #[default]
    Gdrive,
}

impl Provider {
    /// All supported providers.
    pub const ALL: [Provider; 2] = [Provider::Dropbox, Provider::Gdrive];

    /// Wire name, as stored in project records and accepted by the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Dropbox => "dropbox",
            Provider::Gdrive => "gdrive",
        }
    }

    /// Audit action recorded once the project tree exists on this provider.
    pub fn tree_created_action(&self) -> String {
        format!("{}_tree_created", self.as_str())
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "dropbox" => Ok(Provider::Dropbox),
            "gdrive" => Ok(Provider::Gdrive),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown provider '{}', expected 'dropbox' or 'gdrive'",
                other
            ))),
        }
    }
}

/// Human-readable unique identifier of an event project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectCode(String);

impl ProjectCode {
    /// Create a new ProjectCode from a string.
    ///
    /// # Errors
    /// - Returns error if the code is empty or contains path separators
    pub fn new(code: impl Into<String>) -> crate::Result<Self> {
        let code = code.into();
        if code.is_empty() {
            return Err(crate::Error::InvalidInput(
                "Project code cannot be empty".to_string(),
            ));
        }
        if code.contains('/') || code.contains('\\') {
            return Err(crate::Error::InvalidInput(format!(
                "Project code cannot contain separators: {}",
                code
            )));
        }
        Ok(Self(code))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProjectCode {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::new(value)
    }
}

impl From<ProjectCode> for String {
    fn from(code: ProjectCode) -> Self {
        code.0
    }
}

impl fmt::Display for ProjectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Provider-specific handle to a folder.
///
/// A path for Dropbox (`/VX001_boda-ana_2025-06-15/10_export`), a file id
/// for Google Drive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderRef(String);

impl FolderRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FolderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A public, read-only shareable link to an export folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportLink {
    pub url: String,
    /// Provider link id. Only Dropbox issues one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Verified administrator performing a provisioning action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity {
    /// Recorded as the `by` field of audit entries.
    pub subject: String,
}

impl AdminIdentity {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }
}
