//! Common error types for project provisioning.

use thiserror::Error;

use crate::types::Provider;

/// Top-level error type for provisioning operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Token refresh or admin-token verification failed.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Required configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Referenced project or folder reference is missing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation requested on a project missing a needed storage reference.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Provider reports the resource already exists.
    ///
    /// Resolved inside the provisioners and never returned to callers of
    /// the storage contract.
    #[error("Already exists on {provider}: {message}")]
    ProviderConflict { provider: Provider, message: String },

    /// Any other non-success provider response. `message` is the raw body.
    #[error("{provider} API error ({status}): {message}")]
    Provider {
        provider: Provider,
        status: u16,
        message: String,
    },

    /// Transport-level failure talking to a provider.
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No free project code within the allowed index range.
    #[error("No free project code for '{0}'")]
    CodeExhausted(String),

    /// Resource already exists in the project record store.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
