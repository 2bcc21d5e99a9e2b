//! Common utilities and types shared across the project provisioning crates.
//!
//! This module provides the error taxonomy and the small value types that
//! flow between storage backends, the project record store and the HTTP layer.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use secrecy::{ExposeSecret, SecretString};
pub use types::{AdminIdentity, ExportLink, FolderRef, ProjectCode, Provider};
