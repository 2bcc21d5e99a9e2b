//! Project storage provisioning on cloud storage providers.
//!
//! This crate creates the fixed folder tree of a new project and manages the
//! public export link of its delivery folder, on Dropbox or Google Drive,
//! behind one [`ProjectStorage`] contract.
//!
//! # Design Principles
//! - Idempotent provisioning: "already exists" is success, never an error
//! - Get-or-create links: an active link is never replaced
//! - Provider isolation: provider quirks stay inside their backend module
//! - Process-local token caching with an injected clock

pub mod auth;
pub mod clock;
pub mod config;
pub mod dropbox;
pub mod gdrive;
pub mod provider;
pub mod registry;
pub mod tree;

pub use auth::{IssuedToken, TokenCache, TokenEndpoint};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DriveConfig, DropboxConfig};
pub use provider::{ProjectStorage, RevokeTarget};
pub use registry::{create_registry_from_env, http_client, StorageRegistry};
pub use tree::{ProjectTree, EXPORT_FOLDER, PROJECT_SUBFOLDERS};
