//! Project records and the provisioning workflow built on them.
//!
//! This crate provides:
//! - Project code generation and collision-checked allocation
//! - The project record with its provider-tagged storage and audit trail
//! - Project record stores (in-memory and local JSON files)
//! - The provisioning service tying records to storage backends

pub mod code;
pub mod record;
pub mod service;
pub mod store;

pub use code::{allocate_project_code, make_project_code, slugify, MAX_CODE_INDEX};
pub use record::{AuditEntry, Project, StorageRecord};
pub use service::{LinkOutcome, NewProject, ProvisioningService};
pub use store::{LocalProjectStore, MemoryProjectStore, ProjectStore};
