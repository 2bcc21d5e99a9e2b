//! Google Drive backend.
//!
//! This module provides project storage on Google Drive with:
//! - Service account authentication with a cached access token
//! - Lookup-before-create folder provisioning
//! - "Anyone with the link" export sharing and revocation

pub mod auth;
pub mod client;
pub mod provider;

pub use auth::ServiceAccountEndpoint;
pub use client::{DriveApi, DriveClient, DriveFile, Permission};
pub use provider::{create_gdrive_storage, DriveStorage};
