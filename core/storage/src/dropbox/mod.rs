//! Dropbox backend.
//!
//! - OAuth2 refresh-token grant with a cached access token
//! - Folder tree creation tolerant of `path/conflict/folder` errors
//! - Shared link get-or-create and revocation

pub mod auth;
pub mod client;
pub mod provider;

pub use auth::DropboxRefreshEndpoint;
pub use client::{is_already_exists_error, DropboxApi, DropboxClient, SharedLink};
pub use provider::{create_dropbox_storage, DropboxStorage};
