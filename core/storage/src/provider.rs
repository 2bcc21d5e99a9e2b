//! Project storage contract shared by every provider backend.

use async_trait::async_trait;

use projectdrive_common::{ExportLink, FolderRef, ProjectCode, Provider, Result};

use crate::tree::ProjectTree;

/// What to revoke: the export folder and the link recorded for it, if any.
#[derive(Debug, Clone)]
pub struct RevokeTarget {
    pub folder: FolderRef,
    pub link: Option<ExportLink>,
}

/// Folder provisioning and export-link management for one provider.
///
/// Implementations are stateless apart from their token cache; every method
/// is safe to call concurrently and safe to repeat.
#[async_trait]
pub trait ProjectStorage: Send + Sync {
    /// The provider this backend talks to.
    fn provider(&self) -> Provider;

    /// Create the project root and its fixed subfolders.
    ///
    /// # Postconditions
    /// - Root and every subfolder exist exactly once
    /// - Calling again for the same code succeeds and returns the same handles
    ///
    /// # Errors
    /// - Authentication errors
    /// - Provider errors other than "already exists"
    async fn create_project_tree(&self, code: &ProjectCode) -> Result<ProjectTree>;

    /// Return the active export link for `folder`, creating one only if none exists.
    ///
    /// # Postconditions
    /// - Anyone with the returned URL can view the folder read-only
    /// - An already active link is returned unchanged
    async fn get_or_create_export_link(&self, folder: &FolderRef) -> Result<ExportLink>;

    /// Revoke public access to the export folder.
    ///
    /// Revoking when no link is active is a no-op.
    async fn revoke_export_link(&self, target: &RevokeTarget) -> Result<()>;
}
