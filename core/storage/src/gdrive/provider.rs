//! Google Drive project storage.

use async_trait::async_trait;
use std::sync::Arc;

use projectdrive_common::{ExportLink, FolderRef, ProjectCode, Provider, Result};

use crate::auth::TokenCache;
use crate::clock::Clock;
use crate::config::DriveConfig;
use crate::provider::{ProjectStorage, RevokeTarget};
use crate::tree::{ProjectTree, EXPORT_FOLDER, PROJECT_SUBFOLDERS};

use super::auth::ServiceAccountEndpoint;
use super::client::{DriveApi, DriveClient, DriveFile};

/// Google Drive implementation of [`ProjectStorage`].
///
/// Drive accepts duplicate names, so every folder is looked up by name
/// before it is created. Export links are the folder's `webViewLink` made
/// public through an "anyone" reader permission; revocation finds that
/// permission again by type, so no link id is kept.
pub struct DriveStorage<A = DriveClient> {
    api: A,
    root_folder_id: String,
}

impl<A: DriveApi> DriveStorage<A> {
    pub fn new(api: A, root_folder_id: impl Into<String>) -> Self {
        Self {
            api,
            root_folder_id: root_folder_id.into(),
        }
    }

    /// Find the named folder under `parent_id`, creating it if absent.
    async fn ensure_folder(&self, name: &str, parent_id: &str) -> Result<DriveFile> {
        if let Some(existing) = self.api.find_folder(name, parent_id).await? {
            tracing::debug!(%name, id = %existing.id, "Drive folder already exists");
            return Ok(existing);
        }

        let created = self.api.create_folder(name, parent_id).await?;
        tracing::debug!(%name, id = %created.id, "Created Drive folder");
        Ok(created)
    }

    fn folder_url(file: &DriveFile) -> String {
        file.web_view_link
            .clone()
            .unwrap_or_else(|| format!("https://drive.google.com/drive/folders/{}", file.id))
    }
}

/// Build a Drive backend from configuration.
///
/// # Errors
/// - `Error::Configuration` if the service account key cannot be parsed
pub fn create_gdrive_storage(
    http: reqwest::Client,
    clock: Arc<dyn Clock>,
    config: &DriveConfig,
) -> Result<DriveStorage<DriveClient>> {
    let endpoint = ServiceAccountEndpoint::new(http.clone(), config, clock.clone())?;
    let tokens = Arc::new(TokenCache::new(Arc::new(endpoint), clock));
    let client = DriveClient::new(http, tokens);
    Ok(DriveStorage::new(client, config.root_folder_id.clone()))
}

#[async_trait]
impl<A: DriveApi> ProjectStorage for DriveStorage<A> {
    fn provider(&self) -> Provider {
        Provider::Gdrive
    }

    async fn create_project_tree(&self, code: &ProjectCode) -> Result<ProjectTree> {
        let root = self.ensure_folder(code.as_str(), &self.root_folder_id).await?;

        let mut export = None;
        for name in PROJECT_SUBFOLDERS {
            let folder = self.ensure_folder(name, &root.id).await?;
            if name == EXPORT_FOLDER {
                export = Some(folder.id);
            }
        }

        tracing::info!(project = %code, root_id = %root.id, "Drive project tree ready");

        Ok(ProjectTree {
            root: FolderRef::new(root.id),
            // EXPORT_FOLDER is always part of PROJECT_SUBFOLDERS.
            export: FolderRef::new(export.unwrap_or_default()),
        })
    }

    async fn get_or_create_export_link(&self, folder: &FolderRef) -> Result<ExportLink> {
        let file = self.api.get_sharing(folder.as_str()).await?;

        if file.anyone_permission().is_some() {
            tracing::debug!(folder = %folder, "Drive folder already public");
        } else {
            let permission = self.api.create_anyone_reader(folder.as_str()).await?;
            tracing::info!(folder = %folder, permission_id = %permission.id, "Made Drive folder public");
        }

        Ok(ExportLink {
            url: Self::folder_url(&file),
            id: None,
        })
    }

    async fn revoke_export_link(&self, target: &RevokeTarget) -> Result<()> {
        let file = self.api.get_sharing(target.folder.as_str()).await?;

        match file.anyone_permission() {
            Some(permission) => {
                self.api
                    .delete_permission(target.folder.as_str(), &permission.id)
                    .await?;
                tracing::info!(folder = %target.folder, "Revoked Drive public access");
            }
            None => {
                tracing::debug!(folder = %target.folder, "Drive folder not public, nothing to revoke");
            }
        }

        Ok(())
    }
}
