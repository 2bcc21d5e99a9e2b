//! Dropbox project storage.

use async_trait::async_trait;
use std::sync::Arc;

use projectdrive_common::{Error, ExportLink, FolderRef, ProjectCode, Provider, Result};

use crate::auth::TokenCache;
use crate::clock::Clock;
use crate::config::DropboxConfig;
use crate::provider::{ProjectStorage, RevokeTarget};
use crate::tree::{ProjectTree, EXPORT_FOLDER, PROJECT_SUBFOLDERS};

use super::auth::DropboxRefreshEndpoint;
use super::client::{DropboxApi, DropboxClient, SharedLink};

/// Dropbox implementation of [`ProjectStorage`].
///
/// Folders are addressed by path, so the tree handles are paths rooted at
/// the configured base path.
pub struct DropboxStorage<A = DropboxClient> {
    api: A,
    root_path: String,
}

impl<A: DropboxApi> DropboxStorage<A> {
    pub fn new(api: A, root_path: impl Into<String>) -> Self {
        Self {
            api,
            root_path: root_path.into(),
        }
    }

    fn project_root(&self, code: &ProjectCode) -> String {
        format!("{}/{}", self.root_path, code)
    }

    /// Create a folder, treating "already exists" as success.
    async fn ensure_folder(&self, path: &str) -> Result<()> {
        match self.api.create_folder(path).await {
            Ok(()) => {
                tracing::debug!(%path, "Created Dropbox folder");
                Ok(())
            }
            Err(Error::ProviderConflict { message, .. }) => {
                tracing::debug!(%path, %message, "Dropbox folder already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn to_export_link(link: SharedLink) -> ExportLink {
        ExportLink {
            url: link.url,
            id: link.id,
        }
    }
}

/// Build a Dropbox backend from configuration.
pub fn create_dropbox_storage(
    http: reqwest::Client,
    clock: Arc<dyn Clock>,
    config: &DropboxConfig,
) -> DropboxStorage<DropboxClient> {
    let endpoint = DropboxRefreshEndpoint::new(http.clone(), config);
    let tokens = Arc::new(TokenCache::new(Arc::new(endpoint), clock));
    let client = DropboxClient::new(http, tokens).with_team_member(config.team_member_id.clone());
    DropboxStorage::new(client, config.root_path.clone())
}

#[async_trait]
impl<A: DropboxApi> ProjectStorage for DropboxStorage<A> {
    fn provider(&self) -> Provider {
        Provider::Dropbox
    }

    async fn create_project_tree(&self, code: &ProjectCode) -> Result<ProjectTree> {
        let root = self.project_root(code);
        self.ensure_folder(&root).await?;

        for name in PROJECT_SUBFOLDERS {
            self.ensure_folder(&format!("{}/{}", root, name)).await?;
        }

        tracing::info!(project = %code, %root, "Dropbox project tree ready");

        Ok(ProjectTree {
            export: FolderRef::new(format!("{}/{}", root, EXPORT_FOLDER)),
            root: FolderRef::new(root),
        })
    }

    async fn get_or_create_export_link(&self, folder: &FolderRef) -> Result<ExportLink> {
        let path = folder.as_str();

        if let Some(existing) = self.api.list_shared_links(path).await?.into_iter().next() {
            tracing::debug!(%path, "Reusing existing Dropbox shared link");
            return Ok(Self::to_export_link(existing));
        }

        match self.api.create_shared_link(path).await {
            Ok(link) => {
                tracing::info!(%path, "Created Dropbox shared link");
                Ok(Self::to_export_link(link))
            }
            // Someone else created it between our list and create.
            Err(Error::ProviderConflict { message, .. }) => {
                tracing::debug!(%path, %message, "Dropbox shared link appeared concurrently");
                self.api
                    .list_shared_links(path)
                    .await?
                    .into_iter()
                    .next()
                    .map(Self::to_export_link)
                    .ok_or_else(|| Error::Provider {
                        provider: Provider::Dropbox,
                        status: 409,
                        message,
                    })
            }
            Err(e) => Err(e),
        }
    }

    async fn revoke_export_link(&self, target: &RevokeTarget) -> Result<()> {
        let Some(link) = &target.link else {
            tracing::debug!(folder = %target.folder, "No Dropbox link recorded, nothing to revoke");
            return Ok(());
        };

        self.api.revoke_shared_link(&link.url).await?;
        tracing::info!(folder = %target.folder, link_id = ?link.id, "Revoked Dropbox shared link");
        Ok(())
    }
}
