//! Provisioning workflow: project records plus storage backends.

use serde::Deserialize;
use std::sync::Arc;

use projectdrive_common::{AdminIdentity, Error, ExportLink, ProjectCode, Provider, Result};
use projectdrive_storage::{Clock, ProjectStorage, RevokeTarget, StorageRegistry};

use crate::code::allocate_project_code;
use crate::record::{
    AuditEntry, Project, StorageRecord, ACTION_CREATE, ACTION_EXPORT_LINK_READY,
    ACTION_EXPORT_LINK_REVOKED,
};
use crate::store::ProjectStore;

/// Request to create a project.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub event_name: String,
    pub event_date: String,
    #[serde(default)]
    pub provider: Provider,
}

/// Result of a get-or-create export link call.
#[derive(Debug, Clone)]
pub struct LinkOutcome {
    pub link: ExportLink,
    pub project: Project,
}

/// Creates projects and manages their export links.
///
/// Every successful step appends one audit entry. Failed steps leave the
/// record untouched, so the trail only lists what actually happened.
pub struct ProvisioningService {
    store: Arc<dyn ProjectStore>,
    registry: Arc<StorageRegistry>,
    clock: Arc<dyn Clock>,
}

impl ProvisioningService {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        registry: Arc<StorageRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            registry,
            clock,
        }
    }

    /// Get the storage registry.
    pub fn registry(&self) -> &StorageRegistry {
        &self.registry
    }

    /// Create a project and its folder tree.
    ///
    /// # Postconditions
    /// - The folder tree exists on the chosen provider
    /// - The record is persisted with `create` and `<provider>_tree_created`
    ///   audit entries
    ///
    /// # Errors
    /// - `Error::InvalidInput` for an unusable event name or date
    /// - `Error::Configuration` if the provider is not set up
    /// - `Error::CodeExhausted` if no code is free
    /// - Provider errors from tree creation; nothing is persisted then
    pub async fn create_project(
        &self,
        request: NewProject,
        actor: &AdminIdentity,
    ) -> Result<Project> {
        let event_name = request.event_name.trim();
        if event_name.is_empty() {
            return Err(Error::InvalidInput("eventName is required".to_string()));
        }

        let backend = self.registry.resolve(request.provider)?;
        let code =
            allocate_project_code(self.store.as_ref(), event_name, &request.event_date).await?;

        let tree = backend.create_project_tree(&code).await?;

        let now = self.clock.now();
        let project = Project {
            project_code: code,
            event_name: event_name.to_string(),
            event_date: request.event_date.trim().to_string(),
            storage: StorageRecord::from_tree(request.provider, &tree),
            audit: vec![
                AuditEntry::new(ACTION_CREATE, now, actor),
                AuditEntry::new(request.provider.tree_created_action(), now, actor),
            ],
            created_at: now,
        };
        self.store.create(&project).await?;

        tracing::info!(
            project = %project.project_code,
            provider = %request.provider,
            by = %actor.subject,
            "Project provisioned"
        );
        Ok(project)
    }

    /// Load a project record.
    pub async fn get_project(&self, code: &ProjectCode) -> Result<Project> {
        self.store.get(code).await
    }

    /// Return the project's export link, creating it if none is active.
    ///
    /// # Errors
    /// - `Error::NotFound` if the project does not exist
    /// - `Error::Precondition` if the project lives on another provider or
    ///   has no export folder reference
    pub async fn get_or_create_export_link(
        &self,
        code: &ProjectCode,
        provider: Provider,
        actor: &AdminIdentity,
    ) -> Result<LinkOutcome> {
        let (project, backend) = self.load_for(code, provider).await?;
        let folder = project.storage.export_folder().ok_or_else(|| {
            Error::Precondition(format!("Project {} is missing export folder reference", code))
        })?;

        let link = backend.get_or_create_export_link(&folder).await?;

        let mut storage = project.storage.clone();
        storage.set_export_link(&link);
        let entry = AuditEntry::new(ACTION_EXPORT_LINK_READY, self.clock.now(), actor);
        let project = self.store.update_storage(code, storage, entry).await?;

        tracing::info!(project = %code, %provider, url = %link.url, "Export link ready");
        Ok(LinkOutcome { link, project })
    }

    /// Revoke the project's active export link.
    ///
    /// # Errors
    /// - `Error::NotFound` if the project does not exist
    /// - `Error::Precondition` if the project lives on another provider or
    ///   has no active export link
    pub async fn revoke_export_link(
        &self,
        code: &ProjectCode,
        provider: Provider,
        actor: &AdminIdentity,
    ) -> Result<Project> {
        let (project, backend) = self.load_for(code, provider).await?;
        let link = project.storage.export_link().ok_or_else(|| {
            Error::Precondition(format!("Project {} has no active export link", code))
        })?;
        let folder = project.storage.export_folder().ok_or_else(|| {
            Error::Precondition(format!("Project {} is missing export folder reference", code))
        })?;

        backend
            .revoke_export_link(&RevokeTarget {
                folder,
                link: Some(link),
            })
            .await?;

        let mut storage = project.storage.clone();
        storage.clear_export_link();
        let entry = AuditEntry::new(ACTION_EXPORT_LINK_REVOKED, self.clock.now(), actor);
        let project = self.store.update_storage(code, storage, entry).await?;

        tracing::info!(project = %code, %provider, "Export link revoked");
        Ok(project)
    }

    async fn load_for(
        &self,
        code: &ProjectCode,
        provider: Provider,
    ) -> Result<(Project, Arc<dyn ProjectStorage>)> {
        let project = self.store.get(code).await?;
        let stored = project.storage.provider();
        if stored != provider {
            return Err(Error::Precondition(format!(
                "Project {} is stored on {}, not {}",
                code, stored, provider
            )));
        }
        let backend = self.registry.resolve(provider)?;
        Ok((project, backend))
    }
}
