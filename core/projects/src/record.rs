//! Project record data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use projectdrive_common::{AdminIdentity, ExportLink, FolderRef, ProjectCode, Provider};
use projectdrive_storage::ProjectTree;

/// Audit action recorded when a project is created.
pub const ACTION_CREATE: &str = "create";
/// Audit action recorded when an export link is created or confirmed.
pub const ACTION_EXPORT_LINK_READY: &str = "export_link_ready";
/// Audit action recorded when an export link is revoked.
pub const ACTION_EXPORT_LINK_REVOKED: &str = "export_link_revoked";

/// One successful provisioning action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub action: String,
    pub at: DateTime<Utc>,
    pub by: String,
}

impl AuditEntry {
    pub fn new(action: impl Into<String>, at: DateTime<Utc>, by: &AdminIdentity) -> Self {
        Self {
            action: action.into(),
            at,
            by: by.subject.clone(),
        }
    }
}

/// Where a project lives on its provider.
///
/// The provider tag never changes once written; only the fields inside the
/// variant do. `export_link` is present exactly while a link is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum StorageRecord {
    #[serde(rename_all = "camelCase")]
    Dropbox {
        root_path: String,
        export_path: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        export_link: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        export_link_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Gdrive {
        root_id: String,
        export_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        export_link: Option<String>,
    },
}

impl StorageRecord {
    /// Record for a freshly provisioned tree, with no export link.
    pub fn from_tree(provider: Provider, tree: &ProjectTree) -> Self {
        match provider {
            Provider::Dropbox => StorageRecord::Dropbox {
                root_path: tree.root.to_string(),
                export_path: Some(tree.export.to_string()),
                export_link: None,
                export_link_id: None,
            },
            Provider::Gdrive => StorageRecord::Gdrive {
                root_id: tree.root.to_string(),
                export_id: Some(tree.export.to_string()),
                export_link: None,
            },
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            StorageRecord::Dropbox { .. } => Provider::Dropbox,
            StorageRecord::Gdrive { .. } => Provider::Gdrive,
        }
    }

    /// Handle of the export folder, if one was recorded.
    pub fn export_folder(&self) -> Option<FolderRef> {
        let export = match self {
            StorageRecord::Dropbox { export_path, .. } => export_path,
            StorageRecord::Gdrive { export_id, .. } => export_id,
        };
        export
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(FolderRef::new)
    }

    /// The active export link, if any.
    pub fn export_link(&self) -> Option<ExportLink> {
        match self {
            StorageRecord::Dropbox {
                export_link,
                export_link_id,
                ..
            } => export_link.as_ref().map(|url| ExportLink {
                url: url.clone(),
                id: export_link_id.clone(),
            }),
            StorageRecord::Gdrive { export_link, .. } => export_link.as_ref().map(|url| ExportLink {
                url: url.clone(),
                id: None,
            }),
        }
    }

    /// Record `link` as the active export link.
    ///
    /// Drive links carry no id; one supplied anyway is dropped.
    pub fn set_export_link(&mut self, link: &ExportLink) {
        match self {
            StorageRecord::Dropbox {
                export_link,
                export_link_id,
                ..
            } => {
                *export_link = Some(link.url.clone());
                *export_link_id = link.id.clone();
            }
            StorageRecord::Gdrive { export_link, .. } => {
                *export_link = Some(link.url.clone());
            }
        }
    }

    pub fn clear_export_link(&mut self) {
        match self {
            StorageRecord::Dropbox {
                export_link,
                export_link_id,
                ..
            } => {
                *export_link = None;
                *export_link_id = None;
            }
            StorageRecord::Gdrive { export_link, .. } => {
                *export_link = None;
            }
        }
    }
}

/// Durable record of an event project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub project_code: ProjectCode,
    pub event_name: String,
    pub event_date: String,
    pub storage: StorageRecord,
    /// Append-only, in insertion order.
    pub audit: Vec<AuditEntry>,
    pub created_at: DateTime<Utc>,
}
