//! Project record stores.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use projectdrive_common::{Error, ProjectCode, Result};

use crate::record::{AuditEntry, Project, StorageRecord};

/// Durable record per project.
///
/// Writes to one project are last-write-wins; the store does not coordinate
/// concurrent updates beyond refusing a second `create` for the same code.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Check whether a project with this code exists.
    async fn exists(&self, code: &ProjectCode) -> Result<bool>;

    /// Load a project.
    ///
    /// # Errors
    /// - `Error::NotFound` if there is no such project
    async fn get(&self, code: &ProjectCode) -> Result<Project>;

    /// Persist a new project.
    ///
    /// # Errors
    /// - `Error::AlreadyExists` if the code is taken
    async fn create(&self, project: &Project) -> Result<()>;

    /// Replace a project's storage record and append one audit entry.
    ///
    /// # Preconditions
    /// - `storage` has the same provider as the stored record
    ///
    /// # Errors
    /// - `Error::NotFound` if there is no such project
    /// - `Error::Precondition` if the provider would change
    async fn update_storage(
        &self,
        code: &ProjectCode,
        storage: StorageRecord,
        entry: AuditEntry,
    ) -> Result<Project>;
}

fn apply_update(project: &mut Project, storage: StorageRecord, entry: AuditEntry) -> Result<()> {
    if project.storage.provider() != storage.provider() {
        return Err(Error::Precondition(format!(
            "Project {} is stored on {}; provider cannot change to {}",
            project.project_code,
            project.storage.provider(),
            storage.provider()
        )));
    }
    project.storage = storage;
    project.audit.push(entry);
    Ok(())
}

fn not_found(code: &ProjectCode) -> Error {
    Error::NotFound(format!("Project not found: {}", code))
}

/// In-memory project store.
///
/// Useful for testing and development. Records are lost on drop.
#[derive(Default)]
pub struct MemoryProjectStore {
    projects: RwLock<HashMap<ProjectCode, Project>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn exists(&self, code: &ProjectCode) -> Result<bool> {
        Ok(self.projects.read().await.contains_key(code))
    }

    async fn get(&self, code: &ProjectCode) -> Result<Project> {
        self.projects
            .read()
            .await
            .get(code)
            .cloned()
            .ok_or_else(|| not_found(code))
    }

    async fn create(&self, project: &Project) -> Result<()> {
        let mut projects = self.projects.write().await;
        if projects.contains_key(&project.project_code) {
            return Err(Error::AlreadyExists(format!(
                "Project already exists: {}",
                project.project_code
            )));
        }
        projects.insert(project.project_code.clone(), project.clone());
        Ok(())
    }

    async fn update_storage(
        &self,
        code: &ProjectCode,
        storage: StorageRecord,
        entry: AuditEntry,
    ) -> Result<Project> {
        let mut projects = self.projects.write().await;
        let project = projects.get_mut(code).ok_or_else(|| not_found(code))?;
        apply_update(project, storage, entry)?;
        Ok(project.clone())
    }
}

/// Project store keeping one JSON document per project in a directory.
///
/// Documents are written to a temporary file and renamed into place, so a
/// reader never sees a half-written record.
pub struct LocalProjectStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalProjectStore {
    /// Open a store rooted at `root`.
    ///
    /// # Postconditions
    /// - Root directory is created if it doesn't exist
    ///
    /// # Errors
    /// - Permission denied
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, code: &ProjectCode) -> PathBuf {
        self.root.join(format!("{}.json", code))
    }

    async fn read(&self, code: &ProjectCode) -> Result<Project> {
        let bytes = match fs::read(self.document_path(code)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found(code)),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write(&self, project: &Project) -> Result<()> {
        let target = self.document_path(&project.project_code);
        let temp = self.root.join(format!(
            ".{}.{}.tmp",
            project.project_code,
            Uuid::new_v4()
        ));

        let bytes = serde_json::to_vec_pretty(project)?;
        fs::write(&temp, &bytes).await?;
        if let Err(e) = fs::rename(&temp, &target).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl ProjectStore for LocalProjectStore {
    async fn exists(&self, code: &ProjectCode) -> Result<bool> {
        Ok(fs::try_exists(self.document_path(code)).await?)
    }

    async fn get(&self, code: &ProjectCode) -> Result<Project> {
        self.read(code).await
    }

    async fn create(&self, project: &Project) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self.exists(&project.project_code).await? {
            return Err(Error::AlreadyExists(format!(
                "Project already exists: {}",
                project.project_code
            )));
        }
        self.write(project).await
    }

    async fn update_storage(
        &self,
        code: &ProjectCode,
        storage: StorageRecord,
        entry: AuditEntry,
    ) -> Result<Project> {
        let _guard = self.write_lock.lock().await;
        let mut project = self.read(code).await?;
        apply_update(&mut project, storage, entry)?;
        self.write(&project).await?;
        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use projectdrive_common::{AdminIdentity, ExportLink, Provider};
    use tempfile::TempDir;

    fn project(code: &str) -> Project {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let admin = AdminIdentity::new("ana@studio.example");
        Project {
            project_code: ProjectCode::new(code).unwrap(),
            event_name: "Boda Ana".to_string(),
            event_date: "2025-06-15".to_string(),
            storage: StorageRecord::Gdrive {
                root_id: "root1".to_string(),
                export_id: Some("export1".to_string()),
                export_link: None,
            },
            audit: vec![
                AuditEntry::new("create", at, &admin),
                AuditEntry::new("gdrive_tree_created", at, &admin),
            ],
            created_at: at,
        }
    }

    fn linked(storage: &StorageRecord) -> StorageRecord {
        let mut storage = storage.clone();
        storage.set_export_link(&ExportLink {
            url: "https://drive.google.com/drive/folders/export1".to_string(),
            id: None,
        });
        storage
    }

    async fn exercise(store: &dyn ProjectStore) {
        let original = project("VX001_boda-ana_2025-06-15");
        let code = original.project_code.clone();

        assert!(!store.exists(&code).await.unwrap());
        assert!(matches!(store.get(&code).await, Err(Error::NotFound(_))));

        store.create(&original).await.unwrap();
        assert!(store.exists(&code).await.unwrap());
        assert_eq!(store.get(&code).await.unwrap(), original);

        let duplicate = store.create(&original).await;
        assert!(matches!(duplicate, Err(Error::AlreadyExists(_))));

        let entry = AuditEntry::new(
            "export_link_ready",
            Utc::now(),
            &AdminIdentity::new("ana@studio.example"),
        );
        let updated = store
            .update_storage(&code, linked(&original.storage), entry.clone())
            .await
            .unwrap();
        assert!(updated.storage.export_link().is_some());
        assert_eq!(updated.audit.len(), 3);
        assert_eq!(updated.audit[..2], original.audit[..]);
        assert_eq!(updated.audit[2], entry);
        assert_eq!(store.get(&code).await.unwrap(), updated);
    }

    async fn exercise_provider_is_immutable(store: &dyn ProjectStore) {
        let original = project("VX002_boda-ana_2025-06-15");
        store.create(&original).await.unwrap();

        let dropbox = StorageRecord::Dropbox {
            root_path: "/VX002_boda-ana_2025-06-15".to_string(),
            export_path: None,
            export_link: None,
            export_link_id: None,
        };
        let entry = AuditEntry::new("export_link_ready", Utc::now(), &AdminIdentity::new("x"));
        let result = store
            .update_storage(&original.project_code, dropbox, entry)
            .await;

        assert!(matches!(result, Err(Error::Precondition(_))));
        let stored = store.get(&original.project_code).await.unwrap();
        assert_eq!(stored.storage.provider(), Provider::Gdrive);
        assert_eq!(stored.audit.len(), 2);
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryProjectStore::new();
        exercise(&store).await;
        exercise_provider_is_immutable(&store).await;
    }

    #[tokio::test]
    async fn test_local_store() {
        let temp = TempDir::new().unwrap();
        let store = LocalProjectStore::new(temp.path().join("projects")).unwrap();
        exercise(&store).await;
        exercise_provider_is_immutable(&store).await;
    }

    #[tokio::test]
    async fn test_local_store_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let original = project("VX001_boda-ana_2025-06-15");
        {
            let store = LocalProjectStore::new(temp.path()).unwrap();
            store.create(&original).await.unwrap();
        }

        let store = LocalProjectStore::new(temp.path()).unwrap();
        assert_eq!(store.get(&original.project_code).await.unwrap(), original);

        // Only the document is left behind, no temporary files.
        let names: Vec<String> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["VX001_boda-ana_2025-06-15.json".to_string()]);
    }

    #[tokio::test]
    async fn test_local_store_corrupt_document() {
        let temp = TempDir::new().unwrap();
        let store = LocalProjectStore::new(temp.path()).unwrap();
        std::fs::write(temp.path().join("VX009_x_2025-01-01.json"), b"{not json").unwrap();

        let code = ProjectCode::new("VX009_x_2025-01-01").unwrap();
        assert!(matches!(
            store.get(&code).await,
            Err(Error::Serialization(_))
        ));
    }
}
