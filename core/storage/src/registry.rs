//! Registry resolving a project's provider to its storage backend.

use std::collections::HashMap;
use std::sync::Arc;

use projectdrive_common::{Error, Provider, Result};

use crate::clock::Clock;
use crate::config::{DriveConfig, DropboxConfig};
use crate::dropbox::create_dropbox_storage;
use crate::gdrive::create_gdrive_storage;
use crate::provider::ProjectStorage;

/// Storage backends by provider.
///
/// A provider that failed to configure is remembered together with the
/// reason, which is returned on every attempt to use it.
pub struct StorageRegistry {
    backends: HashMap<Provider, Arc<dyn ProjectStorage>>,
    unavailable: HashMap<Provider, String>,
}

impl StorageRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            unavailable: HashMap::new(),
        }
    }

    /// Register a backend under its own provider.
    ///
    /// # Errors
    /// - Returns error if the provider is already registered
    pub fn register(&mut self, backend: Arc<dyn ProjectStorage>) -> Result<()> {
        let provider = backend.provider();
        if self.backends.contains_key(&provider) {
            return Err(Error::AlreadyExists(format!(
                "Provider '{}' is already registered",
                provider
            )));
        }
        self.unavailable.remove(&provider);
        self.backends.insert(provider, backend);
        Ok(())
    }

    /// Record why a provider cannot be used.
    pub fn mark_unavailable(&mut self, provider: Provider, reason: impl Into<String>) {
        if !self.backends.contains_key(&provider) {
            self.unavailable.insert(provider, reason.into());
        }
    }

    /// Resolve the backend for a provider.
    ///
    /// # Errors
    /// - `Error::Configuration` if the provider is unavailable or was never set up
    pub fn resolve(&self, provider: Provider) -> Result<Arc<dyn ProjectStorage>> {
        if let Some(backend) = self.backends.get(&provider) {
            return Ok(backend.clone());
        }
        Err(Error::Configuration(
            self.unavailable
                .get(&provider)
                .cloned()
                .unwrap_or_else(|| format!("Provider '{}' is not configured", provider)),
        ))
    }

    /// Providers with a working backend.
    pub fn available(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| self.backends.contains_key(p))
            .collect()
    }

    pub fn is_available(&self, provider: Provider) -> bool {
        self.backends.contains_key(&provider)
    }
}

impl Default for StorageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the HTTP client shared by all provider clients.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("projectdrive/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::Configuration(format!("Failed to create HTTP client: {}", e)))
}

/// Create a registry with every provider configured from the environment.
///
/// Providers with missing or invalid configuration are marked unavailable
/// and logged rather than failing startup.
pub fn create_registry_from_env(
    http: reqwest::Client,
    clock: Arc<dyn Clock>,
) -> StorageRegistry {
    let mut registry = StorageRegistry::new();

    match DropboxConfig::from_env() {
        Ok(config) => {
            let backend = create_dropbox_storage(http.clone(), clock.clone(), &config);
            // Fresh registry, cannot collide.
            let _ = registry.register(Arc::new(backend));
        }
        Err(e) => {
            tracing::warn!(provider = "dropbox", "{}", e);
            registry.mark_unavailable(Provider::Dropbox, e.to_string());
        }
    }

    match DriveConfig::from_env().and_then(|config| create_gdrive_storage(http, clock, &config)) {
        Ok(backend) => {
            let _ = registry.register(Arc::new(backend));
        }
        Err(e) => {
            tracing::warn!(provider = "gdrive", "{}", e);
            registry.mark_unavailable(Provider::Gdrive, e.to_string());
        }
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::RevokeTarget;
    use crate::tree::ProjectTree;
    use async_trait::async_trait;
    use projectdrive_common::{ExportLink, FolderRef, ProjectCode};

    struct NullStorage(Provider);

    #[async_trait]
    impl ProjectStorage for NullStorage {
        fn provider(&self) -> Provider {
            self.0
        }

        async fn create_project_tree(&self, code: &ProjectCode) -> Result<ProjectTree> {
            Ok(ProjectTree {
                root: FolderRef::new(code.as_str()),
                export: FolderRef::new(code.as_str()),
            })
        }

        async fn get_or_create_export_link(&self, folder: &FolderRef) -> Result<ExportLink> {
            Ok(ExportLink {
                url: folder.to_string(),
                id: None,
            })
        }

        async fn revoke_export_link(&self, _target: &RevokeTarget) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = StorageRegistry::new();
        registry
            .register(Arc::new(NullStorage(Provider::Dropbox)))
            .unwrap();

        let backend = registry.resolve(Provider::Dropbox).unwrap();
        assert_eq!(backend.provider(), Provider::Dropbox);
        assert_eq!(registry.available(), vec![Provider::Dropbox]);
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = StorageRegistry::new();
        registry
            .register(Arc::new(NullStorage(Provider::Gdrive)))
            .unwrap();
        let result = registry.register(Arc::new(NullStorage(Provider::Gdrive)));
        assert!(matches!(result, Err(Error::AlreadyExists(_))));
    }

    #[test]
    fn test_unavailable_reason_surfaces_on_use() {
        let mut registry = StorageRegistry::new();
        registry.mark_unavailable(
            Provider::Gdrive,
            "Google Drive is not configured; missing environment variables: GDRIVE_PRIVATE_KEY",
        );

        match registry.resolve(Provider::Gdrive) {
            Err(Error::Configuration(msg)) => assert!(msg.contains("GDRIVE_PRIVATE_KEY")),
            _ => panic!("expected configuration error"),
        }
        assert!(!registry.is_available(Provider::Gdrive));
    }

    #[test]
    fn test_resolve_unknown_fails() {
        let registry = StorageRegistry::new();
        assert!(matches!(
            registry.resolve(Provider::Dropbox),
            Err(Error::Configuration(_))
        ));
    }
}
