//! Google Drive API client.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use projectdrive_common::{Error, ExposeSecret, Provider, Result};

use crate::auth::TokenCache;

/// Google Drive API base URL.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// MIME type Drive uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

const FOLDER_FIELDS: &str = "id,name,mimeType";
const SHARING_FIELDS: &str = "id,name,mimeType,webViewLink,permissions(id,type,role)";

/// Google Drive file metadata from API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// File ID.
    pub id: String,
    /// File name.
    pub name: String,
    /// MIME type.
    pub mime_type: String,
    /// Browser link, when requested.
    #[serde(default)]
    pub web_view_link: Option<String>,
    /// Permissions, when requested.
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl DriveFile {
    /// Check if this is a folder.
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// The "anyone with the link" permission, if present.
    pub fn anyone_permission(&self) -> Option<&Permission> {
        self.permissions.iter().find(|p| p.kind == "anyone")
    }
}

/// A Drive permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub role: String,
}

/// Response from listing files.
#[derive(Debug, Deserialize)]
struct FileListResponse {
    files: Vec<DriveFile>,
}

/// Drive operations used by provisioning.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// `files.list` for a non-trashed folder named `name` directly under `parent_id`.
    async fn find_folder(&self, name: &str, parent_id: &str) -> Result<Option<DriveFile>>;

    /// `files.create` of a folder.
    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<DriveFile>;

    /// `files.get` with `webViewLink` and `permissions`.
    async fn get_sharing(&self, file_id: &str) -> Result<DriveFile>;

    /// `permissions.create` granting anyone with the link read access.
    async fn create_anyone_reader(&self, file_id: &str) -> Result<Permission>;

    /// `permissions.delete`. A permission that no longer exists is not an error.
    async fn delete_permission(&self, file_id: &str, permission_id: &str) -> Result<()>;
}

/// Quote a value for use inside a Drive query string literal.
fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// HTTP implementation of [`DriveApi`].
pub struct DriveClient {
    http: Client,
    tokens: Arc<TokenCache>,
    base_url: String,
}

impl DriveClient {
    /// Create a new Drive client.
    pub fn new(http: Client, tokens: Arc<TokenCache>) -> Self {
        Self {
            http,
            tokens,
            base_url: DRIVE_API_BASE.to_string(),
        }
    }

    /// Point at a different API base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Get authorization header.
    async fn auth_header(&self) -> Result<String> {
        let token = self.tokens.access_token().await?;
        Ok(format!("Bearer {}", token.expose_secret()))
    }

    /// Handle API response with error checking.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| Error::Serialization(format!("Failed to parse Drive response: {}", e)))
        } else {
            Err(Self::error_for(status, response.text().await.unwrap_or_default()))
        }
    }

    fn error_for(status: StatusCode, body: String) -> Error {
        match status {
            StatusCode::NOT_FOUND => Error::NotFound(format!("Drive resource not found: {}", body)),
            _ => Error::Provider {
                provider: Provider::Gdrive,
                status: status.as_u16(),
                message: body,
            },
        }
    }
}

#[async_trait]
impl DriveApi for DriveClient {
    async fn find_folder(&self, name: &str, parent_id: &str) -> Result<Option<DriveFile>> {
        let url = format!("{}/files", self.base_url);
        let auth = self.auth_header().await?;

        let query = format!(
            "name = '{}' and '{}' in parents and mimeType = '{}' and trashed = false",
            escape_query_value(name),
            escape_query_value(parent_id),
            FOLDER_MIME_TYPE
        );

        let response = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, auth)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id,name,mimeType)"),
                ("orderBy", "createdTime"),
                ("pageSize", "10"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to list Drive folder: {}", e)))?;

        let list: FileListResponse = self.handle_response(response).await?;
        Ok(list.files.into_iter().next())
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<DriveFile> {
        let url = format!("{}/files", self.base_url);
        let auth = self.auth_header().await?;

        let metadata = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
            "parents": [parent_id]
        });

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, auth)
            .query(&[("fields", FOLDER_FIELDS), ("supportsAllDrives", "true")])
            .json(&metadata)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to create Drive folder: {}", e)))?;

        self.handle_response(response).await
    }

    async fn get_sharing(&self, file_id: &str) -> Result<DriveFile> {
        let url = format!("{}/files/{}", self.base_url, file_id);
        let auth = self.auth_header().await?;

        let response = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, auth)
            .query(&[("fields", SHARING_FIELDS), ("supportsAllDrives", "true")])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to get Drive file: {}", e)))?;

        self.handle_response(response).await
    }

    async fn create_anyone_reader(&self, file_id: &str) -> Result<Permission> {
        let url = format!("{}/files/{}/permissions", self.base_url, file_id);
        let auth = self.auth_header().await?;

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, auth)
            .query(&[("fields", "id,type,role"), ("supportsAllDrives", "true")])
            .json(&serde_json::json!({
                "type": "anyone",
                "role": "reader",
                "allowFileDiscovery": false
            }))
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to create Drive permission: {}", e)))?;

        self.handle_response(response).await
    }

    async fn delete_permission(&self, file_id: &str, permission_id: &str) -> Result<()> {
        let url = format!(
            "{}/files/{}/permissions/{}",
            self.base_url, file_id, permission_id
        );
        let auth = self.auth_header().await?;

        let response = self
            .http
            .delete(&url)
            .header(header::AUTHORIZATION, auth)
            .query(&[("supportsAllDrives", "true")])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to delete Drive permission: {}", e)))?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(Self::error_for(status, response.text().await.unwrap_or_default()))
        }
    }
}
