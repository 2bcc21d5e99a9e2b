//! Dropbox API v2 client.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use projectdrive_common::{Error, ExposeSecret, Provider, Result};

use crate::auth::TokenCache;

/// Dropbox RPC endpoint base URL.
pub const DROPBOX_API_BASE: &str = "https://api.dropboxapi.com/2";

/// Header selecting the team member a team-scoped token acts as.
const SELECT_USER_HEADER: &str = "Dropbox-API-Select-User";

/// Whether an `error_summary` says the target already exists.
///
/// Covers folder creation (`path/conflict/folder/..`) and shared link
/// creation (`shared_link_already_exists/..`). A conflict with a *file*
/// (`path/conflict/file/..`) is a real error.
pub fn is_already_exists_error(error_summary: &str) -> bool {
    error_summary.starts_with("path/conflict/folder")
        || error_summary.starts_with("shared_link_already_exists")
}

/// Whether an `error_summary` says the shared link is unknown to Dropbox.
pub fn is_link_not_found_error(error_summary: &str) -> bool {
    error_summary.starts_with("shared_link_not_found")
}

/// A shared link as returned by the sharing endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedLink {
    pub url: String,
    pub id: Option<String>,
    #[serde(default)]
    pub path_lower: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListSharedLinksResponse {
    links: Vec<SharedLink>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_summary: String,
}

/// Dropbox operations used by provisioning.
///
/// Failures whose `error_summary` matches [`is_already_exists_error`] come
/// back as `Error::ProviderConflict`; any other failure is `Error::Provider`
/// carrying the raw response body.
#[async_trait]
pub trait DropboxApi: Send + Sync {
    /// `files/create_folder_v2` without autorename.
    async fn create_folder(&self, path: &str) -> Result<()>;

    /// `sharing/list_shared_links` for links directly on `path`.
    async fn list_shared_links(&self, path: &str) -> Result<Vec<SharedLink>>;

    /// `sharing/create_shared_link_with_settings`, public and view-only.
    async fn create_shared_link(&self, path: &str) -> Result<SharedLink>;

    /// `sharing/revoke_shared_link`.
    async fn revoke_shared_link(&self, url: &str) -> Result<()>;
}

/// HTTP implementation of [`DropboxApi`].
pub struct DropboxClient {
    http: Client,
    tokens: Arc<TokenCache>,
    base_url: String,
    team_member_id: Option<String>,
}

impl DropboxClient {
    pub fn new(http: Client, tokens: Arc<TokenCache>) -> Self {
        Self {
            http,
            tokens,
            base_url: DROPBOX_API_BASE.to_string(),
            team_member_id: None,
        }
    }

    /// Point at a different API base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Act as the given team member.
    pub fn with_team_member(mut self, member_id: Option<String>) -> Self {
        self.team_member_id = member_id;
        self
    }

    /// POST a JSON body to an RPC endpoint and return the successful response.
    async fn rpc(&self, endpoint: &str, body: serde_json::Value) -> Result<reqwest::Response> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let token = self.tokens.access_token().await?;

        let mut request = self
            .http
            .post(&url)
            .bearer_auth(token.expose_secret())
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body);

        if let Some(member) = &self.team_member_id {
            request = request.header(SELECT_USER_HEADER, member);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(format!("Dropbox {} failed: {}", endpoint, e)))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let raw = response.text().await.unwrap_or_default();

        let summary = serde_json::from_str::<ErrorBody>(&raw)
            .map(|b| b.error_summary)
            .unwrap_or_default();

        if status == StatusCode::CONFLICT && is_already_exists_error(&summary) {
            return Err(Error::ProviderConflict {
                provider: Provider::Dropbox,
                message: summary,
            });
        }

        Err(Error::Provider {
            provider: Provider::Dropbox,
            status: status.as_u16(),
            message: raw,
        })
    }

    async fn rpc_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        self.rpc(endpoint, body)
            .await?
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("Failed to parse Dropbox {}: {}", endpoint, e)))
    }
}

#[async_trait]
impl DropboxApi for DropboxClient {
    async fn create_folder(&self, path: &str) -> Result<()> {
        self.rpc(
            "files/create_folder_v2",
            serde_json::json!({ "path": path, "autorename": false }),
        )
        .await?;
        Ok(())
    }

    async fn list_shared_links(&self, path: &str) -> Result<Vec<SharedLink>> {
        let response: ListSharedLinksResponse = self
            .rpc_json(
                "sharing/list_shared_links",
                serde_json::json!({ "path": path, "direct_only": true }),
            )
            .await?;
        Ok(response.links)
    }

    async fn create_shared_link(&self, path: &str) -> Result<SharedLink> {
        self.rpc_json(
            "sharing/create_shared_link_with_settings",
            serde_json::json!({
                "path": path,
                "settings": {
                    "requested_visibility": "public",
                    "audience": "public",
                    "access": "viewer"
                }
            }),
        )
        .await
    }

    async fn revoke_shared_link(&self, url: &str) -> Result<()> {
        match self
            .rpc("sharing/revoke_shared_link", serde_json::json!({ "url": url }))
            .await
        {
            Ok(_) => Ok(()),
            Err(Error::Provider { message, .. })
                if serde_json::from_str::<ErrorBody>(&message)
                    .map(|b| is_link_not_found_error(&b.error_summary))
                    .unwrap_or(false) =>
            {
                tracing::debug!(%url, "Dropbox link already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
