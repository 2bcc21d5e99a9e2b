//! Dropbox OAuth2 refresh-token grant.

use async_trait::async_trait;
use oauth2::basic::BasicClient;
use oauth2::{ClientId, ClientSecret, RefreshToken, RequestTokenError, TokenResponse, TokenUrl};
use reqwest::Client;

use projectdrive_common::{Error, ExposeSecret, Provider, Result, SecretString};

use crate::auth::{IssuedToken, TokenEndpoint, DEFAULT_LIFETIME_SECS};
use crate::config::DropboxConfig;

/// Dropbox OAuth2 token endpoint.
pub const DROPBOX_TOKEN_URL: &str = "https://api.dropboxapi.com/oauth2/token";

/// Exchanges the configured long-lived refresh token for access tokens.
pub struct DropboxRefreshEndpoint {
    http: Client,
    token_url: String,
    app_key: String,
    app_secret: SecretString,
    refresh_token: SecretString,
}

impl DropboxRefreshEndpoint {
    pub fn new(http: Client, config: &DropboxConfig) -> Self {
        Self {
            http,
            token_url: DROPBOX_TOKEN_URL.to_string(),
            app_key: config.app_key.clone(),
            app_secret: config.app_secret.clone(),
            refresh_token: config.refresh_token.clone(),
        }
    }

    /// Point at a different token endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }
}

/// Run an oauth2 token request over the shared reqwest client.
async fn send_token_request(
    http: Client,
    request: oauth2::HttpRequest,
) -> std::result::Result<oauth2::HttpResponse, reqwest::Error> {
    let response = http.execute(request.try_into()?).await?;

    let status = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();

    let mut out = oauth2::HttpResponse::new(body);
    *out.status_mut() = status;
    *out.headers_mut() = headers;
    Ok(out)
}

#[async_trait]
impl TokenEndpoint for DropboxRefreshEndpoint {
    fn provider(&self) -> Provider {
        Provider::Dropbox
    }

    async fn request_token(&self) -> Result<IssuedToken> {
        let token_url = TokenUrl::new(self.token_url.clone()).map_err(|e| {
            Error::Configuration(format!("Invalid Dropbox token URL {}: {}", self.token_url, e))
        })?;

        let client = BasicClient::new(ClientId::new(self.app_key.clone()))
            .set_client_secret(ClientSecret::new(self.app_secret.expose_secret().clone()))
            .set_token_uri(token_url);

        let http = self.http.clone();
        let send = move |request: oauth2::HttpRequest| send_token_request(http.clone(), request);

        let token_result = client
            .exchange_refresh_token(&RefreshToken::new(self.refresh_token.expose_secret().clone()))
            .request_async(&send)
            .await
            .map_err(|e| match e {
                RequestTokenError::Request(e) => {
                    Error::Network(format!("Failed to reach Dropbox token endpoint: {}", e))
                }
                RequestTokenError::ServerResponse(response) => {
                    Error::Authentication(format!("Dropbox token refresh failed: {}", response))
                }
                other => Error::Authentication(format!("Dropbox token refresh failed: {}", other)),
            })?;

        let access_token = token_result.access_token().secret();
        if access_token.is_empty() {
            return Err(Error::Authentication(
                "Dropbox token response carried an empty access token".to_string(),
            ));
        }

        Ok(IssuedToken {
            access_token: SecretString::from(access_token.clone()),
            expires_in: token_result
                .expires_in()
                .unwrap_or_else(|| std::time::Duration::from_secs(DEFAULT_LIFETIME_SECS)),
        })
    }
}
