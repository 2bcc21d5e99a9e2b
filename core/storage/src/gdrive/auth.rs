//! Service account token flow for Google Drive.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use projectdrive_common::{Error, ExposeSecret, Provider, Result};

use crate::auth::{parse_token_response, IssuedToken, TokenEndpoint};
use crate::clock::Clock;
use crate::config::DriveConfig;

/// OAuth2 token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Full Drive scope; the service account only sees what is shared with it.
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each signed assertion. Google caps it at one hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Claims of the signed assertion exchanged for an access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
}

/// Mints access tokens with an RS256-signed JWT bearer assertion.
pub struct ServiceAccountEndpoint {
    http: Client,
    token_url: String,
    email: String,
    key: EncodingKey,
    subject: Option<String>,
    clock: Arc<dyn Clock>,
}

impl ServiceAccountEndpoint {
    /// # Errors
    /// - `Error::Configuration` if the private key is not a valid RSA PEM
    pub fn new(http: Client, config: &DriveConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let pem = config.private_key.expose_secret().as_bytes();
        let key = EncodingKey::from_rsa_pem(pem).map_err(|e| {
            Error::Configuration(format!(
                "{} is not a valid RSA private key: {}",
                DriveConfig::PRIVATE_KEY,
                e
            ))
        })?;

        Ok(Self {
            http,
            token_url: GOOGLE_TOKEN_URL.to_string(),
            email: config.service_account_email.clone(),
            key,
            subject: config.impersonate_subject.clone(),
            clock,
        })
    }

    /// Point at a different token endpoint. Also used as the assertion audience.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Build and sign the assertion for the current time.
    pub fn assertion(&self) -> Result<String> {
        let iat = self.clock.now().timestamp();
        let claims = AssertionClaims {
            iss: self.email.clone(),
            scope: DRIVE_SCOPE.to_string(),
            aud: self.token_url.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
            sub: self.subject.clone(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| Error::Authentication(format!("Failed to sign service account assertion: {}", e)))
    }
}

#[async_trait]
impl TokenEndpoint for ServiceAccountEndpoint {
    fn provider(&self) -> Provider {
        Provider::Gdrive
    }

    async fn request_token(&self) -> Result<IssuedToken> {
        let assertion = self.assertion()?;

        let response = self
            .http
            .post(&self.token_url)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to reach Google token endpoint: {}", e)))?;

        parse_token_response(Provider::Gdrive, response).await
    }
}
