//! Admin bearer token verification.

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use projectdrive_common::{AdminIdentity, Error, ExposeSecret, Result, SecretString};

use crate::error::ApiError;
use crate::state::AppState;

/// Decides whether a bearer token belongs to an administrator.
pub trait AdminVerifier: Send + Sync {
    /// # Errors
    /// - `Error::Authentication` if the token is invalid or not an admin's
    fn verify(&self, token: &str) -> Result<AdminIdentity>;
}

/// Claims carried by an admin token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub admin: bool,
    pub exp: i64,
}

/// Verifies HS256 tokens signed with a shared secret.
///
/// A token is accepted when its signature and expiry are valid and it
/// carries `admin: true`. The `email` claim, or else `sub`, becomes the
/// identity recorded in audit entries.
pub struct JwtAdminVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtAdminVerifier {
    pub fn new(secret: &SecretString) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

impl AdminVerifier for JwtAdminVerifier {
    fn verify(&self, token: &str) -> Result<AdminIdentity> {
        let claims = jsonwebtoken::decode::<AdminClaims>(token, &self.key, &self.validation)
            .map_err(|e| Error::Authentication(format!("Invalid admin token: {}", e)))?
            .claims;

        if !claims.admin {
            return Err(Error::Authentication(
                "Token does not carry admin privileges".to_string(),
            ));
        }

        claims
            .email
            .or(claims.sub)
            .filter(|s| !s.is_empty())
            .map(AdminIdentity::new)
            .ok_or_else(|| Error::Authentication("Admin token has no subject".to_string()))
    }
}

/// Extractor for a verified administrator.
pub struct Admin(pub AdminIdentity);

impl FromRequestParts<AppState> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                Error::Authentication("Missing or invalid Authorization header".to_string())
            })?;

        match state.verifier.verify(token) {
            Ok(identity) => Ok(Admin(identity)),
            Err(e) => {
                tracing::warn!(path = %parts.uri.path(), "Rejected admin token: {}", e);
                Err(e.into())
            }
        }
    }
}
