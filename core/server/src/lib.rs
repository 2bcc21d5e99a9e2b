//! Admin HTTP API for project provisioning.
//!
//! Exposes project creation and export link management over axum, behind
//! an admin bearer token.

pub mod admin;
pub mod error;
pub mod routes;
pub mod state;

pub use admin::{Admin, AdminClaims, AdminVerifier, JwtAdminVerifier};
pub use error::{ApiError, ApiJson};
pub use routes::router;
pub use state::AppState;

use projectdrive_common::Result;
use tokio::net::TcpListener;

/// Serve the API on an already bound listener until the process stops.
///
/// # Errors
/// - I/O errors from the listener
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "Admin API listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
