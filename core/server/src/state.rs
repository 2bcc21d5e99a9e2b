//! Shared handler state.

use std::sync::Arc;

use projectdrive_projects::ProvisioningService;

use crate::admin::AdminVerifier;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ProvisioningService>,
    pub verifier: Arc<dyn AdminVerifier>,
}

impl AppState {
    pub fn new(service: Arc<ProvisioningService>, verifier: Arc<dyn AdminVerifier>) -> Self {
        Self { service, verifier }
    }
}
