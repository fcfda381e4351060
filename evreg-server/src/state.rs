//! Application state shared across all request handlers.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use evreg_core::admission::AdmissionController;
use evreg_core::history::HistoryReader;
use evreg_core::lifecycle::LifecycleScheduler;
use evreg_core::redemption::RedemptionService;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    pub admission: Arc<AdmissionController>,
    pub redemption: Arc<RedemptionService>,
    pub history: Arc<HistoryReader>,
    pub lifecycle: Arc<LifecycleScheduler>,
    pub admin: Arc<AdminAccess>,
}

/// Admin credential verifier. Only the argon2 hash is held in memory; the
/// plaintext secret never leaves the config loader.
pub struct AdminAccess {
    secret_hash: String,
}

impl AdminAccess {
    pub fn new(secret_hash: String) -> Self {
        Self { secret_hash }
    }

    /// Verify a plaintext secret from the request header against the hash.
    pub fn verify(&self, candidate: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(&self.secret_hash) else {
            tracing::error!("Stored admin secret hash is not a valid argon2 hash");
            return false;
        };
        Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok()
    }
}
