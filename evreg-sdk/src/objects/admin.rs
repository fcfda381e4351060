use super::participant::EventSummary;
use serde::{Deserialize, Serialize};

/// Header carrying the plaintext admin secret, verified server-side against
/// an argon2 hash.
pub const ADMIN_AUTH_HEADER: &str = "Evreg-Admin-Authorization";

/// `POST /admin/events/{event_id}/restore`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreEventResponse {
    pub event: EventSummary,
}

/// `POST /admin/sweeps/archive`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepResponse {
    pub archived_count: u64,
}
