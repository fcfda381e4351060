use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Webhook payload dispatched after a successful admission.
///
/// Delivery is best-effort; the receiving system forwards the credential to
/// the participant (mail, messenger — out of scope here).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionNoticePayload {
    pub event_type: String,
    pub registration_id: Uuid,
    pub participant_id: Uuid,
    pub event_id: Uuid,
    pub event_title: String,
    /// Fixed-width 12-digit attendance credential.
    pub credential: String,
    /// Unix seconds.
    pub expires_at: i64,
    /// Unix seconds at dispatch time.
    pub timestamp: i64,
}
