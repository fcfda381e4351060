use crate::entities::Credential;
use time::OffsetDateTime;
use uuid::Uuid;

/// A single-use, time-bounded attendance credential, issued 1:1 with a
/// registration at admission time.
///
/// Once `redeemed` is set the token is permanently inert; tokens are never
/// deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceToken {
    pub id: Uuid,
    pub registration_id: Uuid,
    pub participant_id: Uuid,
    pub event_id: Uuid,
    pub credential: Credential,
    pub issued_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub redeemed: bool,
    pub redeemed_at: Option<OffsetDateTime>,
}

impl AttendanceToken {
    /// A token is live while it is unredeemed and unexpired.
    pub fn is_live(&self, now: OffsetDateTime) -> bool {
        !self.redeemed && now < self.expires_at
    }
}
