use time::OffsetDateTime;
use uuid::Uuid;

/// Durable proof that a token was redeemed.
///
/// Append-only: created once by the redemption service, never mutated or
/// deleted. Certificate issuance (an external collaborator) reads these rows
/// to decide eligibility.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub token_id: Uuid,
    pub participant_id: Uuid,
    pub event_id: Uuid,
    pub redeemed_at: OffsetDateTime,
    pub origin_address: Option<String>,
    pub origin_client: Option<String>,
}

/// Where a redemption request came from, captured at the HTTP boundary and
/// stored opaquely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginMetadata {
    pub address: Option<String>,
    pub client: Option<String>,
}
