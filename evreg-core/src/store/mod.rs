//! Storage abstraction for the engine.
//!
//! The trait exposes semantically atomic operations — admission, redemption,
//! and the sweep claims are single calls — so each backend owns its own
//! serialization guarantee. The Postgres backend uses row locks, conditional
//! updates, and unique indexes; the in-memory backend a single mutex.

pub mod memory;
pub mod postgres;

use crate::entities::{
    AttendanceRecord, AttendanceToken, Credential, Event, LifecycleState, OriginMetadata,
    Registration,
};
use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgEngineStore;

/// Errors surfaced by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transient serialization/lock contention; safe to retry.
    #[error("storage conflict")]
    Conflict,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Outcome of the serialized duplicate + capacity check at admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDecision {
    Admitted(Registration),
    AlreadyRegistered,
    EventFull,
    /// The event vanished or left the published state between the caller's
    /// precondition check and the transaction.
    EventUnavailable,
}

/// Outcome of inserting a freshly generated token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertTokenOutcome {
    Inserted,
    /// The credential unique constraint fired; the issuer draws again.
    CredentialInUse,
}

/// One row of a participant's (or event's) history projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub event: Event,
    pub registration: Registration,
    pub token: Option<TokenSummary>,
    /// Present once attendance was redeemed; the certificate issuer's
    /// eligibility signal.
    pub attendance_record_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSummary {
    pub id: Uuid,
    pub expires_at: OffsetDateTime,
    pub redeemed: bool,
}

#[async_trait]
pub trait EngineStore: Send + Sync {
    // -- Events -------------------------------------------------------------

    async fn insert_event(&self, event: &Event) -> Result<(), StoreError>;

    async fn event(&self, id: Uuid) -> Result<Option<Event>, StoreError>;

    async fn archived_events(&self) -> Result<Vec<Event>, StoreError>;

    /// Conditionally move an event along a lifecycle edge.
    ///
    /// Single compare-and-set: returns `true` only if the event existed in
    /// `from` and is now in `to`. This is the claim primitive shared by
    /// restore and the archival sweep, which makes overlapping runs safe.
    async fn transition_lifecycle(
        &self,
        id: Uuid,
        from: LifecycleState,
        to: LifecycleState,
    ) -> Result<bool, StoreError>;

    /// Archive every published event whose effective end is strictly before
    /// `now`, returning the ids claimed by this call. Each event is claimed
    /// by exactly one concurrent sweep.
    async fn archive_ended_events(&self, now: OffsetDateTime)
    -> Result<Vec<Uuid>, StoreError>;

    // -- Registrations ------------------------------------------------------

    /// Run the duplicate check, the capacity check, and the insert under one
    /// transaction serialized on the event, so concurrent admissions can
    /// never oversell capacity.
    async fn admit_registration(
        &self,
        event_id: Uuid,
        participant_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<AdmissionDecision, StoreError>;

    async fn registration(&self, id: Uuid) -> Result<Option<Registration>, StoreError>;

    /// Terminal `not_marked -> absent` for approved registrations of events
    /// whose calendar day has fully passed. Returns the number of rows
    /// claimed; idempotent.
    async fn mark_absent_for_past_events(&self, now: OffsetDateTime)
    -> Result<u64, StoreError>;

    /// Approved registrations whose token issuance was lost mid-admission.
    async fn registrations_missing_token(
        &self,
        limit: i64,
    ) -> Result<Vec<Registration>, StoreError>;

    // -- Tokens -------------------------------------------------------------

    /// Insert a freshly issued token. The credential unique constraint is
    /// the authoritative collision guard.
    async fn insert_token(&self, token: &AttendanceToken)
    -> Result<InsertTokenOutcome, StoreError>;

    /// Best-effort pre-check for the issuer's retry loop: is this credential
    /// held by any non-expired token?
    async fn credential_in_use(
        &self,
        credential: Credential,
        now: OffsetDateTime,
    ) -> Result<bool, StoreError>;

    /// Fetch a token only if it matches both credential and event, is not
    /// redeemed, and has not expired. Everything else is `None`; callers must
    /// not learn which check failed.
    async fn lookup_token(
        &self,
        credential: Credential,
        event_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<Option<AttendanceToken>, StoreError>;

    /// Atomically flip `redeemed` and insert the attendance record, marking
    /// the registration present. Returns `None` if the token was not live —
    /// including when a concurrent redeemer won the race.
    async fn redeem_token(
        &self,
        credential: Credential,
        event_id: Uuid,
        now: OffsetDateTime,
        origin: &OriginMetadata,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    // -- History ------------------------------------------------------------

    async fn participant_history(
        &self,
        participant_id: Uuid,
    ) -> Result<Vec<HistoryEntry>, StoreError>;

    async fn event_history(&self, event_id: Uuid) -> Result<Vec<HistoryEntry>, StoreError>;
}
