//! Postgres storage backend.
//!
//! Serialization guarantees:
//! - admission locks the event row (`SELECT ... FOR UPDATE`) for the
//!   duplicate + capacity check;
//! - redemption claims the token with a conditional `UPDATE ... WHERE
//!   redeemed = FALSE`;
//! - the archival sweep claims events with a conditional update on the
//!   lifecycle column;
//! - unique indexes back the credential and one-live-registration-per-pair
//!   invariants, with the application checks as pre-checks only.

use crate::entities::{
    AttendanceRecord, AttendanceToken, Credential, Event, LifecycleState, OriginMetadata,
    Registration, RegistrationStatus,
};
use crate::entities::registration::AttendanceStatus;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    AdmissionDecision, EngineStore, HistoryEntry, InsertTokenOutcome, StoreError, TokenSummary,
};

/// SQLSTATE for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATEs for serialization failures and deadlocks; both retryable.
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

const EVENT_COLUMNS: &str = "id, title, start_at, end_at, capacity, lifecycle, created_at";
const REGISTRATION_COLUMNS: &str =
    "id, event_id, participant_id, status, attendance_status, created_at";
const TOKEN_COLUMNS: &str = "id, registration_id, participant_id, event_id, credential, \
     issued_at, expires_at, redeemed, redeemed_at";
const RECORD_COLUMNS: &str =
    "id, token_id, participant_id, event_id, redeemed_at, origin_address, origin_client";

/// The effective end of an event, as SQL: stored end when present, otherwise
/// the last second of the start's UTC calendar day.
const EFFECTIVE_END_SQL: &str =
    "COALESCE(end_at, ((start_at AT TIME ZONE 'UTC')::date + TIME '23:59:59') AT TIME ZONE 'UTC')";

pub struct PgEngineStore {
    pool: PgPool,
}

impl PgEngineStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Classify a database error: unique violations and serialization failures
/// get typed handling, everything else passes through.
fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}

fn map_store_error(err: sqlx::Error) -> StoreError {
    match sqlstate(&err).as_deref() {
        Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) => StoreError::Conflict,
        _ => StoreError::Database(err),
    }
}

/// Row mapping for tokens; the credential travels as `BIGINT`.
#[derive(sqlx::FromRow)]
struct TokenRow {
    id: Uuid,
    registration_id: Uuid,
    participant_id: Uuid,
    event_id: Uuid,
    credential: i64,
    issued_at: OffsetDateTime,
    expires_at: OffsetDateTime,
    redeemed: bool,
    redeemed_at: Option<OffsetDateTime>,
}

impl TryFrom<TokenRow> for AttendanceToken {
    type Error = StoreError;

    fn try_from(row: TokenRow) -> Result<Self, StoreError> {
        let credential = Credential::from_i64(row.credential)
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?;
        Ok(AttendanceToken {
            id: row.id,
            registration_id: row.registration_id,
            participant_id: row.participant_id,
            event_id: row.event_id,
            credential,
            issued_at: row.issued_at,
            expires_at: row.expires_at,
            redeemed: row.redeemed,
            redeemed_at: row.redeemed_at,
        })
    }
}

/// Flattened join row for the history projection.
#[derive(sqlx::FromRow)]
struct HistoryRow {
    event_id: Uuid,
    title: String,
    start_at: OffsetDateTime,
    end_at: Option<OffsetDateTime>,
    capacity: Option<i32>,
    lifecycle: LifecycleState,
    event_created_at: OffsetDateTime,
    registration_id: Uuid,
    participant_id: Uuid,
    status: RegistrationStatus,
    attendance_status: AttendanceStatus,
    registration_created_at: OffsetDateTime,
    token_id: Option<Uuid>,
    token_expires_at: Option<OffsetDateTime>,
    token_redeemed: Option<bool>,
    record_id: Option<Uuid>,
}

impl From<HistoryRow> for HistoryEntry {
    fn from(row: HistoryRow) -> Self {
        let token = match (row.token_id, row.token_expires_at, row.token_redeemed) {
            (Some(id), Some(expires_at), Some(redeemed)) => Some(TokenSummary {
                id,
                expires_at,
                redeemed,
            }),
            _ => None,
        };
        HistoryEntry {
            event: Event {
                id: row.event_id,
                title: row.title,
                start_at: row.start_at,
                end_at: row.end_at,
                capacity: row.capacity,
                lifecycle: row.lifecycle,
                created_at: row.event_created_at,
            },
            registration: Registration {
                id: row.registration_id,
                event_id: row.event_id,
                participant_id: row.participant_id,
                status: row.status,
                attendance_status: row.attendance_status,
                created_at: row.registration_created_at,
            },
            token,
            attendance_record_id: row.record_id,
        }
    }
}

const HISTORY_SELECT: &str = "\
    SELECT e.id AS event_id, e.title, e.start_at, e.end_at, e.capacity, e.lifecycle, \
           e.created_at AS event_created_at, \
           r.id AS registration_id, r.participant_id, r.status, r.attendance_status, \
           r.created_at AS registration_created_at, \
           t.id AS token_id, t.expires_at AS token_expires_at, t.redeemed AS token_redeemed, \
           a.id AS record_id \
    FROM registrations r \
    JOIN events e ON e.id = r.event_id \
    LEFT JOIN attendance_tokens t ON t.registration_id = r.id \
    LEFT JOIN attendance_records a ON a.token_id = t.id";

#[async_trait]
impl EngineStore for PgEngineStore {
    async fn insert_event(&self, event: &Event) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO events (id, title, start_at, end_at, capacity, lifecycle, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(event.start_at)
        .bind(event.end_at)
        .bind(event.capacity)
        .bind(event.lifecycle)
        .bind(event.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_store_error)?;
        Ok(())
    }

    async fn event(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_store_error)?;
        Ok(event)
    }

    async fn archived_events(&self) -> Result<Vec<Event>, StoreError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE lifecycle = $1 ORDER BY start_at DESC"
        ))
        .bind(LifecycleState::Archived)
        .fetch_all(&self.pool)
        .await
        .map_err(map_store_error)?;
        Ok(events)
    }

    async fn transition_lifecycle(
        &self,
        id: Uuid,
        from: LifecycleState,
        to: LifecycleState,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE events SET lifecycle = $3 WHERE id = $1 AND lifecycle = $2")
            .bind(id)
            .bind(from)
            .bind(to)
            .execute(&self.pool)
            .await
            .map_err(map_store_error)?;
        Ok(result.rows_affected() == 1)
    }

    async fn archive_ended_events(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<Uuid>, StoreError> {
        let ids = sqlx::query_scalar::<_, Uuid>(&format!(
            "UPDATE events SET lifecycle = $1 \
             WHERE lifecycle = $2 AND {EFFECTIVE_END_SQL} < $3 \
             RETURNING id"
        ))
        .bind(LifecycleState::Archived)
        .bind(LifecycleState::Published)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(map_store_error)?;
        Ok(ids)
    }

    async fn admit_registration(
        &self,
        event_id: Uuid,
        participant_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<AdmissionDecision, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_store_error)?;

        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE"
        ))
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_store_error)?;

        let Some(event) = event else {
            return Ok(AdmissionDecision::EventUnavailable);
        };
        if event.lifecycle != LifecycleState::Published {
            return Ok(AdmissionDecision::EventUnavailable);
        }

        let duplicates = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM registrations \
             WHERE event_id = $1 AND participant_id = $2 AND status <> $3",
        )
        .bind(event_id)
        .bind(participant_id)
        .bind(RegistrationStatus::Cancelled)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_store_error)?;
        if duplicates > 0 {
            return Ok(AdmissionDecision::AlreadyRegistered);
        }

        if let Some(capacity) = event.capacity {
            let approved = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM registrations WHERE event_id = $1 AND status = $2",
            )
            .bind(event_id)
            .bind(RegistrationStatus::Approved)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_store_error)?;
            if approved >= i64::from(capacity) {
                return Ok(AdmissionDecision::EventFull);
            }
        }

        let insert = sqlx::query_as::<_, Registration>(&format!(
            "INSERT INTO registrations (id, event_id, participant_id, status, attendance_status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {REGISTRATION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(event_id)
        .bind(participant_id)
        .bind(RegistrationStatus::Approved)
        .bind(AttendanceStatus::NotMarked)
        .bind(now)
        .fetch_one(&mut *tx)
        .await;

        let registration = match insert {
            Ok(registration) => registration,
            // The partial unique index is the authoritative duplicate guard.
            Err(e) if sqlstate(&e).as_deref() == Some(UNIQUE_VIOLATION) => {
                return Ok(AdmissionDecision::AlreadyRegistered);
            }
            Err(e) => return Err(map_store_error(e)),
        };

        tx.commit().await.map_err(map_store_error)?;
        Ok(AdmissionDecision::Admitted(registration))
    }

    async fn registration(&self, id: Uuid) -> Result<Option<Registration>, StoreError> {
        let registration = sqlx::query_as::<_, Registration>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_store_error)?;
        Ok(registration)
    }

    async fn mark_absent_for_past_events(
        &self,
        now: OffsetDateTime,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE registrations SET attendance_status = $1 \
             WHERE attendance_status = $2 AND status = $3 \
               AND event_id IN (\
                   SELECT id FROM events \
                   WHERE (start_at AT TIME ZONE 'UTC')::date < ($4 AT TIME ZONE 'UTC')::date)",
        )
        .bind(AttendanceStatus::Absent)
        .bind(AttendanceStatus::NotMarked)
        .bind(RegistrationStatus::Approved)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_store_error)?;
        Ok(result.rows_affected())
    }

    async fn registrations_missing_token(
        &self,
        limit: i64,
    ) -> Result<Vec<Registration>, StoreError> {
        let registrations = sqlx::query_as::<_, Registration>(&format!(
            "SELECT r.id, r.event_id, r.participant_id, r.status, r.attendance_status, r.created_at \
             FROM registrations r \
             LEFT JOIN attendance_tokens t ON t.registration_id = r.id \
             WHERE t.id IS NULL AND r.status = $1 \
             ORDER BY r.created_at \
             LIMIT $2"
        ))
        .bind(RegistrationStatus::Approved)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_store_error)?;
        Ok(registrations)
    }

    async fn insert_token(
        &self,
        token: &AttendanceToken,
    ) -> Result<InsertTokenOutcome, StoreError> {
        let result = sqlx::query(
            "INSERT INTO attendance_tokens \
             (id, registration_id, participant_id, event_id, credential, issued_at, expires_at, redeemed) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE)",
        )
        .bind(token.id)
        .bind(token.registration_id)
        .bind(token.participant_id)
        .bind(token.event_id)
        .bind(token.credential.as_i64())
        .bind(token.issued_at)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(InsertTokenOutcome::Inserted),
            Err(e) if sqlstate(&e).as_deref() == Some(UNIQUE_VIOLATION) => {
                Ok(InsertTokenOutcome::CredentialInUse)
            }
            Err(e) => Err(map_store_error(e)),
        }
    }

    async fn credential_in_use(
        &self,
        credential: Credential,
        now: OffsetDateTime,
    ) -> Result<bool, StoreError> {
        let in_use = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(\
                 SELECT 1 FROM attendance_tokens WHERE credential = $1 AND expires_at > $2)",
        )
        .bind(credential.as_i64())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_store_error)?;
        Ok(in_use)
    }

    async fn lookup_token(
        &self,
        credential: Credential,
        event_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<Option<AttendanceToken>, StoreError> {
        let row = sqlx::query_as::<_, TokenRow>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM attendance_tokens \
             WHERE credential = $1 AND event_id = $2 AND redeemed = FALSE AND expires_at > $3"
        ))
        .bind(credential.as_i64())
        .bind(event_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_store_error)?;
        row.map(AttendanceToken::try_from).transpose()
    }

    async fn redeem_token(
        &self,
        credential: Credential,
        event_id: Uuid,
        now: OffsetDateTime,
        origin: &OriginMetadata,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_store_error)?;

        // Conditional claim: the losing racer matches zero rows.
        let claimed = sqlx::query_as::<_, TokenRow>(&format!(
            "UPDATE attendance_tokens SET redeemed = TRUE, redeemed_at = $3 \
             WHERE credential = $1 AND event_id = $2 AND redeemed = FALSE AND expires_at > $3 \
             RETURNING {TOKEN_COLUMNS}"
        ))
        .bind(credential.as_i64())
        .bind(event_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_store_error)?;

        let Some(token) = claimed else {
            return Ok(None);
        };

        let record = sqlx::query_as::<_, AttendanceRecord>(&format!(
            "INSERT INTO attendance_records \
             (id, token_id, participant_id, event_id, redeemed_at, origin_address, origin_client) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(token.id)
        .bind(token.participant_id)
        .bind(token.event_id)
        .bind(now)
        .bind(origin.address.as_deref())
        .bind(origin.client.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_store_error)?;

        sqlx::query("UPDATE registrations SET attendance_status = $2 WHERE id = $1")
            .bind(token.registration_id)
            .bind(AttendanceStatus::Present)
            .execute(&mut *tx)
            .await
            .map_err(map_store_error)?;

        tx.commit().await.map_err(map_store_error)?;
        Ok(Some(record))
    }

    async fn participant_history(
        &self,
        participant_id: Uuid,
    ) -> Result<Vec<HistoryEntry>, StoreError> {
        let rows = sqlx::query_as::<_, HistoryRow>(&format!(
            "{HISTORY_SELECT} WHERE r.participant_id = $1 ORDER BY e.start_at DESC"
        ))
        .bind(participant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_store_error)?;
        Ok(rows.into_iter().map(HistoryEntry::from).collect())
    }

    async fn event_history(&self, event_id: Uuid) -> Result<Vec<HistoryEntry>, StoreError> {
        let rows = sqlx::query_as::<_, HistoryRow>(&format!(
            "{HISTORY_SELECT} WHERE r.event_id = $1 ORDER BY r.created_at"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_store_error)?;
        Ok(rows.into_iter().map(HistoryEntry::from).collect())
    }
}
