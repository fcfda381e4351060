//! In-memory storage backend.
//!
//! A single mutex over all tables, which trivially satisfies the same
//! atomicity contract the Postgres backend provides with row locks and
//! conditional updates. Used by the test suites and demo wiring.

use crate::entities::{
    AttendanceRecord, AttendanceToken, Credential, Event, LifecycleState, OriginMetadata,
    Registration, RegistrationStatus,
};
use crate::entities::registration::AttendanceStatus;
use crate::windows::effective_end;
use async_trait::async_trait;
use std::collections::HashMap;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    AdmissionDecision, EngineStore, HistoryEntry, InsertTokenOutcome, StoreError, TokenSummary,
};

#[derive(Default)]
struct Tables {
    events: HashMap<Uuid, Event>,
    registrations: Vec<Registration>,
    tokens: Vec<AttendanceToken>,
    records: Vec<AttendanceRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(tables: &Tables, registration: &Registration) -> Option<HistoryEntry> {
        let event = tables.events.get(&registration.event_id)?.clone();
        let token = tables
            .tokens
            .iter()
            .find(|t| t.registration_id == registration.id);
        let attendance_record_id = token.and_then(|t| {
            tables
                .records
                .iter()
                .find(|r| r.token_id == t.id)
                .map(|r| r.id)
        });
        Some(HistoryEntry {
            event,
            registration: registration.clone(),
            token: token.map(|t| TokenSummary {
                id: t.id,
                expires_at: t.expires_at,
                redeemed: t.redeemed,
            }),
            attendance_record_id,
        })
    }
}

#[async_trait]
impl EngineStore for MemoryStore {
    async fn insert_event(&self, event: &Event) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        tables.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn event(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.events.get(&id).cloned())
    }

    async fn archived_events(&self) -> Result<Vec<Event>, StoreError> {
        let tables = self.tables.lock().await;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|e| e.lifecycle == LifecycleState::Archived)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.start_at.cmp(&a.start_at));
        Ok(events)
    }

    async fn transition_lifecycle(
        &self,
        id: Uuid,
        from: LifecycleState,
        to: LifecycleState,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        match tables.events.get_mut(&id) {
            Some(event) if event.lifecycle == from => {
                event.lifecycle = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn archive_ended_events(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<Uuid>, StoreError> {
        let mut tables = self.tables.lock().await;
        let mut claimed = Vec::new();
        for event in tables.events.values_mut() {
            if event.lifecycle == LifecycleState::Published && effective_end(event) < now {
                event.lifecycle = LifecycleState::Archived;
                claimed.push(event.id);
            }
        }
        Ok(claimed)
    }

    async fn admit_registration(
        &self,
        event_id: Uuid,
        participant_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<AdmissionDecision, StoreError> {
        let mut tables = self.tables.lock().await;

        let Some(event) = tables.events.get(&event_id) else {
            return Ok(AdmissionDecision::EventUnavailable);
        };
        if event.lifecycle != LifecycleState::Published {
            return Ok(AdmissionDecision::EventUnavailable);
        }
        let capacity = event.capacity;

        let duplicate = tables.registrations.iter().any(|r| {
            r.event_id == event_id
                && r.participant_id == participant_id
                && r.status != RegistrationStatus::Cancelled
        });
        if duplicate {
            return Ok(AdmissionDecision::AlreadyRegistered);
        }

        if let Some(capacity) = capacity {
            let approved = tables
                .registrations
                .iter()
                .filter(|r| r.event_id == event_id && r.status == RegistrationStatus::Approved)
                .count();
            if approved >= capacity as usize {
                return Ok(AdmissionDecision::EventFull);
            }
        }

        let registration = Registration {
            id: Uuid::new_v4(),
            event_id,
            participant_id,
            status: RegistrationStatus::Approved,
            attendance_status: AttendanceStatus::NotMarked,
            created_at: now,
        };
        tables.registrations.push(registration.clone());
        Ok(AdmissionDecision::Admitted(registration))
    }

    async fn registration(&self, id: Uuid) -> Result<Option<Registration>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.registrations.iter().find(|r| r.id == id).cloned())
    }

    async fn mark_absent_for_past_events(
        &self,
        now: OffsetDateTime,
    ) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock().await;
        let past_events: Vec<Uuid> = tables
            .events
            .values()
            .filter(|e| e.start_at.date() < now.date())
            .map(|e| e.id)
            .collect();

        let mut marked = 0;
        for registration in tables.registrations.iter_mut() {
            if registration.status == RegistrationStatus::Approved
                && registration.attendance_status == AttendanceStatus::NotMarked
                && past_events.contains(&registration.event_id)
            {
                registration.attendance_status = AttendanceStatus::Absent;
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn registrations_missing_token(
        &self,
        limit: i64,
    ) -> Result<Vec<Registration>, StoreError> {
        let tables = self.tables.lock().await;
        let missing: Vec<Registration> = tables
            .registrations
            .iter()
            .filter(|r| {
                r.status == RegistrationStatus::Approved
                    && !tables.tokens.iter().any(|t| t.registration_id == r.id)
            })
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok(missing)
    }

    async fn insert_token(
        &self,
        token: &AttendanceToken,
    ) -> Result<InsertTokenOutcome, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables
            .tokens
            .iter()
            .any(|t| t.credential == token.credential && t.expires_at > token.issued_at)
        {
            return Ok(InsertTokenOutcome::CredentialInUse);
        }
        tables.tokens.push(token.clone());
        Ok(InsertTokenOutcome::Inserted)
    }

    async fn credential_in_use(
        &self,
        credential: Credential,
        now: OffsetDateTime,
    ) -> Result<bool, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .tokens
            .iter()
            .any(|t| t.credential == credential && t.expires_at > now))
    }

    async fn lookup_token(
        &self,
        credential: Credential,
        event_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<Option<AttendanceToken>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .tokens
            .iter()
            .find(|t| {
                t.credential == credential
                    && t.event_id == event_id
                    && !t.redeemed
                    && t.expires_at > now
            })
            .cloned())
    }

    async fn redeem_token(
        &self,
        credential: Credential,
        event_id: Uuid,
        now: OffsetDateTime,
        origin: &OriginMetadata,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let mut tables = self.tables.lock().await;

        let Some(token) = tables.tokens.iter_mut().find(|t| {
            t.credential == credential
                && t.event_id == event_id
                && !t.redeemed
                && t.expires_at > now
        }) else {
            return Ok(None);
        };
        token.redeemed = true;
        token.redeemed_at = Some(now);
        let token_id = token.id;
        let participant_id = token.participant_id;
        let registration_id = token.registration_id;

        let record = AttendanceRecord {
            id: Uuid::new_v4(),
            token_id,
            participant_id,
            event_id,
            redeemed_at: now,
            origin_address: origin.address.clone(),
            origin_client: origin.client.clone(),
        };
        tables.records.push(record.clone());

        if let Some(registration) = tables
            .registrations
            .iter_mut()
            .find(|r| r.id == registration_id)
        {
            registration.attendance_status = AttendanceStatus::Present;
        }
        Ok(Some(record))
    }

    async fn participant_history(
        &self,
        participant_id: Uuid,
    ) -> Result<Vec<HistoryEntry>, StoreError> {
        let tables = self.tables.lock().await;
        let mut entries: Vec<HistoryEntry> = tables
            .registrations
            .iter()
            .filter(|r| r.participant_id == participant_id)
            .filter_map(|r| Self::entry(&tables, r))
            .collect();
        entries.sort_by(|a, b| b.event.start_at.cmp(&a.event.start_at));
        Ok(entries)
    }

    async fn event_history(&self, event_id: Uuid) -> Result<Vec<HistoryEntry>, StoreError> {
        let tables = self.tables.lock().await;
        let mut entries: Vec<HistoryEntry> = tables
            .registrations
            .iter()
            .filter(|r| r.event_id == event_id)
            .filter_map(|r| Self::entry(&tables, r))
            .collect();
        entries.sort_by(|a, b| a.registration.created_at.cmp(&b.registration.created_at));
        Ok(entries)
    }
}
