//! Registration admission.
//!
//! `admit` is a fail-fast precondition chain with no partial side effects on
//! failure. The duplicate and capacity checks run inside the store's
//! serialized `admit_registration` call, so concurrent admissions can never
//! oversell a finite capacity.

use crate::clock::Clock;
use crate::entities::{AttendanceToken, Event, LifecycleState, Registration};
use crate::error::EngineError;
use crate::issuer::TokenIssuer;
use crate::notify::{AdmissionNotice, Notifier};
use crate::store::{AdmissionDecision, EngineStore, StoreError};
use crate::windows::registration_open;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Internal retry budget for transient storage conflicts.
const MAX_CONFLICT_RETRIES: u32 = 3;

/// A committed admission: the approved registration, its token, and an
/// optional soft warning when the confirmation notice failed to send.
#[derive(Debug, Clone)]
pub struct Admission {
    pub registration: Registration,
    pub token: AttendanceToken,
    pub notice_warning: Option<String>,
}

pub struct AdmissionController {
    store: Arc<dyn EngineStore>,
    clock: Arc<dyn Clock>,
    issuer: TokenIssuer,
    notifier: Arc<dyn Notifier>,
}

impl AdmissionController {
    pub fn new(
        store: Arc<dyn EngineStore>,
        clock: Arc<dyn Clock>,
        issuer: TokenIssuer,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            clock,
            issuer,
            notifier,
        }
    }

    /// Admit a participant to an event, issue their attendance token, and
    /// dispatch a best-effort confirmation notice.
    pub async fn admit(
        &self,
        event_id: Uuid,
        participant_id: Uuid,
    ) -> Result<Admission, EngineError> {
        let now = self.clock.now();

        let event = self
            .store
            .event(event_id)
            .await?
            .ok_or(EngineError::EventUnavailable)?;
        if event.lifecycle != LifecycleState::Published {
            return Err(EngineError::EventUnavailable);
        }
        if !registration_open(&event, now) {
            return Err(EngineError::RegistrationClosed);
        }

        let registration = match self
            .admit_with_retry(event_id, participant_id, now)
            .await?
        {
            AdmissionDecision::Admitted(registration) => registration,
            AdmissionDecision::AlreadyRegistered => return Err(EngineError::AlreadyRegistered),
            AdmissionDecision::EventFull => return Err(EngineError::EventFull),
            AdmissionDecision::EventUnavailable => return Err(EngineError::EventUnavailable),
        };

        // The registration is committed from here on. If issuance fails the
        // row stays behind without a token, and the scheduler's repair sweep
        // re-issues; the registration is never silently dropped.
        let token = match self
            .issuer
            .issue(registration.id, participant_id, event_id)
            .await
        {
            Ok(token) => token,
            Err(e) => {
                warn!(
                    registration_id = %registration.id,
                    error = %e,
                    "Token issuance failed after admission; left for repair sweep"
                );
                return Err(e);
            }
        };

        let notice = AdmissionNotice {
            registration_id: registration.id,
            participant_id,
            event_id,
            event_title: event.title.clone(),
            credential: token.credential,
            expires_at: token.expires_at,
        };
        let notice_warning = match self.notifier.notify_admission(&notice).await {
            Ok(()) => None,
            Err(e) => {
                warn!(
                    registration_id = %registration.id,
                    error = %e,
                    "Admission notice delivery failed"
                );
                Some("registration confirmed, but the confirmation notice could not be delivered".to_owned())
            }
        };

        info!(
            registration_id = %registration.id,
            event_id = %event_id,
            participant_id = %participant_id,
            "Participant admitted"
        );

        Ok(Admission {
            registration,
            token,
            notice_warning,
        })
    }

    async fn admit_with_retry(
        &self,
        event_id: Uuid,
        participant_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<AdmissionDecision, EngineError> {
        for attempt in 1..=MAX_CONFLICT_RETRIES {
            match self
                .store
                .admit_registration(event_id, participant_id, now)
                .await
            {
                Ok(decision) => return Ok(decision),
                Err(StoreError::Conflict) if attempt < MAX_CONFLICT_RETRIES => {
                    debug!(attempt, %event_id, "Admission hit a storage conflict, retrying");
                }
                Err(StoreError::Conflict) => return Err(EngineError::StorageConflict),
                Err(e) => return Err(e.into()),
            }
        }
        Err(EngineError::StorageConflict)
    }

    /// The event as seen by the admission path; used by handlers that need
    /// schedule data alongside an admission attempt.
    pub async fn event(&self, event_id: Uuid) -> Result<Option<Event>, EngineError> {
        Ok(self.store.event(event_id).await?)
    }
}
