//! Attendance-token verification and redemption.
//!
//! Window failures are precise (wrong day vs too early) because they are a
//! UX concern. Token failures are uniform: unknown, wrong event, redeemed,
//! and expired all collapse into `InvalidOrExpiredToken` so a caller cannot
//! probe token state. Distinguishing causes exist in debug logs only.

use crate::clock::Clock;
use crate::entities::{AttendanceRecord, Credential, Event, OriginMetadata};
use crate::error::{EngineError, WindowReason};
use crate::store::EngineStore;
use crate::windows::{WindowStatus, attendance_window};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

/// Participant summary returned by `verify`; carries no token state beyond
/// what the caller already proved by presenting a live credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub registration_id: Uuid,
    pub participant_id: Uuid,
    pub event_id: Uuid,
    pub issued_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

/// Whether attendance is currently open for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Availability {
    pub open: bool,
    pub reason: Option<WindowReason>,
}

pub struct RedemptionService {
    store: Arc<dyn EngineStore>,
    clock: Arc<dyn Clock>,
}

impl RedemptionService {
    pub fn new(store: Arc<dyn EngineStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Is the attendance window open for this event right now?
    pub async fn availability(&self, event_id: Uuid) -> Result<Availability, EngineError> {
        let event = self.event(event_id).await?;
        Ok(match attendance_window(&event, self.clock.now()) {
            WindowStatus::Open => Availability {
                open: true,
                reason: None,
            },
            WindowStatus::WrongDay => Availability {
                open: false,
                reason: Some(WindowReason::WrongDay),
            },
            WindowStatus::TooEarly => Availability {
                open: false,
                reason: Some(WindowReason::TooEarly),
            },
        })
    }

    /// Check a credential without spending it.
    pub async fn verify(
        &self,
        credential: Credential,
        event_id: Uuid,
    ) -> Result<TokenInfo, EngineError> {
        let now = self.clock.now();
        let event = self.event(event_id).await?;
        check_window(&event, now)?;

        let token = self
            .store
            .lookup_token(credential, event_id, now)
            .await?
            .ok_or_else(|| {
                debug!(%event_id, "Token verification failed (cause withheld from caller)");
                EngineError::InvalidOrExpiredToken
            })?;

        Ok(TokenInfo {
            registration_id: token.registration_id,
            participant_id: token.participant_id,
            event_id: token.event_id,
            issued_at: token.issued_at,
            expires_at: token.expires_at,
        })
    }

    /// Spend a credential: atomically mark the token redeemed and append the
    /// attendance record. Exactly one of two concurrent redeemers succeeds;
    /// the loser sees the same uniform error as any invalid credential.
    pub async fn redeem(
        &self,
        credential: Credential,
        event_id: Uuid,
        origin: OriginMetadata,
    ) -> Result<AttendanceRecord, EngineError> {
        let now = self.clock.now();
        let event = self.event(event_id).await?;
        check_window(&event, now)?;

        let record = self
            .store
            .redeem_token(credential, event_id, now, &origin)
            .await?
            .ok_or_else(|| {
                debug!(%event_id, "Token redemption failed (cause withheld from caller)");
                EngineError::InvalidOrExpiredToken
            })?;

        info!(
            record_id = %record.id,
            event_id = %event_id,
            participant_id = %record.participant_id,
            "Attendance redeemed"
        );
        Ok(record)
    }

    async fn event(&self, event_id: Uuid) -> Result<Event, EngineError> {
        self.store
            .event(event_id)
            .await?
            .ok_or(EngineError::EventUnavailable)
    }
}

fn check_window(event: &Event, now: OffsetDateTime) -> Result<(), EngineError> {
    match attendance_window(event, now) {
        WindowStatus::Open => Ok(()),
        WindowStatus::WrongDay => Err(EngineError::OutsideAttendanceWindow {
            reason: WindowReason::WrongDay,
        }),
        WindowStatus::TooEarly => Err(EngineError::OutsideAttendanceWindow {
            reason: WindowReason::TooEarly,
        }),
    }
}
