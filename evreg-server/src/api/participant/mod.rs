//! Participant API handlers.
//!
//! These endpoints are called by participant-facing frontends and check-in
//! devices.
//!
//! # Endpoints
//!
//! - `POST /events/{event_id}/registrations`           – register for an event
//! - `GET  /events/{event_id}/attendance`              – is the attendance window open
//! - `POST /attendance/verify`                         – check a credential without spending it
//! - `POST /attendance/redeem`                         – spend a credential, record attendance
//! - `GET  /participants/{participant_id}/history`     – registration history incl. archived events

use axum::{
    Router,
    routing::{get, post},
};
use evreg_core::entities::{AttendanceStatus, Event, LifecycleState, RegistrationStatus};
use evreg_core::store::HistoryEntry;
use evreg_sdk::objects as wire;

use crate::state::AppState;

mod admit;
mod availability;
mod history;
mod redeem;
mod verify;

pub(crate) use super::error::EngineApiError;

/// Build the Participant API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events/{event_id}/registrations", post(admit::admit))
        .route(
            "/events/{event_id}/attendance",
            get(availability::availability),
        )
        .route("/attendance/verify", post(verify::verify))
        .route("/attendance/redeem", post(redeem::redeem))
        .route(
            "/participants/{participant_id}/history",
            get(history::participant_history),
        )
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

/// Convert an `Event` (DB model) into an `EventSummary` (API model).
pub(crate) fn to_event_summary(event: &Event) -> wire::EventSummary {
    wire::EventSummary {
        event_id: event.id,
        title: event.title.clone(),
        start_at: event.start_at.unix_timestamp(),
        end_at: event.end_at.map(|t| t.unix_timestamp()),
        lifecycle: to_lifecycle(event.lifecycle),
    }
}

pub(crate) fn to_lifecycle(state: LifecycleState) -> wire::LifecycleState {
    match state {
        LifecycleState::Draft => wire::LifecycleState::Draft,
        LifecycleState::Published => wire::LifecycleState::Published,
        LifecycleState::Archived => wire::LifecycleState::Archived,
    }
}

fn to_registration_state(status: RegistrationStatus) -> wire::RegistrationState {
    match status {
        RegistrationStatus::Pending => wire::RegistrationState::Pending,
        RegistrationStatus::Approved => wire::RegistrationState::Approved,
        RegistrationStatus::Rejected => wire::RegistrationState::Rejected,
        RegistrationStatus::Cancelled => wire::RegistrationState::Cancelled,
    }
}

fn to_attendance_state(status: AttendanceStatus) -> wire::AttendanceState {
    match status {
        AttendanceStatus::NotMarked => wire::AttendanceState::NotMarked,
        AttendanceStatus::Present => wire::AttendanceState::Present,
        AttendanceStatus::Absent => wire::AttendanceState::Absent,
    }
}

fn to_history_entry(entry: &HistoryEntry) -> wire::HistoryEntry {
    wire::HistoryEntry {
        event: to_event_summary(&entry.event),
        registration_id: entry.registration.id,
        registration_status: to_registration_state(entry.registration.status),
        attendance_status: to_attendance_state(entry.registration.attendance_status),
        token_expires_at: entry.token.map(|t| t.expires_at.unix_timestamp()),
        attendance_record_id: entry.attendance_record_id,
    }
}
