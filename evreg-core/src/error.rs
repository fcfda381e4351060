//! Engine error taxonomy.
//!
//! Every operation returns these as typed results; nothing in the engine
//! panics or surfaces a raw storage fault to callers.

use crate::entities::LifecycleState;
use crate::store::StoreError;
use thiserror::Error;

/// Why the attendance window rejected a request. Surfaced precisely to the
/// caller as a UX detail; token lookups themselves stay uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowReason {
    WrongDay,
    TooEarly,
}

impl WindowReason {
    pub fn as_str(self) -> &'static str {
        match self {
            WindowReason::WrongDay => "wrong_day",
            WindowReason::TooEarly => "too_early",
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// Event missing, or not in the published state.
    #[error("event is not available for this operation")]
    EventUnavailable,

    /// Inside the pre-start cutoff (or later).
    #[error("registration for this event has closed")]
    RegistrationClosed,

    /// A non-cancelled registration already exists for this participant.
    #[error("participant is already registered for this event")]
    AlreadyRegistered,

    /// The event's finite capacity is already filled.
    #[error("event is full")]
    EventFull,

    /// Credential generation collided on every attempt. Effectively
    /// unreachable at 12 digits of entropy, but handled rather than assumed
    /// away.
    #[error("could not allocate a unique attendance credential")]
    TokenSpaceExhausted,

    /// Attendance is not open at this instant. Carries the precise reason.
    #[error("attendance is not open ({})", reason.as_str())]
    OutsideAttendanceWindow { reason: WindowReason },

    /// Uniform outcome for every token-side failure: unknown credential,
    /// wrong event, already redeemed, or expired. Must render identically
    /// regardless of cause.
    #[error("invalid or expired attendance token")]
    InvalidOrExpiredToken,

    /// The requested lifecycle edge does not exist.
    #[error("invalid lifecycle transition {from} -> {to}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },

    /// Lock contention that persisted past the internal retry budget.
    #[error("storage conflict, please retry")]
    StorageConflict,

    /// System randomness was unavailable while drawing a credential.
    #[error("credential entropy source failed: {0}")]
    Credential(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}
