//! API wire objects.
//!
//! Timestamps travel as unix seconds; credentials travel as their
//! fixed-width 12-digit string form so leading digits survive every client.

pub mod admin;
pub mod error;
pub mod notice;
pub mod participant;

pub use admin::{ADMIN_AUTH_HEADER, RestoreEventResponse, SweepResponse};
pub use error::{ApiErrorBody, ErrorCode};
pub use notice::AdmissionNoticePayload;
pub use participant::{
    AdmitRequest, AdmitResponse, AttendanceAvailability, AttendanceState, EventSummary,
    HistoryEntry, LifecycleState, RedeemRequest, RedeemResponse, RegistrationState,
    VerifyRequest, VerifyResponse,
};
