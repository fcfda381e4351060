//! Persistent domain entities.
//!
//! Lifecycle, registration, and token state are closed enums with explicit
//! transition rules rather than loose flag columns; the storage layer maps
//! them to Postgres enum types.

pub mod attendance_record;
pub mod attendance_token;
pub mod credential;
pub mod event;
pub mod registration;

pub use attendance_record::{AttendanceRecord, OriginMetadata};
pub use attendance_token::AttendanceToken;
pub use credential::Credential;
pub use event::{Event, LifecycleState};
pub use registration::{AttendanceStatus, Registration, RegistrationStatus};
