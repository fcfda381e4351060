use time::OffsetDateTime;
use uuid::Uuid;

/// A participant's registration for an event.
///
/// At most one non-cancelled registration exists per (event, participant)
/// pair; the storage layer enforces this. Never deleted while a certificate
/// references it.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Registration {
    pub id: Uuid,
    pub event_id: Uuid,
    pub participant_id: Uuid,
    pub status: RegistrationStatus,
    pub attendance_status: AttendanceStatus,
    pub created_at: OffsetDateTime,
}

/// Admission auto-approves, so registrations are created `Approved`.
/// `Pending` and `Rejected` exist for the out-of-scope admin review flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "registration_status", rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

/// Attendance outcome for a registration. `Absent` is terminal, written by
/// the lifecycle scheduler once the event day has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "attendance_status", rename_all = "snake_case")]
pub enum AttendanceStatus {
    NotMarked,
    Present,
    Absent,
}
