use serde::{Deserialize, Serialize};

/// Machine-readable error codes mirroring the engine taxonomy.
///
/// `InvalidOrExpiredToken` is deliberately one opaque code for every
/// token-side failure; clients never learn whether a credential was wrong,
/// spent, or expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    EventUnavailable,
    RegistrationClosed,
    AlreadyRegistered,
    EventFull,
    TokenSpaceExhausted,
    OutsideAttendanceWindow,
    InvalidOrExpiredToken,
    InvalidTransition,
    StorageConflict,
    Internal,
}

/// JSON body returned for every API error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: ErrorCode,
    pub message: String,
    /// UX sub-reason for `outside_attendance_window` (`wrong_day` or
    /// `too_early`). Never set for token errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
