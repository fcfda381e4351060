//! Engine error to HTTP response mapping, shared by both API surfaces.

use axum::{Json, http::StatusCode, response::IntoResponse};
use evreg_core::error::EngineError;
use evreg_sdk::objects::{ApiErrorBody, ErrorCode};

/// Wraps [`EngineError`] for use as a handler rejection.
///
/// Every token-side failure renders as the same 404 body; callers cannot
/// distinguish an unknown credential from a spent or expired one.
#[derive(Debug)]
pub(crate) struct EngineApiError(pub EngineError);

impl From<EngineError> for EngineApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for EngineApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message, reason) = match &self.0 {
            EngineError::EventUnavailable => (
                StatusCode::NOT_FOUND,
                ErrorCode::EventUnavailable,
                "event not found or not accepting requests".to_owned(),
                None,
            ),
            EngineError::RegistrationClosed => (
                StatusCode::GONE,
                ErrorCode::RegistrationClosed,
                "registration for this event has closed".to_owned(),
                None,
            ),
            EngineError::AlreadyRegistered => (
                StatusCode::CONFLICT,
                ErrorCode::AlreadyRegistered,
                "participant is already registered for this event".to_owned(),
                None,
            ),
            EngineError::EventFull => (
                StatusCode::CONFLICT,
                ErrorCode::EventFull,
                "event has reached its capacity".to_owned(),
                None,
            ),
            EngineError::TokenSpaceExhausted => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorCode::TokenSpaceExhausted,
                "could not allocate an attendance credential, try again".to_owned(),
                None,
            ),
            EngineError::OutsideAttendanceWindow { reason } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::OutsideAttendanceWindow,
                "attendance is not open for this event right now".to_owned(),
                Some(reason.as_str().to_owned()),
            ),
            EngineError::InvalidOrExpiredToken => (
                StatusCode::NOT_FOUND,
                ErrorCode::InvalidOrExpiredToken,
                "invalid or expired token".to_owned(),
                None,
            ),
            EngineError::InvalidTransition { from, to } => (
                StatusCode::CONFLICT,
                ErrorCode::InvalidTransition,
                format!("cannot transition event from {from} to {to}"),
                None,
            ),
            EngineError::StorageConflict => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorCode::StorageConflict,
                "storage contention, try again".to_owned(),
                None,
            ),
            EngineError::Credential(e) => {
                tracing::error!(error = %e, "Credential generation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Internal,
                    "internal server error".to_owned(),
                    None,
                )
            }
            EngineError::Storage(e) => {
                tracing::error!(error = %e, "Engine storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Internal,
                    "internal server error".to_owned(),
                    None,
                )
            }
        };

        (
            status,
            Json(ApiErrorBody {
                code,
                message,
                reason,
            }),
        )
            .into_response()
    }
}
