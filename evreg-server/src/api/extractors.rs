//! Custom Axum extractors.
//!
//! Provides:
//! - `AdminAuth` — verifies the `Evreg-Admin-Authorization` header against
//!   the configured argon2 admin secret hash (used by the Admin API).
//! - `ClientOrigin` — best-effort capture of the caller's peer address and
//!   user agent, recorded on attendance records.

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use evreg_core::entities::OriginMetadata;
use evreg_sdk::objects::ADMIN_AUTH_HEADER;
use std::convert::Infallible;
use std::net::SocketAddr;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// AdminAuth — Admin API authentication
// ---------------------------------------------------------------------------

/// An Axum extractor that verifies the `Evreg-Admin-Authorization` header.
///
/// The header carries the plaintext admin secret; it is checked against the
/// argon2 hash held in [`AppState`].
pub struct AdminAuth;

/// Errors returned by the [`AdminAuth`] extractor.
#[derive(Debug)]
pub enum AdminAuthError {
    MissingHeader,
    InvalidHeader,
    VerificationFailed,
}

impl IntoResponse for AdminAuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AdminAuthError::MissingHeader => (
                StatusCode::UNAUTHORIZED,
                "missing Evreg-Admin-Authorization header",
            ),
            AdminAuthError::InvalidHeader => (
                StatusCode::BAD_REQUEST,
                "invalid Evreg-Admin-Authorization header",
            ),
            AdminAuthError::VerificationFailed => {
                (StatusCode::UNAUTHORIZED, "admin secret verification failed")
            }
        };
        (status, message).into_response()
    }
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AdminAuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let candidate = parts
            .headers
            .get(ADMIN_AUTH_HEADER)
            .ok_or(AdminAuthError::MissingHeader)?
            .to_str()
            .map_err(|_| AdminAuthError::InvalidHeader)?;

        if !state.admin.verify(candidate) {
            return Err(AdminAuthError::VerificationFailed);
        }

        Ok(AdminAuth)
    }
}

// ---------------------------------------------------------------------------
// ClientOrigin — request origin metadata for attendance records
// ---------------------------------------------------------------------------

/// Infallible extractor for the caller's peer address and user agent.
///
/// Both fields are best-effort: the peer address is absent when the router is
/// driven without connect info (tests), and the user agent when the client
/// sends none.
pub struct ClientOrigin(pub OriginMetadata);

impl<S: Send + Sync> FromRequestParts<S> for ClientOrigin {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let address = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0.ip().to_string());
        let client = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        Ok(ClientOrigin(OriginMetadata { address, client }))
    }
}
