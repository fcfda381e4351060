use axum::{Json, extract::State, response::IntoResponse};
use evreg_core::entities::Credential;
use evreg_core::error::EngineError;
use evreg_sdk::objects::{VerifyRequest, VerifyResponse};

use super::EngineApiError;
use crate::state::AppState;

/// `POST /attendance/verify` — check a credential without spending it.
///
/// A malformed credential gets the same uniform response as an unknown one.
pub(super) async fn verify(
    state: State<AppState>,
    Json(body): Json<VerifyRequest>,
) -> Result<impl IntoResponse, EngineApiError> {
    let credential: Credential = body
        .credential
        .parse()
        .map_err(|_| EngineError::InvalidOrExpiredToken)?;

    let info = state.redemption.verify(credential, body.event_id).await?;

    Ok(Json(VerifyResponse {
        valid: true,
        registration_id: info.registration_id,
        participant_id: info.participant_id,
        expires_at: info.expires_at.unix_timestamp(),
    }))
}
