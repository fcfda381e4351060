use axum::{Json, extract::State, response::IntoResponse};
use evreg_core::entities::Credential;
use evreg_core::error::EngineError;
use evreg_sdk::objects::{RedeemRequest, RedeemResponse};

use super::EngineApiError;
use crate::api::extractors::ClientOrigin;
use crate::state::AppState;

/// `POST /attendance/redeem` — spend a credential and record attendance.
///
/// The caller's peer address and user agent are stored on the attendance
/// record. A malformed credential gets the same uniform response as an
/// unknown one.
pub(super) async fn redeem(
    state: State<AppState>,
    ClientOrigin(origin): ClientOrigin,
    Json(body): Json<RedeemRequest>,
) -> Result<impl IntoResponse, EngineApiError> {
    let credential: Credential = body
        .credential
        .parse()
        .map_err(|_| EngineError::InvalidOrExpiredToken)?;

    let record = state
        .redemption
        .redeem(credential, body.event_id, origin)
        .await?;

    Ok(Json(RedeemResponse {
        attendance_record_id: record.id,
    }))
}
