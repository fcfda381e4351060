use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use evreg_sdk::objects::AttendanceAvailability;
use uuid::Uuid;

use super::EngineApiError;
use crate::state::AppState;

/// `GET /events/{event_id}/attendance` — is the attendance window open?
pub(super) async fn availability(
    state: State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, EngineApiError> {
    let availability = state.redemption.availability(event_id).await?;

    Ok(Json(AttendanceAvailability {
        available: availability.open,
        reason: availability.reason.map(|r| r.as_str().to_owned()),
    }))
}
