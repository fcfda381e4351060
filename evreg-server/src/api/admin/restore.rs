use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use evreg_sdk::objects::RestoreEventResponse;
use uuid::Uuid;

use super::EngineApiError;
use crate::api::extractors::AdminAuth;
use crate::api::participant::to_event_summary;
use crate::state::AppState;

/// `POST /events/{event_id}/restore` — restore an archived event.
///
/// Only `archived -> published` is accepted; any other starting state is a
/// conflict. Attendance facts written while archived are left untouched.
pub(super) async fn restore(
    state: State<AppState>,
    _auth: AdminAuth,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, EngineApiError> {
    let event = state.lifecycle.restore(event_id).await?;

    Ok(Json(RestoreEventResponse {
        event: to_event_summary(&event),
    }))
}
