use axum::{Json, extract::State, response::IntoResponse};

use super::EngineApiError;
use crate::api::extractors::AdminAuth;
use crate::api::participant::to_event_summary;
use crate::state::AppState;

/// `GET /events/archived` — list archived events for the restore picker.
pub(super) async fn archived_events(
    state: State<AppState>,
    _auth: AdminAuth,
) -> Result<impl IntoResponse, EngineApiError> {
    let events = state.lifecycle.archived_events().await?;

    let response: Vec<_> = events.iter().map(to_event_summary).collect();
    Ok(Json(response))
}
