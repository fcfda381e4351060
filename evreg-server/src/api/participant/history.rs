use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use super::{EngineApiError, to_history_entry};
use crate::state::AppState;

/// `GET /participants/{participant_id}/history` — full registration history.
///
/// Includes archived events; lifecycle state never hides a row here.
pub(super) async fn participant_history(
    state: State<AppState>,
    Path(participant_id): Path<Uuid>,
) -> Result<impl IntoResponse, EngineApiError> {
    let entries = state.history.participant_history(participant_id).await?;

    let response: Vec<_> = entries.iter().map(to_history_entry).collect();
    Ok(Json(response))
}
