use axum::{Json, extract::State, response::IntoResponse};
use evreg_sdk::objects::SweepResponse;

use super::EngineApiError;
use crate::api::extractors::AdminAuth;
use crate::state::AppState;

/// `POST /sweeps/archive` — run the archival sweep immediately.
///
/// Safe to trigger while the scheduled sweep is running; each ended event is
/// claimed by exactly one of them.
pub(super) async fn trigger_sweep(
    state: State<AppState>,
    _auth: AdminAuth,
) -> Result<impl IntoResponse, EngineApiError> {
    let archived = state.lifecycle.archival_sweep().await?;

    Ok(Json(SweepResponse {
        archived_count: archived.len() as u64,
    }))
}
