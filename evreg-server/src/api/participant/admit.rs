use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use evreg_sdk::objects::{AdmitRequest, AdmitResponse};
use uuid::Uuid;

use super::EngineApiError;
use crate::state::AppState;

/// `POST /events/{event_id}/registrations` — register for an event.
///
/// Admission is auto-approved and the attendance credential is issued
/// synchronously; the response always carries it. A `warning` field is set
/// when the confirmation notice could not be delivered.
pub(super) async fn admit(
    state: State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(body): Json<AdmitRequest>,
) -> Result<impl IntoResponse, EngineApiError> {
    let admission = state.admission.admit(event_id, body.participant_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(AdmitResponse {
            registration_id: admission.registration.id,
            credential: admission.token.credential.to_string(),
            expires_at: admission.token.expires_at.unix_timestamp(),
            warning: admission.notice_warning,
        }),
    ))
}
