//! Admin API handlers.
//!
//! These endpoints are called by the admin dashboard and require the
//! `Evreg-Admin-Authorization` header with the plaintext admin secret.
//!
//! # Endpoints
//!
//! - `GET  /events/archived`            – list archived events
//! - `POST /events/{event_id}/restore`  – restore an archived event to published
//! - `POST /sweeps/archive`             – run the archival sweep now

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

mod archived_events;
mod restore;
mod trigger_sweep;

pub(crate) use super::error::EngineApiError;

/// Build the Admin API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events/archived", get(archived_events::archived_events))
        .route("/events/{event_id}/restore", post(restore::restore))
        .route("/sweeps/archive", post(trigger_sweep::trigger_sweep))
}
