//! Read-only history projections.
//!
//! Joins registrations with their tokens and attendance records per
//! participant or per event. Archived events pass through transparently;
//! history is never filtered by lifecycle state.

use crate::error::EngineError;
use crate::store::{EngineStore, HistoryEntry};
use std::sync::Arc;
use uuid::Uuid;

pub struct HistoryReader {
    store: Arc<dyn EngineStore>,
}

impl HistoryReader {
    pub fn new(store: Arc<dyn EngineStore>) -> Self {
        Self { store }
    }

    /// Everything a participant registered for, newest event first.
    pub async fn participant_history(
        &self,
        participant_id: Uuid,
    ) -> Result<Vec<HistoryEntry>, EngineError> {
        Ok(self.store.participant_history(participant_id).await?)
    }

    /// Every registration for an event, in admission order.
    pub async fn event_history(&self, event_id: Uuid) -> Result<Vec<HistoryEntry>, EngineError> {
        Ok(self.store.event_history(event_id).await?)
    }
}
