//! Event lifecycle scheduling.
//!
//! A recurring sweep with three independent, idempotent duties, each built
//! on an atomic claim so overlapping runs cannot double-process a row:
//! archiving ended events, marking stale registrations absent, and
//! re-issuing tokens lost mid-admission. Restore is the admin-triggered
//! reverse edge of archival and is not time-driven.

use crate::clock::Clock;
use crate::entities::{Event, LifecycleState};
use crate::error::EngineError;
use crate::issuer::TokenIssuer;
use crate::store::EngineStore;
use std::sync::Arc;
use time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};
use uuid::Uuid;

/// How many token-less registrations one repair pass picks up.
const TOKEN_REPAIR_BATCH: i64 = 100;

/// Registrations younger than this are skipped by the repair sweep; their
/// admission may still be issuing its token.
const TOKEN_REPAIR_GRACE: Duration = Duration::minutes(5);

pub struct LifecycleScheduler {
    store: Arc<dyn EngineStore>,
    clock: Arc<dyn Clock>,
    issuer: TokenIssuer,
}

impl LifecycleScheduler {
    pub fn new(store: Arc<dyn EngineStore>, clock: Arc<dyn Clock>, issuer: TokenIssuer) -> Self {
        Self {
            store,
            clock,
            issuer,
        }
    }

    /// Run the recurring sweep until shutdown is signaled.
    pub async fn run(
        self: Arc<Self>,
        mut shutdown_rx: watch::Receiver<bool>,
        interval: std::time::Duration,
    ) {
        info!("LifecycleScheduler started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("LifecycleScheduler received shutdown signal");
                        break;
                    }
                }

                _ = tokio::time::sleep(interval) => {
                    self.tick().await;
                }
            }
        }

        info!("LifecycleScheduler shutdown complete");
    }

    /// One pass over all duties. A failing duty is logged and does not stop
    /// the others.
    pub async fn tick(&self) {
        if let Err(e) = self.archival_sweep().await {
            error!(error = %e, "Archival sweep failed");
        }
        if let Err(e) = self.absence_sweep().await {
            error!(error = %e, "Absence sweep failed");
        }
        if let Err(e) = self.token_repair_sweep().await {
            error!(error = %e, "Token repair sweep failed");
        }
    }

    /// Archive every published event whose effective end has passed.
    ///
    /// The claim is a conditional update on the lifecycle column, so a sweep
    /// overlapping a slow previous run archives each event exactly once, and
    /// a second run right after archives zero. Registrations, tokens, and
    /// records are untouched.
    pub async fn archival_sweep(&self) -> Result<Vec<Uuid>, EngineError> {
        let now = self.clock.now();
        let archived = self.store.archive_ended_events(now).await?;
        for event_id in &archived {
            info!(%event_id, "Archived ended event");
        }
        if archived.is_empty() {
            debug!("Archival sweep found nothing to archive");
        }
        Ok(archived)
    }

    /// Terminal `not_marked -> absent` for approved registrations of events
    /// whose calendar day has fully passed.
    pub async fn absence_sweep(&self) -> Result<u64, EngineError> {
        let now = self.clock.now();
        let marked = self.store.mark_absent_for_past_events(now).await?;
        if marked > 0 {
            info!(marked, "Marked stale registrations absent");
        }
        Ok(marked)
    }

    /// Re-issue tokens for registrations whose issuance was lost
    /// mid-admission. Skips rows inside the grace period to avoid racing an
    /// in-flight admission.
    pub async fn token_repair_sweep(&self) -> Result<u64, EngineError> {
        let now = self.clock.now();
        let missing = self
            .store
            .registrations_missing_token(TOKEN_REPAIR_BATCH)
            .await?;

        let mut repaired = 0;
        for registration in missing {
            if registration.created_at + TOKEN_REPAIR_GRACE > now {
                continue;
            }
            match self
                .issuer
                .issue(
                    registration.id,
                    registration.participant_id,
                    registration.event_id,
                )
                .await
            {
                Ok(token) => {
                    info!(
                        registration_id = %registration.id,
                        token_id = %token.id,
                        "Re-issued missing attendance token"
                    );
                    repaired += 1;
                }
                Err(e) => {
                    error!(
                        registration_id = %registration.id,
                        error = %e,
                        "Failed to re-issue missing token"
                    );
                }
            }
        }
        Ok(repaired)
    }

    /// All archived events, for the admin restore picker.
    pub async fn archived_events(&self) -> Result<Vec<Event>, EngineError> {
        Ok(self.store.archived_events().await?)
    }

    /// Admin-triggered `archived -> published`. Never resurrects absence or
    /// attendance facts; only the lifecycle column moves.
    pub async fn restore(&self, event_id: Uuid) -> Result<Event, EngineError> {
        let restored = self
            .store
            .transition_lifecycle(event_id, LifecycleState::Archived, LifecycleState::Published)
            .await?;

        if restored {
            info!(%event_id, "Restored archived event");
            return self
                .store
                .event(event_id)
                .await?
                .ok_or(EngineError::EventUnavailable);
        }

        match self.store.event(event_id).await? {
            Some(event) => Err(EngineError::InvalidTransition {
                from: event.lifecycle,
                to: LifecycleState::Published,
            }),
            None => Err(EngineError::EventUnavailable),
        }
    }
}
