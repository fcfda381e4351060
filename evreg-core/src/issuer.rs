//! Attendance-token issuance.
//!
//! Credentials come from an injected [`CredentialSource`] so tests can force
//! collisions deterministically; production draws from the OS RNG. The store's
//! unique constraint is the authoritative collision guard — the `in_use`
//! pre-check only keeps the common path to one round trip.

use crate::clock::Clock;
use crate::entities::{AttendanceToken, Credential};
use crate::error::EngineError;
use crate::store::{EngineStore, InsertTokenOutcome};
use crate::windows::TOKEN_TTL;
use rand::TryRngCore;
use rand::rngs::OsRng;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// Collision retry budget. With 12 digits of credential space this is
/// effectively unreachable, but it is enforced rather than assumed.
pub const MAX_ISSUE_ATTEMPTS: u32 = 10;

#[derive(Debug, Error)]
#[error("entropy source failed: {0}")]
pub struct EntropyError(pub String);

/// Source of candidate credentials.
pub trait CredentialSource: Send + Sync {
    fn draw(&self) -> Result<Credential, EntropyError>;
}

/// Production source: cryptographically strong randomness from the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRngCredentials;

impl CredentialSource for OsRngCredentials {
    fn draw(&self) -> Result<Credential, EntropyError> {
        let raw = OsRng
            .try_next_u64()
            .map_err(|e| EntropyError(e.to_string()))?;
        Ok(Credential::from_entropy(raw))
    }
}

/// Scripted source for tests: yields a fixed sequence of credentials.
#[derive(Debug, Default)]
pub struct SequenceCredentials {
    queue: Mutex<VecDeque<Credential>>,
}

impl SequenceCredentials {
    pub fn new(credentials: impl IntoIterator<Item = Credential>) -> Self {
        Self {
            queue: Mutex::new(credentials.into_iter().collect()),
        }
    }
}

impl CredentialSource for SequenceCredentials {
    fn draw(&self) -> Result<Credential, EntropyError> {
        let mut queue = self
            .queue
            .lock()
            .map_err(|_| EntropyError("sequence poisoned".to_owned()))?;
        queue
            .pop_front()
            .ok_or_else(|| EntropyError("sequence exhausted".to_owned()))
    }
}

/// Issues single-use attendance tokens, one per registration.
pub struct TokenIssuer {
    store: Arc<dyn EngineStore>,
    clock: Arc<dyn Clock>,
    credentials: Arc<dyn CredentialSource>,
}

impl TokenIssuer {
    pub fn new(
        store: Arc<dyn EngineStore>,
        clock: Arc<dyn Clock>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        Self {
            store,
            clock,
            credentials,
        }
    }

    /// Generate, deduplicate, and persist a token for an admitted
    /// registration. Expiry is issuance + 30 days.
    pub async fn issue(
        &self,
        registration_id: Uuid,
        participant_id: Uuid,
        event_id: Uuid,
    ) -> Result<AttendanceToken, EngineError> {
        let now = self.clock.now();

        for attempt in 1..=MAX_ISSUE_ATTEMPTS {
            let credential = self
                .credentials
                .draw()
                .map_err(|e| EngineError::Credential(e.to_string()))?;

            if self.store.credential_in_use(credential, now).await? {
                debug!(attempt, "Candidate credential already in use, redrawing");
                continue;
            }

            let token = AttendanceToken {
                id: Uuid::new_v4(),
                registration_id,
                participant_id,
                event_id,
                credential,
                issued_at: now,
                expires_at: now + TOKEN_TTL,
                redeemed: false,
                redeemed_at: None,
            };

            match self.store.insert_token(&token).await? {
                InsertTokenOutcome::Inserted => return Ok(token),
                InsertTokenOutcome::CredentialInUse => {
                    debug!(attempt, "Credential collided at insert, redrawing");
                }
            }
        }

        warn!(
            %registration_id,
            attempts = MAX_ISSUE_ATTEMPTS,
            "Exhausted credential draw attempts"
        );
        Err(EngineError::TokenSpaceExhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::MemoryStore;
    use time::macros::datetime;

    fn credential(value: u64) -> Credential {
        Credential::new(value).unwrap()
    }

    fn issuer_with(credentials: SequenceCredentials) -> (Arc<MemoryStore>, TokenIssuer) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(datetime!(2025-01-10 08:00 UTC)));
        let issuer = TokenIssuer::new(store.clone(), clock, Arc::new(credentials));
        (store, issuer)
    }

    #[tokio::test]
    async fn issues_with_thirty_day_expiry() {
        let (_, issuer) = issuer_with(SequenceCredentials::new([credential(100_000_000_001)]));
        let token = issuer
            .issue(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(token.issued_at, datetime!(2025-01-10 08:00 UTC));
        assert_eq!(token.expires_at, datetime!(2025-02-09 08:00 UTC));
        assert!(!token.redeemed);
    }

    #[tokio::test]
    async fn redraws_after_collision() {
        let first = credential(100_000_000_001);
        let second = credential(100_000_000_002);
        let (_, issuer) = issuer_with(SequenceCredentials::new([first, first, second]));

        let a = issuer
            .issue(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap();
        let b = issuer
            .issue(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(a.credential, first);
        assert_eq!(b.credential, second);
    }

    #[tokio::test]
    async fn exhausts_after_ten_colliding_draws() {
        let taken = credential(100_000_000_001);
        let draws = std::iter::repeat_n(taken, 1 + MAX_ISSUE_ATTEMPTS as usize);
        let (_, issuer) = issuer_with(SequenceCredentials::new(draws));

        issuer
            .issue(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap();
        let err = issuer
            .issue(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::TokenSpaceExhausted));
    }

    #[test]
    fn os_rng_draws_are_well_formed() {
        let source = OsRngCredentials;
        for _ in 0..16 {
            let c = source.draw().unwrap();
            assert_eq!(c.to_string().len(), 12);
        }
    }
}
