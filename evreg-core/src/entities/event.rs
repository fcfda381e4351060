use time::OffsetDateTime;
use uuid::Uuid;

/// An event participants can register for.
///
/// Owned by an organizer flow outside this engine; the engine reads the
/// schedule and capacity and mutates only the lifecycle state. Events are
/// never hard-deleted while registrations reference them.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub start_at: OffsetDateTime,
    pub end_at: Option<OffsetDateTime>,
    /// `None` means unlimited.
    pub capacity: Option<i32>,
    pub lifecycle: LifecycleState,
    pub created_at: OffsetDateTime,
}

/// Event lifecycle: `draft -> published -> archived`, with an admin-only
/// `archived -> published` restore edge. No other transitions exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "lifecycle_state", rename_all = "snake_case")]
pub enum LifecycleState {
    Draft,
    Published,
    Archived,
}

impl LifecycleState {
    /// Whether the `self -> to` edge exists in the state machine.
    pub fn can_transition_to(self, to: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, to),
            (Draft, Published) | (Published, Archived) | (Archived, Published)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Draft => "draft",
            LifecycleState::Published => "published",
            LifecycleState::Archived => "archived",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::LifecycleState::*;

    #[test]
    fn transition_table() {
        assert!(Draft.can_transition_to(Published));
        assert!(Published.can_transition_to(Archived));
        assert!(Archived.can_transition_to(Published));

        assert!(!Draft.can_transition_to(Archived));
        assert!(!Published.can_transition_to(Draft));
        assert!(!Archived.can_transition_to(Draft));
        assert!(!Published.can_transition_to(Published));
        assert!(!Archived.can_transition_to(Archived));
        assert!(!Draft.can_transition_to(Draft));
    }
}
