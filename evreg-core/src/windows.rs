//! Time-window evaluation for registration and attendance.
//!
//! Pure functions over an event's stored schedule and a reference instant.
//! All comparisons are in UTC; the caller supplies `now` from an injected
//! [`Clock`](crate::clock::Clock).

use crate::entities::Event;
use time::macros::time as t;
use time::{Duration, OffsetDateTime};

/// Registrations close this long before the event starts.
pub const REGISTRATION_CUTOFF: Duration = Duration::hours(1);

/// Attendance opens this long before the event starts, on the event day.
pub const ATTENDANCE_LEAD: Duration = Duration::minutes(30);

/// Attendance tokens stay redeemable this long after issuance.
pub const TOKEN_TTL: Duration = Duration::days(30);

/// Outcome of checking the attendance window at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStatus {
    /// Inside the window: same calendar day, past the lead time.
    Open,
    /// `now` is not on the event's calendar day.
    WrongDay,
    /// Event day, but earlier than `start - ATTENDANCE_LEAD`.
    TooEarly,
}

/// True while `now` is strictly before `start - REGISTRATION_CUTOFF`.
pub fn registration_open(event: &Event, now: OffsetDateTime) -> bool {
    now < event.start_at - REGISTRATION_CUTOFF
}

/// Evaluate the attendance window.
///
/// Open only on the event's calendar date, from `start - ATTENDANCE_LEAD`
/// onward. There is no same-day upper bound; token expiry is enforced
/// separately by the token store.
pub fn attendance_window(event: &Event, now: OffsetDateTime) -> WindowStatus {
    if now.date() != event.start_at.date() {
        WindowStatus::WrongDay
    } else if now < event.start_at - ATTENDANCE_LEAD {
        WindowStatus::TooEarly
    } else {
        WindowStatus::Open
    }
}

/// The instant at which an event is considered over.
///
/// Uses the stored end when present, otherwise the last second of the
/// start's calendar day, so the archival and absence sweeps agree on when
/// an event's day is done.
pub fn effective_end(event: &Event) -> OffsetDateTime {
    event
        .end_at
        .unwrap_or_else(|| event.start_at.replace_time(t!(23:59:59)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::LifecycleState;
    use time::macros::datetime;
    use uuid::Uuid;

    fn event_starting_at(start: OffsetDateTime) -> Event {
        Event {
            id: Uuid::new_v4(),
            title: "Rust Meetup".to_owned(),
            start_at: start,
            end_at: None,
            capacity: None,
            lifecycle: LifecycleState::Published,
            created_at: start - Duration::days(14),
        }
    }

    #[test]
    fn registration_closes_one_hour_before_start() {
        let event = event_starting_at(datetime!(2025-01-10 10:00 UTC));

        assert!(registration_open(&event, datetime!(2025-01-10 08:59 UTC)));
        assert!(!registration_open(&event, datetime!(2025-01-10 09:00 UTC)));
        assert!(!registration_open(&event, datetime!(2025-01-10 09:01 UTC)));
        assert!(!registration_open(&event, datetime!(2025-01-10 11:00 UTC)));
    }

    #[test]
    fn attendance_window_bounds() {
        let event = event_starting_at(datetime!(2025-01-10 10:00 UTC));

        assert_eq!(
            attendance_window(&event, datetime!(2025-01-09 10:00 UTC)),
            WindowStatus::WrongDay
        );
        assert_eq!(
            attendance_window(&event, datetime!(2025-01-10 09:29 UTC)),
            WindowStatus::TooEarly
        );
        assert_eq!(
            attendance_window(&event, datetime!(2025-01-10 09:31 UTC)),
            WindowStatus::Open
        );
        assert_eq!(
            attendance_window(&event, datetime!(2025-01-10 12:00 UTC)),
            WindowStatus::Open
        );
        assert_eq!(
            attendance_window(&event, datetime!(2025-01-10 23:59 UTC)),
            WindowStatus::Open
        );
        assert_eq!(
            attendance_window(&event, datetime!(2025-01-11 09:45 UTC)),
            WindowStatus::WrongDay
        );
    }

    #[test]
    fn effective_end_defaults_to_end_of_day() {
        let mut event = event_starting_at(datetime!(2025-01-10 10:00 UTC));
        assert_eq!(effective_end(&event), datetime!(2025-01-10 23:59:59 UTC));

        event.end_at = Some(datetime!(2025-01-10 12:00 UTC));
        assert_eq!(effective_end(&event), datetime!(2025-01-10 12:00 UTC));
    }
}
