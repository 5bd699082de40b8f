//! Property-based tests for reservation windows and the transition table.

use super::{ReservationEvent, ReservationStatus, TimeWindow};
use chrono::{NaiveDate, NaiveTime};
use proptest::prelude::*;

fn status_strategy() -> impl Strategy<Value = ReservationStatus> {
    proptest::sample::select(ReservationStatus::ALL.to_vec())
}

fn event_strategy() -> impl Strategy<Value = ReservationEvent> {
    proptest::sample::select(ReservationEvent::LIFECYCLE.to_vec())
}

// Windows on one service day, starting on a 5-minute grid.
fn window_strategy() -> impl Strategy<Value = TimeWindow> {
    (0u32..(22 * 12), 15u32..=240).prop_map(|(slot, minutes)| {
        let date = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
        let time = NaiveTime::from_hms_opt(slot / 12, (slot % 12) * 5, 0).unwrap();
        TimeWindow::starting_at(date, time, minutes)
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 2000,
        .. ProptestConfig::default()
    })]

    // Conflict detection does not depend on argument order
    #[test]
    fn window_conflict_symmetric(a in window_strategy(), b in window_strategy(), buffer in 0u32..120) {
        prop_assert_eq!(a.conflicts_with(&b, buffer), b.conflicts_with(&a, buffer));
    }

    // A larger buffer never removes a conflict
    #[test]
    fn window_conflict_monotonic_in_buffer(a in window_strategy(), b in window_strategy(), buffer in 0u32..120, extra in 0u32..60) {
        if a.conflicts_with(&b, buffer) {
            prop_assert!(a.conflicts_with(&b, buffer + extra));
        }
    }

    // Every window conflicts with itself
    #[test]
    fn window_conflicts_with_itself(a in window_strategy()) {
        prop_assert!(a.conflicts_with(&a, 0));
    }

    // Terminal states accept no lifecycle event
    #[test]
    fn terminal_states_reject_all_events(status in status_strategy(), event in event_strategy()) {
        if status.is_terminal() {
            prop_assert_eq!(status.after(event), None);
        }
    }

    // Every defined transition changes the status
    #[test]
    fn lifecycle_transitions_make_progress(status in status_strategy(), event in event_strategy()) {
        if let Some(next) = status.after(event) {
            prop_assert_ne!(next, status);
        }
    }

    // Assignment never changes the status
    #[test]
    fn assign_preserves_status(status in status_strategy()) {
        if let Some(next) = status.after(ReservationEvent::Assign) {
            prop_assert_eq!(next, status);
            prop_assert!(matches!(status, ReservationStatus::Pending | ReservationStatus::Confirmed));
        }
    }
}
