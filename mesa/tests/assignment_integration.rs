//! Integration tests for availability search and table assignment.
//!
//! Every test drives a [`mesa::Coordinator`] over a real database file, so
//! planning, execution, commit and audit run exactly as they do from the
//! CLI.

mod common;

use chrono::{Duration, NaiveTime};
use mesa::operations::{AssignOptions, AvailabilityRequest, ReleaseOptions};
use mesa::{
    Error, FusionState, ReservationId, Role, Table, TableId, TableStatus, UnavailableReason,
};

use common::{book, coordinator, host, manager, seed_floor, service_time};

fn request(hour: u32, minute: u32, party: u32) -> AvailabilityRequest {
    let time = service_time(hour, minute);
    AvailabilityRequest::new(time.date(), time.time(), party)
}

/// Table 1 seats four. A 14:00 booking takes it; a 14:30 booking overlaps
/// and is refused; a 16:00 booking clears the 90 minute sitting plus the 15
/// minute buffer and gets it.
#[test]
fn test_overlapping_booking_is_refused_until_the_table_turns() {
    let mut mesa = coordinator();
    let floor = seed_floor(&mut mesa);

    let r1 = book(&mut mesa, 4, service_time(14, 0));
    let first = mesa.assign_tables(r1, vec![floor.t1.id], &host()).unwrap();
    assert_eq!(first.numbers, vec![1]);
    assert!(first.capacity >= 4);

    let r2 = book(&mut mesa, 4, service_time(14, 30));
    let err = mesa
        .assign_tables(r2, vec![floor.t1.id], &host())
        .unwrap_err();
    match err {
        Error::TableUnavailable {
            table_number,
            reason: UnavailableReason::Overlap { reservation },
            window,
        } => {
            assert_eq!(table_number, 1);
            assert_eq!(reservation, r1);
            assert_eq!(window.start(), service_time(14, 30));
        }
        other => panic!("expected an overlap, got {other:?}"),
    }
    assert!(mesa.reservation(r2).unwrap().tables().is_empty());

    let r3 = book(&mut mesa, 4, service_time(16, 0));
    mesa.assign_tables(r3, vec![floor.t1.id], &host()).unwrap();
    assert_eq!(mesa.reservation(r3).unwrap().tables(), &[floor.t1.id]);
}

#[test]
fn test_candidates_follow_the_booked_floor() {
    let mut mesa = coordinator();
    let floor = seed_floor(&mut mesa);

    let numbers = |mesa: &common::TestCoordinator, hour: u32, party: u32| -> Vec<Vec<u32>> {
        mesa.find_candidate_tables(&request(hour, 0, party))
            .unwrap()
            .iter()
            .map(|c| c.numbers())
            .collect()
    };

    // smallest fit first, the group of 4+5 is never needed for four
    assert_eq!(numbers(&mesa, 14, 4), vec![vec![1], vec![4], vec![5], vec![6]]);
    assert_eq!(numbers(&mesa, 14, 8), vec![vec![4, 5]]);
    assert!(numbers(&mesa, 14, 12).is_empty());

    let r1 = book(&mut mesa, 4, service_time(14, 0));
    mesa.assign_tables(r1, vec![floor.t1.id], &host()).unwrap();
    assert_eq!(numbers(&mesa, 14, 4), vec![vec![4], vec![5], vec![6]]);
    assert_eq!(numbers(&mesa, 21, 4), vec![vec![1], vec![4], vec![5], vec![6]]);
}

#[test]
fn test_zone_preference_ranks_first() {
    let mut mesa = coordinator();
    let floor = seed_floor(&mut mesa);

    let candidates = mesa
        .find_candidate_tables(&request(21, 0, 4).with_zone(Some(floor.t6.zone_id)))
        .unwrap();
    assert_eq!(candidates[0].numbers(), vec![6]);
    assert!(candidates[0].zone_match);
    assert!(candidates[1..].iter().all(|c| !c.zone_match));
}

#[test]
fn test_out_of_hours_search_is_rejected() {
    let mesa = coordinator();
    let date = service_time(0, 0).date();
    let late = AvailabilityRequest::new(date, NaiveTime::from_hms_opt(17, 30, 0).unwrap(), 2);
    assert!(matches!(
        mesa.find_candidate_tables(&late),
        Err(Error::OutOfServiceHours { .. })
    ));

    // window edges are inclusive
    let edge = AvailabilityRequest::new(date, NaiveTime::from_hms_opt(16, 0, 0).unwrap(), 2);
    assert!(mesa.find_candidate_tables(&edge).is_ok());
}

#[test]
fn test_group_assignment_fuses_and_release_dissolves() {
    let mut mesa = coordinator();
    let floor = seed_floor(&mut mesa);
    let r = book(&mut mesa, 8, service_time(21, 0));

    let result = mesa
        .assign_tables(r, vec![floor.t5.id, floor.t4.id], &host())
        .unwrap();
    assert_eq!(result.numbers, vec![4, 5]);
    assert_eq!(result.master, Some(floor.t4.id));
    assert_eq!(result.capacity, 8);

    let t4 = mesa.table_by_number(4).unwrap();
    let t5 = mesa.table_by_number(5).unwrap();
    assert_eq!(t4.fusion, FusionState::FusionMaster);
    assert_eq!(t5.fusion, FusionState::FusionSlave { master: t4.id });
    assert_eq!(t4.status, TableStatus::Reserved);

    mesa.release(ReleaseOptions::new(r, host())).unwrap();
    for number in [4, 5] {
        let table = mesa.table_by_number(number).unwrap();
        assert_eq!(table.fusion, FusionState::Individual);
        assert_eq!(table.status, TableStatus::Free);
    }

    // releasing again is a warning, not an error
    let again = mesa.release(ReleaseOptions::new(r, host())).unwrap();
    assert!(again.actions_taken.is_empty());
    assert_eq!(again.warnings.len(), 1);
}

#[test]
fn test_capacity_and_combinability_are_enforced() {
    let mut mesa = coordinator();
    let floor = seed_floor(&mut mesa);
    let r = book(&mut mesa, 6, service_time(21, 0));

    let err = mesa.assign_tables(r, vec![floor.t1.id], &host()).unwrap_err();
    assert!(matches!(
        err,
        Error::CapacityExceeded { party_size: 6, capacity: 4, .. }
    ));

    let err = mesa
        .assign_tables(r, vec![floor.t1.id, floor.t2.id], &host())
        .unwrap_err();
    assert!(matches!(err, Error::NotCombinable { table_number: 1 }));

    // forcing never overrides capacity
    let err = mesa
        .assign(AssignOptions::new(r, vec![floor.t2.id], manager()).with_force(true))
        .unwrap_err();
    assert!(matches!(err, Error::CapacityExceeded { .. }));
}

#[test]
fn test_force_overrides_overlap_for_managers_only() {
    let mut mesa = coordinator();
    let floor = seed_floor(&mut mesa);
    let r1 = book(&mut mesa, 2, service_time(14, 0));
    let r2 = book(&mut mesa, 2, service_time(14, 30));
    mesa.assign_tables(r1, vec![floor.t2.id], &host()).unwrap();

    let err = mesa
        .assign(AssignOptions::new(r2, vec![floor.t2.id], host()).with_force(true))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Forbidden {
            required: Role::Manager,
            ..
        }
    ));

    let forced = mesa
        .assign(AssignOptions::new(r2, vec![floor.t2.id], manager()).with_force(true))
        .unwrap();
    assert!(forced.overlap_overridden);
    assert_eq!(forced.warnings.len(), 1);
}

#[test]
fn test_blocked_table_cannot_be_assigned_even_forced() {
    let mut mesa = coordinator();
    let floor = seed_floor(&mut mesa);
    let r = book(&mut mesa, 2, service_time(14, 0));

    mesa.block_table(floor.t2.id, &manager()).unwrap();
    assert!(mesa
        .find_candidate_tables(&request(14, 0, 2))
        .unwrap()
        .iter()
        .all(|c| !c.table_ids().contains(&floor.t2.id)));

    let err = mesa
        .assign(AssignOptions::new(r, vec![floor.t2.id], manager()).with_force(true))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::TableUnavailable {
            reason: UnavailableReason::Blocked,
            ..
        }
    ));

    mesa.unblock_table(floor.t2.id, &manager()).unwrap();
    mesa.assign_tables(r, vec![floor.t2.id], &host()).unwrap();
}

#[test]
fn test_reassignment_moves_the_claim() {
    let mut mesa = coordinator();
    let floor = seed_floor(&mut mesa);
    let r = book(&mut mesa, 4, service_time(21, 0));

    // either table seats four alone, so only a manager can hand over both
    mesa.assign(
        AssignOptions::new(r, vec![floor.t4.id, floor.t5.id], manager()).with_force(true),
    )
    .unwrap();
    mesa.assign_tables(r, vec![floor.t1.id], &host()).unwrap();

    assert_eq!(mesa.reservation(r).unwrap().tables(), &[floor.t1.id]);
    assert_eq!(mesa.table_by_number(1).unwrap().status, TableStatus::Reserved);
    for number in [4, 5] {
        let table = mesa.table_by_number(number).unwrap();
        assert_eq!(table.status, TableStatus::Free);
        assert_eq!(table.fusion, FusionState::Individual);
    }
}

/// Table 7 is a combinable terrace table. Tables 5 and 7 together seat
/// seven, but they stand in different zones, so the search never pairs them
/// and a host cannot either; a manager can force it.
#[test]
fn test_group_outside_the_candidates_needs_force() {
    let mut mesa = coordinator();
    let floor = seed_floor(&mut mesa);
    let t7 = Table::builder(7, floor.t6.zone_id, 4)
        .combinable(true)
        .max_combined_capacity(10)
        .build()
        .unwrap();
    let t7 = mesa.add_table(&t7, &manager()).unwrap();
    let r = book(&mut mesa, 7, service_time(21, 0));

    let offered: Vec<Vec<u32>> = mesa
        .find_candidate_tables(&request(21, 0, 7))
        .unwrap()
        .iter()
        .map(|c| c.numbers())
        .collect();
    assert_eq!(offered, vec![vec![4, 5]]);

    let err = mesa
        .assign_tables(r, vec![floor.t5.id, t7.id], &host())
        .unwrap_err();
    match err {
        Error::TableUnavailable {
            table_number,
            reason,
            window,
        } => {
            assert_eq!(table_number, 7);
            assert_eq!(reason, UnavailableReason::OtherZone);
            assert_eq!(window.start(), service_time(21, 0));
        }
        other => panic!("expected TableUnavailable, got {other:?}"),
    }
    assert!(mesa.reservation(r).unwrap().tables().is_empty());

    // a party of four fits table 4 alone, so 4+5 is never offered to it
    let four = book(&mut mesa, 4, service_time(13, 0));
    let err = mesa
        .assign_tables(four, vec![floor.t4.id, floor.t5.id], &host())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::TableUnavailable {
            table_number: 4,
            reason: UnavailableReason::SeatsPartyAlone,
            ..
        }
    ));

    let forced = mesa
        .assign(AssignOptions::new(r, vec![floor.t5.id, t7.id], manager()).with_force(true))
        .unwrap();
    assert_eq!(forced.numbers, vec![5, 7]);
    assert_eq!(
        mesa.table_by_number(7).unwrap().fusion,
        FusionState::FusionSlave {
            master: floor.t5.id
        }
    );
}

/// Tonight's group of 4+5 only takes those tables for its own sitting. A
/// week later at lunch both are offered alone, and taking table 4 leaves the
/// group standing for tonight.
#[test]
fn test_fused_tables_stay_bookable_on_other_dates() {
    let mut mesa = coordinator();
    let floor = seed_floor(&mut mesa);
    let dinner = book(&mut mesa, 8, service_time(21, 0));
    mesa.assign_tables(dinner, vec![floor.t4.id, floor.t5.id], &host())
        .unwrap();

    let tonight: Vec<Vec<u32>> = mesa
        .find_candidate_tables(&request(21, 0, 4))
        .unwrap()
        .iter()
        .map(|c| c.numbers())
        .collect();
    assert_eq!(tonight, vec![vec![1], vec![6]]);

    let next_week = service_time(13, 0) + Duration::days(7);
    let candidates: Vec<Vec<u32>> = mesa
        .find_candidate_tables(&AvailabilityRequest::new(
            next_week.date(),
            next_week.time(),
            4,
        ))
        .unwrap()
        .iter()
        .map(|c| c.numbers())
        .collect();
    assert_eq!(candidates, vec![vec![1], vec![4], vec![5], vec![6]]);

    let lunch = book(&mut mesa, 4, next_week);
    let result = mesa.assign_tables(lunch, vec![floor.t4.id], &host()).unwrap();
    assert_eq!(result.numbers, vec![4]);
    assert_eq!(result.master, None);

    let t4 = mesa.table_by_number(4).unwrap();
    assert_eq!(t4.status, TableStatus::Reserved);
    assert_eq!(t4.fusion, FusionState::FusionMaster);
    assert_eq!(
        mesa.table_by_number(5).unwrap().fusion,
        FusionState::FusionSlave { master: t4.id }
    );
    assert_eq!(
        mesa.reservation(dinner).unwrap().tables(),
        &[floor.t4.id, floor.t5.id]
    );
}

/// Lunch has table 4 alone and dinner has 4+5. Once lunch is done and
/// table 4 is cleaned, the group stays fused for dinner.
#[test]
fn test_cleaning_keeps_a_group_booked_for_later() {
    let mut mesa = coordinator();
    let floor = seed_floor(&mut mesa);
    let lunch = book(&mut mesa, 4, service_time(13, 0));
    let dinner = book(&mut mesa, 8, service_time(21, 0));
    mesa.assign_tables(lunch, vec![floor.t4.id], &host()).unwrap();
    mesa.assign_tables(dinner, vec![floor.t4.id, floor.t5.id], &host())
        .unwrap();

    mesa.seat(lunch, &host()).unwrap();
    mesa.complete(lunch, &host()).unwrap();
    assert_eq!(mesa.table_by_number(4).unwrap().status, TableStatus::Cleaning);
    mesa.finish_cleaning(floor.t4.id, &host()).unwrap();

    let t4 = mesa.table_by_number(4).unwrap();
    let t5 = mesa.table_by_number(5).unwrap();
    assert_eq!(t4.status, TableStatus::Reserved);
    assert_eq!(t4.fusion, FusionState::FusionMaster);
    assert_eq!(t5.status, TableStatus::Reserved);
    assert_eq!(t5.fusion, FusionState::FusionSlave { master: t4.id });
    assert_eq!(
        mesa.reservation(dinner).unwrap().tables(),
        &[floor.t4.id, floor.t5.id]
    );

    // dinner letting go dissolves the group
    mesa.release(ReleaseOptions::new(dinner, host())).unwrap();
    for number in [4, 5] {
        let table = mesa.table_by_number(number).unwrap();
        assert_eq!(table.status, TableStatus::Free);
        assert_eq!(table.fusion, FusionState::Individual);
    }
}

#[test]
fn test_unknown_reservation_and_table() {
    let mut mesa = coordinator();
    let floor = seed_floor(&mut mesa);
    let r = book(&mut mesa, 2, service_time(14, 0));

    let err = mesa
        .assign_tables(ReservationId(999), vec![floor.t1.id], &host())
        .unwrap_err();
    assert!(matches!(err, Error::ReservationNotFound { .. }));

    let err = mesa
        .assign_tables(r, vec![TableId(999)], &host())
        .unwrap_err();
    assert!(matches!(err, Error::TableNotFound { .. }));
}
