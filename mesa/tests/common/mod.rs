//! Common test utilities for integration tests.
//!
//! This module provides helper functions and fixture builders for testing
//! the mesa library against a real `SQLite` file.

pub mod database;

use chrono::{NaiveDate, NaiveDateTime};

use mesa::operations::{IntakeOptions, ReservationRequest};
use mesa::{
    Actor, Config, Coordinator, Database, FixedClock, MemoryAuditSink, Origin, ReservationId,
    Role, Table, Zone,
};

/// The coordinator flavour every integration test uses.
#[allow(dead_code)]
pub type TestCoordinator = Coordinator<FixedClock, MemoryAuditSink>;

/// `hour:minute` on the service date used throughout, 2026-10-20.
#[allow(dead_code)]
pub fn service_time(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 20)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

#[allow(dead_code)]
pub fn manager() -> Actor {
    Actor::new("marta", Role::Manager)
}

#[allow(dead_code)]
pub fn host() -> Actor {
    Actor::new("ana", Role::Host)
}

/// A coordinator over a fresh database, its clock at 10:00 on the service
/// date, with default settings.
#[allow(dead_code)]
pub fn coordinator() -> TestCoordinator {
    let (db, _) = database::create_test_database();
    coordinator_over(db)
}

/// Same as [`coordinator`] over an already opened database.
#[allow(dead_code)]
pub fn coordinator_over(db: Database) -> TestCoordinator {
    Coordinator::new(
        db,
        &Config::default(),
        FixedClock::new(service_time(10, 0)),
        MemoryAuditSink::new(),
    )
}

/// The floor used by the scenario tests.
///
/// | Table | Zone | Seats | Combinable (max) |
/// |---|---|---|---|
/// | 1 | hall | 4 | no |
/// | 2 | hall | 2 | no |
/// | 4 | hall | 4 | yes (10) |
/// | 5 | hall | 4 | yes (10) |
/// | 6 | terrace | 6 | no |
#[allow(dead_code)]
pub struct Floor {
    pub t1: Table,
    pub t2: Table,
    pub t4: Table,
    pub t5: Table,
    pub t6: Table,
}

#[allow(dead_code)]
pub fn seed_floor(mesa: &mut TestCoordinator) -> Floor {
    let hall = mesa
        .add_zone(&Zone::new("hall", "Salón", 30).unwrap(), &manager())
        .unwrap();
    let terrace = mesa
        .add_zone(&Zone::new("terrace", "Terraza", 12).unwrap(), &manager())
        .unwrap();

    let mut add = |number: u32, zone: &Zone, seats: u32, max: Option<u32>| {
        let mut builder = Table::builder(number, zone.id, seats);
        if let Some(max) = max {
            builder = builder.combinable(true).max_combined_capacity(max);
        }
        mesa.add_table(&builder.build().unwrap(), &manager()).unwrap()
    };

    Floor {
        t1: add(1, &hall, 4, None),
        t2: add(2, &hall, 2, None),
        t4: add(4, &hall, 4, Some(10)),
        t5: add(5, &hall, 4, Some(10)),
        t6: add(6, &terrace, 6, None),
    }
}

/// Books a staff-entered, confirmed reservation.
#[allow(dead_code)]
pub fn book(mesa: &mut TestCoordinator, party: u32, start: NaiveDateTime) -> ReservationId {
    let request = ReservationRequest::new("Guest", party, start.date(), start.time())
        .with_phone("600000000")
        .with_origin(Origin::Phone);
    mesa.create_reservation(IntakeOptions::new(request, host()))
        .unwrap()
        .reservation
        .id()
}
