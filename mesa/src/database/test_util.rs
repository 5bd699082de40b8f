//! Shared fixtures for database unit tests.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use tempfile::tempdir;

use crate::database::{Database, DatabaseConfig};
use crate::ids::{ReservationId, TableId, ZoneId};
use crate::reservation::{Origin, Reservation};
use crate::table::Table;
use crate::zone::Zone;

/// Creates a temporary test database.
///
/// # Panics
///
/// Panics if the temporary directory or database cannot be created.
#[must_use]
pub fn create_test_database() -> Database {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");
    let db = Database::open(DatabaseConfig::new(path)).unwrap();

    // keep the directory alive for the lifetime of the test
    std::mem::forget(dir);

    db
}

/// `hour:minute` on the fixture service date, 2026-10-20.
#[must_use]
pub fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 20)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

pub fn seed_zone(conn: &Connection, code: &str) -> ZoneId {
    Database::insert_zone(conn, &Zone::new(code, code.to_uppercase(), 40).unwrap()).unwrap()
}

/// A non-combinable table.
pub fn seed_table(conn: &Connection, zone: ZoneId, number: u32, capacity: u32) -> Table {
    let table = Table::builder(number, zone, capacity).build().unwrap();
    let id = Database::insert_table(conn, &table).unwrap();
    Database::get_table(conn, id).unwrap().unwrap()
}

/// A combinable table whose group seats at most `max_combined`.
pub fn seed_combinable(
    conn: &Connection,
    zone: ZoneId,
    number: u32,
    capacity: u32,
    max_combined: u32,
) -> Table {
    let table = Table::builder(number, zone, capacity)
        .combinable(true)
        .max_combined_capacity(max_combined)
        .build()
        .unwrap();
    let id = Database::insert_table(conn, &table).unwrap();
    Database::get_table(conn, id).unwrap().unwrap()
}

/// A confirmed party of two holding `tables` from `start` for `minutes`.
pub fn seed_reservation(
    conn: &Connection,
    tables: &[TableId],
    start: NaiveDateTime,
    minutes: u32,
) -> ReservationId {
    let mut reservation = Reservation::builder("Guest", 2, start.date(), start.time())
        .duration_minutes(minutes)
        .origin(Origin::Phone)
        .phone("+34600000000")
        .build()
        .unwrap();
    reservation.tables = tables.to_vec();
    Database::insert_reservation(conn, &reservation).unwrap()
}
