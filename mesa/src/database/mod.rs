//! Persistent storage for zones, tables, customers and reservations.
//!
//! Queries are associated functions taking a `&Connection`, so they run the
//! same way on a plain connection or inside a transaction started with
//! [`Database::begin_immediate`]. Updates are compare-and-swap on a `version`
//! column and fail with [`crate::Error::StaleState`] when another writer got
//! there first.
//!
//! # Examples
//!
//! ```no_run
//! use mesa::database::{Database, DatabaseConfig};
//! use mesa::Zone;
//!
//! let mut db = Database::open(DatabaseConfig::new("/tmp/mesa.db")).unwrap();
//! let tx = db.begin_immediate().unwrap();
//! let id = Database::insert_zone(&tx, &Zone::new("terrace", "Terraza", 24).unwrap()).unwrap();
//! tx.commit().unwrap();
//!
//! let zone = Database::get_zone(db.connection(), id).unwrap();
//! assert!(zone.is_some());
//! ```

mod config;
mod connection;
mod customers;
pub mod migrations;
mod reservations;
mod schema;
mod tables;
mod zones;

#[cfg(test)]
pub(crate) mod test_util;

pub use config::{
    default_data_dir, resolve_database_path, DatabaseConfig, DATABASE_FILE, DATA_DIR_ENV,
};
pub use connection::Database;

pub use migrations::{check_schema_compatibility, get_schema_version, initialize_schema};

use chrono::{DateTime, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension};

use crate::error::{Error, Result};

/// Local wall-clock time as stored seconds.
pub(crate) fn to_unix(time: NaiveDateTime) -> i64 {
    time.and_utc().timestamp()
}

/// Inverse of [`to_unix`].
pub(crate) fn from_unix(secs: i64) -> rusqlite::Result<NaiveDateTime> {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.naive_utc())
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(0, secs))
}

/// Converts a domain parse failure inside a row mapper.
pub(crate) fn conversion<E>(err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::ToSqlConversionFailure(Box::new(err))
}

/// Builds the error for a compare-and-swap that matched no row.
///
/// Reads the stored version to tell a missing row from a stale one.
pub(crate) fn cas_failure(
    conn: &Connection,
    entity: &'static str,
    table: &str,
    id: i64,
    expected: i64,
    missing: impl FnOnce() -> Error,
) -> Result<Error> {
    let found: Option<i64> = conn
        .query_row(
            &format!("SELECT version FROM {table} WHERE id = ?"),
            [id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(match found {
        Some(found) => {
            log::debug!("{entity} {id}: expected version {expected}, found {found}");
            Error::StaleState {
                entity,
                id,
                expected,
                found,
            }
        }
        None => missing(),
    })
}

/// Maps a uniqueness violation to a validation error on `field`.
pub(crate) fn unique_violation(err: rusqlite::Error, field: &str, value: &str) -> Error {
    match err {
        rusqlite::Error::SqliteFailure(ref failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Error::Validation {
                field: field.into(),
                message: format!("'{value}' already exists"),
            }
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_unix_round_trip_keeps_wall_clock() {
        let time = NaiveDate::from_ymd_opt(2026, 10, 20)
            .unwrap()
            .and_hms_opt(21, 45, 0)
            .unwrap();
        assert_eq!(from_unix(to_unix(time)).unwrap(), time);
    }
}
