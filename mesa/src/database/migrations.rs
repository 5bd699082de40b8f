//! Database schema management and migrations.

use rusqlite::Connection;

use crate::error::{Error, Result};

use super::schema::{
    CREATE_CUSTOMERS_TABLE, CREATE_INDICES, CREATE_METADATA_TABLE,
    CREATE_RESERVATIONS_TABLE, CREATE_RESERVATION_TABLES_TABLE, CREATE_TABLES_TABLE,
    CREATE_ZONES_TABLE, CURRENT_SCHEMA_VERSION, INSERT_SCHEMA_VERSION, SELECT_SCHEMA_VERSION,
};

/// Creates all tables, indices and metadata for a fresh database.
///
/// # Errors
///
/// Returns an error if any SQL statement fails to execute.
///
/// # Examples
///
/// ```
/// use rusqlite::Connection;
/// use mesa::database::migrations::{get_schema_version, initialize_schema};
///
/// let conn = Connection::open_in_memory().unwrap();
/// initialize_schema(&conn).unwrap();
/// assert_eq!(get_schema_version(&conn).unwrap(), 1);
/// ```
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute(CREATE_METADATA_TABLE, [])?;
    conn.execute(CREATE_ZONES_TABLE, [])?;
    conn.execute(CREATE_TABLES_TABLE, [])?;
    conn.execute(CREATE_CUSTOMERS_TABLE, [])?;
    conn.execute(CREATE_RESERVATIONS_TABLE, [])?;
    conn.execute(CREATE_RESERVATION_TABLES_TABLE, [])?;

    for index in CREATE_INDICES {
        conn.execute(index, [])?;
    }

    conn.execute(INSERT_SCHEMA_VERSION, [CURRENT_SCHEMA_VERSION])?;

    Ok(())
}

/// Gets the current schema version from the database.
///
/// # Errors
///
/// Returns an error if the query fails for reasons other than a missing
/// metadata table or row, which both mean version 0.
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    match conn.query_row(SELECT_SCHEMA_VERSION, [], |row| {
        let value: String = row.get(0)?;
        value
            .parse::<i32>()
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
    }) {
        Ok(version) => Ok(version),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(rusqlite::Error::SqliteFailure(ref err, Some(ref message)))
            if err.code == rusqlite::ErrorCode::Unknown && message.contains("no such table") =>
        {
            Ok(0)
        }
        Err(e) => Err(e.into()),
    }
}

/// Checks schema compatibility and initializes a fresh database.
///
/// # Errors
///
/// Returns [`Error::UnsupportedSchemaVersion`] when the stored version is
/// older or newer than [`CURRENT_SCHEMA_VERSION`].
pub fn check_schema_compatibility(conn: &Connection) -> Result<()> {
    let version = get_schema_version(conn)?;

    if version == 0 {
        log::info!("initializing database schema version {CURRENT_SCHEMA_VERSION}");
        initialize_schema(conn)?;
    } else if version != CURRENT_SCHEMA_VERSION {
        if version > CURRENT_SCHEMA_VERSION {
            log::error!("database schema {version} is newer than client; upgrade mesa");
        }
        return Err(Error::UnsupportedSchemaVersion {
            expected: CURRENT_SCHEMA_VERSION,
            found: version,
        });
    }

    Ok(())
}
