//! Zone queries.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::ids::ZoneId;
use crate::zone::Zone;

use super::connection::Database;
use super::unique_violation;

const SELECT_ZONE_COLUMNS: &str = "SELECT id, code, name, capacity, active FROM zones";

fn row_to_zone(row: &Row<'_>) -> rusqlite::Result<Zone> {
    Ok(Zone {
        id: ZoneId(row.get(0)?),
        code: row.get(1)?,
        name: row.get(2)?,
        capacity: row.get(3)?,
        active: row.get(4)?,
    })
}

impl Database {
    /// Stores a new zone and returns its id.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the code is taken.
    pub fn insert_zone(conn: &Connection, zone: &Zone) -> Result<ZoneId> {
        conn.execute(
            "INSERT INTO zones (code, name, capacity, active) VALUES (?, ?, ?, ?)",
            params![zone.code, zone.name, zone.capacity, zone.active],
        )
        .map_err(|e| unique_violation(e, "code", &zone.code))?;
        Ok(ZoneId(conn.last_insert_rowid()))
    }

    /// Loads a zone by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_zone(conn: &Connection, id: ZoneId) -> Result<Option<Zone>> {
        Ok(conn
            .query_row(
                &format!("{SELECT_ZONE_COLUMNS} WHERE id = ?"),
                [id.value()],
                row_to_zone,
            )
            .optional()?)
    }

    /// Loads a zone by its code (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_zone_by_code(conn: &Connection, code: &str) -> Result<Option<Zone>> {
        Ok(conn
            .query_row(
                &format!("{SELECT_ZONE_COLUMNS} WHERE code = ?"),
                [code.trim().to_lowercase()],
                row_to_zone,
            )
            .optional()?)
    }

    /// All zones ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_zones(conn: &Connection) -> Result<Vec<Zone>> {
        let mut stmt = conn.prepare(&format!("{SELECT_ZONE_COLUMNS} ORDER BY code"))?;
        let zones = stmt
            .query_map([], row_to_zone)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(zones)
    }

    /// Activates or deactivates a zone. Returns whether the zone exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn set_zone_active(conn: &Connection, id: ZoneId, active: bool) -> Result<bool> {
        let rows = conn.execute(
            "UPDATE zones SET active = ? WHERE id = ?",
            params![active, id.value()],
        )?;
        Ok(rows > 0)
    }
}
