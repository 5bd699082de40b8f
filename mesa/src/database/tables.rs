//! Table queries.

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::error::{Error, Result};
use crate::ids::{TableId, ZoneId};
use crate::table::{FusionState, Table, TableState, TableStatus};

use super::connection::Database;
use super::{cas_failure, conversion, unique_violation};

const SELECT_TABLE_COLUMNS: &str = r"
    SELECT id, number, zone_id, capacity, max_combined_capacity, combinable, active,
           fusion_state, fusion_master, status, version
    FROM dining_tables";

fn row_to_table(row: &Row<'_>) -> rusqlite::Result<Table> {
    let fusion_state: String = row.get(7)?;
    let fusion_master: Option<i64> = row.get(8)?;
    let fusion = FusionState::from_columns(&fusion_state, fusion_master.map(TableId))
        .map_err(conversion)?;
    let status: String = row.get(9)?;
    let status = status.parse::<TableStatus>().map_err(conversion)?;

    Ok(Table {
        id: TableId(row.get(0)?),
        number: row.get(1)?,
        zone_id: ZoneId(row.get(2)?),
        capacity: row.get(3)?,
        max_combined_capacity: row.get(4)?,
        combinable: row.get(5)?,
        active: row.get(6)?,
        fusion,
        status,
        version: row.get(10)?,
    })
}

fn table_not_found(id: TableId) -> Error {
    Error::TableNotFound {
        table: id.to_string(),
    }
}

impl Database {
    /// Stores a new table and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZoneNotFound`] for an unknown zone and a validation
    /// error if the number is taken.
    pub fn insert_table(conn: &Connection, table: &Table) -> Result<TableId> {
        if Self::get_zone(conn, table.zone_id)?.is_none() {
            return Err(Error::ZoneNotFound {
                zone: table.zone_id.to_string(),
            });
        }
        conn.execute(
            r"INSERT INTO dining_tables
              (number, zone_id, capacity, max_combined_capacity, combinable, active,
               fusion_state, fusion_master, status, version)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0)",
            params![
                table.number,
                table.zone_id.value(),
                table.capacity,
                table.max_combined_capacity,
                table.combinable,
                table.active,
                table.fusion.as_str(),
                table.fusion.master().map(TableId::value),
                table.status.as_str(),
            ],
        )
        .map_err(|e| unique_violation(e, "number", &table.number.to_string()))?;
        Ok(TableId(conn.last_insert_rowid()))
    }

    /// Loads a table by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is malformed.
    pub fn get_table(conn: &Connection, id: TableId) -> Result<Option<Table>> {
        Ok(conn
            .query_row(
                &format!("{SELECT_TABLE_COLUMNS} WHERE id = ?"),
                [id.value()],
                row_to_table,
            )
            .optional()?)
    }

    /// Loads a table by its floor number.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is malformed.
    pub fn get_table_by_number(conn: &Connection, number: u32) -> Result<Option<Table>> {
        Ok(conn
            .query_row(
                &format!("{SELECT_TABLE_COLUMNS} WHERE number = ?"),
                [number],
                row_to_table,
            )
            .optional()?)
    }

    /// Loads every listed table, ordered by number.
    ///
    /// Duplicated ids are loaded once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TableNotFound`] naming the first missing id.
    pub fn get_tables(conn: &Connection, ids: &[TableId]) -> Result<Vec<Table>> {
        let tables = Self::find_tables(conn, ids)?;
        if let Some(&missing) = ids.iter().find(|&&id| tables.iter().all(|t| t.id != id)) {
            return Err(table_not_found(missing));
        }
        Ok(tables)
    }

    /// All tables ordered by number.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is malformed.
    pub fn list_tables(conn: &Connection) -> Result<Vec<Table>> {
        let mut stmt = conn.prepare(&format!("{SELECT_TABLE_COLUMNS} ORDER BY number"))?;
        let tables = stmt
            .query_map([], row_to_table)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tables)
    }

    /// A fusion group: the master followed by its slaves, ordered by number.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is malformed.
    pub fn fusion_group(conn: &Connection, master: TableId) -> Result<Vec<Table>> {
        let mut stmt = conn.prepare(&format!(
            "{SELECT_TABLE_COLUMNS} WHERE id = ? OR fusion_master = ? ORDER BY number"
        ))?;
        let tables = stmt
            .query_map(params![master.value(), master.value()], row_to_table)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tables)
    }

    /// Tables of the given ids in one statement; missing ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is malformed.
    pub fn find_tables(conn: &Connection, ids: &[TableId]) -> Result<Vec<Table>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
            "{SELECT_TABLE_COLUMNS} WHERE id IN ({placeholders}) ORDER BY number"
        ))?;
        let tables = stmt
            .query_map(params_from_iter(ids.iter().map(|id| id.value())), row_to_table)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tables)
    }

    /// Writes a new state if the stored version still equals
    /// `expected_version`. Returns the new version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleState`] on a version mismatch and
    /// [`Error::TableNotFound`] for an unknown table.
    pub fn update_table_state(
        conn: &Connection,
        id: TableId,
        state: TableState,
        expected_version: i64,
    ) -> Result<i64> {
        let rows = conn.execute(
            r"UPDATE dining_tables
              SET status = ?, fusion_state = ?, fusion_master = ?, version = version + 1
              WHERE id = ? AND version = ?",
            params![
                state.status.as_str(),
                state.fusion.as_str(),
                state.fusion.master().map(TableId::value),
                id.value(),
                expected_version,
            ],
        )?;
        if rows == 0 {
            return Err(cas_failure(
                conn,
                "table",
                "dining_tables",
                id.value(),
                expected_version,
                || table_not_found(id),
            )?);
        }
        Ok(expected_version + 1)
    }

    /// Activates or deactivates a table under version compare-and-swap.
    ///
    /// # Errors
    ///
    /// Same as [`Database::update_table_state`].
    pub fn set_table_active(
        conn: &Connection,
        id: TableId,
        active: bool,
        expected_version: i64,
    ) -> Result<i64> {
        let rows = conn.execute(
            "UPDATE dining_tables SET active = ?, version = version + 1 WHERE id = ? AND version = ?",
            params![active, id.value(), expected_version],
        )?;
        if rows == 0 {
            return Err(cas_failure(
                conn,
                "table",
                "dining_tables",
                id.value(),
                expected_version,
                || table_not_found(id),
            )?);
        }
        Ok(expected_version + 1)
    }
}
