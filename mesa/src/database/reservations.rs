//! Reservation queries, including the overlap checks the assignment rules
//! depend on.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Error, Result};
use crate::ids::{CustomerId, ReservationId, TableId, ZoneId};
use crate::reservation::{Origin, Reservation, ReservationStatus, TimeWindow};

use super::connection::Database;
use super::schema::ACTIVE_STATUSES_SQL;
use super::{cas_failure, conversion, from_unix, to_unix};

const SELECT_RESERVATION_COLUMNS: &str = r"
    SELECT id, customer_id, name, phone, email, party_size, children_count,
           starts_at, ends_at, requested_zone, status, origin, special_requests,
           internal_notes, created_at, updated_at, version
    FROM reservations";

fn row_to_reservation(row: &Row<'_>) -> rusqlite::Result<Reservation> {
    let window = TimeWindow::new(from_unix(row.get(7)?)?, from_unix(row.get(8)?)?)
        .map_err(conversion)?;
    let status: String = row.get(10)?;
    let origin: String = row.get(11)?;

    Ok(Reservation {
        id: ReservationId(row.get(0)?),
        customer: row.get::<_, Option<i64>>(1)?.map(CustomerId),
        name: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
        party_size: row.get(5)?,
        children_count: row.get(6)?,
        window,
        requested_zone: row.get::<_, Option<i64>>(9)?.map(ZoneId),
        tables: Vec::new(),
        status: status.parse::<ReservationStatus>().map_err(conversion)?,
        origin: origin.parse::<Origin>().map_err(conversion)?,
        special_requests: row.get(12)?,
        internal_notes: row.get(13)?,
        created_at: from_unix(row.get(14)?)?,
        updated_at: from_unix(row.get(15)?)?,
        version: row.get(16)?,
    })
}

fn reservation_not_found(id: ReservationId) -> Error {
    Error::ReservationNotFound { id }
}

fn buffer_secs(buffer_minutes: u32) -> i64 {
    Duration::minutes(i64::from(buffer_minutes)).num_seconds()
}

impl Database {
    /// Stores a new reservation together with its table links.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn insert_reservation(conn: &Connection, reservation: &Reservation) -> Result<ReservationId> {
        let window = reservation.window();
        conn.execute(
            r"INSERT INTO reservations
              (customer_id, name, phone, email, party_size, children_count, service_date,
               starts_at, ends_at, requested_zone, status, origin, special_requests,
               internal_notes, created_at, updated_at, version)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)",
            params![
                reservation.customer().map(CustomerId::value),
                reservation.name(),
                reservation.phone(),
                reservation.email(),
                reservation.party_size(),
                reservation.children_count(),
                reservation.date().to_string(),
                to_unix(window.start()),
                to_unix(window.end()),
                reservation.requested_zone().map(ZoneId::value),
                reservation.status().as_str(),
                reservation.origin().as_str(),
                reservation.special_requests(),
                reservation.internal_notes(),
                to_unix(reservation.created_at()),
                to_unix(reservation.updated_at()),
            ],
        )?;
        let id = ReservationId(conn.last_insert_rowid());
        Self::link_tables(conn, id, reservation.tables())?;
        Ok(id)
    }

    fn link_tables(conn: &Connection, id: ReservationId, tables: &[TableId]) -> Result<()> {
        conn.execute(
            "DELETE FROM reservation_tables WHERE reservation_id = ?",
            [id.value()],
        )?;
        let mut stmt =
            conn.prepare("INSERT INTO reservation_tables (reservation_id, table_id) VALUES (?, ?)")?;
        for table in tables {
            stmt.execute(params![id.value(), table.value()])?;
        }
        Ok(())
    }

    /// Table ids linked to a reservation, ordered by table number.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn reservation_tables(conn: &Connection, id: ReservationId) -> Result<Vec<TableId>> {
        let mut stmt = conn.prepare(
            r"SELECT rt.table_id FROM reservation_tables rt
              JOIN dining_tables t ON t.id = rt.table_id
              WHERE rt.reservation_id = ?
              ORDER BY t.number",
        )?;
        let tables = stmt
            .query_map([id.value()], |row| Ok(TableId(row.get(0)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tables)
    }

    /// Loads a reservation with its assigned tables.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is malformed.
    pub fn get_reservation(conn: &Connection, id: ReservationId) -> Result<Option<Reservation>> {
        let found = conn
            .query_row(
                &format!("{SELECT_RESERVATION_COLUMNS} WHERE id = ?"),
                [id.value()],
                row_to_reservation,
            )
            .optional()?;
        match found {
            Some(mut reservation) => {
                reservation.tables = Self::reservation_tables(conn, id)?;
                Ok(Some(reservation))
            }
            None => Ok(None),
        }
    }

    /// Like [`Database::get_reservation`] but missing rows are an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReservationNotFound`] when the id is unknown.
    pub fn require_reservation(conn: &Connection, id: ReservationId) -> Result<Reservation> {
        Self::get_reservation(conn, id)?.ok_or_else(|| reservation_not_found(id))
    }

    /// Reservations ordered by start time, optionally limited to one
    /// service date.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is malformed.
    pub fn list_reservations(conn: &Connection, date: Option<NaiveDate>) -> Result<Vec<Reservation>> {
        let mut reservations = match date {
            Some(date) => {
                let mut stmt = conn.prepare(&format!(
                    "{SELECT_RESERVATION_COLUMNS} WHERE service_date = ? ORDER BY starts_at, id"
                ))?;
                let rows = stmt
                    .query_map([date.to_string()], row_to_reservation)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
            None => {
                let mut stmt =
                    conn.prepare(&format!("{SELECT_RESERVATION_COLUMNS} ORDER BY starts_at, id"))?;
                let rows = stmt
                    .query_map([], row_to_reservation)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };
        for reservation in &mut reservations {
            reservation.tables = Self::reservation_tables(conn, reservation.id)?;
        }
        Ok(reservations)
    }

    /// Moves a reservation to `status` under version compare-and-swap.
    /// Returns the new version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleState`] on a version mismatch.
    pub fn update_reservation_status(
        conn: &Connection,
        id: ReservationId,
        status: ReservationStatus,
        expected_version: i64,
        now: NaiveDateTime,
    ) -> Result<i64> {
        let rows = conn.execute(
            r"UPDATE reservations SET status = ?, updated_at = ?, version = version + 1
              WHERE id = ? AND version = ?",
            params![status.as_str(), to_unix(now), id.value(), expected_version],
        )?;
        Self::check_reservation_cas(conn, rows, id, expected_version)
    }

    /// Replaces the reservation's table links under version compare-and-swap.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleState`] on a version mismatch.
    pub fn set_reservation_tables(
        conn: &Connection,
        id: ReservationId,
        tables: &[TableId],
        expected_version: i64,
        now: NaiveDateTime,
    ) -> Result<i64> {
        let rows = conn.execute(
            r"UPDATE reservations SET updated_at = ?, version = version + 1
              WHERE id = ? AND version = ?",
            params![to_unix(now), id.value(), expected_version],
        )?;
        let version = Self::check_reservation_cas(conn, rows, id, expected_version)?;
        Self::link_tables(conn, id, tables)?;
        Ok(version)
    }

    /// Links the reservation to a customer record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleState`] on a version mismatch.
    pub fn set_reservation_customer(
        conn: &Connection,
        id: ReservationId,
        customer: CustomerId,
        expected_version: i64,
        now: NaiveDateTime,
    ) -> Result<i64> {
        let rows = conn.execute(
            r"UPDATE reservations SET customer_id = ?, updated_at = ?, version = version + 1
              WHERE id = ? AND version = ?",
            params![customer.value(), to_unix(now), id.value(), expected_version],
        )?;
        Self::check_reservation_cas(conn, rows, id, expected_version)
    }

    fn check_reservation_cas(
        conn: &Connection,
        rows: usize,
        id: ReservationId,
        expected_version: i64,
    ) -> Result<i64> {
        if rows == 0 {
            return Err(cas_failure(
                conn,
                "reservation",
                "reservations",
                id.value(),
                expected_version,
                || reservation_not_found(id),
            )?);
        }
        Ok(expected_version + 1)
    }

    /// Active reservations on `table` whose window comes closer than
    /// `buffer_minutes` to `window`.
    ///
    /// `exclude` skips the reservation being (re)assigned.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn active_reservations_overlapping(
        conn: &Connection,
        table: TableId,
        window: &TimeWindow,
        buffer_minutes: u32,
        exclude: Option<ReservationId>,
    ) -> Result<Vec<ReservationId>> {
        let buffer = buffer_secs(buffer_minutes);
        let mut stmt = conn.prepare(&format!(
            r"SELECT r.id FROM reservations r
              JOIN reservation_tables rt ON rt.reservation_id = r.id
              WHERE rt.table_id = ?1
                AND r.status IN {ACTIVE_STATUSES_SQL}
                AND r.starts_at < ?2 + ?4
                AND ?3 < r.ends_at + ?4
                AND r.id IS NOT ?5
              ORDER BY r.starts_at, r.id"
        ))?;
        let ids = stmt
            .query_map(
                params![
                    table.value(),
                    to_unix(window.end()),
                    to_unix(window.start()),
                    buffer,
                    exclude.map(ReservationId::value),
                ],
                |row| Ok(ReservationId(row.get(0)?)),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    /// Every table held by an active reservation near `window`, mapped to
    /// the earliest such reservation.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn busy_tables(
        conn: &Connection,
        window: &TimeWindow,
        buffer_minutes: u32,
        exclude: Option<ReservationId>,
    ) -> Result<BTreeMap<TableId, ReservationId>> {
        let buffer = buffer_secs(buffer_minutes);
        let mut stmt = conn.prepare(&format!(
            r"SELECT rt.table_id, r.id FROM reservations r
              JOIN reservation_tables rt ON rt.reservation_id = r.id
              WHERE r.status IN {ACTIVE_STATUSES_SQL}
                AND r.starts_at < ?1 + ?3
                AND ?2 < r.ends_at + ?3
                AND r.id IS NOT ?4
              ORDER BY r.starts_at DESC, r.id DESC"
        ))?;
        let rows = stmt.query_map(
            params![
                to_unix(window.end()),
                to_unix(window.start()),
                buffer,
                exclude.map(ReservationId::value),
            ],
            |row| Ok((TableId(row.get(0)?), ReservationId(row.get(1)?))),
        )?;
        let mut busy = BTreeMap::new();
        for row in rows {
            let (table, reservation) = row?;
            // later rows are earlier reservations
            busy.insert(table, reservation);
        }
        Ok(busy)
    }

    /// Pending or confirmed reservations other than `exclude` that list
    /// `table`, regardless of time.
    ///
    /// Used to decide whether a released table stays reserved.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn reservations_holding(
        conn: &Connection,
        table: TableId,
        exclude: Option<ReservationId>,
    ) -> Result<Vec<ReservationId>> {
        let mut stmt = conn.prepare(
            r"SELECT r.id FROM reservations r
              JOIN reservation_tables rt ON rt.reservation_id = r.id
              WHERE rt.table_id = ?1
                AND r.status IN ('pending', 'confirmed')
                AND r.id IS NOT ?2
              ORDER BY r.starts_at, r.id",
        )?;
        let ids = stmt
            .query_map(
                params![table.value(), exclude.map(ReservationId::value)],
                |row| Ok(ReservationId(row.get(0)?)),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    /// Active reservations other than `exclude` that hold `table` as part
    /// of a group of two or more tables.
    ///
    /// A fusion lives as long as one of these exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn group_holders(
        conn: &Connection,
        table: TableId,
        exclude: Option<ReservationId>,
    ) -> Result<Vec<ReservationId>> {
        let mut stmt = conn.prepare(&format!(
            r"SELECT r.id FROM reservations r
              JOIN reservation_tables rt ON rt.reservation_id = r.id
              WHERE rt.table_id = ?1
                AND r.status IN {ACTIVE_STATUSES_SQL}
                AND r.id IS NOT ?2
                AND (SELECT COUNT(*) FROM reservation_tables g
                     WHERE g.reservation_id = r.id) > 1
              ORDER BY r.starts_at, r.id"
        ))?;
        let ids = stmt
            .query_map(
                params![table.value(), exclude.map(ReservationId::value)],
                |row| Ok(ReservationId(row.get(0)?)),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    /// Every table held by an active group reservation, mapped to those
    /// reservations.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn held_groups(conn: &Connection) -> Result<BTreeMap<TableId, Vec<ReservationId>>> {
        let mut stmt = conn.prepare(&format!(
            r"SELECT rt.table_id, r.id FROM reservations r
              JOIN reservation_tables rt ON rt.reservation_id = r.id
              WHERE r.status IN {ACTIVE_STATUSES_SQL}
                AND (SELECT COUNT(*) FROM reservation_tables g
                     WHERE g.reservation_id = r.id) > 1
              ORDER BY r.starts_at, r.id"
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok((TableId(row.get(0)?), ReservationId(row.get(1)?)))
        })?;
        let mut held: BTreeMap<TableId, Vec<ReservationId>> = BTreeMap::new();
        for row in rows {
            let (table, reservation) = row?;
            held.entry(table).or_default().push(reservation);
        }
        Ok(held)
    }
}
