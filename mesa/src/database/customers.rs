//! Customer queries.
//!
//! Lookups by contact data expect already-normalized values and never
//! return superseded records.

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::customer::Customer;
use crate::error::{Error, Result};
use crate::ids::CustomerId;

use super::connection::Database;
use super::{cas_failure, from_unix, to_unix};

const SELECT_CUSTOMER_COLUMNS: &str = r"
    SELECT id, name, email, phone, vip, company, notes, preferences, allergies,
           marketing_opt_in, visit_count, total_spend_cents, superseded_by,
           created_at, updated_at, version
    FROM customers";

fn row_to_customer(row: &Row<'_>) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: CustomerId(row.get(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        vip: row.get(4)?,
        company: row.get(5)?,
        notes: row.get(6)?,
        preferences: row.get(7)?,
        allergies: row.get(8)?,
        marketing_opt_in: row.get(9)?,
        visit_count: row.get(10)?,
        total_spend_cents: row.get(11)?,
        superseded_by: row.get::<_, Option<i64>>(12)?.map(CustomerId),
        created_at: from_unix(row.get(13)?)?,
        updated_at: from_unix(row.get(14)?)?,
        version: row.get(15)?,
    })
}

fn customer_not_found(id: CustomerId) -> Error {
    Error::CustomerNotFound { id }
}

impl Database {
    /// Stores a new customer and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn insert_customer(conn: &Connection, customer: &Customer) -> Result<CustomerId> {
        conn.execute(
            r"INSERT INTO customers
              (name, email, phone, vip, company, notes, preferences, allergies,
               marketing_opt_in, visit_count, total_spend_cents, superseded_by,
               created_at, updated_at, version)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)",
            params![
                customer.name,
                customer.email,
                customer.phone,
                customer.vip,
                customer.company,
                customer.notes,
                customer.preferences,
                customer.allergies,
                customer.marketing_opt_in,
                customer.visit_count,
                customer.total_spend_cents,
                customer.superseded_by.map(CustomerId::value),
                to_unix(customer.created_at),
                to_unix(customer.updated_at),
            ],
        )?;
        Ok(CustomerId(conn.last_insert_rowid()))
    }

    /// Loads a customer by id, superseded or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_customer(conn: &Connection, id: CustomerId) -> Result<Option<Customer>> {
        Ok(conn
            .query_row(
                &format!("{SELECT_CUSTOMER_COLUMNS} WHERE id = ?"),
                [id.value()],
                row_to_customer,
            )
            .optional()?)
    }

    /// Like [`Database::get_customer`] but missing rows are an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CustomerNotFound`] when the id is unknown.
    pub fn require_customer(conn: &Connection, id: CustomerId) -> Result<Customer> {
        Self::get_customer(conn, id)?.ok_or_else(|| customer_not_found(id))
    }

    /// Live customers with exactly this normalized email, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_customers_by_email(conn: &Connection, email: &str) -> Result<Vec<Customer>> {
        Self::find_customers_by(conn, "email", email)
    }

    /// Live customers with exactly this normalized phone, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_customers_by_phone(conn: &Connection, phone: &str) -> Result<Vec<Customer>> {
        Self::find_customers_by(conn, "phone", phone)
    }

    fn find_customers_by(conn: &Connection, column: &str, value: &str) -> Result<Vec<Customer>> {
        let mut stmt = conn.prepare(&format!(
            "{SELECT_CUSTOMER_COLUMNS} WHERE {column} = ? AND superseded_by IS NULL ORDER BY id"
        ))?;
        let customers = stmt
            .query_map([value], row_to_customer)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(customers)
    }

    /// All live customers ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_customers(conn: &Connection) -> Result<Vec<Customer>> {
        let mut stmt = conn.prepare(&format!(
            "{SELECT_CUSTOMER_COLUMNS} WHERE superseded_by IS NULL ORDER BY id"
        ))?;
        let customers = stmt
            .query_map([], row_to_customer)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(customers)
    }

    /// Writes every mutable field if the stored version still equals
    /// `customer.version`. Returns the new version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleState`] on a version mismatch.
    pub fn update_customer(conn: &Connection, customer: &Customer, now: NaiveDateTime) -> Result<i64> {
        let rows = conn.execute(
            r"UPDATE customers SET
                name = ?, email = ?, phone = ?, vip = ?, company = ?, notes = ?,
                preferences = ?, allergies = ?, marketing_opt_in = ?, visit_count = ?,
                total_spend_cents = ?, updated_at = ?, version = version + 1
              WHERE id = ? AND version = ?",
            params![
                customer.name,
                customer.email,
                customer.phone,
                customer.vip,
                customer.company,
                customer.notes,
                customer.preferences,
                customer.allergies,
                customer.marketing_opt_in,
                customer.visit_count,
                customer.total_spend_cents,
                to_unix(now),
                customer.id.value(),
                customer.version,
            ],
        )?;
        Self::check_customer_cas(conn, rows, customer.id, customer.version)
    }

    /// Marks `id` as merged into `by`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleState`] on a version mismatch.
    pub fn supersede_customer(
        conn: &Connection,
        id: CustomerId,
        by: CustomerId,
        expected_version: i64,
        now: NaiveDateTime,
    ) -> Result<i64> {
        let rows = conn.execute(
            r"UPDATE customers SET superseded_by = ?, updated_at = ?, version = version + 1
              WHERE id = ? AND version = ? AND superseded_by IS NULL",
            params![by.value(), to_unix(now), id.value(), expected_version],
        )?;
        Self::check_customer_cas(conn, rows, id, expected_version)
    }

    fn check_customer_cas(
        conn: &Connection,
        rows: usize,
        id: CustomerId,
        expected_version: i64,
    ) -> Result<i64> {
        if rows == 0 {
            return Err(cas_failure(
                conn,
                "customer",
                "customers",
                id.value(),
                expected_version,
                || customer_not_found(id),
            )?);
        }
        Ok(expected_version + 1)
    }
}
