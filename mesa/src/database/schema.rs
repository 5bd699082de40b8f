//! Database schema definitions and SQL constants.
//!
//! Timestamps are stored as Unix seconds of the restaurant's local wall
//! clock, so window arithmetic happens directly in SQL.

/// Current schema version for the database.
///
/// This version is stored in the metadata table and is used to ensure
/// compatibility between the database and the application.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Key-value pairs for versioning information.
pub const CREATE_METADATA_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS metadata (
        key TEXT PRIMARY KEY NOT NULL,
        value TEXT NOT NULL
    )";

pub const CREATE_ZONES_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS zones (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        code TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        capacity INTEGER NOT NULL,
        active INTEGER NOT NULL DEFAULT 1
    )";

/// Physical tables. `fusion_master` is set only for `fusion_slave` rows.
pub const CREATE_TABLES_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS dining_tables (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        number INTEGER NOT NULL UNIQUE,
        zone_id INTEGER NOT NULL REFERENCES zones(id),
        capacity INTEGER NOT NULL CHECK (capacity > 0),
        max_combined_capacity INTEGER NOT NULL,
        combinable INTEGER NOT NULL DEFAULT 0,
        active INTEGER NOT NULL DEFAULT 1,
        fusion_state TEXT NOT NULL DEFAULT 'individual',
        fusion_master INTEGER REFERENCES dining_tables(id),
        status TEXT NOT NULL DEFAULT 'free',
        version INTEGER NOT NULL DEFAULT 0,
        CHECK (max_combined_capacity >= capacity)
    )";

pub const CREATE_CUSTOMERS_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS customers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT,
        phone TEXT,
        vip INTEGER NOT NULL DEFAULT 0,
        company TEXT,
        notes TEXT,
        preferences TEXT,
        allergies TEXT,
        marketing_opt_in INTEGER NOT NULL DEFAULT 0,
        visit_count INTEGER NOT NULL DEFAULT 0,
        total_spend_cents INTEGER NOT NULL DEFAULT 0,
        superseded_by INTEGER REFERENCES customers(id),
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        version INTEGER NOT NULL DEFAULT 0
    )";

/// Reservations. `starts_at`/`ends_at` bound the seating window.
pub const CREATE_RESERVATIONS_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS reservations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        customer_id INTEGER REFERENCES customers(id),
        name TEXT NOT NULL,
        phone TEXT,
        email TEXT,
        party_size INTEGER NOT NULL CHECK (party_size > 0),
        children_count INTEGER NOT NULL DEFAULT 0,
        service_date TEXT NOT NULL,
        starts_at INTEGER NOT NULL,
        ends_at INTEGER NOT NULL,
        requested_zone INTEGER REFERENCES zones(id),
        status TEXT NOT NULL,
        origin TEXT NOT NULL,
        special_requests TEXT,
        internal_notes TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        version INTEGER NOT NULL DEFAULT 0,
        CHECK (children_count <= party_size),
        CHECK (ends_at > starts_at)
    )";

/// Assignment of tables to reservations.
pub const CREATE_RESERVATION_TABLES_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS reservation_tables (
        reservation_id INTEGER NOT NULL REFERENCES reservations(id),
        table_id INTEGER NOT NULL REFERENCES dining_tables(id),
        PRIMARY KEY (reservation_id, table_id)
    )";

/// Index creation statements, applied in order.
pub const CREATE_INDICES: [&str; 5] = [
    "CREATE INDEX IF NOT EXISTS idx_reservations_window ON reservations(starts_at, ends_at)",
    "CREATE INDEX IF NOT EXISTS idx_reservations_date ON reservations(service_date)",
    "CREATE INDEX IF NOT EXISTS idx_reservation_tables_table ON reservation_tables(table_id)",
    "CREATE INDEX IF NOT EXISTS idx_customers_email ON customers(email)",
    "CREATE INDEX IF NOT EXISTS idx_customers_phone ON customers(phone)",
];

/// SQL statement to select the schema version from the metadata table.
pub const SELECT_SCHEMA_VERSION: &str = "SELECT value FROM metadata WHERE key = 'schema_version'";

/// SQL statement to insert or update the schema version in the metadata table.
pub const INSERT_SCHEMA_VERSION: &str =
    "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?)";

/// Statuses that hold a table for their window.
pub const ACTIVE_STATUSES_SQL: &str = "('pending', 'confirmed', 'seated')";
