//! Shared database test utilities.

use std::path::{Path, PathBuf};

use mesa::database::{Database, DatabaseConfig};

/// Creates a temporary test database that will be cleaned up when dropped.
///
/// Returns the database and its path, so a test can open a second
/// connection to the same file.
#[allow(dead_code)]
pub fn create_test_database() -> (Database, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.db");
    let db = Database::open(DatabaseConfig::new(&path)).unwrap();

    // Prevent the TempDir from being dropped immediately
    std::mem::forget(dir);

    (db, path)
}

/// Opens another connection to an existing database file.
#[allow(dead_code)]
pub fn reopen(path: &Path) -> Database {
    Database::open(DatabaseConfig::new(path)).unwrap()
}
