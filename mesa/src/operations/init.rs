//! Data directory initialization.
//!
//! Creates the data directory, the database with its schema, and optionally
//! a commented configuration file listing every setting with its default.

use std::fs;
use std::path::PathBuf;

use crate::database::DATABASE_FILE;
use crate::error::{Error, Result};
use crate::{Database, DatabaseConfig};

/// Name of the user configuration file inside the data directory.
pub const CONFIG_FILE: &str = "config.yaml";

/// Options for initializing a data directory.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Data directory to initialize.
    pub data_dir: PathBuf,
    /// Replace an existing database.
    pub overwrite: bool,
    /// Write a default configuration file.
    pub create_config: bool,
}

impl InitOptions {
    /// Creates options for `data_dir`.
    #[must_use]
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            overwrite: false,
            create_config: false,
        }
    }

    /// Sets whether an existing database is replaced.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Sets whether a default configuration file is written.
    #[must_use]
    pub fn with_create_config(mut self, create_config: bool) -> Self {
        self.create_config = create_config;
        self
    }
}

/// What [`init_data_dir`] did.
#[derive(Debug)]
pub struct InitResult {
    /// The data directory did not exist before.
    pub data_dir_created: bool,
    /// The database was created or recreated.
    pub database_created: bool,
    /// A configuration file was written.
    pub config_created: bool,
    /// The initialized directory.
    pub data_dir: PathBuf,
}

const DEFAULT_CONFIG_TEMPLATE: &str = r#"# mesa configuration
# Every setting is optional; the values shown are the defaults.

# Opening hours, as HH:MM-HH:MM or {start, end}
# service_windows:
#   - "13:00-16:00"
#   - "20:00-23:30"

# Minutes kept free between consecutive bookings on a table
# seating_buffer_minutes: 15

# Length of a booking when none is given
# default_duration_minutes: 90

# Largest party accepted
# max_party_size: 20

# Prefix added to phone numbers without one
# default_country_code: "+34"

# Separator used when merging customer notes
# merge_separator: " | "

# Web bookings allowed per phone or email
# rate_limit:
#   max_requests: 5
#   window_seconds: 3600

# Seconds to wait for another writer
# maximum_lock_wait_seconds: 5

# Default format for `mesa list`: table, json, csv or tsv
# output_format: table
"#;

/// Initializes a data directory.
///
/// # Errors
///
/// Returns [`Error::Validation`] for `database` if the database exists and
/// `overwrite` is not set, and I/O or database errors otherwise.
///
/// # Examples
///
/// ```no_run
/// use mesa::operations::init::{init_data_dir, InitOptions};
/// use std::path::PathBuf;
///
/// let options = InitOptions::new(PathBuf::from("/tmp/mesa")).with_create_config(true);
/// let result = init_data_dir(&options).unwrap();
/// assert!(result.database_created);
/// ```
pub fn init_data_dir(options: &InitOptions) -> Result<InitResult> {
    let mut result = InitResult {
        data_dir_created: false,
        database_created: false,
        config_created: false,
        data_dir: options.data_dir.clone(),
    };

    if !options.data_dir.exists() {
        fs::create_dir_all(&options.data_dir)?;
        result.data_dir_created = true;
    }

    let db_path = options.data_dir.join(DATABASE_FILE);
    if db_path.exists() {
        if !options.overwrite {
            return Err(Error::Validation {
                field: "database".into(),
                message: format!(
                    "Database already exists at {}. Use --overwrite to replace it.",
                    db_path.display()
                ),
            });
        }
        fs::remove_file(&db_path)?;
        log::info!("removed existing database {}", db_path.display());
    }

    Database::open(DatabaseConfig::new(&db_path))?;
    result.database_created = true;

    if options.create_config {
        let config_path = options.data_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;
            result.config_created = true;
        }
    }

    Ok(result)
}
