//! Utility functions for CLI operations.
//!
//! This module provides common utility functions used across CLI commands,
//! including data directory resolution, configuration loading, opening the
//! coordinator, argument parsing and output helpers.

use std::collections::HashMap;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveTime};
use mesa::audit::JsonLinesAuditSink;
use mesa::clock::SystemClock;
use mesa::database::{default_data_dir, DATABASE_FILE};
use mesa::{
    Actor, Config, ConfigBuilder, Coordinator, Database, DatabaseConfig, ReservationId, Table,
    TableId, ZoneId,
};

use crate::error::CliError;

/// File the table state log is appended to, next to the database.
pub const AUDIT_FILE: &str = "audit.jsonl";

/// The coordinator every command runs against.
pub type CliCoordinator = Coordinator<SystemClock, JsonLinesAuditSink>;

/// Global CLI options shared across all commands.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    /// Enable verbose output.
    pub verbose: bool,

    /// Suppress non-essential output.
    pub quiet: bool,

    /// Override the data directory location.
    pub data_dir: Option<PathBuf>,

    /// Override the busy timeout (in seconds).
    pub busy_timeout: Option<u32>,

    /// Who is running the command.
    pub actor: Actor,
}

/// Resolve the data directory: `--data-dir` / `MESA_DATA_DIR`, then `~/.mesa`.
pub fn resolve_data_dir(global: &GlobalOptions) -> Result<PathBuf, CliError> {
    match &global.data_dir {
        Some(dir) => Ok(dir.clone()),
        None => default_data_dir().map_err(|e| CliError::Config(e.to_string())),
    }
}

/// Load hierarchical configuration.
///
/// Configuration is merged from multiple sources with precedence:
/// 1. Environment variables (highest priority)
/// 2. `mesa.local.yaml`, then `mesa.yaml` found from the working directory
/// 3. `config.yaml` in the data directory
/// 4. Built-in defaults (lowest priority)
pub fn load_configuration(global: &GlobalOptions) -> Result<Config, CliError> {
    let data_dir = resolve_data_dir(global)?;
    ConfigBuilder::new()
        .with_data_dir(&data_dir)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))
}

/// Open the database.
///
/// # Errors
///
/// Returns `NoDataDirectory` if the database has not been initialized.
pub fn open_database(global: &GlobalOptions, config: &Config) -> Result<Database, CliError> {
    let db_path = resolve_data_dir(global)?.join(DATABASE_FILE);
    if !db_path.exists() {
        return Err(CliError::NoDataDirectory);
    }

    let mut db_config = DatabaseConfig::new(db_path);
    if let Some(timeout_seconds) = global.busy_timeout {
        db_config = db_config.with_busy_timeout(Duration::from_secs(timeout_seconds.into()));
    } else if let Some(timeout_seconds) = config.maximum_lock_wait_seconds {
        db_config = db_config.with_busy_timeout(Duration::from_secs(timeout_seconds));
    }

    Database::open(db_config).map_err(CliError::from)
}

/// Load configuration and open a coordinator with the wall clock and the
/// JSON-lines audit log of the data directory.
pub fn open_coordinator(global: &GlobalOptions) -> Result<(CliCoordinator, Config), CliError> {
    let config = load_configuration(global)?;
    let db = open_database(global, &config)?;
    let audit = JsonLinesAuditSink::new(resolve_data_dir(global)?.join(AUDIT_FILE));
    Ok((Coordinator::new(db, &config, SystemClock, audit), config))
}

/// Looks tables up by floor number.
pub fn tables_by_number(mesa: &CliCoordinator, numbers: &[u32]) -> Result<Vec<Table>, CliError> {
    numbers
        .iter()
        .map(|&number| mesa.table_by_number(number).map_err(CliError::from))
        .collect()
}

/// Ids of the tables with these floor numbers.
pub fn table_ids(mesa: &CliCoordinator, numbers: &[u32]) -> Result<Vec<TableId>, CliError> {
    Ok(tables_by_number(mesa, numbers)?
        .into_iter()
        .map(|t| t.id)
        .collect())
}

/// Zone codes by id, for display.
pub fn zone_codes(mesa: &CliCoordinator) -> Result<HashMap<ZoneId, String>, CliError> {
    Ok(mesa
        .list_zones()?
        .into_iter()
        .map(|zone| (zone.id, zone.code))
        .collect())
}

/// Looks a zone up by code.
pub fn zone_id_by_code(mesa: &CliCoordinator, code: &str) -> Result<ZoneId, CliError> {
    let wanted = code.trim().to_lowercase();
    mesa.list_zones()?
        .into_iter()
        .find(|zone| zone.code == wanted)
        .map(|zone| zone.id)
        .ok_or_else(|| {
            CliError::from(mesa::Error::ZoneNotFound {
                zone: code.to_string(),
            })
        })
}

/// Parses any value with a `FromStr` implementation, for clap.
pub fn parse_with<T>(s: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    s.parse().map_err(|e: T::Err| e.to_string())
}

/// Parses `YYYY-MM-DD`, `today` or `tomorrow`.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    let today = Local::now().date_naive();
    match s.trim().to_lowercase().as_str() {
        "today" => Ok(today),
        "tomorrow" => today
            .succ_opt()
            .ok_or_else(|| "date out of range".to_string()),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
            .map_err(|_| format!("expected YYYY-MM-DD, today or tomorrow, got '{s}'")),
    }
}

/// Parses `HH:MM`.
pub fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|_| format!("expected HH:MM, got '{s}'"))
}

/// Parses a reservation id, with or without a leading `#`.
pub fn parse_reservation_id(s: &str) -> Result<ReservationId, String> {
    s.trim()
        .trim_start_matches('#')
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .map(ReservationId)
        .ok_or_else(|| format!("invalid reservation id '{s}'"))
}

/// Prints actions and warnings to stderr unless quiet.
pub fn report(global: &GlobalOptions, dry_run: bool, actions: &[String], warnings: &[String]) {
    if global.quiet {
        return;
    }
    if dry_run {
        eprintln!("Dry run - would perform the following actions:");
        for (i, action) in actions.iter().enumerate() {
            eprintln!("  {}. {action}", i + 1);
        }
    } else if global.verbose {
        for action in actions {
            eprintln!("  - {action}");
        }
    }
    for warning in warnings {
        eprintln!("Warning: {warning}");
    }
}

/// Joins table numbers for display, e.g. `4+5`.
pub fn format_numbers(numbers: &[u32]) -> String {
    if numbers.is_empty() {
        return "-".to_string();
    }
    numbers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("+")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_and_time() {
        assert_eq!(
            parse_date("2026-10-20").unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 20).unwrap()
        );
        assert_eq!(parse_date("today").unwrap(), Local::now().date_naive());
        assert!(parse_date("20/10/2026").is_err());

        assert_eq!(parse_time("14:30").unwrap(), NaiveTime::from_hms_opt(14, 30, 0).unwrap());
        assert!(parse_time("2pm").is_err());
    }

    #[test]
    fn test_parse_reservation_id() {
        assert_eq!(parse_reservation_id("#12").unwrap(), ReservationId(12));
        assert_eq!(parse_reservation_id("7").unwrap(), ReservationId(7));
        assert!(parse_reservation_id("0").is_err());
        assert!(parse_reservation_id("abc").is_err());
    }

    #[test]
    fn test_parse_with_library_types() {
        assert_eq!(parse_with::<mesa::Origin>("walk-in").unwrap(), mesa::Origin::WalkIn);
        assert!(parse_with::<mesa::Origin>("fax").unwrap_err().contains("fax"));
    }

    #[test]
    fn test_format_numbers() {
        assert_eq!(format_numbers(&[4, 5]), "4+5");
        assert_eq!(format_numbers(&[]), "-");
    }
}
