//! List command implementation.
//!
//! This module implements the `list` command, which displays reservations
//! in various formats (table, JSON, CSV, TSV).

use crate::error::CliError;
use crate::utils::{format_numbers, open_coordinator, parse_date, parse_with, GlobalOptions};
use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use mesa::config::OutputFormat as ConfiguredFormat;
use mesa::{Reservation, ReservationStatus, TableId};
use std::collections::HashMap;
use std::io::Write;

/// Column headers for CSV/TSV output.
const COLUMN_HEADERS: [&str; 10] = [
    "id", "date", "time", "minutes", "party", "name", "status", "origin", "tables", "customer",
];

/// List reservations.
#[derive(Args)]
pub struct ListCommand {
    /// Output format; defaults to `output_format` from the configuration
    #[arg(long, value_enum, env = "MESA_OUTPUT_FORMAT", ignore_case = true)]
    pub format: Option<OutputFormat>,

    /// Only reservations on this date (YYYY-MM-DD, today or tomorrow)
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Only reservations in this status
    #[arg(long, value_parser = parse_status)]
    pub status: Option<ReservationStatus>,

    /// Include cancelled, completed and no-show reservations
    #[arg(long)]
    pub all: bool,
}

/// Output format for list command.
#[derive(Clone, Copy, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Tab-separated table format (human-readable)
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
    /// TSV format (tab-separated values)
    Tsv,
}

impl From<ConfiguredFormat> for OutputFormat {
    fn from(format: ConfiguredFormat) -> Self {
        match format {
            ConfiguredFormat::Table => OutputFormat::Table,
            ConfiguredFormat::Json => OutputFormat::Json,
            ConfiguredFormat::Csv => OutputFormat::Csv,
            ConfiguredFormat::Tsv => OutputFormat::Tsv,
        }
    }
}

fn parse_status(s: &str) -> Result<ReservationStatus, String> {
    parse_with(&s.trim().to_lowercase().replace('-', "_"))
}

impl ListCommand {
    /// Execute the list command.
    pub fn execute(self, global: &GlobalOptions) -> Result<(), CliError> {
        let (mesa, config) = open_coordinator(global)?;

        let mut reservations = mesa.reservations(self.date)?;
        if let Some(status) = self.status {
            reservations.retain(|r| r.status() == status);
        } else if !self.all {
            reservations.retain(|r| !r.status().is_terminal());
        }

        let numbers: HashMap<TableId, u32> = mesa
            .list_tables()?
            .into_iter()
            .map(|t| (t.id, t.number))
            .collect();
        let rows: Vec<Row> = reservations.iter().map(|r| Row::new(r, &numbers)).collect();

        let format = self
            .format
            .or_else(|| config.output_format.map(OutputFormat::from))
            .unwrap_or(OutputFormat::Table);
        match format {
            OutputFormat::Table => format_as_table(&rows)?,
            OutputFormat::Json => format_as_json(&reservations)?,
            OutputFormat::Csv => format_as_delimited(&rows, b',')?,
            OutputFormat::Tsv => format_as_delimited(&rows, b'\t')?,
        }

        Ok(())
    }
}

/// One reservation rendered as text fields.
struct Row([String; 10]);

impl Row {
    fn new(r: &Reservation, numbers: &HashMap<TableId, u32>) -> Self {
        let tables: Vec<u32> = r
            .tables()
            .iter()
            .filter_map(|id| numbers.get(id).copied())
            .collect();
        Self([
            r.id().value().to_string(),
            r.date().to_string(),
            r.time().format("%H:%M").to_string(),
            r.duration_minutes().to_string(),
            r.party_size().to_string(),
            r.name().to_string(),
            r.status().to_string(),
            r.origin().to_string(),
            format_numbers(&tables),
            r.customer()
                .map_or_else(|| "-".to_string(), |id| id.value().to_string()),
        ])
    }
}

/// Format reservations as a human-readable table.
fn format_as_table(rows: &[Row]) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    let header_line = COLUMN_HEADERS
        .iter()
        .map(|s| s.to_uppercase())
        .collect::<Vec<_>>()
        .join("\t");
    writeln!(handle, "{header_line}")?;

    for row in rows {
        writeln!(handle, "{}", row.0.join("\t"))?;
    }

    Ok(())
}

/// Format reservations as JSON.
fn format_as_json(reservations: &[Reservation]) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, reservations)?;
    writeln!(handle)?;
    Ok(())
}

/// Format reservations as delimited output (CSV or TSV).
fn format_as_delimited(rows: &[Row], delimiter: u8) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(stdout.lock());

    writer.write_record(COLUMN_HEADERS)?;
    for row in rows {
        writer.write_record(&row.0)?;
    }
    writer.flush()?;

    Ok(())
}
