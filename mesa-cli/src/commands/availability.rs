//! Availability command implementation.

use crate::error::CliError;
use crate::utils::{
    format_numbers, open_coordinator, parse_date, parse_time, zone_codes, zone_id_by_code,
    GlobalOptions,
};
use chrono::{NaiveDate, NaiveTime};
use clap::{Args, ValueEnum};
use mesa::operations::AvailabilityRequest;

/// Find tables able to seat a party, best first.
#[derive(Args)]
pub struct AvailabilityCommand {
    /// Service date (YYYY-MM-DD, today or tomorrow)
    #[arg(long, value_parser = parse_date)]
    pub date: NaiveDate,

    /// Arrival time (HH:MM)
    #[arg(long, value_parser = parse_time)]
    pub time: NaiveTime,

    /// Number of guests
    #[arg(long, short = 'p')]
    pub party: u32,

    /// Seating duration in minutes
    #[arg(long, value_name = "MINUTES")]
    pub duration: Option<u32>,

    /// Preferred zone code
    #[arg(long)]
    pub zone: Option<String>,

    /// Show only the first N candidates
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value = "table", ignore_case = true)]
    pub format: CandidateFormat,
}

/// Output format for candidates.
#[derive(Clone, Copy, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum CandidateFormat {
    /// Tab-separated table format (human-readable)
    Table,
    /// JSON format
    Json,
}

impl AvailabilityCommand {
    /// Execute the availability command.
    pub fn execute(self, global: &GlobalOptions) -> Result<(), CliError> {
        let (mesa, _config) = open_coordinator(global)?;

        let zone = self
            .zone
            .as_deref()
            .map(|code| zone_id_by_code(&mesa, code))
            .transpose()?;
        let mut request =
            AvailabilityRequest::new(self.date, self.time, self.party).with_zone(zone);
        if let Some(minutes) = self.duration {
            request = request.with_duration(minutes);
        }

        let mut candidates = mesa.find_candidate_tables(&request)?;
        if let Some(limit) = self.limit {
            candidates.truncate(limit);
        }

        match self.format {
            CandidateFormat::Json => {
                serde_json::to_writer_pretty(std::io::stdout().lock(), &candidates)?;
                println!();
            }
            CandidateFormat::Table => {
                let zones = zone_codes(&mesa)?;
                println!("RANK\tTABLES\tCAPACITY\tZONE\tPREFERRED");
                for (rank, candidate) in candidates.iter().enumerate() {
                    println!(
                        "{}\t{}\t{}\t{}\t{}",
                        rank + 1,
                        format_numbers(&candidate.numbers()),
                        candidate.capacity,
                        zones.get(&candidate.zone_id).map_or("-", String::as_str),
                        if candidate.zone_match { "yes" } else { "no" },
                    );
                }
            }
        }

        if candidates.is_empty() && !global.quiet {
            eprintln!("No tables can seat {} at {}", self.party, self.time.format("%H:%M"));
        }

        Ok(())
    }
}
