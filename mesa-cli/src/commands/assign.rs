//! Assign command implementation.
//!
//! Puts a reservation on the given tables, or on the best candidate the
//! availability calculator finds when no tables are given.

use crate::error::CliError;
use crate::utils::{
    format_numbers, open_coordinator, parse_reservation_id, report, table_ids, GlobalOptions,
};
use clap::Args;
use mesa::operations::{AssignOptions, AvailabilityRequest};
use mesa::ReservationId;

/// Assign tables to a reservation.
#[derive(Args)]
pub struct AssignCommand {
    /// Reservation id
    #[arg(value_parser = parse_reservation_id)]
    pub reservation: ReservationId,

    /// Table numbers, e.g. `4,5`; the best candidate when omitted
    #[arg(long, value_delimiter = ',', value_name = "NUMBERS")]
    pub tables: Vec<u32>,

    /// Assign even if the tables hold overlapping reservations
    #[arg(long)]
    pub force: bool,

    /// Perform a dry run
    #[arg(long)]
    pub dry_run: bool,
}

impl AssignCommand {
    /// Execute the assign command.
    pub fn execute(self, global: &GlobalOptions) -> Result<(), CliError> {
        let (mut mesa, _config) = open_coordinator(global)?;

        let tables = if self.tables.is_empty() {
            let reservation = mesa.reservation(self.reservation)?;
            let mut request = AvailabilityRequest::new(
                reservation.date(),
                reservation.time(),
                reservation.party_size(),
            )
            .with_zone(reservation.requested_zone())
            .excluding(reservation.id());
            if let Ok(minutes) = u32::try_from(reservation.duration_minutes()) {
                request = request.with_duration(minutes);
            }
            let best = mesa
                .find_candidate_tables(&request)?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    CliError::SemanticFailure(format!(
                        "No tables can seat reservation {}",
                        self.reservation
                    ))
                })?;
            best.table_ids()
        } else {
            table_ids(&mesa, &self.tables)?
        };

        let options = AssignOptions::new(self.reservation, tables, global.actor.clone())
            .with_force(self.force)
            .with_dry_run(self.dry_run);
        let result = mesa.assign(options)?;

        report(global, result.dry_run, &[], &result.warnings);
        if !global.quiet {
            let numbers = format_numbers(&result.numbers);
            if result.unchanged {
                eprintln!("{} is already on table {numbers}", result.reservation);
            } else {
                eprintln!(
                    "{} {} to table {numbers} ({} seats)",
                    if result.dry_run { "Would assign" } else { "Assigned" },
                    result.reservation,
                    result.capacity
                );
            }
            if result.overlap_overridden {
                eprintln!("Warning: overlapping reservations were overridden");
            }
        }

        println!("{}", format_numbers(&result.numbers));

        Ok(())
    }
}
