//! Release command implementation.
//!
//! This module implements the `release` command, which takes a reservation
//! off its tables without changing its status.

use crate::error::CliError;
use crate::utils::{open_coordinator, parse_reservation_id, report, GlobalOptions};
use clap::Args;
use mesa::operations::ReleaseOptions;
use mesa::ReservationId;

/// Release a reservation's tables.
#[derive(Args)]
pub struct ReleaseCommand {
    /// Reservation id
    #[arg(value_parser = parse_reservation_id)]
    pub reservation: ReservationId,

    /// Perform a dry run
    #[arg(long)]
    pub dry_run: bool,
}

impl ReleaseCommand {
    /// Execute the release command.
    pub fn execute(self, global: &GlobalOptions) -> Result<(), CliError> {
        let (mut mesa, _config) = open_coordinator(global)?;

        let options =
            ReleaseOptions::new(self.reservation, global.actor.clone()).with_dry_run(self.dry_run);
        let result = mesa.release(options)?;

        report(global, result.dry_run, &result.actions_taken, &result.warnings);
        if !result.dry_run && !global.quiet {
            if result.audit.is_empty() {
                eprintln!("{} holds no tables", self.reservation);
            } else {
                eprintln!(
                    "Released {} table(s) from {}",
                    result.audit.len(),
                    self.reservation
                );
            }
        }

        Ok(())
    }
}
