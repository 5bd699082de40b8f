//! Lifecycle commands: `confirm`, `cancel`, `seat`, `complete`, `no-show`.
//!
//! All five share one argument set; `main` passes the event.

use crate::error::CliError;
use crate::utils::{open_coordinator, parse_reservation_id, report, GlobalOptions};
use clap::Args;
use mesa::operations::TransitionOptions;
use mesa::{ReservationEvent, ReservationId};

/// Apply a lifecycle event to a reservation.
#[derive(Args)]
pub struct TransitionCommand {
    /// Reservation id
    #[arg(value_parser = parse_reservation_id)]
    pub reservation: ReservationId,

    /// Fail if the reservation changed since this version was read
    #[arg(long, value_name = "VERSION")]
    pub expected_version: Option<i64>,

    /// Perform a dry run
    #[arg(long)]
    pub dry_run: bool,
}

impl TransitionCommand {
    /// Execute the command for `event`.
    pub fn execute(self, event: ReservationEvent, global: &GlobalOptions) -> Result<(), CliError> {
        let (mut mesa, _config) = open_coordinator(global)?;

        let options = TransitionOptions::new(self.reservation, event, global.actor.clone())
            .with_expected_version(self.expected_version)
            .with_dry_run(self.dry_run);
        let result = mesa.transition(options)?;

        report(global, result.dry_run, &result.actions, &result.warnings);
        if !result.dry_run && !global.quiet {
            eprintln!("{}: {} -> {}", result.reservation, result.from, result.to);
        }

        Ok(())
    }
}
