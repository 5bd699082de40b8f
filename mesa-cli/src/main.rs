//! Main entry point for the mesa CLI.
//!
//! This is the command-line interface for the mesa reservation core.
//! It provides commands for running a restaurant floor:
//! - `zone` / `table`: describe the floor
//! - `reserve`: take a booking
//! - `availability` / `assign` / `release`: put bookings on tables
//! - `confirm`, `cancel`, `seat`, `complete`, `no-show`: lifecycle events
//! - `customer`: detect and resolve contact conflicts

mod cli;
mod commands;
mod error;
mod utils;

use clap::Parser;
use cli::Cli;
use mesa::ReservationEvent;
use utils::GlobalOptions;

fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Route library logging through the CLI's verbosity
    let _ = mesa::install_logger(mesa::init_logger(cli.verbose, cli.quiet));

    let global = GlobalOptions {
        verbose: cli.verbose,
        quiet: cli.quiet,
        data_dir: cli.data_dir.clone(),
        busy_timeout: cli.busy_timeout,
        actor: cli.actor(),
    };

    // Execute the command
    let result = match cli.command {
        cli::Command::Init(cmd) => cmd.execute(&global),
        cli::Command::Zone(cmd) => cmd.execute(&global),
        cli::Command::Table(cmd) => cmd.execute(&global),
        cli::Command::Reserve(cmd) => cmd.execute(&global),
        cli::Command::Availability(cmd) => cmd.execute(&global),
        cli::Command::Assign(cmd) => cmd.execute(&global),
        cli::Command::Release(cmd) => cmd.execute(&global),
        cli::Command::Confirm(cmd) => cmd.execute(ReservationEvent::Confirm, &global),
        cli::Command::Cancel(cmd) => cmd.execute(ReservationEvent::Cancel, &global),
        cli::Command::Seat(cmd) => cmd.execute(ReservationEvent::Seat, &global),
        cli::Command::Complete(cmd) => cmd.execute(ReservationEvent::Complete, &global),
        cli::Command::NoShow(cmd) => cmd.execute(ReservationEvent::MarkNoShow, &global),
        cli::Command::Customer(cmd) => cmd.execute(&global),
        cli::Command::List(cmd) => cmd.execute(&global),
        cli::Command::History(cmd) => cmd.execute(&global),
        cli::Command::Completions(cmd) => cmd.execute(&global),
    };

    // Handle errors and set exit code
    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
