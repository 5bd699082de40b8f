//! CLI structure and command definitions.
//!
//! This module defines the main CLI structure using clap's derive macros,
//! including global options and subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use mesa::{Actor, Role};

use crate::commands::{
    AssignCommand, AvailabilityCommand, CompletionsCommand, CustomerCommand, HistoryCommand,
    InitCommand, ListCommand, ReleaseCommand, ReserveCommand, TableCommand, TransitionCommand,
    ZoneCommand,
};

/// Command-line tool for coordinating restaurant table reservations.
#[derive(Parser)]
#[command(name = "mesa")]
#[command(version, about = "Coordinate restaurant table reservations", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Override the data directory location
    #[arg(long, value_name = "PATH", global = true, env = "MESA_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Override the default busy timeout (in seconds)
    #[arg(long, value_name = "SECONDS", global = true, env = "MESA_BUSY_TIMEOUT")]
    pub busy_timeout: Option<u32>,

    /// Staff member running the command, recorded in the audit log
    #[arg(long, value_name = "ID", global = true, env = "MESA_ACTOR", default_value = "staff")]
    pub actor: String,

    /// Role of the staff member
    #[arg(
        long,
        value_enum,
        global = true,
        env = "MESA_ROLE",
        default_value = "host",
        ignore_case = true
    )]
    pub role: RoleArg,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// The actor described by `--actor` and `--role`.
    pub fn actor(&self) -> Actor {
        Actor::new(self.actor.clone(), self.role.into())
    }
}

/// Staff role accepted on the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum RoleArg {
    /// Read-only access
    Viewer,
    /// Front-of-house staff
    Host,
    /// Shift manager
    Manager,
    /// Administrator
    Admin,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Viewer => Role::Viewer,
            RoleArg::Host => Role::Host,
            RoleArg::Manager => Role::Manager,
            RoleArg::Admin => Role::Admin,
        }
    }
}

/// Available CLI commands.
#[derive(Subcommand)]
pub enum Command {
    /// Initialize the data directory and database
    Init(InitCommand),

    /// Manage dining zones
    #[command(subcommand)]
    Zone(ZoneCommand),

    /// Manage tables
    #[command(subcommand)]
    Table(TableCommand),

    /// Take a new reservation
    Reserve(ReserveCommand),

    /// Find tables able to seat a party
    Availability(AvailabilityCommand),

    /// Assign tables to a reservation
    Assign(AssignCommand),

    /// Release a reservation's tables
    Release(ReleaseCommand),

    /// Confirm a pending reservation
    Confirm(TransitionCommand),

    /// Cancel a reservation and release its tables
    Cancel(TransitionCommand),

    /// Seat a confirmed reservation
    Seat(TransitionCommand),

    /// Complete a seated reservation
    Complete(TransitionCommand),

    /// Mark a reservation as a no-show
    NoShow(TransitionCommand),

    /// Look up customers and resolve contact conflicts
    #[command(subcommand)]
    Customer(CustomerCommand),

    /// List reservations
    List(ListCommand),

    /// Show a table's state history
    History(HistoryCommand),

    /// Generate shell completion scripts
    Completions(CompletionsCommand),
}
