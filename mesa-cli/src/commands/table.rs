//! Table commands.
//!
//! `add` and `list` describe the floor. The remaining subcommands are
//! administrative state changes run through the same plan-execute path as
//! reservations, so they also accept `--dry-run`.

use crate::error::CliError;
use crate::utils::{open_coordinator, report, zone_codes, zone_id_by_code, GlobalOptions};
use clap::{Args, Subcommand};
use mesa::operations::{TableAdminAction, TableAdminOptions};
use mesa::Table;

/// Manage tables.
#[derive(Subcommand)]
pub enum TableCommand {
    /// Add a table
    Add(TableAddArgs),
    /// List tables
    List,
    /// Withdraw a free table from service
    Block(TableAdminArgs),
    /// Return a blocked table to service
    Unblock(TableAdminArgs),
    /// Mark a table clean and free after a party left
    FinishCleaning(TableAdminArgs),
    /// Put a deactivated table back on the floor
    Enable(TableAdminArgs),
    /// Take a table off the floor entirely
    Disable(TableAdminArgs),
}

/// Arguments for `table add`.
#[derive(Args)]
pub struct TableAddArgs {
    /// Number painted on the floor plan
    pub number: u32,

    /// Zone code
    #[arg(long)]
    pub zone: String,

    /// Seats at the table alone
    #[arg(long)]
    pub capacity: u32,

    /// Allow joining the table to its neighbours
    #[arg(long)]
    pub combinable: bool,

    /// Seat ceiling when this table leads a group
    #[arg(long, value_name = "SEATS")]
    pub max_combined: Option<u32>,
}

/// Arguments shared by the table administration subcommands.
#[derive(Args)]
pub struct TableAdminArgs {
    /// Table number
    pub number: u32,

    /// Preview actions without executing
    #[arg(long)]
    pub dry_run: bool,
}

impl TableCommand {
    /// Execute the table command.
    pub fn execute(self, global: &GlobalOptions) -> Result<(), CliError> {
        let (mut mesa, _config) = open_coordinator(global)?;

        let (args, action) = match self {
            TableCommand::Add(args) => {
                let zone_id = zone_id_by_code(&mesa, &args.zone)?;
                let mut builder =
                    Table::builder(args.number, zone_id, args.capacity).combinable(args.combinable);
                if let Some(seats) = args.max_combined {
                    builder = builder.max_combined_capacity(seats);
                }
                let table = builder.build().map_err(mesa::Error::from)?;
                let table = mesa.add_table(&table, &global.actor)?;
                if !global.quiet {
                    eprintln!(
                        "Added table {} ({} seats) to {}",
                        table.number, table.capacity, args.zone
                    );
                }
                return Ok(());
            }
            TableCommand::List => {
                let zones = zone_codes(&mesa)?;
                println!("NUMBER\tZONE\tCAPACITY\tMAX_COMBINED\tCOMBINABLE\tACTIVE\tSTATUS\tFUSION");
                for table in mesa.list_tables()? {
                    println!(
                        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                        table.number,
                        zones.get(&table.zone_id).map_or("-", String::as_str),
                        table.capacity,
                        table.max_combined_capacity,
                        if table.combinable { "yes" } else { "no" },
                        if table.active { "yes" } else { "no" },
                        table.status,
                        table.fusion,
                    );
                }
                return Ok(());
            }
            TableCommand::Block(args) => (args, TableAdminAction::Block),
            TableCommand::Unblock(args) => (args, TableAdminAction::Unblock),
            TableCommand::FinishCleaning(args) => (args, TableAdminAction::FinishCleaning),
            TableCommand::Enable(args) => (args, TableAdminAction::Activate),
            TableCommand::Disable(args) => (args, TableAdminAction::Deactivate),
        };

        let table = mesa.table_by_number(args.number)?;
        let options = TableAdminOptions::new(table.id, action, global.actor.clone())
            .with_dry_run(args.dry_run);
        let result = mesa.administer_table(options)?;

        report(global, result.dry_run, &result.actions_taken, &result.warnings);
        if !result.dry_run && !global.quiet {
            for entry in &result.audit {
                eprintln!("Table {} is now {}", entry.table_number, entry.new_state);
            }
        }

        Ok(())
    }
}
