//! History command implementation.
//!
//! Reads a table's entries back from the audit log in the data directory.

use crate::error::CliError;
use crate::utils::{open_coordinator, GlobalOptions};
use clap::Args;

/// Show a table's state history, oldest first.
#[derive(Args)]
pub struct HistoryCommand {
    /// Table number
    pub number: u32,

    /// Print entries as JSON
    #[arg(long)]
    pub json: bool,
}

impl HistoryCommand {
    /// Execute the history command.
    pub fn execute(self, global: &GlobalOptions) -> Result<(), CliError> {
        let (mesa, _config) = open_coordinator(global)?;

        let table = mesa.table_by_number(self.number)?;
        let entries = mesa.table_history(table.id)?;

        if self.json {
            serde_json::to_writer_pretty(std::io::stdout().lock(), &entries)?;
            println!();
            return Ok(());
        }

        println!("TIMESTAMP\tSTATUS\tFUSION\tCHANGED_BY\tRESERVATION");
        for entry in &entries {
            println!(
                "{}\t{}\t{}\t{}\t{}",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                entry.new_state.status,
                entry.new_state.fusion,
                entry.changed_by,
                entry
                    .reservation
                    .map_or_else(|| "-".to_string(), |id| id.value().to_string()),
            );
        }

        Ok(())
    }
}
