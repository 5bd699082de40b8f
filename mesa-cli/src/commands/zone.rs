//! Zone commands.

use crate::error::CliError;
use crate::utils::{open_coordinator, GlobalOptions};
use clap::{Args, Subcommand};
use mesa::Zone;

/// Manage dining zones.
#[derive(Subcommand)]
pub enum ZoneCommand {
    /// Add a zone
    Add(ZoneAddArgs),
    /// List zones
    List,
    /// Re-enable a zone
    Enable {
        /// Zone code
        code: String,
    },
    /// Disable a zone
    Disable {
        /// Zone code
        code: String,
    },
}

/// Arguments for `zone add`.
#[derive(Args)]
pub struct ZoneAddArgs {
    /// Short unique code, e.g. `terrace`
    pub code: String,

    /// Display name
    #[arg(long)]
    pub name: String,

    /// Nominal seat count
    #[arg(long, default_value_t = 0)]
    pub capacity: u32,
}

impl ZoneCommand {
    /// Execute the zone command.
    pub fn execute(self, global: &GlobalOptions) -> Result<(), CliError> {
        let (mut mesa, _config) = open_coordinator(global)?;

        match self {
            ZoneCommand::Add(args) => {
                let zone = Zone::new(&args.code, args.name, args.capacity)
                    .map_err(mesa::Error::from)?;
                let zone = mesa.add_zone(&zone, &global.actor)?;
                if !global.quiet {
                    eprintln!("Added zone {} ({})", zone.code, zone.name);
                }
            }
            ZoneCommand::List => {
                println!("CODE\tNAME\tCAPACITY\tACTIVE");
                for zone in mesa.list_zones()? {
                    println!(
                        "{}\t{}\t{}\t{}",
                        zone.code,
                        zone.name,
                        zone.capacity,
                        if zone.active { "yes" } else { "no" }
                    );
                }
            }
            ZoneCommand::Enable { code } => {
                let zone = mesa.set_zone_active(&code, true, &global.actor)?;
                if !global.quiet {
                    eprintln!("Enabled zone {}", zone.code);
                }
            }
            ZoneCommand::Disable { code } => {
                let zone = mesa.set_zone_active(&code, false, &global.actor)?;
                if !global.quiet {
                    eprintln!("Disabled zone {}", zone.code);
                }
            }
        }

        Ok(())
    }
}
