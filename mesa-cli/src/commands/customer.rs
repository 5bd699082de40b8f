//! Customer commands.
//!
//! `check` reports whether contact data matches no customer, one customer,
//! or two different customers. `resolve` settles the last case.

use crate::error::CliError;
use crate::utils::{open_coordinator, parse_reservation_id, parse_with, GlobalOptions};
use clap::{Args, Subcommand};
use mesa::operations::{ExistenceResult, Resolution, ResolveOptions};
use mesa::{ContactInfo, CustomerId, ReservationId};

/// Look up customers and resolve contact conflicts.
#[derive(Subcommand)]
pub enum CustomerCommand {
    /// Check which customers own an email and phone
    Check(CheckArgs),
    /// Resolve a conflict between two customers
    Resolve(ResolveArgs),
    /// Show a customer record as JSON
    Show {
        /// Customer id
        id: i64,
    },
}

/// Arguments for `customer check`.
#[derive(Args)]
pub struct CheckArgs {
    /// Email to look up
    #[arg(long)]
    pub email: Option<String>,

    /// Phone to look up
    #[arg(long)]
    pub phone: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `customer resolve`.
#[derive(Args)]
pub struct ResolveArgs {
    /// Conflicting email
    #[arg(long)]
    pub email: String,

    /// Conflicting phone
    #[arg(long)]
    pub phone: String,

    /// Strategy: keep-email, keep-phone, merge or create-new
    #[arg(long, value_parser = parse_with::<Resolution>)]
    pub strategy: Resolution,

    /// Name for a new customer; defaults to the reservation's guest name
    #[arg(long)]
    pub name: Option<String>,

    /// Reservation to link to the surviving customer
    #[arg(long, value_parser = parse_reservation_id)]
    pub reservation: Option<ReservationId>,

    /// Perform a dry run
    #[arg(long)]
    pub dry_run: bool,
}

impl CustomerCommand {
    /// Execute the customer command.
    pub fn execute(self, global: &GlobalOptions) -> Result<(), CliError> {
        let (mut mesa, _config) = open_coordinator(global)?;

        match self {
            CustomerCommand::Check(args) => {
                if args.email.is_none() && args.phone.is_none() {
                    return Err(CliError::InvalidArguments(
                        "Give --email, --phone or both".to_string(),
                    ));
                }
                let result =
                    mesa.check_customer_existence(args.email.as_deref(), args.phone.as_deref())?;
                if args.json {
                    serde_json::to_writer_pretty(std::io::stdout().lock(), &result)?;
                    println!();
                    return Ok(());
                }
                match result {
                    ExistenceResult::None => println!("none"),
                    ExistenceResult::SingleMatch {
                        customer,
                        matched_by,
                    } => println!("match\t{}\t{}\t{matched_by:?}", customer.id, customer.name),
                    ExistenceResult::Conflict {
                        email_match,
                        phone_match,
                    } => {
                        println!("conflict");
                        println!("email\t{}\t{}", email_match.id, email_match.name);
                        println!("phone\t{}\t{}", phone_match.id, phone_match.name);
                    }
                }
            }
            CustomerCommand::Resolve(args) => {
                let name = match (args.name, args.reservation) {
                    (Some(name), _) => name,
                    (None, Some(id)) => mesa.reservation(id)?.name().to_string(),
                    (None, None) => String::new(),
                };
                let contact = ContactInfo::new(name, Some(args.email), Some(args.phone));
                let options = ResolveOptions::new(contact, args.strategy, global.actor.clone())
                    .with_reservation(args.reservation)
                    .with_dry_run(args.dry_run);
                let outcome = mesa.apply_resolution(options)?;

                if !global.quiet {
                    let prefix = if args.dry_run { "Would resolve" } else { "Resolved" };
                    match outcome.customer {
                        Some(id) => eprintln!("{prefix} as {:?}: customer {id}", outcome.resolution),
                        None => eprintln!("{prefix} as {:?}: new customer", outcome.resolution),
                    }
                    if let Some(old) = outcome.superseded {
                        eprintln!("  - {old} merged and retired");
                    }
                    for item in &outcome.reconciliation {
                        eprintln!(
                            "  - {}: kept '{}', dropped '{}' from {}",
                            item.field, item.kept, item.discarded, item.discarded_from
                        );
                    }
                }
                if let Some(id) = outcome.customer {
                    println!("{}", id.value());
                }
            }
            CustomerCommand::Show { id } => {
                let customer = mesa.customer(CustomerId(id))?;
                serde_json::to_writer_pretty(std::io::stdout().lock(), &customer)?;
                println!();
            }
        }

        Ok(())
    }
}
