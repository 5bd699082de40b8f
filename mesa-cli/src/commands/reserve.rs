//! Reserve command implementation.
//!
//! This module implements the `reserve` command, which takes a booking,
//! links it to a customer and prints the new reservation id.

use crate::error::CliError;
use crate::utils::{open_coordinator, parse_date, parse_time, parse_with, report, GlobalOptions};
use chrono::{NaiveDate, NaiveTime};
use clap::{Args, ValueEnum};
use mesa::operations::{CustomerDecision, ExistenceResult, IntakeOptions, ReservationRequest, Resolution};
use mesa::Origin;

/// Take a new reservation.
#[derive(Args)]
pub struct ReserveCommand {
    /// Guest name
    pub name: String,

    /// Number of guests
    #[arg(long, short = 'p')]
    pub party: u32,

    /// Service date (YYYY-MM-DD, today or tomorrow)
    #[arg(long, value_parser = parse_date)]
    pub date: NaiveDate,

    /// Arrival time (HH:MM)
    #[arg(long, value_parser = parse_time)]
    pub time: NaiveTime,

    /// Seating duration in minutes
    #[arg(long, value_name = "MINUTES")]
    pub duration: Option<u32>,

    /// Children among the guests
    #[arg(long, default_value_t = 0)]
    pub children: u32,

    /// Contact email
    #[arg(long)]
    pub email: Option<String>,

    /// Contact phone
    #[arg(long)]
    pub phone: Option<String>,

    /// Preferred zone code
    #[arg(long)]
    pub zone: Option<String>,

    /// Booking channel: web, phone, walk-in or third-party
    #[arg(long, default_value = "phone", value_parser = parse_with::<Origin>)]
    pub origin: Origin,

    /// Guest's special requests
    #[arg(long, value_name = "TEXT")]
    pub requests: Option<String>,

    /// Staff-only notes
    #[arg(long, value_name = "TEXT")]
    pub notes: Option<String>,

    /// How to handle the customer record
    #[arg(long, value_enum, default_value = "auto")]
    pub customer: DecisionArg,

    /// Perform a dry run
    #[arg(long)]
    pub dry_run: bool,
}

/// Customer handling accepted on the command line.
#[derive(Clone, Copy, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum DecisionArg {
    /// Link a single match or create a customer
    Auto,
    /// Link a single match and fill in missing contact fields
    Update,
    /// Always create a new customer
    CreateNew,
    /// On conflict, keep the customer owning the email
    KeepEmail,
    /// On conflict, keep the customer owning the phone
    KeepPhone,
    /// On conflict, merge the phone's customer into the email's
    Merge,
}

impl From<DecisionArg> for CustomerDecision {
    fn from(arg: DecisionArg) -> Self {
        match arg {
            DecisionArg::Auto => CustomerDecision::Auto,
            DecisionArg::Update => CustomerDecision::Update,
            DecisionArg::CreateNew => CustomerDecision::CreateNew,
            DecisionArg::KeepEmail => CustomerDecision::Resolve(Resolution::KeepEmailMatch),
            DecisionArg::KeepPhone => CustomerDecision::Resolve(Resolution::KeepPhoneMatch),
            DecisionArg::Merge => CustomerDecision::Resolve(Resolution::Merge),
        }
    }
}

impl ReserveCommand {
    /// Execute the reserve command.
    pub fn execute(self, global: &GlobalOptions) -> Result<(), CliError> {
        let (mut mesa, _config) = open_coordinator(global)?;

        let mut request = ReservationRequest::new(self.name, self.party, self.date, self.time)
            .with_children(self.children)
            .with_origin(self.origin);
        if let Some(minutes) = self.duration {
            request = request.with_duration(minutes);
        }
        if let Some(email) = self.email {
            request = request.with_email(email);
        }
        if let Some(phone) = self.phone {
            request = request.with_phone(phone);
        }
        if let Some(zone) = self.zone {
            request = request.with_zone(zone);
        }
        if let Some(text) = self.requests {
            request = request.with_special_requests(text);
        }
        if let Some(text) = self.notes {
            request = request.with_internal_notes(text);
        }

        let options = IntakeOptions::new(request, global.actor.clone())
            .with_decision(self.customer.into())
            .with_dry_run(self.dry_run);
        let result = mesa.create_reservation(options)?;

        report(global, result.dry_run, &result.actions, &result.warnings);
        if result.dry_run {
            return Ok(());
        }

        let reservation = &result.reservation;
        if !global.quiet {
            let customer = match (&result.existence, result.customer()) {
                (ExistenceResult::Conflict { .. }, None) => "unlinked (contact conflict)".to_string(),
                (_, Some(id)) if result.customer_created => format!("new customer {id}"),
                (_, Some(id)) => format!("customer {id}"),
                (_, None) => "no customer".to_string(),
            };
            eprintln!(
                "Reserved {} for {} on {} at {} ({}, {customer})",
                reservation.id(),
                reservation.party_size(),
                reservation.date(),
                reservation.time().format("%H:%M"),
                reservation.status(),
            );
        }

        // The id alone on stdout, for scripting
        println!("{}", reservation.id().value());

        Ok(())
    }
}
