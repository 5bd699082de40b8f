//! Reservation lifecycle transitions.
//!
//! Each event moves the reservation through [`ReservationStatus::after`] and
//! drives its tables: seating occupies them, completion sends them to
//! cleaning, cancellation and no-shows release them.

use rusqlite::Connection;
use serde::Serialize;

use crate::config::Settings;
use crate::database::Database;
use crate::error::{Error, Result};
use crate::ids::ReservationId;
use crate::reservation::{ReservationEvent, ReservationStatus};
use crate::role::{Actor, Role};
use crate::table::{TableState, TableStatus};

use super::conflict::{check_customer_existence, ExistenceResult};
use super::executor::ExecutionResult;
use super::plan::{OperationPlan, PlanAction};
use super::release::release_actions;

/// Options for a lifecycle transition.
#[derive(Debug, Clone)]
pub struct TransitionOptions {
    /// The reservation.
    pub reservation: ReservationId,

    /// What happened.
    pub event: ReservationEvent,

    /// Who reports it.
    pub actor: Actor,

    /// Fail with [`Error::StaleState`] unless the reservation is still at
    /// this version.
    pub expected_version: Option<i64>,

    /// Describe the plan without writing.
    pub dry_run: bool,
}

impl TransitionOptions {
    /// Creates options without a version check.
    #[must_use]
    pub const fn new(reservation: ReservationId, event: ReservationEvent, actor: Actor) -> Self {
        Self {
            reservation,
            event,
            actor,
            expected_version: None,
            dry_run: false,
        }
    }

    /// Requires the reservation to be at `version`.
    #[must_use]
    pub const fn with_expected_version(mut self, version: Option<i64>) -> Self {
        self.expected_version = version;
        self
    }

    /// Sets the dry-run flag.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// A transition plan together with the states it moves between.
#[derive(Debug, Clone)]
pub struct PlannedTransition {
    /// Writes to perform.
    pub plan: OperationPlan,
    /// The reservation.
    pub reservation: ReservationId,
    /// Status before.
    pub from: ReservationStatus,
    /// Status after.
    pub to: ReservationStatus,
}

/// Outcome of a transition.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionResult {
    /// The reservation.
    pub reservation: ReservationId,
    /// Status before.
    pub from: ReservationStatus,
    /// Status after.
    pub to: ReservationStatus,
    /// Nothing was written because this was a dry run.
    pub dry_run: bool,
    /// Actions taken, or that would be taken.
    pub actions: Vec<String>,
    /// Warnings for the operator.
    pub warnings: Vec<String>,
}

impl TransitionResult {
    /// Combines a planned transition with its execution.
    #[must_use]
    pub fn new(planned: &PlannedTransition, execution: &ExecutionResult) -> Self {
        Self {
            reservation: planned.reservation,
            from: planned.from,
            to: planned.to,
            dry_run: execution.dry_run,
            actions: execution.actions_taken.clone(),
            warnings: execution.warnings.clone(),
        }
    }
}

/// A transition plan generator.
pub struct TransitionPlan<'a> {
    options: TransitionOptions,
    settings: &'a Settings,
}

impl<'a> TransitionPlan<'a> {
    /// Creates a new transition plan with the given options and settings.
    #[must_use]
    pub const fn new(options: TransitionOptions, settings: &'a Settings) -> Self {
        Self { options, settings }
    }

    /// Validates the event against the reservation's current state and plans
    /// its side effects.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The actor is below [`Role::Host`]
    /// - The event is [`ReservationEvent::Assign`] (use the assign operation)
    /// - The reservation does not exist or moved past `expected_version`
    /// - The status does not accept the event
    /// - Seating or completing a reservation without tables
    /// - Confirming an unlinked reservation whose contact data conflicts
    pub fn build_plan(&self, conn: &Connection) -> Result<PlannedTransition> {
        let options = &self.options;
        let event = options.event;
        options.actor.require(Role::Host, "change reservation status")?;
        if event == ReservationEvent::Assign {
            return Err(Error::Validation {
                field: "event".into(),
                message: "tables are assigned through the assign operation".into(),
            });
        }

        let reservation = Database::require_reservation(conn, options.reservation)?;
        if let Some(expected) = options.expected_version {
            if expected != reservation.version() {
                return Err(Error::StaleState {
                    entity: "reservation",
                    id: reservation.id().value(),
                    expected,
                    found: reservation.version(),
                });
            }
        }

        let from = reservation.status();
        let to = from
            .after(event)
            .ok_or(Error::InvalidTransition { from, event })?;

        if matches!(event, ReservationEvent::Seat | ReservationEvent::Complete)
            && !reservation.is_assigned()
        {
            return Err(Error::NoTableAssigned {
                reservation: reservation.id(),
                event,
            });
        }

        if event == ReservationEvent::Confirm && reservation.customer().is_none() {
            if let ExistenceResult::Conflict {
                email_match,
                phone_match,
            } = check_customer_existence(
                conn,
                reservation.email(),
                reservation.phone(),
                &self.settings.default_country_code,
            )? {
                return Err(Error::ConflictUnresolved {
                    email_match: email_match.id,
                    phone_match: phone_match.id,
                });
            }
        }

        let mut plan = OperationPlan::new(format!("{event} reservation {}", reservation.id()))
            .add_action(PlanAction::UpdateReservationStatus {
                reservation: reservation.id(),
                from,
                to,
                expected_version: reservation.version(),
            });

        let tables = Database::get_tables(conn, reservation.tables())?;
        match event {
            ReservationEvent::Cancel | ReservationEvent::MarkNoShow if reservation.is_assigned() => {
                plan = plan
                    .add_actions(release_actions(conn, &reservation, &tables)?)
                    .add_action(PlanAction::SetReservationTables {
                        reservation: reservation.id(),
                        tables: Vec::new(),
                        numbers: Vec::new(),
                        expected_version: reservation.version() + 1,
                    });
            }
            ReservationEvent::Seat | ReservationEvent::Complete => {
                let status = if event == ReservationEvent::Seat {
                    TableStatus::Occupied
                } else {
                    TableStatus::Cleaning
                };
                for table in &tables {
                    if event == ReservationEvent::Seat && table.status != TableStatus::Reserved {
                        plan = plan.add_warning(format!(
                            "table {} is {}, not reserved",
                            table.number,
                            table.status
                        ));
                    }
                    plan = plan.add_action(PlanAction::UpdateTableState {
                        table: table.id,
                        number: table.number,
                        from: table.state(),
                        to: TableState {
                            status,
                            fusion: table.fusion,
                        },
                        expected_version: table.version,
                        reservation: Some(reservation.id()),
                    });
                }
            }
            _ => {}
        }

        Ok(PlannedTransition {
            plan,
            reservation: reservation.id(),
            from,
            to,
        })
    }
}
