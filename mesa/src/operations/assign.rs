//! Assignment planning.
//!
//! This module validates an assignment of tables to a reservation and plans
//! the writes: old tables released, new tables claimed, groups fused around
//! their lowest-numbered table, and the reservation's table set replaced.
//!
//! A group standing for other reservations can be taken table by table, or
//! whole exactly as it stands, but never reshaped.

use std::collections::BTreeSet;

use rusqlite::Connection;
use serde::Serialize;

use crate::config::Settings;
use crate::database::Database;
use crate::error::{Error, Result, UnavailableReason};
use crate::ids::{ReservationId, TableId};
use crate::reservation::ReservationEvent;
use crate::role::{Actor, Role};
use crate::table::{group_capacity, FusionState, Table, TableState, TableStatus};

use super::availability::{
    fusion_view, group_issue, AvailabilityCalculator, AvailabilityRequest,
};
use super::plan::{join_numbers, OperationPlan, PlanAction};
use super::release::release_actions;

/// Options for an assign operation.
#[derive(Debug, Clone)]
pub struct AssignOptions {
    /// The reservation being seated.
    pub reservation: ReservationId,

    /// Tables to assign; order and duplicates do not matter.
    pub tables: Vec<TableId>,

    /// Who is assigning.
    pub actor: Actor,

    /// Bypass the overlap check. Requires [`Role::Manager`].
    pub force: bool,

    /// Describe the plan without writing.
    pub dry_run: bool,
}

impl AssignOptions {
    /// Creates options with force and dry-run off.
    ///
    /// # Examples
    ///
    /// ```
    /// use mesa::operations::AssignOptions;
    /// use mesa::{Actor, ReservationId, Role, TableId};
    ///
    /// let options = AssignOptions::new(
    ///     ReservationId(7),
    ///     vec![TableId(4), TableId(5)],
    ///     Actor::new("marta", Role::Manager),
    /// )
    /// .with_force(true);
    /// assert!(options.force);
    /// ```
    #[must_use]
    pub const fn new(reservation: ReservationId, tables: Vec<TableId>, actor: Actor) -> Self {
        Self {
            reservation,
            tables,
            actor,
            force: false,
            dry_run: false,
        }
    }

    /// Sets the force flag.
    #[must_use]
    pub const fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Sets the dry-run flag.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Outcome of an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentResult {
    /// The reservation.
    pub reservation: ReservationId,
    /// Assigned tables, lowest number first.
    pub tables: Vec<TableId>,
    /// Floor numbers of `tables`.
    pub numbers: Vec<u32>,
    /// Master of the fusion group, when more than one table is assigned.
    pub master: Option<TableId>,
    /// Effective seats of the assignment.
    pub capacity: u32,
    /// The reservation already had exactly these tables; nothing was written.
    pub unchanged: bool,
    /// A forced assignment ignored overlapping reservations.
    pub overlap_overridden: bool,
    /// Nothing was written because this was a dry run.
    pub dry_run: bool,
    /// Warnings for the operator.
    pub warnings: Vec<String>,
}

/// A plan together with the assignment it produces once executed.
#[derive(Debug, Clone)]
pub struct PlannedAssignment {
    /// Writes to perform.
    pub plan: OperationPlan,
    /// Result to report after execution.
    pub outcome: AssignmentResult,
}

/// An assignment plan generator.
pub struct AssignPlan<'a> {
    options: AssignOptions,
    settings: &'a Settings,
}

impl<'a> AssignPlan<'a> {
    /// Creates a new assign plan with the given options and settings.
    #[must_use]
    pub const fn new(options: AssignOptions, settings: &'a Settings) -> Self {
        Self { options, settings }
    }

    /// Validates the assignment and builds its plan.
    ///
    /// Checks run in this order: role, reservation lookup, reservation
    /// status, table lookup, idempotency, force permission, blocked and
    /// inactive tables, combinability, fusion, capacity, overlap and, unless
    /// forced, the group shape.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The actor is below [`Role::Host`], or forces below [`Role::Manager`]
    /// - The reservation or a table does not exist
    /// - The reservation is not pending or confirmed
    /// - A table is blocked, inactive or (unless forced) held by an
    ///   overlapping reservation
    /// - A table in a group is not combinable
    /// - A group would reshape a fusion standing for another reservation
    /// - The party exceeds the effective capacity
    /// - Unforced, a group is not one the availability search offers
    pub fn build_plan(&self, conn: &Connection) -> Result<PlannedAssignment> {
        let options = &self.options;
        options.actor.require(Role::Host, "assign tables")?;

        let reservation = Database::require_reservation(conn, options.reservation)?;
        if reservation.status().after(ReservationEvent::Assign).is_none() {
            return Err(Error::InvalidTransition {
                from: reservation.status(),
                event: ReservationEvent::Assign,
            });
        }
        if options.tables.is_empty() {
            return Err(Error::Validation {
                field: "tables".into(),
                message: "at least one table is required".into(),
            });
        }

        let tables = Database::get_tables(conn, &options.tables)?;
        let numbers: Vec<u32> = tables.iter().map(|t| t.number).collect();
        let capacity = group_capacity(&tables);
        let master = (tables.len() > 1).then(|| tables[0].id);

        let mut outcome = AssignmentResult {
            reservation: reservation.id(),
            tables: tables.iter().map(|t| t.id).collect(),
            numbers: numbers.clone(),
            master,
            capacity,
            unchanged: false,
            overlap_overridden: false,
            dry_run: options.dry_run,
            warnings: Vec::new(),
        };

        let current: BTreeSet<TableId> = reservation.tables().iter().copied().collect();
        let wanted: BTreeSet<TableId> = outcome.tables.iter().copied().collect();
        if current == wanted {
            log::warn!(
                "reservation {} already holds table(s) {}; nothing to do",
                reservation.id(),
                join_numbers(&numbers)
            );
            let plan = OperationPlan::new(format!(
                "Reservation {} already assigned to table(s) {}",
                reservation.id(),
                join_numbers(&numbers)
            ));
            outcome.unchanged = true;
            return Ok(PlannedAssignment { plan, outcome });
        }

        if options.force {
            options.actor.require(Role::Manager, "force an assignment")?;
        }

        let window = reservation.window();
        for table in &tables {
            if let Some(reason) = table.standing_issue() {
                return Err(Error::TableUnavailable {
                    table_number: table.number,
                    reason,
                    window,
                });
            }
        }

        if tables.len() > 1 {
            if let Some(table) = tables.iter().find(|t| !t.combinable) {
                return Err(Error::NotCombinable {
                    table_number: table.number,
                });
            }
        }

        // fused tables not owned by this reservation alone
        let held = Database::held_groups(conn)?;
        let view: Vec<Table> = tables
            .iter()
            .map(|t| fusion_view(t.clone(), &held, Some(reservation.id())))
            .collect();
        if view.len() > 1 {
            for table in &view {
                let Some(group) = table.group_master() else {
                    continue;
                };
                let members: BTreeSet<TableId> = Database::fusion_group(conn, group)?
                    .iter()
                    .map(|t| t.id)
                    .collect();
                if members != wanted {
                    return Err(Error::TableUnavailable {
                        table_number: table.number,
                        reason: UnavailableReason::Fused { master: group },
                        window,
                    });
                }
            }
        }

        if capacity < reservation.party_size() {
            return Err(Error::CapacityExceeded {
                party_size: reservation.party_size(),
                capacity,
                tables: numbers,
            });
        }

        let mut warnings = Vec::new();
        for table in &tables {
            let overlapping = Database::active_reservations_overlapping(
                conn,
                table.id,
                &window,
                self.settings.seating_buffer_minutes,
                Some(reservation.id()),
            )?;
            let Some(&holder) = overlapping.first() else {
                continue;
            };
            if !options.force {
                return Err(Error::TableUnavailable {
                    table_number: table.number,
                    reason: UnavailableReason::Overlap {
                        reservation: holder,
                    },
                    window,
                });
            }
            let warning = format!(
                "table {} overlaps reservation {holder}; assignment forced by {}",
                table.number, options.actor.id
            );
            log::warn!("{warning}");
            warnings.push(warning);
        }
        outcome.overlap_overridden = !warnings.is_empty();

        if view.len() > 1 && !options.force {
            let request = AvailabilityRequest::new(
                reservation.date(),
                reservation.time(),
                reservation.party_size(),
            )
            .excluding(reservation.id());
            let offered = AvailabilityCalculator::new(self.settings)
                .rank_within(conn, &request, &window)?
                .iter()
                .any(|c| c.tables.iter().map(|t| t.id).collect::<BTreeSet<_>>() == wanted);
            if !offered {
                let last = numbers.last().copied().unwrap_or_default();
                let (table_number, reason) = group_issue(&view, reservation.party_size())
                    .unwrap_or((last, UnavailableReason::GroupTooLarge));
                log::debug!(
                    "group {} not offered for reservation {}: table {table_number} {reason}",
                    join_numbers(&numbers),
                    reservation.id()
                );
                return Err(Error::TableUnavailable {
                    table_number,
                    reason,
                    window,
                });
            }
        }

        let released: Vec<Table> = Database::get_tables(conn, reservation.tables())?
            .into_iter()
            .filter(|t| !wanted.contains(&t.id))
            .collect();

        let mut plan = OperationPlan::new(format!(
            "Assign reservation {} to table(s) {}",
            reservation.id(),
            join_numbers(&numbers)
        ))
        .add_actions(release_actions(conn, &reservation, &released)?)
        .add_actions(
            tables
                .iter()
                .zip(&view)
                .map(|(table, seen)| PlanAction::UpdateTableState {
                    table: table.id,
                    number: table.number,
                    from: table.state(),
                    to: claimed_state(seen, master),
                    expected_version: table.version,
                    reservation: Some(reservation.id()),
                }),
        )
        .add_action(PlanAction::SetReservationTables {
            reservation: reservation.id(),
            tables: outcome.tables.clone(),
            numbers,
            expected_version: reservation.version(),
        });
        for warning in &warnings {
            plan = plan.add_warning(warning.clone());
        }
        outcome.warnings = warnings;

        Ok(PlannedAssignment { plan, outcome })
    }
}

/// State of a table claimed by an assignment led by `master`.
///
/// A table claimed alone keeps a fusion it still shows, which only happens
/// when the group stands for someone else.
pub(crate) fn claimed_state(table: &Table, master: Option<TableId>) -> TableState {
    let status = match table.status {
        TableStatus::Free => TableStatus::Reserved,
        other => other,
    };
    let fusion = match master {
        None if table.is_fused() => table.fusion,
        None => FusionState::Individual,
        Some(master) if master == table.id => FusionState::FusionMaster,
        Some(master) => FusionState::FusionSlave { master },
    };
    TableState { status, fusion }
}
