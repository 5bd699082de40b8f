//! Release operation planning.
//!
//! Releasing a reservation frees its tables unless another pending or
//! confirmed reservation still holds them, and dissolves the fusion group the
//! reservation formed. Releasing an unassigned reservation is a no-op with a
//! warning.

use rusqlite::Connection;

use crate::database::Database;
use crate::error::{Error, Result};
use crate::ids::ReservationId;
use crate::reservation::{Reservation, ReservationEvent};
use crate::role::{Actor, Role};
use crate::table::{FusionState, Table, TableState, TableStatus};

use super::plan::{OperationPlan, PlanAction};

/// Options for a release operation.
#[derive(Debug, Clone)]
pub struct ReleaseOptions {
    /// The reservation whose tables are released.
    pub reservation: ReservationId,

    /// Who is releasing.
    pub actor: Actor,

    /// Describe the plan without writing.
    pub dry_run: bool,
}

impl ReleaseOptions {
    /// Creates options for releasing `reservation`.
    ///
    /// # Examples
    ///
    /// ```
    /// use mesa::operations::ReleaseOptions;
    /// use mesa::{Actor, ReservationId, Role};
    ///
    /// let options = ReleaseOptions::new(ReservationId(3), Actor::new("ana", Role::Host));
    /// assert!(!options.dry_run);
    /// ```
    #[must_use]
    pub const fn new(reservation: ReservationId, actor: Actor) -> Self {
        Self {
            reservation,
            actor,
            dry_run: false,
        }
    }

    /// Sets the dry-run flag.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// A release plan generator.
pub struct ReleasePlan {
    options: ReleaseOptions,
}

impl ReleasePlan {
    /// Creates a new release plan with the given options.
    #[must_use]
    pub const fn new(options: ReleaseOptions) -> Self {
        Self { options }
    }

    /// Builds an operation plan for this release request.
    ///
    /// It does NOT modify the database.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The actor is below [`Role::Host`]
    /// - The reservation does not exist
    /// - The reservation is not pending or confirmed
    pub fn build_plan(&self, conn: &Connection) -> Result<OperationPlan> {
        self.options.actor.require(Role::Host, "release tables")?;
        let reservation = Database::require_reservation(conn, self.options.reservation)?;
        if reservation.status().after(ReservationEvent::Assign).is_none() {
            return Err(Error::InvalidTransition {
                from: reservation.status(),
                event: ReservationEvent::Assign,
            });
        }

        let mut plan =
            OperationPlan::new(format!("Release tables of reservation {}", reservation.id()));
        if !reservation.is_assigned() {
            return Ok(plan.add_warning(format!(
                "reservation {} has no tables assigned (already released)",
                reservation.id()
            )));
        }

        let tables = Database::get_tables(conn, reservation.tables())?;
        plan = plan
            .add_actions(release_actions(conn, &reservation, &tables)?)
            .add_action(PlanAction::SetReservationTables {
                reservation: reservation.id(),
                tables: Vec::new(),
                numbers: Vec::new(),
                expected_version: reservation.version(),
            });
        Ok(plan)
    }
}

/// Table writes that hand `tables` back after `reservation` lets go of them.
///
/// Tables whose state does not change produce no action.
pub(crate) fn release_actions(
    conn: &Connection,
    reservation: &Reservation,
    tables: &[Table],
) -> Result<Vec<PlanAction>> {
    let own_group = reservation.tables().len() > 1;
    let mut actions = Vec::new();
    for table in tables {
        let still_held =
            !Database::reservations_holding(conn, table.id, Some(reservation.id()))?.is_empty();
        let dissolve = own_group
            && Database::group_holders(conn, table.id, Some(reservation.id()))?.is_empty();
        let to = released_state(table, still_held, dissolve);
        if to != table.state() {
            actions.push(PlanAction::UpdateTableState {
                table: table.id,
                number: table.number,
                from: table.state(),
                to,
                expected_version: table.version,
                reservation: Some(reservation.id()),
            });
        }
    }
    Ok(actions)
}

/// State of a table once its reservation lets go of it.
///
/// A reserved table stays reserved while another reservation holds it.
/// Occupied and cleaning tables keep their status. The fusion is dissolved
/// when `dissolve` says no other group booking keeps it standing; a block is
/// never lifted.
pub(crate) fn released_state(table: &Table, still_held: bool, dissolve: bool) -> TableState {
    let status = match table.status {
        TableStatus::Reserved if !still_held => TableStatus::Free,
        other => other,
    };
    let fusion = match table.fusion {
        FusionState::FusionMaster | FusionState::FusionSlave { .. } if dissolve => {
            FusionState::Individual
        }
        other => other,
    };
    TableState { status, fusion }
}
