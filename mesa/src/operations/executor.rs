//! Plan execution engine.
//!
//! The executor applies a plan's actions against one connection, normally a
//! transaction opened with [`crate::Database::begin_immediate`]; the caller
//! decides whether to commit. Table state changes are collected as
//! [`TableStateLog`] entries for the caller to hand to its audit sink once
//! the transaction has committed.

use chrono::NaiveDateTime;
use rusqlite::Connection;

use crate::audit::TableStateLog;
use crate::database::Database;
use crate::error::{Error, Result};
use crate::ids::{CustomerId, ReservationId};
use crate::role::Actor;

use super::plan::{CustomerRef, OperationPlan, PlanAction};

/// Result of executing a plan.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Whether the execution was successful.
    pub success: bool,

    /// Whether this was a dry-run (no actual changes made).
    pub dry_run: bool,

    /// Descriptions of actions that were taken (or would be taken in dry-run).
    pub actions_taken: Vec<String>,

    /// Warnings from the plan.
    pub warnings: Vec<String>,

    /// Table state changes made, empty on a dry run.
    pub audit: Vec<TableStateLog>,

    /// Reservation created by the plan, if any.
    pub created_reservation: Option<ReservationId>,

    /// Customer created by the plan, if any.
    pub created_customer: Option<CustomerId>,
}

impl ExecutionResult {
    fn new(plan: &OperationPlan, dry_run: bool) -> Self {
        Self {
            success: true,
            dry_run,
            actions_taken: plan.actions.iter().map(PlanAction::description).collect(),
            warnings: plan.warnings.clone(),
            audit: Vec::new(),
            created_reservation: None,
            created_customer: None,
        }
    }
}

/// Executes operation plans against the database.
///
/// # Examples
///
/// ```no_run
/// use chrono::Local;
/// use mesa::database::{Database, DatabaseConfig};
/// use mesa::operations::{OperationPlan, PlanExecutor};
/// use mesa::{Actor, Role};
///
/// let mut db = Database::open(DatabaseConfig::new("/tmp/mesa.db")).unwrap();
/// let actor = Actor::new("ana", Role::Host);
/// let tx = db.begin_immediate().unwrap();
///
/// let plan = OperationPlan::new("Nothing to do");
/// let result = PlanExecutor::new(&tx, &actor, Local::now().naive_local())
///     .execute(&plan)
///     .unwrap();
/// tx.commit().unwrap();
/// assert!(result.success);
/// ```
pub struct PlanExecutor<'a> {
    conn: &'a Connection,
    changed_by: &'a str,
    now: NaiveDateTime,
    dry_run: bool,
}

impl<'a> PlanExecutor<'a> {
    /// Creates an executor writing on behalf of `actor` at `now`.
    #[must_use]
    pub fn new(conn: &'a Connection, actor: &'a Actor, now: NaiveDateTime) -> Self {
        Self {
            conn,
            changed_by: &actor.id,
            now,
            dry_run: false,
        }
    }

    /// Sets the executor to dry-run mode.
    ///
    /// In dry-run mode the plan is described but nothing is written.
    #[must_use]
    pub const fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Executes the given plan.
    ///
    /// # Errors
    ///
    /// Returns an error if any action fails; earlier actions are not undone
    /// here, the caller's transaction is.
    pub fn execute(&mut self, plan: &OperationPlan) -> Result<ExecutionResult> {
        let mut result = ExecutionResult::new(plan, self.dry_run);
        if self.dry_run {
            log::debug!("dry run: {}", plan.description);
            return Ok(result);
        }

        for action in &plan.actions {
            log::debug!("executing: {}", action.description());
            self.execute_action(action, &mut result)?;
        }

        Ok(result)
    }

    fn execute_action(&self, action: &PlanAction, result: &mut ExecutionResult) -> Result<()> {
        match action {
            PlanAction::UpdateTableState {
                table,
                number,
                from,
                to,
                expected_version,
                reservation,
            } => {
                Database::update_table_state(self.conn, *table, *to, *expected_version)?;
                if from != to {
                    result.audit.push(TableStateLog {
                        table_id: *table,
                        table_number: *number,
                        new_state: *to,
                        changed_by: self.changed_by.to_string(),
                        timestamp: self.now,
                        reservation: *reservation,
                    });
                }
            }
            PlanAction::SetTableActive {
                table,
                active,
                expected_version,
                ..
            } => {
                Database::set_table_active(self.conn, *table, *active, *expected_version)?;
            }
            PlanAction::SetReservationTables {
                reservation,
                tables,
                expected_version,
                ..
            } => {
                Database::set_reservation_tables(
                    self.conn,
                    *reservation,
                    tables,
                    *expected_version,
                    self.now,
                )?;
            }
            PlanAction::UpdateReservationStatus {
                reservation,
                to,
                expected_version,
                ..
            } => {
                Database::update_reservation_status(
                    self.conn,
                    *reservation,
                    *to,
                    *expected_version,
                    self.now,
                )?;
            }
            PlanAction::CreateReservation {
                reservation,
                customer,
            } => {
                let mut reservation = (**reservation).clone();
                reservation.customer = self.resolve_customer(*customer, result)?;
                reservation.updated_at = self.now;
                result.created_reservation =
                    Some(Database::insert_reservation(self.conn, &reservation)?);
            }
            PlanAction::LinkCustomer {
                reservation,
                customer,
                expected_version,
            } => {
                if let Some(customer) = self.resolve_customer(*customer, result)? {
                    Database::set_reservation_customer(
                        self.conn,
                        *reservation,
                        customer,
                        *expected_version,
                        self.now,
                    )?;
                }
            }
            PlanAction::CreateCustomer(customer) => {
                result.created_customer = Some(Database::insert_customer(self.conn, customer)?);
            }
            PlanAction::UpdateCustomer(customer) => {
                Database::update_customer(self.conn, customer, self.now)?;
            }
            PlanAction::SupersedeCustomer {
                customer,
                by,
                expected_version,
            } => {
                Database::supersede_customer(
                    self.conn,
                    *customer,
                    *by,
                    *expected_version,
                    self.now,
                )?;
            }
        }
        Ok(())
    }

    fn resolve_customer(
        &self,
        customer: CustomerRef,
        result: &ExecutionResult,
    ) -> Result<Option<CustomerId>> {
        match customer {
            CustomerRef::None => Ok(None),
            CustomerRef::Existing(id) => Ok(Some(id)),
            CustomerRef::Created => result.created_customer.map(Some).ok_or_else(|| {
                Error::Validation {
                    field: "customer".into(),
                    message: "plan links a new customer before creating one".into(),
                }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customer::{ContactInfo, Customer};
    use crate::database::test_util::{at, create_test_database, seed_table, seed_zone};
    use crate::reservation::{Origin, Reservation};
    use crate::role::Role;
    use crate::table::{FusionState, TableState, TableStatus};

    fn host() -> Actor {
        Actor::new("ana", Role::Host)
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let mut db = create_test_database();
        let zone = seed_zone(db.connection(), "hall");
        let table = seed_table(db.connection(), zone, 1, 4);
        let actor = host();

        let plan = OperationPlan::new("Claim").add_action(PlanAction::UpdateTableState {
            table: table.id,
            number: 1,
            from: table.state(),
            to: TableState {
                status: TableStatus::Reserved,
                fusion: FusionState::Individual,
            },
            expected_version: 0,
            reservation: None,
        });

        let tx = db.begin_immediate().unwrap();
        let result = PlanExecutor::new(&tx, &actor, at(12, 0))
            .dry_run()
            .execute(&plan)
            .unwrap();
        tx.commit().unwrap();

        assert!(result.dry_run);
        assert_eq!(result.actions_taken.len(), 1);
        assert!(result.audit.is_empty());
        let stored = Database::get_table(db.connection(), table.id).unwrap().unwrap();
        assert_eq!(stored.status, TableStatus::Free);
    }

    #[test]
    fn test_table_change_is_audited_once() {
        let mut db = create_test_database();
        let zone = seed_zone(db.connection(), "hall");
        let table = seed_table(db.connection(), zone, 1, 4);
        let actor = host();
        let reserved = TableState {
            status: TableStatus::Reserved,
            fusion: FusionState::Individual,
        };

        let plan = OperationPlan::new("Claim")
            .add_action(PlanAction::UpdateTableState {
                table: table.id,
                number: 1,
                from: table.state(),
                to: reserved,
                expected_version: 0,
                reservation: None,
            })
            .add_action(PlanAction::UpdateTableState {
                table: table.id,
                number: 1,
                from: reserved,
                to: reserved,
                expected_version: 1,
                reservation: None,
            });

        let tx = db.begin_immediate().unwrap();
        let result = PlanExecutor::new(&tx, &actor, at(12, 0)).execute(&plan).unwrap();
        tx.commit().unwrap();

        assert_eq!(result.audit.len(), 1);
        assert_eq!(result.audit[0].changed_by, "ana");
        assert_eq!(result.audit[0].new_state, reserved);
        assert_eq!(result.audit[0].timestamp, at(12, 0));
    }

    #[test]
    fn test_stale_version_fails_and_rolls_back() {
        let mut db = create_test_database();
        let zone = seed_zone(db.connection(), "hall");
        let table = seed_table(db.connection(), zone, 1, 4);
        let actor = host();
        let reserved = TableState {
            status: TableStatus::Reserved,
            fusion: FusionState::Individual,
        };
        let claim = |version| PlanAction::UpdateTableState {
            table: table.id,
            number: 1,
            from: table.state(),
            to: reserved,
            expected_version: version,
            reservation: None,
        };

        let plan = OperationPlan::new("Claim twice")
            .add_action(claim(0))
            .add_action(claim(0));
        {
            let tx = db.begin_immediate().unwrap();
            let err = PlanExecutor::new(&tx, &actor, at(12, 0))
                .execute(&plan)
                .unwrap_err();
            assert!(matches!(err, Error::StaleState { .. }));
        }

        let stored = Database::get_table(db.connection(), table.id).unwrap().unwrap();
        assert_eq!(stored.version, 0);
        assert_eq!(stored.status, TableStatus::Free);
    }

    #[test]
    fn test_created_customer_is_linked() {
        let mut db = create_test_database();
        let actor = host();
        let contact = ContactInfo::new("Ana", Some("ana@example.com".into()), None);
        let reservation = Reservation::builder("Ana", 2, at(21, 0).date(), at(21, 0).time())
            .email("ana@example.com")
            .origin(Origin::Web)
            .build()
            .unwrap();

        let plan = OperationPlan::new("Book")
            .add_action(PlanAction::CreateCustomer(Box::new(Customer::from_contact(
                &contact,
                at(10, 0),
            ))))
            .add_action(PlanAction::CreateReservation {
                reservation: Box::new(reservation),
                customer: CustomerRef::Created,
            });

        let tx = db.begin_immediate().unwrap();
        let result = PlanExecutor::new(&tx, &actor, at(10, 0)).execute(&plan).unwrap();
        tx.commit().unwrap();

        let id = result.created_reservation.unwrap();
        let stored = Database::require_reservation(db.connection(), id).unwrap();
        assert_eq!(stored.customer(), result.created_customer);
        assert!(stored.tables().is_empty());
    }

    #[test]
    fn test_linking_uncreated_customer_is_rejected() {
        let mut db = create_test_database();
        let actor = host();
        let reservation = Reservation::builder("Ana", 2, at(21, 0).date(), at(21, 0).time())
            .origin(Origin::WalkIn)
            .build()
            .unwrap();
        let plan = OperationPlan::new("Book").add_action(PlanAction::CreateReservation {
            reservation: Box::new(reservation),
            customer: CustomerRef::Created,
        });

        let tx = db.begin_immediate().unwrap();
        assert!(PlanExecutor::new(&tx, &actor, at(10, 0)).execute(&plan).is_err());
    }
}
