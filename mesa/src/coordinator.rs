//! The coordination entry point.
//!
//! [`Coordinator`] owns the database connection and the injected
//! collaborators (clock, audit sink, rate-limit counters) and runs every
//! mutating operation the same way: open a `BEGIN IMMEDIATE` transaction,
//! build the plan from state read inside it, execute, commit, then hand the
//! table state changes to the audit sink.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;

use crate::audit::{AuditSink, TableStateLog};
use crate::clock::Clock;
use crate::config::{Config, Settings};
use crate::customer::Customer;
use crate::database::Database;
use crate::error::{Error, Result};
use crate::ids::{CustomerId, ReservationId, TableId};
use crate::operations::{
    check_customer_existence, AssignOptions, AssignPlan, AssignmentResult, AvailabilityCalculator,
    AvailabilityRequest, Candidate, ExecutionResult, ExistenceResult, IntakeOptions, IntakePlan,
    IntakeResult, OperationPlan, PlanExecutor, PlannedAssignment, PlannedIntake,
    PlannedResolution, PlannedTransition, ReleaseOptions, ReleasePlan, ResolutionOutcome,
    ResolveOptions, ResolvePlan, TableAdminAction, TableAdminOptions, TableAdminPlan,
    TransitionOptions, TransitionPlan, TransitionResult,
};
use crate::ratelimit::{CounterStore, MemoryCounterStore, RateLimiter};
use crate::reservation::{Origin, Reservation, ReservationEvent};
use crate::role::{Actor, Role};
use crate::table::Table;
use crate::zone::Zone;

/// Anything that carries an [`OperationPlan`] to execute.
trait Planned {
    fn plan(&self) -> &OperationPlan;
}

impl Planned for OperationPlan {
    fn plan(&self) -> &OperationPlan {
        self
    }
}

macro_rules! impl_planned {
    ($($ty:ty),*) => {
        $(impl Planned for $ty {
            fn plan(&self) -> &OperationPlan {
                &self.plan
            }
        })*
    };
}

impl_planned!(PlannedAssignment, PlannedIntake, PlannedResolution, PlannedTransition);

/// Runs reservation operations against one database.
///
/// # Examples
///
/// ```no_run
/// use chrono::{NaiveDate, NaiveTime};
/// use mesa::audit::MemoryAuditSink;
/// use mesa::clock::SystemClock;
/// use mesa::operations::{AvailabilityRequest, IntakeOptions, ReservationRequest};
/// use mesa::{Actor, Config, Coordinator, Database, DatabaseConfig, Origin, Role};
///
/// let db = Database::open(DatabaseConfig::new("/tmp/mesa.db")).unwrap();
/// let mut mesa = Coordinator::new(db, &Config::default(), SystemClock, MemoryAuditSink::new());
/// let host = Actor::new("ana", Role::Host);
///
/// let date = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
/// let time = NaiveTime::from_hms_opt(14, 0, 0).unwrap();
/// let booked = mesa
///     .create_reservation(IntakeOptions::new(
///         ReservationRequest::new("Lucía", 4, date, time)
///             .with_phone("600 123 456")
///             .with_origin(Origin::Phone),
///         host.clone(),
///     ))
///     .unwrap();
///
/// let candidates = mesa
///     .find_candidate_tables(&AvailabilityRequest::new(date, time, 4))
///     .unwrap();
/// if let Some(best) = candidates.first() {
///     mesa.assign_tables(booked.reservation.id(), best.table_ids(), &host).unwrap();
/// }
/// ```
pub struct Coordinator<C, A> {
    db: Database,
    settings: Settings,
    clock: C,
    audit: A,
    limiter: RateLimiter<Box<dyn CounterStore>>,
}

impl<C: Clock, A: AuditSink> Coordinator<C, A> {
    /// Creates a coordinator with an in-process rate-limit counter store.
    #[must_use]
    pub fn new(db: Database, config: &Config, clock: C, audit: A) -> Self {
        let settings = config.settings();
        let limiter = RateLimiter::new(
            Box::new(MemoryCounterStore::new()) as Box<dyn CounterStore>,
            settings.rate_limit_max_requests,
            settings.rate_limit_window,
        );
        Self {
            db,
            settings,
            clock,
            audit,
            limiter,
        }
    }

    /// Replaces the rate-limit counter store, e.g. with one shared between
    /// processes.
    #[must_use]
    pub fn with_counter_store(mut self, store: impl CounterStore + 'static) -> Self {
        self.limiter = RateLimiter::new(
            Box::new(store),
            self.settings.rate_limit_max_requests,
            self.settings.rate_limit_window,
        );
        self
    }

    /// The resolved settings.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The underlying database.
    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.db
    }

    /// The injected clock.
    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// The injected audit sink.
    #[must_use]
    pub const fn audit(&self) -> &A {
        &self.audit
    }

    fn run<P: Planned>(
        &mut self,
        actor: &Actor,
        dry_run: bool,
        build: impl FnOnce(&Connection, &Settings, NaiveDateTime) -> Result<P>,
    ) -> Result<(P, ExecutionResult)> {
        let now = self.clock.now();
        let tx = self.db.begin_immediate()?;
        let conn: &Connection = &tx;
        let planned = build(conn, &self.settings, now)?;

        let execution = {
            let mut executor = PlanExecutor::new(conn, actor, now);
            if dry_run {
                executor = executor.dry_run();
            }
            executor.execute(planned.plan())?
        };
        if dry_run {
            tx.rollback()?;
            return Ok((planned, execution));
        }
        tx.commit()?;

        let plan = planned.plan();
        if !plan.is_empty() {
            log::info!(
                "{} by {} ({} action(s))",
                plan.description,
                actor.id,
                plan.len()
            );
        }
        if !execution.audit.is_empty() {
            self.audit.append(&execution.audit)?;
        }
        Ok((planned, execution))
    }

    // Zones and tables

    /// Stores a new zone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] below [`Role::Manager`], or a validation
    /// error if the code is taken.
    pub fn add_zone(&mut self, zone: &Zone, actor: &Actor) -> Result<Zone> {
        actor.require(Role::Manager, "add zones")?;
        let tx = self.db.begin_immediate()?;
        if Database::get_zone_by_code(&tx, &zone.code)?.is_some() {
            return Err(Error::Validation {
                field: "code".into(),
                message: format!("zone '{}' already exists", zone.code),
            });
        }
        let id = Database::insert_zone(&tx, zone)?;
        tx.commit()?;
        log::info!("zone {} added by {}", zone.code, actor.id);
        Database::get_zone(self.db.connection(), id)?.ok_or_else(|| Error::ZoneNotFound {
            zone: id.to_string(),
        })
    }

    /// Activates or deactivates a zone by code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] below [`Role::Manager`], or
    /// [`Error::ZoneNotFound`].
    pub fn set_zone_active(&mut self, code: &str, active: bool, actor: &Actor) -> Result<Zone> {
        actor.require(Role::Manager, "change zones")?;
        let tx = self.db.begin_immediate()?;
        let zone = Database::get_zone_by_code(&tx, code)?.ok_or_else(|| Error::ZoneNotFound {
            zone: code.to_string(),
        })?;
        Database::set_zone_active(&tx, zone.id, active)?;
        tx.commit()?;
        Ok(Zone { active, ..zone })
    }

    /// Every zone, ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_zones(&self) -> Result<Vec<Zone>> {
        Database::list_zones(self.db.connection())
    }

    /// Stores a new table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] below [`Role::Manager`],
    /// [`Error::ZoneNotFound`] for an unknown zone, or a validation error if
    /// the number is taken.
    pub fn add_table(&mut self, table: &Table, actor: &Actor) -> Result<Table> {
        actor.require(Role::Manager, "add tables")?;
        let tx = self.db.begin_immediate()?;
        if Database::get_zone(&tx, table.zone_id)?.is_none() {
            return Err(Error::ZoneNotFound {
                zone: table.zone_id.to_string(),
            });
        }
        if Database::get_table_by_number(&tx, table.number)?.is_some() {
            return Err(Error::Validation {
                field: "number".into(),
                message: format!("table {} already exists", table.number),
            });
        }
        let id = Database::insert_table(&tx, table)?;
        tx.commit()?;
        log::info!("table {} added by {}", table.number, actor.id);
        Database::get_table(self.db.connection(), id)?.ok_or_else(|| Error::TableNotFound {
            table: id.to_string(),
        })
    }

    /// Every table, ordered by number.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_tables(&self) -> Result<Vec<Table>> {
        Database::list_tables(self.db.connection())
    }

    /// Looks a table up by floor number.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TableNotFound`] if no table has that number.
    pub fn table_by_number(&self, number: u32) -> Result<Table> {
        Database::get_table_by_number(self.db.connection(), number)?.ok_or_else(|| {
            Error::TableNotFound {
                table: format!("#{number}"),
            }
        })
    }

    /// Runs a table administration action.
    ///
    /// # Errors
    ///
    /// Returns the planning error, or a database error.
    pub fn administer_table(&mut self, options: TableAdminOptions) -> Result<ExecutionResult> {
        let actor = options.actor.clone();
        let dry_run = options.dry_run;
        let (_, execution) = self.run(&actor, dry_run, |conn, _, _| {
            TableAdminPlan::new(options).build_plan(conn)
        })?;
        Ok(execution)
    }

    /// Withdraws a table from assignment.
    ///
    /// # Errors
    ///
    /// See [`Coordinator::administer_table`].
    pub fn block_table(&mut self, table: TableId, actor: &Actor) -> Result<ExecutionResult> {
        self.administer_table(TableAdminOptions::new(table, TableAdminAction::Block, actor.clone()))
    }

    /// Returns a blocked table to service.
    ///
    /// # Errors
    ///
    /// See [`Coordinator::administer_table`].
    pub fn unblock_table(&mut self, table: TableId, actor: &Actor) -> Result<ExecutionResult> {
        self.administer_table(TableAdminOptions::new(
            table,
            TableAdminAction::Unblock,
            actor.clone(),
        ))
    }

    /// Marks a cleaned table, and the rest of its group, ready.
    ///
    /// # Errors
    ///
    /// See [`Coordinator::administer_table`].
    pub fn finish_cleaning(&mut self, table: TableId, actor: &Actor) -> Result<ExecutionResult> {
        self.administer_table(TableAdminOptions::new(
            table,
            TableAdminAction::FinishCleaning,
            actor.clone(),
        ))
    }

    /// Puts a table on or takes it off the floor plan.
    ///
    /// # Errors
    ///
    /// See [`Coordinator::administer_table`].
    pub fn set_table_active(
        &mut self,
        table: TableId,
        active: bool,
        actor: &Actor,
    ) -> Result<ExecutionResult> {
        let action = if active {
            TableAdminAction::Activate
        } else {
            TableAdminAction::Deactivate
        };
        self.administer_table(TableAdminOptions::new(table, action, actor.clone()))
    }

    // Availability and assignment

    /// Ranked tables and table groups able to seat a party.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfServiceHours`] or a validation error for a bad
    /// request, or a database error.
    pub fn find_candidate_tables(&self, request: &AvailabilityRequest) -> Result<Vec<Candidate>> {
        AvailabilityCalculator::new(&self.settings)
            .find_candidate_tables(self.db.connection(), request)
    }

    /// Assigns tables to a reservation.
    ///
    /// # Errors
    ///
    /// See [`AssignPlan::build_plan`].
    pub fn assign(&mut self, options: AssignOptions) -> Result<AssignmentResult> {
        let actor = options.actor.clone();
        let dry_run = options.dry_run;
        let (planned, _) = self.run(&actor, dry_run, |conn, settings, _| {
            AssignPlan::new(options, settings).build_plan(conn)
        })?;
        Ok(planned.outcome)
    }

    /// Assigns tables without forcing.
    ///
    /// # Errors
    ///
    /// See [`AssignPlan::build_plan`].
    pub fn assign_tables(
        &mut self,
        reservation: ReservationId,
        tables: Vec<TableId>,
        actor: &Actor,
    ) -> Result<AssignmentResult> {
        self.assign(AssignOptions::new(reservation, tables, actor.clone()))
    }

    /// Releases a reservation's tables.
    ///
    /// # Errors
    ///
    /// See [`ReleasePlan::build_plan`].
    pub fn release(&mut self, options: ReleaseOptions) -> Result<ExecutionResult> {
        let actor = options.actor.clone();
        let dry_run = options.dry_run;
        let (_, execution) = self.run(&actor, dry_run, |conn, _, _| {
            ReleasePlan::new(options).build_plan(conn)
        })?;
        Ok(execution)
    }

    // Reservations

    /// Stores a new reservation.
    ///
    /// Web bookings count against the rate limit of their phone, or email
    /// when no phone is given. Dry runs and rejected requests are not
    /// counted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RateLimited`] when the contact is over its limit,
    /// or see [`IntakePlan::build_plan`].
    pub fn create_reservation(&mut self, options: IntakeOptions) -> Result<IntakeResult> {
        let request = &options.request;
        let limited_key = (request.origin == Origin::Web && !options.dry_run)
            .then(|| request.rate_limit_key(&self.settings.default_country_code))
            .flatten();
        if let Some(key) = &limited_key {
            self.limiter.check(key, self.clock.now())?;
        }

        let actor = options.actor.clone();
        let dry_run = options.dry_run;
        let (planned, execution) = self.run(&actor, dry_run, |conn, settings, now| {
            IntakePlan::new(options, settings).build_plan(conn, now)
        })?;
        // only stored bookings count against the limit
        if let Some(key) = &limited_key {
            self.limiter.record(key, self.clock.now());
        }
        Ok(IntakeResult::new(planned, &execution))
    }

    /// Applies a lifecycle event.
    ///
    /// # Errors
    ///
    /// See [`TransitionPlan::build_plan`].
    pub fn transition(&mut self, options: TransitionOptions) -> Result<TransitionResult> {
        let actor = options.actor.clone();
        let dry_run = options.dry_run;
        let (planned, execution) = self.run(&actor, dry_run, |conn, settings, _| {
            TransitionPlan::new(options, settings).build_plan(conn)
        })?;
        Ok(TransitionResult::new(&planned, &execution))
    }

    fn fire(
        &mut self,
        reservation: ReservationId,
        event: ReservationEvent,
        actor: &Actor,
    ) -> Result<TransitionResult> {
        self.transition(TransitionOptions::new(reservation, event, actor.clone()))
    }

    /// Confirms a pending reservation.
    ///
    /// # Errors
    ///
    /// See [`TransitionPlan::build_plan`].
    pub fn confirm(&mut self, reservation: ReservationId, actor: &Actor) -> Result<TransitionResult> {
        self.fire(reservation, ReservationEvent::Confirm, actor)
    }

    /// Cancels a reservation and releases its tables.
    ///
    /// # Errors
    ///
    /// See [`TransitionPlan::build_plan`].
    pub fn cancel(&mut self, reservation: ReservationId, actor: &Actor) -> Result<TransitionResult> {
        self.fire(reservation, ReservationEvent::Cancel, actor)
    }

    /// Seats a confirmed reservation.
    ///
    /// # Errors
    ///
    /// See [`TransitionPlan::build_plan`].
    pub fn seat(&mut self, reservation: ReservationId, actor: &Actor) -> Result<TransitionResult> {
        self.fire(reservation, ReservationEvent::Seat, actor)
    }

    /// Completes a seated reservation; its tables go to cleaning.
    ///
    /// # Errors
    ///
    /// See [`TransitionPlan::build_plan`].
    pub fn complete(&mut self, reservation: ReservationId, actor: &Actor) -> Result<TransitionResult> {
        self.fire(reservation, ReservationEvent::Complete, actor)
    }

    /// Marks a reservation as a no-show and releases its tables.
    ///
    /// # Errors
    ///
    /// See [`TransitionPlan::build_plan`].
    pub fn mark_no_show(
        &mut self,
        reservation: ReservationId,
        actor: &Actor,
    ) -> Result<TransitionResult> {
        self.fire(reservation, ReservationEvent::MarkNoShow, actor)
    }

    /// Loads a reservation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReservationNotFound`] if it does not exist.
    pub fn reservation(&self, id: ReservationId) -> Result<Reservation> {
        Database::require_reservation(self.db.connection(), id)
    }

    /// Reservations on `date`, or all of them.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn reservations(&self, date: Option<NaiveDate>) -> Result<Vec<Reservation>> {
        Database::list_reservations(self.db.connection(), date)
    }

    // Customers

    /// Looks up customers by contact data.
    ///
    /// # Errors
    ///
    /// See [`check_customer_existence`].
    pub fn check_customer_existence(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<ExistenceResult> {
        check_customer_existence(
            self.db.connection(),
            email,
            phone,
            &self.settings.default_country_code,
        )
    }

    /// Persists a conflict resolution.
    ///
    /// # Errors
    ///
    /// See [`ResolvePlan::build_plan`]; a customer changed since detection
    /// fails with [`Error::StaleState`].
    pub fn apply_resolution(&mut self, options: ResolveOptions) -> Result<ResolutionOutcome> {
        let actor = options.actor.clone();
        let dry_run = options.dry_run;
        let (planned, execution) = self.run(&actor, dry_run, |conn, settings, now| {
            ResolvePlan::new(options, settings).build_plan(conn, now)
        })?;
        let mut outcome = planned.outcome;
        if outcome.customer.is_none() {
            outcome.customer = execution.created_customer;
        }
        Ok(outcome)
    }

    /// Loads a customer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CustomerNotFound`] if it does not exist.
    pub fn customer(&self, id: CustomerId) -> Result<Customer> {
        Database::require_customer(self.db.connection(), id)
    }

    /// Recorded state changes of a table, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the audit log cannot be read.
    pub fn table_history(&self, table: TableId) -> Result<Vec<TableStateLog>> {
        self.audit.history(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{MemoryAuditSink, MockAuditSink};
    use crate::clock::{FixedClock, MockClock};
    use crate::database::test_util::{at, create_test_database};
    use crate::operations::ReservationRequest;
    use crate::reservation::ReservationStatus;
    use crate::table::TableStatus;

    fn manager() -> Actor {
        Actor::new("marta", Role::Manager)
    }

    fn coordinator() -> Coordinator<FixedClock, MemoryAuditSink> {
        Coordinator::new(
            create_test_database(),
            &Config::default(),
            FixedClock::new(at(10, 0)),
            MemoryAuditSink::new(),
        )
    }

    fn floor<C: Clock, A: AuditSink>(mesa: &mut Coordinator<C, A>) -> Vec<Table> {
        let zone = mesa.add_zone(&Zone::new("hall", "Salón", 40).unwrap(), &manager()).unwrap();
        (1..=3)
            .map(|n| {
                let table = Table::builder(n, zone.id, 4).build().unwrap();
                mesa.add_table(&table, &manager()).unwrap()
            })
            .collect()
    }

    fn book<C: Clock, A: AuditSink>(mesa: &mut Coordinator<C, A>, hour: u32) -> ReservationId {
        let start = at(hour, 0);
        let request = ReservationRequest::new("Lucía", 4, start.date(), start.time())
            .with_phone("600111222")
            .with_origin(Origin::Phone);
        mesa.create_reservation(IntakeOptions::new(request, manager()))
            .unwrap()
            .reservation
            .id()
    }

    #[test]
    fn test_full_lifecycle_is_audited() {
        let mut mesa = coordinator();
        let tables = floor(&mut mesa);
        let id = book(&mut mesa, 14);
        let host = Actor::new("ana", Role::Host);

        mesa.assign_tables(id, vec![tables[0].id], &host).unwrap();
        mesa.seat(id, &host).unwrap();
        mesa.complete(id, &host).unwrap();
        mesa.finish_cleaning(tables[0].id, &host).unwrap();

        let statuses: Vec<TableStatus> = mesa
            .table_history(tables[0].id)
            .unwrap()
            .iter()
            .map(|entry| entry.new_state.status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                TableStatus::Reserved,
                TableStatus::Occupied,
                TableStatus::Cleaning,
                TableStatus::Free
            ]
        );
        assert_eq!(mesa.reservation(id).unwrap().status(), ReservationStatus::Completed);
    }

    #[test]
    fn test_duplicate_zone_and_table_are_rejected() {
        let mut mesa = coordinator();
        let tables = floor(&mut mesa);

        let err = mesa
            .add_zone(&Zone::new("hall", "Otro", 10).unwrap(), &manager())
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        let again = Table::builder(1, tables[0].zone_id, 2).build().unwrap();
        let err = mesa.add_table(&again, &manager()).unwrap_err();
        assert!(matches!(err, Error::Validation { field, .. } if field == "number"));

        let host = Actor::new("ana", Role::Host);
        let err = mesa.add_table(&again, &host).unwrap_err();
        assert!(matches!(err, Error::Forbidden { .. }));
    }

    #[test]
    fn test_web_bookings_are_rate_limited() {
        let config = Config {
            rate_limit: Some(crate::config::RateLimitConfig {
                max_requests: Some(2),
                window_seconds: Some(600),
            }),
            ..Config::default()
        };
        let mut mesa = Coordinator::new(
            create_test_database(),
            &config,
            FixedClock::new(at(10, 0)),
            MemoryAuditSink::new(),
        );
        let web = Actor::system("web");
        let start = at(21, 0);
        let request = || {
            ReservationRequest::new("Lucía", 2, start.date(), start.time()).with_phone("600111222")
        };

        mesa.create_reservation(IntakeOptions::new(request(), web.clone())).unwrap();
        mesa.create_reservation(IntakeOptions::new(request(), web.clone())).unwrap();
        let err = mesa
            .create_reservation(IntakeOptions::new(request(), web.clone()))
            .unwrap_err();
        assert!(matches!(err, Error::RateLimited { .. }));

        // staff-entered bookings are not limited
        let phone = request().with_origin(Origin::Phone);
        mesa.create_reservation(IntakeOptions::new(phone, web.clone())).unwrap();

        mesa.clock().advance(chrono::Duration::minutes(11));
        mesa.create_reservation(IntakeOptions::new(request(), web)).unwrap();
    }

    #[test]
    fn test_rejected_web_bookings_do_not_use_the_quota() {
        let config = Config {
            rate_limit: Some(crate::config::RateLimitConfig {
                max_requests: Some(1),
                window_seconds: Some(600),
            }),
            ..Config::default()
        };
        let mut mesa = Coordinator::new(
            create_test_database(),
            &config,
            FixedClock::new(at(10, 0)),
            MemoryAuditSink::new(),
        );
        let web = Actor::system("web");
        let request = |start: NaiveDateTime| {
            ReservationRequest::new("Lucía", 2, start.date(), start.time()).with_phone("600111222")
        };

        for start in [at(17, 30), at(9, 0)] {
            let err = mesa
                .create_reservation(IntakeOptions::new(request(start), web.clone()))
                .unwrap_err();
            assert!(!matches!(err, Error::RateLimited { .. }));
        }

        mesa.create_reservation(IntakeOptions::new(request(at(21, 0)), web.clone()))
            .unwrap();
        let err = mesa
            .create_reservation(IntakeOptions::new(request(at(21, 30)), web))
            .unwrap_err();
        assert!(matches!(err, Error::RateLimited { .. }));
    }

    #[test]
    fn test_dry_run_leaves_no_trace() {
        let mut mesa = coordinator();
        let tables = floor(&mut mesa);
        let id = book(&mut mesa, 14);

        let result = mesa
            .assign(AssignOptions::new(id, vec![tables[1].id], manager()).with_dry_run(true))
            .unwrap();
        assert!(result.dry_run);
        assert!(mesa.reservation(id).unwrap().tables().is_empty());
        assert!(mesa.audit().is_empty());
    }

    #[test]
    fn test_idempotent_assign_does_not_touch_the_audit_sink() {
        let mut audit = MockAuditSink::new();
        audit.expect_append().times(1).returning(|_| Ok(()));
        let mut clock = MockClock::new();
        clock.expect_now().returning(|| at(10, 0));

        let mut mesa = Coordinator::new(create_test_database(), &Config::default(), clock, audit);
        let tables = floor(&mut mesa);
        let id = book(&mut mesa, 14);

        let first = mesa.assign_tables(id, vec![tables[2].id], &manager()).unwrap();
        assert!(!first.unchanged);
        let second = mesa.assign_tables(id, vec![tables[2].id], &manager()).unwrap();
        assert!(second.unchanged);
    }

    #[test]
    fn test_failed_operation_rolls_back() {
        let mut mesa = coordinator();
        let tables = floor(&mut mesa);
        let id = book(&mut mesa, 14);
        let other = book(&mut mesa, 14);
        mesa.assign_tables(id, vec![tables[0].id], &manager()).unwrap();

        let err = mesa
            .assign_tables(other, vec![tables[0].id], &manager())
            .unwrap_err();
        assert!(matches!(err, Error::TableUnavailable { .. }));
        assert!(mesa.reservation(other).unwrap().tables().is_empty());
        assert_eq!(mesa.audit().len(), 1);
    }
}
