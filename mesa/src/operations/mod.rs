//! Reservation operations using the plan-execute pattern.
//!
//! Every mutating operation is split into two phases:
//! 1. **Planning**: reads current state, checks roles and business rules,
//!    and builds an [`OperationPlan`] of version-checked writes
//! 2. **Execution**: a [`PlanExecutor`] applies the plan inside a
//!    transaction and reports the table state changes for the audit log
//!
//! Planning never writes, which is what makes `--dry-run` and the error
//! messages cheap: a rejected request fails before any action is produced.
//!
//! # Examples
//!
//! ```no_run
//! use chrono::{Local, NaiveDate, NaiveTime};
//! use mesa::config::Settings;
//! use mesa::database::{Database, DatabaseConfig};
//! use mesa::operations::{
//!     AssignOptions, AssignPlan, IntakeOptions, IntakePlan, PlanExecutor, ReservationRequest,
//! };
//! use mesa::{Actor, Origin, Role, TableId};
//!
//! let mut db = Database::open(DatabaseConfig::new("/tmp/mesa.db")).unwrap();
//! let settings = Settings::default();
//! let host = Actor::new("ana", Role::Host);
//! let now = Local::now().naive_local();
//!
//! let request = ReservationRequest::new(
//!     "Lucía Pérez",
//!     4,
//!     NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
//!     NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
//! )
//! .with_phone("600 123 456")
//! .with_origin(Origin::Phone);
//!
//! // Plan and store the booking
//! let tx = db.begin_immediate().unwrap();
//! let planned = IntakePlan::new(IntakeOptions::new(request, host.clone()), &settings)
//!     .build_plan(&tx, now)
//!     .unwrap();
//! let created = PlanExecutor::new(&tx, &host, now).execute(&planned.plan).unwrap();
//! tx.commit().unwrap();
//!
//! // Put it on table 1
//! let reservation = created.created_reservation.unwrap();
//! let tx = db.begin_immediate().unwrap();
//! let options = AssignOptions::new(reservation, vec![TableId(1)], host.clone());
//! let planned = AssignPlan::new(options, &settings).build_plan(&tx).unwrap();
//! PlanExecutor::new(&tx, &host, now).execute(&planned.plan).unwrap();
//! tx.commit().unwrap();
//! ```

pub mod admin;
pub mod assign;
pub mod availability;
pub mod conflict;
pub mod executor;
pub mod init;
pub mod intake;
pub mod lifecycle;
pub mod plan;
pub mod release;

#[cfg(test)]
mod proptests;

pub use admin::{TableAdminAction, TableAdminOptions, TableAdminPlan};
pub use assign::{AssignOptions, AssignPlan, AssignmentResult, PlannedAssignment};
pub use availability::{rank_candidates, AvailabilityCalculator, AvailabilityRequest, Candidate};
pub use conflict::{
    check_customer_existence, merge_customers, resolve_conflict, ExistenceResult, MatchedBy,
    PlannedResolution, ReconciliationItem, Resolution, ResolutionOutcome, ResolveOptions,
    ResolvePlan, ResolvedCustomers,
};
pub use executor::{ExecutionResult, PlanExecutor};
pub use init::{init_data_dir, InitOptions, InitResult};
pub use intake::{
    CustomerDecision, IntakeOptions, IntakeOutcome, IntakePlan, IntakeResult, PlannedIntake,
    ReservationRequest,
};
pub use lifecycle::{PlannedTransition, TransitionOptions, TransitionPlan, TransitionResult};
pub use plan::{CustomerRef, OperationPlan, PlanAction};
pub use release::{ReleaseOptions, ReleasePlan};
