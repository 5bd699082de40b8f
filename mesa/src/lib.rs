#![deny(missing_docs, unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! # mesa
//!
//! Coordination core for restaurant table reservations.
//!
//! This library decides which tables can seat a party, assigns and fuses
//! tables without double-booking, detects customers whose email and phone
//! point at different records, and moves reservations through their
//! lifecycle while keeping table state consistent.
//!
//! ## Core Types
//!
//! - [`Table`], [`Zone`] and [`Reservation`]: the floor and the bookings on it
//! - [`Customer`] and [`ContactInfo`]: guests and the contact data that
//!   identifies them
//! - [`Coordinator`]: runs every operation in one transaction with injected
//!   [`clock::Clock`], [`audit::AuditSink`] and rate-limit counters
//! - [`operations`]: the plan-execute operations behind the coordinator
//! - [`Error`] and [`Result`]: error handling types
//! - [`Logger`] and [`LogLevel`]: logging infrastructure
//!
//! ## Examples
//!
//! ```
//! use chrono::{NaiveDate, NaiveTime};
//! use mesa::{ReservationStatus, TimeWindow};
//!
//! let date = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
//! let lunch = TimeWindow::starting_at(date, NaiveTime::from_hms_opt(14, 0, 0).unwrap(), 90);
//! let overlapping = TimeWindow::starting_at(date, NaiveTime::from_hms_opt(14, 30, 0).unwrap(), 90);
//!
//! // a table cannot hold both
//! assert!(lunch.conflicts_with(&overlapping, 15));
//! assert!(ReservationStatus::Pending.is_active());
//! ```

pub mod audit;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod customer;
pub mod database;
pub mod error;
pub mod ids;
pub mod logging;
pub mod operations;
pub mod ratelimit;
pub mod reservation;
pub mod role;
pub mod table;
pub mod zone;

// Re-export key types at crate root for convenience
pub use audit::{AuditSink, JsonLinesAuditSink, MemoryAuditSink, TableStateLog};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{Config, ConfigBuilder, Settings};
pub use coordinator::Coordinator;
pub use customer::{normalize_email, normalize_phone, ContactInfo, Customer};
pub use database::{Database, DatabaseConfig};
pub use error::{Error, Result, UnavailableReason};
pub use ids::{CustomerId, ReservationId, TableId, ZoneId};
pub use logging::{init_logger, install_logger, LogLevel, Logger};
pub use operations::{ExecutionResult, OperationPlan, PlanAction, PlanExecutor};
pub use ratelimit::{CounterStore, MemoryCounterStore, RateLimiter};
pub use reservation::{
    Origin, Reservation, ReservationEvent, ReservationStatus, TimeWindow, ValidationError,
};
pub use role::{Actor, Role};
pub use table::{group_capacity, FusionState, Table, TableState, TableStatus};
pub use zone::Zone;
