//! CLI command implementations.
//!
//! This module contains the implementations of all CLI commands:
//! - `init`: Create the data directory and database
//! - `zone`: Add, list, enable and disable dining zones
//! - `table`: Add and list tables, block them, finish cleaning
//! - `reserve`: Take a booking
//! - `availability`: Find tables able to seat a party
//! - `assign`: Put a reservation on tables
//! - `release`: Take a reservation off its tables
//! - `transition`: `confirm`, `cancel`, `seat`, `complete`, `no-show`
//! - `customer`: Look up customers and resolve contact conflicts
//! - `list`: List reservations
//! - `history`: Show a table's state log
//! - `completions`: Generate shell completions

pub mod assign;
pub mod availability;
pub mod completions;
pub mod customer;
pub mod history;
pub mod init;
pub mod list;
pub mod release;
pub mod reserve;
pub mod table;
pub mod transition;
pub mod zone;

pub use assign::AssignCommand;
pub use availability::AvailabilityCommand;
pub use completions::CompletionsCommand;
pub use customer::CustomerCommand;
pub use history::HistoryCommand;
pub use init::InitCommand;
pub use list::ListCommand;
pub use release::ReleaseCommand;
pub use reserve::ReserveCommand;
pub use table::TableCommand;
pub use transition::TransitionCommand;
pub use zone::ZoneCommand;
