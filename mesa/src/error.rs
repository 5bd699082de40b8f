//! Error types for the mesa library.
//!
//! Business-rule violations (a table is taken, a party does not fit, a
//! transition is illegal) and infrastructure faults (the database is
//! unreachable, a file cannot be written) share one enum so callers can use
//! `?` everywhere. [`Error::is_business_rule`] tells the two apart.

use std::path::PathBuf;

use chrono::NaiveTime;
use thiserror::Error;

use crate::ids::{CustomerId, ReservationId, TableId};
use crate::reservation::{ReservationEvent, ReservationStatus, TimeWindow};
use crate::role::Role;

/// Result type alias for operations that may fail with a mesa error.
///
/// # Examples
///
/// ```
/// use mesa::{Error, Result};
///
/// fn example_operation() -> Result<u32> {
///     Ok(4)
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the mesa library.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested time is outside every configured service window.
    #[error("{time} is outside service hours ({windows})")]
    OutOfServiceHours {
        /// The requested start time.
        time: NaiveTime,
        /// The configured windows, rendered for display.
        windows: String,
    },

    /// A table cannot take the assignment.
    #[error("table {table_number} unavailable for {window}: {reason}")]
    TableUnavailable {
        /// The table's floor number.
        table_number: u32,
        /// Why the table cannot be used.
        reason: UnavailableReason,
        /// The window that was requested.
        window: TimeWindow,
    },

    /// The party does not fit the selected table or group.
    #[error(
        "party of {party_size} exceeds capacity {capacity} of table(s) {}",
        join_numbers(.tables)
    )]
    CapacityExceeded {
        /// Requested party size.
        party_size: u32,
        /// Effective capacity of the selection.
        capacity: u32,
        /// Floor numbers of the selected tables.
        tables: Vec<u32>,
    },

    /// A table that cannot be fused was selected as part of a group.
    #[error("table {table_number} cannot be combined with other tables")]
    NotCombinable {
        /// The offending table's floor number.
        table_number: u32,
    },

    /// The reservation does not exist.
    #[error("reservation {id} not found")]
    ReservationNotFound {
        /// The missing reservation.
        id: ReservationId,
    },

    /// The table does not exist.
    #[error("table {table} not found")]
    TableNotFound {
        /// Identifier or floor number that was looked up.
        table: String,
    },

    /// The zone does not exist.
    #[error("zone {zone} not found")]
    ZoneNotFound {
        /// Identifier or code that was looked up.
        zone: String,
    },

    /// The customer does not exist.
    #[error("customer {id} not found")]
    CustomerNotFound {
        /// The missing customer.
        id: CustomerId,
    },

    /// The reservation's state does not accept the event.
    #[error("cannot {event} a reservation that is {from}")]
    InvalidTransition {
        /// State the reservation is in.
        from: ReservationStatus,
        /// Event that was attempted.
        event: ReservationEvent,
    },

    /// Seating or completion was attempted without tables.
    #[error("cannot {event} reservation {reservation}: no table assigned")]
    NoTableAssigned {
        /// The reservation without tables.
        reservation: ReservationId,
        /// Event that was attempted.
        event: ReservationEvent,
    },

    /// A compare-and-swap lost against a concurrent writer.
    #[error("stale {entity} {id}: expected version {expected}, found {found}")]
    StaleState {
        /// Kind of entity ("reservation", "table", "customer").
        entity: &'static str,
        /// Entity identifier.
        id: i64,
        /// Version the caller based its change on.
        expected: i64,
        /// Version currently stored.
        found: i64,
    },

    /// A customer conflict was detected and no resolution was chosen.
    #[error(
        "customer conflict unresolved: email matches customer {email_match}, phone matches customer {phone_match}"
    )]
    ConflictUnresolved {
        /// Customer matched by email.
        email_match: CustomerId,
        /// Customer matched by phone.
        phone_match: CustomerId,
    },

    /// The actor lacks the role the operation needs.
    #[error("actor '{actor}' ({role}) is not allowed to {action}: requires {required}")]
    Forbidden {
        /// Actor identifier.
        actor: String,
        /// Actor's role.
        role: Role,
        /// Minimum role required.
        required: Role,
        /// Operation that was refused.
        action: &'static str,
    },

    /// Too many requests for one key inside the limiter window.
    #[error("rate limit exceeded for {key}; retry in {retry_after_secs}s")]
    RateLimited {
        /// The throttled key.
        key: String,
        /// Seconds until the window resets.
        retry_after_secs: i64,
    },

    /// A validation error occurred.
    #[error("validation error for '{field}': {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// A description of the validation failure.
        message: String,
    },

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A configuration file could not be parsed.
    #[error("configuration error: {0}")]
    Configuration(#[from] serde_yaml::Error),

    /// An audit record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An invalid filesystem path was provided.
    #[error("invalid path {}: {reason}", path.display())]
    InvalidPath {
        /// The invalid path.
        path: PathBuf,
        /// The reason the path is invalid.
        reason: String,
    },

    /// An unsupported schema version was encountered.
    #[error("unsupported schema version: expected {expected}, found {found}")]
    UnsupportedSchemaVersion {
        /// The expected schema version.
        expected: i32,
        /// The schema version found in the database.
        found: i32,
    },
}

/// Reason why a table cannot take an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    /// Another active reservation overlaps the window (buffer included).
    Overlap {
        /// The reservation holding the table.
        reservation: ReservationId,
    },
    /// The table is blocked by staff.
    Blocked,
    /// The table is deactivated.
    Inactive,
    /// The table is part of another fusion group.
    Fused {
        /// Master of the group the table belongs to.
        master: TableId,
    },
    /// The table stands in another zone than the rest of the group.
    OtherZone,
    /// The table does not follow the previous one in number order.
    NotAdjacent,
    /// The table seats the party alone and needs no group.
    SeatsPartyAlone,
    /// A smaller group already seats the party.
    GroupTooLarge,
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overlap { reservation } => write!(f, "overlaps reservation {reservation}"),
            Self::Blocked => write!(f, "blocked"),
            Self::Inactive => write!(f, "inactive"),
            Self::Fused { master } => write!(f, "fused into group of table {master}"),
            Self::OtherZone => write!(f, "in another zone than the rest of the group"),
            Self::NotAdjacent => write!(f, "not next to the previous table of the group"),
            Self::SeatsPartyAlone => write!(f, "seats the party alone"),
            Self::GroupTooLarge => write!(f, "a smaller group seats the party"),
        }
    }
}

fn join_numbers(numbers: &[u32]) -> String {
    numbers
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join("+")
}

impl From<crate::reservation::ValidationError> for Error {
    fn from(err: crate::reservation::ValidationError) -> Self {
        Self::Validation {
            field: err.field,
            message: err.message,
        }
    }
}

impl Error {
    /// Whether this error is an expected business-rule rejection rather than
    /// an infrastructure fault.
    ///
    /// # Examples
    ///
    /// ```
    /// use mesa::Error;
    ///
    /// let err = Error::Validation { field: "party_size".into(), message: "must be > 0".into() };
    /// assert!(err.is_business_rule());
    /// ```
    #[must_use]
    pub fn is_business_rule(&self) -> bool {
        !matches!(
            self,
            Self::Database(_)
                | Self::Configuration(_)
                | Self::Serialization(_)
                | Self::Io(_)
                | Self::InvalidPath { .. }
                | Self::UnsupportedSchemaVersion { .. }
        )
    }

    /// Whether a retry with fresh state might succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::StaleState { .. } | Self::RateLimited { .. } => true,
            Self::Database(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}
