//! Plan types for coordination operations.
//!
//! A plan lists the writes an operation will make, in order, without making
//! them. Every write carries the version it was planned against, so a plan
//! built outside the transaction that executes it fails cleanly instead of
//! overwriting newer state.

use crate::customer::Customer;
use crate::ids::{CustomerId, ReservationId, TableId};
use crate::reservation::{Reservation, ReservationStatus};
use crate::table::TableState;

/// Which customer a new or updated reservation points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerRef {
    /// No customer record.
    None,
    /// A stored customer.
    Existing(CustomerId),
    /// The customer created by the plan's preceding `CreateCustomer` action.
    Created,
}

/// A single write performed during plan execution.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanAction {
    /// Move a table to a new status and fusion state.
    UpdateTableState {
        /// The table.
        table: TableId,
        /// Its floor number, for messages and audit records.
        number: u32,
        /// State the plan was computed from.
        from: TableState,
        /// State to write.
        to: TableState,
        /// Version the plan was computed from.
        expected_version: i64,
        /// Reservation driving the change, if any.
        reservation: Option<ReservationId>,
    },

    /// Activate or deactivate a table.
    SetTableActive {
        /// The table.
        table: TableId,
        /// Its floor number.
        number: u32,
        /// New flag.
        active: bool,
        /// Version the plan was computed from.
        expected_version: i64,
    },

    /// Replace the set of tables assigned to a reservation.
    SetReservationTables {
        /// The reservation.
        reservation: ReservationId,
        /// New table set, empty to release.
        tables: Vec<TableId>,
        /// Floor numbers of `tables`.
        numbers: Vec<u32>,
        /// Version the plan was computed from.
        expected_version: i64,
    },

    /// Move a reservation along its lifecycle.
    UpdateReservationStatus {
        /// The reservation.
        reservation: ReservationId,
        /// Status the plan was computed from.
        from: ReservationStatus,
        /// Status to write.
        to: ReservationStatus,
        /// Version the plan was computed from.
        expected_version: i64,
    },

    /// Store a new reservation.
    CreateReservation {
        /// The reservation to insert.
        reservation: Box<Reservation>,
        /// Customer to link.
        customer: CustomerRef,
    },

    /// Point an existing reservation at a customer.
    LinkCustomer {
        /// The reservation.
        reservation: ReservationId,
        /// Customer to link.
        customer: CustomerRef,
        /// Version the plan was computed from.
        expected_version: i64,
    },

    /// Store a new customer.
    CreateCustomer(Box<Customer>),

    /// Overwrite a stored customer (compare-and-swap on its version).
    UpdateCustomer(Box<Customer>),

    /// Mark a customer as merged into another.
    SupersedeCustomer {
        /// The customer being retired.
        customer: CustomerId,
        /// The surviving customer.
        by: CustomerId,
        /// Version the plan was computed from.
        expected_version: i64,
    },
}

impl PlanAction {
    /// Returns a human-readable description of this action.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::UpdateTableState { number, from, to, .. } => {
                format!("Set table {number} from {from} to {to}")
            }
            Self::SetTableActive { number, active, .. } => {
                let verb = if *active { "Activate" } else { "Deactivate" };
                format!("{verb} table {number}")
            }
            Self::SetReservationTables {
                reservation,
                numbers,
                ..
            } => {
                if numbers.is_empty() {
                    format!("Release tables of reservation {reservation}")
                } else {
                    format!(
                        "Assign reservation {reservation} to table(s) {}",
                        join_numbers(numbers)
                    )
                }
            }
            Self::UpdateReservationStatus {
                reservation,
                from,
                to,
                ..
            } => format!("Move reservation {reservation} from {from} to {to}"),
            Self::CreateReservation {
                reservation,
                customer,
            } => {
                let mut text = format!(
                    "Create {} reservation for {} (party of {}, {})",
                    reservation.status(),
                    reservation.name(),
                    reservation.party_size(),
                    reservation.window()
                );
                match customer {
                    CustomerRef::Existing(id) => text.push_str(&format!(" linked to customer {id}")),
                    CustomerRef::Created => text.push_str(" linked to the new customer"),
                    CustomerRef::None => {}
                }
                text
            }
            Self::LinkCustomer {
                reservation,
                customer,
                ..
            } => match customer {
                CustomerRef::Existing(id) => {
                    format!("Link reservation {reservation} to customer {id}")
                }
                CustomerRef::Created | CustomerRef::None => {
                    format!("Link reservation {reservation} to the new customer")
                }
            },
            Self::CreateCustomer(customer) => format!("Create customer {}", customer.name),
            Self::UpdateCustomer(customer) => {
                format!("Update customer {} ({})", customer.id, customer.name)
            }
            Self::SupersedeCustomer { customer, by, .. } => {
                format!("Merge customer {customer} into {by}")
            }
        }
    }
}

pub(crate) fn join_numbers(numbers: &[u32]) -> String {
    numbers
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join("+")
}

/// A complete operation plan describing all actions to be taken.
///
/// # Examples
///
/// ```
/// use mesa::operations::OperationPlan;
///
/// let plan = OperationPlan::new("Seat reservation #4")
///     .add_warning("table 7 is still being cleaned");
/// assert!(plan.is_empty());
/// assert_eq!(plan.warnings.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct OperationPlan {
    /// A human-readable description of the operation.
    pub description: String,

    /// The sequence of actions to perform.
    pub actions: Vec<PlanAction>,

    /// Warnings to communicate to the user.
    pub warnings: Vec<String>,
}

impl OperationPlan {
    /// Creates a new operation plan with the given description.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            actions: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Adds an action to the plan.
    #[must_use]
    pub fn add_action(mut self, action: PlanAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Adds several actions to the plan, keeping their order.
    #[must_use]
    pub fn add_actions(mut self, actions: impl IntoIterator<Item = PlanAction>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Adds a warning to the plan.
    #[must_use]
    pub fn add_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Checks if the plan has no actions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Returns the number of actions in the plan.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }
}
