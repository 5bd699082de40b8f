//! Physical tables, their fusion state and their service status.
//!
//! Two independent axes describe a table:
//!
//! - [`FusionState`]: whether it stands alone, leads a group of combined
//!   tables, belongs to one, or is blocked by staff.
//! - [`TableStatus`]: where it is in the service cycle (free, reserved,
//!   occupied, being cleaned).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, UnavailableReason};
use crate::ids::{TableId, ZoneId};
use crate::reservation::ValidationError;

/// How a table relates to other tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FusionState {
    /// Standing alone.
    #[default]
    Individual,
    /// Leads a fusion group.
    FusionMaster,
    /// Belongs to the group led by `master`.
    FusionSlave {
        /// The group's master table.
        master: TableId,
    },
    /// Withdrawn by staff; accepts no assignment.
    Blocked,
}

impl FusionState {
    /// Stored name of the state, without the master reference.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::FusionMaster => "fusion_master",
            Self::FusionSlave { .. } => "fusion_slave",
            Self::Blocked => "blocked",
        }
    }

    /// Master reference to store alongside [`Self::as_str`].
    #[must_use]
    pub const fn master(self) -> Option<TableId> {
        match self {
            Self::FusionSlave { master } => Some(master),
            _ => None,
        }
    }

    /// Rebuilds the state from its stored columns.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unknown state name, or a slave
    /// without a master reference.
    pub fn from_columns(state: &str, master: Option<TableId>) -> Result<Self, ValidationError> {
        match (state, master) {
            ("individual", _) => Ok(Self::Individual),
            ("fusion_master", _) => Ok(Self::FusionMaster),
            ("fusion_slave", Some(master)) => Ok(Self::FusionSlave { master }),
            ("fusion_slave", None) => Err(ValidationError::new(
                "fusion_master",
                "fusion slave without a master",
            )),
            ("blocked", _) => Ok(Self::Blocked),
            (other, _) => Err(ValidationError::new(
                "fusion_state",
                format!("unknown fusion state '{other}'"),
            )),
        }
    }
}

impl fmt::Display for FusionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FusionSlave { master } => write!(f, "fusion_slave of {master}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Where a table is in the service cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    /// Nothing pending on it.
    #[default]
    Free,
    /// Held by a pending or confirmed reservation.
    Reserved,
    /// A party is seated.
    Occupied,
    /// Being reset after a party left.
    Cleaning,
}

impl TableStatus {
    /// Every status.
    pub const ALL: [Self; 4] = [Self::Free, Self::Reserved, Self::Occupied, Self::Cleaning];

    /// Returns the stored name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Reserved => "reserved",
            Self::Occupied => "occupied",
            Self::Cleaning => "cleaning",
        }
    }

    /// Floor-staff name of the status.
    #[must_use]
    pub const fn floor_name(self) -> &'static str {
        match self {
            Self::Free => "libre",
            Self::Reserved => "reservada",
            Self::Occupied => "ocupada",
            Self::Cleaning => "limpieza",
        }
    }
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableStatus {
    type Err = Error;

    /// Accepts both the stored and the floor-staff names.
    fn from_str(s: &str) -> crate::Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted || status.floor_name() == wanted)
            .ok_or_else(|| Error::Validation {
                field: "status".into(),
                message: format!("unknown table status '{s}'"),
            })
    }
}

/// Snapshot of both state axes, as recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableState {
    /// Service status.
    pub status: TableStatus,
    /// Fusion state.
    pub fusion: FusionState,
}

impl fmt::Display for TableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.status, self.fusion)
    }
}

/// A physical table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Row id.
    pub id: TableId,
    /// Number painted on the floor plan; unique.
    pub number: u32,
    /// Zone the table stands in.
    pub zone_id: ZoneId,
    /// Seats at the table alone.
    pub capacity: u32,
    /// Upper bound on the seats of a group this table leads.
    pub max_combined_capacity: u32,
    /// Whether the table may be joined to neighbours.
    pub combinable: bool,
    /// Inactive tables are out of service entirely.
    pub active: bool,
    /// Fusion state.
    pub fusion: FusionState,
    /// Service status.
    pub status: TableStatus,
    /// Optimistic-concurrency version.
    pub version: i64,
}

impl Table {
    /// Starts building an unsaved table.
    ///
    /// # Examples
    ///
    /// ```
    /// use mesa::{Table, ZoneId};
    ///
    /// let table = Table::builder(12, ZoneId(1), 4)
    ///     .combinable(true)
    ///     .max_combined_capacity(10)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(table.capacity, 4);
    /// assert!(table.fusion.as_str() == "individual");
    /// ```
    #[must_use]
    pub const fn builder(number: u32, zone_id: ZoneId, capacity: u32) -> TableBuilder {
        TableBuilder {
            number,
            zone_id,
            capacity,
            max_combined_capacity: None,
            combinable: false,
            active: true,
        }
    }

    /// Snapshot of the table's state.
    #[must_use]
    pub const fn state(&self) -> TableState {
        TableState {
            status: self.status,
            fusion: self.fusion,
        }
    }

    /// Why the table cannot take a new assignment, regardless of time.
    ///
    /// Fusion is not a standing issue: a group belongs to the reservations
    /// holding it, and other services may still use its tables.
    #[must_use]
    pub const fn standing_issue(&self) -> Option<UnavailableReason> {
        if !self.active {
            return Some(UnavailableReason::Inactive);
        }
        match self.fusion {
            FusionState::Blocked => Some(UnavailableReason::Blocked),
            _ => None,
        }
    }

    /// Whether the table currently belongs to a fusion group.
    #[must_use]
    pub const fn is_fused(&self) -> bool {
        matches!(
            self.fusion,
            FusionState::FusionMaster | FusionState::FusionSlave { .. }
        )
    }

    /// Master of the group the table belongs to.
    #[must_use]
    pub const fn group_master(&self) -> Option<TableId> {
        match self.fusion {
            FusionState::FusionMaster => Some(self.id),
            FusionState::FusionSlave { master } => Some(master),
            FusionState::Individual | FusionState::Blocked => None,
        }
    }
}

/// Effective seats of a selection of tables.
///
/// A single table seats its own capacity. A group seats the sum of its
/// members, clamped to the `max_combined_capacity` of its master, which is
/// the lowest-numbered member.
///
/// # Examples
///
/// ```
/// use mesa::{group_capacity, Table, ZoneId};
///
/// let a = Table::builder(1, ZoneId(1), 4).combinable(true).max_combined_capacity(6).build().unwrap();
/// let b = Table::builder(2, ZoneId(1), 4).combinable(true).build().unwrap();
/// assert_eq!(group_capacity(&[a.clone()]), 4);
/// assert_eq!(group_capacity(&[a, b]), 6);
/// ```
#[must_use]
pub fn group_capacity(tables: &[Table]) -> u32 {
    match tables {
        [] => 0,
        [single] => single.capacity,
        _ => {
            let sum: u32 = tables.iter().map(|t| t.capacity).sum();
            let cap = tables
                .iter()
                .min_by_key(|t| t.number)
                .map_or(sum, |master| master.max_combined_capacity);
            sum.min(cap)
        }
    }
}

/// Builder for new [`Table`]s.
#[derive(Debug, Clone)]
pub struct TableBuilder {
    number: u32,
    zone_id: ZoneId,
    capacity: u32,
    max_combined_capacity: Option<u32>,
    combinable: bool,
    active: bool,
}

impl TableBuilder {
    /// Sets the group ceiling when this table leads a fusion.
    #[must_use]
    pub const fn max_combined_capacity(mut self, seats: u32) -> Self {
        self.max_combined_capacity = Some(seats);
        self
    }

    /// Allows joining the table to neighbours.
    #[must_use]
    pub const fn combinable(mut self, combinable: bool) -> Self {
        self.combinable = combinable;
        self
    }

    /// Creates the table inactive.
    #[must_use]
    pub const fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Validates and builds the table.
    ///
    /// `max_combined_capacity` defaults to the table's own capacity.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the number or capacity is zero, or the
    /// combined ceiling is below the table's own capacity.
    pub fn build(self) -> Result<Table, ValidationError> {
        if self.number == 0 {
            return Err(ValidationError::new("number", "must be at least 1"));
        }
        if self.capacity == 0 {
            return Err(ValidationError::new("capacity", "must be at least 1"));
        }
        let max_combined = self.max_combined_capacity.unwrap_or(self.capacity);
        if max_combined < self.capacity {
            return Err(ValidationError::new(
                "max_combined_capacity",
                format!(
                    "{max_combined} is below the table's own capacity {}",
                    self.capacity
                ),
            ));
        }
        Ok(Table {
            id: TableId::UNSAVED,
            number: self.number,
            zone_id: self.zone_id,
            capacity: self.capacity,
            max_combined_capacity: max_combined,
            combinable: self.combinable,
            active: self.active,
            fusion: FusionState::Individual,
            status: TableStatus::Free,
            version: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(number: u32, capacity: u32) -> Table {
        let mut t = Table::builder(number, ZoneId(1), capacity)
            .combinable(true)
            .max_combined_capacity(capacity * 3)
            .build()
            .unwrap();
        t.id = TableId(i64::from(number));
        t
    }

    #[test]
    fn test_builder_validation() {
        assert!(Table::builder(0, ZoneId(1), 4).build().is_err());
        assert!(Table::builder(1, ZoneId(1), 0).build().is_err());
        let err = Table::builder(1, ZoneId(1), 4)
            .max_combined_capacity(3)
            .build()
            .unwrap_err();
        assert_eq!(err.field, "max_combined_capacity");

        let t = Table::builder(1, ZoneId(1), 4).build().unwrap();
        assert_eq!(t.max_combined_capacity, 4);
        assert!(!t.combinable);
    }

    #[test]
    fn test_group_capacity_clamps_to_master() {
        let mut a = table(3, 4);
        a.max_combined_capacity = 7;
        let b = table(4, 4);
        // Master is the lowest number regardless of slice order.
        assert_eq!(group_capacity(&[b.clone(), a.clone()]), 7);
        assert_eq!(group_capacity(&[]), 0);
        assert_eq!(group_capacity(&[b]), 4);
    }

    #[test]
    fn test_standing_issue() {
        let mut t = table(1, 2);
        assert_eq!(t.standing_issue(), None);

        t.fusion = FusionState::Blocked;
        assert_eq!(t.standing_issue(), Some(UnavailableReason::Blocked));

        t.fusion = FusionState::FusionSlave { master: TableId(9) };
        assert_eq!(t.standing_issue(), None);
        assert!(t.is_fused());
        assert_eq!(t.group_master(), Some(TableId(9)));

        t.fusion = FusionState::FusionMaster;
        assert_eq!(t.group_master(), Some(t.id));

        t.fusion = FusionState::Individual;
        t.active = false;
        assert_eq!(t.standing_issue(), Some(UnavailableReason::Inactive));
    }

    #[test]
    fn test_fusion_columns_round_trip() {
        for state in [
            FusionState::Individual,
            FusionState::FusionMaster,
            FusionState::FusionSlave { master: TableId(4) },
            FusionState::Blocked,
        ] {
            let back = FusionState::from_columns(state.as_str(), state.master()).unwrap();
            assert_eq!(back, state);
        }
        assert!(FusionState::from_columns("fusion_slave", None).is_err());
        assert!(FusionState::from_columns("merged", None).is_err());
    }

    #[test]
    fn test_status_accepts_floor_names() {
        assert_eq!("libre".parse::<TableStatus>().unwrap(), TableStatus::Free);
        assert_eq!("Ocupada".parse::<TableStatus>().unwrap(), TableStatus::Occupied);
        assert_eq!("cleaning".parse::<TableStatus>().unwrap(), TableStatus::Cleaning);
        assert!("dirty".parse::<TableStatus>().is_err());
    }
}
