//! Strongly-typed row identifiers.

use serde::{Deserialize, Serialize};

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Placeholder id carried by records that have not been stored yet.
            pub const UNSAVED: Self = Self(0);

            /// Returns the raw row id.
            #[must_use]
            pub const fn value(self) -> i64 {
                self.0
            }

            /// Whether this id was assigned by the database.
            #[must_use]
            pub const fn is_saved(self) -> bool {
                self.0 > 0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "#{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

row_id!(
    /// Identifier of a dining zone.
    ZoneId
);
row_id!(
    /// Identifier of a physical table.
    TableId
);
row_id!(
    /// Identifier of a reservation.
    ReservationId
);
row_id!(
    /// Identifier of a customer record.
    CustomerId
);
