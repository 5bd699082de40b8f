//! Staff roles and the actors that carry them.
//!
//! Roles form a total order, so "at least manager" is a comparison rather
//! than a table lookup.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Staff role, ordered from least to most privileged.
///
/// # Examples
///
/// ```
/// use mesa::Role;
///
/// assert!(Role::Viewer < Role::Host);
/// assert!(Role::Admin.at_least(Role::Manager));
/// assert!(!Role::Host.at_least(Role::Manager));
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Read-only access to the floor plan and bookings.
    #[default]
    Viewer,
    /// Front-of-house staff: books, assigns and seats.
    Host,
    /// Shift manager: may override overlaps and merge customers.
    Manager,
    /// Full administrative access.
    Admin,
}

impl Role {
    /// All roles in ascending order.
    pub const ALL: [Self; 4] = [Self::Viewer, Self::Host, Self::Manager, Self::Admin];

    /// Whether this role meets `minimum`.
    #[must_use]
    pub fn at_least(self, minimum: Self) -> bool {
        self >= minimum
    }

    /// Returns the role name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Host => "host",
            Self::Manager => "manager",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Validation {
                field: "role".into(),
                message: format!("unknown role '{s}'"),
            })
    }
}

/// Who is performing an operation.
///
/// The core does not authenticate actors; it only records them in the audit
/// log and checks their role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Opaque identifier recorded in audit entries.
    pub id: String,
    /// The actor's role.
    pub role: Role,
}

impl Actor {
    /// Creates an actor.
    #[must_use]
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    /// Actor used for unattended channels such as the public booking form.
    #[must_use]
    pub fn system(channel: &str) -> Self {
        Self::new(format!("system:{channel}"), Role::Host)
    }

    /// Fails with [`Error::Forbidden`] unless the actor meets `minimum`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] when the role is below `minimum`.
    ///
    /// # Examples
    ///
    /// ```
    /// use mesa::{Actor, Role};
    ///
    /// let host = Actor::new("ana", Role::Host);
    /// assert!(host.require(Role::Host, "assign tables").is_ok());
    /// assert!(host.require(Role::Manager, "force an assignment").is_err());
    /// ```
    pub fn require(&self, minimum: Role, action: &'static str) -> Result<()> {
        if self.role.at_least(minimum) {
            Ok(())
        } else {
            Err(Error::Forbidden {
                actor: self.id.clone(),
                role: self.role,
                required: minimum,
                action,
            })
        }
    }
}
