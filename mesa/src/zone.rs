//! Dining zones.

use serde::{Deserialize, Serialize};

use crate::ids::ZoneId;
use crate::reservation::ValidationError;

/// A named area of the floor (terrace, main hall, private room).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Row id.
    pub id: ZoneId,
    /// Short unique code, e.g. `terrace`.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Nominal seat count.
    pub capacity: u32,
    /// Inactive zones take no preference matches.
    pub active: bool,
}

impl Zone {
    /// Creates an unsaved active zone.
    ///
    /// The code is trimmed and lowercased.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the code or name is empty, or the code
    /// contains whitespace.
    ///
    /// # Examples
    ///
    /// ```
    /// use mesa::Zone;
    ///
    /// let zone = Zone::new(" Terrace ", "Terraza", 24).unwrap();
    /// assert_eq!(zone.code, "terrace");
    /// assert!(Zone::new("main hall", "Salón", 40).is_err());
    /// ```
    pub fn new(
        code: impl AsRef<str>,
        name: impl Into<String>,
        capacity: u32,
    ) -> Result<Self, ValidationError> {
        let code = code.as_ref().trim().to_lowercase();
        if code.is_empty() {
            return Err(ValidationError::new("code", "must not be empty"));
        }
        if code.chars().any(char::is_whitespace) {
            return Err(ValidationError::new("code", "must not contain whitespace"));
        }
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::new("name", "must not be empty"));
        }
        Ok(Self {
            id: ZoneId::UNSAVED,
            code,
            name,
            capacity,
            active: true,
        })
    }
}
