//! Customer records and contact normalization.
//!
//! Customers are matched on exact normalized contact data, so every email
//! and phone goes through [`normalize_email`] or [`normalize_phone`] before
//! it is stored or compared.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::ids::CustomerId;
use crate::reservation::ValidationError;

/// A guest known to the restaurant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Row id.
    pub id: CustomerId,
    /// Full name.
    pub name: String,
    /// Normalized email.
    pub email: Option<String>,
    /// Normalized phone with country code.
    pub phone: Option<String>,
    /// VIP flag.
    pub vip: bool,
    /// Company the customer books for.
    pub company: Option<String>,
    /// Free-text staff notes.
    pub notes: Option<String>,
    /// Seating and menu preferences.
    pub preferences: Option<String>,
    /// Allergies and intolerances.
    pub allergies: Option<String>,
    /// Consent to marketing messages.
    pub marketing_opt_in: bool,
    /// Completed visits.
    pub visit_count: u32,
    /// Lifetime spend in cents.
    pub total_spend_cents: i64,
    /// Set when this record was merged into another.
    pub superseded_by: Option<CustomerId>,
    /// Creation time.
    pub created_at: NaiveDateTime,
    /// Last modification time.
    pub updated_at: NaiveDateTime,
    /// Optimistic-concurrency version.
    pub version: i64,
}

impl Customer {
    /// Creates an unsaved customer from incoming contact data.
    ///
    /// The contact must already be normalized.
    #[must_use]
    pub fn from_contact(contact: &ContactInfo, now: NaiveDateTime) -> Self {
        Self {
            id: CustomerId::UNSAVED,
            name: contact.name.clone(),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            vip: false,
            company: None,
            notes: None,
            preferences: None,
            allergies: None,
            marketing_opt_in: false,
            visit_count: 0,
            total_spend_cents: 0,
            superseded_by: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Whether the record was merged away.
    #[must_use]
    pub const fn is_superseded(&self) -> bool {
        self.superseded_by.is_some()
    }
}

/// Contact details supplied with a booking.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContactInfo {
    /// Name as given.
    pub name: String,
    /// Email, if given.
    pub email: Option<String>,
    /// Phone, if given.
    pub phone: Option<String>,
}

impl ContactInfo {
    /// Creates contact details.
    #[must_use]
    pub fn new(name: impl Into<String>, email: Option<String>, phone: Option<String>) -> Self {
        Self {
            name: name.into(),
            email,
            phone,
        }
    }

    /// Returns a copy with email and phone normalized and blanks dropped.
    ///
    /// # Errors
    ///
    /// Returns a validation error if either value is malformed.
    pub fn normalized(&self, default_country_code: &str) -> Result<Self, ValidationError> {
        let email = match self.email.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(normalize_email(raw)?),
            _ => None,
        };
        let phone = match self.phone.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(normalize_phone(raw, default_country_code)?),
            _ => None,
        };
        Ok(Self {
            name: self.name.trim().to_string(),
            email,
            phone,
        })
    }
}

/// Trims and lowercases an email address.
///
/// # Errors
///
/// Returns a validation error unless the address has a non-empty local part
/// and domain around a single `@`.
///
/// # Examples
///
/// ```
/// use mesa::normalize_email;
///
/// assert_eq!(normalize_email("  Ana.Lopez@Example.COM ").unwrap(), "ana.lopez@example.com");
/// assert!(normalize_email("not-an-email").is_err());
/// ```
pub fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(ValidationError::new(
            "email",
            format!("'{}' is not an email address", raw.trim()),
        ))
    }
}

/// Normalizes a phone number to `+<country><number>`.
///
/// Spaces, dashes, dots and parentheses are removed, a leading `00` becomes
/// `+`, and numbers without an international prefix get
/// `default_country_code`.
///
/// # Errors
///
/// Returns a validation error if anything other than digits remains, or the
/// result has fewer than 8 or more than 15 digits.
///
/// # Examples
///
/// ```
/// use mesa::normalize_phone;
///
/// assert_eq!(normalize_phone("600 000 000", "+34").unwrap(), "+34600000000");
/// assert_eq!(normalize_phone("0034-600-000-000", "+34").unwrap(), "+34600000000");
/// assert_eq!(normalize_phone("+44 (20) 7946 0000", "+34").unwrap(), "+442079460000");
/// ```
pub fn normalize_phone(raw: &str, default_country_code: &str) -> Result<String, ValidationError> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '.' | '(' | ')' | '/'))
        .collect();

    let international = if let Some(rest) = compact.strip_prefix('+') {
        format!("+{rest}")
    } else if let Some(rest) = compact.strip_prefix("00") {
        format!("+{rest}")
    } else {
        let code = default_country_code.trim().trim_start_matches('+');
        format!("+{code}{compact}")
    };

    let digits = &international[1..];
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new(
            "phone",
            format!("'{}' is not a phone number", raw.trim()),
        ));
    }
    if !(8..=15).contains(&digits.len()) {
        return Err(ValidationError::new(
            "phone",
            format!("'{}' has {} digits, expected 8 to 15", raw.trim(), digits.len()),
        ));
    }
    Ok(international)
}
