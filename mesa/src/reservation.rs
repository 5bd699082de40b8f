//! Reservation types and the lifecycle transition table.
//!
//! A [`Reservation`] is a booking for a party at a date and time. Its
//! [`ReservationStatus`] moves through a fixed table of transitions driven by
//! [`ReservationEvent`]s; see [`ReservationStatus::after`].

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::ids::{CustomerId, ReservationId, TableId, ZoneId};

/// Lifecycle state of a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Requested, awaiting confirmation.
    Pending,
    /// Confirmed by staff or the customer.
    Confirmed,
    /// The party is at the table.
    Seated,
    /// The party has left.
    Completed,
    /// Cancelled before seating.
    Cancelled,
    /// The party never arrived.
    NoShow,
}

impl ReservationStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Confirmed,
        Self::Seated,
        Self::Completed,
        Self::Cancelled,
        Self::NoShow,
    ];

    /// Statuses whose reservations hold their tables for their window.
    pub const ACTIVE: [Self; 3] = [Self::Pending, Self::Confirmed, Self::Seated];

    /// Returns the status that `event` leads to, or `None` if the transition
    /// is not defined.
    ///
    /// | From | Event | To |
    /// |---|---|---|
    /// | pending | confirm | confirmed |
    /// | pending, confirmed | cancel | cancelled |
    /// | confirmed | seat | seated |
    /// | seated | complete | completed |
    /// | pending, confirmed | mark no-show | no_show |
    ///
    /// Assigning tables does not change the status; it is accepted from
    /// pending and confirmed and maps the status onto itself.
    ///
    /// # Examples
    ///
    /// ```
    /// use mesa::{ReservationEvent, ReservationStatus};
    ///
    /// assert_eq!(
    ///     ReservationStatus::Confirmed.after(ReservationEvent::Seat),
    ///     Some(ReservationStatus::Seated)
    /// );
    /// assert_eq!(ReservationStatus::Completed.after(ReservationEvent::Seat), None);
    /// ```
    #[must_use]
    pub const fn after(self, event: ReservationEvent) -> Option<Self> {
        use ReservationEvent as E;
        match (self, event) {
            (Self::Pending, E::Confirm) => Some(Self::Confirmed),
            (Self::Pending | Self::Confirmed, E::Cancel) => Some(Self::Cancelled),
            (Self::Confirmed, E::Seat) => Some(Self::Seated),
            (Self::Seated, E::Complete) => Some(Self::Completed),
            (Self::Pending | Self::Confirmed, E::MarkNoShow) => Some(Self::NoShow),
            (Self::Pending | Self::Confirmed, E::Assign) => Some(self),
            _ => None,
        }
    }

    /// Whether a reservation in this status blocks its tables.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed | Self::Seated)
    }

    /// Whether no further event is accepted.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::NoShow)
    }

    /// Returns the stored name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Seated => "seated",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::Validation {
                field: "status".into(),
                message: format!("unknown reservation status '{s}'"),
            })
    }
}

/// Something that happens to a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationEvent {
    /// Staff or the customer confirms the booking.
    Confirm,
    /// The booking is cancelled.
    Cancel,
    /// The party sits down.
    Seat,
    /// The party leaves.
    Complete,
    /// The party did not show up.
    MarkNoShow,
    /// Tables are assigned or reassigned.
    Assign,
}

impl ReservationEvent {
    /// The lifecycle events, excluding table assignment.
    pub const LIFECYCLE: [Self; 5] = [
        Self::Confirm,
        Self::Cancel,
        Self::Seat,
        Self::Complete,
        Self::MarkNoShow,
    ];
}

impl fmt::Display for ReservationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Confirm => "confirm",
            Self::Cancel => "cancel",
            Self::Seat => "seat",
            Self::Complete => "complete",
            Self::MarkNoShow => "mark as no-show",
            Self::Assign => "assign tables to",
        })
    }
}

/// Channel a reservation came in through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Public booking form.
    #[default]
    Web,
    /// Taken over the phone by staff.
    Phone,
    /// Party arrived without booking.
    WalkIn,
    /// Booking platform integration.
    ThirdParty,
}

impl Origin {
    /// Every origin.
    pub const ALL: [Self; 4] = [Self::Web, Self::Phone, Self::WalkIn, Self::ThirdParty];

    /// Status a new reservation from this origin starts in.
    ///
    /// Staff-entered bookings are confirmed on entry.
    #[must_use]
    pub const fn initial_status(self) -> ReservationStatus {
        match self {
            Self::Phone | Self::WalkIn => ReservationStatus::Confirmed,
            Self::Web | Self::ThirdParty => ReservationStatus::Pending,
        }
    }

    /// Returns the stored name of the origin.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Phone => "phone",
            Self::WalkIn => "walk_in",
            Self::ThirdParty => "third_party",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Origin {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let wanted = s.trim().replace('-', "_").to_lowercase();
        Self::ALL
            .into_iter()
            .find(|origin| origin.as_str() == wanted)
            .ok_or_else(|| Error::Validation {
                field: "origin".into(),
                message: format!("unknown origin '{s}'"),
            })
    }
}

/// A half-open `[start, end)` span of local time.
///
/// # Examples
///
/// ```
/// use chrono::{NaiveDate, NaiveTime};
/// use mesa::TimeWindow;
///
/// let date = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
/// let lunch = TimeWindow::starting_at(date, NaiveTime::from_hms_opt(14, 0, 0).unwrap(), 90);
/// let later = TimeWindow::starting_at(date, NaiveTime::from_hms_opt(16, 0, 0).unwrap(), 90);
///
/// assert!(!lunch.conflicts_with(&later, 15));
/// assert!(lunch.conflicts_with(&later, 45));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TimeWindow {
    /// Creates the window starting at `date`/`time` lasting `minutes`.
    #[must_use]
    pub fn starting_at(date: NaiveDate, time: NaiveTime, minutes: u32) -> Self {
        let start = date.and_time(time);
        Self {
            start,
            end: start + Duration::minutes(i64::from(minutes)),
        }
    }

    /// Creates a window from explicit bounds.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `end` is not after `start`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError {
                field: "window".into(),
                message: format!("end {end} must be after start {start}"),
            });
        }
        Ok(Self { start, end })
    }

    /// Inclusive start.
    #[must_use]
    pub const fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// Exclusive end.
    #[must_use]
    pub const fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// Length in minutes.
    #[must_use]
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Whether two windows are closer than `buffer_minutes` apart.
    ///
    /// With a zero buffer this is plain half-open interval intersection.
    /// The relation is symmetric.
    #[must_use]
    pub fn conflicts_with(&self, other: &Self, buffer_minutes: u32) -> bool {
        let buffer = Duration::minutes(i64::from(buffer_minutes));
        self.start < other.end + buffer && other.start < self.end + buffer
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.date() == self.end.date() {
            write!(
                f,
                "{} {}-{}",
                self.start.format("%Y-%m-%d"),
                self.start.format("%H:%M"),
                self.end.format("%H:%M")
            )
        } else {
            write!(
                f,
                "{}-{}",
                self.start.format("%Y-%m-%d %H:%M"),
                self.end.format("%Y-%m-%d %H:%M")
            )
        }
    }
}

/// A party's booking.
///
/// Construct new reservations with [`Reservation::builder`]; stored ones are
/// loaded through [`crate::database::Database`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub(crate) id: ReservationId,
    pub(crate) customer: Option<CustomerId>,
    pub(crate) name: String,
    pub(crate) phone: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) party_size: u32,
    pub(crate) children_count: u32,
    pub(crate) window: TimeWindow,
    pub(crate) requested_zone: Option<ZoneId>,
    pub(crate) tables: Vec<TableId>,
    pub(crate) status: ReservationStatus,
    pub(crate) origin: Origin,
    pub(crate) special_requests: Option<String>,
    pub(crate) internal_notes: Option<String>,
    pub(crate) created_at: NaiveDateTime,
    pub(crate) updated_at: NaiveDateTime,
    pub(crate) version: i64,
}

impl Reservation {
    /// Starts building a reservation for `name` and `party_size` at
    /// `date`/`time`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{NaiveDate, NaiveTime};
    /// use mesa::{Origin, Reservation, ReservationStatus};
    ///
    /// let reservation = Reservation::builder(
    ///     "Marta Ruiz",
    ///     4,
    ///     NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
    ///     NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
    /// )
    /// .phone("600 111 222")
    /// .origin(Origin::Phone)
    /// .build()
    /// .unwrap();
    ///
    /// assert_eq!(reservation.status(), ReservationStatus::Confirmed);
    /// assert_eq!(reservation.duration_minutes(), 90);
    /// ```
    #[must_use]
    pub fn builder(
        name: impl Into<String>,
        party_size: u32,
        date: NaiveDate,
        time: NaiveTime,
    ) -> ReservationBuilder {
        ReservationBuilder {
            name: name.into(),
            party_size,
            date,
            time,
            duration_minutes: DEFAULT_DURATION_MINUTES,
            children_count: 0,
            phone: None,
            email: None,
            customer: None,
            requested_zone: None,
            origin: Origin::default(),
            special_requests: None,
            internal_notes: None,
            created_at: None,
        }
    }

    /// Row id, [`ReservationId::UNSAVED`] before the first insert.
    #[must_use]
    pub const fn id(&self) -> ReservationId {
        self.id
    }

    /// Linked customer record, if any.
    #[must_use]
    pub const fn customer(&self) -> Option<CustomerId> {
        self.customer
    }

    /// Name the booking is under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Contact phone as entered.
    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    /// Contact email as entered.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Number of guests, children included.
    #[must_use]
    pub const fn party_size(&self) -> u32 {
        self.party_size
    }

    /// Number of children in the party.
    #[must_use]
    pub const fn children_count(&self) -> u32 {
        self.children_count
    }

    /// Time the party occupies its tables.
    #[must_use]
    pub const fn window(&self) -> TimeWindow {
        self.window
    }

    /// Booking date.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.window.start().date()
    }

    /// Booking time.
    #[must_use]
    pub fn time(&self) -> NaiveTime {
        self.window.start().time()
    }

    /// Planned duration.
    #[must_use]
    pub fn duration_minutes(&self) -> i64 {
        self.window.duration_minutes()
    }

    /// Preferred zone, if the customer asked for one.
    #[must_use]
    pub const fn requested_zone(&self) -> Option<ZoneId> {
        self.requested_zone
    }

    /// Assigned tables, ascending by id; empty when unassigned.
    #[must_use]
    pub fn tables(&self) -> &[TableId] {
        &self.tables
    }

    /// Whether any table is assigned.
    #[must_use]
    pub fn is_assigned(&self) -> bool {
        !self.tables.is_empty()
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> ReservationStatus {
        self.status
    }

    /// Channel of the booking.
    #[must_use]
    pub const fn origin(&self) -> Origin {
        self.origin
    }

    /// Requests from the customer.
    #[must_use]
    pub fn special_requests(&self) -> Option<&str> {
        self.special_requests.as_deref()
    }

    /// Staff-only notes.
    #[must_use]
    pub fn internal_notes(&self) -> Option<&str> {
        self.internal_notes.as_deref()
    }

    /// Creation time.
    #[must_use]
    pub const fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }

    /// Last modification time.
    #[must_use]
    pub const fn updated_at(&self) -> NaiveDateTime {
        self.updated_at
    }

    /// Optimistic-concurrency version, bumped on every write.
    #[must_use]
    pub const fn version(&self) -> i64 {
        self.version
    }
}

/// Default seating duration when the caller does not give one.
pub const DEFAULT_DURATION_MINUTES: u32 = 90;

/// Builder for new [`Reservation`]s.
#[derive(Debug)]
pub struct ReservationBuilder {
    name: String,
    party_size: u32,
    date: NaiveDate,
    time: NaiveTime,
    duration_minutes: u32,
    children_count: u32,
    phone: Option<String>,
    email: Option<String>,
    customer: Option<CustomerId>,
    requested_zone: Option<ZoneId>,
    origin: Origin,
    special_requests: Option<String>,
    internal_notes: Option<String>,
    created_at: Option<NaiveDateTime>,
}

impl ReservationBuilder {
    /// Sets the contact phone.
    #[must_use]
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Sets the contact email.
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the number of children in the party.
    #[must_use]
    pub const fn children(mut self, children_count: u32) -> Self {
        self.children_count = children_count;
        self
    }

    /// Sets the seating duration.
    #[must_use]
    pub const fn duration_minutes(mut self, minutes: u32) -> Self {
        self.duration_minutes = minutes;
        self
    }

    /// Links an existing customer record.
    #[must_use]
    pub const fn customer(mut self, customer: CustomerId) -> Self {
        self.customer = Some(customer);
        self
    }

    /// Sets the preferred zone.
    #[must_use]
    pub const fn zone(mut self, zone: ZoneId) -> Self {
        self.requested_zone = Some(zone);
        self
    }

    /// Sets the booking channel, which decides the initial status.
    #[must_use]
    pub const fn origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Sets the customer's special requests.
    #[must_use]
    pub fn special_requests(mut self, text: impl Into<String>) -> Self {
        self.special_requests = Some(text.into());
        self
    }

    /// Sets staff-only notes.
    #[must_use]
    pub fn internal_notes(mut self, text: impl Into<String>) -> Self {
        self.internal_notes = Some(text.into());
        self
    }

    /// Sets the creation timestamp; defaults to the booking start.
    #[must_use]
    pub const fn created_at(mut self, created_at: NaiveDateTime) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Validates the fields and builds the reservation.
    ///
    /// Text fields are trimmed and empty optional text becomes `None`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if:
    /// - the name is empty
    /// - the party size is zero, or smaller than the number of children
    /// - the duration is zero
    /// - a web or third-party booking carries neither phone nor email
    pub fn build(self) -> Result<Reservation, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::new("name", "must not be empty"));
        }
        if self.party_size == 0 {
            return Err(ValidationError::new("party_size", "must be at least 1"));
        }
        if self.children_count > self.party_size {
            return Err(ValidationError::new(
                "children_count",
                format!(
                    "{} children exceed party size {}",
                    self.children_count, self.party_size
                ),
            ));
        }
        if self.duration_minutes == 0 {
            return Err(ValidationError::new(
                "duration_minutes",
                "must be greater than zero",
            ));
        }

        let phone = non_empty(self.phone);
        let email = non_empty(self.email);
        if phone.is_none()
            && email.is_none()
            && matches!(self.origin, Origin::Web | Origin::ThirdParty)
        {
            return Err(ValidationError::new(
                "contact",
                "remote bookings need a phone or an email",
            ));
        }

        let window = TimeWindow::starting_at(self.date, self.time, self.duration_minutes);
        let created_at = self.created_at.unwrap_or_else(|| window.start());
        Ok(Reservation {
            id: ReservationId::UNSAVED,
            customer: self.customer,
            name,
            phone,
            email,
            party_size: self.party_size,
            children_count: self.children_count,
            window,
            requested_zone: self.requested_zone,
            tables: Vec::new(),
            status: self.origin.initial_status(),
            origin: self.origin,
            special_requests: non_empty(self.special_requests),
            internal_notes: non_empty(self.internal_notes),
            created_at,
            updated_at: created_at,
            version: 0,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Error type for validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// A description of the validation failure.
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation error for '{}': {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod proptests;
