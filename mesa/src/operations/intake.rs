//! Reservation intake.
//!
//! Intake turns a booking request into a stored reservation. It validates
//! the request against the configured limits and the clock, looks up the
//! customer by contact data, and decides which customer record the booking
//! points at. Tables are not assigned here; that is a separate step.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;
use serde::Serialize;

use crate::config::Settings;
use crate::customer::{normalize_email, normalize_phone, ContactInfo, Customer};
use crate::database::Database;
use crate::error::{Error, Result};
use crate::ids::{CustomerId, ZoneId};
use crate::reservation::{Origin, Reservation};
use crate::role::{Actor, Role};

use super::availability::{AvailabilityCalculator, AvailabilityRequest};
use super::conflict::{
    check_customer_existence, resolution_actions, resolve_conflict, ExistenceResult, Resolution,
};
use super::executor::ExecutionResult;
use super::plan::{CustomerRef, OperationPlan, PlanAction};

/// A booking as submitted by a guest or entered by staff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationRequest {
    /// Name the booking is under.
    pub name: String,
    /// Number of guests, children included.
    pub party_size: u32,
    /// Service date.
    pub date: NaiveDate,
    /// Arrival time.
    pub time: NaiveTime,
    /// Seating duration; the configured default when `None`.
    pub duration_minutes: Option<u32>,
    /// Children in the party.
    pub children_count: u32,
    /// Contact email as typed.
    pub email: Option<String>,
    /// Contact phone as typed.
    pub phone: Option<String>,
    /// Code of the preferred zone.
    pub zone: Option<String>,
    /// Booking channel.
    pub origin: Origin,
    /// Guest-visible requests.
    pub special_requests: Option<String>,
    /// Staff-only notes.
    pub internal_notes: Option<String>,
}

impl ReservationRequest {
    /// Creates a web request with no contact data.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{NaiveDate, NaiveTime};
    /// use mesa::operations::ReservationRequest;
    /// use mesa::Origin;
    ///
    /// let request = ReservationRequest::new(
    ///     "Lucía Pérez",
    ///     4,
    ///     NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
    ///     NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
    /// )
    /// .with_phone("600 123 456")
    /// .with_origin(Origin::Phone);
    /// assert_eq!(request.origin, Origin::Phone);
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>, party_size: u32, date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            name: name.into(),
            party_size,
            date,
            time,
            duration_minutes: None,
            children_count: 0,
            email: None,
            phone: None,
            zone: None,
            origin: Origin::Web,
            special_requests: None,
            internal_notes: None,
        }
    }

    /// Sets the seating duration.
    #[must_use]
    pub const fn with_duration(mut self, minutes: u32) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    /// Sets the number of children.
    #[must_use]
    pub const fn with_children(mut self, children: u32) -> Self {
        self.children_count = children;
        self
    }

    /// Sets the contact email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the contact phone.
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Sets the preferred zone by code.
    #[must_use]
    pub fn with_zone(mut self, code: impl Into<String>) -> Self {
        self.zone = Some(code.into());
        self
    }

    /// Sets the booking channel.
    #[must_use]
    pub const fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Sets the guest's special requests.
    #[must_use]
    pub fn with_special_requests(mut self, text: impl Into<String>) -> Self {
        self.special_requests = Some(text.into());
        self
    }

    /// Sets staff-only notes.
    #[must_use]
    pub fn with_internal_notes(mut self, text: impl Into<String>) -> Self {
        self.internal_notes = Some(text.into());
        self
    }

    /// Contact details as given.
    #[must_use]
    pub fn contact(&self) -> ContactInfo {
        ContactInfo::new(self.name.clone(), self.email.clone(), self.phone.clone())
    }

    /// Key the rate limiter counts this request under: the normalized
    /// phone, else the normalized email.
    ///
    /// Malformed values are used trimmed and lowercased so they are still
    /// throttled. Returns `None` when the request has no contact data.
    #[must_use]
    pub fn rate_limit_key(&self, default_country_code: &str) -> Option<String> {
        let given = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        if let Some(phone) = given(&self.phone) {
            let key = normalize_phone(&phone, default_country_code)
                .unwrap_or_else(|_| phone.to_lowercase());
            return Some(format!("phone:{key}"));
        }
        given(&self.email).map(|email| {
            let key = normalize_email(&email).unwrap_or_else(|_| email.to_lowercase());
            format!("email:{key}")
        })
    }
}

/// What to do with the customer record of a new booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CustomerDecision {
    /// Link a single match, create a customer when nothing matches, and
    /// leave a conflicting booking unlinked.
    #[default]
    Auto,
    /// Link a single match and fill in contact fields it is missing.
    Update,
    /// Always create a new customer.
    CreateNew,
    /// Settle a conflict as part of the booking.
    Resolve(Resolution),
}

/// Options for a reservation intake.
#[derive(Debug, Clone)]
pub struct IntakeOptions {
    /// The booking.
    pub request: ReservationRequest,
    /// Who enters it.
    pub actor: Actor,
    /// How to handle the customer record.
    pub decision: CustomerDecision,
    /// Describe the plan without writing.
    pub dry_run: bool,
}

impl IntakeOptions {
    /// Creates options with [`CustomerDecision::Auto`].
    #[must_use]
    pub fn new(request: ReservationRequest, actor: Actor) -> Self {
        Self {
            request,
            actor,
            decision: CustomerDecision::Auto,
            dry_run: false,
        }
    }

    /// Sets the customer decision.
    #[must_use]
    pub fn with_decision(mut self, decision: CustomerDecision) -> Self {
        self.decision = decision;
        self
    }

    /// Sets the dry-run flag.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// What intake decided before anything is written.
#[derive(Debug, Clone)]
pub struct IntakeOutcome {
    /// The reservation to insert, not yet saved.
    pub reservation: Reservation,
    /// Result of the customer lookup.
    pub existence: ExistenceResult,
    /// Customer the reservation links to.
    pub customer: CustomerRef,
}

/// A plan together with the reservation it creates.
#[derive(Debug, Clone)]
pub struct PlannedIntake {
    /// Writes to perform.
    pub plan: OperationPlan,
    /// Reservation and customer decision.
    pub outcome: IntakeOutcome,
}

/// Result of an intake, for callers and reports.
#[derive(Debug, Clone, Serialize)]
pub struct IntakeResult {
    /// The reservation; its id is unsaved on a dry run.
    pub reservation: Reservation,
    /// Result of the customer lookup.
    pub existence: ExistenceResult,
    /// Whether a customer record was created.
    pub customer_created: bool,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// Actions taken, or that would be taken.
    pub actions: Vec<String>,
    /// Warnings raised while planning.
    pub warnings: Vec<String>,
}

impl IntakeResult {
    /// Combines a planned intake with the result of executing it.
    #[must_use]
    pub fn new(planned: PlannedIntake, execution: &ExecutionResult) -> Self {
        let PlannedIntake { outcome, .. } = planned;
        let mut reservation = outcome.reservation;
        if let Some(id) = execution.created_reservation {
            reservation.id = id;
        }
        reservation.customer = match outcome.customer {
            CustomerRef::Existing(id) => Some(id),
            CustomerRef::Created => execution.created_customer,
            CustomerRef::None => None,
        };
        Self {
            reservation,
            existence: outcome.existence,
            customer_created: outcome.customer == CustomerRef::Created,
            dry_run: execution.dry_run,
            actions: execution.actions_taken.clone(),
            warnings: execution.warnings.clone(),
        }
    }

    /// Customer the reservation is linked to, if it is stored.
    #[must_use]
    pub const fn customer(&self) -> Option<CustomerId> {
        self.reservation.customer
    }
}

/// A reservation intake plan generator.
pub struct IntakePlan<'a> {
    options: IntakeOptions,
    settings: &'a Settings,
}

impl<'a> IntakePlan<'a> {
    /// Creates a new intake plan with the given options and settings.
    #[must_use]
    pub const fn new(options: IntakeOptions, settings: &'a Settings) -> Self {
        Self { options, settings }
    }

    /// Validates the request and plans the writes that store it.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The actor is below [`Role::Host`], or merges below [`Role::Manager`]
    /// - The party size, duration or contact data is invalid
    /// - The time is outside service hours or before `now`
    /// - The preferred zone does not exist
    /// - [`CustomerDecision::Update`] meets a conflict
    /// - [`CustomerDecision::Resolve`] meets no conflict
    pub fn build_plan(&self, conn: &Connection, now: NaiveDateTime) -> Result<PlannedIntake> {
        let options = &self.options;
        let request = &options.request;
        options.actor.require(Role::Host, "create reservations")?;

        let duration = request
            .duration_minutes
            .unwrap_or(self.settings.default_duration_minutes);
        let check = AvailabilityRequest::new(request.date, request.time, request.party_size)
            .with_duration(duration);
        AvailabilityCalculator::new(self.settings).validate(&check)?;

        let start = request.date.and_time(request.time);
        if start < now {
            return Err(Error::Validation {
                field: "time".into(),
                message: format!("{start} is in the past"),
            });
        }

        let zone = self.zone_id(conn)?;
        let contact = request
            .contact()
            .normalized(&self.settings.default_country_code)?;
        let reservation = build_reservation(request, &contact, duration, zone, now)?;

        let existence = check_customer_existence(
            conn,
            contact.email.as_deref(),
            contact.phone.as_deref(),
            &self.settings.default_country_code,
        )?;

        let plan = OperationPlan::new(format!(
            "Create reservation for {} (party of {}, {})",
            reservation.name(),
            reservation.party_size(),
            reservation.window()
        ));
        let (plan, customer) = self.customer_actions(plan, &existence, &contact, now)?;
        log::debug!(
            "intake for {}: customer {:?}, {} action(s) before insert",
            reservation.name(),
            customer,
            plan.len()
        );

        let plan = plan.add_action(PlanAction::CreateReservation {
            reservation: Box::new(reservation.clone()),
            customer,
        });
        Ok(PlannedIntake {
            plan,
            outcome: IntakeOutcome {
                reservation,
                existence,
                customer,
            },
        })
    }

    fn zone_id(&self, conn: &Connection) -> Result<Option<ZoneId>> {
        let code = match self.options.request.zone.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => code,
            _ => return Ok(None),
        };
        let zone = Database::get_zone_by_code(conn, code)?.ok_or_else(|| Error::ZoneNotFound {
            zone: code.to_string(),
        })?;
        Ok(Some(zone.id))
    }

    fn customer_actions(
        &self,
        plan: OperationPlan,
        existence: &ExistenceResult,
        contact: &ContactInfo,
        now: NaiveDateTime,
    ) -> Result<(OperationPlan, CustomerRef)> {
        let has_contact = contact.email.is_some() || contact.phone.is_some();
        let create = |plan: OperationPlan| {
            (
                plan.add_action(PlanAction::CreateCustomer(Box::new(Customer::from_contact(
                    contact, now,
                )))),
                CustomerRef::Created,
            )
        };

        match (self.options.decision, existence) {
            (CustomerDecision::CreateNew, _) => Ok(create(plan)),
            (CustomerDecision::Auto | CustomerDecision::Update, ExistenceResult::None) => {
                if has_contact {
                    Ok(create(plan))
                } else {
                    Ok((plan, CustomerRef::None))
                }
            }
            (CustomerDecision::Auto, ExistenceResult::SingleMatch { customer, .. }) => {
                Ok((plan, CustomerRef::Existing(customer.id)))
            }
            (CustomerDecision::Update, ExistenceResult::SingleMatch { customer, .. }) => {
                let mut updated = (**customer).clone();
                if updated.email.is_none() {
                    updated.email.clone_from(&contact.email);
                }
                if updated.phone.is_none() {
                    updated.phone.clone_from(&contact.phone);
                }
                let plan = if updated == **customer {
                    plan
                } else {
                    plan.add_action(PlanAction::UpdateCustomer(Box::new(updated)))
                };
                Ok((plan, CustomerRef::Existing(customer.id)))
            }
            (
                CustomerDecision::Auto,
                ExistenceResult::Conflict {
                    email_match,
                    phone_match,
                },
            ) => Ok((
                plan.add_warning(format!(
                    "email matches customer {} and phone matches customer {}; \
                     resolve before confirming",
                    email_match.id, phone_match.id
                )),
                CustomerRef::None,
            )),
            (
                CustomerDecision::Update,
                ExistenceResult::Conflict {
                    email_match,
                    phone_match,
                },
            ) => Err(Error::ConflictUnresolved {
                email_match: email_match.id,
                phone_match: phone_match.id,
            }),
            (
                CustomerDecision::Resolve(resolution),
                ExistenceResult::Conflict {
                    email_match,
                    phone_match,
                },
            ) => {
                if resolution == Resolution::Merge {
                    self.options.actor.require(Role::Manager, "merge customers")?;
                }
                let resolved = resolve_conflict(
                    email_match,
                    phone_match,
                    contact,
                    resolution,
                    &self.settings.merge_separator,
                    now,
                );
                Ok(resolution_actions(plan, &resolved, resolution))
            }
            (CustomerDecision::Resolve(_), _) => Err(Error::Validation {
                field: "contact".into(),
                message: "contact data does not conflict; nothing to resolve".into(),
            }),
        }
    }
}

fn build_reservation(
    request: &ReservationRequest,
    contact: &ContactInfo,
    duration: u32,
    zone: Option<ZoneId>,
    now: NaiveDateTime,
) -> Result<Reservation> {
    let mut builder = Reservation::builder(
        request.name.clone(),
        request.party_size,
        request.date,
        request.time,
    )
    .duration_minutes(duration)
    .children(request.children_count)
    .origin(request.origin)
    .created_at(now);
    if let Some(email) = &contact.email {
        builder = builder.email(email.clone());
    }
    if let Some(phone) = &contact.phone {
        builder = builder.phone(phone.clone());
    }
    if let Some(zone) = zone {
        builder = builder.zone(zone);
    }
    if let Some(text) = &request.special_requests {
        builder = builder.special_requests(text.clone());
    }
    if let Some(text) = &request.internal_notes {
        builder = builder.internal_notes(text.clone());
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_util::{at, create_test_database, seed_zone};
    use crate::operations::PlanExecutor;
    use crate::reservation::ReservationStatus;

    fn host() -> Actor {
        Actor::new("ana", Role::Host)
    }

    fn request(time: NaiveDateTime) -> ReservationRequest {
        ReservationRequest::new("Lucía Pérez", 4, time.date(), time.time())
    }

    fn plan(conn: &Connection, options: IntakeOptions) -> Result<PlannedIntake> {
        IntakePlan::new(options, &Settings::default()).build_plan(conn, at(10, 0))
    }

    fn stored(conn: &Connection, name: &str, email: Option<&str>, phone: Option<&str>) -> Customer {
        let contact = ContactInfo::new(name, email.map(Into::into), phone.map(Into::into));
        let id = Database::insert_customer(conn, &Customer::from_contact(&contact, at(9, 0))).unwrap();
        Database::require_customer(conn, id).unwrap()
    }

    #[test]
    fn test_web_booking_creates_customer_and_pending_reservation() {
        let mut db = create_test_database();
        let conn = db.connection();
        let options = IntakeOptions::new(
            request(at(14, 0)).with_email(" Lucia@Example.com ").with_phone("600 111 222"),
            Actor::system("web"),
        );
        let planned = plan(conn, options).unwrap();
        assert_eq!(planned.plan.len(), 2);
        assert_eq!(planned.outcome.customer, CustomerRef::Created);
        assert_eq!(planned.outcome.reservation.status(), ReservationStatus::Pending);
        assert_eq!(planned.outcome.reservation.email(), Some("lucia@example.com"));
        assert_eq!(planned.outcome.reservation.phone(), Some("+34600111222"));

        let actor = Actor::system("web");
        let tx = db.begin_immediate().unwrap();
        let execution = PlanExecutor::new(&tx, &actor, at(10, 0))
            .execute(&planned.plan)
            .unwrap();
        tx.commit().unwrap();
        let result = IntakeResult::new(planned, &execution);
        assert!(result.customer_created);

        let stored = Database::require_reservation(db.connection(), result.reservation.id()).unwrap();
        assert_eq!(stored.customer(), result.customer());
        assert!(stored.customer().is_some());
        assert_eq!(stored.duration_minutes(), 90);
    }

    #[test]
    fn test_phone_booking_is_confirmed_and_links_single_match() {
        let db = create_test_database();
        let conn = db.connection();
        let known = stored(conn, "Lucía", None, Some("+34600111222"));

        let options = IntakeOptions::new(
            request(at(21, 0))
                .with_phone("+34 600 111 222")
                .with_origin(Origin::Phone),
            host(),
        );
        let planned = plan(conn, options).unwrap();
        assert_eq!(planned.plan.len(), 1);
        assert_eq!(planned.outcome.customer, CustomerRef::Existing(known.id));
        assert_eq!(planned.outcome.reservation.status(), ReservationStatus::Confirmed);
    }

    #[test]
    fn test_update_fills_missing_contact_fields() {
        let db = create_test_database();
        let conn = db.connection();
        let known = stored(conn, "Lucía", None, Some("+34600111222"));

        let options = IntakeOptions::new(
            request(at(21, 0))
                .with_phone("600111222")
                .with_email("lucia@example.com"),
            host(),
        )
        .with_decision(CustomerDecision::Update);
        let planned = plan(conn, options).unwrap();
        match &planned.plan.actions[0] {
            PlanAction::UpdateCustomer(customer) => {
                assert_eq!(customer.id, known.id);
                assert_eq!(customer.email.as_deref(), Some("lucia@example.com"));
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn test_conflict_is_left_unlinked_with_warning() {
        let db = create_test_database();
        let conn = db.connection();
        let c1 = stored(conn, "Carmen", Some("carmen@example.com"), None);
        let c2 = stored(conn, "Carmen R.", None, Some("+34600333444"));

        let base = request(at(21, 0))
            .with_email("carmen@example.com")
            .with_phone("600333444");
        let planned = plan(conn, IntakeOptions::new(base.clone(), host())).unwrap();
        assert_eq!(planned.outcome.customer, CustomerRef::None);
        assert_eq!(planned.plan.warnings.len(), 1);
        assert!(matches!(planned.outcome.existence, ExistenceResult::Conflict { .. }));

        let err = plan(
            conn,
            IntakeOptions::new(base.clone(), host()).with_decision(CustomerDecision::Update),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::ConflictUnresolved { email_match, phone_match }
                if email_match == c1.id && phone_match == c2.id
        ));

        let keep = plan(
            conn,
            IntakeOptions::new(base, host())
                .with_decision(CustomerDecision::Resolve(Resolution::KeepEmailMatch)),
        )
        .unwrap();
        assert_eq!(keep.outcome.customer, CustomerRef::Existing(c1.id));
    }

    #[test]
    fn test_merge_during_intake_requires_manager() {
        let db = create_test_database();
        let conn = db.connection();
        stored(conn, "Carmen", Some("carmen@example.com"), None);
        stored(conn, "Carmen R.", None, Some("+34600333444"));

        let options = IntakeOptions::new(
            request(at(21, 0))
                .with_email("carmen@example.com")
                .with_phone("600333444"),
            host(),
        )
        .with_decision(CustomerDecision::Resolve(Resolution::Merge));
        let err = plan(conn, options).unwrap_err();
        assert!(matches!(err, Error::Forbidden { required: Role::Manager, .. }));
    }

    #[test]
    fn test_resolve_without_conflict_is_rejected() {
        let db = create_test_database();
        let conn = db.connection();
        let options = IntakeOptions::new(request(at(21, 0)).with_email("new@example.com"), host())
            .with_decision(CustomerDecision::Resolve(Resolution::CreateNew));
        assert!(matches!(
            plan(conn, options).unwrap_err(),
            Error::Validation { field, .. } if field == "contact"
        ));
    }

    #[test]
    fn test_rejects_past_and_out_of_hours_requests() {
        let db = create_test_database();
        let conn = db.connection();

        let late = request(at(23, 59)).with_email("a@example.com");
        let err = plan(conn, IntakeOptions::new(late, host())).unwrap_err();
        assert!(matches!(err, Error::OutOfServiceHours { .. }));

        let yesterday = ReservationRequest::new(
            "Lucía",
            2,
            at(14, 0).date().pred_opt().unwrap(),
            at(14, 0).time(),
        );
        let err = plan(conn, IntakeOptions::new(yesterday, host())).unwrap_err();
        assert!(matches!(err, Error::Validation { field, .. } if field == "time"));
    }

    #[test]
    fn test_zone_code_is_resolved() {
        let db = create_test_database();
        let conn = db.connection();
        let terrace = seed_zone(conn, "terrace");

        let planned = plan(
            conn,
            IntakeOptions::new(
                request(at(14, 0)).with_zone("terrace").with_origin(Origin::WalkIn),
                host(),
            ),
        )
        .unwrap();
        assert_eq!(planned.outcome.reservation.requested_zone(), Some(terrace));
        assert_eq!(planned.outcome.customer, CustomerRef::None);

        let err = plan(
            conn,
            IntakeOptions::new(
                request(at(14, 0)).with_zone("garden").with_origin(Origin::WalkIn),
                host(),
            ),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ZoneNotFound { .. }));
    }

    #[test]
    fn test_rate_limit_key_prefers_phone() {
        let both = request(at(14, 0))
            .with_email("A@Example.com")
            .with_phone("600 111 222");
        assert_eq!(both.rate_limit_key("+34").as_deref(), Some("phone:+34600111222"));

        let email = request(at(14, 0)).with_email("A@Example.com");
        assert_eq!(email.rate_limit_key("+34").as_deref(), Some("email:a@example.com"));

        assert_eq!(request(at(14, 0)).rate_limit_key("+34"), None);
    }
}
