//! Customer conflict detection and resolution.
//!
//! A conflict exists when incoming contact data matches one customer by
//! email and a different customer by phone. Detection never writes; the
//! chosen [`Resolution`] is computed as new customer records by
//! [`resolve_conflict`] and persisted by [`ResolvePlan`] in one transaction.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::Serialize;

use crate::config::Settings;
use crate::customer::{normalize_email, normalize_phone, ContactInfo, Customer};
use crate::database::Database;
use crate::error::{Error, Result};
use crate::ids::{CustomerId, ReservationId};
use crate::role::{Actor, Role};

use super::plan::{CustomerRef, OperationPlan, PlanAction};

/// Which contact field matched a stored customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedBy {
    /// Email only.
    Email,
    /// Phone only.
    Phone,
    /// Email and phone matched the same customer.
    Both,
}

/// Outcome of a customer lookup by contact data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ExistenceResult {
    /// No live customer matches.
    None,
    /// One customer matches; the caller may update it or create a new one.
    SingleMatch {
        /// The matching customer.
        customer: Box<Customer>,
        /// How it matched.
        matched_by: MatchedBy,
    },
    /// Email and phone point at two different customers.
    Conflict {
        /// Customer owning the email.
        email_match: Box<Customer>,
        /// Customer owning the phone.
        phone_match: Box<Customer>,
    },
}

/// Looks up live customers by contact data.
///
/// Inputs are normalized first; blank values are ignored. When several
/// customers share a value the oldest wins.
///
/// # Errors
///
/// Returns [`Error::Validation`] for a malformed email or phone, or an error
/// if the query fails.
pub fn check_customer_existence(
    conn: &Connection,
    email: Option<&str>,
    phone: Option<&str>,
    default_country_code: &str,
) -> Result<ExistenceResult> {
    let email = match email.map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(normalize_email(raw)?),
        _ => None,
    };
    let phone = match phone.map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(normalize_phone(raw, default_country_code)?),
        _ => None,
    };

    let by_email = match &email {
        Some(email) => Database::find_customers_by_email(conn, email)?,
        None => Vec::new(),
    };
    let by_phone = match &phone {
        Some(phone) => Database::find_customers_by_phone(conn, phone)?,
        None => Vec::new(),
    };

    if let Some(both) = by_email
        .iter()
        .find(|c| by_phone.iter().any(|p| p.id == c.id))
    {
        return Ok(ExistenceResult::SingleMatch {
            customer: Box::new(both.clone()),
            matched_by: MatchedBy::Both,
        });
    }

    let mut by_email = by_email.into_iter();
    let mut by_phone = by_phone.into_iter();
    Ok(match (by_email.next(), by_phone.next()) {
        (None, None) => ExistenceResult::None,
        (Some(customer), None) => ExistenceResult::SingleMatch {
            customer: Box::new(customer),
            matched_by: MatchedBy::Email,
        },
        (None, Some(customer)) => ExistenceResult::SingleMatch {
            customer: Box::new(customer),
            matched_by: MatchedBy::Phone,
        },
        (Some(email_match), Some(phone_match)) => {
            log::debug!(
                "contact conflict: email matches {}, phone matches {}",
                email_match.id,
                phone_match.id
            );
            ExistenceResult::Conflict {
                email_match: Box::new(email_match),
                phone_match: Box::new(phone_match),
            }
        }
    })
}

/// How to settle a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Keep the email match and give it the incoming phone.
    KeepEmailMatch,
    /// Keep the phone match and give it the incoming email.
    KeepPhoneMatch,
    /// Fold the phone match into the email match.
    Merge,
    /// Leave both alone and create a third customer.
    CreateNew,
}

impl std::str::FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "keep-email" | "keep-email-match" => Ok(Self::KeepEmailMatch),
            "keep-phone" | "keep-phone-match" => Ok(Self::KeepPhoneMatch),
            "merge" => Ok(Self::Merge),
            "create-new" | "new" => Ok(Self::CreateNew),
            _ => Err(Error::Validation {
                field: "resolution".into(),
                message: format!(
                    "unknown resolution '{s}' (expected keep-email, keep-phone, merge or create-new)"
                ),
            }),
        }
    }
}

/// A value that a merge could not carry into the surviving record's field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationItem {
    /// Field name.
    pub field: String,
    /// Value kept on the survivor.
    pub kept: String,
    /// Value from the merged record.
    pub discarded: String,
    /// The merged record.
    pub discarded_from: CustomerId,
}

/// Customer records produced by a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCustomers {
    /// Record the contact belongs to afterwards; unsaved for
    /// [`Resolution::CreateNew`].
    pub survivor: Customer,
    /// Record folded into the survivor by a merge.
    pub superseded: Option<Customer>,
    /// Values needing manual reconciliation.
    pub reconciliation: Vec<ReconciliationItem>,
}

/// Computes the records a resolution produces. Nothing is written.
///
/// `contact` must be normalized.
#[must_use]
pub fn resolve_conflict(
    email_match: &Customer,
    phone_match: &Customer,
    contact: &ContactInfo,
    resolution: Resolution,
    separator: &str,
    now: NaiveDateTime,
) -> ResolvedCustomers {
    let only = |survivor: Customer| ResolvedCustomers {
        survivor,
        superseded: None,
        reconciliation: Vec::new(),
    };
    match resolution {
        Resolution::KeepEmailMatch => {
            let mut kept = email_match.clone();
            kept.phone.clone_from(&contact.phone);
            only(kept)
        }
        Resolution::KeepPhoneMatch => {
            let mut kept = phone_match.clone();
            kept.email.clone_from(&contact.email);
            only(kept)
        }
        Resolution::CreateNew => only(Customer::from_contact(contact, now)),
        Resolution::Merge => {
            let (survivor, reconciliation) = merge_customers(email_match, phone_match, separator);
            let mut superseded = phone_match.clone();
            superseded.superseded_by = Some(email_match.id);
            ResolvedCustomers {
                survivor,
                superseded: Some(superseded),
                reconciliation,
            }
        }
    }
}

/// Merges `b` into `a`.
///
/// Scalars keep `a`'s non-empty value and fall back to `b`; a `b` value that
/// loses is appended to the notes with its provenance. Flags are ORed.
/// Free text is concatenated. Visit count and spend keep `a`'s values and
/// are reported for manual reconciliation.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use mesa::operations::merge_customers;
/// use mesa::{ContactInfo, Customer, CustomerId};
///
/// let now = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap().and_hms_opt(12, 0, 0).unwrap();
/// let mut a = Customer::from_contact(&ContactInfo::new("Ana", Some("ana@x.com".into()), None), now);
/// a.id = CustomerId(1);
/// let mut b = Customer::from_contact(&ContactInfo::new("Ana L.", None, Some("+34600000000".into())), now);
/// b.id = CustomerId(2);
/// b.vip = true;
///
/// let (merged, _) = merge_customers(&a, &b, " | ");
/// assert_eq!(merged.name, "Ana");
/// assert_eq!(merged.phone.as_deref(), Some("+34600000000"));
/// assert!(merged.vip);
/// assert!(merged.notes.unwrap().contains("Ana L."));
/// ```
#[must_use]
pub fn merge_customers(a: &Customer, b: &Customer, separator: &str) -> (Customer, Vec<ReconciliationItem>) {
    let marker = format!("[from customer {}]", b.id);
    let mut merged = a.clone();
    let mut overridden = Vec::new();

    let name = prefer(Some(a.name.as_str()), Some(b.name.as_str()), "name", &mut overridden);
    merged.name = name.unwrap_or_default();
    merged.email = prefer(a.email.as_deref(), b.email.as_deref(), "email", &mut overridden);
    merged.phone = prefer(a.phone.as_deref(), b.phone.as_deref(), "phone", &mut overridden);
    merged.company = prefer(a.company.as_deref(), b.company.as_deref(), "company", &mut overridden);

    merged.vip = a.vip || b.vip;
    merged.marketing_opt_in = a.marketing_opt_in || b.marketing_opt_in;

    merged.preferences = concat(a.preferences.as_deref(), b.preferences.as_deref(), &marker, separator);
    merged.allergies = concat(a.allergies.as_deref(), b.allergies.as_deref(), &marker, separator);
    merged.notes = concat(a.notes.as_deref(), b.notes.as_deref(), &marker, separator);
    for (field, value) in overridden {
        let line = format!("{marker} {field}: {value}");
        merged.notes = Some(match merged.notes.take() {
            Some(notes) => format!("{notes}{separator}{line}"),
            None => line,
        });
    }

    let reconciliation = vec![
        ReconciliationItem {
            field: "visit_count".into(),
            kept: a.visit_count.to_string(),
            discarded: b.visit_count.to_string(),
            discarded_from: b.id,
        },
        ReconciliationItem {
            field: "total_spend_cents".into(),
            kept: a.total_spend_cents.to_string(),
            discarded: b.total_spend_cents.to_string(),
            discarded_from: b.id,
        },
    ];
    (merged, reconciliation)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn prefer(
    a: Option<&str>,
    b: Option<&str>,
    field: &'static str,
    overridden: &mut Vec<(&'static str, String)>,
) -> Option<String> {
    match (non_empty(a), non_empty(b)) {
        (Some(a), Some(b)) => {
            if a != b {
                overridden.push((field, b.to_string()));
            }
            Some(a.to_string())
        }
        (Some(a), None) => Some(a.to_string()),
        (None, b) => b.map(str::to_string),
    }
}

fn concat(a: Option<&str>, b: Option<&str>, marker: &str, separator: &str) -> Option<String> {
    match (non_empty(a), non_empty(b)) {
        (Some(a), Some(b)) if a == b => Some(a.to_string()),
        (Some(a), Some(b)) => Some(format!("{a}{separator}{marker} {b}")),
        (Some(a), None) => Some(a.to_string()),
        (None, Some(b)) => Some(format!("{marker} {b}")),
        (None, None) => None,
    }
}

/// Options for persisting a conflict resolution.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// The incoming contact data that produced the conflict.
    pub contact: ContactInfo,

    /// Chosen resolution.
    pub resolution: Resolution,

    /// Who is resolving. Merges require [`Role::Manager`].
    pub actor: Actor,

    /// Reservation to link to the surviving customer, if any.
    pub reservation: Option<ReservationId>,

    /// Describe the plan without writing.
    pub dry_run: bool,
}

impl ResolveOptions {
    /// Creates options that link no reservation.
    #[must_use]
    pub const fn new(contact: ContactInfo, resolution: Resolution, actor: Actor) -> Self {
        Self {
            contact,
            resolution,
            actor,
            reservation: None,
            dry_run: false,
        }
    }

    /// Links `reservation` to the surviving customer.
    #[must_use]
    pub const fn with_reservation(mut self, reservation: Option<ReservationId>) -> Self {
        self.reservation = reservation;
        self
    }

    /// Sets the dry-run flag.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// What a resolution did, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionOutcome {
    /// The resolution applied.
    pub resolution: Resolution,
    /// Surviving customer; `None` until a new customer is inserted.
    pub customer: Option<CustomerId>,
    /// Customer retired by a merge.
    pub superseded: Option<CustomerId>,
    /// Values needing manual reconciliation.
    pub reconciliation: Vec<ReconciliationItem>,
    /// Reservation linked to the survivor.
    pub reservation: Option<ReservationId>,
}

/// A plan together with the resolution it applies.
#[derive(Debug, Clone)]
pub struct PlannedResolution {
    /// Writes to perform.
    pub plan: OperationPlan,
    /// Result to report after execution.
    pub outcome: ResolutionOutcome,
}

/// A conflict resolution plan generator.
pub struct ResolvePlan<'a> {
    options: ResolveOptions,
    settings: &'a Settings,
}

impl<'a> ResolvePlan<'a> {
    /// Creates a new resolve plan with the given options and settings.
    #[must_use]
    pub const fn new(options: ResolveOptions, settings: &'a Settings) -> Self {
        Self { options, settings }
    }

    /// Re-detects the conflict and plans its resolution.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The actor is below [`Role::Host`], or merges below [`Role::Manager`]
    /// - The contact data is malformed or no longer conflicts
    /// - The reservation to link does not exist
    pub fn build_plan(&self, conn: &Connection, now: NaiveDateTime) -> Result<PlannedResolution> {
        let options = &self.options;
        options.actor.require(Role::Host, "resolve customer conflicts")?;
        if options.resolution == Resolution::Merge {
            options.actor.require(Role::Manager, "merge customers")?;
        }

        let contact = options
            .contact
            .normalized(&self.settings.default_country_code)?;
        let (email_match, phone_match) = match check_customer_existence(
            conn,
            contact.email.as_deref(),
            contact.phone.as_deref(),
            &self.settings.default_country_code,
        )? {
            ExistenceResult::Conflict {
                email_match,
                phone_match,
            } => (email_match, phone_match),
            _ => {
                return Err(Error::Validation {
                    field: "contact".into(),
                    message: "contact data does not conflict; nothing to resolve".into(),
                })
            }
        };

        let resolved = resolve_conflict(
            &email_match,
            &phone_match,
            &contact,
            options.resolution,
            &self.settings.merge_separator,
            now,
        );

        let plan = OperationPlan::new(format!(
            "Resolve conflict between customers {} and {}",
            email_match.id, phone_match.id
        ));
        let (mut plan, survivor) = resolution_actions(plan, &resolved, options.resolution);
        if let Some(id) = options.reservation {
            let reservation = Database::require_reservation(conn, id)?;
            plan = plan.add_action(PlanAction::LinkCustomer {
                reservation: id,
                customer: survivor,
                expected_version: reservation.version(),
            });
        }

        let outcome = ResolutionOutcome {
            resolution: options.resolution,
            customer: match survivor {
                CustomerRef::Existing(id) => Some(id),
                CustomerRef::Created | CustomerRef::None => None,
            },
            superseded: resolved.superseded.as_ref().map(|c| c.id),
            reconciliation: resolved.reconciliation,
            reservation: options.reservation,
        };
        Ok(PlannedResolution { plan, outcome })
    }
}

/// Appends the customer writes for `resolved` to `plan`.
///
/// Returns the plan and a reference to the surviving customer.
pub(crate) fn resolution_actions(
    mut plan: OperationPlan,
    resolved: &ResolvedCustomers,
    resolution: Resolution,
) -> (OperationPlan, CustomerRef) {
    let survivor = if resolution == Resolution::CreateNew {
        plan = plan.add_action(PlanAction::CreateCustomer(Box::new(resolved.survivor.clone())));
        CustomerRef::Created
    } else {
        plan = plan.add_action(PlanAction::UpdateCustomer(Box::new(resolved.survivor.clone())));
        CustomerRef::Existing(resolved.survivor.id)
    };
    if let Some(retired) = &resolved.superseded {
        plan = plan.add_action(PlanAction::SupersedeCustomer {
            customer: retired.id,
            by: resolved.survivor.id,
            expected_version: retired.version,
        });
    }
    for item in &resolved.reconciliation {
        if item.discarded != "0" {
            plan = plan.add_warning(format!(
                "{} of customer {} ({}) not added to customer {} ({}); reconcile manually",
                item.field, item.discarded_from, item.discarded, resolved.survivor.id, item.kept
            ));
        }
    }
    (plan, survivor)
}
