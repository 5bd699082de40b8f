//! Availability search.
//!
//! Finds the tables, or runs of consecutive combinable tables, that can seat
//! a party for a time window, and ranks them.
//!
//! A fusion group belongs to the active reservations that hold it. Its
//! tables stay available one by one to other services, and the group as it
//! stands is offered whole; its members never join a different group while
//! it is held.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use rusqlite::Connection;
use serde::Serialize;

use crate::config::Settings;
use crate::database::Database;
use crate::error::{Error, Result, UnavailableReason};
use crate::ids::{ReservationId, TableId, ZoneId};
use crate::reservation::TimeWindow;
use crate::table::{group_capacity, FusionState, Table};

/// A request for candidate tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityRequest {
    /// Service date.
    pub date: NaiveDate,
    /// Arrival time.
    pub time: NaiveTime,
    /// Seating duration; the configured default when `None`.
    pub duration_minutes: Option<u32>,
    /// Number of guests.
    pub party_size: u32,
    /// Preferred zone, used for ranking only.
    pub zone: Option<ZoneId>,
    /// Reservation whose own assignment should not count as busy.
    pub exclude: Option<ReservationId>,
}

impl AvailabilityRequest {
    /// Creates a request with the default duration and no zone preference.
    #[must_use]
    pub const fn new(date: NaiveDate, time: NaiveTime, party_size: u32) -> Self {
        Self {
            date,
            time,
            duration_minutes: None,
            party_size,
            zone: None,
            exclude: None,
        }
    }

    /// Sets the seating duration.
    #[must_use]
    pub const fn with_duration(mut self, minutes: u32) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    /// Sets the preferred zone.
    #[must_use]
    pub const fn with_zone(mut self, zone: Option<ZoneId>) -> Self {
        self.zone = zone;
        self
    }

    /// Ignores the assignment of `reservation` when checking overlaps.
    #[must_use]
    pub const fn excluding(mut self, reservation: ReservationId) -> Self {
        self.exclude = Some(reservation);
        self
    }
}

/// A table, or a group of consecutive tables, able to seat the party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    /// Tables in ascending number order; the first leads a group.
    pub tables: Vec<Table>,
    /// Effective seats.
    pub capacity: u32,
    /// Zone of the tables.
    pub zone_id: ZoneId,
    /// Whether the zone is the one asked for.
    pub zone_match: bool,
}

impl Candidate {
    fn new(tables: Vec<Table>, preferred: Option<ZoneId>) -> Self {
        let zone_id = tables.first().map_or(ZoneId::UNSAVED, |t| t.zone_id);
        Self {
            capacity: group_capacity(&tables),
            zone_id,
            zone_match: preferred == Some(zone_id),
            tables,
        }
    }

    /// Table ids, lowest number first.
    #[must_use]
    pub fn table_ids(&self) -> Vec<TableId> {
        self.tables.iter().map(|t| t.id).collect()
    }

    /// Floor numbers, ascending.
    #[must_use]
    pub fn numbers(&self) -> Vec<u32> {
        self.tables.iter().map(|t| t.number).collect()
    }

    /// Whether this candidate needs tables to be fused.
    #[must_use]
    pub fn is_group(&self) -> bool {
        self.tables.len() > 1
    }

    fn first_number(&self) -> u32 {
        self.tables.first().map_or(0, |t| t.number)
    }
}

/// Computes candidate tables for a request.
///
/// # Examples
///
/// ```no_run
/// use chrono::{NaiveDate, NaiveTime};
/// use mesa::config::Settings;
/// use mesa::database::{Database, DatabaseConfig};
/// use mesa::operations::{AvailabilityCalculator, AvailabilityRequest};
///
/// let db = Database::open(DatabaseConfig::new("/tmp/mesa.db")).unwrap();
/// let settings = Settings::default();
/// let request = AvailabilityRequest::new(
///     NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
///     NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
///     4,
/// );
/// let candidates = AvailabilityCalculator::new(&settings)
///     .find_candidate_tables(db.connection(), &request)
///     .unwrap();
/// for candidate in candidates {
///     println!("{:?} seats {}", candidate.numbers(), candidate.capacity);
/// }
/// ```
pub struct AvailabilityCalculator<'a> {
    settings: &'a Settings,
}

impl<'a> AvailabilityCalculator<'a> {
    /// Creates a calculator using the given settings.
    #[must_use]
    pub const fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// The window a request covers.
    #[must_use]
    pub fn window(&self, request: &AvailabilityRequest) -> TimeWindow {
        TimeWindow::starting_at(
            request.date,
            request.time,
            request
                .duration_minutes
                .unwrap_or(self.settings.default_duration_minutes),
        )
    }

    /// Checks the party size and the service hours of a request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an empty or oversized party or a
    /// zero duration, and [`Error::OutOfServiceHours`] when the time is
    /// outside every service window.
    pub fn validate(&self, request: &AvailabilityRequest) -> Result<()> {
        if request.party_size == 0 {
            return Err(Error::Validation {
                field: "party_size".into(),
                message: "must be at least 1".into(),
            });
        }
        if request.party_size > self.settings.max_party_size {
            return Err(Error::Validation {
                field: "party_size".into(),
                message: format!(
                    "{} exceeds the maximum party size of {}",
                    request.party_size, self.settings.max_party_size
                ),
            });
        }
        if request.duration_minutes == Some(0) {
            return Err(Error::Validation {
                field: "duration_minutes".into(),
                message: "must be greater than 0".into(),
            });
        }
        if !self.settings.in_service(request.time) {
            return Err(Error::OutOfServiceHours {
                time: request.time,
                windows: self.settings.describe_windows(),
            });
        }
        Ok(())
    }

    /// Returns every table or table group that can seat the party, best
    /// first. An empty list means nothing fits.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid (see
    /// [`AvailabilityCalculator::validate`]) or the database query fails.
    pub fn find_candidate_tables(
        &self,
        conn: &Connection,
        request: &AvailabilityRequest,
    ) -> Result<Vec<Candidate>> {
        self.validate(request)?;
        self.rank_within(conn, request, &self.window(request))
    }

    /// Ranks the candidates for `request` over an explicit `window`, without
    /// validating the request.
    pub(crate) fn rank_within(
        &self,
        conn: &Connection,
        request: &AvailabilityRequest,
        window: &TimeWindow,
    ) -> Result<Vec<Candidate>> {
        let held = Database::held_groups(conn)?;
        let tables: Vec<Table> = Database::list_tables(conn)?
            .into_iter()
            .map(|table| fusion_view(table, &held, request.exclude))
            .collect();
        let busy = Database::busy_tables(
            conn,
            window,
            self.settings.seating_buffer_minutes,
            request.exclude,
        )?;

        let candidates = rank_candidates(&tables, &busy, request.party_size, request.zone);
        log::debug!(
            "{} candidate(s) for party of {} at {window}",
            candidates.len(),
            request.party_size
        );
        Ok(candidates)
    }
}

/// `table` as seen by a request on behalf of `exclude`: a group held only
/// by that reservation is its own to reshape, so its members count as
/// individual tables.
pub(crate) fn fusion_view(
    mut table: Table,
    held: &BTreeMap<TableId, Vec<ReservationId>>,
    exclude: Option<ReservationId>,
) -> Table {
    let own = exclude.is_some_and(|own| {
        held.get(&table.id)
            .is_some_and(|holders| holders.iter().all(|&holder| holder == own))
    });
    if table.is_fused() && own {
        table.fusion = FusionState::Individual;
    }
    table
}

/// Ranks the candidates among `tables`, given which tables are busy.
///
/// Singles come from every usable table seating the party alone, fused or
/// not. Groups are the shortest runs of consecutive numbers in one zone,
/// all combinable, unfused and each too small alone, whose effective
/// capacity reaches the party. Fusion groups already standing are offered
/// whole when they seat the party and every member is usable.
///
/// Order: preferred zone first, then smallest capacity, then lowest table
/// number, then fewer tables.
#[must_use]
pub fn rank_candidates(
    tables: &[Table],
    busy: &BTreeMap<TableId, ReservationId>,
    party_size: u32,
    preferred: Option<ZoneId>,
) -> Vec<Candidate> {
    let usable = |t: &Table| {
        t.active && t.fusion != FusionState::Blocked && !busy.contains_key(&t.id)
    };

    let mut candidates: Vec<Candidate> = tables
        .iter()
        .filter(|t| usable(t) && t.capacity >= party_size)
        .map(|t| Candidate::new(vec![t.clone()], preferred))
        .collect();

    let mut by_zone: BTreeMap<ZoneId, Vec<&Table>> = BTreeMap::new();
    for table in tables {
        by_zone.entry(table.zone_id).or_default().push(table);
    }
    for zone_tables in by_zone.values_mut() {
        zone_tables.sort_by_key(|t| t.number);
        let groupable = |t: &Table| {
            usable(t) && t.combinable && !t.is_fused() && t.capacity < party_size
        };
        candidates.extend(
            shortest_runs(zone_tables, party_size, groupable)
                .into_iter()
                .map(|run| Candidate::new(run, preferred)),
        );
    }

    for master in tables.iter().filter(|t| t.fusion == FusionState::FusionMaster) {
        let mut group: Vec<Table> = tables
            .iter()
            .filter(|t| t.group_master() == Some(master.id))
            .cloned()
            .collect();
        group.sort_by_key(|t| t.number);
        let fits = group.len() > 1
            && group.iter().all(|t| usable(t) && t.capacity < party_size)
            && group_capacity(&group) >= party_size;
        if fits {
            candidates.push(Candidate::new(group, preferred));
        }
    }

    candidates.sort_by(|a, b| {
        b.zone_match
            .cmp(&a.zone_match)
            .then(a.capacity.cmp(&b.capacity))
            .then(a.first_number().cmp(&b.first_number()))
            .then(a.tables.len().cmp(&b.tables.len()))
    });
    candidates
}

/// Why `tables`, sorted by number, is not a group the search would build
/// for `party_size`. Returns the offending table's number and the reason.
///
/// A group must stay in one zone, run over consecutive numbers, hold only
/// tables too small for the party alone, and not keep going once its
/// leading tables already seat the party.
#[must_use]
pub fn group_issue(tables: &[Table], party_size: u32) -> Option<(u32, UnavailableReason)> {
    let first = tables.first()?;
    for pair in tables.windows(2) {
        let (previous, next) = (&pair[0], &pair[1]);
        if next.zone_id != first.zone_id {
            return Some((next.number, UnavailableReason::OtherZone));
        }
        if next.number != previous.number + 1 {
            return Some((next.number, UnavailableReason::NotAdjacent));
        }
    }
    if let Some(table) = tables.iter().find(|t| t.capacity >= party_size) {
        return Some((table.number, UnavailableReason::SeatsPartyAlone));
    }
    let (last, leading) = tables.split_last()?;
    if leading.len() > 1 && group_capacity(leading) >= party_size {
        return Some((last.number, UnavailableReason::GroupTooLarge));
    }
    None
}

/// Runs of consecutive table numbers reaching `party_size`, keeping only
/// those of minimal length.
fn shortest_runs(
    sorted: &[&Table],
    party_size: u32,
    groupable: impl Fn(&Table) -> bool,
) -> Vec<Vec<Table>> {
    let mut runs: Vec<Vec<Table>> = Vec::new();

    for start in 0..sorted.len() {
        if !groupable(sorted[start]) {
            continue;
        }
        let mut run = vec![sorted[start].clone()];
        let mut raw_sum = sorted[start].capacity;
        let ceiling = sorted[start].max_combined_capacity;

        for next in &sorted[start + 1..] {
            let last = run.last().map_or(0, |t| t.number);
            if next.number != last + 1 || !groupable(next) || raw_sum >= ceiling {
                break;
            }
            run.push((*next).clone());
            raw_sum += next.capacity;
            if group_capacity(&run) >= party_size {
                runs.push(run.clone());
                break;
            }
        }
    }

    let Some(shortest) = runs.iter().map(Vec::len).min() else {
        return Vec::new();
    };
    runs.retain(|run| run.len() == shortest);
    runs
}
