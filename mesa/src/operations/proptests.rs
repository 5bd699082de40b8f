//! Property-based tests for operations module.
//!
//! These tests cover candidate ranking and customer merging, the two places
//! where the combinations are too many to enumerate by hand.

use std::collections::BTreeMap;

use proptest::prelude::*;

use crate::customer::{ContactInfo, Customer};
use crate::database::test_util::at;
use crate::ids::{CustomerId, ReservationId, TableId, ZoneId};
use crate::table::{FusionState, Table, TableStatus};

use super::availability::group_issue;
use super::{merge_customers, rank_candidates};

// Strategy for a floor of up to 12 tables numbered 1.. in two zones
fn floor_strategy() -> impl Strategy<Value = Vec<Table>> {
    prop::collection::vec((1u32..=8, 0u32..=6, any::<bool>(), 1i64..=2), 1..12).prop_map(
        |specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (capacity, extra, combinable, zone))| {
                    let number = u32::try_from(i).unwrap_or(0) + 1;
                    Table {
                        id: TableId(i64::from(number)),
                        number,
                        zone_id: ZoneId(zone),
                        capacity,
                        max_combined_capacity: capacity + extra * 2,
                        combinable,
                        active: true,
                        fusion: FusionState::Individual,
                        status: TableStatus::Free,
                        version: 0,
                    }
                })
                .collect()
        },
    )
}

fn text_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[a-z]{1,12}")
}

fn customer_strategy(id: i64) -> impl Strategy<Value = Customer> {
    (
        "[A-Z][a-z]{2,8}",
        text_strategy(),
        text_strategy(),
        text_strategy(),
        text_strategy(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(move |(name, email, phone, notes, allergies, vip, marketing)| {
            let mut customer = Customer::from_contact(&ContactInfo::new(name, email, phone), at(9, 0));
            customer.id = CustomerId(id);
            customer.notes = notes;
            customer.allergies = allergies;
            customer.vip = vip;
            customer.marketing_opt_in = marketing;
            customer
        })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 2000,
        .. ProptestConfig::default()
    })]

    // Every candidate seats the party and uses only free, active tables
    #[test]
    fn candidates_seat_the_party(
        tables in floor_strategy(),
        party in 1u32..=14,
        busy_numbers in prop::collection::btree_set(1u32..=12, 0..4),
    ) {
        let busy: BTreeMap<TableId, ReservationId> = busy_numbers
            .iter()
            .map(|n| (TableId(i64::from(*n)), ReservationId(1)))
            .collect();
        for candidate in rank_candidates(&tables, &busy, party, None) {
            prop_assert!(candidate.capacity >= party);
            for table in &candidate.tables {
                prop_assert!(!busy.contains_key(&table.id));
                prop_assert_eq!(table.zone_id, candidate.zone_id);
            }
            if candidate.is_group() {
                for pair in candidate.tables.windows(2) {
                    prop_assert_eq!(pair[1].number, pair[0].number + 1);
                }
                prop_assert!(candidate.tables.iter().all(|t| t.combinable));
            }
        }
    }

    // Assign accepts the shape of every group the search offers
    #[test]
    fn offered_groups_have_no_shape_issue(
        tables in floor_strategy(),
        party in 2u32..=14,
    ) {
        for candidate in rank_candidates(&tables, &BTreeMap::new(), party, None) {
            if candidate.is_group() {
                prop_assert_eq!(group_issue(&candidate.tables, party), None);
            }
        }
    }

    // Ranking puts the preferred zone first, then the smallest capacity
    #[test]
    fn candidates_are_ranked(
        tables in floor_strategy(),
        party in 1u32..=14,
        preferred in prop::option::of(1i64..=2),
    ) {
        let ranked = rank_candidates(&tables, &BTreeMap::new(), party, preferred.map(ZoneId));
        for pair in ranked.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(a.zone_match >= b.zone_match);
            if a.zone_match == b.zone_match {
                prop_assert!(a.capacity <= b.capacity);
            }
        }
    }

    // A merge never loses a non-empty value from either record
    #[test]
    fn merge_keeps_every_value(a in customer_strategy(1), b in customer_strategy(2)) {
        let (merged, reconciliation) = merge_customers(&a, &b, " | ");
        let everything = format!(
            "{} {} {} {} {}",
            merged.name,
            merged.email.clone().unwrap_or_default(),
            merged.phone.clone().unwrap_or_default(),
            merged.notes.clone().unwrap_or_default(),
            merged.allergies.clone().unwrap_or_default(),
        );

        prop_assert!(everything.contains(&b.name));
        for value in [&a.email, &a.phone, &a.notes, &a.allergies, &b.email, &b.phone, &b.notes, &b.allergies]
            .into_iter()
            .flatten()
        {
            prop_assert!(everything.contains(value.as_str()), "lost {}", value);
        }
        prop_assert_eq!(merged.name, a.name);
        prop_assert_eq!(merged.vip, a.vip || b.vip);
        prop_assert_eq!(merged.marketing_opt_in, a.marketing_opt_in || b.marketing_opt_in);
        prop_assert_eq!(merged.visit_count, a.visit_count);
        prop_assert_eq!(reconciliation.len(), 2);
    }
}
