/// Property-based tests for schedule ordering and stacking invariants
///
/// Uses proptest to verify the invariants the layout depends on: the
/// schedule drains in a strict total order, rows never overlap, and
/// dedup conserves record counts.
use proptest::prelude::*;
use std::collections::BTreeSet;

use readstack::block::Block;
use readstack::layout::{TrackLayout, Window};
use readstack::mapping::Mapping;
use readstack::read_group::MappingGroup;
use readstack::schedule::BlockSchedule;

/// Property: draining from position 0 yields (start, stop, id) triples in
/// strictly ascending order, and exactly one per distinct triple inserted
#[test]
fn prop_drain_is_strictly_ascending() {
    proptest!(|(
        raw in prop::collection::vec((1u32..10_000, 0u32..500, 0u64..50), 0..80)
    )| {
        let mut schedule = BlockSchedule::new();
        let mut distinct = BTreeSet::new();
        for &(start, len, id) in &raw {
            schedule.insert(Block::new(start, start + len, id, 1));
            distinct.insert((start, start + len, id));
        }

        let mut drained = Vec::new();
        while let Some(block) = schedule.next_at_or_after(0) {
            drained.push((block.start, block.stop, block.mapping_id));
        }

        prop_assert_eq!(drained.len(), distinct.len(),
            "One drained block per distinct triple");
        for pair in drained.windows(2) {
            prop_assert!(pair[0] < pair[1],
                "Drain order not strictly ascending: {:?} then {:?}", pair[0], pair[1]);
        }
        prop_assert!(schedule.is_empty());
    });
}

/// Property: next_at_or_after returns exactly what a linear scan would:
/// the least (start, stop, id) among blocks with start >= pos
#[test]
fn prop_next_matches_naive_scan() {
    proptest!(|(
        raw in prop::collection::vec((1u32..1_000, 0u32..100, 0u64..20), 1..40),
        pos in 0u32..1_200
    )| {
        let mut schedule = BlockSchedule::new();
        let mut mirror: BTreeSet<(u32, u32, u64)> = BTreeSet::new();
        for &(start, len, id) in &raw {
            schedule.insert(Block::new(start, start + len, id, 1));
            mirror.insert((start, start + len, id));
        }

        let expected = mirror.iter().find(|&&(start, _, _)| start >= pos).copied();
        let got = schedule
            .next_at_or_after(pos)
            .map(|b| (b.start, b.stop, b.mapping_id));

        prop_assert_eq!(got, expected);
    });
}

/// Property: no two blocks in a row overlap, and every visible mapping
/// lands in exactly one row
#[test]
fn prop_rows_never_overlap() {
    proptest!(|(
        raw in prop::collection::vec((1u32..5_000, 0u32..800), 0..60),
        spacing in 0u32..4
    )| {
        let window = Window::new(0, 1, 6_000);
        let mappings: Vec<Mapping> = raw
            .iter()
            .enumerate()
            .map(|(i, &(start, len))| {
                Mapping::new(0, start, start + len, false, 0).with_id(i as u64)
            })
            .collect();

        let layout = TrackLayout::build(&mappings, window, spacing);
        prop_assert_eq!(layout.block_count(), mappings.len());

        for row in layout.rows() {
            for pair in row.windows(2) {
                prop_assert!(pair[1].start > pair[0].stop + spacing,
                    "Row neighbors too close: {}..{} then {}..{} (spacing {})",
                    pair[0].start, pair[0].stop, pair[1].start, pair[1].stop, spacing);
            }
        }
    });
}

/// Property: repeat counters conserve the raw record count, and the
/// number of unique mappings equals the number of distinct coordinates
#[test]
fn prop_dedup_conserves_records() {
    proptest!(|(
        raw in prop::collection::vec((1u32..1_000, 0u32..100, 0u32..5, 1u32..4), 1..30)
    )| {
        let mut group = MappingGroup::new();
        let mut total = 0u64;
        let mut distinct = BTreeSet::new();
        for &(start, len, errors, copies) in &raw {
            for _ in 0..copies {
                group.insert(Mapping::new(0, start, start + len, false, errors));
                total += 1;
            }
            distinct.insert((start, start + len));
        }

        prop_assert_eq!(group.record_count(), total);
        prop_assert_eq!(group.len(), distinct.len());
    });
}

/// Property: after tagging, the best set is exactly the mappings at the
/// group minimum, and it is never empty for a non-empty group
#[test]
fn prop_best_set_is_the_minimum_layer() {
    proptest!(|(errors in prop::collection::vec(0u32..10, 1..20))| {
        let mut group = MappingGroup::new();
        for (i, &e) in errors.iter().enumerate() {
            let start = 100 + (i as u32) * 10;
            group.insert(Mapping::new(0, start, start + 5, false, e));
        }

        let min = *errors.iter().min().unwrap();
        let expected = errors.iter().filter(|&&e| e == min).count();

        let best: Vec<u32> = group.best_mappings().map(|m| m.errors).collect();
        prop_assert_eq!(best.len(), expected);
        prop_assert!(best.iter().all(|&e| e == min));
    });
}
