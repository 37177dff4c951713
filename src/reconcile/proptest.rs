//! Property-Based Tests for Addressing and Reconciliation
//!
//! # Test Properties
//!
//! 1. **Roundtrip**: decode(encode(c, p), p) = c for every pattern
//! 2. **Count Invariant**: total_bins(s) = |generate(s)|
//! 3. **Diff Conservation**: preserve + delete + conflicts = |current|,
//!    preserve + create = |proposed|
//! 4. **Idempotence**: diff(s, s) creates, deletes and renames nothing
//! 5. **Occupancy Consistency**: occupied + empty = total, transfers keep total

#![cfg(test)]

use proptest::prelude::*;

use crate::address::{
    AddressCodec, BinCoordinate, BinDirection, BinLabeling, CodePattern, ZoneCodes,
};
use crate::occupancy::{ItemId, OccupancyIndex};
use crate::reconcile::ReconciliationEngine;
use crate::structure::{AisleConfig, StructureGenerator, ZoneStructure};

// =============================================================================
// Property Strategies
// =============================================================================

fn pattern_strategy() -> impl Strategy<Value = CodePattern> {
    (
        prop::sample::select(vec!["-", ".", "/", "_", "::"]),
        2u32..=4,
        2u32..=3,
        prop::bool::ANY,
        prop::bool::ANY,
    )
        .prop_map(|(sep, aisle_digits, shelf_digits, letters, bottom_up)| CodePattern {
            separator: sep.to_string(),
            aisle_digits,
            shelf_digits,
            bin_labeling: if letters {
                BinLabeling::Letters
            } else {
                BinLabeling::Numbers
            },
            bin_direction: if bottom_up {
                BinDirection::BottomUp
            } else {
                BinDirection::TopDown
            },
        })
}

/// Small structures so full generation stays cheap.
fn structure_strategy() -> impl Strategy<Value = ZoneStructure> {
    let uniform = (1u32..=5, 1u32..=5, 1u32..=30, pattern_strategy())
        .prop_map(|(a, s, b, p)| ZoneStructure::uniform(a, s, b).with_pattern(p));
    let per_aisle = (
        prop::collection::btree_map(1u32..=40, (1u32..=6, 1u32..=30), 1..5),
        pattern_strategy(),
    )
        .prop_map(|(aisles, p)| {
            ZoneStructure::per_aisle(
                aisles
                    .into_iter()
                    .map(|(n, (s, b))| AisleConfig::new(n, s, b))
                    .collect(),
            )
            .with_pattern(p)
        });
    prop_oneof![uniform, per_aisle]
}

fn generator() -> StructureGenerator {
    StructureGenerator::new(ZoneCodes::new("WH", "Z1"))
}

/// Index for `structure` with every `stride`-th bin occupied.
fn occupied_index(structure: &ZoneStructure, stride: usize) -> OccupancyIndex {
    let bins = generator().generate(structure).unwrap();
    let mut index = OccupancyIndex::from_bins(&bins);
    for (i, bin) in bins.iter().enumerate().step_by(stride.max(1)) {
        index
            .transfer(&ItemId::new(format!("item-{}", i)), None, Some(bin.coordinate))
            .unwrap();
    }
    index
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: decoding an encoded coordinate returns the coordinate.
    #[test]
    fn prop_address_roundtrip(
        pattern in pattern_strategy(),
        aisle in 1u32..=99,
        shelf in 1u32..=99,
        width in 1u32..=800,
        bin_seed in any::<u32>(),
    ) {
        let codec = AddressCodec::new(ZoneCodes::new("WH", "Z1"), pattern)?;
        let coordinate = BinCoordinate::new(aisle, shelf, bin_seed % width);
        let address = codec.encode(coordinate, width);
        prop_assert_eq!(codec.decode(&address, width)?, coordinate);
    }

    /// Property: the declared total matches the generated sequence.
    #[test]
    fn prop_count_invariant(structure in structure_strategy()) {
        let bins = generator().generate(&structure)?;
        prop_assert_eq!(bins.len() as u64, structure.total_bins());

        let mut sorted = bins.iter().map(|b| b.coordinate).collect::<Vec<_>>();
        sorted.sort();
        prop_assert_eq!(sorted, bins.iter().map(|b| b.coordinate).collect::<Vec<_>>());
    }

    /// Property: every coordinate is classified exactly once.
    #[test]
    fn prop_diff_conservation(
        current in structure_strategy(),
        proposed in structure_strategy(),
        stride in 1usize..7,
    ) {
        let index = occupied_index(&current, stride);
        let engine = ReconciliationEngine::new(generator());
        let preview = engine.diff(Some(&current), &proposed, &index)?.preview(1);

        prop_assert_eq!(
            (preview.bins_to_preserve + preview.bins_to_delete_empty + preview.bins_with_items.len()) as u64,
            current.total_bins()
        );
        prop_assert_eq!(
            (preview.bins_to_preserve + preview.bins_to_create) as u64,
            proposed.total_bins()
        );
        prop_assert!(preview.address_updates <= preview.bins_to_preserve);
        prop_assert_eq!(
            preview.total_affected_items,
            preview.bins_with_items.iter().map(|b| b.item_count).sum::<usize>()
        );
    }

    /// Property: proposing the current structure changes nothing.
    #[test]
    fn prop_idempotence(structure in structure_strategy(), stride in 1usize..7) {
        let index = occupied_index(&structure, stride);
        let engine = ReconciliationEngine::new(generator());
        let preview = engine.diff(Some(&structure), &structure, &index)?.preview(1);

        prop_assert_eq!(preview.bins_to_create, 0);
        prop_assert_eq!(preview.bins_to_delete_empty, 0);
        prop_assert_eq!(preview.address_updates, 0);
        prop_assert!(preview.bins_with_items.is_empty());
    }

    /// Property: transfers never change the total and keep the counts balanced.
    #[test]
    fn prop_occupancy_consistency(
        structure in structure_strategy(),
        moves in prop::collection::vec((any::<prop::sample::Index>(), any::<prop::sample::Index>()), 1..20),
    ) {
        let bins = generator().generate(&structure)?;
        let mut index = OccupancyIndex::from_bins(&bins);
        let total = index.stats().total;

        for (n, (item_pick, bin_pick)) in moves.iter().enumerate() {
            let item = ItemId::new(format!("item-{}", item_pick.index(5)));
            let target = bins[bin_pick.index(bins.len())].coordinate;
            let from = index.locate(&item);
            let to = if n % 4 == 3 { None } else { Some(target) };
            if from.is_none() && to.is_none() {
                continue;
            }
            index.transfer(&item, from, to)?;

            let stats = index.stats();
            prop_assert_eq!(stats.total, total);
            prop_assert_eq!(stats.occupied + stats.empty, stats.total);
        }
    }
}
