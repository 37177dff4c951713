//! Structure diff and staging

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use super::policy::{DetachedItem, ResolutionPlan, Transition};
use crate::address::BinCoordinate;
use crate::error::{Error, Result};
use crate::occupancy::{BinState, BinView, ItemId, OccupancyIndex};
use crate::structure::{Bin, StructureGenerator, ZoneStructure};

// =============================================================================
// Diff Types
// =============================================================================

/// A coordinate present in both structures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreservedBin {
    pub coordinate: BinCoordinate,
    pub old_address: String,
    pub new_address: String,
}

impl PreservedBin {
    pub fn address_changed(&self) -> bool {
        self.old_address != self.new_address
    }
}

/// A removed coordinate that still holds items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictBin {
    pub coordinate: BinCoordinate,
    pub address: String,
    pub state: BinState,
    pub items: Vec<ItemId>,
}

/// Conflict summary entry in a preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinWithItems {
    pub bin_id: BinCoordinate,
    pub address: String,
    pub item_count: usize,
}

/// Decision-support summary of a proposed reconfiguration. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconfigurationPreview {
    pub is_first_configuration: bool,
    /// Zone revision the preview was computed against
    pub revision: u64,
    pub bins_to_preserve: usize,
    pub bins_to_create: usize,
    pub bins_to_delete_empty: usize,
    pub address_updates: usize,
    pub bins_with_items: Vec<BinWithItems>,
    pub total_affected_items: usize,
    /// Bins in the proposed structure
    pub total_bins: u64,
    pub first_address: Option<String>,
    pub last_address: Option<String>,
}

impl ReconfigurationPreview {
    pub fn has_conflicts(&self) -> bool {
        !self.bins_with_items.is_empty()
    }
}

/// Full coordinate-level diff between two structures.
#[derive(Debug, Clone)]
pub struct ReconciliationDiff {
    pub is_first_configuration: bool,
    pub proposed: ZoneStructure,
    pub preserved: Vec<PreservedBin>,
    pub created: Vec<Bin>,
    pub deleted_empty: Vec<Bin>,
    pub conflicts: Vec<ConflictBin>,
    /// First and last proposed address in generation order
    pub address_range: Option<(String, String)>,
}

impl ReconciliationDiff {
    /// Size of the current address space.
    pub fn current_len(&self) -> usize {
        self.preserved.len() + self.deleted_empty.len() + self.conflicts.len()
    }

    /// Size of the proposed address space.
    pub fn proposed_len(&self) -> usize {
        self.preserved.len() + self.created.len()
    }

    pub fn address_updates(&self) -> usize {
        self.preserved.iter().filter(|p| p.address_changed()).count()
    }

    pub fn total_affected_items(&self) -> usize {
        self.conflicts.iter().map(|c| c.items.len()).sum()
    }

    /// No bins created, removed or renamed.
    pub fn is_noop(&self) -> bool {
        self.created.is_empty()
            && self.deleted_empty.is_empty()
            && self.conflicts.is_empty()
            && self.address_updates() == 0
    }

    /// Summarise the diff for the operator.
    pub fn preview(&self, revision: u64) -> ReconfigurationPreview {
        let (first_address, last_address) = self.address_range.clone().unzip();
        ReconfigurationPreview {
            is_first_configuration: self.is_first_configuration,
            revision,
            bins_to_preserve: self.preserved.len(),
            bins_to_create: self.created.len(),
            bins_to_delete_empty: self.deleted_empty.len(),
            address_updates: self.address_updates(),
            bins_with_items: self
                .conflicts
                .iter()
                .map(|c| BinWithItems {
                    bin_id: c.coordinate,
                    address: c.address.clone(),
                    item_count: c.items.len(),
                })
                .collect(),
            total_affected_items: self.total_affected_items(),
            total_bins: self.proposed.total_bins(),
            first_address,
            last_address,
        }
    }

    /// Build the post-reconfiguration index on a copy of `live`.
    ///
    /// `plan` must have been resolved from this diff's conflicts.
    pub fn stage(&self, live: &OccupancyIndex, plan: &ResolutionPlan) -> Result<StagedReconfiguration> {
        let mut index = live.clone();
        let mut blocked = Vec::new();
        let mut detached = Vec::new();
        let now = Utc::now();

        for bin in &self.deleted_empty {
            index.remove(&bin.coordinate);
        }

        for transition in &plan.transitions {
            match transition {
                Transition::Block { coordinate, .. } => {
                    index.set_state(coordinate, BinState::Blocked)?;
                    if let Some(view) = index.view(coordinate) {
                        blocked.push(view);
                    }
                }
                Transition::Detach { coordinate, address, .. } => {
                    let record = index
                        .remove(coordinate)
                        .ok_or_else(|| Error::NotFound(format!("bin {}", coordinate)))?;
                    detached.extend(record.items.into_iter().map(|item| DetachedItem {
                        item,
                        last_known_address: address.clone(),
                        coordinate: *coordinate,
                        detached_at: now,
                    }));
                }
            }
        }

        for preserved in self.preserved.iter().filter(|p| p.address_changed()) {
            index.rewrite_address(&preserved.coordinate, preserved.new_address.clone());
        }

        for bin in &self.created {
            index.insert_empty(bin.coordinate, bin.address.clone());
        }

        if let Some((blocked_bin, other)) = index.address_clashes().into_iter().next() {
            return Err(Error::config(
                "pattern",
                format!(
                    "blocked bin {} at {} would share its address with bin {}; drain it first",
                    blocked_bin.address, blocked_bin.coordinate, other
                ),
            ));
        }

        let stats = index.stats();
        if stats.total != self.proposed.total_bins() {
            return Err(Error::InvalidState {
                coordinate: "*".to_string(),
                reason: format!(
                    "staged {} structural bins, structure implies {}",
                    stats.total,
                    self.proposed.total_bins()
                ),
            });
        }

        Ok(StagedReconfiguration {
            index,
            blocked,
            detached,
        })
    }
}

/// Result of staging a reconfiguration, ready to be persisted and swapped in.
#[derive(Debug, Clone)]
pub struct StagedReconfiguration {
    pub index: OccupancyIndex,
    pub blocked: Vec<BinView>,
    pub detached: Vec<DetachedItem>,
}

// =============================================================================
// Engine
// =============================================================================

/// Computes coordinate-level diffs for one zone.
#[derive(Debug, Clone)]
pub struct ReconciliationEngine {
    generator: StructureGenerator,
}

impl ReconciliationEngine {
    pub fn new(generator: StructureGenerator) -> Self {
        Self { generator }
    }

    pub fn generator(&self) -> &StructureGenerator {
        &self.generator
    }

    /// Classify every coordinate of both structures.
    ///
    /// `current = None` means the zone has never been configured.
    #[instrument(skip_all, fields(zone = %self.generator.codes().zone))]
    pub fn diff(
        &self,
        current: Option<&ZoneStructure>,
        proposed: &ZoneStructure,
        index: &OccupancyIndex,
    ) -> Result<ReconciliationDiff> {
        let proposed_bins = self.generator.generate(proposed)?;
        let address_range = self.generator.address_range(proposed)?;

        let Some(current) = current else {
            return Ok(ReconciliationDiff {
                is_first_configuration: true,
                proposed: proposed.clone(),
                preserved: Vec::new(),
                created: proposed_bins,
                deleted_empty: Vec::new(),
                conflicts: Vec::new(),
                address_range,
            });
        };

        // the current structure passed the ceiling when it was applied
        let mut remaining: BTreeMap<BinCoordinate, String> = self
            .generator
            .regenerate(current)?
            .into_iter()
            .map(|b| (b.coordinate, b.address))
            .collect();

        let mut preserved = Vec::new();
        let mut created = Vec::new();
        for bin in proposed_bins {
            match remaining.remove(&bin.coordinate) {
                Some(old_address) => preserved.push(PreservedBin {
                    coordinate: bin.coordinate,
                    old_address,
                    new_address: bin.address,
                }),
                None => created.push(bin),
            }
        }

        let mut deleted_empty = Vec::new();
        let mut conflicts = Vec::new();
        for (coordinate, address) in remaining {
            match index.get(&coordinate) {
                Some(record) if record.state != BinState::Empty => conflicts.push(ConflictBin {
                    coordinate,
                    address,
                    state: record.state,
                    items: record.items.iter().cloned().collect(),
                }),
                _ => deleted_empty.push(Bin {
                    coordinate,
                    address,
                }),
            }
        }

        let diff = ReconciliationDiff {
            is_first_configuration: false,
            proposed: proposed.clone(),
            preserved,
            created,
            deleted_empty,
            conflicts,
            address_range,
        };
        debug!(
            preserve = diff.preserved.len(),
            create = diff.created.len(),
            delete_empty = diff.deleted_empty.len(),
            conflicts = diff.conflicts.len(),
            address_updates = diff.address_updates(),
            "Computed reconciliation diff"
        );
        Ok(diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{BinLabeling, CodePattern, ZoneCodes};
    use crate::reconcile::{OccupiedBinPolicy, OccupiedBinsAction};
    use crate::structure::AisleConfig;
    use assert_matches::assert_matches;

    fn engine() -> ReconciliationEngine {
        ReconciliationEngine::new(StructureGenerator::new(ZoneCodes::new("WH", "Z1")))
    }

    fn index_for(structure: &ZoneStructure) -> OccupancyIndex {
        OccupancyIndex::from_bins(&engine().generator().generate(structure).unwrap())
    }

    fn c(aisle: u32, shelf: u32, bin: u32) -> BinCoordinate {
        BinCoordinate::new(aisle, shelf, bin)
    }

    #[test]
    fn test_first_configuration_creates_everything() {
        let proposed = ZoneStructure::uniform(2, 3, 4);
        let diff = engine().diff(None, &proposed, &OccupancyIndex::default()).unwrap();
        let preview = diff.preview(0);
        assert!(preview.is_first_configuration);
        assert_eq!(preview.bins_to_create, 24);
        assert_eq!(preview.bins_to_preserve, 0);
        assert_eq!(preview.first_address.as_deref(), Some("WH-Z1-0101-A"));
        assert_eq!(preview.last_address.as_deref(), Some("WH-Z1-0203-D"));
    }

    #[test]
    fn test_identical_structure_is_noop() {
        let s = ZoneStructure::uniform(2, 3, 4);
        let mut idx = index_for(&s);
        idx.transfer(&ItemId::from("A"), None, Some(c(2, 3, 3))).unwrap();

        let diff = engine().diff(Some(&s), &s, &idx).unwrap();
        assert!(diff.is_noop());
        let preview = diff.preview(1);
        assert_eq!(preview.bins_to_preserve, 24);
        assert_eq!(preview.bins_to_create, 0);
        assert_eq!(preview.bins_to_delete_empty, 0);
        assert_eq!(preview.address_updates, 0);
        assert!(preview.bins_with_items.is_empty());
    }

    #[test]
    fn test_shrink_with_occupied_bin() {
        let current = ZoneStructure::uniform(2, 3, 4);
        let proposed = ZoneStructure::uniform(2, 3, 3);
        let mut idx = index_for(&current);
        idx.transfer(&ItemId::from("A"), None, Some(c(2, 3, 3))).unwrap();

        let diff = engine().diff(Some(&current), &proposed, &idx).unwrap();
        let preview = diff.preview(1);
        assert_eq!(preview.bins_to_preserve, 18);
        assert_eq!(preview.bins_to_delete_empty, 5);
        assert_eq!(preview.bins_with_items.len(), 1);
        assert_eq!(preview.bins_with_items[0].address, "WH-Z1-0203-D");
        assert_eq!(preview.bins_with_items[0].item_count, 1);
        assert_eq!(preview.total_affected_items, 1);
        assert_eq!(diff.current_len(), 24);
        assert_eq!(diff.proposed_len(), 18);
    }

    #[test]
    fn test_pattern_change_counts_address_updates() {
        let current = ZoneStructure::uniform(2, 2, 2);
        let proposed = current.clone().with_pattern(CodePattern {
            bin_labeling: BinLabeling::Numbers,
            ..CodePattern::default()
        });
        let diff = engine().diff(Some(&current), &proposed, &index_for(&current)).unwrap();
        assert_eq!(diff.preserved.len(), 8);
        assert_eq!(diff.address_updates(), 8);
        assert!(diff.created.is_empty());
    }

    #[test]
    fn test_per_aisle_switch() {
        let current = ZoneStructure::uniform(2, 2, 2);
        let proposed = ZoneStructure::per_aisle(vec![AisleConfig::new(2, 3, 2), AisleConfig::new(3, 1, 1)]);
        let diff = engine().diff(Some(&current), &proposed, &index_for(&current)).unwrap();
        // aisle 1 removed, aisle 2 grows a shelf, aisle 3 is new
        assert_eq!(diff.deleted_empty.len(), 4);
        assert_eq!(diff.preserved.len(), 4);
        assert_eq!(diff.created.len(), 3);
    }

    #[test]
    fn test_invalid_proposed_structure_rejected() {
        let current = ZoneStructure::uniform(2, 2, 2);
        let result = engine().diff(Some(&current), &ZoneStructure::uniform(100, 1, 1), &index_for(&current));
        assert!(matches!(result, Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_shrink_allowed_when_current_exceeds_ceiling() {
        let current = ZoneStructure::uniform(2, 3, 4);
        let idx = index_for(&current);
        let limited = ReconciliationEngine::new(
            StructureGenerator::new(ZoneCodes::new("WH", "Z1")).with_max_bins(10),
        );

        let diff = limited
            .diff(Some(&current), &ZoneStructure::uniform(1, 1, 1), &idx)
            .unwrap();
        assert_eq!(diff.preserved.len(), 1);
        assert_eq!(diff.deleted_empty.len(), 23);
        let preview = diff.preview(1);
        assert_eq!(preview.first_address.as_deref(), Some("WH-Z1-0101-A"));
        assert_eq!(preview.last_address.as_deref(), Some("WH-Z1-0101-A"));

        assert_matches!(
            limited.diff(Some(&current), &ZoneStructure::uniform(2, 3, 2), &idx),
            Err(Error::Configuration { field, .. }) if field == "totalBins"
        );
    }

    #[test]
    fn test_stage_block_and_address_rewrite() {
        let current = ZoneStructure::uniform(1, 1, 3);
        let proposed = ZoneStructure::uniform(1, 1, 2).with_pattern(CodePattern {
            separator: ".".to_string(),
            ..CodePattern::default()
        });
        let mut idx = index_for(&current);
        idx.transfer(&ItemId::from("A"), None, Some(c(1, 1, 2))).unwrap();

        let diff = engine().diff(Some(&current), &proposed, &idx).unwrap();
        let plan = OccupiedBinPolicy::resolve(&diff.conflicts, Some(OccupiedBinsAction::Block)).unwrap();
        let staged = diff.stage(&idx, &plan).unwrap();

        assert_eq!(staged.blocked.len(), 1);
        assert_eq!(staged.index.state(&c(1, 1, 2)), Some(BinState::Blocked));
        assert_eq!(staged.index.get(&c(1, 1, 2)).unwrap().address, "WH-Z1-0101-C");
        assert!(staged.index.find_by_address("WH.Z1.0101.A").is_some());
        assert!(staged.index.find_by_address("WH-Z1-0101-A").is_none());
        assert_eq!(staged.index.stats().total, 2);
        // live index untouched
        assert_eq!(idx.state(&c(1, 1, 2)), Some(BinState::Occupied));
    }

    #[test]
    fn test_stage_force_stamps_last_known_address() {
        let current = ZoneStructure::uniform(1, 1, 3);
        let proposed = ZoneStructure::uniform(1, 1, 1);
        let mut idx = index_for(&current);
        idx.transfer(&ItemId::from("A"), None, Some(c(1, 1, 2))).unwrap();
        idx.transfer(&ItemId::from("B"), None, Some(c(1, 1, 2))).unwrap();

        let diff = engine().diff(Some(&current), &proposed, &idx).unwrap();
        let plan = OccupiedBinPolicy::resolve(&diff.conflicts, Some(OccupiedBinsAction::Force)).unwrap();
        let staged = diff.stage(&idx, &plan).unwrap();

        assert_eq!(staged.detached.len(), 2);
        assert!(staged
            .detached
            .iter()
            .all(|d| d.last_known_address == "WH-Z1-0101-C"));
        assert_eq!(staged.index.get(&c(1, 1, 2)), None);
        assert_eq!(staged.index.locate(&ItemId::from("A")), None);
        assert_eq!(staged.index.stats().total, 1);
    }

    #[test]
    fn test_stage_rejects_address_taken_from_blocked_bin() {
        let current = ZoneStructure::uniform(1, 1, 3);
        let mut idx = index_for(&current);
        idx.transfer(&ItemId::from("A"), None, Some(c(1, 1, 2))).unwrap();

        let narrow = ZoneStructure::uniform(1, 1, 2);
        let shrink = engine().diff(Some(&current), &narrow, &idx).unwrap();
        let plan = OccupiedBinPolicy::resolve(&shrink.conflicts, Some(OccupiedBinsAction::Block)).unwrap();
        let blocked = shrink.stage(&idx, &plan).unwrap().index;
        assert_eq!(blocked.get(&c(1, 1, 2)).unwrap().address, "WH-Z1-0101-C");

        // aisle 10 shelf 1 renders as "0101" with 3 aisle digits and 1 shelf digit
        let clashing = ZoneStructure::per_aisle(vec![AisleConfig::new(1, 1, 2), AisleConfig::new(10, 1, 3)])
            .with_pattern(CodePattern {
                aisle_digits: 3,
                shelf_digits: 1,
                ..CodePattern::default()
            });
        let diff = engine().diff(Some(&narrow), &clashing, &blocked).unwrap();
        assert!(diff.created.iter().any(|b| b.address == "WH-Z1-0101-C"));
        assert_matches!(
            diff.stage(&blocked, &ResolutionPlan::default()),
            Err(Error::Configuration { field, .. }) if field == "pattern"
        );
    }

    #[test]
    fn test_stage_reintegrates_blocked_bin() {
        let wide = ZoneStructure::uniform(1, 1, 3);
        let narrow = ZoneStructure::uniform(1, 1, 2);
        let mut idx = index_for(&wide);
        idx.transfer(&ItemId::from("A"), None, Some(c(1, 1, 2))).unwrap();

        let shrink = engine().diff(Some(&wide), &narrow, &idx).unwrap();
        let plan = OccupiedBinPolicy::resolve(&shrink.conflicts, Some(OccupiedBinsAction::Block)).unwrap();
        let blocked = shrink.stage(&idx, &plan).unwrap().index;

        let grow = engine().diff(Some(&narrow), &wide, &blocked).unwrap();
        assert_eq!(grow.created.len(), 1);
        let staged = grow.stage(&blocked, &ResolutionPlan::default()).unwrap();
        assert_eq!(staged.index.state(&c(1, 1, 2)), Some(BinState::Occupied));
        assert_eq!(staged.index.stats().occupied, 1);
        assert_eq!(staged.index.stats().blocked, 0);
    }
}
