//! Occupancy index storage and transfers

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};

use super::{BinEntry, BinRecord, BinState, BinView, ItemId, OccupancyStats};
use crate::address::BinCoordinate;
use crate::error::{Error, Result};
use crate::structure::Bin;

/// Result of a successful transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub item: ItemId,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
}

/// Dense per-coordinate occupancy for one zone.
///
/// Holds every bin of the current structure plus blocked bins that were
/// removed from it while still holding items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OccupancyIndex {
    bins: BTreeMap<BinCoordinate, BinRecord>,
    /// Structural (non-blocked) bins only
    by_address: HashMap<String, BinCoordinate>,
    item_locations: HashMap<ItemId, BinCoordinate>,
}

impl OccupancyIndex {
    /// Index a freshly generated address space; every bin starts empty.
    pub fn from_bins(bins: &[Bin]) -> Self {
        let mut index = Self::default();
        for bin in bins {
            index.insert_empty(bin.coordinate, bin.address.clone());
        }
        index
    }

    /// Rebuild from persisted entries.
    pub fn from_entries(entries: Vec<BinEntry>) -> Result<Self> {
        let mut index = Self::default();
        for entry in entries {
            check_invariant(&entry.coordinate, entry.record.state, entry.record.items.len())?;
            for item in &entry.record.items {
                if let Some(previous) = index.item_locations.insert(item.clone(), entry.coordinate) {
                    return Err(Error::InvalidState {
                        coordinate: entry.coordinate.to_string(),
                        reason: format!("item {} is also linked to {}", item, previous),
                    });
                }
            }
            if entry.record.state != BinState::Blocked {
                index
                    .by_address
                    .insert(entry.record.address.clone(), entry.coordinate);
            }
            index.bins.insert(entry.coordinate, entry.record);
        }
        Ok(index)
    }

    /// Entries in coordinate order for persistence.
    pub fn entries(&self) -> Vec<BinEntry> {
        self.bins
            .iter()
            .map(|(coordinate, record)| BinEntry {
                coordinate: *coordinate,
                record: record.clone(),
            })
            .collect()
    }

    pub fn get(&self, coordinate: &BinCoordinate) -> Option<&BinRecord> {
        self.bins.get(coordinate)
    }

    pub fn state(&self, coordinate: &BinCoordinate) -> Option<BinState> {
        self.bins.get(coordinate).map(|r| r.state)
    }

    /// Number of indexed bins, blocked ones included.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Items currently linked to a bin.
    pub fn items_in(&self, coordinate: &BinCoordinate) -> Vec<ItemId> {
        self.bins
            .get(coordinate)
            .map(|r| r.items.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Where an item is currently stored.
    pub fn locate(&self, item: &ItemId) -> Option<BinCoordinate> {
        self.item_locations.get(item).copied()
    }

    /// Zone aggregates over the current structure.
    pub fn stats(&self) -> OccupancyStats {
        let mut total = 0;
        let mut occupied = 0;
        let mut blocked = 0;
        for record in self.bins.values() {
            match record.state {
                BinState::Empty => total += 1,
                BinState::Occupied => {
                    total += 1;
                    occupied += 1;
                }
                BinState::Blocked => blocked += 1,
            }
        }
        OccupancyStats::new(total, occupied, blocked)
    }

    /// Every bin in coordinate order, blocked bins included.
    pub fn listing(&self) -> Vec<BinView> {
        self.bins
            .iter()
            .map(|(coordinate, record)| view(coordinate, record))
            .collect()
    }

    /// Blocked bins awaiting manual resolution.
    pub fn blocked(&self) -> Vec<BinView> {
        self.bins
            .iter()
            .filter(|(_, r)| r.state == BinState::Blocked)
            .map(|(coordinate, record)| view(coordinate, record))
            .collect()
    }

    /// Blocked bins whose address a structural bin now also renders,
    /// paired with that structural bin.
    ///
    /// Address lookups prefer structural bins, so a clashing blocked bin
    /// could no longer be named as a transfer source.
    pub fn address_clashes(&self) -> Vec<(BinView, BinCoordinate)> {
        self.bins
            .iter()
            .filter(|(_, r)| r.state == BinState::Blocked)
            .filter_map(|(coordinate, record)| {
                self.by_address
                    .get(&record.address)
                    .filter(|other| *other != coordinate)
                    .map(|other| (view(coordinate, record), *other))
            })
            .collect()
    }

    /// Exact address match against structural bins, then blocked bins.
    pub fn find_by_address(&self, address: &str) -> Option<BinView> {
        if let Some(coordinate) = self.by_address.get(address) {
            return self.bins.get(coordinate).map(|r| view(coordinate, r));
        }
        self.bins
            .iter()
            .find(|(_, r)| r.state == BinState::Blocked && r.address == address)
            .map(|(coordinate, record)| view(coordinate, record))
    }

    pub fn view(&self, coordinate: &BinCoordinate) -> Option<BinView> {
        self.bins.get(coordinate).map(|r| view(coordinate, r))
    }

    /// Move an item between bins.
    ///
    /// `from = None` receives a new item into the zone, `to = None` issues it
    /// out. Every check runs before any mutation so a rejected transfer
    /// leaves the index untouched.
    pub fn transfer(
        &mut self,
        item: &ItemId,
        from: Option<BinCoordinate>,
        to: Option<BinCoordinate>,
    ) -> Result<TransferReceipt> {
        if from.is_none() && to.is_none() {
            return Err(Error::transfer(item, "neither source nor target bin given"));
        }

        let current = self.item_locations.get(item).copied();
        match (from, current) {
            (Some(source), Some(at)) if source != at => {
                return Err(Error::transfer(
                    item,
                    format!("item is stored at {}, not {}", at, source),
                ));
            }
            (Some(source), None) => {
                return Err(Error::transfer(
                    item,
                    format!("item is not stored at {}", source),
                ));
            }
            (None, Some(at)) => {
                return Err(Error::transfer(
                    item,
                    format!("item is already stored at {}", at),
                ));
            }
            _ => {}
        }

        if let Some(target) = to {
            match self.bins.get(&target) {
                None => {
                    return Err(Error::transfer(
                        item,
                        format!("target bin {} does not exist", target),
                    ))
                }
                Some(record) if record.state == BinState::Blocked => {
                    return Err(Error::transfer(
                        item,
                        format!("target bin {} is blocked", record.address),
                    ))
                }
                Some(_) => {}
            }
        }

        let from_address = from.and_then(|c| self.bins.get(&c).map(|r| r.address.clone()));
        let to_address = to.and_then(|c| self.bins.get(&c).map(|r| r.address.clone()));

        if from == to {
            return Ok(TransferReceipt {
                item: item.clone(),
                from_address,
                to_address,
            });
        }

        if let Some(source) = from {
            self.unlink(item, &source);
        }
        if let Some(target) = to {
            if let Some(record) = self.bins.get_mut(&target) {
                record.items.insert(item.clone());
                record.state = BinState::Occupied;
            }
            self.item_locations.insert(item.clone(), target);
        }

        trace!(
            item = %item,
            from = ?from_address,
            to = ?to_address,
            "Transferred item"
        );

        Ok(TransferReceipt {
            item: item.clone(),
            from_address,
            to_address,
        })
    }

    // =========================================================================
    // Reconciliation mutations
    // =========================================================================

    /// Set a bin's state, enforcing the item-link invariants.
    pub(crate) fn set_state(&mut self, coordinate: &BinCoordinate, state: BinState) -> Result<()> {
        let record = self
            .bins
            .get_mut(coordinate)
            .ok_or_else(|| Error::NotFound(format!("bin {}", coordinate)))?;
        check_invariant(coordinate, state, record.items.len())?;

        let was_blocked = record.state == BinState::Blocked;
        record.state = state;
        match (was_blocked, state == BinState::Blocked) {
            (false, true) => {
                if self.by_address.get(&record.address) == Some(coordinate) {
                    self.by_address.remove(&record.address);
                }
            }
            (true, false) => {
                self.by_address.insert(record.address.clone(), *coordinate);
            }
            _ => {}
        }
        Ok(())
    }

    /// Add an empty bin, or bring a blocked bin back into the structure.
    pub(crate) fn insert_empty(&mut self, coordinate: BinCoordinate, address: String) {
        if let Some(record) = self.bins.get_mut(&coordinate) {
            // a previously blocked bin that the new structure covers again
            record.state = if record.items.is_empty() {
                BinState::Empty
            } else {
                BinState::Occupied
            };
            record.address = address.clone();
            self.by_address.insert(address, coordinate);
            debug!(%coordinate, "Reintegrated blocked bin");
            return;
        }
        self.by_address.insert(address.clone(), coordinate);
        self.bins.insert(coordinate, BinRecord::empty(address));
    }

    /// Change the address of a preserved bin.
    pub(crate) fn rewrite_address(&mut self, coordinate: &BinCoordinate, address: String) {
        if let Some(record) = self.bins.get_mut(coordinate) {
            if record.state != BinState::Blocked {
                if self.by_address.get(&record.address) == Some(coordinate) {
                    self.by_address.remove(&record.address);
                }
                self.by_address.insert(address.clone(), *coordinate);
            }
            record.address = address;
        }
    }

    /// Remove a bin, detaching any items linked to it.
    pub(crate) fn remove(&mut self, coordinate: &BinCoordinate) -> Option<BinRecord> {
        let record = self.bins.remove(coordinate)?;
        if self.by_address.get(&record.address) == Some(coordinate) {
            self.by_address.remove(&record.address);
        }
        for item in &record.items {
            self.item_locations.remove(item);
        }
        Some(record)
    }

    fn unlink(&mut self, item: &ItemId, source: &BinCoordinate) {
        self.item_locations.remove(item);
        let Some(record) = self.bins.get_mut(source) else {
            return;
        };
        record.items.remove(item);
        if !record.items.is_empty() {
            return;
        }
        if record.state == BinState::Blocked {
            // last item moved out of a removed bin: the conflict is resolved
            debug!(coordinate = %source, address = %record.address, "Retired emptied blocked bin");
            self.bins.remove(source);
        } else {
            record.state = BinState::Empty;
        }
    }
}

fn view(coordinate: &BinCoordinate, record: &BinRecord) -> BinView {
    BinView {
        coordinate: *coordinate,
        address: record.address.clone(),
        state: record.state,
        item_count: record.items.len(),
    }
}

fn check_invariant(coordinate: &BinCoordinate, state: BinState, items: usize) -> Result<()> {
    let reason = match state {
        BinState::Empty if items > 0 => format!("cannot be EMPTY while holding {} item(s)", items),
        BinState::Occupied if items == 0 => "cannot be OCCUPIED without items".to_string(),
        BinState::Blocked if items == 0 => "cannot be BLOCKED without items".to_string(),
        _ => return Ok(()),
    };
    Err(Error::InvalidState {
        coordinate: coordinate.to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::ZoneCodes;
    use crate::structure::{StructureGenerator, ZoneStructure};
    use assert_matches::assert_matches;

    fn index(aisles: u32, shelves: u32, bins: u32) -> OccupancyIndex {
        let generated = StructureGenerator::new(ZoneCodes::new("WH", "Z1"))
            .generate(&ZoneStructure::uniform(aisles, shelves, bins))
            .unwrap();
        OccupancyIndex::from_bins(&generated)
    }

    fn c(aisle: u32, shelf: u32, bin: u32) -> BinCoordinate {
        BinCoordinate::new(aisle, shelf, bin)
    }

    #[test]
    fn test_new_index_is_empty() {
        let idx = index(2, 3, 4);
        let stats = idx.stats();
        assert_eq!(stats.total, 24);
        assert_eq!(stats.occupied, 0);
        assert_eq!(stats.empty, 24);
        assert_eq!(idx.state(&c(1, 1, 0)), Some(BinState::Empty));
    }

    #[test]
    fn test_receive_and_move() {
        let mut idx = index(1, 1, 2);
        let item = ItemId::from("SKU-1");

        let receipt = idx.transfer(&item, None, Some(c(1, 1, 0))).unwrap();
        assert_eq!(receipt.to_address.as_deref(), Some("WH-Z1-0101-A"));
        assert_eq!(idx.state(&c(1, 1, 0)), Some(BinState::Occupied));
        assert_eq!(idx.stats().occupied, 1);

        idx.transfer(&item, Some(c(1, 1, 0)), Some(c(1, 1, 1))).unwrap();
        assert_eq!(idx.state(&c(1, 1, 0)), Some(BinState::Empty));
        assert_eq!(idx.state(&c(1, 1, 1)), Some(BinState::Occupied));
        assert_eq!(idx.locate(&item), Some(c(1, 1, 1)));

        let stats = idx.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.occupied + stats.empty, stats.total);
    }

    #[test]
    fn test_issue_out_empties_bin() {
        let mut idx = index(1, 1, 1);
        let item = ItemId::from("SKU-1");
        idx.transfer(&item, None, Some(c(1, 1, 0))).unwrap();
        idx.transfer(&item, Some(c(1, 1, 0)), None).unwrap();
        assert_eq!(idx.state(&c(1, 1, 0)), Some(BinState::Empty));
        assert_eq!(idx.locate(&item), None);
    }

    #[test]
    fn test_transfer_rejections_leave_index_unchanged() {
        let mut idx = index(1, 1, 2);
        let item = ItemId::from("SKU-1");
        idx.transfer(&item, None, Some(c(1, 1, 0))).unwrap();
        let before = idx.clone();

        assert_matches!(
            idx.transfer(&item, Some(c(1, 1, 0)), Some(c(9, 1, 0))),
            Err(Error::TransferRejected { .. })
        );
        assert_matches!(
            idx.transfer(&item, Some(c(1, 1, 1)), Some(c(1, 1, 0))),
            Err(Error::TransferRejected { .. })
        );
        assert_matches!(
            idx.transfer(&item, None, Some(c(1, 1, 1))),
            Err(Error::TransferRejected { .. })
        );
        assert_matches!(idx.transfer(&item, None, None), Err(Error::TransferRejected { .. }));
        assert_eq!(idx, before);
    }

    #[test]
    fn test_transfer_into_blocked_rejected() {
        let mut idx = index(1, 1, 2);
        let a = ItemId::from("A");
        let b = ItemId::from("B");
        idx.transfer(&a, None, Some(c(1, 1, 1))).unwrap();
        idx.set_state(&c(1, 1, 1), BinState::Blocked).unwrap();

        assert_matches!(
            idx.transfer(&b, None, Some(c(1, 1, 1))),
            Err(Error::TransferRejected { reason, .. }) if reason.contains("blocked")
        );
        assert_eq!(idx.stats().total, 1);
        assert_eq!(idx.stats().blocked, 1);
    }

    #[test]
    fn test_emptied_blocked_bin_is_retired() {
        let mut idx = index(1, 1, 2);
        let item = ItemId::from("A");
        idx.transfer(&item, None, Some(c(1, 1, 1))).unwrap();
        idx.set_state(&c(1, 1, 1), BinState::Blocked).unwrap();

        idx.transfer(&item, Some(c(1, 1, 1)), Some(c(1, 1, 0))).unwrap();
        assert_eq!(idx.get(&c(1, 1, 1)), None);
        assert_eq!(idx.state(&c(1, 1, 0)), Some(BinState::Occupied));
        assert_eq!(idx.stats().blocked, 0);
    }

    #[test]
    fn test_set_state_enforces_invariants() {
        let mut idx = index(1, 1, 1);
        assert_matches!(
            idx.set_state(&c(1, 1, 0), BinState::Occupied),
            Err(Error::InvalidState { .. })
        );
        assert_matches!(
            idx.set_state(&c(1, 1, 0), BinState::Blocked),
            Err(Error::InvalidState { .. })
        );
        assert_matches!(idx.set_state(&c(2, 1, 0), BinState::Empty), Err(Error::NotFound(_)));

        idx.transfer(&ItemId::from("A"), None, Some(c(1, 1, 0))).unwrap();
        assert_matches!(
            idx.set_state(&c(1, 1, 0), BinState::Empty),
            Err(Error::InvalidState { .. })
        );
    }

    #[test]
    fn test_find_by_address_includes_blocked() {
        let mut idx = index(1, 1, 2);
        idx.transfer(&ItemId::from("A"), None, Some(c(1, 1, 1))).unwrap();
        idx.set_state(&c(1, 1, 1), BinState::Blocked).unwrap();

        let found = idx.find_by_address("WH-Z1-0101-B").unwrap();
        assert_eq!(found.state, BinState::Blocked);
        assert_eq!(found.item_count, 1);
        assert!(idx.find_by_address("WH-Z1-0101-Z").is_none());
    }

    #[test]
    fn test_address_clashes_with_blocked_bin() {
        let mut idx = index(1, 1, 2);
        idx.transfer(&ItemId::from("A"), None, Some(c(1, 1, 1))).unwrap();
        idx.set_state(&c(1, 1, 1), BinState::Blocked).unwrap();
        assert!(idx.address_clashes().is_empty());

        idx.rewrite_address(&c(1, 1, 0), "WH-Z1-0101-B".to_string());
        let clashes = idx.address_clashes();
        assert_eq!(clashes.len(), 1);
        assert_eq!(clashes[0].0.coordinate, c(1, 1, 1));
        assert_eq!(clashes[0].1, c(1, 1, 0));
    }

    #[test]
    fn test_rewrite_address() {
        let mut idx = index(1, 1, 1);
        idx.rewrite_address(&c(1, 1, 0), "WH-Z1-001001-1".to_string());
        assert!(idx.find_by_address("WH-Z1-0101-A").is_none());
        assert_eq!(
            idx.find_by_address("WH-Z1-001001-1").map(|v| v.coordinate),
            Some(c(1, 1, 0))
        );
    }

    #[test]
    fn test_entries_round_trip_through_json() {
        let mut idx = index(1, 2, 2);
        idx.transfer(&ItemId::from("A"), None, Some(c(1, 2, 1))).unwrap();
        let json = serde_json::to_string(&idx.entries()).unwrap();
        let entries: Vec<BinEntry> = serde_json::from_str(&json).unwrap();
        let restored = OccupancyIndex::from_entries(entries).unwrap();
        assert_eq!(restored, idx);
    }

    #[test]
    fn test_from_entries_rejects_duplicate_item_links() {
        let mut a = BinRecord::empty("WH-Z1-0101-A");
        a.state = BinState::Occupied;
        a.items.insert(ItemId::from("X"));
        let mut b = BinRecord::empty("WH-Z1-0101-B");
        b.state = BinState::Occupied;
        b.items.insert(ItemId::from("X"));

        let entries = vec![
            BinEntry {
                coordinate: c(1, 1, 0),
                record: a,
            },
            BinEntry {
                coordinate: c(1, 1, 1),
                record: b,
            },
        ];
        assert_matches!(OccupancyIndex::from_entries(entries), Err(Error::InvalidState { .. }));
    }
}
