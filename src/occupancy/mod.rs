//! Occupancy Index
//!
//! Tracks, per bin coordinate, whether the bin is empty, occupied or blocked
//! and which items are linked to it.
//!
//! # Invariants
//!
//! - `Empty` bins hold no items, `Occupied` bins hold at least one
//! - `Blocked` is only entered through the reconciliation block policy
//! - `stats.occupied + stats.empty == stats.total`
//! - An item is linked to at most one bin

mod index;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::address::BinCoordinate;

pub use index::{OccupancyIndex, TransferReceipt};

/// Opaque reference to an item owned by the inventory collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Occupancy state of a bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BinState {
    #[default]
    Empty,
    Occupied,
    /// Removed from the structure while still holding items
    Blocked,
}

impl std::fmt::Display for BinState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinState::Empty => write!(f, "EMPTY"),
            BinState::Occupied => write!(f, "OCCUPIED"),
            BinState::Blocked => write!(f, "BLOCKED"),
        }
    }
}

/// Stored state of a single bin.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BinRecord {
    /// Current address; for blocked bins, the address before removal
    pub address: String,
    pub state: BinState,
    pub items: BTreeSet<ItemId>,
}

impl BinRecord {
    pub fn empty(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            state: BinState::Empty,
            items: BTreeSet::new(),
        }
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

/// A bin as exposed in occupancy listings and lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinView {
    pub coordinate: BinCoordinate,
    pub address: String,
    pub state: BinState,
    pub item_count: usize,
}

/// A persisted index entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinEntry {
    pub coordinate: BinCoordinate,
    #[serde(flatten)]
    pub record: BinRecord,
}

/// Zone-level occupancy aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupancyStats {
    /// Bins in the current structure
    pub total: u64,
    pub occupied: u64,
    pub empty: u64,
    /// Blocked bins outside the structure awaiting manual resolution
    pub blocked: u64,
    pub occupancy_percentage: f64,
}

impl OccupancyStats {
    pub fn new(total: u64, occupied: u64, blocked: u64) -> Self {
        let occupancy_percentage = if total == 0 {
            0.0
        } else {
            occupied as f64 / total as f64 * 100.0
        };
        Self {
            total,
            occupied,
            empty: total.saturating_sub(occupied),
            blocked,
            occupancy_percentage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_percentage() {
        let stats = OccupancyStats::new(24, 6, 0);
        assert_eq!(stats.empty, 18);
        assert!((stats.occupancy_percentage - 25.0).abs() < f64::EPSILON);
        assert_eq!(stats.occupied + stats.empty, stats.total);
    }

    #[test]
    fn test_stats_empty_zone() {
        let stats = OccupancyStats::new(0, 0, 0);
        assert_eq!(stats.occupancy_percentage, 0.0);
    }

    #[test]
    fn test_bin_state_serde() {
        assert_eq!(serde_json::to_string(&BinState::Blocked).unwrap(), "\"BLOCKED\"");
        assert_eq!(BinState::Occupied.to_string(), "OCCUPIED");
    }

    #[test]
    fn test_item_id() {
        let id = ItemId::from("SKU-1");
        assert_eq!(id.as_str(), "SKU-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"SKU-1\"");
    }
}
