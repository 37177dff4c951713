//! Occupied bin policy
//!
//! Decides what happens to bins that a new structure removes while they
//! still hold items. The operator must choose explicitly; there is no default.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::engine::ConflictBin;
use crate::address::BinCoordinate;
use crate::error::{Error, Result};
use crate::occupancy::ItemId;

/// Operator choice for conflicting bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OccupiedBinsAction {
    /// Keep the bins as BLOCKED with their items until resolved manually
    Block,
    /// Remove the bins and detach their items
    Force,
}

impl std::fmt::Display for OccupiedBinsAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OccupiedBinsAction::Block => write!(f, "block"),
            OccupiedBinsAction::Force => write!(f, "force"),
        }
    }
}

impl std::str::FromStr for OccupiedBinsAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "block" => Ok(OccupiedBinsAction::Block),
            "force" => Ok(OccupiedBinsAction::Force),
            other => Err(Error::config(
                "occupiedBinsAction",
                format!("'{}' is not one of block, force", other),
            )),
        }
    }
}

/// State change applied to one conflicting bin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Block {
        coordinate: BinCoordinate,
        address: String,
        items: usize,
    },
    Detach {
        coordinate: BinCoordinate,
        address: String,
        items: Vec<ItemId>,
    },
}

/// Concrete transitions for a diff's conflict set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionPlan {
    pub action: Option<OccupiedBinsAction>,
    pub transitions: Vec<Transition>,
}

impl ResolutionPlan {
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

/// Historical stamp left on an item whose bin was force-removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetachedItem {
    pub item: ItemId,
    pub last_known_address: String,
    pub coordinate: BinCoordinate,
    pub detached_at: DateTime<Utc>,
}

/// Maps conflicts and an operator choice to transitions.
pub struct OccupiedBinPolicy;

impl OccupiedBinPolicy {
    /// Resolve conflicts; fails when conflicts exist and no action was chosen.
    pub fn resolve(
        conflicts: &[ConflictBin],
        action: Option<OccupiedBinsAction>,
    ) -> Result<ResolutionPlan> {
        if conflicts.is_empty() {
            return Ok(ResolutionPlan::default());
        }

        let Some(action) = action else {
            return Err(Error::ConflictResolutionRequired {
                bins: conflicts.len(),
                items: conflicts.iter().map(|c| c.items.len()).sum(),
            });
        };

        let transitions = conflicts
            .iter()
            .map(|conflict| match action {
                OccupiedBinsAction::Block => Transition::Block {
                    coordinate: conflict.coordinate,
                    address: conflict.address.clone(),
                    items: conflict.items.len(),
                },
                OccupiedBinsAction::Force => Transition::Detach {
                    coordinate: conflict.coordinate,
                    address: conflict.address.clone(),
                    items: conflict.items.clone(),
                },
            })
            .collect();

        Ok(ResolutionPlan {
            action: Some(action),
            transitions,
        })
    }
}
