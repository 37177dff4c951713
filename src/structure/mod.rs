//! Zone Structure
//!
//! Describes the aisle/shelf/bin geometry of a zone and enumerates the bins
//! it implies.
//!
//! Two layouts are supported:
//!
//! - **Uniform** - every aisle has the same shelf and bin counts
//! - **PerAisle** - each listed aisle has its own counts; unlisted aisles do not exist
//!
//! A structure is replaced wholesale on reconfiguration and never edited in place.

mod generator;

use serde::{Deserialize, Serialize};

use crate::address::{digits_needed, BinCoordinate, CodePattern};
use crate::error::{Error, Result};

pub use generator::{Bin, StructureGenerator};

/// Upper bound on bins per zone unless the service is configured otherwise.
pub const DEFAULT_MAX_BINS: u64 = 1_000_000;

// =============================================================================
// Layout
// =============================================================================

/// Shelf and bin counts for one aisle in independent mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AisleConfig {
    pub aisle_number: u32,
    pub shelves_count: u32,
    pub bins_per_shelf: u32,
}

impl AisleConfig {
    pub fn new(aisle_number: u32, shelves_count: u32, bins_per_shelf: u32) -> Self {
        Self {
            aisle_number,
            shelves_count,
            bins_per_shelf,
        }
    }
}

/// Dimensions of one aisle, whichever layout mode it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AisleExtent {
    pub aisle: u32,
    pub shelves: u32,
    pub bins_per_shelf: u32,
}

/// Aisle geometry of a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AisleLayout {
    #[serde(rename_all = "camelCase")]
    Uniform {
        aisles: u32,
        shelves_per_aisle: u32,
        bins_per_shelf: u32,
    },
    PerAisle {
        aisles: Vec<AisleConfig>,
    },
}

// =============================================================================
// Zone Structure
// =============================================================================

/// Complete structural configuration of a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneStructure {
    pub layout: AisleLayout,
    #[serde(default)]
    pub pattern: CodePattern,
}

impl ZoneStructure {
    /// Uniform structure with the default code pattern.
    pub fn uniform(aisles: u32, shelves_per_aisle: u32, bins_per_shelf: u32) -> Self {
        Self {
            layout: AisleLayout::Uniform {
                aisles,
                shelves_per_aisle,
                bins_per_shelf,
            },
            pattern: CodePattern::default(),
        }
    }

    /// Independent-aisle structure with the default code pattern.
    pub fn per_aisle(aisles: Vec<AisleConfig>) -> Self {
        Self {
            layout: AisleLayout::PerAisle { aisles },
            pattern: CodePattern::default(),
        }
    }

    pub fn with_pattern(mut self, pattern: CodePattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Total number of bins the structure implies.
    pub fn total_bins(&self) -> u64 {
        match &self.layout {
            AisleLayout::Uniform {
                aisles,
                shelves_per_aisle,
                bins_per_shelf,
            } => *aisles as u64 * *shelves_per_aisle as u64 * *bins_per_shelf as u64,
            AisleLayout::PerAisle { aisles } => aisles
                .iter()
                .map(|a| a.shelves_count as u64 * a.bins_per_shelf as u64)
                .sum(),
        }
    }

    /// Aisle numbers in ascending order.
    pub fn aisle_numbers(&self) -> Vec<u32> {
        match &self.layout {
            AisleLayout::Uniform { aisles, .. } => (1..=*aisles).collect(),
            AisleLayout::PerAisle { aisles } => {
                let mut numbers: Vec<u32> = aisles.iter().map(|a| a.aisle_number).collect();
                numbers.sort_unstable();
                numbers
            }
        }
    }

    /// Every aisle with its dimensions, ascending by aisle number.
    pub fn aisle_extents(&self) -> Vec<AisleExtent> {
        match &self.layout {
            AisleLayout::Uniform {
                aisles,
                shelves_per_aisle,
                bins_per_shelf,
            } => (1..=*aisles)
                .map(|aisle| AisleExtent {
                    aisle,
                    shelves: *shelves_per_aisle,
                    bins_per_shelf: *bins_per_shelf,
                })
                .collect(),
            AisleLayout::PerAisle { aisles } => {
                let mut extents: Vec<AisleExtent> = aisles
                    .iter()
                    .map(|a| AisleExtent {
                        aisle: a.aisle_number,
                        shelves: a.shelves_count,
                        bins_per_shelf: a.bins_per_shelf,
                    })
                    .collect();
                extents.sort_unstable_by_key(|e| e.aisle);
                extents
            }
        }
    }

    /// `(shelves, bins_per_shelf)` for an aisle, or `None` if it does not exist.
    pub fn aisle_dimensions(&self, aisle: u32) -> Option<(u32, u32)> {
        match &self.layout {
            AisleLayout::Uniform {
                aisles,
                shelves_per_aisle,
                bins_per_shelf,
            } => (aisle >= 1 && aisle <= *aisles).then_some((*shelves_per_aisle, *bins_per_shelf)),
            AisleLayout::PerAisle { aisles } => aisles
                .iter()
                .find(|a| a.aisle_number == aisle)
                .map(|a| (a.shelves_count, a.bins_per_shelf)),
        }
    }

    /// Width of every shelf in the given aisle.
    pub fn bins_in_shelf(&self, aisle: u32) -> Option<u32> {
        self.aisle_dimensions(aisle).map(|(_, bins)| bins)
    }

    /// Whether the coordinate is part of this structure.
    pub fn contains(&self, coordinate: &BinCoordinate) -> bool {
        match self.aisle_dimensions(coordinate.aisle) {
            Some((shelves, bins)) => {
                coordinate.shelf >= 1 && coordinate.shelf <= shelves && coordinate.bin < bins
            }
            None => false,
        }
    }

    /// All coordinates in generation order.
    pub fn coordinates(&self) -> impl Iterator<Item = BinCoordinate> {
        self.aisle_extents().into_iter().flat_map(|extent| {
            (1..=extent.shelves).flat_map(move |shelf| {
                (0..extent.bins_per_shelf).map(move |bin| BinCoordinate::new(extent.aisle, shelf, bin))
            })
        })
    }

    /// Validate counts and digit widths against `max_bins`.
    pub fn validate(&self, max_bins: u64) -> Result<()> {
        self.pattern.validate()?;

        let (max_aisle, max_shelves) = match &self.layout {
            AisleLayout::Uniform {
                aisles,
                shelves_per_aisle,
                bins_per_shelf,
            } => {
                positive("aisles", *aisles)?;
                positive("shelvesPerAisle", *shelves_per_aisle)?;
                positive("binsPerShelf", *bins_per_shelf)?;
                (*aisles, *shelves_per_aisle)
            }
            AisleLayout::PerAisle { aisles } => {
                if aisles.is_empty() {
                    return Err(Error::config("aisleConfigs", "at least one aisle is required"));
                }
                let mut seen = std::collections::HashSet::new();
                for a in aisles {
                    positive("aisleConfigs.aisleNumber", a.aisle_number)?;
                    positive(
                        &format!("aisleConfigs[{}].shelvesCount", a.aisle_number),
                        a.shelves_count,
                    )?;
                    positive(
                        &format!("aisleConfigs[{}].binsPerShelf", a.aisle_number),
                        a.bins_per_shelf,
                    )?;
                    if !seen.insert(a.aisle_number) {
                        return Err(Error::config(
                            "aisleConfigs",
                            format!("aisle {} is listed more than once", a.aisle_number),
                        ));
                    }
                }
                let max_aisle = aisles.iter().map(|a| a.aisle_number).max().unwrap_or(0);
                let max_shelves = aisles.iter().map(|a| a.shelves_count).max().unwrap_or(0);
                (max_aisle, max_shelves)
            }
        };

        let needed = digits_needed(max_aisle);
        if needed > self.pattern.aisle_digits {
            return Err(Error::config(
                "aisleDigits",
                format!(
                    "{} digit(s) cannot represent aisle {}; need {}",
                    self.pattern.aisle_digits, max_aisle, needed
                ),
            ));
        }
        let needed = digits_needed(max_shelves);
        if needed > self.pattern.shelf_digits {
            return Err(Error::config(
                "shelfDigits",
                format!(
                    "{} digit(s) cannot represent shelf {}; need {}",
                    self.pattern.shelf_digits, max_shelves, needed
                ),
            ));
        }

        let total = self.total_bins();
        if total > max_bins {
            return Err(Error::config(
                "totalBins",
                format!("structure implies {} bins, limit is {}", total, max_bins),
            ));
        }
        Ok(())
    }
}

fn positive(field: &str, value: u32) -> Result<()> {
    if value == 0 {
        return Err(Error::config(field, "must be greater than zero"));
    }
    Ok(())
}

// =============================================================================
// Collaborator Input
// =============================================================================

/// Flat structure payload as sent by the configuration collaborator.
///
/// Exactly one of `aisles` and `aisle_configs` must be given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureInput {
    pub aisles: Option<u32>,
    pub aisle_configs: Option<Vec<AisleConfig>>,
    pub shelves_per_aisle: Option<u32>,
    pub bins_per_shelf: Option<u32>,
    #[serde(flatten)]
    pub pattern: CodePattern,
}

impl TryFrom<StructureInput> for ZoneStructure {
    type Error = Error;

    fn try_from(input: StructureInput) -> Result<Self> {
        let layout = match (input.aisles, input.aisle_configs) {
            (Some(_), Some(_)) => {
                return Err(Error::config(
                    "aisles",
                    "give either aisles or aisleConfigs, not both",
                ))
            }
            (None, None) => {
                return Err(Error::config("aisles", "either aisles or aisleConfigs is required"))
            }
            (Some(aisles), None) => AisleLayout::Uniform {
                aisles,
                shelves_per_aisle: input
                    .shelves_per_aisle
                    .ok_or_else(|| Error::config("shelvesPerAisle", "required in uniform mode"))?,
                bins_per_shelf: input
                    .bins_per_shelf
                    .ok_or_else(|| Error::config("binsPerShelf", "required in uniform mode"))?,
            },
            (None, Some(aisles)) => AisleLayout::PerAisle { aisles },
        };
        Ok(ZoneStructure {
            layout,
            pattern: input.pattern,
        })
    }
}
