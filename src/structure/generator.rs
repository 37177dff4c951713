//! Bin enumeration

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ZoneStructure, DEFAULT_MAX_BINS};
use crate::address::{AddressCodec, BinCoordinate, ZoneCodes};
use crate::error::Result;

/// A generated bin: its coordinate and the address derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bin {
    pub coordinate: BinCoordinate,
    pub address: String,
}

/// Enumerates the bins a structure implies for one zone.
#[derive(Debug, Clone)]
pub struct StructureGenerator {
    codes: ZoneCodes,
    max_bins: u64,
}

impl StructureGenerator {
    pub fn new(codes: ZoneCodes) -> Self {
        Self {
            codes,
            max_bins: DEFAULT_MAX_BINS,
        }
    }

    pub fn with_max_bins(mut self, max_bins: u64) -> Self {
        self.max_bins = max_bins;
        self
    }

    pub fn codes(&self) -> &ZoneCodes {
        &self.codes
    }

    pub fn max_bins(&self) -> u64 {
        self.max_bins
    }

    /// Validate the structure and build its codec.
    pub fn codec(&self, structure: &ZoneStructure) -> Result<AddressCodec> {
        self.codec_within(structure, self.max_bins)
    }

    fn codec_within(&self, structure: &ZoneStructure, max_bins: u64) -> Result<AddressCodec> {
        structure.validate(max_bins)?;
        AddressCodec::new(self.codes.clone(), structure.pattern.clone())
    }

    /// Enumerate every bin in aisle, shelf, bin order.
    pub fn generate(&self, structure: &ZoneStructure) -> Result<Vec<Bin>> {
        let codec = self.codec(structure)?;
        Ok(self.enumerate(&codec, structure))
    }

    /// Enumerate a structure that is already applied.
    ///
    /// The bin ceiling is not checked again, so a zone configured under a
    /// higher limit can still be diffed and shrunk.
    pub fn regenerate(&self, structure: &ZoneStructure) -> Result<Vec<Bin>> {
        let codec = self.codec_within(structure, u64::MAX)?;
        Ok(self.enumerate(&codec, structure))
    }

    fn enumerate(&self, codec: &AddressCodec, structure: &ZoneStructure) -> Vec<Bin> {
        let mut bins = Vec::new();
        for extent in structure.aisle_extents() {
            for shelf in 1..=extent.shelves {
                for bin in 0..extent.bins_per_shelf {
                    let coordinate = BinCoordinate::new(extent.aisle, shelf, bin);
                    bins.push(Bin {
                        coordinate,
                        address: codec.encode(coordinate, extent.bins_per_shelf),
                    });
                }
            }
        }
        debug!(
            zone = %self.codes.zone,
            bins = bins.len(),
            "Generated bin address space"
        );
        bins
    }

    /// First and last address in generation order.
    pub fn address_range(&self, structure: &ZoneStructure) -> Result<Option<(String, String)>> {
        let codec = self.codec(structure)?;
        let extents = structure.aisle_extents();
        let (Some(first), Some(last)) = (extents.first(), extents.last()) else {
            return Ok(None);
        };
        let first_address = codec.encode(BinCoordinate::new(first.aisle, 1, 0), first.bins_per_shelf);
        let last_address = codec.encode(
            BinCoordinate::new(last.aisle, last.shelves, last.bins_per_shelf.saturating_sub(1)),
            last.bins_per_shelf,
        );
        Ok(Some((first_address, last_address)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{BinDirection, CodePattern};
    use crate::error::Error;
    use crate::structure::AisleConfig;
    use assert_matches::assert_matches;

    fn generator() -> StructureGenerator {
        StructureGenerator::new(ZoneCodes::new("WH", "Z1"))
    }

    #[test]
    fn test_generate_uniform_order() {
        let bins = generator().generate(&ZoneStructure::uniform(2, 3, 4)).unwrap();
        assert_eq!(bins.len(), 24);
        assert_eq!(bins[0].address, "WH-Z1-0101-A");
        assert_eq!(bins[1].address, "WH-Z1-0101-B");
        assert_eq!(bins[4].address, "WH-Z1-0102-A");
        assert_eq!(bins[23].address, "WH-Z1-0203-D");
        assert_eq!(bins[23].coordinate, BinCoordinate::new(2, 3, 3));
    }

    #[test]
    fn test_generate_per_aisle_uses_own_width() {
        let structure = ZoneStructure::per_aisle(vec![
            AisleConfig::new(1, 1, 2),
            AisleConfig::new(2, 2, 3),
        ])
        .with_pattern(CodePattern {
            bin_direction: BinDirection::TopDown,
            ..CodePattern::default()
        });
        let bins = generator().generate(&structure).unwrap();
        assert_eq!(bins.len(), 8);
        // aisle 1 shelves are 2 wide, aisle 2 shelves are 3 wide
        assert_eq!(bins[0].address, "WH-Z1-0101-B");
        assert_eq!(bins[2].address, "WH-Z1-0201-C");
    }

    #[test]
    fn test_generate_rejects_invalid_structure() {
        assert!(generator().generate(&ZoneStructure::uniform(0, 1, 1)).is_err());
        assert!(generator()
            .with_max_bins(10)
            .generate(&ZoneStructure::uniform(2, 3, 4))
            .is_err());
    }

    #[test]
    fn test_regenerate_ignores_bin_ceiling() {
        let limited = generator().with_max_bins(10);
        let structure = ZoneStructure::uniform(2, 3, 4);
        assert_matches!(
            limited.generate(&structure),
            Err(Error::Configuration { field, .. }) if field == "totalBins"
        );
        assert_eq!(limited.regenerate(&structure).unwrap().len(), 24);
        // structural checks still apply
        assert!(limited.regenerate(&ZoneStructure::uniform(0, 1, 1)).is_err());
    }

    #[test]
    fn test_address_range_per_aisle() {
        let structure = ZoneStructure::per_aisle(vec![
            AisleConfig::new(4, 2, 5),
            AisleConfig::new(2, 1, 2),
        ])
        .with_pattern(CodePattern {
            bin_direction: BinDirection::TopDown,
            ..CodePattern::default()
        });
        let bins = generator().generate(&structure).unwrap();
        let (first, last) = generator().address_range(&structure).unwrap().unwrap();
        assert_eq!(first, bins[0].address);
        assert_eq!(last, bins[bins.len() - 1].address);
        assert_eq!(first, "WH-Z1-0201-B");
        assert_eq!(last, "WH-Z1-0402-A");
    }

    #[test]
    fn test_address_range() {
        let (first, last) = generator()
            .address_range(&ZoneStructure::uniform(2, 3, 4))
            .unwrap()
            .unwrap();
        assert_eq!(first, "WH-Z1-0101-A");
        assert_eq!(last, "WH-Z1-0203-D");
    }
}
