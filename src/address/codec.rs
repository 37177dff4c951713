//! Address encoding and decoding

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Widest aisle or shelf block segment accepted by a pattern.
const MAX_DIGITS: u32 = 9;

// =============================================================================
// Coordinates
// =============================================================================

/// Stable identity of a bin: 1-based aisle and shelf, 0-based bin index.
///
/// Ordering is (aisle, shelf, bin), which is also the generation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BinCoordinate {
    pub aisle: u32,
    pub shelf: u32,
    pub bin: u32,
}

impl BinCoordinate {
    pub fn new(aisle: u32, shelf: u32, bin: u32) -> Self {
        Self { aisle, shelf, bin }
    }
}

impl std::fmt::Display for BinCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.aisle, self.shelf, self.bin)
    }
}

impl std::str::FromStr for BinCoordinate {
    type Err = Error;

    /// Parses the `aisle:shelf:bin` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            return Err(Error::address(s, "expected aisle:shelf:bin"));
        }
        let num = |p: &str| {
            p.parse::<u32>()
                .map_err(|_| Error::address(s, format!("'{}' is not a number", p)))
        };
        Ok(Self::new(num(parts[0])?, num(parts[1])?, num(parts[2])?))
    }
}

// =============================================================================
// Code Pattern
// =============================================================================

/// How the bin segment is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BinLabeling {
    /// A, B, ..., Z, AA, AB, ...
    #[default]
    Letters,
    /// 1, 2, 3, ...
    Numbers,
}

/// Which physical end of a shelf gets the first label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BinDirection {
    /// Lowest physical bin is labelled first
    #[default]
    BottomUp,
    /// Highest physical bin is labelled first
    TopDown,
}

impl BinDirection {
    /// Map a coordinate bin index to its label index on a shelf of the given width.
    ///
    /// The mapping is an involution, so it also maps label indices back.
    pub fn label_index(self, bin: u32, bins_in_shelf: u32) -> u32 {
        match self {
            BinDirection::BottomUp => bin,
            BinDirection::TopDown => bins_in_shelf.saturating_sub(1).saturating_sub(bin),
        }
    }
}

impl std::fmt::Display for BinLabeling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinLabeling::Letters => write!(f, "LETTERS"),
            BinLabeling::Numbers => write!(f, "NUMBERS"),
        }
    }
}

impl std::fmt::Display for BinDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinDirection::BottomUp => write!(f, "BOTTOM_UP"),
            BinDirection::TopDown => write!(f, "TOP_DOWN"),
        }
    }
}

/// Parameters controlling address rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodePattern {
    pub separator: String,
    pub aisle_digits: u32,
    pub shelf_digits: u32,
    pub bin_labeling: BinLabeling,
    pub bin_direction: BinDirection,
}

impl Default for CodePattern {
    fn default() -> Self {
        Self {
            separator: "-".to_string(),
            aisle_digits: 2,
            shelf_digits: 2,
            bin_labeling: BinLabeling::Letters,
            bin_direction: BinDirection::BottomUp,
        }
    }
}

impl CodePattern {
    /// Check the pattern can produce unambiguous addresses.
    pub fn validate(&self) -> Result<()> {
        if self.separator.is_empty() {
            return Err(Error::config("separator", "must not be empty"));
        }
        if self.separator.chars().any(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::config(
                "separator",
                format!("'{}' must not contain letters or digits", self.separator),
            ));
        }
        for (field, digits) in [
            ("aisleDigits", self.aisle_digits),
            ("shelfDigits", self.shelf_digits),
        ] {
            if digits == 0 || digits > MAX_DIGITS {
                return Err(Error::config(
                    field,
                    format!("must be between 1 and {}, got {}", MAX_DIGITS, digits),
                ));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Zone Codes
// =============================================================================

/// Leading address segments identifying the warehouse and zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneCodes {
    pub warehouse: String,
    pub zone: String,
}

impl ZoneCodes {
    pub fn new(warehouse: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            warehouse: warehouse.into(),
            zone: zone.into(),
        }
    }

    /// Codes must be non-empty and must not contain the separator.
    pub fn validate(&self, pattern: &CodePattern) -> Result<()> {
        for (field, code) in [("warehouse", &self.warehouse), ("zone", &self.zone)] {
            if code.is_empty() {
                return Err(Error::config(field, "code must not be empty"));
            }
            if !pattern.separator.is_empty() && code.contains(pattern.separator.as_str()) {
                return Err(Error::config(
                    field,
                    format!(
                        "code '{}' contains separator '{}'",
                        code, pattern.separator
                    ),
                ));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Codec
// =============================================================================

/// Address split into its numeric parts, before direction is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedAddress {
    pub aisle: u32,
    pub shelf: u32,
    /// 0-based position of the label (A = 0, "1" = 0)
    pub label_index: u32,
}

impl ParsedAddress {
    /// Resolve to a coordinate on a shelf of the given width.
    ///
    /// Returns `None` when the label lies beyond the shelf.
    pub fn coordinate(&self, direction: BinDirection, bins_in_shelf: u32) -> Option<BinCoordinate> {
        if self.label_index >= bins_in_shelf {
            return None;
        }
        let bin = direction.label_index(self.label_index, bins_in_shelf);
        Some(BinCoordinate::new(self.aisle, self.shelf, bin))
    }
}

/// Encodes and decodes addresses for one zone under one pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressCodec {
    codes: ZoneCodes,
    pattern: CodePattern,
}

impl AddressCodec {
    /// Create a codec, validating the pattern and codes together.
    pub fn new(codes: ZoneCodes, pattern: CodePattern) -> Result<Self> {
        pattern.validate()?;
        codes.validate(&pattern)?;
        Ok(Self { codes, pattern })
    }

    pub fn pattern(&self) -> &CodePattern {
        &self.pattern
    }

    pub fn codes(&self) -> &ZoneCodes {
        &self.codes
    }

    /// Render the address of a coordinate on a shelf holding `bins_in_shelf` bins.
    pub fn encode(&self, coordinate: BinCoordinate, bins_in_shelf: u32) -> String {
        let label_index = self
            .pattern
            .bin_direction
            .label_index(coordinate.bin, bins_in_shelf);
        let label = match self.pattern.bin_labeling {
            BinLabeling::Letters => letters_for(label_index),
            BinLabeling::Numbers => (label_index as u64 + 1).to_string(),
        };
        let sep = &self.pattern.separator;
        format!(
            "{}{sep}{}{sep}{:0aw$}{:0sw$}{sep}{}",
            self.codes.warehouse,
            self.codes.zone,
            coordinate.aisle,
            coordinate.shelf,
            label,
            aw = self.pattern.aisle_digits as usize,
            sw = self.pattern.shelf_digits as usize,
        )
    }

    /// Split an address into aisle, shelf and label index.
    ///
    /// Fails for anything this codec could not have produced.
    pub fn parse(&self, address: &str) -> Result<ParsedAddress> {
        let sep = self.pattern.separator.as_str();
        let parts: Vec<&str> = address.split(sep).collect();
        if parts.len() != 4 {
            return Err(Error::address(
                address,
                format!(
                    "expected 4 segments separated by '{}', found {}",
                    sep,
                    parts.len()
                ),
            ));
        }

        if parts[0] != self.codes.warehouse {
            return Err(Error::address(
                address,
                format!("warehouse code '{}' does not match", parts[0]),
            ));
        }
        if parts[1] != self.codes.zone {
            return Err(Error::address(
                address,
                format!("zone code '{}' does not match", parts[1]),
            ));
        }

        let block = parts[2];
        let aisle_width = self.pattern.aisle_digits as usize;
        let expected = aisle_width + self.pattern.shelf_digits as usize;
        if block.len() != expected || !block.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::address(
                address,
                format!("aisle/shelf block '{}' must be {} digits", block, expected),
            ));
        }
        let (aisle_part, shelf_part) = block.split_at(aisle_width);
        let aisle = parse_number(address, "aisle", aisle_part)?;
        let shelf = parse_number(address, "shelf", shelf_part)?;

        let label = parts[3];
        let label_index = match self.pattern.bin_labeling {
            BinLabeling::Letters => index_for_letters(label)
                .ok_or_else(|| Error::address(address, format!("invalid bin letters '{}'", label)))?,
            BinLabeling::Numbers => index_for_number(label)
                .ok_or_else(|| Error::address(address, format!("invalid bin number '{}'", label)))?,
        };

        Ok(ParsedAddress {
            aisle,
            shelf,
            label_index,
        })
    }

    /// Decode an address on a shelf holding `bins_in_shelf` bins.
    pub fn decode(&self, address: &str, bins_in_shelf: u32) -> Result<BinCoordinate> {
        let parsed = self.parse(address)?;
        parsed
            .coordinate(self.pattern.bin_direction, bins_in_shelf)
            .ok_or_else(|| {
                Error::address(
                    address,
                    format!(
                        "bin label index {} exceeds shelf width {}",
                        parsed.label_index, bins_in_shelf
                    ),
                )
            })
    }
}

fn parse_number(address: &str, what: &str, digits: &str) -> Result<u32> {
    let n: u32 = digits
        .parse()
        .map_err(|_| Error::address(address, format!("{} '{}' is not numeric", what, digits)))?;
    if n == 0 {
        return Err(Error::address(address, format!("{} numbers start at 1", what)));
    }
    Ok(n)
}

/// Bijective base-26: 0 → A, 25 → Z, 26 → AA.
fn letters_for(index: u32) -> String {
    let mut n = index as u64 + 1;
    let mut out = Vec::new();
    while n > 0 {
        n -= 1;
        out.push((b'A' + (n % 26) as u8) as char);
        n /= 26;
    }
    out.iter().rev().collect()
}

fn index_for_letters(label: &str) -> Option<u32> {
    if label.is_empty() {
        return None;
    }
    let mut acc: u64 = 0;
    for b in label.bytes() {
        if !b.is_ascii_uppercase() {
            return None;
        }
        acc = acc.checked_mul(26)?.checked_add((b - b'A') as u64 + 1)?;
        if acc > u32::MAX as u64 + 1 {
            return None;
        }
    }
    u32::try_from(acc - 1).ok()
}

fn index_for_number(label: &str) -> Option<u32> {
    if label.is_empty() || label.starts_with('0') || !label.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: u64 = label.parse().ok()?;
    u32::try_from(n - 1).ok()
}
