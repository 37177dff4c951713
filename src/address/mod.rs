//! Address Codec
//!
//! Converts bin coordinates to human-readable address strings and back.
//!
//! # Address Format
//!
//! ```text
//! WH-Z1-0203-D
//! │  │  │ │  └── bin label (letters or numbers, direction-aware)
//! │  │  │ └───── shelf, zero-padded to shelf_digits
//! │  │  └─────── aisle, zero-padded to aisle_digits
//! │  └────────── zone code
//! └───────────── warehouse code
//! ```
//!
//! The coordinate is the stable identity of a bin; the address is a derived
//! view that changes whenever the zone's code pattern changes.

mod codec;

pub use codec::{
    AddressCodec, BinCoordinate, BinDirection, BinLabeling, CodePattern, ParsedAddress, ZoneCodes,
};

/// Number of decimal digits needed to print `n` without truncation.
pub fn digits_needed(n: u32) -> u32 {
    n.checked_ilog10().map(|d| d + 1).unwrap_or(1)
}
