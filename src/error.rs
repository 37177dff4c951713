//! Error types for the bin address space engine

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while managing a zone's address space
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Validation Errors
    // =========================================================================
    /// Structural configuration rejected before any generation happened
    #[error("Configuration error in {field}: {reason}")]
    Configuration { field: String, reason: String },

    /// Address string does not match the zone's code pattern
    #[error("Malformed address '{address}': {reason}")]
    AddressFormat { address: String, reason: String },

    // =========================================================================
    // Reconciliation Errors
    // =========================================================================
    /// Apply attempted while bins holding items would disappear
    #[error("{bins} bin(s) holding {items} item(s) would be removed; choose 'block' or 'force'")]
    ConflictResolutionRequired { bins: usize, items: usize },

    /// The zone changed after the preview was computed
    #[error("Zone {zone} was modified concurrently: expected revision {expected}, found {actual}")]
    ConcurrentModification {
        zone: String,
        expected: u64,
        actual: u64,
    },

    // =========================================================================
    // Occupancy Errors
    // =========================================================================
    /// Item transfer refused
    #[error("Transfer of item {item} rejected: {reason}")]
    TransferRejected { item: String, reason: String },

    /// A state change would break a bin invariant
    #[error("Invalid state change for bin {coordinate}: {reason}")]
    InvalidState { coordinate: String, reason: String },

    /// Bin or annotation lookup failed
    #[error("Not found: {0}")]
    NotFound(String),

    // =========================================================================
    // Zone Errors
    // =========================================================================
    /// Zone has not been registered with the service
    #[error("Zone not found: {0}")]
    ZoneNotFound(String),

    /// Zone exists but has no structure yet
    #[error("Zone {0} has no structure configured")]
    ZoneNotConfigured(String),

    // =========================================================================
    // Infrastructure Errors
    // =========================================================================
    /// Persistence sink failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Metrics registration or encoding error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl Error {
    /// Shorthand for a configuration error on a named field.
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an address format error.
    pub fn address(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::AddressFormat {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a rejected transfer.
    pub fn transfer(item: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        Error::TransferRejected {
            item: item.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::ConcurrentModification { .. } | Error::Storage(_) | Error::Io(_)
        )
    }
}
