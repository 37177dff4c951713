//! Binspace - Warehouse Bin Address Space Engine
//!
//! Models a warehouse zone's physical storage (aisle → shelf → bin) as an
//! addressable coordinate space and lets operators redefine its geometry
//! without losing track of inventory already stored in it.
//!
//! # Architecture
//!
//! ```text
//! ZoneStructure ─▶ StructureGenerator ─▶ bins ─┐
//!                                              ▼
//!          ReconciliationEngine::diff(current, proposed, OccupancyIndex)
//!                                              │
//!                    OccupiedBinPolicy (block | force) for occupied removals
//!                                              │
//!                      staged index ─▶ ZoneRepository ─▶ swap in
//! ```
//!
//! The spatial layout (aisle positions and annotations) lives alongside the
//! address space but never affects it.
//!
//! # Modules
//!
//! - [`address`] - Address codec and code patterns
//! - [`structure`] - Zone geometry and bin generation
//! - [`occupancy`] - Per-bin state and item transfers
//! - [`reconcile`] - Structure diff and occupied bin policy
//! - [`layout`] - Aisle positions, annotations and the move protocol
//! - [`service`] - Per-zone orchestration
//! - [`domain`] - Persistence and audit ports, domain events
//! - [`adapters`] - Port implementations
//! - [`metrics`] - Prometheus counters
//! - [`error`] - Error types

pub mod adapters;
pub mod address;
pub mod domain;
pub mod error;
pub mod layout;
pub mod metrics;
pub mod occupancy;
pub mod reconcile;
pub mod service;
pub mod structure;

// Re-export commonly used types
pub use address::{AddressCodec, BinCoordinate, BinDirection, BinLabeling, CodePattern, ZoneCodes};
pub use domain::{DomainEvent, ZoneId};
pub use error::{Error, Result};
pub use layout::{AislePosition, LayoutStore, MoveTarget, Pivot};
pub use occupancy::{BinState, ItemId, OccupancyIndex};
pub use reconcile::{OccupiedBinsAction, ReconciliationEngine, ReconfigurationPreview};
pub use service::{ApplyRequest, ServiceConfig, ZoneService};
pub use structure::{AisleConfig, StructureGenerator, ZoneStructure};
