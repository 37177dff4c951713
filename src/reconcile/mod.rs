//! Reconciliation
//!
//! Diffs a zone's current structure against a proposed one and resolves
//! bins that would disappear while still holding items.
//!
//! # Flow
//!
//! ```text
//! proposed structure ──▶ ReconciliationEngine::diff ──▶ ReconfigurationPreview
//!                                  │
//!                                  ▼
//!              OccupiedBinPolicy::resolve(conflicts, block | force)
//!                                  │
//!                                  ▼
//!              ReconciliationDiff::stage ──▶ staged OccupancyIndex
//! ```
//!
//! Staging never touches the live index; the caller swaps the staged index in
//! once it has been persisted.

mod engine;
mod policy;
mod proptest;

pub use engine::{
    BinWithItems, ConflictBin, PreservedBin, ReconciliationDiff, ReconciliationEngine,
    ReconfigurationPreview, StagedReconfiguration,
};
pub use policy::{DetachedItem, OccupiedBinPolicy, OccupiedBinsAction, ResolutionPlan, Transition};
