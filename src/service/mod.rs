//! Zone Service
//!
//! Orchestrates the address space engine for many zones: preview and apply
//! reconfigurations, move items between bins and edit the spatial layout.
//!
//! # Apply Flow
//!
//! ```text
//! Idle ─▶ Validating ─▶ Diffing ─▶ Resolving ─▶ Staging ─▶ Persisting ─▶ Completed
//!             │            │           │           │            │
//!             └────────────┴───────────┴───────────┴────────────┴─▶ Failed
//! ```
//!
//! Live state is only replaced after the repository accepted the staged
//! snapshot, so any failure leaves the zone exactly as it was.

mod zone;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::ZoneCodes;
use crate::domain::ZoneId;
use crate::layout::Pivot;
use crate::occupancy::{BinView, OccupancyStats};
use crate::reconcile::{DetachedItem, OccupiedBinsAction};
use crate::structure::{ZoneStructure, DEFAULT_MAX_BINS};

pub use zone::ZoneService;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the zone service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Upper bound on bins a single zone structure may define
    pub max_bins: u64,

    /// Pivot used when computing drawn aisle outlines
    pub pivot: Pivot,

    /// Write committed layout changes to the repository
    pub persist_layout: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_bins: DEFAULT_MAX_BINS,
            pivot: Pivot::Center,
            persist_layout: true,
        }
    }
}

// =============================================================================
// Requests
// =============================================================================

/// A request to replace a zone's structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub structure: ZoneStructure,

    /// Required when removed bins still hold items
    #[serde(default)]
    pub action: Option<OccupiedBinsAction>,

    /// Revision the operator's preview was computed against
    #[serde(default)]
    pub expected_revision: Option<u64>,
}

impl ApplyRequest {
    pub fn new(structure: ZoneStructure) -> Self {
        Self {
            structure,
            action: None,
            expected_revision: None,
        }
    }

    pub fn with_action(mut self, action: OccupiedBinsAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn expecting_revision(mut self, revision: u64) -> Self {
        self.expected_revision = Some(revision);
        self
    }
}

// =============================================================================
// Reconfiguration State Machine
// =============================================================================

/// States in the apply process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconfigurationState {
    /// Initial state
    Idle,
    /// Checking the request against the zone
    Validating,
    /// Classifying every coordinate
    Diffing,
    /// Applying the occupied bin policy
    Resolving,
    /// Building the new index on a copy
    Staging,
    /// Writing the staged snapshot
    Persisting,
    /// New state is live
    Completed,
    /// Apply aborted; live state untouched
    Failed,
}

impl std::fmt::Display for ReconfigurationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconfigurationState::Idle => write!(f, "Idle"),
            ReconfigurationState::Validating => write!(f, "Validating"),
            ReconfigurationState::Diffing => write!(f, "Diffing"),
            ReconfigurationState::Resolving => write!(f, "Resolving"),
            ReconfigurationState::Staging => write!(f, "Staging"),
            ReconfigurationState::Persisting => write!(f, "Persisting"),
            ReconfigurationState::Completed => write!(f, "Completed"),
            ReconfigurationState::Failed => write!(f, "Failed"),
        }
    }
}

/// A step in the apply process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconfigurationStep {
    pub state: ReconfigurationState,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub duration_ms: u64,
}

/// Result of applying a reconfiguration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyOutcome {
    pub zone_id: ZoneId,

    /// Final state
    pub state: ReconfigurationState,

    /// Zone revision after the apply
    pub revision: u64,

    pub first_configuration: bool,

    /// The proposed structure matched the current one; nothing was written
    pub unchanged: bool,

    pub bins_preserved: usize,
    pub bins_created: usize,
    pub bins_deleted: usize,
    pub address_updates: usize,

    /// Full listing after the apply, blocked bins included
    pub bins: Vec<BinView>,
    pub stats: OccupancyStats,

    /// Bins kept as BLOCKED by this apply
    pub blocked: Vec<BinView>,

    /// Items detached by this apply
    pub detached: Vec<DetachedItem>,

    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,

    /// Error if failed
    pub error: Option<String>,

    /// Step-by-step log
    pub steps: Vec<ReconfigurationStep>,
}

impl ApplyOutcome {
    fn new(zone_id: &ZoneId, revision: u64) -> Self {
        let now = Utc::now();
        Self {
            zone_id: zone_id.clone(),
            state: ReconfigurationState::Idle,
            revision,
            first_configuration: false,
            unchanged: false,
            bins_preserved: 0,
            bins_created: 0,
            bins_deleted: 0,
            address_updates: 0,
            bins: Vec::new(),
            stats: OccupancyStats::new(0, 0, 0),
            blocked: Vec::new(),
            detached: Vec::new(),
            start_time: now,
            end_time: now,
            error: None,
            steps: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == ReconfigurationState::Completed
    }

    /// Record a state transition
    fn transition(&mut self, state: ReconfigurationState, message: impl Into<String>) {
        let now = Utc::now();
        let last_step_time = self
            .steps
            .last()
            .map(|s| s.timestamp)
            .unwrap_or(self.start_time);

        self.state = state;
        self.steps.push(ReconfigurationStep {
            state,
            timestamp: now,
            message: message.into(),
            duration_ms: (now - last_step_time).num_milliseconds().max(0) as u64,
        });
        self.end_time = now;
    }

    /// Mark as failed
    fn fail(&mut self, error: &crate::error::Error) {
        let message = error.to_string();
        self.transition(ReconfigurationState::Failed, message.clone());
        self.error = Some(message);
    }

    /// States visited, in order.
    pub fn states(&self) -> Vec<ReconfigurationState> {
        self.steps.iter().map(|s| s.state).collect()
    }
}

// =============================================================================
// Reports
// =============================================================================

/// Occupancy listing of a zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupancyReport {
    pub zone_id: ZoneId,
    pub revision: u64,
    pub bins: Vec<BinView>,
    pub stats: OccupancyStats,
}

/// Registration and configuration status of a zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneSummary {
    pub zone_id: ZoneId,
    pub codes: ZoneCodes,
    pub revision: u64,
    pub structure: Option<ZoneStructure>,
    pub stats: OccupancyStats,
    pub detached_items: usize,
}
