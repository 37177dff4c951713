//! Domain Ports (Port/Adapter Pattern)
//!
//! The service layer depends only on these traits. Adapters provide the
//! concrete persistence sink and audit trail.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Service Layer                           │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                    Ports (Traits)                    │    │
//! │  │        ZoneRepository      │      EventPublisher     │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Infrastructure Layer                       │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                  Adapters (Impls)                    │    │
//! │  │  FileZoneRepository │ InMemoryZoneRepository         │    │
//! │  │  LoggingEventPublisher │ InMemoryEventCollector      │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::events::DomainEvent;
use crate::address::ZoneCodes;
use crate::error::Result;
use crate::layout::LayoutSnapshot;
use crate::occupancy::BinEntry;
use crate::reconcile::DetachedItem;
use crate::structure::ZoneStructure;

// =============================================================================
// Value Objects
// =============================================================================

/// Zone identifier (value object).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub String);

impl ZoneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ZoneId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ZoneId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Everything persisted for a zone's address space.
///
/// Written as one unit so structure, bins and detached history can never
/// disagree after a reconfiguration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneSnapshot {
    pub zone_id: ZoneId,
    pub codes: ZoneCodes,
    /// `None` until the first reconfiguration is applied
    pub structure: Option<ZoneStructure>,
    pub revision: u64,
    pub bins: Vec<BinEntry>,
    #[serde(default)]
    pub detached: Vec<DetachedItem>,
}

impl ZoneSnapshot {
    /// A registered zone with no structure.
    pub fn unconfigured(zone_id: ZoneId, codes: ZoneCodes) -> Self {
        Self {
            zone_id,
            codes,
            structure: None,
            revision: 0,
            bins: Vec::new(),
            detached: Vec::new(),
        }
    }
}

// =============================================================================
// Repository Port
// =============================================================================

/// Port for the persistence sink.
///
/// `save_zone` must replace the stored snapshot atomically: a reader sees
/// either the previous snapshot or the new one.
#[async_trait]
pub trait ZoneRepository: Send + Sync {
    /// Replace the stored snapshot for `snapshot.zone_id`.
    async fn save_zone(&self, snapshot: &ZoneSnapshot) -> Result<()>;

    /// Load a zone, `None` if it was never saved.
    async fn load_zone(&self, zone_id: &ZoneId) -> Result<Option<ZoneSnapshot>>;

    /// Replace the stored layout of a zone.
    async fn save_layout(&self, zone_id: &ZoneId, layout: &LayoutSnapshot) -> Result<()>;

    /// Load a zone's layout, `None` if it was never saved.
    async fn load_layout(&self, zone_id: &ZoneId) -> Result<Option<LayoutSnapshot>>;
}

// =============================================================================
// Event Publisher Port
// =============================================================================

/// Port for publishing domain events.
///
/// Backends range from the tracing log to an in-memory collector for tests.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a domain event.
    async fn publish(&self, event: DomainEvent) -> Result<()>;

    /// Publish multiple events.
    async fn publish_all(&self, events: Vec<DomainEvent>) -> Result<()>;
}

// =============================================================================
// Tests
// =============================================================================
