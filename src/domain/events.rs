//! Domain Events
//!
//! Immutable records of things that happened to a zone's address space or
//! layout. They form the audit trail for reconfigurations and are published
//! after the corresponding state change has been persisted.
//!
//! # Example
//!
//! ```ignore
//! let event = DomainEvent::item_transferred("zone-a", &receipt);
//! event_publisher.publish(event).await?;
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::layout::{AislePosition, LayoutAnnotation};
use crate::occupancy::TransferReceipt;
use crate::reconcile::DetachedItem;

/// Domain event representing a significant occurrence in a zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
    // =========================================================================
    // Zone Events
    // =========================================================================
    /// A zone was registered with the service.
    ZoneRegistered {
        zone_id: String,
        warehouse_code: String,
        zone_code: String,
        timestamp: DateTime<Utc>,
    },

    // =========================================================================
    // Reconfiguration Events
    // =========================================================================
    /// A structure was applied to a zone.
    ReconfigurationApplied {
        zone_id: String,
        revision: u64,
        first_configuration: bool,
        preserved: usize,
        created: usize,
        deleted: usize,
        address_updates: usize,
        action: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A reconfiguration was rejected or failed.
    ReconfigurationFailed {
        zone_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A removed bin was kept because it still holds items.
    BinBlocked {
        zone_id: String,
        address: String,
        item_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// An item lost its bin during a forced reconfiguration.
    ItemDetached {
        zone_id: String,
        item: String,
        last_known_address: String,
        timestamp: DateTime<Utc>,
    },

    // =========================================================================
    // Occupancy Events
    // =========================================================================
    /// An item was received, moved or issued.
    ItemTransferred {
        zone_id: String,
        item: String,
        from_address: Option<String>,
        to_address: Option<String>,
        timestamp: DateTime<Utc>,
    },

    // =========================================================================
    // Layout Events
    // =========================================================================
    /// An aisle's position was committed.
    AislePositionCommitted {
        zone_id: String,
        aisle_number: u32,
        x: f64,
        y: f64,
        rotation: f64,
        timestamp: DateTime<Utc>,
    },

    /// An annotation was added.
    AnnotationAdded {
        zone_id: String,
        annotation_id: Uuid,
        kind: String,
        timestamp: DateTime<Utc>,
    },

    /// An annotation was moved.
    AnnotationMoved {
        zone_id: String,
        annotation_id: Uuid,
        x: f64,
        y: f64,
        timestamp: DateTime<Utc>,
    },

    /// An annotation was removed.
    AnnotationRemoved {
        zone_id: String,
        annotation_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::ZoneRegistered { timestamp, .. } => *timestamp,
            DomainEvent::ReconfigurationApplied { timestamp, .. } => *timestamp,
            DomainEvent::ReconfigurationFailed { timestamp, .. } => *timestamp,
            DomainEvent::BinBlocked { timestamp, .. } => *timestamp,
            DomainEvent::ItemDetached { timestamp, .. } => *timestamp,
            DomainEvent::ItemTransferred { timestamp, .. } => *timestamp,
            DomainEvent::AislePositionCommitted { timestamp, .. } => *timestamp,
            DomainEvent::AnnotationAdded { timestamp, .. } => *timestamp,
            DomainEvent::AnnotationMoved { timestamp, .. } => *timestamp,
            DomainEvent::AnnotationRemoved { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::ZoneRegistered { .. } => "ZoneRegistered",
            DomainEvent::ReconfigurationApplied { .. } => "ReconfigurationApplied",
            DomainEvent::ReconfigurationFailed { .. } => "ReconfigurationFailed",
            DomainEvent::BinBlocked { .. } => "BinBlocked",
            DomainEvent::ItemDetached { .. } => "ItemDetached",
            DomainEvent::ItemTransferred { .. } => "ItemTransferred",
            DomainEvent::AislePositionCommitted { .. } => "AislePositionCommitted",
            DomainEvent::AnnotationAdded { .. } => "AnnotationAdded",
            DomainEvent::AnnotationMoved { .. } => "AnnotationMoved",
            DomainEvent::AnnotationRemoved { .. } => "AnnotationRemoved",
        }
    }

    /// Get the zone the event belongs to.
    pub fn zone_id(&self) -> &str {
        match self {
            DomainEvent::ZoneRegistered { zone_id, .. }
            | DomainEvent::ReconfigurationApplied { zone_id, .. }
            | DomainEvent::ReconfigurationFailed { zone_id, .. }
            | DomainEvent::BinBlocked { zone_id, .. }
            | DomainEvent::ItemDetached { zone_id, .. }
            | DomainEvent::ItemTransferred { zone_id, .. }
            | DomainEvent::AislePositionCommitted { zone_id, .. }
            | DomainEvent::AnnotationAdded { zone_id, .. }
            | DomainEvent::AnnotationMoved { zone_id, .. }
            | DomainEvent::AnnotationRemoved { zone_id, .. } => zone_id,
        }
    }
}

// =============================================================================
// Event Builders
// =============================================================================

impl DomainEvent {
    pub fn zone_registered(
        zone_id: impl Into<String>,
        warehouse_code: impl Into<String>,
        zone_code: impl Into<String>,
    ) -> Self {
        DomainEvent::ZoneRegistered {
            zone_id: zone_id.into(),
            warehouse_code: warehouse_code.into(),
            zone_code: zone_code.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn reconfiguration_failed(zone_id: impl Into<String>, reason: impl Into<String>) -> Self {
        DomainEvent::ReconfigurationFailed {
            zone_id: zone_id.into(),
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn bin_blocked(zone_id: impl Into<String>, address: impl Into<String>, item_count: usize) -> Self {
        DomainEvent::BinBlocked {
            zone_id: zone_id.into(),
            address: address.into(),
            item_count,
            timestamp: Utc::now(),
        }
    }

    /// Uses the detachment time as the event timestamp.
    pub fn item_detached(zone_id: impl Into<String>, detached: &DetachedItem) -> Self {
        DomainEvent::ItemDetached {
            zone_id: zone_id.into(),
            item: detached.item.to_string(),
            last_known_address: detached.last_known_address.clone(),
            timestamp: detached.detached_at,
        }
    }

    pub fn item_transferred(zone_id: impl Into<String>, receipt: &TransferReceipt) -> Self {
        DomainEvent::ItemTransferred {
            zone_id: zone_id.into(),
            item: receipt.item.to_string(),
            from_address: receipt.from_address.clone(),
            to_address: receipt.to_address.clone(),
            timestamp: Utc::now(),
        }
    }

    pub fn aisle_position_committed(zone_id: impl Into<String>, position: &AislePosition) -> Self {
        DomainEvent::AislePositionCommitted {
            zone_id: zone_id.into(),
            aisle_number: position.aisle_number,
            x: position.x,
            y: position.y,
            rotation: position.rotation,
            timestamp: Utc::now(),
        }
    }

    pub fn annotation_added(zone_id: impl Into<String>, annotation: &LayoutAnnotation) -> Self {
        DomainEvent::AnnotationAdded {
            zone_id: zone_id.into(),
            annotation_id: annotation.id,
            kind: format!("{:?}", annotation.kind),
            timestamp: Utc::now(),
        }
    }

    pub fn annotation_moved(zone_id: impl Into<String>, annotation: &LayoutAnnotation) -> Self {
        DomainEvent::AnnotationMoved {
            zone_id: zone_id.into(),
            annotation_id: annotation.id,
            x: annotation.x,
            y: annotation.y,
            timestamp: Utc::now(),
        }
    }

    pub fn annotation_removed(zone_id: impl Into<String>, annotation_id: Uuid) -> Self {
        DomainEvent::AnnotationRemoved {
            zone_id: zone_id.into(),
            annotation_id,
            timestamp: Utc::now(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::BinCoordinate;
    use crate::occupancy::ItemId;

    fn receipt() -> TransferReceipt {
        TransferReceipt {
            item: ItemId::from("SKU-9"),
            from_address: None,
            to_address: Some("WH-Z1-0101-A".to_string()),
        }
    }

    #[test]
    fn test_event_serialization() {
        let event = DomainEvent::item_transferred("zone-a", &receipt());

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"ItemTransferred\""));
        assert!(json.contains("SKU-9"));

        let deserialized: DomainEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.event_type(), "ItemTransferred");
        assert_eq!(deserialized.zone_id(), "zone-a");
    }

    #[test]
    fn test_detached_event_keeps_detach_time() {
        let detached = DetachedItem {
            item: ItemId::from("SKU-1"),
            last_known_address: "WH-Z1-0203-D".to_string(),
            coordinate: BinCoordinate::new(2, 3, 3),
            detached_at: Utc::now(),
        };
        let event = DomainEvent::item_detached("zone-a", &detached);
        assert_eq!(event.timestamp(), detached.detached_at);
        assert_eq!(event.event_type(), "ItemDetached");
    }

    #[test]
    fn test_timestamp() {
        let before = Utc::now();
        let event = DomainEvent::bin_blocked("zone-a", "WH-Z1-0101-A", 2);
        let after = Utc::now();

        assert!(event.timestamp() >= before);
        assert!(event.timestamp() <= after);
    }

    #[test]
    fn test_layout_events() {
        let position = AislePosition::new(4, 10.0, 20.0, 90.0).unwrap();
        let event = DomainEvent::aisle_position_committed("zone-b", &position);
        assert_eq!(event.event_type(), "AislePositionCommitted");
        assert_eq!(event.zone_id(), "zone-b");

        let removed = DomainEvent::annotation_removed("zone-b", Uuid::new_v4());
        assert_eq!(removed.event_type(), "AnnotationRemoved");
    }
}
