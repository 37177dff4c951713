//! Binspace Integration Tests
//!
//! End-to-end flows through `ZoneService`:
//! - Reconfiguration: preview, block, force, pattern changes, revisions
//! - Occupancy: transfers, blocked bins, persistence across restarts
//! - Layout: move protocol and orphaned positions

use std::sync::Arc;

use assert_matches::assert_matches;

use binspace::adapters::{FileZoneRepository, InMemoryEventCollector, InMemoryZoneRepository};
use binspace::address::{CodePattern, ZoneCodes};
use binspace::domain::ZoneId;
use binspace::error::Error;
use binspace::occupancy::{BinState, ItemId};
use binspace::reconcile::OccupiedBinsAction;
use binspace::service::{ApplyRequest, ServiceConfig, ZoneService};
use binspace::structure::ZoneStructure;

// =============================================================================
// Helpers
// =============================================================================

struct Harness {
    service: ZoneService,
    repository: Arc<InMemoryZoneRepository>,
    events: Arc<InMemoryEventCollector>,
    zone: ZoneId,
}

async fn harness() -> Harness {
    let repository = Arc::new(InMemoryZoneRepository::new());
    let events = Arc::new(InMemoryEventCollector::new());
    let service = ZoneService::new(ServiceConfig::default(), repository.clone(), events.clone());
    let zone = ZoneId::new("wh-z1");
    service
        .configure_zone(&zone, ZoneCodes::new("WH", "Z1"))
        .await
        .unwrap();
    Harness {
        service,
        repository,
        events,
        zone,
    }
}

/// Zone configured as 2 aisles x 3 shelves x 4 bins with one item in WH-Z1-0203-D.
async fn stocked_harness() -> Harness {
    let h = harness().await;
    h.service
        .apply(&h.zone, ApplyRequest::new(ZoneStructure::uniform(2, 3, 4)))
        .await
        .unwrap();
    h.service
        .transfer(&h.zone, &ItemId::new("SKU-1"), None, Some("WH-Z1-0203-D"))
        .await
        .unwrap();
    h
}

// =============================================================================
// Reconfiguration
// =============================================================================

mod reconfiguration_tests {
    use super::*;

    #[tokio::test]
    async fn test_first_configuration() {
        let h = harness().await;

        let preview = h
            .service
            .preview(&h.zone, &ZoneStructure::uniform(2, 3, 4))
            .await
            .unwrap();
        assert!(preview.is_first_configuration);
        assert_eq!(preview.total_bins, 24);
        assert_eq!(preview.bins_to_create, 24);
        assert_eq!(preview.first_address.as_deref(), Some("WH-Z1-0101-A"));
        assert_eq!(preview.last_address.as_deref(), Some("WH-Z1-0203-D"));

        let outcome = h
            .service
            .apply(&h.zone, ApplyRequest::new(ZoneStructure::uniform(2, 3, 4)))
            .await
            .unwrap();
        assert!(outcome.is_success());
        assert!(outcome.first_configuration);
        assert_eq!(outcome.revision, 1);
        assert_eq!(outcome.bins.len(), 24);
        assert_eq!(outcome.stats.total, 24);
        assert_eq!(outcome.stats.empty, 24);
    }

    #[tokio::test]
    async fn test_shrink_preview_reports_conflicts() {
        let h = stocked_harness().await;

        let preview = h
            .service
            .preview(&h.zone, &ZoneStructure::uniform(2, 3, 3))
            .await
            .unwrap();

        assert!(!preview.is_first_configuration);
        assert_eq!(preview.revision, 1);
        assert_eq!(preview.bins_to_preserve, 18);
        assert_eq!(preview.bins_to_create, 0);
        assert_eq!(preview.bins_to_delete_empty, 5);
        assert_eq!(preview.bins_with_items.len(), 1);
        assert_eq!(preview.bins_with_items[0].address, "WH-Z1-0203-D");
        assert_eq!(preview.bins_with_items[0].item_count, 1);
        assert_eq!(preview.total_affected_items, 1);

        // previews never change the zone
        let summary = h.service.summary(&h.zone).await.unwrap();
        assert_eq!(summary.revision, 1);
        assert_eq!(summary.stats.total, 24);
    }

    #[tokio::test]
    async fn test_shrink_without_action_rejected() {
        let h = stocked_harness().await;

        let result = h
            .service
            .apply(&h.zone, ApplyRequest::new(ZoneStructure::uniform(2, 3, 3)))
            .await;
        assert_matches!(
            result,
            Err(Error::ConflictResolutionRequired { bins: 1, items: 1 })
        );

        let summary = h.service.summary(&h.zone).await.unwrap();
        assert_eq!(summary.revision, 1);
        assert_eq!(summary.structure, Some(ZoneStructure::uniform(2, 3, 4)));
        assert_eq!(h.events.events_of_type("ReconfigurationFailed").len(), 1);
    }

    #[tokio::test]
    async fn test_block_keeps_item_in_blocked_bin() {
        let h = stocked_harness().await;

        let outcome = h
            .service
            .apply(
                &h.zone,
                ApplyRequest::new(ZoneStructure::uniform(2, 3, 3))
                    .with_action(OccupiedBinsAction::Block),
            )
            .await
            .unwrap();

        assert_eq!(outcome.revision, 2);
        assert_eq!(outcome.blocked.len(), 1);
        assert_eq!(outcome.blocked[0].address, "WH-Z1-0203-D");
        assert_eq!(outcome.stats.total, 18);
        assert_eq!(outcome.stats.blocked, 1);
        assert!(outcome.detached.is_empty());

        let bin = h.service.lookup(&h.zone, "WH-Z1-0203-D").await.unwrap();
        assert_eq!(bin.state, BinState::Blocked);
        assert_eq!(bin.item_count, 1);

        let located = h
            .service
            .locate(&h.zone, &ItemId::new("SKU-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(located.address, "WH-Z1-0203-D");

        // never listed as an empty slot of the new structure
        let report = h.service.occupancy(&h.zone).await.unwrap();
        assert!(!report
            .bins
            .iter()
            .any(|b| b.address == "WH-Z1-0203-D" && b.state == BinState::Empty));

        assert_eq!(h.events.events_of_type("BinBlocked").len(), 1);
    }

    #[tokio::test]
    async fn test_force_detaches_item() {
        let h = stocked_harness().await;

        let outcome = h
            .service
            .apply(
                &h.zone,
                ApplyRequest::new(ZoneStructure::uniform(2, 3, 3))
                    .with_action(OccupiedBinsAction::Force),
            )
            .await
            .unwrap();

        assert_eq!(outcome.detached.len(), 1);
        assert_eq!(outcome.detached[0].item, ItemId::new("SKU-1"));
        assert_eq!(outcome.detached[0].last_known_address, "WH-Z1-0203-D");
        assert_eq!(outcome.stats.total, 18);
        assert_eq!(outcome.stats.occupied, 0);
        assert_eq!(outcome.stats.blocked, 0);

        assert_eq!(
            h.service.locate(&h.zone, &ItemId::new("SKU-1")).await.unwrap(),
            None
        );
        let history = h.service.detached_items(&h.zone).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].last_known_address, "WH-Z1-0203-D");

        assert_eq!(h.events.events_of_type("ItemDetached").len(), 1);
    }

    #[tokio::test]
    async fn test_pattern_change_renames_preserved_bins() {
        let h = stocked_harness().await;
        h.service
            .transfer(&h.zone, &ItemId::new("SKU-2"), None, Some("WH-Z1-0101-A"))
            .await
            .unwrap();

        let wider = ZoneStructure::uniform(2, 3, 4).with_pattern(CodePattern {
            aisle_digits: 3,
            ..Default::default()
        });
        let preview = h.service.preview(&h.zone, &wider).await.unwrap();
        assert_eq!(preview.bins_to_preserve, 24);
        assert_eq!(preview.address_updates, 24);
        assert!(preview.bins_with_items.is_empty());

        h.service
            .apply(&h.zone, ApplyRequest::new(wider))
            .await
            .unwrap();

        let bin = h.service.lookup(&h.zone, "WH-Z1-00101-A").await.unwrap();
        assert_eq!(bin.item_count, 1);
        assert_eq!(
            h.service.items_at(&h.zone, "WH-Z1-00203-D").await.unwrap(),
            vec![ItemId::new("SKU-1")]
        );
        assert!(h.service.lookup(&h.zone, "WH-Z1-0101-A").await.is_err());
    }

    #[tokio::test]
    async fn test_stale_revision_rejected() {
        let h = stocked_harness().await;

        let result = h
            .service
            .apply(
                &h.zone,
                ApplyRequest::new(ZoneStructure::uniform(3, 3, 4)).expecting_revision(0),
            )
            .await;
        assert_matches!(
            result,
            Err(Error::ConcurrentModification {
                expected: 0,
                actual: 1,
                ..
            })
        );

        let outcome = h
            .service
            .apply(
                &h.zone,
                ApplyRequest::new(ZoneStructure::uniform(3, 3, 4)).expecting_revision(1),
            )
            .await
            .unwrap();
        assert_eq!(outcome.revision, 2);
        assert_eq!(outcome.bins_created, 12);
    }

    #[tokio::test]
    async fn test_lowered_bin_ceiling_still_allows_shrink() {
        let dir = tempfile::tempdir().unwrap();
        let zone = ZoneId::new("wh-z1");

        {
            let service = ZoneService::new(
                ServiceConfig::default(),
                Arc::new(FileZoneRepository::new(dir.path())),
                Arc::new(InMemoryEventCollector::new()),
            );
            service
                .configure_zone(&zone, ZoneCodes::new("WH", "Z1"))
                .await
                .unwrap();
            service
                .apply(&zone, ApplyRequest::new(ZoneStructure::uniform(2, 3, 4)))
                .await
                .unwrap();
        }

        let config = ServiceConfig {
            max_bins: 10,
            ..ServiceConfig::default()
        };
        let service = ZoneService::new(
            config,
            Arc::new(FileZoneRepository::new(dir.path())),
            Arc::new(InMemoryEventCollector::new()),
        );
        service.open_zone(&zone).await.unwrap();

        let preview = service
            .preview(&zone, &ZoneStructure::uniform(1, 1, 1))
            .await
            .unwrap();
        assert_eq!(preview.bins_to_delete_empty, 23);
        assert_eq!(preview.total_bins, 1);

        // growing past the new ceiling is still refused
        assert_matches!(
            service.preview(&zone, &ZoneStructure::uniform(2, 3, 2)).await,
            Err(Error::Configuration { field, .. }) if field == "totalBins"
        );

        let outcome = service
            .apply(&zone, ApplyRequest::new(ZoneStructure::uniform(1, 2, 2)))
            .await
            .unwrap();
        assert_eq!(outcome.revision, 2);
        assert_eq!(service.occupancy(&zone).await.unwrap().stats.total, 4);
    }

    #[tokio::test]
    async fn test_storage_failure_leaves_zone_untouched() {
        let h = stocked_harness().await;
        h.repository.set_fail_writes(true);

        let result = h
            .service
            .apply(
                &h.zone,
                ApplyRequest::new(ZoneStructure::uniform(2, 3, 3))
                    .with_action(OccupiedBinsAction::Force),
            )
            .await;
        assert_matches!(result, Err(Error::Storage(_)));

        let summary = h.service.summary(&h.zone).await.unwrap();
        assert_eq!(summary.revision, 1);
        assert_eq!(summary.stats.total, 24);
        assert_eq!(summary.stats.occupied, 1);
        assert_eq!(summary.detached_items, 0);

        h.repository.set_fail_writes(false);
        let outcome = h
            .service
            .apply(
                &h.zone,
                ApplyRequest::new(ZoneStructure::uniform(2, 3, 3))
                    .with_action(OccupiedBinsAction::Force),
            )
            .await
            .unwrap();
        assert_eq!(outcome.revision, 2);
        assert_eq!(h.repository.zone(&h.zone).unwrap().revision, 2);
    }
}

// =============================================================================
// Occupancy
// =============================================================================

mod occupancy_tests {
    use super::*;

    #[tokio::test]
    async fn test_transfer_into_blocked_bin_rejected() {
        let h = stocked_harness().await;
        h.service
            .apply(
                &h.zone,
                ApplyRequest::new(ZoneStructure::uniform(2, 3, 3))
                    .with_action(OccupiedBinsAction::Block),
            )
            .await
            .unwrap();

        let result = h
            .service
            .transfer(&h.zone, &ItemId::new("SKU-9"), None, Some("WH-Z1-0203-D"))
            .await;
        assert_matches!(result, Err(Error::TransferRejected { .. }));
    }

    #[tokio::test]
    async fn test_draining_blocked_bin_retires_it() {
        let h = stocked_harness().await;
        h.service
            .apply(
                &h.zone,
                ApplyRequest::new(ZoneStructure::uniform(2, 3, 3))
                    .with_action(OccupiedBinsAction::Block),
            )
            .await
            .unwrap();

        let receipt = h
            .service
            .transfer(
                &h.zone,
                &ItemId::new("SKU-1"),
                Some("WH-Z1-0203-D"),
                Some("WH-Z1-0101-A"),
            )
            .await
            .unwrap();
        assert_eq!(receipt.from_address.as_deref(), Some("WH-Z1-0203-D"));
        assert_eq!(receipt.to_address.as_deref(), Some("WH-Z1-0101-A"));

        let report = h.service.occupancy(&h.zone).await.unwrap();
        assert_eq!(report.stats.blocked, 0);
        assert_eq!(report.stats.occupied, 1);
        assert_eq!(report.bins.len(), 18);
        assert_matches!(
            h.service.lookup(&h.zone, "WH-Z1-0203-D").await,
            Err(Error::NotFound(_))
        );
    }

    #[tokio::test]
    async fn test_structure_cannot_take_blocked_bin_address() {
        use binspace::structure::AisleConfig;

        let h = stocked_harness().await;
        h.service
            .apply(
                &h.zone,
                ApplyRequest::new(ZoneStructure::uniform(2, 3, 3))
                    .with_action(OccupiedBinsAction::Block),
            )
            .await
            .unwrap();

        // aisle 20 shelf 3 renders as "0203" with 3 aisle digits and 1 shelf digit
        let clashing = ZoneStructure::per_aisle(vec![
            AisleConfig::new(1, 3, 3),
            AisleConfig::new(2, 3, 3),
            AisleConfig::new(20, 3, 4),
        ])
        .with_pattern(CodePattern {
            aisle_digits: 3,
            shelf_digits: 1,
            ..CodePattern::default()
        });
        assert_matches!(
            h.service.apply(&h.zone, ApplyRequest::new(clashing)).await,
            Err(Error::Configuration { field, .. }) if field == "pattern"
        );
        assert_eq!(h.service.summary(&h.zone).await.unwrap().revision, 2);

        let blocked = h.service.lookup(&h.zone, "WH-Z1-0203-D").await.unwrap();
        assert_eq!(blocked.state, BinState::Blocked);
        h.service
            .transfer(&h.zone, &ItemId::new("SKU-1"), Some("WH-Z1-0203-D"), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_transfer_does_not_bump_revision() {
        let h = stocked_harness().await;

        h.service
            .transfer(&h.zone, &ItemId::new("SKU-1"), Some("WH-Z1-0203-D"), None)
            .await
            .unwrap();

        let summary = h.service.summary(&h.zone).await.unwrap();
        assert_eq!(summary.revision, 1);
        assert_eq!(summary.stats.occupied, 0);
        assert_eq!(h.events.events_of_type("ItemTransferred").len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_receipts() {
        let h = harness().await;
        h.service
            .apply(&h.zone, ApplyRequest::new(ZoneStructure::uniform(2, 3, 4)))
            .await
            .unwrap();
        let service = Arc::new(h.service);

        let mut handles = Vec::new();
        for (i, label) in ["A", "B", "C", "D"].iter().enumerate() {
            for shelf in 1..=3 {
                let service = service.clone();
                let zone = h.zone.clone();
                let address = format!("WH-Z1-01{:02}-{}", shelf, label);
                let item = ItemId::new(format!("SKU-{}-{}", shelf, i));
                handles.push(tokio::spawn(async move {
                    service.transfer(&zone, &item, None, Some(&address)).await
                }));
            }
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let report = service.occupancy(&h.zone).await.unwrap();
        assert_eq!(report.stats.occupied, 12);
        assert_eq!(
            h.repository
                .zone(&h.zone)
                .unwrap()
                .bins
                .iter()
                .filter(|b| !b.record.items.is_empty())
                .count(),
            12
        );
    }

    #[tokio::test]
    async fn test_state_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let zone = ZoneId::new("wh-z1");

        {
            let service = ZoneService::new(
                ServiceConfig::default(),
                Arc::new(FileZoneRepository::new(dir.path())),
                Arc::new(InMemoryEventCollector::new()),
            );
            service
                .configure_zone(&zone, ZoneCodes::new("WH", "Z1"))
                .await
                .unwrap();
            service
                .apply(&zone, ApplyRequest::new(ZoneStructure::uniform(2, 3, 4)))
                .await
                .unwrap();
            service
                .transfer(&zone, &ItemId::new("SKU-1"), None, Some("WH-Z1-0102-B"))
                .await
                .unwrap();
            service.set_aisle_position(&zone, 1, 10.0, 20.0, 90.0).await.unwrap();
        }

        let service = ZoneService::new(
            ServiceConfig::default(),
            Arc::new(FileZoneRepository::new(dir.path())),
            Arc::new(InMemoryEventCollector::new()),
        );
        let summary = service.open_zone(&zone).await.unwrap();
        assert_eq!(summary.revision, 1);
        assert_eq!(summary.codes, ZoneCodes::new("WH", "Z1"));

        let bin = service.lookup(&zone, "WH-Z1-0102-B").await.unwrap();
        assert_eq!(bin.state, BinState::Occupied);
        assert_eq!(
            service.aisle_positions(&zone).unwrap()[0].rotation,
            90.0
        );
    }

    #[tokio::test]
    async fn test_non_finite_layout_never_reaches_disk() {
        use binspace::layout::{AnnotationKind, AnnotationSpec, MoveTarget};

        let dir = tempfile::tempdir().unwrap();
        let zone = ZoneId::new("wh-z1");

        {
            let service = ZoneService::new(
                ServiceConfig::default(),
                Arc::new(FileZoneRepository::new(dir.path())),
                Arc::new(InMemoryEventCollector::new()),
            );
            service
                .configure_zone(&zone, ZoneCodes::new("WH", "Z1"))
                .await
                .unwrap();
            service
                .apply(&zone, ApplyRequest::new(ZoneStructure::uniform(2, 3, 4)))
                .await
                .unwrap();
            service.set_aisle_position(&zone, 1, 10.0, 20.0, 90.0).await.unwrap();

            assert_matches!(
                service
                    .set_aisle_position(&zone, 1, f64::NAN, 0.0, f64::INFINITY)
                    .await,
                Err(Error::Configuration { .. })
            );
            assert_matches!(
                service.rotate_aisle(&zone, 2, f64::NAN).await,
                Err(Error::Configuration { .. })
            );
            assert_matches!(
                service
                    .add_annotation(
                        &zone,
                        AnnotationSpec::new(AnnotationKind::Marker, 0.0, 0.0, f64::INFINITY, 1.0),
                    )
                    .await,
                Err(Error::Configuration { .. })
            );

            let target = MoveTarget::Aisle(1);
            service.begin_move(&zone, target).unwrap();
            assert_matches!(
                service.apply_delta(&zone, target, f64::NAN, 0.0),
                Err(Error::Configuration { .. })
            );
            service.commit_move(&zone, target).await.unwrap();
        }

        let service = ZoneService::new(
            ServiceConfig::default(),
            Arc::new(FileZoneRepository::new(dir.path())),
            Arc::new(InMemoryEventCollector::new()),
        );
        let summary = service.open_zone(&zone).await.unwrap();
        assert_eq!(summary.revision, 1);
        let positions = service.aisle_positions(&zone).unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!((positions[0].x, positions[0].y, positions[0].rotation), (10.0, 20.0, 90.0));
        assert!(service.annotations(&zone).unwrap().is_empty());
    }
}

// =============================================================================
// Layout
// =============================================================================

mod layout_tests {
    use super::*;
    use binspace::layout::{AnnotationKind, AnnotationSpec, MoveTarget, PositionStatus};

    #[tokio::test]
    async fn test_move_protocol_persists_on_commit_only() {
        let h = stocked_harness().await;
        h.service.set_aisle_position(&h.zone, 1, 0.0, 0.0, 0.0).await.unwrap();
        let commits_before = h.events.events_of_type("AislePositionCommitted").len();

        let target = MoveTarget::Aisle(1);
        h.service.begin_move(&h.zone, target).unwrap();
        h.service.apply_delta(&h.zone, target, 5.0, 0.0).unwrap();
        let shown = h.service.apply_delta(&h.zone, target, 5.0, -2.0).unwrap();
        assert_eq!((shown.x, shown.y), (10.0, -2.0));

        let stored = h.repository.layout(&h.zone).unwrap();
        assert_eq!((stored.positions[0].x, stored.positions[0].y), (0.0, 0.0));
        assert_eq!(
            h.events.events_of_type("AislePositionCommitted").len(),
            commits_before
        );

        h.service.commit_move(&h.zone, target).await.unwrap();
        let stored = h.repository.layout(&h.zone).unwrap();
        assert_eq!((stored.positions[0].x, stored.positions[0].y), (10.0, -2.0));
        assert_eq!(
            h.events.events_of_type("AislePositionCommitted").len(),
            commits_before + 1
        );
    }

    #[tokio::test]
    async fn test_cancelled_move_restores_position() {
        let h = stocked_harness().await;
        h.service.set_aisle_position(&h.zone, 2, 3.0, 4.0, 0.0).await.unwrap();

        let target = MoveTarget::Aisle(2);
        h.service.begin_move(&h.zone, target).unwrap();
        h.service.apply_delta(&h.zone, target, 50.0, 50.0).unwrap();
        assert!(h.service.cancel_move(&h.zone, target).unwrap());

        let positions = h.service.aisle_positions(&h.zone).unwrap();
        assert_eq!((positions[0].x, positions[0].y), (3.0, 4.0));
        assert!(h.service.commit_move(&h.zone, target).await.is_err());
    }

    #[tokio::test]
    async fn test_positions_orphaned_by_shrink() {
        let h = stocked_harness().await;
        h.service
            .apply(&h.zone, ApplyRequest::new(ZoneStructure::uniform(3, 3, 4)))
            .await
            .unwrap();
        for aisle in 1..=3 {
            h.service
                .set_aisle_position(&h.zone, aisle, aisle as f64 * 10.0, 0.0, 0.0)
                .await
                .unwrap();
        }

        h.service
            .apply(&h.zone, ApplyRequest::new(ZoneStructure::uniform(2, 3, 4)))
            .await
            .unwrap();

        let status = h.service.layout_status(&h.zone).await.unwrap();
        assert_eq!(status.len(), 3);
        let orphaned: Vec<u32> = status
            .iter()
            .filter(|r| r.status == PositionStatus::Orphaned)
            .map(|r| r.position.aisle_number)
            .collect();
        assert_eq!(orphaned, vec![3]);
    }

    #[tokio::test]
    async fn test_annotation_lifecycle() {
        let h = harness().await;

        let annotation = h
            .service
            .add_annotation(
                &h.zone,
                AnnotationSpec::new(AnnotationKind::Area, 0.0, 0.0, 40.0, 10.0)
                    .with_label("Dock 1"),
            )
            .await
            .unwrap();

        let target = MoveTarget::Annotation(annotation.id);
        h.service.begin_move(&h.zone, target).unwrap();
        h.service.apply_delta(&h.zone, target, 2.5, 2.5).unwrap();
        h.service.commit_move(&h.zone, target).await.unwrap();

        let moved = &h.service.annotations(&h.zone).unwrap()[0];
        assert_eq!((moved.x, moved.y), (2.5, 2.5));
        assert_eq!(moved.label, "Dock 1");

        h.service
            .remove_annotation(&h.zone, &annotation.id)
            .await
            .unwrap();
        assert!(h.service.annotations(&h.zone).unwrap().is_empty());
        assert_matches!(
            h.service.remove_annotation(&h.zone, &annotation.id).await,
            Err(Error::NotFound(_))
        );

        let zone_events = h.events.events_for_zone(h.zone.as_str());
        assert_eq!(h.events.events_of_type("AnnotationAdded").len(), 1);
        assert_eq!(h.events.events_of_type("AnnotationMoved").len(), 1);
        assert_eq!(h.events.events_of_type("AnnotationRemoved").len(), 1);
        assert_eq!(zone_events.len(), h.events.len());
    }
}
