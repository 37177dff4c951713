//! Zone service implementation

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    ApplyOutcome, ApplyRequest, OccupancyReport, ReconfigurationState, ServiceConfig, ZoneSummary,
};
use crate::address::{AddressCodec, ZoneCodes};
use crate::domain::{DomainEvent, EventPublisher, ZoneId, ZoneRepository, ZoneSnapshot};
use crate::error::{Error, Result};
use crate::layout::{
    AislePosition, AnnotationSpec, Committed, Footprint, LayoutAnnotation, LayoutStore,
    MoveTarget, Point, PositionReport,
};
use crate::metrics::{self, outcome};
use crate::occupancy::{BinView, ItemId, OccupancyIndex, TransferReceipt};
use crate::reconcile::{DetachedItem, OccupiedBinPolicy, ReconciliationEngine, ReconfigurationPreview};
use crate::structure::{StructureGenerator, ZoneStructure};

// =============================================================================
// Zone State
// =============================================================================

/// Live address space of one zone. Guarded by the zone mutex.
#[derive(Debug, Clone)]
struct ZoneState {
    codes: ZoneCodes,
    structure: Option<ZoneStructure>,
    revision: u64,
    index: OccupancyIndex,
    detached: Vec<DetachedItem>,
}

impl ZoneState {
    fn new(codes: ZoneCodes) -> Self {
        Self {
            codes,
            structure: None,
            revision: 0,
            index: OccupancyIndex::default(),
            detached: Vec::new(),
        }
    }

    fn from_snapshot(snapshot: ZoneSnapshot) -> Result<Self> {
        Ok(Self {
            codes: snapshot.codes,
            structure: snapshot.structure,
            revision: snapshot.revision,
            index: OccupancyIndex::from_entries(snapshot.bins)?,
            detached: snapshot.detached,
        })
    }

    fn snapshot(&self, zone_id: &ZoneId) -> ZoneSnapshot {
        ZoneSnapshot {
            zone_id: zone_id.clone(),
            codes: self.codes.clone(),
            structure: self.structure.clone(),
            revision: self.revision,
            bins: self.index.entries(),
            detached: self.detached.clone(),
        }
    }

    fn summary(&self, zone_id: &ZoneId) -> ZoneSummary {
        ZoneSummary {
            zone_id: zone_id.clone(),
            codes: self.codes.clone(),
            revision: self.revision,
            structure: self.structure.clone(),
            stats: self.index.stats(),
            detached_items: self.detached.len(),
        }
    }

    fn structure(&self, zone_id: &ZoneId) -> Result<&ZoneStructure> {
        self.structure
            .as_ref()
            .ok_or_else(|| Error::ZoneNotConfigured(zone_id.to_string()))
    }

    /// Resolve an address to its bin.
    ///
    /// Structural bins are found by decoding; blocked bins keep their
    /// pre-removal address and are matched verbatim, whatever pattern they
    /// were written in.
    fn resolve(&self, zone_id: &ZoneId, address: &str) -> Result<BinView> {
        let structure = self.structure(zone_id)?;
        let codec = AddressCodec::new(self.codes.clone(), structure.pattern.clone())?;

        let parsed = codec.parse(address);
        if let Ok(parsed) = &parsed {
            let coordinate = structure
                .bins_in_shelf(parsed.aisle)
                .and_then(|width| parsed.coordinate(structure.pattern.bin_direction, width))
                .filter(|c| structure.contains(c));
            if let Some(view) = coordinate.and_then(|c| self.index.view(&c)) {
                return Ok(view);
            }
        }

        if let Some(view) = self.index.find_by_address(address) {
            return Ok(view);
        }
        parsed?;
        Err(Error::NotFound(format!("bin {} in zone {}", address, zone_id)))
    }
}

fn check_codes(zone_id: &ZoneId, registered: &ZoneCodes, requested: &ZoneCodes) -> Result<()> {
    if registered != requested {
        return Err(Error::config(
            "zoneCodes",
            format!(
                "zone {} is registered as {}/{}, not {}/{}",
                zone_id, registered.warehouse, registered.zone, requested.warehouse, requested.zone
            ),
        ));
    }
    Ok(())
}

// =============================================================================
// Layout Handle
// =============================================================================

#[derive(Debug)]
struct LayoutHandle {
    store: RwLock<LayoutStore>,
    /// Serialises layout writes so the last commit is the last one persisted
    persist: Mutex<()>,
}

// =============================================================================
// Zone Service
// =============================================================================

/// Entry point for every zone operation.
///
/// Apply and transfer are serialised per zone by a mutex; different zones
/// proceed in parallel. Layout edits use their own lock and never wait on
/// a reconfiguration.
pub struct ZoneService {
    config: ServiceConfig,
    repository: Arc<dyn ZoneRepository>,
    events: Arc<dyn EventPublisher>,
    zones: DashMap<ZoneId, Arc<Mutex<ZoneState>>>,
    layouts: DashMap<ZoneId, Arc<LayoutHandle>>,
}

impl std::fmt::Debug for ZoneService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneService")
            .field("config", &self.config)
            .field("zones", &self.zones.len())
            .finish()
    }
}

impl ZoneService {
    pub fn new(
        config: ServiceConfig,
        repository: Arc<dyn ZoneRepository>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            config,
            repository,
            events,
            zones: DashMap::new(),
            layouts: DashMap::new(),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Registered zones, sorted.
    pub fn zone_ids(&self) -> Vec<ZoneId> {
        let mut ids: Vec<ZoneId> = self.zones.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    fn zone(&self, zone_id: &ZoneId) -> Result<Arc<Mutex<ZoneState>>> {
        self.zones
            .get(zone_id)
            .map(|z| z.value().clone())
            .ok_or_else(|| Error::ZoneNotFound(zone_id.to_string()))
    }

    fn layout(&self, zone_id: &ZoneId) -> Result<Arc<LayoutHandle>> {
        self.layouts
            .get(zone_id)
            .map(|l| l.value().clone())
            .ok_or_else(|| Error::ZoneNotFound(zone_id.to_string()))
    }

    fn engine(&self, codes: &ZoneCodes) -> ReconciliationEngine {
        ReconciliationEngine::new(
            StructureGenerator::new(codes.clone()).with_max_bins(self.config.max_bins),
        )
    }

    async fn publish(&self, events: Vec<DomainEvent>) {
        if events.is_empty() {
            return;
        }
        if let Err(e) = self.events.publish_all(events).await {
            warn!(error = %e, "Failed to publish domain events");
        }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a zone, restoring it from the repository when it was saved
    /// before. Registering again with the same codes is a no-op.
    #[instrument(skip(self, zone_id, codes), fields(zone = %zone_id))]
    pub async fn configure_zone(&self, zone_id: &ZoneId, codes: ZoneCodes) -> Result<ZoneSummary> {
        for (field, code) in [("warehouse", &codes.warehouse), ("zone", &codes.zone)] {
            if code.trim().is_empty() {
                return Err(Error::config(field, "code must not be empty"));
            }
        }
        self.register(zone_id, Some(codes)).await
    }

    /// Load a previously registered zone from the repository.
    #[instrument(skip(self, zone_id), fields(zone = %zone_id))]
    pub async fn open_zone(&self, zone_id: &ZoneId) -> Result<ZoneSummary> {
        self.register(zone_id, None).await
    }

    async fn register(&self, zone_id: &ZoneId, codes: Option<ZoneCodes>) -> Result<ZoneSummary> {
        if let Ok(existing) = self.zone(zone_id) {
            let state = existing.lock().await;
            if let Some(codes) = &codes {
                check_codes(zone_id, &state.codes, codes)?;
            }
            return Ok(state.summary(zone_id));
        }

        let stored = self.repository.load_zone(zone_id).await?;
        let restored = stored.is_some();
        let state = match (stored, &codes) {
            (Some(snapshot), requested) => {
                if let Some(requested) = requested {
                    check_codes(zone_id, &snapshot.codes, requested)?;
                }
                ZoneState::from_snapshot(snapshot)?
            }
            (None, Some(requested)) => ZoneState::new(requested.clone()),
            (None, None) => return Err(Error::ZoneNotFound(zone_id.to_string())),
        };
        let layout = self
            .repository
            .load_layout(zone_id)
            .await?
            .map(LayoutStore::from_snapshot)
            .unwrap_or_default();

        let (handle, inserted) = match self.zones.entry(zone_id.clone()) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                let handle = Arc::new(Mutex::new(state));
                entry.insert(handle.clone());
                (handle, true)
            }
        };

        if !inserted {
            let state = handle.lock().await;
            if let Some(codes) = &codes {
                check_codes(zone_id, &state.codes, codes)?;
            }
            return Ok(state.summary(zone_id));
        }

        self.layouts.entry(zone_id.clone()).or_insert_with(|| {
            Arc::new(LayoutHandle {
                store: RwLock::new(layout),
                persist: Mutex::new(()),
            })
        });

        let state = handle.lock().await;
        if restored {
            info!(revision = state.revision, "Restored zone from repository");
            return Ok(state.summary(zone_id));
        }

        if let Err(e) = self.repository.save_zone(&state.snapshot(zone_id)).await {
            drop(state);
            self.zones.remove(zone_id);
            self.layouts.remove(zone_id);
            return Err(e);
        }

        info!(
            warehouse = %state.codes.warehouse,
            zone_code = %state.codes.zone,
            "Registered zone"
        );
        let summary = state.summary(zone_id);
        drop(state);
        self.publish(vec![DomainEvent::zone_registered(
            zone_id.as_str(),
            summary.codes.warehouse.clone(),
            summary.codes.zone.clone(),
        )])
        .await;
        Ok(summary)
    }

    pub async fn summary(&self, zone_id: &ZoneId) -> Result<ZoneSummary> {
        let zone = self.zone(zone_id)?;
        let state = zone.lock().await;
        Ok(state.summary(zone_id))
    }

    // =========================================================================
    // Reconfiguration
    // =========================================================================

    /// Compute what applying `proposed` would do. Changes nothing.
    #[instrument(skip(self, proposed), fields(zone = %zone_id))]
    pub async fn preview(
        &self,
        zone_id: &ZoneId,
        proposed: &ZoneStructure,
    ) -> Result<ReconfigurationPreview> {
        let zone = self.zone(zone_id)?;
        let state = zone.lock().await;

        let diff = self
            .engine(&state.codes)
            .diff(state.structure.as_ref(), proposed, &state.index)?;
        metrics::global().previews.inc();

        let preview = diff.preview(state.revision);
        debug!(
            revision = preview.revision,
            conflicts = preview.bins_with_items.len(),
            affected_items = preview.total_affected_items,
            "Computed preview"
        );
        Ok(preview)
    }

    /// Replace the zone's structure.
    ///
    /// The diff is recomputed under the zone lock, so the preview the
    /// operator saw is advisory; pass `expected_revision` to fail instead of
    /// applying against a zone that changed since.
    #[instrument(skip(self, request), fields(zone = %zone_id, action = ?request.action))]
    pub async fn apply(&self, zone_id: &ZoneId, request: ApplyRequest) -> Result<ApplyOutcome> {
        let zone = self.zone(zone_id)?;
        let mut state = zone.lock().await;
        let mut result = ApplyOutcome::new(zone_id, state.revision);

        let applied = self.do_apply(zone_id, &mut state, request, &mut result).await;
        drop(state);

        match applied {
            Ok(events) => {
                metrics::record_reconfiguration(if result.unchanged {
                    outcome::NOOP
                } else {
                    outcome::APPLIED
                });
                info!(
                    revision = result.revision,
                    created = result.bins_created,
                    deleted = result.bins_deleted,
                    address_updates = result.address_updates,
                    blocked = result.blocked.len(),
                    detached = result.detached.len(),
                    "Reconfiguration applied"
                );
                self.publish(events).await;
                Ok(result)
            }
            Err(e) => {
                result.fail(&e);
                let label = match &e {
                    Error::ConflictResolutionRequired { .. }
                    | Error::ConcurrentModification { .. }
                    | Error::Configuration { .. } => outcome::REJECTED,
                    _ => outcome::FAILED,
                };
                metrics::record_reconfiguration(label);
                warn!(error = %e, steps = ?result.states(), "Reconfiguration not applied");
                self.publish(vec![DomainEvent::reconfiguration_failed(
                    zone_id.as_str(),
                    e.to_string(),
                )])
                .await;
                Err(e)
            }
        }
    }

    async fn do_apply(
        &self,
        zone_id: &ZoneId,
        state: &mut ZoneState,
        request: ApplyRequest,
        result: &mut ApplyOutcome,
    ) -> Result<Vec<DomainEvent>> {
        // =====================================================================
        // Phase 1: Validate
        // =====================================================================
        result.transition(
            ReconfigurationState::Validating,
            format!("Checking request against revision {}", state.revision),
        );
        if let Some(expected) = request.expected_revision {
            if expected != state.revision {
                return Err(Error::ConcurrentModification {
                    zone: zone_id.to_string(),
                    expected,
                    actual: state.revision,
                });
            }
        }

        // =====================================================================
        // Phase 2: Diff
        // =====================================================================
        result.transition(ReconfigurationState::Diffing, "Classifying coordinates");
        let diff = self
            .engine(&state.codes)
            .diff(state.structure.as_ref(), &request.structure, &state.index)?;
        result.first_configuration = diff.is_first_configuration;
        result.bins_preserved = diff.preserved.len();
        result.bins_created = diff.created.len();
        result.bins_deleted = diff.deleted_empty.len() + diff.conflicts.len();
        result.address_updates = diff.address_updates();

        if state.structure.as_ref() == Some(&request.structure) {
            result.unchanged = true;
            result.bins = state.index.listing();
            result.stats = state.index.stats();
            result.transition(ReconfigurationState::Completed, "Structure unchanged");
            return Ok(Vec::new());
        }

        // =====================================================================
        // Phase 3: Resolve conflicts
        // =====================================================================
        result.transition(
            ReconfigurationState::Resolving,
            format!(
                "{} occupied bin(s) would be removed",
                diff.conflicts.len()
            ),
        );
        let plan = OccupiedBinPolicy::resolve(&diff.conflicts, request.action)?;

        // =====================================================================
        // Phase 4: Stage
        // =====================================================================
        result.transition(ReconfigurationState::Staging, "Building staged index");
        let staged = diff.stage(&state.index, &plan)?;

        let mut detached = state.detached.clone();
        detached.extend(staged.detached.iter().cloned());
        let next = ZoneState {
            codes: state.codes.clone(),
            structure: Some(request.structure),
            revision: state.revision + 1,
            index: staged.index,
            detached,
        };

        // =====================================================================
        // Phase 5: Persist and swap
        // =====================================================================
        result.transition(
            ReconfigurationState::Persisting,
            format!("Writing revision {}", next.revision),
        );
        self.repository.save_zone(&next.snapshot(zone_id)).await?;
        *state = next;

        result.revision = state.revision;
        result.bins = state.index.listing();
        result.stats = state.index.stats();
        result.blocked = staged.blocked;
        result.detached = staged.detached;
        result.transition(
            ReconfigurationState::Completed,
            format!("Revision {} is live", state.revision),
        );

        let metrics = metrics::global();
        metrics.bins_blocked.inc_by(result.blocked.len() as u64);
        metrics.items_detached.inc_by(result.detached.len() as u64);

        let mut events = vec![DomainEvent::ReconfigurationApplied {
            zone_id: zone_id.to_string(),
            revision: result.revision,
            first_configuration: result.first_configuration,
            preserved: result.bins_preserved,
            created: result.bins_created,
            deleted: result.bins_deleted,
            address_updates: result.address_updates,
            action: plan.action.map(|a| a.to_string()),
            timestamp: result.end_time,
        }];
        events.extend(
            result
                .blocked
                .iter()
                .map(|b| DomainEvent::bin_blocked(zone_id.as_str(), b.address.clone(), b.item_count)),
        );
        events.extend(
            result
                .detached
                .iter()
                .map(|d| DomainEvent::item_detached(zone_id.as_str(), d)),
        );
        Ok(events)
    }

    // =========================================================================
    // Occupancy
    // =========================================================================

    pub async fn occupancy(&self, zone_id: &ZoneId) -> Result<OccupancyReport> {
        let zone = self.zone(zone_id)?;
        let state = zone.lock().await;
        Ok(OccupancyReport {
            zone_id: zone_id.clone(),
            revision: state.revision,
            bins: state.index.listing(),
            stats: state.index.stats(),
        })
    }

    /// Find the bin an address refers to.
    pub async fn lookup(&self, zone_id: &ZoneId, address: &str) -> Result<BinView> {
        let zone = self.zone(zone_id)?;
        let state = zone.lock().await;
        state.resolve(zone_id, address)
    }

    /// Items stored at an address.
    pub async fn items_at(&self, zone_id: &ZoneId, address: &str) -> Result<Vec<ItemId>> {
        let zone = self.zone(zone_id)?;
        let state = zone.lock().await;
        let view = state.resolve(zone_id, address)?;
        Ok(state.index.items_in(&view.coordinate))
    }

    /// The bin currently holding `item`, if any.
    pub async fn locate(&self, zone_id: &ZoneId, item: &ItemId) -> Result<Option<BinView>> {
        let zone = self.zone(zone_id)?;
        let state = zone.lock().await;
        Ok(state
            .index
            .locate(item)
            .and_then(|coordinate| state.index.view(&coordinate)))
    }

    /// Move an item between addresses.
    ///
    /// `from = None` receives the item into the zone, `to = None` issues it.
    #[instrument(skip(self, zone_id, item), fields(zone = %zone_id, item = %item))]
    pub async fn transfer(
        &self,
        zone_id: &ZoneId,
        item: &ItemId,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<TransferReceipt> {
        let zone = self.zone(zone_id)?;
        let mut state = zone.lock().await;
        let transferred = self.do_transfer(zone_id, &mut state, item, from, to).await;
        drop(state);

        match transferred {
            Ok(receipt) => {
                metrics::record_transfer(outcome::APPLIED);
                self.publish(vec![DomainEvent::item_transferred(zone_id.as_str(), &receipt)])
                    .await;
                Ok(receipt)
            }
            Err(e) => {
                let label = if e.is_retryable() {
                    outcome::FAILED
                } else {
                    outcome::REJECTED
                };
                metrics::record_transfer(label);
                debug!(error = %e, "Transfer not applied");
                Err(e)
            }
        }
    }

    async fn do_transfer(
        &self,
        zone_id: &ZoneId,
        state: &mut ZoneState,
        item: &ItemId,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<TransferReceipt> {
        let from = from
            .map(|address| state.resolve(zone_id, address))
            .transpose()?
            .map(|view| view.coordinate);
        let to = to
            .map(|address| state.resolve(zone_id, address))
            .transpose()?
            .map(|view| view.coordinate);

        let mut index = state.index.clone();
        let receipt = index.transfer(item, from, to)?;
        if from == to {
            return Ok(receipt);
        }

        let mut snapshot = state.snapshot(zone_id);
        snapshot.bins = index.entries();
        self.repository.save_zone(&snapshot).await?;
        state.index = index;
        Ok(receipt)
    }

    /// Items whose bins were force-removed, oldest first.
    pub async fn detached_items(&self, zone_id: &ZoneId) -> Result<Vec<DetachedItem>> {
        let zone = self.zone(zone_id)?;
        let state = zone.lock().await;
        Ok(state.detached.clone())
    }

    // =========================================================================
    // Layout
    // =========================================================================

    pub fn aisle_positions(&self, zone_id: &ZoneId) -> Result<Vec<AislePosition>> {
        Ok(self.layout(zone_id)?.store.read().positions())
    }

    #[instrument(skip(self, zone_id), fields(zone = %zone_id))]
    pub async fn set_aisle_position(
        &self,
        zone_id: &ZoneId,
        aisle: u32,
        x: f64,
        y: f64,
        rotation: f64,
    ) -> Result<AislePosition> {
        let layout = self.layout(zone_id)?;
        let position = layout.store.write().set_position(aisle, x, y, rotation)?;
        self.layout_committed(
            zone_id,
            &layout,
            DomainEvent::aisle_position_committed(zone_id.as_str(), &position),
        )
        .await;
        Ok(position)
    }

    pub async fn rotate_aisle(&self, zone_id: &ZoneId, aisle: u32, rotation: f64) -> Result<AislePosition> {
        let layout = self.layout(zone_id)?;
        let position = layout.store.write().rotate(aisle, rotation)?;
        self.layout_committed(
            zone_id,
            &layout,
            DomainEvent::aisle_position_committed(zone_id.as_str(), &position),
        )
        .await;
        Ok(position)
    }

    /// Drawn rectangle of an aisle, rotated about the configured pivot.
    pub fn aisle_outline(&self, zone_id: &ZoneId, aisle: u32, footprint: Footprint) -> Result<[Point; 4]> {
        footprint.validate()?;
        let position = self
            .layout(zone_id)?
            .store
            .read()
            .position(aisle)
            .ok_or_else(|| Error::NotFound(format!("position of aisle {}", aisle)))?;
        Ok(position.corners(footprint, self.config.pivot))
    }

    pub fn begin_move(&self, zone_id: &ZoneId, target: MoveTarget) -> Result<Point> {
        self.layout(zone_id)?.store.write().begin_move(target)
    }

    /// Local preview only; nothing is persisted until `commit_move`.
    pub fn apply_delta(&self, zone_id: &ZoneId, target: MoveTarget, dx: f64, dy: f64) -> Result<Point> {
        self.layout(zone_id)?.store.write().apply_delta(target, dx, dy)
    }

    pub fn cancel_move(&self, zone_id: &ZoneId, target: MoveTarget) -> Result<bool> {
        Ok(self.layout(zone_id)?.store.write().cancel_move(target))
    }

    #[instrument(skip(self, zone_id), fields(zone = %zone_id, target = %target))]
    pub async fn commit_move(&self, zone_id: &ZoneId, target: MoveTarget) -> Result<Committed> {
        let layout = self.layout(zone_id)?;
        let committed = layout.store.write().commit_move(target)?;
        let event = match &committed {
            Committed::Aisle(position) => {
                DomainEvent::aisle_position_committed(zone_id.as_str(), position)
            }
            Committed::Annotation(annotation) => {
                DomainEvent::annotation_moved(zone_id.as_str(), annotation)
            }
        };
        self.layout_committed(zone_id, &layout, event).await;
        Ok(committed)
    }

    pub fn annotations(&self, zone_id: &ZoneId) -> Result<Vec<LayoutAnnotation>> {
        Ok(self.layout(zone_id)?.store.read().annotations().to_vec())
    }

    pub async fn add_annotation(&self, zone_id: &ZoneId, spec: AnnotationSpec) -> Result<LayoutAnnotation> {
        let layout = self.layout(zone_id)?;
        let annotation = layout.store.write().add_annotation(spec)?;
        self.layout_committed(
            zone_id,
            &layout,
            DomainEvent::annotation_added(zone_id.as_str(), &annotation),
        )
        .await;
        Ok(annotation)
    }

    pub async fn move_annotation(
        &self,
        zone_id: &ZoneId,
        id: &Uuid,
        dx: f64,
        dy: f64,
    ) -> Result<LayoutAnnotation> {
        let layout = self.layout(zone_id)?;
        let annotation = layout.store.write().move_annotation(id, dx, dy)?;
        self.layout_committed(
            zone_id,
            &layout,
            DomainEvent::annotation_moved(zone_id.as_str(), &annotation),
        )
        .await;
        Ok(annotation)
    }

    pub async fn remove_annotation(&self, zone_id: &ZoneId, id: &Uuid) -> Result<LayoutAnnotation> {
        let layout = self.layout(zone_id)?;
        let annotation = layout.store.write().remove_annotation(id)?;
        self.layout_committed(
            zone_id,
            &layout,
            DomainEvent::annotation_removed(zone_id.as_str(), annotation.id),
        )
        .await;
        Ok(annotation)
    }

    /// Each stored position flagged against the zone's current aisles.
    pub async fn layout_status(&self, zone_id: &ZoneId) -> Result<Vec<PositionReport>> {
        let aisles = {
            let zone = self.zone(zone_id)?;
            let state = zone.lock().await;
            state
                .structure
                .as_ref()
                .map(|s| s.aisle_numbers())
                .unwrap_or_default()
        };
        Ok(self.layout(zone_id)?.store.read().classify_positions(&aisles))
    }

    /// Persist the layout after a commit. Failures are logged, not returned.
    async fn layout_committed(&self, zone_id: &ZoneId, layout: &LayoutHandle, event: DomainEvent) {
        metrics::global().layout_commits.inc();

        if self.config.persist_layout {
            let _guard = layout.persist.lock().await;
            let snapshot = layout.store.read().snapshot();
            if let Err(e) = self.repository.save_layout(zone_id, &snapshot).await {
                warn!(zone = %zone_id, error = %e, "Failed to persist layout; change kept in memory");
            }
        }

        self.publish(vec![event]).await;
    }
}
