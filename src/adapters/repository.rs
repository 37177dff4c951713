//! Zone Repository Adapters
//!
//! Implements the `ZoneRepository` port with an in-memory map and a
//! directory of JSON files.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::ports::{ZoneId, ZoneRepository, ZoneSnapshot};
use crate::error::{Error, Result};
use crate::layout::LayoutSnapshot;

// =============================================================================
// In-Memory Repository
// =============================================================================

/// Repository kept entirely in memory.
///
/// Writes can be made to fail on demand to exercise error paths.
#[derive(Debug, Default)]
pub struct InMemoryZoneRepository {
    zones: DashMap<ZoneId, ZoneSnapshot>,
    layouts: DashMap<ZoneId, LayoutSnapshot>,
    fail_writes: AtomicBool,
}

impl InMemoryZoneRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent save fail with a storage error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Stored snapshot, bypassing the async port.
    pub fn zone(&self, zone_id: &ZoneId) -> Option<ZoneSnapshot> {
        self.zones.get(zone_id).map(|z| z.clone())
    }

    pub fn layout(&self, zone_id: &ZoneId) -> Option<LayoutSnapshot> {
        self.layouts.get(zone_id).map(|l| l.clone())
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Storage("repository is rejecting writes".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ZoneRepository for InMemoryZoneRepository {
    async fn save_zone(&self, snapshot: &ZoneSnapshot) -> Result<()> {
        self.check_writable()?;
        self.zones.insert(snapshot.zone_id.clone(), snapshot.clone());
        Ok(())
    }

    async fn load_zone(&self, zone_id: &ZoneId) -> Result<Option<ZoneSnapshot>> {
        Ok(self.zone(zone_id))
    }

    async fn save_layout(&self, zone_id: &ZoneId, layout: &LayoutSnapshot) -> Result<()> {
        self.check_writable()?;
        self.layouts.insert(zone_id.clone(), layout.clone());
        Ok(())
    }

    async fn load_layout(&self, zone_id: &ZoneId) -> Result<Option<LayoutSnapshot>> {
        Ok(self.layout(zone_id))
    }
}

// =============================================================================
// File Repository
// =============================================================================

/// Repository storing one JSON document per zone and per layout.
///
/// ```text
/// <root>/
///   <zone>.zone.json
///   <zone>.layout.json
/// ```
///
/// Files are replaced through a temp file and a rename, so a crash mid-write
/// leaves the previous document intact.
#[derive(Debug, Clone)]
pub struct FileZoneRepository {
    root: PathBuf,
}

impl FileZoneRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, zone_id: &ZoneId, kind: &str) -> Result<PathBuf> {
        let id = zone_id.as_str();
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(Error::config(
                "zoneId",
                format!("'{}' may only contain letters, digits, '-' and '_'", id),
            ));
        }
        Ok(self.root.join(format!("{}.{}.json", id, kind)))
    }

    async fn write_json<T: Serialize + Sync>(&self, path: &Path, value: &T) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let content = serde_json::to_vec_pretty(value)?;

        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, content).await.map_err(|e| {
            Error::Storage(format!("failed to write {}: {}", temp_path.display(), e))
        })?;
        tokio::fs::rename(&temp_path, path).await.map_err(|e| {
            Error::Storage(format!("failed to replace {}: {}", path.display(), e))
        })?;

        debug!(path = %path.display(), "Wrote document");
        Ok(())
    }

    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read document");
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl ZoneRepository for FileZoneRepository {
    async fn save_zone(&self, snapshot: &ZoneSnapshot) -> Result<()> {
        let path = self.path_for(&snapshot.zone_id, "zone")?;
        self.write_json(&path, snapshot).await
    }

    async fn load_zone(&self, zone_id: &ZoneId) -> Result<Option<ZoneSnapshot>> {
        let path = self.path_for(zone_id, "zone")?;
        self.read_json(&path).await
    }

    async fn save_layout(&self, zone_id: &ZoneId, layout: &LayoutSnapshot) -> Result<()> {
        let path = self.path_for(zone_id, "layout")?;
        self.write_json(&path, layout).await
    }

    async fn load_layout(&self, zone_id: &ZoneId) -> Result<Option<LayoutSnapshot>> {
        let path = self.path_for(zone_id, "layout")?;
        self.read_json(&path).await
    }
}
