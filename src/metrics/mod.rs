//! Metrics module
//!
//! Prometheus counters for reconfigurations, policy outcomes and transfers,
//! kept in a crate-local registry so embedding applications can expose them
//! next to their own.

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::error::Result;

/// Outcome label values.
pub mod outcome {
    pub const APPLIED: &str = "applied";
    pub const NOOP: &str = "noop";
    pub const REJECTED: &str = "rejected";
    pub const FAILED: &str = "failed";
}

/// Engine metrics.
pub struct EngineMetrics {
    registry: Registry,
    /// Reconfigurations by outcome
    pub reconfigurations: IntCounterVec,
    pub previews: IntCounter,
    pub bins_blocked: IntCounter,
    pub items_detached: IntCounter,
    /// Transfers by outcome
    pub transfers: IntCounterVec,
    pub layout_commits: IntCounter,
}

impl EngineMetrics {
    fn new() -> Result<Self> {
        let registry = Registry::new_custom(Some("binspace".to_string()), None)?;

        let reconfigurations = IntCounterVec::new(
            Opts::new("reconfigurations_total", "Structure reconfigurations by outcome"),
            &["outcome"],
        )?;
        let previews = IntCounter::new("previews_total", "Reconfiguration previews computed")?;
        let bins_blocked = IntCounter::new(
            "bins_blocked_total",
            "Removed bins kept as BLOCKED because they held items",
        )?;
        let items_detached = IntCounter::new(
            "items_detached_total",
            "Items detached from force-removed bins",
        )?;
        let transfers = IntCounterVec::new(
            Opts::new("transfers_total", "Item transfers by outcome"),
            &["outcome"],
        )?;
        let layout_commits = IntCounter::new("layout_commits_total", "Committed layout changes")?;

        registry.register(Box::new(reconfigurations.clone()))?;
        registry.register(Box::new(previews.clone()))?;
        registry.register(Box::new(bins_blocked.clone()))?;
        registry.register(Box::new(items_detached.clone()))?;
        registry.register(Box::new(transfers.clone()))?;
        registry.register(Box::new(layout_commits.clone()))?;

        Ok(Self {
            registry,
            reconfigurations,
            previews,
            bins_blocked,
            items_detached,
            transfers,
            layout_commits,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

static METRICS: Lazy<EngineMetrics> =
    Lazy::new(|| EngineMetrics::new().expect("static metric definitions are valid"));

/// The process-wide metrics.
pub fn global() -> &'static EngineMetrics {
    &METRICS
}

pub fn record_reconfiguration(outcome: &str) {
    METRICS.reconfigurations.with_label_values(&[outcome]).inc();
}

pub fn record_transfer(outcome: &str) {
    METRICS.transfers.with_label_values(&[outcome]).inc();
}

/// Render all engine metrics in the Prometheus text format.
pub fn gather_text() -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&METRICS.registry.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
