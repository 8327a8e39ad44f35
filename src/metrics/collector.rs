//! Metrics collection and registry.

use crate::session::{PersistentCaptureSession, SessionStats};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of session state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Whether the repeating request is currently running.
    pub is_running: bool,
    /// Whether the platform destroyed the session.
    pub is_destroyed: bool,
    /// Counters accumulated by the session.
    pub stats: SessionStats,
}

impl MetricsSnapshot {
    /// Creates a snapshot from the current state of a session.
    pub fn from_session(session: &PersistentCaptureSession) -> Self {
        Self {
            is_running: session.is_running(),
            is_destroyed: session.is_destroyed(),
            stats: session.stats(),
        }
    }
}

/// Advances `counter` to `total` without ever going backwards.
fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}

/// Prometheus metrics registry for capture session monitoring.
pub struct MetricsRegistry {
    registry: Registry,

    // State metrics
    running: IntGauge,
    destroyed: IntGauge,

    // Lifecycle metrics
    reconcile_passes: IntCounter,
    skipped_passes: IntCounter,
    devices_opened: IntCounter,
    sessions_created: IntCounter,
    external_destructions: IntCounter,
    swallowed_failures: IntCounter,

    // Capture metrics
    photos_captured: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all session metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let running = IntGauge::new(
            "camera_session_running",
            "Whether the repeating request is running (1=running, 0=stopped)",
        )?;
        let destroyed = IntGauge::new(
            "camera_session_destroyed",
            "Whether the platform destroyed the session (1=destroyed, 0=intact)",
        )?;

        let reconcile_passes = IntCounter::new(
            "camera_session_reconcile_passes_total",
            "Total configuration passes started",
        )?;
        let skipped_passes = IntCounter::new(
            "camera_session_skipped_passes_total",
            "Configuration passes skipped after platform destruction",
        )?;
        let devices_opened = IntCounter::new(
            "camera_session_devices_opened_total",
            "Total camera devices opened",
        )?;
        let sessions_created = IntCounter::new(
            "camera_session_sessions_created_total",
            "Total capture sessions created",
        )?;
        let external_destructions = IntCounter::new(
            "camera_session_external_destructions_total",
            "Device or session closures initiated by the platform",
        )?;
        let swallowed_failures = IntCounter::new(
            "camera_session_swallowed_failures_total",
            "Platform failures ignored because the session was already destroyed",
        )?;

        let photos_captured = IntCounter::new(
            "camera_session_photos_captured_total",
            "Total still captures completed",
        )?;

        registry.register(Box::new(running.clone()))?;
        registry.register(Box::new(destroyed.clone()))?;
        registry.register(Box::new(reconcile_passes.clone()))?;
        registry.register(Box::new(skipped_passes.clone()))?;
        registry.register(Box::new(devices_opened.clone()))?;
        registry.register(Box::new(sessions_created.clone()))?;
        registry.register(Box::new(external_destructions.clone()))?;
        registry.register(Box::new(swallowed_failures.clone()))?;
        registry.register(Box::new(photos_captured.clone()))?;

        Ok(Self {
            registry,
            running,
            destroyed,
            reconcile_passes,
            skipped_passes,
            devices_opened,
            sessions_created,
            external_destructions,
            swallowed_failures,
            photos_captured,
        })
    }

    /// Updates all metrics from a snapshot of session state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.running.set(i64::from(snapshot.is_running));
        self.destroyed.set(i64::from(snapshot.is_destroyed));

        // Counters only move forward, so advance them by the difference
        let stats = &snapshot.stats;
        advance(&self.reconcile_passes, stats.reconcile_passes);
        advance(&self.skipped_passes, stats.skipped_passes);
        advance(&self.devices_opened, stats.devices_opened);
        advance(&self.sessions_created, stats.sessions_created);
        advance(&self.external_destructions, stats.external_destructions);
        advance(&self.swallowed_failures, stats.swallowed_failures);
        advance(&self.photos_captured, stats.photos_captured);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
