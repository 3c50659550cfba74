//! Last known upstream health.
//!
//! # Design Decisions
//! - Single writer (the liveness prober), many readers (request handlers)
//! - Readers get an immutable snapshot; writers publish a whole new one
//! - No locks: the snapshot pointer is swapped atomically

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Snapshot of gateway and upstream health.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStatus {
    /// Always true while the gateway is serving.
    pub backend_healthy: bool,
    pub upstream_healthy: bool,
    /// `None` until the first probe completes.
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            backend_healthy: true,
            upstream_healthy: false,
            last_checked_at: None,
            last_error: None,
        }
    }
}

/// Shared holder of the current [`HealthStatus`].
#[derive(Debug, Default)]
pub struct HealthState {
    current: ArcSwap<HealthStatus>,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<HealthStatus> {
        self.current.load_full()
    }

    pub fn record_success(&self) {
        self.publish(HealthStatus {
            backend_healthy: true,
            upstream_healthy: true,
            last_checked_at: Some(Utc::now()),
            last_error: None,
        });
    }

    pub fn record_failure(&self, error: impl Into<String>) {
        self.publish(HealthStatus {
            backend_healthy: true,
            upstream_healthy: false,
            last_checked_at: Some(Utc::now()),
            last_error: Some(error.into()),
        });
    }

    fn publish(&self, status: HealthStatus) {
        let healthy = status.upstream_healthy;
        let previous = self.current.swap(Arc::new(status));
        if previous.last_checked_at.is_some() && previous.upstream_healthy != healthy {
            tracing::info!(upstream_healthy = healthy, "Upstream health changed");
        }
    }
}
