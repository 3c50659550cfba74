//! Background liveness prober.
//!
//! # Responsibilities
//! - Probe the upstream health endpoint shortly after start
//! - Re-probe on a fixed interval, keeping a cold-starting service warm
//! - Publish each outcome into [`HealthState`]
//!
//! Failures are logged and recorded, never propagated.

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::config::HealthCheckConfig;
use crate::health::state::HealthState;
use crate::observability::metrics;
use crate::upstream::UpstreamClient;

pub struct LivenessProber {
    upstream: Arc<UpstreamClient>,
    state: Arc<HealthState>,
    config: HealthCheckConfig,
}

impl LivenessProber {
    pub fn new(upstream: Arc<UpstreamClient>, state: Arc<HealthState>, config: HealthCheckConfig) -> Self {
        Self {
            upstream,
            state,
            config,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Liveness prober disabled");
            return;
        }

        tracing::info!(
            initial_delay_secs = self.config.initial_delay_secs,
            interval_secs = self.config.interval_secs,
            upstream = %self.upstream.base_url(),
            "Liveness prober starting"
        );

        let start = Instant::now() + self.config.initial_delay();
        let mut ticker = time::interval_at(start, self.config.interval());
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.probe_once().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Liveness prober received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe once and record the outcome. Returns whether the upstream
    /// answered healthily.
    pub async fn probe_once(&self) -> bool {
        let healthy = match self.upstream.probe().await {
            Ok(response) => {
                tracing::debug!(elapsed = ?response.elapsed, "Upstream health probe succeeded");
                self.state.record_success();
                true
            }
            Err(err) => {
                tracing::warn!(
                    kind = err.kind.as_str(),
                    status = %err.status,
                    "Upstream health probe failed"
                );
                let reason = match &err.detail {
                    Some(serde_json::Value::String(detail)) => format!("{}: {}", err.message, detail),
                    _ => err.message.clone(),
                };
                self.state.record_failure(reason);
                false
            }
        };

        metrics::record_upstream_health(healthy);
        healthy
    }
}
