//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Prediction service location, budgets and payload limits.
    pub upstream: UpstreamConfig,

    /// Liveness prober settings.
    pub health_check: HealthCheckConfig,

    /// Retry configuration for connect-phase failures.
    pub retries: RetryConfig,

    /// Multipart upload staging.
    pub uploads: UploadConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Cross-origin policy.
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
        }
    }
}

impl ListenerConfig {
    /// Replace the port of the bind address, keeping the host part.
    pub fn set_port(&mut self, port: u16) {
        let host = self
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        self.bind_address = format!("{}:{}", host, port);
    }
}

/// Upstream prediction service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the prediction service.
    pub base_url: String,

    /// Budget for `/predict/fertility` in milliseconds.
    pub fertility_timeout_ms: u64,

    /// Budget for `/predict/irrigation` in milliseconds.
    /// Larger than fertility: the irrigation model is slower to warm up.
    pub irrigation_timeout_ms: u64,

    /// Budget for `/predict/soil-image` in milliseconds.
    pub soil_image_timeout_ms: u64,

    /// Budget for `/health` in milliseconds.
    pub health_timeout_ms: u64,

    /// Maximum inbound request body size in bytes.
    pub max_payload_bytes: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            fertility_timeout_ms: 30_000,
            irrigation_timeout_ms: 45_000,
            soil_image_timeout_ms: 60_000,
            health_timeout_ms: 5_000,
            max_payload_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Liveness prober configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable the background prober.
    pub enabled: bool,

    /// Delay before the first probe, in seconds.
    pub initial_delay_secs: u64,

    /// Probe interval in seconds. Each probe uses
    /// `upstream.health_timeout_ms`, shared with `GET /api/health`.
    pub interval_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay_secs: 5,
            interval_secs: 300,
        }
    }
}

impl HealthCheckConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries of connect-phase failures.
    pub enabled: bool,

    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 2,
            base_delay_ms: 200,
            max_delay_ms: 2000,
        }
    }
}

/// Upload staging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Directory for staged uploads. Empty means the OS temp dir.
    pub dir: String,

    /// Multipart field carrying the image.
    pub field_name: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: String::new(),
            field_name: "image".to_string(),
        }
    }
}

impl UploadConfig {
    pub fn staging_dir(&self) -> std::path::PathBuf {
        if self.dir.is_empty() {
            std::env::temp_dir()
        } else {
            std::path::PathBuf::from(&self.dir)
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "farm_gateway=debug,tower_http=debug".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SecurityConfig {
    pub cors: CorsConfig,
}

/// Cross-origin resource sharing policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed to call the gateway from a browser.
    pub allowed_origins: Vec<String>,

    /// Accept every origin. Off by default; enabling it is a policy decision.
    pub allow_any_origin: bool,

    /// Preflight cache lifetime in seconds.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "https://smart-farming-app-2.onrender.com".to_string(),
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
            allow_any_origin: false,
            max_age_secs: 3600,
        }
    }
}
