//! Logical upstream routes and their budgets.

use std::fmt;
use std::time::Duration;

use crate::config::UpstreamConfig;

/// An endpoint of the prediction service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpstreamRoute {
    Fertility,
    Irrigation,
    SoilImage,
    Health,
}

impl UpstreamRoute {
    /// Path on the prediction service.
    pub fn path(&self) -> &'static str {
        match self {
            UpstreamRoute::Fertility => "/predict/fertility",
            UpstreamRoute::Irrigation => "/predict/irrigation",
            UpstreamRoute::SoilImage => "/predict/soil-image",
            UpstreamRoute::Health => "/health",
        }
    }

    /// Label used in logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            UpstreamRoute::Fertility => "fertility",
            UpstreamRoute::Irrigation => "irrigation",
            UpstreamRoute::SoilImage => "soil-image",
            UpstreamRoute::Health => "health",
        }
    }

    /// Caller-facing message for failures that are not connectivity related.
    pub fn failure_message(&self) -> &'static str {
        match self {
            UpstreamRoute::Fertility => "Failed to get fertility prediction",
            UpstreamRoute::Irrigation => "Failed to get irrigation prediction",
            UpstreamRoute::SoilImage => "Failed to analyze soil image",
            UpstreamRoute::Health => "Health check failed",
        }
    }

    pub fn budget(&self, config: &UpstreamConfig) -> Duration {
        let ms = match self {
            UpstreamRoute::Fertility => config.fertility_timeout_ms,
            UpstreamRoute::Irrigation => config.irrigation_timeout_ms,
            UpstreamRoute::SoilImage => config.soil_image_timeout_ms,
            UpstreamRoute::Health => config.health_timeout_ms,
        };
        Duration::from_millis(ms)
    }
}

impl fmt::Display for UpstreamRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
