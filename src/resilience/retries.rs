//! Retry policy for forwarded requests.
//!
//! Only connect-phase failures are retried: the upstream never received
//! the request, so a second attempt cannot duplicate a prediction. Timeouts
//! and upstream error statuses are returned to the caller as-is.

use std::time::Duration;

use crate::config::RetryConfig;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::classify::ProxyError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: if config.enabled { config.max_attempts.max(1) } else { 1 },
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the next attempt, or `None` when `err` after `attempt`
    /// attempts is final.
    pub fn next_delay(&self, err: &ProxyError, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts || !err.is_connect_failure() {
            return None;
        }
        Some(calculate_backoff(attempt, self.base_delay, self.max_delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::UpstreamRoute;
    use axum::body::Bytes;
    use axum::http::StatusCode;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::from_config(&RetryConfig {
            enabled: true,
            max_attempts,
            base_delay_ms: 50,
            max_delay_ms: 500,
        })
    }

    #[test]
    fn test_retries_connect_failures_until_budget() {
        let err = ProxyError::unreachable(UpstreamRoute::Fertility);
        let policy = policy(3);
        assert!(policy.next_delay(&err, 1).is_some());
        assert!(policy.next_delay(&err, 2).is_some());
        assert!(policy.next_delay(&err, 3).is_none());
    }

    #[test]
    fn test_never_retries_delivered_requests() {
        let policy = policy(5);
        let timeout = ProxyError::timeout(UpstreamRoute::Fertility, Duration::from_secs(1));
        let upstream = ProxyError::upstream(
            UpstreamRoute::Fertility,
            StatusCode::SERVICE_UNAVAILABLE,
            Bytes::from_static(b"{}"),
        );
        assert!(policy.next_delay(&timeout, 1).is_none());
        assert!(policy.next_delay(&upstream, 1).is_none());
    }

    #[test]
    fn test_disabled_means_single_attempt() {
        let policy = RetryPolicy::from_config(&RetryConfig {
            enabled: false,
            ..RetryConfig::default()
        });
        assert_eq!(policy.max_attempts(), 1);
        assert!(policy
            .next_delay(&ProxyError::unreachable(UpstreamRoute::Irrigation), 1)
            .is_none());
    }
}
