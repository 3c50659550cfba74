//! Failure taxonomy for upstream calls.
//!
//! Every outcome of a forwarded request that is not a 2xx response is
//! mapped to exactly one [`ProxyErrorKind`], which fixes the status code the
//! caller sees:
//!
//! | Kind            | Status                  |
//! |-----------------|-------------------------|
//! | `MissingInput`  | 400                     |
//! | `Unreachable`   | 503                     |
//! | `Timeout`       | 504                     |
//! | `UpstreamError` | upstream's own status   |
//! | `Unknown`       | 500                     |
//!
//! `Unreachable` means the service is down and will not come back on its
//! own soon. `Timeout` usually means the service is cold-starting, so its
//! detail carries a hint to retry shortly.

use axum::body::Bytes;
use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;

use crate::upstream::UpstreamRoute;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProxyErrorKind {
    MissingInput,
    Unreachable,
    Timeout,
    UpstreamError,
    Unknown,
}

impl ProxyErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyErrorKind::MissingInput => "missing_input",
            ProxyErrorKind::Unreachable => "unreachable",
            ProxyErrorKind::Timeout => "timeout",
            ProxyErrorKind::UpstreamError => "upstream_error",
            ProxyErrorKind::Unknown => "unknown",
        }
    }
}

/// A classified failure, ready to be rendered to the caller.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ProxyError {
    pub kind: ProxyErrorKind,
    pub status: StatusCode,
    pub message: String,
    pub detail: Option<Value>,
    /// Raw upstream body, kept only for `UpstreamError` so it can be relayed
    /// byte for byte.
    pub upstream_body: Option<Bytes>,
}

impl ProxyError {
    fn new(kind: ProxyErrorKind, status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
            detail: None,
            upstream_body: None,
        }
    }

    fn with_detail(mut self, detail: impl Into<Value>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn missing_input(message: impl Into<String>) -> Self {
        Self::new(ProxyErrorKind::MissingInput, StatusCode::BAD_REQUEST, message)
    }

    pub fn unreachable(route: UpstreamRoute) -> Self {
        Self::new(
            ProxyErrorKind::Unreachable,
            StatusCode::SERVICE_UNAVAILABLE,
            "Cannot connect to ML service",
        )
        .with_detail(format!("Prediction service is not responding at {}", route.path()))
    }

    pub fn timeout(route: UpstreamRoute, budget: Duration) -> Self {
        Self::new(
            ProxyErrorKind::Timeout,
            StatusCode::GATEWAY_TIMEOUT,
            "Prediction service timed out",
        )
        .with_detail(format!(
            "No response from {} within {} ms. The service may be starting up; retry in a few seconds.",
            route.path(),
            budget.as_millis()
        ))
    }

    /// The upstream answered with a non-success status.
    pub fn upstream(route: UpstreamRoute, status: StatusCode, body: Bytes) -> Self {
        let detail = match serde_json::from_slice::<Value>(&body) {
            Ok(value) => value,
            Err(_) => Value::String(String::from_utf8_lossy(&body).into_owned()),
        };
        let mut err = Self::new(ProxyErrorKind::UpstreamError, status, route.failure_message())
            .with_detail(detail);
        err.upstream_body = Some(body);
        err
    }

    pub fn unknown(route: UpstreamRoute, detail: impl Into<String>) -> Self {
        Self::new(
            ProxyErrorKind::Unknown,
            StatusCode::INTERNAL_SERVER_ERROR,
            route.failure_message(),
        )
        .with_detail(detail.into())
    }

    /// Whether the upstream never saw the request.
    pub fn is_connect_failure(&self) -> bool {
        self.kind == ProxyErrorKind::Unreachable
    }
}

/// Classify a transport error raised by the HTTP client.
pub fn classify_transport(route: UpstreamRoute, budget: Duration, err: &reqwest::Error) -> ProxyError {
    if err.is_timeout() {
        return ProxyError::timeout(route, budget);
    }

    if err.is_connect() || is_connection_refused(err) {
        return ProxyError::unreachable(route);
    }

    ProxyError::unknown(route, err.to_string())
}

/// Walk the source chain looking for a refused connection.
pub fn is_connection_refused(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        current = e.source();
    }
    false
}
