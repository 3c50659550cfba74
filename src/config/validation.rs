//! Configuration validation.
//!
//! Serde handles syntax; this module checks values. All errors are collected
//! rather than stopping at the first one.

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;
use crate::config::schema::GatewayConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("upstream.base_url '{0}' must be an absolute http(s) URL")]
    UpstreamUrl(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("security.cors.allowed_origins entry '{0}' is not a valid origin")]
    Origin(String),

    #[error("observability.log_format '{0}' must be 'pretty' or 'json'")]
    LogFormat(String),
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    match Url::parse(&config.upstream.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
        _ => errors.push(ValidationError::UpstreamUrl(config.upstream.base_url.clone())),
    }

    let upstream = &config.upstream;
    let positive = [
        ("upstream.fertility_timeout_ms", upstream.fertility_timeout_ms),
        ("upstream.irrigation_timeout_ms", upstream.irrigation_timeout_ms),
        ("upstream.soil_image_timeout_ms", upstream.soil_image_timeout_ms),
        ("upstream.health_timeout_ms", upstream.health_timeout_ms),
        ("upstream.max_payload_bytes", upstream.max_payload_bytes as u64),
    ];
    for (name, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero(name));
        }
    }

    if config.health_check.enabled && config.health_check.interval_secs == 0 {
        errors.push(ValidationError::Zero("health_check.interval_secs"));
    }

    if config.retries.enabled && config.retries.max_attempts == 0 {
        errors.push(ValidationError::Zero("retries.max_attempts"));
    }

    for origin in &config.security.cors.allowed_origins {
        if !is_origin(origin) {
            errors.push(ValidationError::Origin(origin.clone()));
        }
    }

    let format = config.observability.log_format.as_str();
    if format != "pretty" && format != "json" {
        errors.push(ValidationError::LogFormat(format.to_string()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// An origin is scheme + host (+ port), with no path.
fn is_origin(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => url.has_host() && url.path() == "/" && !value.ends_with('/'),
        Err(_) => false,
    }
}
