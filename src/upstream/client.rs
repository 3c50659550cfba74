//! HTTP client for the prediction service.
//!
//! # Responsibilities
//! - Build the outbound request for a route and payload
//! - Enforce the route's deadline over the whole exchange
//! - Retry connect-phase failures within that deadline
//! - Return the upstream body untouched, or a classified error
//!
//! The deadline wraps the full exchange, retries included. When it fires
//! the in-flight future is dropped, which aborts the outbound request.

use axum::body::Bytes;
use axum::http::{header::CONTENT_TYPE, HeaderValue, StatusCode};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::{sleep, timeout};
use url::Url;

use crate::config::{RetryConfig, UpstreamConfig};
use crate::http::request::X_REQUEST_ID;
use crate::resilience::{classify_transport, ProxyError, RetryPolicy};
use crate::upstream::payload::ProxyPayload;
use crate::upstream::route::UpstreamRoute;

/// Result of one forwarded call.
pub type ProxyResult = Result<UpstreamResponse, ProxyError>;

/// A successful (2xx) upstream answer.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
    pub elapsed: Duration,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid upstream URL '{url}': {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Client for the prediction service. Cheap to share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
    config: UpstreamConfig,
    retry: RetryPolicy,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig, retries: &RetryConfig) -> Result<Self, ClientError> {
        Url::parse(&config.base_url).map_err(|source| ClientError::Url {
            url: config.base_url.clone(),
            source,
        })?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("farm-gateway/", env!("CARGO_PKG_VERSION")))
            .pool_idle_timeout(Duration::from_secs(90))
            .no_proxy()
            .build()?;

        Ok(Self::with_http(http, config, RetryPolicy::from_config(retries)))
    }

    /// Use a pre-built HTTP client.
    pub fn with_http(http: reqwest::Client, config: &UpstreamConfig, retry: RetryPolicy) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config: config.clone(),
            retry,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, route: UpstreamRoute) -> String {
        format!("{}{}", self.base_url, route.path())
    }

    /// Forward `payload` to `route` under the route's configured budget.
    pub async fn forward(
        &self,
        route: UpstreamRoute,
        payload: &ProxyPayload,
        request_id: Option<&str>,
    ) -> ProxyResult {
        self.forward_with_budget(route, payload, request_id, route.budget(&self.config))
            .await
    }

    pub async fn forward_with_budget(
        &self,
        route: UpstreamRoute,
        payload: &ProxyPayload,
        request_id: Option<&str>,
        budget: Duration,
    ) -> ProxyResult {
        let started = Instant::now();
        let attempts = async {
            let mut attempt = 0;
            loop {
                attempt += 1;
                match self.exchange(route, payload, request_id, budget).await {
                    Ok(response) => return Ok(response),
                    Err(err) => match self.retry.next_delay(&err, attempt) {
                        Some(delay) => {
                            tracing::info!(
                                route = %route,
                                attempt,
                                delay = ?delay,
                                "Upstream unreachable, retrying"
                            );
                            sleep(delay).await;
                        }
                        None => return Err(err),
                    },
                }
            }
        };

        let result = match timeout(budget, attempts).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(route = %route, budget_ms = budget.as_millis() as u64, "Upstream call timed out");
                Err(ProxyError::timeout(route, budget))
            }
        };

        result.map(|mut response| {
            response.elapsed = started.elapsed();
            response
        })
    }

    /// One probe of the health endpoint under `upstream.health_timeout_ms`.
    /// Never retried.
    pub async fn probe(&self) -> ProxyResult {
        let route = UpstreamRoute::Health;
        let budget = route.budget(&self.config);
        match timeout(budget, self.exchange(route, &ProxyPayload::Empty, None, budget)).await {
            Ok(result) => result,
            Err(_) => Err(ProxyError::timeout(route, budget)),
        }
    }

    async fn exchange(
        &self,
        route: UpstreamRoute,
        payload: &ProxyPayload,
        request_id: Option<&str>,
        budget: Duration,
    ) -> ProxyResult {
        let url = self.endpoint(route);

        let request = match payload {
            ProxyPayload::Empty => self.http.get(&url),
            ProxyPayload::Json(fields) => self.http.post(&url).json(fields),
            ProxyPayload::Image(image) => {
                let form = image.to_form().await.map_err(|e| {
                    tracing::error!(route = %route, error = %e, "Failed to open staged upload");
                    ProxyError::unknown(route, "Failed to read uploaded image")
                })?;
                self.http.post(&url).multipart(form)
            }
        };

        let request = match request_id {
            Some(id) => request.header(X_REQUEST_ID, id),
            None => request,
        };

        tracing::debug!(route = %route, url = %url, "Forwarding to upstream");

        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(route, budget, &e))?;

        let status = response.status();
        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(route, budget, &e))?;

        if !status.is_success() {
            tracing::warn!(route = %route, status = %status, "Upstream returned error status");
            return Err(ProxyError::upstream(route, status, body));
        }

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
            elapsed: Duration::ZERO,
        })
    }

    fn transport_error(&self, route: UpstreamRoute, budget: Duration, err: &reqwest::Error) -> ProxyError {
        let classified = classify_transport(route, budget, err);
        tracing::warn!(
            route = %route,
            kind = classified.kind.as_str(),
            error = %err,
            "Upstream transport failure"
        );
        classified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let config = UpstreamConfig {
            base_url: "http://ml.internal:8000/".into(),
            ..UpstreamConfig::default()
        };
        let client = UpstreamClient::new(&config, &RetryConfig::default()).unwrap();
        assert_eq!(
            client.endpoint(UpstreamRoute::Irrigation),
            "http://ml.internal:8000/predict/irrigation"
        );
        assert_eq!(client.endpoint(UpstreamRoute::Health), "http://ml.internal:8000/health");
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let config = UpstreamConfig {
            base_url: "::not a url".into(),
            ..UpstreamConfig::default()
        };
        assert!(matches!(
            UpstreamClient::new(&config, &RetryConfig::default()),
            Err(ClientError::Url { .. })
        ));
    }
}
