//! Cross-origin policy.
//!
//! Origins outside the allow-list get no CORS headers, so browsers block the
//! response. Requests without an `Origin` header (curl, server-to-server)
//! are unaffected.

use axum::http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    request::Parts,
    HeaderValue, Method,
};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::CorsConfig;
use crate::http::request::X_REQUEST_ID;

pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origin = if config.allow_any_origin {
        tracing::warn!("CORS accepts every origin; restrict security.cors.allowed_origins for production");
        AllowOrigin::mirror_request()
    } else {
        let allowed: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring unparsable CORS origin");
                    None
                }
            })
            .collect();

        AllowOrigin::predicate(move |origin: &HeaderValue, _parts: &Parts| {
            let ok = allowed.iter().any(|a| a == origin);
            if !ok {
                tracing::warn!(origin = ?origin, "Blocked by CORS");
            }
            ok
        })
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .expose_headers([X_REQUEST_ID])
        .max_age(Duration::from_secs(config.max_age_secs))
}
