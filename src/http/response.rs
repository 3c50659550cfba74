//! Response shaping.
//!
//! # Responsibilities
//! - Relay successful upstream bodies verbatim with 200
//! - Render classified errors as `{error, details}` JSON
//! - Relay upstream error bodies unmodified at the upstream status
//!
//! Every failure the gateway emits is a JSON object with an `error` field.

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::resilience::{ProxyError, ProxyErrorKind};
use crate::upstream::UpstreamResponse;

fn application_json() -> HeaderValue {
    HeaderValue::from_static("application/json")
}

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> Response {
        let content_type = self.content_type.unwrap_or_else(application_json);
        (StatusCode::OK, [(CONTENT_TYPE, content_type)], Body::from(self.body)).into_response()
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        if self.kind == ProxyErrorKind::UpstreamError {
            if let Some(body) = self.upstream_body {
                if is_json_object(&body) {
                    return (self.status, [(CONTENT_TYPE, application_json())], Body::from(body))
                        .into_response();
                }
            }
        }

        let mut payload = json!({ "error": self.message });
        if let Some(detail) = self.detail {
            payload["details"] = detail;
        }
        (self.status, Json(payload)).into_response()
    }
}

/// A JSON error for failures raised before any upstream call.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn is_json_object(body: &[u8]) -> bool {
    matches!(serde_json::from_slice::<Value>(body), Ok(Value::Object(_)))
}
