//! Route handlers.
//!
//! The three prediction handlers are thin adapters: check that input is
//! present, hand it to the upstream client, and render the typed result.
//! Nothing is validated beyond presence; the prediction service owns
//! field-level validation.

use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::time::Instant;

use crate::http::request::RequestIdExt;
use crate::http::response::json_error;
use crate::http::server::AppState;
use crate::http::upload::{StagedUpload, UploadError};
use crate::observability::metrics;
use crate::resilience::ProxyError;
use crate::upstream::{ProxyPayload, ProxyResult, UpstreamRoute};

/// `POST /api/crops/fertility`
pub async fn fertility(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Response {
    forward_json(&state, UpstreamRoute::Fertility, &headers, body).await
}

/// `POST /api/crops/moisture`
pub async fn moisture(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Response {
    forward_json(&state, UpstreamRoute::Irrigation, &headers, body).await
}

async fn forward_json(
    state: &AppState,
    route: UpstreamRoute,
    headers: &HeaderMap,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Response {
    let start = Instant::now();

    let fields = match body {
        Ok(Json(fields)) if !fields.is_empty() => fields,
        Ok(_) => {
            let err = ProxyError::missing_input("No data received");
            return finish(route, start, Err(err));
        }
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            tracing::warn!(route = %route, "Request body over limit");
            return record(route, start, json_error(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large"));
        }
        Err(rejection) => {
            tracing::debug!(route = %route, error = %rejection, "Rejected request body");
            let mut err = ProxyError::missing_input("Request body must be a JSON object of readings");
            err.detail = Some(Value::String(rejection.body_text()));
            return finish(route, start, Err(err));
        }
    };

    tracing::info!(
        route = %route,
        request_id = headers.request_id().unwrap_or("unknown"),
        fields = fields.len(),
        "Forwarding prediction request"
    );

    let payload = ProxyPayload::Json(fields);
    let result = state
        .upstream
        .forward(route, &payload, headers.request_id())
        .await;

    finish(route, start, result)
}

/// `POST /api/crops/soil-image`
pub async fn soil_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let route = UpstreamRoute::SoilImage;
    let start = Instant::now();

    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Soil image request is not multipart");
            return finish(route, start, Err(ProxyError::missing_input("No image file provided")));
        }
    };

    // Dropping `upload` removes the staged file, on every path out of here.
    let upload = match stage_image(&state, &mut multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => {
            return finish(route, start, Err(ProxyError::missing_input("No image file provided")));
        }
        Err(UploadError::Multipart(e)) => {
            tracing::warn!(error = %e, "Malformed multipart body");
            return record(route, start, json_error(e.status(), e.body_text()));
        }
        Err(UploadError::Io(e)) => {
            tracing::error!(error = %e, "Failed to stage upload");
            return record(
                route,
                start,
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store uploaded image"),
            );
        }
    };

    tracing::info!(
        route = %route,
        request_id = headers.request_id().unwrap_or("unknown"),
        file_name = %upload.file_name(),
        content_type = %upload.content_type(),
        bytes = upload.len(),
        "Forwarding soil image"
    );

    let payload = ProxyPayload::Image(upload.to_part());
    let result = state
        .upstream
        .forward(route, &payload, headers.request_id())
        .await;

    drop(upload);
    finish(route, start, result)
}

/// Stage the configured image field. Other fields, and a text field that
/// reuses the image name, are skipped; an empty file counts as absent.
async fn stage_image(
    state: &AppState,
    multipart: &mut Multipart,
) -> Result<Option<StagedUpload>, UploadError> {
    let wanted = state.config.uploads.field_name.as_str();
    let dir = state.config.uploads.staging_dir();

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(wanted) || field.file_name().is_none() {
            continue;
        }
        let upload = StagedUpload::stage(&dir, field).await?;
        if upload.is_empty() {
            return Ok(None);
        }
        return Ok(Some(upload));
    }

    Ok(None)
}

fn finish(route: UpstreamRoute, start: Instant, result: ProxyResult) -> Response {
    let response = match result {
        Ok(upstream) => {
            tracing::info!(route = %route, elapsed = ?upstream.elapsed, "Upstream response received");
            upstream.into_response()
        }
        Err(err) => {
            metrics::record_upstream_error(route.name(), err.kind.as_str());
            tracing::warn!(
                route = %route,
                kind = err.kind.as_str(),
                status = %err.status,
                error = %err,
                "Prediction request failed"
            );
            err.into_response()
        }
    };
    record(route, start, response)
}

fn record(route: UpstreamRoute, start: Instant, response: Response) -> Response {
    metrics::record_request(route.name(), response.status().as_u16(), start);
    response
}

/// `GET /api/health`
///
/// Always 200. The gateway is healthy if it can answer; the upstream is
/// probed on demand with the short health budget and reported as
/// "unavailable" when the probe fails.
pub async fn health(State(state): State<AppState>) -> Response {
    let start = Instant::now();
    let cached = state.health.snapshot();

    let mut body = json!({
        "backend": "healthy",
        "upstream": {
            "healthy": cached.upstream_healthy,
            "last_checked_at": cached.last_checked_at,
            "last_error": cached.last_error,
        },
    });

    match state.upstream.probe().await {
        Ok(response) => {
            body["flask"] = serde_json::from_slice(&response.body)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&response.body).into_owned()));
        }
        Err(err) => {
            tracing::debug!(kind = err.kind.as_str(), "On-demand upstream probe failed");
            body["flask"] = Value::String("unavailable".into());
            body["error"] = Value::String(err.message);
        }
    }
    body["timestamp"] = json!(Utc::now());

    metrics::record_request("health", 200, start);
    (StatusCode::OK, Json(body)).into_response()
}

/// `GET /`
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Smart Farming Gateway API",
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "crops": "/api/crops/*",
            "health": "/api/health",
        },
    }))
}

pub async fn not_found(uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Not found", "path": uri.path() })),
    )
        .into_response()
}
