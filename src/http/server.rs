//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, CORS, body limit)
//! - Create the upload staging directory
//! - Spawn the liveness prober next to the server
//! - Serve until the shutdown signal fires

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::health::{HealthState, LivenessProber};
use crate::http::handlers;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::upload::prepare_staging_dir;
use crate::lifecycle::shutdown::signalled;
use crate::security::cors_layer;
use crate::upstream::{ClientError, UpstreamClient};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub upstream: Arc<UpstreamClient>,
    pub health: Arc<HealthState>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, ClientError> {
        let upstream = Arc::new(UpstreamClient::new(&config.upstream, &config.retries)?);
        Ok(Self::with_upstream(config, upstream))
    }

    /// Create a server around an existing upstream client.
    pub fn with_upstream(config: GatewayConfig, upstream: Arc<UpstreamClient>) -> Self {
        let state = AppState {
            config: Arc::new(config),
            upstream,
            health: Arc::new(HealthState::new()),
        };

        let router = Self::build_router(&state);
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: &AppState) -> Router {
        let config = &state.config;

        Router::new()
            .route("/", get(handlers::root))
            .route("/api/health", get(handlers::health))
            .route("/api/crops/fertility", post(handlers::fertility))
            .route("/api/crops/moisture", post(handlers::moisture))
            .route("/api/crops/soil-image", post(handlers::soil_image))
            .fallback(handlers::not_found)
            .with_state(state.clone())
            .layer(DefaultBodyLimit::max(config.upstream.max_payload_bytes))
            .layer(cors_layer(&config.security.cors))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The router, for serving it in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires. The liveness prober stops on the same signal.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        prepare_staging_dir(&self.state.config.uploads.staging_dir()).await?;

        tracing::info!(
            address = %addr,
            upstream = %self.state.upstream.base_url(),
            "HTTP server starting"
        );

        let prober = LivenessProber::new(
            self.state.upstream.clone(),
            self.state.health.clone(),
            self.state.config.health_check.clone(),
        );
        let prober_shutdown = shutdown.resubscribe();
        let prober_task = tokio::spawn(async move {
            prober.run(prober_shutdown).await;
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(signalled(shutdown))
            .await?;

        prober_task.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
