//! Shared utilities for gateway integration tests.

#![allow(dead_code)]

use axum::Router;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tokio::net::TcpListener;

use farm_gateway::config::GatewayConfig;
use farm_gateway::http::HttpServer;
use farm_gateway::lifecycle::Shutdown;

/// Serve `app` as a stub prediction service on an ephemeral port.
pub async fn start_stub_upstream(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Serve `app` on a specific address, e.g. one that refused earlier.
pub async fn start_stub_upstream_on(addr: SocketAddr, app: Router) {
    let listener = TcpListener::bind(addr).await.unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
}

/// An address nothing listens on: connections to it are refused.
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Config pointing at `upstream`, with the prober off and short budgets.
pub fn test_config(upstream: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream.base_url = format!("http://{}", upstream);
    config.upstream.fertility_timeout_ms = 2_000;
    config.upstream.irrigation_timeout_ms = 2_000;
    config.upstream.soil_image_timeout_ms = 3_000;
    config.upstream.health_timeout_ms = 1_000;
    config.health_check.enabled = false;
    config.retries.base_delay_ms = 10;
    config.retries.max_delay_ms = 50;
    config
}

/// Start the gateway on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig) -> (SocketAddr, Shutdown) {
    let server = HttpServer::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    // Give the accept loop a moment.
    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Number of entries left in a staging directory.
pub fn staged_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

pub fn fertility_sample() -> serde_json::Value {
    serde_json::json!({
        "N": 280, "P": 20, "K": 150, "pH": 6.5, "EC": 1.0, "OC": 0.8,
        "S": 15, "Zn": 3, "Fe": 15, "Cu": 3, "Mn": 8, "B": 1.0
    })
}

pub fn irrigation_sample() -> serde_json::Value {
    serde_json::json!({
        "soil_moisture": 32.5,
        "temperature": 29.1,
        "humidity": 61.0,
        "rainfall": 0.0,
        "crop_stage": 2
    })
}
