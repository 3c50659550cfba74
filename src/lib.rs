//! Smart Farming gateway library.
//!
//! Forwards soil-fertility, irrigation and soil-image requests to an
//! external prediction service and translates its outcomes into stable,
//! JSON-shaped responses.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;
pub mod upstream;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
