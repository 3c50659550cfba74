//! Upstream (prediction service) subsystem.
//!
//! # Data Flow
//! ```text
//! Route handler
//!     → payload.rs (JSON map | staged image | empty)
//!     → client.rs (build request, deadline, retries)
//!     → prediction service
//!     → ProxyResult (body untouched | classified ProxyError)
//! ```

pub mod client;
pub mod payload;
pub mod route;

pub use client::{ClientError, ProxyResult, UpstreamClient, UpstreamResponse};
pub use payload::{ImagePart, ProxyPayload};
pub use route::UpstreamRoute;
