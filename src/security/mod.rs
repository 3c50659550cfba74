//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (origin allow-list, preflight answers)
//!     → Route handlers (body size bounded by upstream.max_payload_bytes)
//! ```
//!
//! # Design Decisions
//! - Fail closed: unknown origins get no CORS headers
//! - The permissive mode is explicit configuration, never a fallback

pub mod cors;

pub use cors::cors_layer;
