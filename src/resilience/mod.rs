//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Forwarded request:
//!     → per-route deadline (upstream client, tokio::time::timeout)
//!     → On failure: classify.rs (map to ProxyErrorKind + status)
//!     → retries.rs (connect-phase failures only, backoff.rs delay)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream call has a deadline
//! - A request the upstream may have seen is never sent twice
//! - Callers only ever see classified errors, never raw transport errors

pub mod backoff;
pub mod classify;
pub mod retries;

pub use classify::{classify_transport, ProxyError, ProxyErrorKind};
pub use retries::RetryPolicy;
