//! Upstream health subsystem.
//!
//! # Data Flow
//! ```text
//! Liveness prober (prober.rs):
//!     Startup delay, then fixed interval
//!     → GET {upstream}/health with a short budget
//!     → Publish snapshot into state.rs
//!
//! Health route (/api/health):
//!     → Read latest snapshot
//!     → Optional on-demand probe of its own
//! ```

pub mod prober;
pub mod state;

pub use prober::LivenessProber;
pub use state::{HealthState, HealthStatus};
