//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates admission checks and defines the ports (traits)
//! that infrastructure adapters must implement:
//! - Admission gate (decision making)
//! - Metrics (observability counters)
//!
//! ## Ports
//!
//! The application layer depends only on the `Clock` and `BucketStore`
//! ports, never on a concrete store, which keeps it independent from
//! infrastructure details.

pub mod gate;
pub mod metrics;
pub mod ports;
