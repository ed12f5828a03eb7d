//! Clock adapters for time operations.
//!
//! Provides the SystemClock implementation for production use.
//!
//! Bucket timestamps live in a store shared by many processes, so the clock
//! reads calendar time (`SystemTime`) rather than a process-local monotonic
//! source. Small jitter, including time briefly going backwards, is
//! tolerated by the refill math.
//!
//! # Testing
//!
//! See `MockClock` (in `crate::infrastructure::mocks`) for a controllable
//! test clock, available with the `test-helpers` feature or in test builds.

use crate::application::ports::Clock;
use std::time::{SystemTime, UNIX_EPOCH};

/// System clock reporting milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}
