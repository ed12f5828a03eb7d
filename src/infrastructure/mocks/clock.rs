//! Mock clock for testing.

use crate::application::ports::Clock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Mock clock for testing.
///
/// Allows tests to control time progression explicitly, enabling
/// deterministic testing of refill behavior.
///
/// # Examples
///
/// ```
/// use tollgate::infrastructure::mocks::MockClock;
/// use tollgate::application::ports::Clock;
/// use std::time::Duration;
///
/// let clock = MockClock::new(1_000);
/// assert_eq!(clock.now_millis(), 1_000);
///
/// // Advance time explicitly
/// clock.advance(Duration::from_secs(3));
/// assert_eq!(clock.now_millis(), 4_000);
///
/// // Or set an absolute time
/// clock.set(10_000);
/// assert_eq!(clock.now_millis(), 10_000);
/// ```
///
/// # Thread Safety
///
/// `MockClock` is thread-safe and can be cloned to share across tasks.
/// All clones share the same underlying time value.
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    now_ms: Arc<AtomicU64>,
}

impl MockClock {
    /// Create a mock clock starting at `start_ms` milliseconds since epoch.
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: Duration) {
        self.now_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    /// Set the clock to an absolute time in milliseconds since epoch.
    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now_millis(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_clock() {
        let clock = MockClock::new(500);
        assert_eq!(clock.now_millis(), 500);

        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now_millis(), 750);

        clock.set(10);
        assert_eq!(clock.now_millis(), 10);
    }

    #[test]
    fn test_clones_share_time() {
        let clock = MockClock::new(0);
        let clone = clock.clone();

        clone.advance(Duration::from_secs(1));
        assert_eq!(clock.now_millis(), 1_000);
    }
}
