//! Clock provider for time abstraction.
//!
//! Loop sessions measure elapsed time against the clock in their
//! [`Context`](crate::traits::Context). Tests swap in a [`MockClock`] and
//! advance it by hand to exercise time limits deterministically.

use crate::error::{EddyError, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Provider trait for time operations.
pub trait ClockProvider: Send + Sync {
    /// Monotonic time in nanoseconds (for measuring durations).
    fn now(&self) -> u64;

    /// Current system time as milliseconds since UNIX epoch.
    fn system_time_millis(&self) -> u64;

    /// Advance time by the specified duration (mock-only operation).
    ///
    /// Real implementations do nothing.
    fn advance(&self, duration: Duration);

    /// Check if this is a mock clock.
    fn is_mock(&self) -> bool;

    /// Whole milliseconds elapsed since a previous [`now`](Self::now) reading.
    fn millis_since(&self, start_nanos: u64) -> u64 {
        self.now().saturating_sub(start_nanos) / 1_000_000
    }
}

/// Real clock that uses system time.
#[derive(Debug, Clone)]
pub struct RealClock {
    start: Instant,
}

impl RealClock {
    /// Create a new real clock.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for RealClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockProvider for RealClock {
    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }

    fn system_time_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }

    fn advance(&self, _duration: Duration) {
        // Real clock cannot be manually advanced
    }

    fn is_mock(&self) -> bool {
        false
    }
}

/// Mock clock for testing with controllable time.
///
/// The mock clock starts at a fixed or specified time and only advances
/// when explicitly told to via `advance()`.
#[derive(Debug, Default)]
pub struct MockClock {
    /// Current time in nanoseconds since start.
    current_nanos: AtomicU64,
    /// System time in milliseconds since UNIX epoch.
    system_time_millis: AtomicU64,
}

impl MockClock {
    /// Create a mock clock starting at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock clock fixed at the specified RFC 3339 time.
    ///
    /// # Example
    ///
    /// ```
    /// use eddy_core::testing::{ClockProvider, MockClock};
    ///
    /// let clock = MockClock::fixed("2024-01-15T10:30:00Z").unwrap();
    /// assert_eq!(clock.system_time_millis(), 1_705_314_600_000);
    /// ```
    pub fn fixed(iso_time: &str) -> Result<Self> {
        let dt = chrono::DateTime::parse_from_rfc3339(iso_time).map_err(|e| {
            EddyError::InvalidConfig {
                field: "time".to_string(),
                cause: e.to_string(),
            }
        })?;

        Ok(Self {
            current_nanos: AtomicU64::new(0),
            system_time_millis: AtomicU64::new(dt.timestamp_millis() as u64),
        })
    }

    /// Get the current monotonic time in nanoseconds.
    pub fn current_nanos(&self) -> u64 {
        self.current_nanos.load(Ordering::SeqCst)
    }

    /// Advance by a number of milliseconds.
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }
}

impl ClockProvider for MockClock {
    fn now(&self) -> u64 {
        self.current_nanos.load(Ordering::SeqCst)
    }

    fn system_time_millis(&self) -> u64 {
        self.system_time_millis.load(Ordering::SeqCst)
    }

    fn advance(&self, duration: Duration) {
        self.current_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
        self.system_time_millis
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    fn is_mock(&self) -> bool {
        true
    }
}
