use std::time::Instant;

/// Time source for the console session.
///
/// Stage timers (dwell, cooling, flux, cleaning) and the heartbeat window are
/// all measured as milliseconds since the session's epoch.
pub trait Clock {
    fn now(&self) -> Instant;

    /// Milliseconds from `epoch` to now; 0 if `epoch` lies in the future.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        u64::try_from(dur.as_millis()).unwrap_or(u64::MAX)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_clock {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Hand-driven clock for stepping a session through timed stages.
    ///
    /// Clones share the same offset, so a test keeps one handle while the
    /// session owns another.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        elapsed: Arc<Mutex<Duration>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                elapsed: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        pub fn advance(&self, d: Duration) {
            if let Ok(mut elapsed) = self.elapsed.lock() {
                *elapsed = elapsed.saturating_add(d);
            }
        }

        /// Same as [`advance`](Self::advance); stage durations are configured in ms.
        pub fn advance_ms(&self, ms: u64) {
            self.advance(Duration::from_millis(ms));
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            let elapsed = self.elapsed.lock().map(|g| *g).unwrap_or(Duration::ZERO);
            self.origin + elapsed
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn clones_share_time() {
            let a = TestClock::new();
            let b = a.clone();
            let epoch = a.now();
            b.advance_ms(1_500);
            assert_eq!(a.ms_since(epoch), 1_500);
            a.advance(Duration::from_millis(500));
            assert_eq!(b.ms_since(epoch), 2_000);
        }

        #[test]
        fn future_epoch_reads_zero() {
            let clock = TestClock::new();
            let epoch = clock.now() + Duration::from_secs(1);
            assert_eq!(clock.ms_since(epoch), 0);
        }
    }
}
