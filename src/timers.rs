//! Wall-clock measurement of query phases.

use std::time::{Duration, Instant};

/// Adds the time between its creation and drop to `slot`.
///
/// Early returns through `?` are still measured.
pub struct PhaseTimer<'a> {
    start: Instant,
    slot: &'a mut Duration,
}

impl<'a> PhaseTimer<'a> {
    pub fn new(slot: &'a mut Duration) -> Self {
        Self {
            start: Instant::now(),
            slot,
        }
    }
}

impl Drop for PhaseTimer<'_> {
    fn drop(&mut self) {
        *self.slot += self.start.elapsed();
    }
}

/// Run `f`, charging its duration to `slot`.
pub fn timed<T>(slot: &mut Duration, f: impl FnOnce() -> T) -> T {
    let _timer = PhaseTimer::new(slot);
    f()
}

/// Seconds with two decimals, as shown in status messages.
pub fn seconds(duration: Duration) -> String {
    format!("{:.2}", duration.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_timed_charges_slot() {
        let mut evaluate = Duration::ZERO;
        let value = timed(&mut evaluate, || {
            thread::sleep(Duration::from_millis(10));
            42
        });
        assert_eq!(value, 42);
        assert!(evaluate >= Duration::from_millis(10));
    }

    #[test]
    fn test_timer_charges_on_early_return() {
        fn step(slot: &mut Duration, fail: bool) -> Result<(), String> {
            let _timer = PhaseTimer::new(slot);
            thread::sleep(Duration::from_millis(5));
            if fail {
                return Err("boom".to_string());
            }
            Ok(())
        }

        let mut slot = Duration::ZERO;
        assert!(step(&mut slot, true).is_err());
        assert!(slot >= Duration::from_millis(5));
    }

    #[test]
    fn test_seconds_format() {
        assert_eq!(seconds(Duration::from_millis(1234)), "1.23");
        assert_eq!(seconds(Duration::ZERO), "0.00");
        assert_eq!(seconds(Duration::from_secs(12)), "12.00");
    }
}
