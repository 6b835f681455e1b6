//! Race clock

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Countdown shown next to the race controls
///
/// Hitting zero only freezes the clock; the race keeps running.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceClock {
    duration_ms: u64,
    remaining_ms: u64,
}

impl RaceClock {
    pub fn new(duration_secs: u64) -> Self {
        let duration_ms = duration_secs.saturating_mul(1_000);
        Self {
            duration_ms,
            remaining_ms: duration_ms,
        }
    }

    /// Whole seconds left, rounded down
    pub fn remaining_secs(&self) -> u64 {
        self.remaining_ms / 1_000
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_ms == 0
    }

    /// Count down by `elapsed`; returns true on the tick that reaches zero
    pub fn tick(&mut self, elapsed: Duration) -> bool {
        if self.remaining_ms == 0 {
            return false;
        }
        let step = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.remaining_ms = self.remaining_ms.saturating_sub(step);
        self.remaining_ms == 0
    }

    pub fn reset(&mut self) {
        self.remaining_ms = self.duration_ms;
    }

    /// Remaining time as `MM:SS`
    pub fn formatted(&self) -> String {
        let secs = self.remaining_secs();
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }

    /// Remaining share of the race in percent
    pub fn progress(&self) -> f64 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        self.remaining_ms as f64 / self.duration_ms as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_millis(1_000);

    #[test]
    fn test_counts_down_to_zero_and_stops() {
        let mut clock = RaceClock::new(2);
        assert!(!clock.tick(SECOND));
        assert!(clock.tick(SECOND));
        assert!(clock.is_expired());
        assert!(!clock.tick(SECOND));
        assert_eq!(clock.remaining_secs(), 0);
    }

    #[test]
    fn test_formatting_and_progress() {
        let mut clock = RaceClock::new(300);
        assert_eq!(clock.formatted(), "05:00");
        assert_eq!(clock.progress(), 100.0);

        for _ in 0..75 {
            clock.tick(SECOND);
        }
        assert_eq!(clock.formatted(), "03:45");
        assert_eq!(clock.progress(), 75.0);

        clock.reset();
        assert_eq!(clock.remaining_secs(), 300);
    }

    #[test]
    fn test_sub_second_periods_track_real_time() {
        let mut clock = RaceClock::new(10);
        for _ in 0..4 {
            clock.tick(Duration::from_millis(250));
        }
        assert_eq!(clock.remaining_secs(), 9);
        assert_eq!(clock.formatted(), "00:09");

        let mut clock = RaceClock::new(10);
        clock.tick(Duration::from_millis(2_500));
        assert_eq!(clock.formatted(), "00:07");
        assert_eq!(clock.progress(), 75.0);
    }

    #[test]
    fn test_overshoot_stops_at_zero() {
        let mut clock = RaceClock::new(1);
        assert!(clock.tick(Duration::from_secs(5)));
        assert_eq!(clock.formatted(), "00:00");
    }

    #[test]
    fn test_zero_length_race() {
        let clock = RaceClock::new(0);
        assert!(clock.is_expired());
        assert_eq!(clock.progress(), 0.0);
        assert_eq!(clock.formatted(), "00:00");
    }
}
