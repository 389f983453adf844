use crate::types::{ClockMode, Subdivision, EXTERNAL_CLOCK_TIMEOUT_MS, PULSES_PER_QUARTER};
use log::{info, trace};

/// Result of the periodic staleness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Housekeeping {
    /// Internal clock is in charge; run internal step timing
    Internal,
    /// External clock is fresh; internal ticks are suppressed
    ExternalFresh,
    /// External clock just went stale; caller must stop the transport
    ExternalLost,
}

/// Tracks which clock source owns the step counter.
///
/// External mode is entered on the first pulse and held for as long as
/// pulses keep arriving within `EXTERNAL_CLOCK_TIMEOUT_MS` of each other.
#[derive(Debug, Default)]
pub struct ClockArbiter {
    mode: ClockMode,
    last_pulse_ms: u64,
    /// Position within the current quarter note, 0..24
    pulse_count: u8,
}

impl ClockArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> ClockMode {
        self.mode
    }

    pub fn last_pulse_ms(&self) -> u64 {
        self.last_pulse_ms
    }

    pub fn pulse_count(&self) -> u8 {
        self.pulse_count
    }

    /// Record a pulse arrival. Returns true if this switched the mode to External.
    pub fn observe_pulse(&mut self, now_ms: u64) -> bool {
        self.last_pulse_ms = now_ms;
        if self.mode == ClockMode::External {
            return false;
        }
        info!("External clock detected at {}ms", now_ms);
        self.mode = ClockMode::External;
        self.pulse_count = 0;
        true
    }

    /// Count a pulse toward the next step. Returns true if the pulse lands on
    /// a step boundary for the given subdivision.
    pub fn advance_pulse(&mut self, subdivision: Subdivision) -> bool {
        let qualifies = self.pulse_count % subdivision.pulses_per_step() == 0;
        trace!("pulse {}/{} qualifies={}", self.pulse_count, PULSES_PER_QUARTER, qualifies);
        self.pulse_count = (self.pulse_count + 1) % PULSES_PER_QUARTER;
        qualifies
    }

    pub fn reset_pulses(&mut self) {
        self.pulse_count = 0;
    }

    /// Push the staleness window out from `now_ms`.
    pub fn refresh(&mut self, now_ms: u64) {
        self.last_pulse_ms = now_ms;
    }

    /// Periodic check run at timer cadence. Falls back to Internal once the
    /// last pulse is older than the timeout.
    pub fn housekeeping(&mut self, now_ms: u64) -> Housekeeping {
        match self.mode {
            ClockMode::Internal => Housekeeping::Internal,
            ClockMode::External => {
                if now_ms.saturating_sub(self.last_pulse_ms) > EXTERNAL_CLOCK_TIMEOUT_MS {
                    self.mode = ClockMode::Internal;
                    self.pulse_count = 0;
                    Housekeeping::ExternalLost
                } else {
                    Housekeeping::ExternalFresh
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_internal() {
        let mut a = ClockArbiter::new();
        assert_eq!(a.mode(), ClockMode::Internal);
        assert_eq!(a.housekeeping(10_000), Housekeeping::Internal);
    }

    #[test]
    fn test_pulse_switches_immediately() {
        let mut a = ClockArbiter::new();
        assert!(a.observe_pulse(100));
        assert_eq!(a.mode(), ClockMode::External);
        assert!(!a.observe_pulse(120), "second pulse is not a switch");
        assert_eq!(a.last_pulse_ms(), 120);
    }

    #[test]
    fn test_fresh_within_window() {
        let mut a = ClockArbiter::new();
        a.observe_pulse(1000);
        assert_eq!(a.housekeeping(1500), Housekeeping::ExternalFresh);
        assert_eq!(a.mode(), ClockMode::External);
    }

    #[test]
    fn test_stale_after_window() {
        let mut a = ClockArbiter::new();
        a.observe_pulse(1000);
        assert_eq!(a.housekeeping(1501), Housekeeping::ExternalLost);
        assert_eq!(a.mode(), ClockMode::Internal);
        // Only reported once
        assert_eq!(a.housekeeping(1502), Housekeeping::Internal);
    }

    #[test]
    fn test_refresh_extends_window() {
        let mut a = ClockArbiter::new();
        a.observe_pulse(1000);
        a.refresh(1400);
        assert_eq!(a.housekeeping(1800), Housekeeping::ExternalFresh);
    }

    #[test]
    fn test_sixteenths_every_sixth_pulse() {
        let mut a = ClockArbiter::new();
        let hits: Vec<bool> = (0..24).map(|_| a.advance_pulse(Subdivision::Sixteenth)).collect();
        assert_eq!(hits.iter().filter(|&&h| h).count(), 4);
        for (i, &h) in hits.iter().enumerate() {
            assert_eq!(h, i % 6 == 0, "pulse {}", i);
        }
        assert_eq!(a.pulse_count(), 0, "counter wraps at 24");
    }

    #[test]
    fn test_eighths_and_thirty_seconds() {
        let mut a = ClockArbiter::new();
        let eighths = (0..24).filter(|_| a.advance_pulse(Subdivision::Eighth)).count();
        assert_eq!(eighths, 2);
        let thirty_seconds = (0..24).filter(|_| a.advance_pulse(Subdivision::ThirtySecond)).count();
        assert_eq!(thirty_seconds, 8);
    }
}
