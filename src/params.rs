//! Velocity and probability settings sampled from the front-panel knobs.

use crate::types::RAW_MAX;

/// Velocity knob reading → MIDI velocity (0–127), truncating.
pub fn velocity_from_raw(raw: u16) -> u8 {
    (raw.min(RAW_MAX) >> 3) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VelocityConfig {
    pub min: u8,
    pub max: u8,
}

impl VelocityConfig {
    pub fn new(min: u8, max: u8) -> Self {
        Self {
            min: min.min(127),
            max: max.min(127),
        }
    }

    pub fn from_raw(low_raw: u16, high_raw: u16) -> Self {
        Self::new(velocity_from_raw(low_raw), velocity_from_raw(high_raw))
    }

    /// Width of the random spread above `min`. Clamped to zero when the knobs
    /// are crossed (max below min).
    pub fn range(&self) -> u8 {
        self.max.saturating_sub(self.min)
    }
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self::new(0, 127)
    }
}

/// Firing threshold compared against a fresh 0..=1023 roll per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProbabilityConfig(u16);

impl ProbabilityConfig {
    pub fn new(raw: u16) -> Self {
        Self(raw.min(RAW_MAX))
    }

    pub fn threshold(&self) -> u16 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_velocity_from_raw() {
        assert_eq!(velocity_from_raw(0), 0);
        assert_eq!(velocity_from_raw(7), 0);
        assert_eq!(velocity_from_raw(8), 1);
        assert_eq!(velocity_from_raw(800), 100);
        assert_eq!(velocity_from_raw(1023), 127);
    }

    #[test]
    fn test_range_clamps_when_crossed() {
        assert_eq!(VelocityConfig::new(40, 100).range(), 60);
        assert_eq!(VelocityConfig::new(100, 40).range(), 0);
        assert_eq!(VelocityConfig::new(64, 64).range(), 0);
    }

    #[test]
    fn test_probability_clamps() {
        assert_eq!(ProbabilityConfig::new(5000).threshold(), 1023);
        assert_eq!(ProbabilityConfig::default().threshold(), 0);
    }
}
