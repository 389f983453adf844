use crate::types::Subdivision;

/// Lowest tempo the knob can select.
pub const MIN_BPM: f64 = 20.0;
/// Span of the knob above `MIN_BPM` over the full 1024-count ADC range.
pub const BPM_SPAN: f64 = 200.0;

/// Tempo knob reading → beats per minute.
///
/// `bpm = raw * 200 / 1024 + 20`, so raw 0 is 20 BPM and raw 1023 lands
/// just under 220 BPM.
pub fn bpm_from_raw(raw: u16) -> f64 {
    raw as f64 * BPM_SPAN / 1024.0 + MIN_BPM
}

/// Milliseconds between steps at the given tempo and subdivision.
pub fn step_period_ms(bpm: f64, subdivision: Subdivision) -> f64 {
    60_000.0 / bpm / subdivision.steps_per_beat() as f64
}

/// Tempo derived from the latest knob sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoConfig {
    pub bpm: f64,
    pub step_period_ms: f64,
}

impl TempoConfig {
    pub fn from_raw(raw: u16, subdivision: Subdivision) -> Self {
        let bpm = bpm_from_raw(raw);
        Self {
            bpm,
            step_period_ms: step_period_ms(bpm, subdivision),
        }
    }
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self::from_raw(512, Subdivision::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bpm_endpoints() {
        assert_eq!(bpm_from_raw(0), 20.0);
        assert!((bpm_from_raw(1023) - 219.8).abs() < 0.01);
        assert_eq!(bpm_from_raw(512), 120.0);
    }

    #[test]
    fn test_step_period_120_sixteenths() {
        assert_eq!(step_period_ms(120.0, Subdivision::Sixteenth), 125.0);
        assert_eq!(step_period_ms(120.0, Subdivision::Eighth), 250.0);
        assert_eq!(step_period_ms(120.0, Subdivision::ThirtySecond), 62.5);
    }

    #[test]
    fn test_slowest_tempo_period() {
        // 20 BPM sixteenths: 3000ms per beat / 4
        let t = TempoConfig::from_raw(0, Subdivision::Sixteenth);
        assert_eq!(t.step_period_ms, 750.0);
    }

    #[test]
    fn test_default_is_120() {
        let t = TempoConfig::default();
        assert_eq!(t.bpm, 120.0);
        assert_eq!(t.step_period_ms, 125.0);
    }
}
