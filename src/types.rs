use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

// ─── Transport & clock ──────────────────────────────────────────────────────

/// Playing/stopped state of the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Transport {
    #[default]
    Stopped,
    Playing,
}

impl Transport {
    pub fn is_playing(&self) -> bool {
        matches!(self, Transport::Playing)
    }

    pub fn toggled(self) -> Self {
        match self {
            Transport::Stopped => Transport::Playing,
            Transport::Playing => Transport::Stopped,
        }
    }
}

/// Which clock source currently advances the step counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClockMode {
    /// Self-timed from the 1 ms timer and the tempo knob
    #[default]
    Internal,
    /// Slaved to inbound 24-PPQN clock pulses
    External,
}

/// Steps per quarter note, selected by the three-position switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Subdivision {
    Eighth,
    #[default]
    Sixteenth,
    ThirtySecond,
}

impl Subdivision {
    pub fn steps_per_beat(self) -> u8 {
        match self {
            Subdivision::Eighth => 2,
            Subdivision::Sixteenth => 4,
            Subdivision::ThirtySecond => 8,
        }
    }

    /// Incoming clock pulses per step (24 PPQN divided by steps per beat).
    pub fn pulses_per_step(self) -> u8 {
        PULSES_PER_QUARTER / self.steps_per_beat()
    }

    /// Parse the note-value spelling used on the command line ("8", "16", "32").
    pub fn from_note_value(value: u8) -> Option<Self> {
        match value {
            8 => Some(Subdivision::Eighth),
            16 => Some(Subdivision::Sixteenth),
            32 => Some(Subdivision::ThirtySecond),
            _ => None,
        }
    }
}

// ─── Control-cycle sample ───────────────────────────────────────────────────

/// One sampling pass over the front panel. Knob values are raw 10-bit readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFrame {
    pub tempo_raw: u16,
    pub probability_raw: u16,
    pub vel_low_raw: u16,
    pub vel_high_raw: u16,
    pub subdivision: Subdivision,
    pub glitch: bool,
}

impl ControlFrame {
    /// Build a frame, clamping every knob into the 10-bit ADC range.
    pub fn new(
        tempo_raw: u16,
        probability_raw: u16,
        vel_low_raw: u16,
        vel_high_raw: u16,
        subdivision: Subdivision,
        glitch: bool,
    ) -> Self {
        Self {
            tempo_raw: tempo_raw.min(RAW_MAX),
            probability_raw: probability_raw.min(RAW_MAX),
            vel_low_raw: vel_low_raw.min(RAW_MAX),
            vel_high_raw: vel_high_raw.min(RAW_MAX),
            subdivision,
            glitch,
        }
    }
}

impl Default for ControlFrame {
    /// Knobs at 120 BPM, never firing, full velocity span.
    fn default() -> Self {
        Self::new(512, 0, 0, RAW_MAX, Subdivision::Sixteenth, false)
    }
}

// ─── Inter-thread messages ──────────────────────────────────────────────────

/// Everything that can advance or reconfigure the sequencer.
/// Timestamps are milliseconds since session start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeqEvent {
    /// High-rate timer tick: staleness housekeeping + internal step timing
    Timer { at_ms: u64 },
    /// One inbound 24-PPQN clock pulse
    ClockPulse { at_ms: u64 },
    /// Inbound start (or continue) command
    Start { at_ms: u64 },
    /// Inbound stop command
    Stop { at_ms: u64 },
    /// Falling edge on the local transport button
    TransportEdge { at_ms: u64 },
    /// Fresh control-cycle sample
    Controls(ControlFrame),
}

impl SeqEvent {
    pub fn at_ms(&self) -> Option<u64> {
        match *self {
            SeqEvent::Timer { at_ms }
            | SeqEvent::ClockPulse { at_ms }
            | SeqEvent::Start { at_ms }
            | SeqEvent::Stop { at_ms }
            | SeqEvent::TransportEdge { at_ms } => Some(at_ms),
            SeqEvent::Controls(_) => None,
        }
    }
}

// ─── Sequencer snapshot ─────────────────────────────────────────────────────

/// Snapshot of the clock/step state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SequencerState {
    pub transport: Transport,
    /// Always in `0..steps_per_beat`
    pub step: u8,
    pub clock_mode: ClockMode,
    pub last_external_clock_ms: u64,
    pub last_internal_tick_ms: u64,
}

/// A voice that fired on a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hit {
    pub voice: usize,
    pub note: u8,
    pub velocity: u8,
}

/// Produced by the coordinator for every qualifying tick and every
/// transport or clock-mode change. Consumed by the console display and
/// the event logger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusFrame {
    pub timestamp_ms: u64,
    pub transport: Transport,
    pub clock_mode: ClockMode,
    /// Step that just fired, or the current step for state changes
    pub step: u8,
    /// Steps per beat at the time of the frame
    pub steps: u8,
    /// Beat LED level
    pub indicator: bool,
    /// True when this frame reports a qualifying tick
    pub tick: bool,
    pub hit: Option<Hit>,
}

impl fmt::Display for StatusFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.clock_mode {
            ClockMode::Internal => "INT",
            ClockMode::External => "EXT",
        };
        let transport = match self.transport {
            Transport::Playing => "PLAY",
            Transport::Stopped => "STOP",
        };
        let hit = match self.hit {
            Some(h) => format!("voice {} note {:>3} vel {:>3}", h.voice, h.note, h.velocity),
            None => "---".to_string(),
        };
        write!(
            f,
            "t={:>8}ms  {} {}  step={} led={}  {}",
            self.timestamp_ms,
            mode,
            transport,
            self.step,
            if self.indicator { "●" } else { "○" },
            hit,
        )
    }
}

// ─── Session clock ──────────────────────────────────────────────────────────

/// Monotonic clock shared by every event producer.
#[derive(Clone)]
pub struct SessionClock {
    start: Instant,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Constants ──────────────────────────────────────────────────────────────

/// Largest reading from the 10-bit knob ADC.
pub const RAW_MAX: u16 = 1023;

/// Clock pulses per quarter note on the wire.
pub const PULSES_PER_QUARTER: u8 = 24;

/// External clock is considered lost after this long without a pulse.
pub const EXTERNAL_CLOCK_TIMEOUT_MS: u64 = 500;

/// Minimum spacing between accepted transport button presses.
pub const DEBOUNCE_MS: u64 = 50;

/// Output channel for every message (MIDI channel 10, zero-based nibble 9).
pub const DRUM_CHANNEL: u8 = 9;

/// Seed used by tests and by `--seed` when reproducibility is wanted.
pub const DEFAULT_SEED: u64 = 0x5EED_D2A5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulses_per_step() {
        assert_eq!(Subdivision::Eighth.pulses_per_step(), 12);
        assert_eq!(Subdivision::Sixteenth.pulses_per_step(), 6);
        assert_eq!(Subdivision::ThirtySecond.pulses_per_step(), 3);
    }

    #[test]
    fn test_subdivision_from_note_value() {
        assert_eq!(Subdivision::from_note_value(16), Some(Subdivision::Sixteenth));
        assert_eq!(Subdivision::from_note_value(32), Some(Subdivision::ThirtySecond));
        assert_eq!(Subdivision::from_note_value(12), None);
        assert_eq!(Subdivision::default(), Subdivision::Sixteenth);
    }

    #[test]
    fn test_control_frame_clamps_raw() {
        let c = ControlFrame::new(4095, 2000, 1024, 1023, Subdivision::Eighth, true);
        assert_eq!(c.tempo_raw, RAW_MAX);
        assert_eq!(c.probability_raw, RAW_MAX);
        assert_eq!(c.vel_low_raw, RAW_MAX);
        assert_eq!(c.vel_high_raw, RAW_MAX);
    }

    #[test]
    fn test_transport_toggle() {
        assert_eq!(Transport::Stopped.toggled(), Transport::Playing);
        assert_eq!(Transport::Playing.toggled(), Transport::Stopped);
        assert!(!Transport::default().is_playing());
    }
}
