use crate::clock::{ClockArbiter, Housekeeping};
use crate::generator::{Fire, RandomEventGenerator};
use crate::params::{ProbabilityConfig, VelocityConfig};
use crate::tempo::TempoConfig;
use crate::transport::TransportControl;
use crate::types::*;
use crate::voices::VoicePool;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::Rng;

/// What happened on a qualifying tick.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub at_ms: u64,
    /// Step that fired (before advancing)
    pub step: u8,
    /// Beat LED: high for the first half of the beat's steps
    pub indicator: bool,
    pub clock_mode: ClockMode,
    pub fire: Option<Fire>,
}

/// The dual-clock step state machine.
///
/// Every input arrives as a `SeqEvent` through `handle`, so the owner can
/// serialize timer ticks, clock pulses, button edges and control samples
/// through one queue and never observe a half-applied update.
pub struct StepSequencer<R: Rng = StdRng> {
    transport: TransportControl,
    arbiter: ClockArbiter,
    generator: RandomEventGenerator<R>,
    pool: VoicePool,
    /// Always in `0..subdivision.steps_per_beat()`
    step: u8,
    /// Scheduled time of the last internal step; fractional so non-integer
    /// periods do not round up on every step
    last_tick_ms: f64,
    controls: ControlFrame,
    tempo: TempoConfig,
    velocity: VelocityConfig,
    probability: ProbabilityConfig,
}

impl<R: Rng> StepSequencer<R> {
    pub fn new(generator: RandomEventGenerator<R>, pool: VoicePool) -> Self {
        let controls = ControlFrame::default();
        Self {
            transport: TransportControl::new(),
            arbiter: ClockArbiter::new(),
            generator,
            pool,
            step: 0,
            last_tick_ms: 0.0,
            controls,
            tempo: TempoConfig::from_raw(controls.tempo_raw, controls.subdivision),
            velocity: VelocityConfig::from_raw(controls.vel_low_raw, controls.vel_high_raw),
            probability: ProbabilityConfig::new(controls.probability_raw),
        }
    }

    pub fn with_controls(mut self, controls: ControlFrame) -> Self {
        self.apply_controls(controls);
        self
    }

    pub fn state(&self) -> SequencerState {
        SequencerState {
            transport: self.transport.state(),
            step: self.step,
            clock_mode: self.arbiter.mode(),
            last_external_clock_ms: self.arbiter.last_pulse_ms(),
            last_internal_tick_ms: self.last_tick_ms as u64,
        }
    }

    pub fn tempo(&self) -> TempoConfig {
        self.tempo
    }

    pub fn velocity(&self) -> VelocityConfig {
        self.velocity
    }

    pub fn probability(&self) -> ProbabilityConfig {
        self.probability
    }

    pub fn subdivision(&self) -> Subdivision {
        self.controls.subdivision
    }

    pub fn pool(&self) -> &VoicePool {
        &self.pool
    }

    /// Beat LED level for the current step.
    pub fn indicator(&self) -> bool {
        self.step < self.controls.subdivision.steps_per_beat() / 2
    }

    /// Apply one event. Returns a report when the event produced a qualifying tick.
    pub fn handle(&mut self, event: SeqEvent) -> Option<StepReport> {
        match event {
            SeqEvent::Timer { at_ms } => self.on_timer(at_ms),
            SeqEvent::ClockPulse { at_ms } => self.on_clock_pulse(at_ms),
            SeqEvent::Start { at_ms } => {
                self.on_start(at_ms);
                None
            }
            SeqEvent::Stop { at_ms } => {
                self.on_stop(at_ms);
                None
            }
            SeqEvent::TransportEdge { at_ms } => {
                self.on_transport_edge(at_ms);
                None
            }
            SeqEvent::Controls(frame) => {
                self.apply_controls(frame);
                None
            }
        }
    }

    fn on_timer(&mut self, now_ms: u64) -> Option<StepReport> {
        match self.arbiter.housekeeping(now_ms) {
            Housekeeping::ExternalFresh => None,
            Housekeeping::ExternalLost => {
                warn!(
                    "External clock lost at {}ms (last pulse {}ms), stopping",
                    now_ms,
                    self.arbiter.last_pulse_ms()
                );
                self.transport.force(Transport::Stopped);
                self.step = 0;
                None
            }
            Housekeeping::Internal => {
                if !self.transport.is_playing() {
                    return None;
                }
                let period = self.tempo.step_period_ms;
                let elapsed = now_ms as f64 - self.last_tick_ms;
                if elapsed < period {
                    return None;
                }
                // Advance on the grid; resync if the timer fell a whole step behind
                self.last_tick_ms = if elapsed < 2.0 * period {
                    self.last_tick_ms + period
                } else {
                    now_ms as f64
                };
                Some(self.fire_step(now_ms))
            }
        }
    }

    fn on_clock_pulse(&mut self, now_ms: u64) -> Option<StepReport> {
        self.arbiter.observe_pulse(now_ms);
        if !self.transport.is_playing() {
            return None;
        }
        if self.arbiter.advance_pulse(self.controls.subdivision) {
            Some(self.fire_step(now_ms))
        } else {
            None
        }
    }

    fn on_start(&mut self, now_ms: u64) {
        info!("Start received at {}ms", now_ms);
        self.transport.force(Transport::Playing);
        self.restart(now_ms);
    }

    fn on_stop(&mut self, now_ms: u64) {
        info!("Stop received at {}ms", now_ms);
        self.transport.force(Transport::Stopped);
        self.restart(now_ms);
    }

    fn on_transport_edge(&mut self, now_ms: u64) {
        if let Some(state) = self.transport.request_toggle(now_ms) {
            info!("Transport toggled to {:?} at {}ms", state, now_ms);
            self.restart(now_ms);
            self.arbiter.refresh(now_ms);
        }
    }

    /// Back to the downbeat with a fresh internal tick clock.
    fn restart(&mut self, now_ms: u64) {
        self.step = 0;
        self.arbiter.reset_pulses();
        self.last_tick_ms = now_ms as f64;
    }

    fn apply_controls(&mut self, frame: ControlFrame) {
        if frame.subdivision != self.controls.subdivision {
            debug!("Subdivision {:?} → {:?}", self.controls.subdivision, frame.subdivision);
        }
        self.controls = frame;
        self.tempo = TempoConfig::from_raw(frame.tempo_raw, frame.subdivision);
        self.velocity = VelocityConfig::from_raw(frame.vel_low_raw, frame.vel_high_raw);
        self.probability = ProbabilityConfig::new(frame.probability_raw);
        self.step %= frame.subdivision.steps_per_beat();
    }

    fn fire_step(&mut self, now_ms: u64) -> StepReport {
        let step = self.step;
        let indicator = self.indicator();
        let fire = self.generator.fire(
            self.probability,
            self.velocity,
            &self.pool,
            self.controls.glitch,
        );
        if let Some(ref f) = fire {
            debug!(
                "step {} @{}ms: voice {} note {} vel {}",
                step, now_ms, f.hit.voice, f.hit.note, f.hit.velocity
            );
        }
        self.step = (step + 1) % self.controls.subdivision.steps_per_beat();
        StepReport {
            at_ms: now_ms,
            step,
            indicator,
            clock_mode: self.arbiter.mode(),
            fire,
        }
    }
}
