use crate::types::*;
use crossbeam_channel::Sender;
use log::info;
use std::thread;
use std::time::Duration;

/// How often the simulated panel is sampled.
pub const CONTROL_CYCLE_MS: u64 = 10;

/// Plays a scripted performance on a virtual front panel and, when asked,
/// acts as an external clock master. Exercises the whole pipeline without
/// hardware attached.
pub struct Simulator {
    clock: SessionClock,
    tx: Sender<SeqEvent>,
}

/// Front-panel knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Knob {
    Tempo,
    Probability,
    VelocityLow,
    VelocityHigh,
}

impl Knob {
    fn index(self) -> usize {
        match self {
            Knob::Tempo => 0,
            Knob::Probability => 1,
            Knob::VelocityLow => 2,
            Knob::VelocityHigh => 3,
        }
    }
}

/// Panel and clock state as the script moves it.
#[derive(Debug, Clone)]
struct SimState {
    knobs: [u16; 4],
    subdivision: Subdivision,
    glitch: bool,
    /// Tempo of the simulated clock master, if it is running
    clock_bpm: Option<f64>,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            knobs: [512, 0, 0, RAW_MAX],
            subdivision: Subdivision::Sixteenth,
            glitch: false,
            clock_bpm: None,
        }
    }
}

impl SimState {
    fn frame(&self) -> ControlFrame {
        ControlFrame::new(
            self.knobs[0],
            self.knobs[1],
            self.knobs[2],
            self.knobs[3],
            self.subdivision,
            self.glitch,
        )
    }
}

impl Simulator {
    pub fn new(clock: SessionClock, tx: Sender<SeqEvent>) -> Self {
        Self { clock, tx }
    }

    /// Run the named demo, then hold the final panel state until the
    /// coordinator shuts down. Blocks the calling thread.
    pub fn run(&mut self, demo: &str) {
        let gestures = demo_sequence(demo);
        info!("Simulator starting '{}' demo ({} gestures)...", demo, gestures.len());
        let mut state = SimState::default();

        if !self.play(&gestures, &mut state) {
            return;
        }

        info!("Demo sequence complete. Holding final state...");
        while self.advance(&state, CONTROL_CYCLE_MS) {}
    }

    /// Execute gestures in order. Returns false once the receiver is gone.
    pub fn run_gestures(&mut self, gestures: &[Gesture]) -> bool {
        let mut state = SimState::default();
        self.play(gestures, &mut state)
    }

    fn play(&mut self, gestures: &[Gesture], state: &mut SimState) -> bool {
        for gesture in gestures {
            if !self.execute(gesture, state) {
                return false;
            }
        }
        true
    }

    fn execute(&mut self, gesture: &Gesture, state: &mut SimState) -> bool {
        match gesture {
            Gesture::Hold { ms } => {
                info!("  hold {}ms", ms);
                self.advance(state, *ms as u64)
            }

            Gesture::Set { knob, value } => {
                info!("  {:?} → {}", knob, value);
                state.knobs[knob.index()] = (*value).min(RAW_MAX);
                self.advance(state, 0)
            }

            Gesture::Sweep { knob, to, ms } => {
                let from = state.knobs[knob.index()];
                info!("  sweep {:?} {} → {} over {}ms", knob, from, to, ms);
                let cycles = (*ms as u64 / CONTROL_CYCLE_MS).max(1);
                for i in 1..=cycles {
                    let t = i as f32 / cycles as f32;
                    state.knobs[knob.index()] = lerp(from, (*to).min(RAW_MAX), t);
                    if !self.advance(state, CONTROL_CYCLE_MS) {
                        return false;
                    }
                }
                true
            }

            Gesture::Subdivide(sub) => {
                info!("  subdivision {:?}", sub);
                state.subdivision = *sub;
                self.advance(state, 0)
            }

            Gesture::Glitch(on) => {
                info!("  glitch {}", if *on { "on" } else { "off" });
                state.glitch = *on;
                self.advance(state, 0)
            }

            Gesture::PressButton => {
                info!("  transport button");
                self.send(SeqEvent::TransportEdge { at_ms: self.clock.now_ms() })
            }

            Gesture::ClockOn { bpm } => {
                info!("  external clock on at {:.1} BPM", bpm);
                state.clock_bpm = Some(bpm.max(1.0));
                true
            }

            Gesture::ClockOff => {
                info!("  external clock off");
                state.clock_bpm = None;
                true
            }

            Gesture::ExternalStart => {
                info!("  external start");
                self.send(SeqEvent::Start { at_ms: self.clock.now_ms() })
            }

            Gesture::ExternalStop => {
                info!("  external stop");
                self.send(SeqEvent::Stop { at_ms: self.clock.now_ms() })
            }
        }
    }

    /// Let `ms` of wall time pass: sample the panel every control cycle and
    /// emit clock pulses if the simulated master is running.
    fn advance(&mut self, state: &SimState, ms: u64) -> bool {
        let start = self.clock.now_ms();
        let end = start + ms;
        let pulse_ms = state.clock_bpm.map(|bpm| 60_000.0 / bpm / PULSES_PER_QUARTER as f64);
        let mut next_pulse = start as f64;
        let mut next_control = start;

        loop {
            let now = self.clock.now_ms();
            if let Some(p) = pulse_ms {
                while next_pulse <= now as f64 {
                    if !self.send(SeqEvent::ClockPulse { at_ms: now }) {
                        return false;
                    }
                    next_pulse += p;
                }
            }
            if now >= next_control {
                if !self.send(SeqEvent::Controls(state.frame())) {
                    return false;
                }
                next_control = now + CONTROL_CYCLE_MS;
            }
            if now >= end {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn send(&self, event: SeqEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

// ─── Gesture types ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    Hold { ms: u32 },
    Set { knob: Knob, value: u16 },
    Sweep { knob: Knob, to: u16, ms: u32 },
    Subdivide(Subdivision),
    Glitch(bool),
    PressButton,
    /// Start the simulated clock master (pulses keep running across gestures)
    ClockOn { bpm: f64 },
    /// Silence the clock master
    ClockOff,
    ExternalStart,
    ExternalStop,
}

/// Demo scripts: "basic" (internal clock), "external" (slaved, with a
/// dropout), "glitch" (glitch parameters on). Unknown names fall back to basic.
pub fn demo_sequence(name: &str) -> Vec<Gesture> {
    match name {
        "external" => external_demo(),
        "glitch" => glitch_demo(),
        _ => basic_demo(),
    }
}

fn basic_demo() -> Vec<Gesture> {
    vec![
        Gesture::Set { knob: Knob::Tempo, value: 512 },
        Gesture::Set { knob: Knob::Probability, value: 700 },
        Gesture::Set { knob: Knob::VelocityLow, value: 400 },
        Gesture::Set { knob: Knob::VelocityHigh, value: 1000 },
        Gesture::Hold { ms: 200 },
        Gesture::PressButton,
        Gesture::Hold { ms: 4000 },
        // Push the tempo up while it plays
        Gesture::Sweep { knob: Knob::Tempo, to: 760, ms: 3000 },
        Gesture::Subdivide(Subdivision::ThirtySecond),
        Gesture::Hold { ms: 2000 },
        // Thin it out
        Gesture::Sweep { knob: Knob::Probability, to: 150, ms: 2000 },
        Gesture::Subdivide(Subdivision::Sixteenth),
        Gesture::Hold { ms: 2000 },
        Gesture::PressButton,
        Gesture::Hold { ms: 500 },
    ]
}

fn external_demo() -> Vec<Gesture> {
    vec![
        Gesture::Set { knob: Knob::Probability, value: 900 },
        Gesture::Set { knob: Knob::VelocityLow, value: 600 },
        Gesture::ClockOn { bpm: 100.0 },
        Gesture::Hold { ms: 300 },
        Gesture::ExternalStart,
        Gesture::Hold { ms: 4000 },
        Gesture::Subdivide(Subdivision::Eighth),
        Gesture::Hold { ms: 2000 },
        // Cable pulled: sequencer must fall back and stop
        Gesture::ClockOff,
        Gesture::Hold { ms: 1000 },
        Gesture::ClockOn { bpm: 128.0 },
        Gesture::Subdivide(Subdivision::Sixteenth),
        Gesture::ExternalStart,
        Gesture::Hold { ms: 3000 },
        Gesture::ExternalStop,
        Gesture::ClockOff,
        Gesture::Hold { ms: 1000 },
    ]
}

fn glitch_demo() -> Vec<Gesture> {
    vec![
        Gesture::Set { knob: Knob::Tempo, value: 600 },
        Gesture::Set { knob: Knob::Probability, value: 1023 },
        Gesture::Glitch(true),
        Gesture::PressButton,
        Gesture::Hold { ms: 3000 },
        Gesture::Sweep { knob: Knob::VelocityHigh, to: 300, ms: 1500 },
        Gesture::Glitch(false),
        Gesture::Hold { ms: 1500 },
        Gesture::PressButton,
        Gesture::Hold { ms: 300 },
    ]
}

// ─── Math helpers ───────────────────────────────────────────────────────────

fn lerp(a: u16, b: u16, t: f32) -> u16 {
    (a as f32 + (b as f32 - a as f32) * t).round() as u16
}
