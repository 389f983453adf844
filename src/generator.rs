use crate::midi::MidiMessage;
use crate::params::{ProbabilityConfig, VelocityConfig};
use crate::types::{Hit, DRUM_CHANNEL, RAW_MAX};
use crate::voices::{controller, VoicePool};
use log::{trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// First of the per-voice level controllers; voice `i` uses `base + i`.
pub const DEFAULT_BASE_PARAM_CC: u8 = 40;

/// Firing rule for one step. A zero threshold never fires; otherwise the
/// step fires when the roll does not exceed it, so 1023 always fires.
pub fn should_fire(probability: u16, roll: u16) -> bool {
    probability > 0 && roll <= probability
}

/// Outcome of a step that fired: which voice, and the messages to send in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Fire {
    pub hit: Hit,
    pub messages: Vec<MidiMessage>,
}

/// Decides per step whether a hit happens and, if so, what to send.
pub struct RandomEventGenerator<R: Rng = StdRng> {
    rng: R,
    base_param_cc: u8,
    stack_glitch: bool,
}

impl RandomEventGenerator<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl<R: Rng> RandomEventGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            base_param_cc: DEFAULT_BASE_PARAM_CC,
            stack_glitch: false,
        }
    }

    pub fn with_base_param_cc(mut self, cc: u8) -> Self {
        self.base_param_cc = cc.min(127);
        self
    }

    /// Reproduce the fall-through stacking of glitch parameters.
    pub fn with_stacked_glitch(mut self, stacked: bool) -> Self {
        self.stack_glitch = stacked;
        self
    }

    /// Roll for one step.
    ///
    /// On a hit the messages are: the voice's level CC (value = velocity),
    /// note-on, an immediate note-off at velocity 0, then any glitch CCs.
    pub fn fire(
        &mut self,
        probability: ProbabilityConfig,
        velocity: VelocityConfig,
        pool: &VoicePool,
        glitch: bool,
    ) -> Option<Fire> {
        let roll: u16 = self.rng.gen_range(0..=RAW_MAX);
        if !should_fire(probability.threshold(), roll) {
            trace!("roll {} > threshold {}", roll, probability.threshold());
            return None;
        }

        let index = self.rng.gen_range(0..pool.len());
        let voice = pool.get(index)?;
        let vel = velocity.min + self.rng.gen_range(0..=velocity.range());
        let Some(level_cc) = controller(self.base_param_cc, index) else {
            warn!("no level controller for voice {} above base {}", index, self.base_param_cc);
            return None;
        };

        let mut messages = vec![
            MidiMessage::ControlChange {
                channel: DRUM_CHANNEL,
                controller: level_cc,
                value: vel,
            },
            MidiMessage::NoteOn {
                channel: DRUM_CHANNEL,
                note: voice.note,
                velocity: vel,
            },
            MidiMessage::NoteOff {
                channel: DRUM_CHANNEL,
                note: voice.note,
                velocity: 0,
            },
        ];

        if glitch {
            for param in voice.kind.glitch_params(self.stack_glitch) {
                let Some(cc) = param.cc(index) else {
                    continue;
                };
                messages.push(MidiMessage::ControlChange {
                    channel: DRUM_CHANNEL,
                    controller: cc,
                    value: self.rng.gen_range(0..=127),
                });
            }
        }

        Some(Fire {
            hit: Hit {
                voice: index,
                note: voice.note,
                velocity: vel,
            },
            messages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_SEED;
    use crate::voices::{default_kit, Voice, VoiceKind};

    fn single(kind: VoiceKind, note: u8) -> VoicePool {
        VoicePool::new(vec![Voice::new("Solo", kind, note)]).unwrap()
    }

    #[test]
    fn test_should_fire_boundaries() {
        for roll in 0..=RAW_MAX {
            assert!(!should_fire(0, roll), "p=0 fired on roll {}", roll);
            assert!(should_fire(RAW_MAX, roll), "p=1023 missed roll {}", roll);
        }
        assert!(should_fire(500, 500));
        assert!(!should_fire(500, 501));
        assert!(should_fire(1, 0));
    }

    #[test]
    fn test_zero_probability_never_fires() {
        let mut g = RandomEventGenerator::seeded(DEFAULT_SEED);
        let kit = default_kit();
        for _ in 0..5000 {
            let f = g.fire(ProbabilityConfig::new(0), VelocityConfig::default(), &kit, true);
            assert!(f.is_none());
        }
    }

    #[test]
    fn test_full_probability_always_fires() {
        let mut g = RandomEventGenerator::seeded(DEFAULT_SEED);
        let kit = default_kit();
        for _ in 0..5000 {
            let f = g.fire(ProbabilityConfig::new(1023), VelocityConfig::default(), &kit, false);
            assert!(f.is_some());
        }
    }

    #[test]
    fn test_velocity_within_bounds() {
        let mut g = RandomEventGenerator::seeded(DEFAULT_SEED);
        let kit = default_kit();
        let vel = VelocityConfig::new(30, 90);
        let mut seen_min = false;
        let mut seen_max = false;
        for _ in 0..5000 {
            let f = g.fire(ProbabilityConfig::new(1023), vel, &kit, false).unwrap();
            assert!((30..=90).contains(&f.hit.velocity), "velocity {}", f.hit.velocity);
            seen_min |= f.hit.velocity == 30;
            seen_max |= f.hit.velocity == 90;
        }
        assert!(seen_min && seen_max, "inclusive range should reach both ends");
    }

    #[test]
    fn test_crossed_velocity_knobs_yield_min() {
        let mut g = RandomEventGenerator::seeded(DEFAULT_SEED);
        let kit = default_kit();
        let vel = VelocityConfig::new(100, 20);
        for _ in 0..1000 {
            let f = g.fire(ProbabilityConfig::new(1023), vel, &kit, false).unwrap();
            assert_eq!(f.hit.velocity, 100);
        }
    }

    #[test]
    fn test_message_order_single_voice() {
        let mut g = RandomEventGenerator::seeded(DEFAULT_SEED);
        let pool = single(VoiceKind::Kick, 36);
        let f = g
            .fire(ProbabilityConfig::new(1023), VelocityConfig::new(100, 100), &pool, false)
            .unwrap();
        assert_eq!(
            f.messages,
            vec![
                MidiMessage::ControlChange { channel: 9, controller: DEFAULT_BASE_PARAM_CC, value: 100 },
                MidiMessage::NoteOn { channel: 9, note: 36, velocity: 100 },
                MidiMessage::NoteOff { channel: 9, note: 36, velocity: 0 },
            ]
        );
    }

    #[test]
    fn test_param_cc_follows_voice_index() {
        let mut g = RandomEventGenerator::seeded(DEFAULT_SEED).with_base_param_cc(20);
        let kit = default_kit();
        for _ in 0..200 {
            let f = g.fire(ProbabilityConfig::new(1023), VelocityConfig::default(), &kit, false).unwrap();
            match f.messages[0] {
                MidiMessage::ControlChange { controller, .. } => {
                    assert_eq!(controller as usize, 20 + f.hit.voice)
                }
                other => panic!("expected CC first, got {:?}", other),
            }
            assert_eq!(f.hit.note, kit.get(f.hit.voice).unwrap().note);
        }
    }

    #[test]
    fn test_level_cc_distinct_per_voice() {
        let voices: Vec<Voice> = (0..40)
            .map(|i| Voice::new(&format!("Kick {}", i), VoiceKind::Kick, 36))
            .collect();
        let pool = VoicePool::new(voices).unwrap();
        let mut g = RandomEventGenerator::seeded(DEFAULT_SEED).with_base_param_cc(80);
        for _ in 0..500 {
            let f = g.fire(ProbabilityConfig::new(1023), VelocityConfig::default(), &pool, false).unwrap();
            match f.messages[0] {
                MidiMessage::ControlChange { controller, .. } => {
                    assert_eq!(controller as usize, 80 + f.hit.voice)
                }
                other => panic!("expected CC first, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_glitch_normalized_one_block_per_voice() {
        let mut g = RandomEventGenerator::seeded(DEFAULT_SEED);
        let tom = single(VoiceKind::Tom, 43);
        let f = g.fire(ProbabilityConfig::new(1023), VelocityConfig::default(), &tom, true).unwrap();
        assert_eq!(f.messages.len(), 4);
        let hat = single(VoiceKind::Hat, 42);
        let f = g.fire(ProbabilityConfig::new(1023), VelocityConfig::default(), &hat, true).unwrap();
        assert_eq!(f.messages.len(), 5);
    }

    #[test]
    fn test_glitch_stacked_fall_through() {
        let mut g = RandomEventGenerator::seeded(DEFAULT_SEED).with_stacked_glitch(true);
        let tom = single(VoiceKind::Tom, 43);
        let f = g.fire(ProbabilityConfig::new(1023), VelocityConfig::default(), &tom, true).unwrap();
        assert_eq!(f.messages.len(), 3 + 4);
    }

    #[test]
    fn test_glitch_disabled_adds_nothing() {
        let mut g = RandomEventGenerator::seeded(DEFAULT_SEED);
        let hat = single(VoiceKind::Hat, 42);
        let f = g.fire(ProbabilityConfig::new(1023), VelocityConfig::default(), &hat, false).unwrap();
        assert_eq!(f.messages.len(), 3);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let kit = default_kit();
        let run = || {
            let mut g = RandomEventGenerator::seeded(42);
            (0..64)
                .map(|_| g.fire(ProbabilityConfig::new(600), VelocityConfig::new(10, 120), &kit, true))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
