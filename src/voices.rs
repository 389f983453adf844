use serde::{Deserialize, Serialize};

/// Broad family of a drum voice. Decides which glitch parameters it takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoiceKind {
    Kick,
    Snare,
    Tom,
    Hat,
    Percussion,
}

/// Synth parameters the glitch extension randomizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlitchParam {
    Decay,
    Grain,
    Speed,
}

pub const DECAY_CC_BASE: u8 = 50;
pub const GRAIN_CC_BASE: u8 = 60;
pub const SPEED_CC_BASE: u8 = 70;

/// Highest 7-bit controller number.
pub const MAX_CC: u8 = 127;

/// Controller `base + voice_index`, or None past the 7-bit range.
pub fn controller(base: u8, voice_index: usize) -> Option<u8> {
    usize::from(base)
        .checked_add(voice_index)
        .and_then(|cc| u8::try_from(cc).ok())
        .filter(|&cc| cc <= MAX_CC)
}

impl GlitchParam {
    /// Controller number of this parameter for the voice at `voice_index`.
    pub fn cc(self, voice_index: usize) -> Option<u8> {
        let base = match self {
            GlitchParam::Decay => DECAY_CC_BASE,
            GlitchParam::Grain => GRAIN_CC_BASE,
            GlitchParam::Speed => SPEED_CC_BASE,
        };
        controller(base, voice_index)
    }
}

impl VoiceKind {
    /// Glitch parameters for this kind of voice.
    ///
    /// With `stacked` set the lookup falls through the Tom → Hat → Percussion
    /// cases the way the panel firmware's switch did, so a tom also picks up
    /// the hat and percussion parameters.
    pub fn glitch_params(self, stacked: bool) -> Vec<GlitchParam> {
        use GlitchParam::*;
        match (self, stacked) {
            (VoiceKind::Kick, _) | (VoiceKind::Snare, _) => vec![Decay],
            (VoiceKind::Tom, false) => vec![Decay],
            (VoiceKind::Tom, true) => vec![Decay, Decay, Grain, Speed],
            (VoiceKind::Hat, false) => vec![Decay, Grain],
            (VoiceKind::Hat, true) => vec![Decay, Grain, Speed],
            (VoiceKind::Percussion, _) => vec![Speed],
        }
    }
}

/// One drum sound on the synth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    pub kind: VoiceKind,
    /// Note number that triggers this voice
    pub note: u8,
}

impl Voice {
    pub fn new(name: &str, kind: VoiceKind, note: u8) -> Self {
        Self {
            name: name.to_string(),
            kind,
            note,
        }
    }
}

/// Ordered, non-empty set of voices the generator picks from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Voice>", into = "Vec<Voice>")]
pub struct VoicePool {
    voices: Vec<Voice>,
}

impl VoicePool {
    pub fn new(voices: Vec<Voice>) -> Result<Self, String> {
        if voices.is_empty() {
            return Err("voice pool is empty".to_string());
        }
        if let Some(v) = voices.iter().find(|v| v.note > 127) {
            return Err(format!("voice {} has note {} outside 0..=127", v.name, v.note));
        }
        // Stacked lookup is the superset, so the pool fits either glitch mode
        for (i, v) in voices.iter().enumerate() {
            if let Some(p) = v.kind.glitch_params(true).into_iter().find(|p| p.cc(i).is_none()) {
                return Err(format!(
                    "voice {} at index {} has no {:?} controller below {}",
                    v.name, i, p, MAX_CC + 1
                ));
            }
        }
        Ok(Self { voices })
    }

    /// Every voice needs its own level controller `base + index`.
    pub fn check_level_base(&self, base: u8) -> Result<(), String> {
        match controller(base, self.voices.len() - 1) {
            Some(_) => Ok(()),
            None => Err(format!(
                "level controllers {}..{} for {} voices exceed {}",
                base,
                usize::from(base) + self.voices.len(),
                self.voices.len(),
                MAX_CC
            )),
        }
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Voice> {
        self.voices.iter()
    }
}

impl TryFrom<Vec<Voice>> for VoicePool {
    type Error = String;

    fn try_from(voices: Vec<Voice>) -> Result<Self, Self::Error> {
        Self::new(voices)
    }
}

impl From<VoicePool> for Vec<Voice> {
    fn from(pool: VoicePool) -> Self {
        pool.voices
    }
}

impl Default for VoicePool {
    fn default() -> Self {
        default_kit()
    }
}

/// Eight-voice kit on GM drum notes.
pub fn default_kit() -> VoicePool {
    VoicePool {
        voices: vec![
            Voice::new("Kick", VoiceKind::Kick, 36),
            Voice::new("Snare", VoiceKind::Snare, 38),
            Voice::new("Low Tom", VoiceKind::Tom, 43),
            Voice::new("High Tom", VoiceKind::Tom, 50),
            Voice::new("Closed Hat", VoiceKind::Hat, 42),
            Voice::new("Open Hat", VoiceKind::Hat, 46),
            Voice::new("Clap", VoiceKind::Percussion, 39),
            Voice::new("Cowbell", VoiceKind::Percussion, 56),
        ],
    }
}
