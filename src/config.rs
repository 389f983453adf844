//! Persistent sequencer settings: random seed, controller layout, and kit.
//!
//! Everything here is fixed for the life of a session. Knob positions and
//! switches are not stored; they arrive every control cycle as a `ControlFrame`.

use crate::generator::{RandomEventGenerator, DEFAULT_BASE_PARAM_CC};
use crate::sequencer::StepSequencer;
use crate::types::ControlFrame;
use crate::voices::{default_kit, VoicePool};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Fixed seed for reproducible runs; None draws one from the OS.
    pub seed: Option<u64>,
    /// Level controller of voice 0; voice i uses `base_param_cc + i`
    pub base_param_cc: u8,
    /// Stack glitch parameters through the Tom → Hat → Percussion fall-through
    pub stack_glitch: bool,
    pub voices: VoicePool,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            seed: None,
            base_param_cc: DEFAULT_BASE_PARAM_CC,
            stack_glitch: false,
            voices: default_kit(),
        }
    }
}

impl SequencerConfig {
    /// Load from a JSON file. Returns None if file is absent, malformed,
    /// or maps two voices onto one controller.
    pub fn load(path: &Path) -> Option<Self> {
        let data = std::fs::read_to_string(path).ok()?;
        let config: Self = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to parse sequencer config {:?}: {}", path, e);
                return None;
            }
        };
        if let Err(e) = config.validate() {
            warn!("Invalid sequencer config {:?}: {}", path, e);
            return None;
        }
        info!("Loaded sequencer config from {:?}", path);
        Some(config)
    }

    /// Level controllers `base_param_cc..base_param_cc + voices` must all be 7-bit.
    pub fn validate(&self) -> Result<(), String> {
        self.voices.check_level_base(self.base_param_cc)
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        std::fs::write(path, json)?;
        info!("Sequencer config saved to {:?}", path);
        Ok(())
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        if seed.is_some() {
            self.seed = seed;
        }
        self
    }

    pub fn generator(&self) -> RandomEventGenerator {
        let generator = match self.seed {
            Some(seed) => RandomEventGenerator::seeded(seed),
            None => RandomEventGenerator::from_entropy(),
        };
        generator
            .with_base_param_cc(self.base_param_cc)
            .with_stacked_glitch(self.stack_glitch)
    }

    /// Sequencer in its power-on state with the given panel settings.
    pub fn sequencer(&self, controls: ControlFrame) -> StepSequencer {
        StepSequencer::new(self.generator(), self.voices.clone()).with_controls(controls)
    }
}
