use crate::midi::MidiMessage;
use crossbeam_channel::Receiver;
use log::{debug, info};

/// Logs outbound MIDI when no serial port is attached.
pub struct MidiMonitor {
    rx: Receiver<MidiMessage>,
}

impl MidiMonitor {
    pub fn new(rx: Receiver<MidiMessage>) -> Self {
        Self { rx }
    }

    /// Run until the coordinator closes the channel. Blocks the calling thread.
    pub fn run(&self) {
        info!("MIDI monitor listening");
        let mut notes: u64 = 0;
        let mut controls: u64 = 0;

        for msg in self.rx.iter() {
            match msg {
                MidiMessage::NoteOn { .. } => notes += 1,
                MidiMessage::ControlChange { .. } => controls += 1,
                MidiMessage::NoteOff { .. } => {}
            }
            debug!("MIDI out {}", msg);
            if notes > 0 && notes.is_multiple_of(100) && matches!(msg, MidiMessage::NoteOn { .. }) {
                info!("MIDI monitor: {} notes, {} control changes", notes, controls);
            }
        }
        info!("MIDI monitor shutting down ({} notes, {} control changes)", notes, controls);
    }
}
