//! MIDI wire format: the three channel messages the sequencer emits and the
//! system-realtime bytes it listens for.

use crate::types::SeqEvent;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outbound channel message. `channel` is the zero-based nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MidiMessage {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
}

impl MidiMessage {
    /// Encode as a three-byte wire message. Data bytes are masked to 7 bits.
    pub fn to_bytes(&self) -> [u8; 3] {
        match *self {
            MidiMessage::NoteOn { channel, note, velocity } => {
                [0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::NoteOff { channel, note, velocity } => {
                [0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::ControlChange { channel, controller, value } => {
                [0xB0 | (channel & 0x0F), controller & 0x7F, value & 0x7F]
            }
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [s, d1, d2] = self.to_bytes();
        match *self {
            MidiMessage::NoteOn { channel, note, velocity } => write!(
                f,
                "[{:02X} {:02X} {:02X}] note-on  ch{:<2} note={:<3} vel={}",
                s, d1, d2, channel + 1, note, velocity
            ),
            MidiMessage::NoteOff { channel, note, velocity } => write!(
                f,
                "[{:02X} {:02X} {:02X}] note-off ch{:<2} note={:<3} vel={}",
                s, d1, d2, channel + 1, note, velocity
            ),
            MidiMessage::ControlChange { channel, controller, value } => write!(
                f,
                "[{:02X} {:02X} {:02X}] cc       ch{:<2} cc={:<3}   val={}",
                s, d1, d2, channel + 1, controller, value
            ),
        }
    }
}

/// System-realtime messages the sequencer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealtimeMessage {
    Clock,
    Start,
    Continue,
    Stop,
}

impl RealtimeMessage {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0xF8 => Some(RealtimeMessage::Clock),
            0xFA => Some(RealtimeMessage::Start),
            0xFB => Some(RealtimeMessage::Continue),
            0xFC => Some(RealtimeMessage::Stop),
            _ => None,
        }
    }

    /// Map onto a sequencer event. Continue restarts from the downbeat
    /// because no song position is kept.
    pub fn to_event(self, at_ms: u64) -> SeqEvent {
        match self {
            RealtimeMessage::Clock => SeqEvent::ClockPulse { at_ms },
            RealtimeMessage::Start | RealtimeMessage::Continue => SeqEvent::Start { at_ms },
            RealtimeMessage::Stop => SeqEvent::Stop { at_ms },
        }
    }
}

/// Pulls realtime bytes out of an inbound byte stream.
///
/// Realtime bytes may appear anywhere, including between the data bytes of
/// another message, so every other byte is simply skipped.
#[derive(Debug, Default)]
pub struct RealtimeParser {
    skipped: u64,
}

impl RealtimeParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Vec<RealtimeMessage> {
        let mut out = Vec::new();
        for &b in bytes {
            match RealtimeMessage::from_byte(b) {
                Some(msg) => out.push(msg),
                None => self.skipped += 1,
            }
        }
        out
    }

    /// Number of non-realtime bytes ignored so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_channel_ten() {
        let on = MidiMessage::NoteOn { channel: 9, note: 36, velocity: 100 };
        assert_eq!(on.to_bytes(), [0x99, 36, 100]);
        let off = MidiMessage::NoteOff { channel: 9, note: 36, velocity: 0 };
        assert_eq!(off.to_bytes(), [0x89, 36, 0]);
        let cc = MidiMessage::ControlChange { channel: 9, controller: 40, value: 127 };
        assert_eq!(cc.to_bytes(), [0xB9, 40, 127]);
    }

    #[test]
    fn test_encode_masks_data_bytes() {
        let on = MidiMessage::NoteOn { channel: 9, note: 200, velocity: 255 };
        let bytes = on.to_bytes();
        assert!(bytes[1] < 0x80 && bytes[2] < 0x80);
    }

    #[test]
    fn test_realtime_from_byte() {
        assert_eq!(RealtimeMessage::from_byte(0xF8), Some(RealtimeMessage::Clock));
        assert_eq!(RealtimeMessage::from_byte(0xFA), Some(RealtimeMessage::Start));
        assert_eq!(RealtimeMessage::from_byte(0xFB), Some(RealtimeMessage::Continue));
        assert_eq!(RealtimeMessage::from_byte(0xFC), Some(RealtimeMessage::Stop));
        assert_eq!(RealtimeMessage::from_byte(0xFE), None); // active sensing
        assert_eq!(RealtimeMessage::from_byte(0x90), None);
    }

    #[test]
    fn test_continue_maps_to_start() {
        assert_eq!(
            RealtimeMessage::Continue.to_event(7),
            SeqEvent::Start { at_ms: 7 }
        );
        assert_eq!(
            RealtimeMessage::Clock.to_event(3),
            SeqEvent::ClockPulse { at_ms: 3 }
        );
    }

    #[test]
    fn test_parser_picks_realtime_out_of_running_message() {
        let mut p = RealtimeParser::new();
        // Note-on split by a clock byte, then start and stop
        let msgs = p.feed(&[0x90, 0x24, 0xF8, 0x64, 0xFA, 0xF8, 0xFC]);
        assert_eq!(
            msgs,
            vec![
                RealtimeMessage::Clock,
                RealtimeMessage::Start,
                RealtimeMessage::Clock,
                RealtimeMessage::Stop,
            ]
        );
        assert_eq!(p.skipped(), 3);
    }
}
