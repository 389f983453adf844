use crate::midi::{MidiMessage, RealtimeParser};
use crate::types::*;
use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info, warn};
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::Duration;

/// Standard DIN MIDI line rate. USB-serial bridges usually accept it as-is.
pub const MIDI_BAUD: u32 = 31_250;

/// Open the serial MIDI port and split it into an input half (realtime
/// bytes → `SeqEvent`s) and an output half (`MidiMessage`s → bytes).
pub fn open(
    port_name: &str,
    baud_rate: u32,
    event_tx: Sender<SeqEvent>,
    midi_rx: Receiver<MidiMessage>,
    clock: SessionClock,
) -> Result<(MidiIn, MidiOut), serialport::Error> {
    info!("Opening serial MIDI port: {} @ {}", port_name, baud_rate);
    let port = serialport::new(port_name, baud_rate)
        .timeout(Duration::from_millis(100))
        .open()?;
    let out_port = port.try_clone()?;
    info!("Serial MIDI port opened");

    Ok((
        MidiIn {
            port,
            tx: event_tx,
            clock,
        },
        MidiOut {
            port: out_port,
            rx: midi_rx,
        },
    ))
}

/// Reads clock, start, continue and stop from the wire.
pub struct MidiIn {
    port: Box<dyn SerialPort>,
    tx: Sender<SeqEvent>,
    clock: SessionClock,
}

impl MidiIn {
    /// Run the reader loop. Blocks the calling thread.
    pub fn run(&mut self) {
        let mut buf = [0u8; 64];
        let mut parser = RealtimeParser::new();
        let mut pulse_count: u64 = 0;

        loop {
            match self.port.read(&mut buf) {
                Ok(n) => {
                    // Stamp arrival with the host clock
                    let at_ms = self.clock.now_ms();
                    for msg in parser.feed(&buf[..n]) {
                        let event = msg.to_event(at_ms);
                        if matches!(event, SeqEvent::ClockPulse { .. }) {
                            pulse_count += 1;
                            if pulse_count.is_multiple_of(24 * 64) {
                                debug!(
                                    "MIDI in: {} clock pulses, {} other bytes skipped",
                                    pulse_count,
                                    parser.skipped()
                                );
                            }
                        } else {
                            info!("MIDI in: {:?}", msg);
                        }
                        if self.tx.send(event).is_err() {
                            info!("MIDI in shutting down");
                            return;
                        }
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => {
                    continue;
                }
                Err(e) => {
                    warn!("Serial read error: {}", e);
                    std::thread::sleep(Duration::from_millis(100));
                }
            }
        }
    }
}

/// Writes outbound messages to the synth, fire-and-forget.
pub struct MidiOut {
    port: Box<dyn SerialPort>,
    rx: Receiver<MidiMessage>,
}

impl MidiOut {
    /// Run the writer loop. Blocks the calling thread.
    pub fn run(&mut self) {
        let mut sent: u64 = 0;
        let mut errors: u64 = 0;

        for msg in self.rx.iter() {
            match self.port.write_all(&msg.to_bytes()) {
                Ok(()) => {
                    sent += 1;
                    debug!("MIDI out {}", msg);
                }
                Err(e) => {
                    errors += 1;
                    if errors == 1 || errors.is_multiple_of(100) {
                        error!("Serial write error ({} so far): {}", errors, e);
                    }
                }
            }
        }
        info!("MIDI out shutting down ({} sent, {} errors)", sent, errors);
    }
}
