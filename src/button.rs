use crate::types::*;
use crossbeam_channel::Sender;
use log::{info, warn};
use std::io::BufRead;

/// Transport button on the host keyboard: every line read (Enter) is one
/// falling edge. Bouncing is left to the sequencer's debounce guard.
pub struct TransportButton<B: BufRead> {
    input: B,
    clock: SessionClock,
    tx: Sender<SeqEvent>,
}

impl<B: BufRead> TransportButton<B> {
    pub fn new(input: B, clock: SessionClock, tx: Sender<SeqEvent>) -> Self {
        Self { input, clock, tx }
    }

    /// Read until EOF or until the coordinator goes away. Blocks the calling thread.
    pub fn run(&mut self) {
        info!("Press Enter to start/stop");
        let mut line = String::new();
        loop {
            line.clear();
            match self.input.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    let event = SeqEvent::TransportEdge {
                        at_ms: self.clock.now_ms(),
                    };
                    if self.tx.send(event).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Button input error: {}", e);
                    break;
                }
            }
        }
        info!("Transport button closed");
    }
}
