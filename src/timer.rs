use crate::types::*;
use crossbeam_channel::{tick, Sender};
use log::{info, warn};
use std::time::Duration;

/// Periodic timer standing in for the board's 1 kHz interrupt. Drives
/// internal step timing and the external-clock staleness check.
pub struct StepTimer {
    clock: SessionClock,
    tx: Sender<SeqEvent>,
    period: Duration,
}

impl StepTimer {
    pub fn new(clock: SessionClock, tx: Sender<SeqEvent>, rate_hz: u32) -> Self {
        let rate_hz = rate_hz.clamp(100, 10_000);
        Self {
            clock,
            tx,
            period: Duration::from_micros(1_000_000 / rate_hz as u64),
        }
    }

    /// Run until the coordinator goes away. Blocks the calling thread.
    pub fn run(&self) {
        info!("Step timer running every {:?}", self.period);
        let ticker = tick(self.period);
        let mut missed: u64 = 0;

        for _ in ticker.iter() {
            let event = SeqEvent::Timer {
                at_ms: self.clock.now_ms(),
            };
            match self.tx.try_send(event) {
                Ok(()) => {}
                Err(crossbeam_channel::TrySendError::Full(_)) => {
                    // Dropping a tick is harmless: the next one sees the
                    // same or later elapsed time
                    missed += 1;
                    if missed.is_multiple_of(1000) {
                        warn!("Step timer: {} ticks dropped, coordinator falling behind", missed);
                    }
                }
                Err(crossbeam_channel::TrySendError::Disconnected(_)) => break,
            }
        }
        info!("Step timer stopped");
    }
}
