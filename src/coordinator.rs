use crate::midi::MidiMessage;
use crate::sequencer::{StepReport, StepSequencer};
use crate::types::*;
use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, trace};
use rand::rngs::StdRng;
use rand::Rng;

/// The coordinator is the only owner of the sequencer. Every producer
/// (timer, clock input, button, control sampler) sends `SeqEvent`s into one
/// channel, and the coordinator applies them one at a time, so a tick can
/// never interleave with a transport toggle or a half-written control sample.
///
/// Outputs fan out to two kinds of consumers:
/// - MIDI sinks (serial port writer, monitor) get each message of a hit in order
/// - status sinks (console display, event logger) get a `StatusFrame` for
///   every qualifying tick and every transport or clock-mode change
pub struct Coordinator<R: Rng = StdRng> {
    event_rx: Receiver<SeqEvent>,
    midi_txs: Vec<Sender<MidiMessage>>,
    status_txs: Vec<Sender<StatusFrame>>,
    sequencer: StepSequencer<R>,
    tick_count: u64,
    hit_count: u64,
}

impl<R: Rng> Coordinator<R> {
    pub fn new(
        event_rx: Receiver<SeqEvent>,
        midi_txs: Vec<Sender<MidiMessage>>,
        status_txs: Vec<Sender<StatusFrame>>,
        sequencer: StepSequencer<R>,
    ) -> Self {
        Self {
            event_rx,
            midi_txs,
            status_txs,
            sequencer,
            tick_count: 0,
            hit_count: 0,
        }
    }

    pub fn sequencer(&self) -> &StepSequencer<R> {
        &self.sequencer
    }

    /// Process events until every sender is dropped. Blocks the calling thread.
    pub fn run(&mut self) {
        info!(
            "Coordinator running ({} voices, {:.1} BPM, {:?})",
            self.sequencer.pool().len(),
            self.sequencer.tempo().bpm,
            self.sequencer.subdivision()
        );

        while let Ok(event) = self.event_rx.recv() {
            self.process(event);
        }

        info!(
            "Coordinator shutting down after {} ticks, {} hits",
            self.tick_count, self.hit_count
        );
    }

    /// Apply one event and publish whatever it produced.
    pub fn process(&mut self, event: SeqEvent) {
        let before = self.sequencer.state();
        let report = self.sequencer.handle(event);
        let after = self.sequencer.state();

        match report {
            Some(report) => self.publish_tick(report, after.transport),
            None => {
                if before.transport != after.transport || before.clock_mode != after.clock_mode {
                    let frame = StatusFrame {
                        timestamp_ms: event.at_ms().unwrap_or(0),
                        transport: after.transport,
                        clock_mode: after.clock_mode,
                        step: after.step,
                        steps: self.sequencer.subdivision().steps_per_beat(),
                        indicator: self.sequencer.indicator(),
                        tick: false,
                        hit: None,
                    };
                    trace!("State change: {}", frame);
                    self.broadcast_status(frame);
                }
            }
        }
    }

    fn publish_tick(&mut self, report: StepReport, transport: Transport) {
        self.tick_count += 1;
        let hit = report.fire.as_ref().map(|f| f.hit);
        if let Some(fire) = report.fire {
            self.hit_count += 1;
            for msg in fire.messages {
                for tx in &self.midi_txs {
                    let _ = tx.send(msg);
                }
            }
        }

        self.broadcast_status(StatusFrame {
            timestamp_ms: report.at_ms,
            transport,
            clock_mode: report.clock_mode,
            step: report.step,
            steps: self.sequencer.subdivision().steps_per_beat(),
            indicator: report.indicator,
            tick: true,
            hit,
        });

        if self.tick_count.is_multiple_of(256) {
            debug!("Coordinator: {} ticks, {} hits", self.tick_count, self.hit_count);
        }
    }

    fn broadcast_status(&self, frame: StatusFrame) {
        for tx in &self.status_txs {
            let _ = tx.send(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::RandomEventGenerator;
    use crate::voices::default_kit;
    use crossbeam_channel::unbounded;

    fn coordinator() -> (
        Coordinator,
        Sender<SeqEvent>,
        Receiver<MidiMessage>,
        Receiver<StatusFrame>,
    ) {
        let (ev_tx, ev_rx) = unbounded();
        let (midi_tx, midi_rx) = unbounded();
        let (status_tx, status_rx) = unbounded();
        let seq = StepSequencer::new(RandomEventGenerator::seeded(DEFAULT_SEED), default_kit())
            .with_controls(ControlFrame::new(512, 1023, 800, 800, Subdivision::Sixteenth, false));
        (
            Coordinator::new(ev_rx, vec![midi_tx], vec![status_tx], seq),
            ev_tx,
            midi_rx,
            status_rx,
        )
    }

    #[test]
    fn test_state_change_publishes_status() {
        let (mut c, _tx, midi_rx, status_rx) = coordinator();
        c.process(SeqEvent::TransportEdge { at_ms: 5 });
        let frame = status_rx.try_recv().unwrap();
        assert_eq!(frame.transport, Transport::Playing);
        assert!(!frame.tick);
        assert_eq!(frame.timestamp_ms, 5);
        assert!(midi_rx.try_recv().is_err());
    }

    #[test]
    fn test_tick_publishes_messages_and_status() {
        let (mut c, _tx, midi_rx, status_rx) = coordinator();
        c.process(SeqEvent::TransportEdge { at_ms: 0 });
        let _ = status_rx.try_recv();
        for t in 1..=125 {
            c.process(SeqEvent::Timer { at_ms: t });
        }
        let msgs: Vec<MidiMessage> = midi_rx.try_iter().collect();
        assert_eq!(msgs.len(), 3);
        let frames: Vec<StatusFrame> = status_rx.try_iter().collect();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].tick);
        assert_eq!(frames[0].timestamp_ms, 125);
        assert_eq!(frames[0].hit.unwrap().velocity, 100);
    }

    #[test]
    fn test_quiet_events_publish_nothing() {
        let (mut c, _tx, midi_rx, status_rx) = coordinator();
        c.process(SeqEvent::Timer { at_ms: 1 });
        c.process(SeqEvent::Controls(ControlFrame::default()));
        assert!(midi_rx.try_recv().is_err());
        assert!(status_rx.try_recv().is_err());
    }

    #[test]
    fn test_run_exits_when_senders_drop() {
        let (mut c, tx, _midi_rx, _status_rx) = coordinator();
        tx.send(SeqEvent::Start { at_ms: 0 }).unwrap();
        drop(tx);
        c.run();
        assert_eq!(c.sequencer().state().transport, Transport::Playing);
    }
}
