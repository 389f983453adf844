use crate::types::*;
use crossbeam_channel::Receiver;
use std::io::{self, Write};

/// Renders a live one-line status strip of the sequencer.
pub struct ConsoleDisplay {
    rx: Receiver<StatusFrame>,
}

impl ConsoleDisplay {
    pub fn new(rx: Receiver<StatusFrame>) -> Self {
        Self { rx }
    }

    pub fn run(&self) {
        let mut stdout = io::stdout();
        for frame in self.rx.iter() {
            // Carriage return: redraw in place
            print!("\r{}\x1b[K", render(&frame));
            let _ = stdout.flush();
        }
        println!();
    }
}

/// One status line: mode, transport, a step strip with the current step
/// highlighted, the beat LED, and the last hit.
pub fn render(frame: &StatusFrame) -> String {
    let mode = match frame.clock_mode {
        ClockMode::Internal => "INT",
        ClockMode::External => "EXT",
    };
    let transport = match frame.transport {
        Transport::Playing => "▶",
        Transport::Stopped => "■",
    };
    let led = if frame.indicator { "●" } else { "○" };
    let hit = match frame.hit {
        Some(h) => format!("v{} n{:<3} {:>3}", h.voice, h.note, h.velocity),
        None => String::from("   ·      "),
    };
    format!(
        "{} {} [{}] {}  {}",
        mode,
        transport,
        make_strip(frame.step, frame.steps, frame.transport.is_playing()),
        led,
        hit
    )
}

fn make_strip(step: u8, steps: u8, playing: bool) -> String {
    (0..steps)
        .map(|i| if playing && i == step { '█' } else { '░' })
        .collect()
}
