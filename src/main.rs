use random_drummer::button::TransportButton;
use random_drummer::config::SequencerConfig;
use random_drummer::console_display;
use random_drummer::coordinator::Coordinator;
use random_drummer::event_logger::EventLogger;
use random_drummer::midi::MidiMessage;
use random_drummer::midi_monitor::MidiMonitor;
#[cfg(feature = "hardware")]
use random_drummer::midi_port;
use random_drummer::simulator;
use random_drummer::tempo::bpm_from_raw;
use random_drummer::timer::StepTimer;
use random_drummer::types::*;

use clap::Parser;
use crossbeam_channel::{bounded, Sender};
use log::{error, info};
use std::io;
use std::path::PathBuf;
use std::process;
use std::thread;

#[derive(Parser)]
#[command(name = "random-drummer")]
#[command(about = "Probabilistic drum step sequencer for a MIDI drum synth")]
struct Cli {
    /// Run in simulator mode (scripted panel + clock, no hardware required).
    /// Pass `--simulate false` to drive a synth on the serial port.
    #[arg(long, action = clap::ArgAction::Set, default_value_t = true)]
    simulate: bool,

    /// Serial MIDI port (e.g., /dev/ttyUSB0)
    #[arg(long, default_value = "/dev/ttyUSB0")]
    port: String,

    /// Serial baud rate
    #[arg(long, default_value_t = 31_250)]
    baud: u32,

    /// Random seed (overrides the config file; omit for a fresh seed each run)
    #[arg(long)]
    seed: Option<u64>,

    /// JSON sequencer config (seed, base parameter CC, glitch stacking, voices)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulator demo: "basic" (default), "external" (slaved clock with dropout), or "glitch"
    #[arg(long, default_value = "basic")]
    demo: String,

    /// Tempo knob, raw 0–1023 (hardware mode)
    #[arg(long, default_value_t = 512)]
    tempo: u16,

    /// Probability knob, raw 0–1023 (hardware mode)
    #[arg(long, default_value_t = 512)]
    probability: u16,

    /// Velocity-low knob, raw 0–1023 (hardware mode)
    #[arg(long, default_value_t = 0)]
    vel_low: u16,

    /// Velocity-high knob, raw 0–1023 (hardware mode)
    #[arg(long, default_value_t = 1023)]
    vel_high: u16,

    /// Steps per beat as a note value: 8, 16 or 32
    #[arg(long, default_value_t = 16)]
    subdivision: u8,

    /// Enable glitch parameter randomization
    #[arg(long)]
    glitch: bool,

    /// Live status line on the terminal
    #[arg(long)]
    console: bool,

    /// Write a JSONL event log of the session
    #[arg(long)]
    log_events: bool,

    /// Output directory for logged sessions
    #[arg(long, default_value = "./sessions")]
    output_dir: PathBuf,

    /// Housekeeping timer rate (Hz)
    #[arg(long, default_value_t = 1000)]
    timer_hz: u32,
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match SequencerConfig::load(path) {
            Some(c) => c,
            None => {
                error!("Could not load config {:?}", path);
                process::exit(1);
            }
        },
        None => SequencerConfig::default(),
    }
    .with_seed(cli.seed);

    let subdivision = match Subdivision::from_note_value(cli.subdivision) {
        Some(s) => s,
        None => {
            error!("--subdivision must be 8, 16 or 32 (got {})", cli.subdivision);
            process::exit(2);
        }
    };
    let controls = ControlFrame::new(
        cli.tempo,
        cli.probability,
        cli.vel_low,
        cli.vel_high,
        subdivision,
        cli.glitch,
    );
    let clock = SessionClock::new();

    info!("═══════════════════════════════════════════════");
    info!("  RANDOM DRUMMER v{}", env!("CARGO_PKG_VERSION"));
    info!("  Voices: {}", config.voices.iter().map(|v| v.name.as_str()).collect::<Vec<_>>().join(", "));
    info!("  Mode: {}", if cli.simulate { "SIMULATOR" } else { "HARDWARE" });
    match config.seed {
        Some(seed) => info!("  Seed: {}", seed),
        None => info!("  Seed: entropy"),
    }
    if !cli.simulate {
        info!(
            "  Panel: {:.1} BPM, probability {}, {:?}{}",
            bpm_from_raw(controls.tempo_raw),
            controls.probability_raw,
            subdivision,
            if controls.glitch { ", glitch" } else { "" }
        );
    }
    info!("═══════════════════════════════════════════════");

    // Channel: producers → coordinator
    let (event_tx, event_rx) = bounded::<SeqEvent>(4096);

    // Channels: coordinator → consumers
    let mut midi_txs: Vec<Sender<MidiMessage>> = Vec::new();
    let mut status_txs: Vec<Sender<StatusFrame>> = Vec::new();

    let mut handles = Vec::new();

    // ─── Console display ────────────────────────────────────────────
    if cli.console {
        let (tx, rx) = bounded::<StatusFrame>(256);
        status_txs.push(tx);
        handles.push(spawn("display", move || {
            console_display::ConsoleDisplay::new(rx).run();
        }));
    }

    // ─── Event logger ───────────────────────────────────────────────
    if cli.log_events {
        let (tx, rx) = bounded::<StatusFrame>(4096);
        match EventLogger::new(rx, &cli.output_dir, config.clone()) {
            Ok(logger) => {
                status_txs.push(tx);
                handles.push(spawn("logger", move || logger.run()));
            }
            Err(e) => error!("Event logging disabled: {}", e),
        }
    }

    // ─── MIDI output ────────────────────────────────────────────────
    let (midi_tx, midi_rx) = bounded::<MidiMessage>(1024);
    midi_txs.push(midi_tx);

    if cli.simulate {
        handles.push(spawn("midi-monitor", move || {
            MidiMonitor::new(midi_rx).run();
        }));
    } else {
        #[cfg(feature = "hardware")]
        {
            match midi_port::open(&cli.port, cli.baud, event_tx.clone(), midi_rx, clock.clone()) {
                Ok((mut midi_in, mut midi_out)) => {
                    handles.push(spawn("midi-in", move || midi_in.run()));
                    handles.push(spawn("midi-out", move || midi_out.run()));
                }
                Err(e) => {
                    error!("Failed to open serial port {}: {}", cli.port, e);
                    error!("Is the synth interface connected? Run with --simulate for dev mode.");
                    process::exit(1);
                }
            }
        }
        #[cfg(not(feature = "hardware"))]
        {
            error!("Hardware mode requires 'hardware' feature. MIDI will only be logged.");
            let _ = (&cli.port, cli.baud);
            handles.push(spawn("midi-monitor", move || {
                MidiMonitor::new(midi_rx).run();
            }));
        }
    }

    // ─── Coordinator ────────────────────────────────────────────────
    let sequencer = config.sequencer(controls);
    handles.push(spawn("coordinator", move || {
        Coordinator::new(event_rx, midi_txs, status_txs, sequencer).run();
    }));

    // ─── Step timer ─────────────────────────────────────────────────
    {
        let tx = event_tx.clone();
        let timer_clock = clock.clone();
        let hz = cli.timer_hz;
        handles.push(spawn("timer", move || {
            StepTimer::new(timer_clock, tx, hz).run();
        }));
    }

    // ─── Input source ───────────────────────────────────────────────
    if cli.simulate {
        info!("Starting simulator...");
        let tx = event_tx.clone();
        let sim_clock = clock.clone();
        let demo = cli.demo.clone();
        handles.push(spawn("simulator", move || {
            simulator::Simulator::new(sim_clock, tx).run(&demo);
        }));
    } else {
        // Knobs are fixed from the command line; send them once
        let _ = event_tx.send(SeqEvent::Controls(controls));
        let tx = event_tx.clone();
        let button_clock = clock.clone();
        handles.push(spawn("button", move || {
            TransportButton::new(io::stdin().lock(), button_clock, tx).run();
        }));
    }
    drop(event_tx);

    info!("Running. Press Ctrl+C to stop.");
    for h in handles {
        let _ = h.join();
    }
}

fn spawn<F>(name: &str, f: F) -> thread::JoinHandle<()>
where
    F: FnOnce() + Send + 'static,
{
    match thread::Builder::new().name(name.into()).spawn(f) {
        Ok(h) => h,
        Err(e) => {
            error!("Failed to spawn {} thread: {}", name, e);
            process::exit(1);
        }
    }
}
