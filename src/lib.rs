pub mod button;
pub mod clock;
pub mod config;
pub mod console_display;
pub mod coordinator;
pub mod event_logger;
pub mod generator;
pub mod midi;
pub mod midi_monitor;
pub mod params;
pub mod sequencer;
pub mod simulator;
pub mod tempo;
pub mod timer;
pub mod transport;
pub mod types;
pub mod voices;

#[cfg(feature = "hardware")]
pub mod midi_port;
