use crate::config::SequencerConfig;
use crate::types::*;
use crossbeam_channel::Receiver;
use log::{error, info, warn};
use serde_json::json;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Default, PartialEq)]
struct LogCounts {
    frames: u64,
    hits: u64,
    write_errors: u64,
}

impl LogCounts {
    fn write_failed(&mut self, e: &io::Error) {
        self.write_errors += 1;
        if self.write_errors == 1 || self.write_errors.is_multiple_of(100) {
            warn!("Event log write error ({} so far): {}", self.write_errors, e);
        }
    }
}

/// Writes every status frame of a session to `events.jsonl`, with a
/// manifest describing the kit and a stats file written on shutdown.
pub struct EventLogger {
    rx: Receiver<StatusFrame>,
    session_dir: PathBuf,
    config: SequencerConfig,
}

impl EventLogger {
    pub fn new(
        rx: Receiver<StatusFrame>,
        output_dir: &Path,
        config: SequencerConfig,
    ) -> io::Result<Self> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let session_dir = output_dir.join(format!("session_{}", timestamp));
        fs::create_dir_all(&session_dir)?;

        Ok(Self {
            rx,
            session_dir,
            config,
        })
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    /// Run the logger. Blocks the calling thread.
    pub fn run(&self) {
        info!("Event logger → {:?}", self.session_dir);

        if let Err(e) = self.write_manifest() {
            warn!("Failed to write manifest: {}", e);
        }

        let events_path = self.session_dir.join("events.jsonl");
        let mut writer = match File::create(&events_path) {
            Ok(f) => BufWriter::new(f),
            Err(e) => {
                error!("Failed to create {:?}: {}", events_path, e);
                return;
            }
        };

        let counts = self.record(&mut writer);

        let stats = json!({
            "total_frames": counts.frames,
            "total_hits": counts.hits,
            "write_errors": counts.write_errors,
        });
        let stats_path = self.session_dir.join("stats.json");
        match serde_json::to_string_pretty(&stats) {
            Ok(s) => fs::write(&stats_path, s)
                .unwrap_or_else(|e| error!("Failed to write stats: {}", e)),
            Err(e) => error!("Failed to encode stats: {}", e),
        }

        info!(
            "Session saved: {} frames, {} hits → {:?}",
            counts.frames, counts.hits, self.session_dir
        );
    }

    /// Drain the channel into `writer`, one JSON line per frame.
    fn record<W: Write>(&self, writer: &mut W) -> LogCounts {
        let mut counts = LogCounts::default();

        for frame in self.rx.iter() {
            match serde_json::to_string(&frame) {
                Ok(line) => {
                    if let Err(e) = writeln!(writer, "{}", line) {
                        counts.write_failed(&e);
                    }
                }
                Err(e) => warn!("Failed to encode frame: {}", e),
            }
            counts.frames += 1;
            if frame.hit.is_some() {
                counts.hits += 1;
            }
            if counts.frames.is_multiple_of(500) {
                if let Err(e) = writer.flush() {
                    counts.write_failed(&e);
                }
                info!("Logged {} frames, {} hits", counts.frames, counts.hits);
            }
        }

        if let Err(e) = writer.flush() {
            counts.write_failed(&e);
        }
        counts
    }

    fn write_manifest(&self) -> io::Result<()> {
        let manifest = json!({
            "version": env!("CARGO_PKG_VERSION"),
            "system": "random-drummer",
            "seed": self.config.seed,
            "base_param_cc": self.config.base_param_cc,
            "stack_glitch": self.config.stack_glitch,
            "output_channel": DRUM_CHANNEL + 1,
            "voices": self.config.voices.iter().map(|v| {
                json!({"name": v.name, "kind": v.kind, "note": v.note})
            }).collect::<Vec<_>>(),
        });
        let s = serde_json::to_string_pretty(&manifest).map_err(io::Error::other)?;
        fs::write(self.session_dir.join("manifest.json"), s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("random-drummer-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_logs_frames_and_stats() {
        let out = temp_dir("logger");
        let (tx, rx) = unbounded();
        let logger = EventLogger::new(rx, &out, SequencerConfig::default()).unwrap();
        let dir = logger.session_dir().to_path_buf();

        let frame = StatusFrame {
            timestamp_ms: 125,
            transport: Transport::Playing,
            clock_mode: ClockMode::Internal,
            step: 0,
            steps: 4,
            indicator: true,
            tick: true,
            hit: Some(Hit { voice: 0, note: 36, velocity: 100 }),
        };
        tx.send(frame).unwrap();
        tx.send(StatusFrame { hit: None, ..frame }).unwrap();
        drop(tx);
        logger.run();

        let lines = fs::read_to_string(dir.join("events.jsonl")).unwrap();
        let parsed: Vec<StatusFrame> = lines
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(parsed, vec![frame, StatusFrame { hit: None, ..frame }]);

        let stats: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.join("stats.json")).unwrap()).unwrap();
        assert_eq!(stats["total_frames"], 2);
        assert_eq!(stats["total_hits"], 1);
        assert_eq!(stats["write_errors"], 0);

        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.join("manifest.json")).unwrap()).unwrap();
        assert_eq!(manifest["voices"].as_array().unwrap().len(), 8);
        assert_eq!(manifest["output_channel"], 10);

        let _ = fs::remove_dir_all(&out);
    }

    struct DiskFull;

    impl Write for DiskFull {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("no space left on device"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failures_are_counted() {
        let out = temp_dir("logger-full");
        let (tx, rx) = unbounded();
        let logger = EventLogger::new(rx, &out, SequencerConfig::default()).unwrap();
        let frame = StatusFrame {
            timestamp_ms: 0,
            transport: Transport::Playing,
            clock_mode: ClockMode::Internal,
            step: 0,
            steps: 4,
            indicator: true,
            tick: false,
            hit: None,
        };
        for _ in 0..3 {
            tx.send(frame).unwrap();
        }
        drop(tx);

        let counts = logger.record(&mut DiskFull);
        assert_eq!(counts, LogCounts { frames: 3, hits: 0, write_errors: 3 });

        let _ = fs::remove_dir_all(&out);
    }
}
