use crate::config::InstrumentConfig;
use crate::types::*;
use crossbeam_channel::Receiver;
use log::{error, info};
use serde_json::json;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Tag written in the first line of every session file.
pub const SESSION_FORMAT: &str = "motion-tone";

/// Records every tick of a performance to a session directory:
/// `manifest.json`, `ticks.jsonl` (header line + one frame per line) and,
/// once the stream closes, `stats.json`.
pub struct DataLogger {
    rx: Receiver<TickFrame>,
    session_dir: PathBuf,
    config: InstrumentConfig,
    mode: VoiceMode,
}

impl DataLogger {
    pub fn new(
        rx: Receiver<TickFrame>,
        output_dir: &Path,
        config: InstrumentConfig,
        mode: VoiceMode,
    ) -> io::Result<Self> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let session_dir = output_dir.join(format!("session_{}", timestamp));
        fs::create_dir_all(&session_dir)?;

        Ok(Self {
            rx,
            session_dir,
            config,
            mode,
        })
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    /// Run the logger until every sender is dropped. Blocks the calling thread.
    pub fn run(&self) -> io::Result<u64> {
        info!("Data logger → {:?}", self.session_dir);
        self.write_manifest()?;

        let ticks_path = self.session_dir.join("ticks.jsonl");
        let mut writer = BufWriter::new(File::create(&ticks_path)?);

        let header = json!({
            "format": SESSION_FORMAT,
            "version": env!("CARGO_PKG_VERSION"),
            "mode": self.mode,
            "sensor": self.config.sensor,
        });
        writeln!(writer, "{}", header)?;

        let mut frame_count: u64 = 0;
        let mut silent_ticks: u64 = 0;
        let mut clamped_ticks: u64 = 0;
        let mut played_ms: u64 = 0;

        for frame in self.rx.iter() {
            let line = serde_json::to_string(&frame).map_err(io::Error::other)?;
            writeln!(writer, "{}", line)?;
            frame_count += 1;
            played_ms += frame.hold_ms as u64;
            if frame.melody.is_silent() {
                silent_ticks += 1;
            }
            if frame.clamped {
                clamped_ticks += 1;
            }

            if frame_count % 100 == 0 {
                writer.flush()?;
                info!("Logged {} ticks", frame_count);
            }
        }
        writer.flush()?;

        let stats = json!({
            "total_ticks": frame_count,
            "silent_ticks": silent_ticks,
            "clamped_ticks": clamped_ticks,
            "played_ms": played_ms,
        });
        let stats_path = self.session_dir.join("stats.json");
        fs::write(&stats_path, serde_json::to_string_pretty(&stats).map_err(io::Error::other)?)
            .unwrap_or_else(|e| error!("Failed to write stats: {}", e));

        info!(
            "Session saved: {} ticks, {} ms → {:?}",
            frame_count, played_ms, self.session_dir
        );
        Ok(frame_count)
    }

    fn write_manifest(&self) -> io::Result<()> {
        let manifest = json!({
            "version": env!("CARGO_PKG_VERSION"),
            "system": SESSION_FORMAT,
            "mode": self.mode,
            "scale": "Bb major, 6 octaves",
            "instrument": self.config,
        });
        let path = self.session_dir.join("manifest.json");
        fs::write(&path, serde_json::to_string_pretty(&manifest).map_err(io::Error::other)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    fn frame(tick: u64, melody: Note) -> TickFrame {
        TickFrame {
            tick,
            sample: MotionSample::at_rest(tick * 1000),
            features: MotionFeatures::new(1.0, 1.0),
            melody,
            bass: Some(Note::new(2, 1, 250)),
            melody_hz: 466,
            bass_hz: Some(73),
            hold_ms: melody.duration_ms,
            clamped: false,
        }
    }

    #[test]
    fn test_writes_session_files() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = bounded(16);
        let logger = DataLogger::new(rx, dir.path(), InstrumentConfig::default(), VoiceMode::Duet).unwrap();
        tx.send(frame(0, Note::new(0, 3, 250))).unwrap();
        tx.send(frame(1, Note::new(SILENCE, 2, 125))).unwrap();
        drop(tx);

        assert_eq!(logger.run().unwrap(), 2);

        let session = logger.session_dir();
        assert!(session.join("manifest.json").exists());
        let ticks = fs::read_to_string(session.join("ticks.jsonl")).unwrap();
        assert_eq!(ticks.lines().count(), 3, "header + 2 frames");
        assert!(ticks.lines().next().unwrap().contains(SESSION_FORMAT));

        let stats: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(session.join("stats.json")).unwrap()).unwrap();
        assert_eq!(stats["total_ticks"], 2);
        assert_eq!(stats["silent_ticks"], 1);
        assert_eq!(stats["played_ms"], 375);
    }
}
